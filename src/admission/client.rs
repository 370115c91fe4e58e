//! Client identity resolution for admission keys.

// std
use std::net::SocketAddr;

/// Proxy header carrying the original client chain, leftmost first.
pub const HEADER_FORWARDED_FOR: &str = "X-Forwarded-For";
/// Proxy header carrying a single client address.
pub const HEADER_REAL_IP: &str = "X-Real-IP";

/// Resolves the identity a request is limited under.
///
/// Order: the first non-empty entry of `X-Forwarded-For`, then `X-Real-IP`, then the host part
/// of the transport peer address. A peer address that cannot be split is used verbatim. Headers
/// are trusted as given; deployments must strip them at the edge if clients can forge them.
pub fn resolve_client_identity(
	forwarded_for: Option<&str>,
	real_ip: Option<&str>,
	peer_addr: &str,
) -> String {
	if let Some(first) = forwarded_for
		.and_then(|chain| chain.split(',').map(str::trim).find(|entry| !entry.is_empty()))
	{
		return first.to_owned();
	}
	if let Some(real_ip) = real_ip.map(str::trim).filter(|value| !value.is_empty()) {
		return real_ip.to_owned();
	}

	peer_host(peer_addr.trim())
}

fn peer_host(peer_addr: &str) -> String {
	if let Ok(addr) = peer_addr.parse::<SocketAddr>() {
		return addr.ip().to_string();
	}

	match peer_addr.rsplit_once(':') {
		// Bare IPv6 addresses contain colons but no port.
		Some((host, _)) if !host.is_empty() && !host.contains(':') => host.to_owned(),
		_ => peer_addr.to_owned(),
	}
}

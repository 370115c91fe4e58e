//! Token-level models shared by the codec, the ledger, and the session manager.

pub mod claims;
pub mod kind;
pub mod pair;
pub mod record;
pub mod secret;

//! Subject identifiers, token kinds and claims, and revocation records.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{claims::*, kind::*, pair::*, record::*, secret::*};

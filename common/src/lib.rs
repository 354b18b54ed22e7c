//! Mi Plata Common Types
//!
//! Shared types used across the Mi Plata workspace: identifiers, monetary
//! helpers, the error taxonomy and time utilities.

pub mod identifiers;
pub mod monetary;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;
pub use time::*;

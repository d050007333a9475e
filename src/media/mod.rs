//! Strongroom Media - Shared Media Index
//!
//! Parsing picker references and mapping them onto media index rows.

pub mod uri;
pub mod store;
pub mod resolver;

pub use uri::{DocumentProvider, MediaReference};
pub use store::*;
pub use resolver::{resolve_with, MediaIdentityResolver};

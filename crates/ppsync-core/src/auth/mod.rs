//! Authentication against the vault.
//!
//! This module provides:
//! - `authenticate`: one password-grant token request over any `VaultApi`
//! - `Session`: an authenticated client with its token expiry
//!
//! Sessions live in memory only. Nothing is written to disk.

pub mod session;

pub use session::{authenticate, Session};

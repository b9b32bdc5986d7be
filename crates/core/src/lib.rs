//! `relayq-core` — error taxonomy shared by the dispatch core and its callers.
//!
//! This crate contains **pure data** (no IO, no state): the closed
//! [`ErrorCode`] enumeration, the [`Error`] value it classifies, and the
//! [`OpResult`] alias every asynchronous operation resolves to.

pub mod code;
pub mod error;

pub use code::ErrorCode;
pub use error::{Error, OpResult};

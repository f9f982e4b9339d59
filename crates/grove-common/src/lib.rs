//! Shared leaf types for the Grove call resolver.
//!
//! - [`span`]: byte-offset spans into call-site source text and line lookup
//! - [`cancel`]: cooperative cancellation shared between a host and the engine

pub mod cancel;
pub mod span;

pub use cancel::CancellationToken;
pub use span::{LineIndex, Span};

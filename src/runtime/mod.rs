//! Application runtime
//!
//! - `context`: component wiring and per-request context

pub mod context;

pub use context::{LinkPulse, RequestContext};

//! LinkPulse - short-code resolution core
//!
//! Resolves short codes at low latency through a read-through cache, records
//! clicks in the background, serves per-owner and global dashboard statistics,
//! and gates link creation with a fixed-window rate limiter.
//!
//! # Architecture
//! - `cache`: Cache Store trait, typed key builder, Redis and in-memory stores
//! - `storage`: domain models and the durable store (SeaORM, in-memory)
//! - `services`: resolver, click recorder, stats, rate limiter, link mutations
//! - `runtime`: component wiring and request context
//! - `config`: TOML + environment configuration
//! - `system`: logging setup

pub mod cache;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;

pub use errors::{LinkPulseError, Result};
pub use runtime::{LinkPulse, RequestContext};

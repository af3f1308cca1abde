//! Tracing setup for the relay: stderr logging (text or JSON) with optional
//! OTLP span export, plus span macros for relay instrumentation.

pub mod config;
pub mod spans;
pub mod subscriber;

pub use config::TracingConfig;
pub use subscriber::{init_tracing, TracingGuard};

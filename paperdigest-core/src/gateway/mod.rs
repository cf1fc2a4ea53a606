//! # REST Gateway
//!
//! HTTP surface of the research pipeline: a health probe and the
//! summarize endpoint, served with axum.

mod server;

pub use server::{router as gateway_router, run as run_gateway, ApiError, SharedPipeline};

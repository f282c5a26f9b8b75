//! Taskroute - task-aware model routing across heterogeneous LLM providers
//!
//! Classifies each prompt into a task type and complexity, scores every
//! backend in the catalog against it, and returns a primary model with an
//! ordered fallback chain.

pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod scoring;
pub mod telemetry;

//! Command-line interface for Taskroute
//!
//! Provides argument parsing and subcommand handling for the Taskroute binary.

use clap::{Parser, Subcommand};

/// Task-aware model routing across LLM providers
#[derive(Parser)]
#[command(name = "taskroute")]
#[command(version)]
#[command(about = "Task-aware model routing across LLM providers")]
#[command(
    long_about = "Taskroute classifies prompts by task type and complexity, scores every \
    backend in its catalog against the task, and picks a primary model plus ordered fallbacks \
    using a cost-optimized, performance-optimized, or balanced strategy."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given)
    Serve,

    /// Route a single prompt and print the selection as JSON
    Route {
        /// Prompt text to classify and route
        prompt: String,

        /// The request includes images
        #[arg(long)]
        images: bool,

        /// Skip routing and use this model (`provider/model` or bare `model`)
        #[arg(long = "override", value_name = "MODEL")]
        override_model: Option<String>,

        /// Restrict candidates to this provider (repeatable)
        #[arg(long = "provider", value_name = "PROVIDER")]
        providers: Vec<String>,
    },

    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Taskroute Configuration
# =========================
#
# This file configures the HTTP server, the backend catalog, routing policy,
# health probing and observability settings for Taskroute.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# ─────────────────────────────────────────────────────────────────────────────
# ROUTING CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[routing]
# Routing is off unless enabled; callers then get the default model
enabled = true

# Strategy:
#   - "cost-optimized": favor cheap backends
#   - "performance-optimized": favor capable, fast backends
#   - "balanced": use the weights below as-is
strategy = "balanced"

# Boost local providers for simple tasks, cloud providers for complex or
# reasoning tasks
prefer_local = true
local_providers = ["ollama"]
cloud_providers = ["anthropic", "openai", "google"]

# What to do when routing produces no decision:
#   - "default-model": use default_model below
#   - "manual-selection": ask the caller to pick
fallback_behavior = "default-model"

# Number of fallback models returned after the primary
max_fallbacks = 3

# Provider assumed for bare model names in overrides
default_provider = "anthropic"

# Model used when routing is disabled or produces no decision
default_model = "anthropic/claude-sonnet-4"

# Scoring weights; normalized to sum to 1.0
[routing.weights]
capability = 0.4
cost = 0.3
performance = 0.2
availability = 0.1

# Task rules narrow the candidates for matching tasks. A rule that would
# leave no candidates is ignored.
[[routing.task_rules]]
task_type = "coding"
complexity = "complex"
preferred_providers = ["anthropic"]
min_context_window = 100000

# [[routing.task_rules]]
# task_type = "chat"
# exclude_providers = ["openai"]

# ─────────────────────────────────────────────────────────────────────────────
# BACKEND CATALOG
# ─────────────────────────────────────────────────────────────────────────────

[catalog]
# TOML file listing [[models]] entries
# path = "catalog.toml"

# Discovery timeout in seconds (0 < t <= 300)
discovery_timeout_seconds = 10

# Cost tier assumed for models without cost figures: free, low, medium, high
default_cost_tier = "medium"

# ─────────────────────────────────────────────────────────────────────────────
# HEALTH PROBING (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# Probes the health_url of each catalog entry. Consecutive failures lower the
# model's availability score.

[health]
enabled = false
interval_seconds = 30
timeout_seconds = 5

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}

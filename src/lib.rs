//! Spectrum Virtualize Prometheus Exporter
//!
//! A Prometheus metrics exporter for IBM Spectrum Virtualize storage arrays
//! (SAN Volume Controller, FlashSystem, Storwize).
//!
//! # Overview
//!
//! The exporter talks to the REST API of each configured array, authenticating
//! with a per-target session token that is cached, verified and renewed as
//! needed. Every Prometheus scrape fans out to all selected arrays at once and
//! runs the enabled collectors against each of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   HTTPS /rest/auth   ┌──────────────────────┐
//! │  Array A    │ ◄──────────────────► │      Exporter        │
//! └─────────────┘   POST /rest/<cmd>   │  ┌────────────────┐  │
//! ┌─────────────┐                      │  │ TargetRegistry │  │      HTTP      ┌────────────┐
//! │  Array B    │ ◄──────────────────► │  └────────────────┘  │ ◄────────────► │ Prometheus │
//! └─────────────┘                      │  ┌────────────────┐  │  /metrics      └────────────┘
//!                                      │  │   Collectors   │  │  /settings
//!                                      │  └────────────────┘  │
//!                                      └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`spectrum`] - REST transport, session tokens and the per-scrape client
//! - [`collectors`] - One plugin per REST command
//! - [`scrape`] - Fan-out over targets and health series
//! - [`metrics`] - Per-scrape Prometheus sink
//! - [`server`] - HTTP endpoints
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use spectrum_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scrape;
pub mod server;
pub mod spectrum;

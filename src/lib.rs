//! hoplink - short-link redirect server with startup target checking.
//!
//! This crate serves permanent redirects for a curated set of short
//! links. Records live in a `short,target` file that is compiled into
//! the binary for production and read from disk in development mode,
//! where templates also hot-reload on change.
//!
//! # Features
//!
//! - **Async I/O**: Built on Tokio and hyper for HTTP/1.1 serving
//! - **Bounded URL checking**: A worker pool probes every redirect
//!   target at startup and reports dead links without blocking launch
//! - **Self-contained binary**: Templates, static files and record data
//!   are embedded at compile time
//! - **Access logging**: Structured logging with tracing
//!
//! # Example
//!
//! ```rust,ignore
//! use hoplink::{Config, Server};
//!
//! let config = Config::from_env()?;
//! let server = Server::new(config).await?;
//! server.run().await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod assets;
pub mod checker;
pub mod config;
pub mod records;
pub mod server;
pub mod templates;

// Re-exports for convenience
pub use checker::{Summary, UrlChecker};
pub use config::Config;
pub use server::Server;

//! Incognibro - privacy dashboard on the command line.
//!
//! This crate provides the pieces behind the `incognibro` binary:
//!
//! - [`client`]: the HTTP settings service client
//! - [`commands`]: CLI subcommands and their output
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use incognibro_app::client::{HttpSettingsClient, DEFAULT_SERVER_URL};
//! use incognibro_core::BlocklistCoordinator;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = HttpSettingsClient::new(DEFAULT_SERVER_URL, "alice")?;
//! let coordinator = BlocklistCoordinator::new(Arc::new(client));
//!
//! coordinator.refresh().await?;
//! coordinator.add_block_entry("tracker.example").await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod commands;

pub use client::{ClientError, HttpSettingsClient};
pub use commands::{Command, Session};

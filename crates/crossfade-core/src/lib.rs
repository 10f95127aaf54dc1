//! # Crossfade Core Library
//!
//! `crossfade-core` drives a playlist transfer backend from the client side:
//! it keeps track of which streaming services are connected, caches their
//! playlist listings, holds the user's selection, and runs batches of
//! transfers to a destination service while reporting a single overall
//! progress figure.
//!
//! ## Features
//!
//! - **Session reconciliation**: auth status polling that only reacts to real changes
//! - **Sequential batch transfers**: one playlist at a time, failures don't stop the batch
//! - **Weighted progress**: overall completion weighted by playlist size, never going backwards
//! - **Pluggable backend**: everything remote goes through the [`api::Backend`] trait
//!
//! ## Modules
//!
//! - [`api`] - Backend boundary and its HTTP implementation
//! - [`catalog`] - Playlist model and per-service listing cache
//! - [`config`] - Configuration management
//! - [`context`] - Application context owning all session state
//! - [`error`] - Error type
//! - [`progress`] - Global progress arithmetic and the per-job sample filter
//! - [`selection`] - The set of playlists picked for a transfer
//! - [`service`] - Service registry and connection records
//! - [`session`] - Auth status reconciliation
//! - [`transfer`] - Transfer runs and the orchestrator
//!
//! ## Example
//!
//! ```rust,ignore
//! use crossfade_core::{config::Config, context::AppContext};
//!
//! let ctx = AppContext::from_config(&Config::load()?)?;
//! ctx.poll_auth().await?;
//! ctx.select_all().await;
//! let report = ctx.transfer(&"tidal".into()).await?;
//! println!("{} succeeded", report.succeeded());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod api;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod selection;
pub mod service;
pub mod session;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default backend server URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Default service playlists are read from
pub const DEFAULT_SOURCE_SERVICE: &str = "spotify";

/// Default interval between auth status polls in milliseconds
pub const DEFAULT_AUTH_POLL_INTERVAL_MS: u64 = 2_000;

/// Default interval between transfer progress polls in milliseconds
pub const DEFAULT_PROGRESS_POLL_INTERVAL_MS: u64 = 800;

/// Default time a completed run stays on display before being reset, in seconds
pub const DEFAULT_COMPLETION_WINDOW_SECS: u64 = 5;

/// Default timeout for backend requests other than transfer submission, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

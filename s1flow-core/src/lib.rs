//! # s1flow-core
//!
//! Core library for s1flow - an LTE S1AP session reconstructor.
//!
//! This library provides:
//! - Domain types for events, correlation keys and classification results
//! - LTE protocol vocabulary (S1AP procedures, EMM messages, causes)
//! - Ingestion of tshark CSV and JSON exports
//! - Session reconstruction keyed by `(ENB_UE_S1AP_ID, MME_UE_S1AP_ID)`
//! - Procedure classification and session reports
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Ingest:** export files are read into flat records and mapped to [`Event`]s
//! - **Reconstruct:** the [`SessionRegistry`] groups events into [`Session`]s
//! - **Classify:** the [`Classifier`] gives each session a terminal status,
//!   collected into a [`Report`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use s1flow_core::{Classifier, Config, IngestCoordinator, Report};
//! use std::path::PathBuf;
//!
//! let config = Config::load().expect("failed to load config");
//! let ingest = IngestCoordinator::new(config.fields.clone())
//!     .ingest_all(&[PathBuf::from("trace.csv")])
//!     .expect("failed to read export");
//! let classifier = Classifier::from_config(&config.classifier);
//! let report = Report::build(ingest, &config.correlation, &classifier);
//! println!("{}", report.render_text());
//! ```

// Re-export commonly used items at the crate root
pub use classify::{Classifier, Procedure};
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{IngestCoordinator, IngestResult};
pub use report::{FilterMode, Report, SessionRecord, Summary};
pub use session::{Session, SessionRegistry, SharedRegistry};
pub use types::*;

// Public modules
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod protocol;
pub mod report;
pub mod session;
pub mod types;

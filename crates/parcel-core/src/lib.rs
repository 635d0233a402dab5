//! Upload coordination for Parcel.
//!
//! Clients upload straight to an S3-compatible store through presigned URLs;
//! this crate decides which URLs they get. It holds:
//!
//! - [`config`]: the [`UploadConfig`] built once at startup
//! - [`validation`] and [`keys`]: filename checks and key derivation
//! - [`gateway`]: the store adapter, over `aws-sdk-s3` or in memory
//! - [`catalog`]: the host catalog collaborator
//! - [`coordinator`]: the multipart protocol engine
//! - [`uploader`]: single-file and multipart strategies behind one interface
//! - [`handler`]: the [`parcel_http::ActionHandler`] tying it to HTTP
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use parcel_core::catalog::MemoryCatalog;
//! use parcel_core::config::UploadConfig;
//! use parcel_core::coordinator::UploadCoordinator;
//! use parcel_core::gateway::MemoryObjectStore;
//! use parcel_model::Principal;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let config = UploadConfig::default();
//! let coordinator = UploadCoordinator::new(
//!     &config,
//!     Arc::new(MemoryObjectStore::from_config(&config).unwrap()),
//!     Arc::new(MemoryCatalog::development()),
//! );
//!
//! let alice = Principal::new("alice");
//! let upload = coordinator
//!     .initiate(Some(&alice), Some("pkg-1"), Some("data.csv"), None, None)
//!     .await
//!     .unwrap();
//! assert!(upload.session.key.starts_with("resources/pkg-1/"));
//! # });
//! ```

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod keys;
pub mod parts;
pub mod session;
pub mod uploader;
pub mod validation;

pub use config::UploadConfig;
pub use coordinator::UploadCoordinator;
pub use error::{UploadError, UploadResult};
pub use handler::ParcelHandler;

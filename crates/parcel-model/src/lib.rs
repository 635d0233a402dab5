//! Wire model for Parcel.
//!
//! Hand-written serde types for the JSON action API: the action enum, the
//! input and output payloads, the shared value types and the wire error.

pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use error::{ActionError, ActionErrorCode};
pub use operations::UploadAction;
pub use types::{MAX_PART_NUMBER, PartDescriptor, PresignOperation, PresignedGrant, Principal};

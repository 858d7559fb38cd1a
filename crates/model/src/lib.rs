//! Configuration profile data model.
//!
//! This crate owns the device-management profile and payload model with
//! validation, the property-list serializer for the `.mobileconfig` wire
//! format, and the on-disk profile store. It performs no network I/O; the
//! companion `mdmforge-client` crate synchronizes profiles with a remote
//! management server.

pub mod error;
pub mod payload;
pub mod plist;
pub mod profile;
pub mod store;

pub use error::ModelError;
pub use payload::{Payload, ProxyKind, VpnKind, VpnPayload, WifiEncryption, WifiPayload};
pub use profile::{Profile, ProfileScope};
pub use store::ProfileStore;

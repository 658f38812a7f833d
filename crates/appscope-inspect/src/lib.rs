//! Installer package metadata extraction for appscope
//!
//! This crate opens Android (`.apk`) and iOS (`.ipa`) installer packages and
//! reports what they contain: display name, bundle identifier, version, build
//! number, icon and, for iOS, the provisioning details.
//!
//! ## Supported Packages
//!
//! - **iOS**: `Payload/<App>.app/Info.plist` and `embedded.mobileprovision`
//! - **Android**: `aapt2 dump badging` output plus the launcher icon entry
//!
//! ## Usage
//!
//! ```ignore
//! use appscope_inspect::{ArchiveInspector, PackageInspector};
//!
//! let inspector = ArchiveInspector::new();
//! let metadata = inspector.inspect(&path)?;
//! println!("{} {}", metadata.bundle_id, metadata.version);
//! ```

pub mod archive;
pub mod error;
pub mod traits;
pub mod types;

mod android;
mod ios;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use archive::ArchiveInspector;
pub use error::{InspectError, Result};
pub use traits::PackageInspector;
pub use types::*;

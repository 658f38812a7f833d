//! Common types for package inspection

use image::DynamicImage;
use serde::{Serialize, Serializer};

/// Platform an installer package targets
///
/// Serialized as its numeric code so existing consumers can keep comparing
/// integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Not an Android or iOS package
    #[default]
    Unknown,
    /// Android `.apk`
    Android,
    /// iOS `.ipa`
    Ios,
}

impl Platform {
    /// Numeric code used on the wire
    pub fn code(self) -> u8 {
        match self {
            Platform::Unknown => 0,
            Platform::Android => 1,
            Platform::Ios => 2,
        }
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Unknown => write!(f, "unknown"),
            Platform::Android => write!(f, "Android"),
            Platform::Ios => write!(f, "iOS"),
        }
    }
}

/// How an iOS package was provisioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DistributionType {
    /// No provisioning profile, or one we could not classify
    #[default]
    Unknown,
    /// Development profile (device list, debuggable)
    Development,
    /// Ad-hoc profile (device list, not debuggable)
    AdHoc,
    /// In-house enterprise profile (all devices)
    Enterprise,
    /// App Store profile (no device list)
    AppStore,
}

impl DistributionType {
    /// Numeric code used on the wire
    pub fn code(self) -> u8 {
        match self {
            DistributionType::Unknown => 0,
            DistributionType::Development => 1,
            DistributionType::AdHoc => 2,
            DistributionType::Enterprise => 3,
            DistributionType::AppStore => 4,
        }
    }
}

impl Serialize for DistributionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl std::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionType::Unknown => write!(f, "unknown"),
            DistributionType::Development => write!(f, "development"),
            DistributionType::AdHoc => write!(f, "ad-hoc"),
            DistributionType::Enterprise => write!(f, "enterprise"),
            DistributionType::AppStore => write!(f, "app-store"),
        }
    }
}

/// iOS-only signing details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IosMetadata {
    /// Distribution type derived from the provisioning profile
    pub distribution: DistributionType,

    /// UDIDs the profile is restricted to
    pub allow_device: Vec<String>,

    /// Signing team name
    pub team_name: String,
}

/// Metadata extracted from an installer package
#[derive(Debug, Clone, Default)]
pub struct PackageMetadata {
    /// Display name
    pub name: String,

    /// Bundle identifier (iOS) or package name (Android)
    pub bundle_id: String,

    /// User-facing version string
    pub version: String,

    /// Build number / version code
    pub build: String,

    /// Package size in bytes
    pub size: u64,

    /// Target platform
    pub platform: Platform,

    /// Decoded launcher icon, when one could be found and decoded
    pub icon: Option<DynamicImage>,

    /// iOS signing details (only for iOS packages)
    pub ios: Option<IosMetadata>,
}

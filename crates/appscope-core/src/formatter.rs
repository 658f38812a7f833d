//! Shapes package metadata into the JSON view returned to callers

use std::io::Cursor;

use appscope_inspect::{DistributionType, PackageMetadata, Platform};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tracing::debug;

/// Externally visible package metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppInfoView {
    pub name: String,
    pub package_name: String,
    pub version: String,
    pub build_id: String,
    pub size: u64,
    pub platform: Platform,
    /// Base64 of the icon's PNG encoding, empty when unavailable
    pub icon: String,
    pub ios: IosView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemInfo>,
}

/// iOS block; zero/empty for other platforms
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IosView {
    #[serde(rename = "type")]
    pub distribution: DistributionType,
    pub allow_device: Vec<String>,
    pub team_name: String,
}

/// Timing and version details added by the request handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    /// Download duration in milliseconds
    pub download_time: u64,
    /// Parse duration in milliseconds
    pub parser_time: u64,
    /// Completion timestamp, `YYYY-MM-DD HH:MM:SS`
    pub process_time: String,
    /// Service version
    pub version: String,
}

/// Build the view for `metadata`. Never fails.
pub fn format_app_info(metadata: &PackageMetadata) -> AppInfoView {
    let mut ios = IosView::default();
    if metadata.platform == Platform::Ios {
        if let Some(details) = &metadata.ios {
            ios.distribution = details.distribution;
            ios.allow_device = details.allow_device.clone();
            ios.team_name = details.team_name.clone();
        }
    }

    AppInfoView {
        name: metadata.name.clone(),
        package_name: metadata.bundle_id.clone(),
        version: metadata.version.clone(),
        build_id: metadata.build.clone(),
        size: metadata.size,
        platform: metadata.platform,
        icon: encode_icon(metadata.icon.as_ref()),
        ios,
        system: None,
    }
}

/// PNG-encode then Base64 the icon; any failure yields an empty string
pub fn encode_icon(icon: Option<&DynamicImage>) -> String {
    let Some(icon) = icon else {
        return String::new();
    };
    let mut buffer = Cursor::new(Vec::new());
    match icon.write_to(&mut buffer, ImageFormat::Png) {
        Ok(()) => STANDARD.encode(buffer.into_inner()),
        Err(e) => {
            debug!(error = %e, "icon could not be encoded as PNG");
            String::new()
        }
    }
}

//! Android (`.apk`) inspection
//!
//! The binary manifest is read through `aapt2 dump badging`; only the
//! launcher icon is pulled from the archive directly.

use std::io::{Read, Seek};
use std::path::Path;
use std::process::Command;

use tracing::debug;
use zip::ZipArchive;

use crate::archive::decode_icon;
use crate::error::{InspectError, Result};
use crate::types::{PackageMetadata, Platform};

/// Fields of interest from `aapt2 dump badging`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Badging {
    pub package_name: String,
    pub version_code: String,
    pub version_name: String,
    pub label: Option<String>,
    /// Highest-density raster icon path inside the archive
    pub icon: Option<String>,
}

/// Extract metadata from an APK
pub(crate) fn inspect_apk<R: Read + Seek>(
    aapt_path: &Path,
    path: &Path,
    archive: &mut ZipArchive<R>,
    size: u64,
) -> Result<PackageMetadata> {
    let output = Command::new(aapt_path)
        .args(["dump", "badging"])
        .arg(path)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                InspectError::ToolNotFound(aapt_path.display().to_string())
            }
            _ => InspectError::CommandFailed(format!("aapt2 failed: {}", e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InspectError::CommandFailed(format!(
            "aapt2 exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let badging = parse_badging(&String::from_utf8_lossy(&output.stdout));

    if badging.package_name.is_empty() {
        return Err(InspectError::Parse(
            "Could not determine package name from APK".to_string(),
        ));
    }

    let icon = badging
        .icon
        .as_deref()
        .and_then(|entry| decode_icon(archive, entry));

    Ok(PackageMetadata {
        name: badging.label.unwrap_or_default(),
        bundle_id: badging.package_name,
        version: badging.version_name,
        build: badging.version_code,
        size,
        platform: Platform::Android,
        icon,
        ios: None,
    })
}

/// Parse `aapt2 dump badging` output
pub(crate) fn parse_badging(stdout: &str) -> Badging {
    let mut badging = Badging::default();
    let mut best_density = 0u32;
    let mut fallback_icon = None;

    for line in stdout.lines() {
        if line.starts_with("package:") {
            // package: name='com.example' versionCode='1' versionName='1.0.0'
            badging.package_name = attribute(line, "name").unwrap_or_default();
            badging.version_code = attribute(line, "versionCode").unwrap_or_default();
            badging.version_name = attribute(line, "versionName").unwrap_or_default();
        } else if let Some(rest) = line.strip_prefix("application-label:") {
            badging.label = Some(unquote(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("application-icon-") {
            // application-icon-480:'res/mipmap-xxhdpi/ic_launcher.png'
            let Some((density, value)) = rest.split_once(':') else {
                continue;
            };
            let Ok(density) = density.parse::<u32>() else {
                continue;
            };
            if density >= best_density && is_raster(unquote(value)) {
                best_density = density;
                badging.icon = Some(unquote(value).to_string());
            }
        } else if line.starts_with("application:") {
            if badging.label.is_none() {
                badging.label = attribute(line, "label").filter(|l| !l.is_empty());
            }
            fallback_icon = attribute(line, "icon").filter(|icon| is_raster(icon));
        }
    }

    if badging.icon.is_none() {
        badging.icon = fallback_icon;
    }
    debug!(package = %badging.package_name, icon = ?badging.icon, "parsed badging output");
    badging
}

/// Value of ` key='value'` on a badging line
fn attribute(line: &str, key: &str) -> Option<String> {
    let marker = format!(" {key}='");
    let start = line.find(&marker)? + marker.len();
    let end = line[start..].find('\'')? + start;
    Some(line[start..end].to_string())
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('\'')
}

/// Adaptive icons are XML and cannot be rasterized here
fn is_raster(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".png", ".webp", ".jpg", ".jpeg"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

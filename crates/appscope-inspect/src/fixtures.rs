//! Synthetic installer packages for tests
//!
//! Only compiled for this crate's tests or with the `fixtures` feature.

use std::io::{Cursor, Write};

use image::{ImageFormat, Rgba, RgbaImage};
use plist::{Dictionary, Value};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{InspectError, Result};

/// Encode a square PNG with a simple gradient
pub fn png_icon(size: u32) -> Result<Vec<u8>> {
    let image = RgbaImage::from_fn(size, size, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 0x80, 0xff])
    });
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| InspectError::Parse(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Builder for a minimal `.ipa`
#[derive(Debug, Clone)]
pub struct IpaFixture {
    pub bundle_id: String,
    pub display_name: Option<String>,
    pub bundle_name: String,
    pub version: String,
    pub build: String,
    pub with_icon: bool,
    /// When `None`, no `embedded.mobileprovision` is written
    pub team_name: Option<String>,
    pub devices: Vec<String>,
    pub provisions_all_devices: bool,
    pub get_task_allow: bool,
}

impl Default for IpaFixture {
    fn default() -> Self {
        Self {
            bundle_id: "com.example.demo".to_string(),
            display_name: Some("Demo".to_string()),
            bundle_name: "DemoBundle".to_string(),
            version: "1.2.3".to_string(),
            build: "42".to_string(),
            with_icon: true,
            team_name: Some("Example Corp".to_string()),
            devices: Vec::new(),
            provisions_all_devices: false,
            get_task_allow: false,
        }
    }
}

impl IpaFixture {
    /// Zip the bundle into memory
    pub fn build(&self) -> Result<Vec<u8>> {
        let app_dir = "Payload/Demo.app";
        let mut files: Vec<(String, Vec<u8>)> = vec![
            (format!("{app_dir}/Info.plist"), self.info_plist()?),
            (format!("{app_dir}/Demo"), b"\xcf\xfa\xed\xfe".to_vec()),
        ];
        if self.with_icon {
            files.push((format!("{app_dir}/AppIcon60x60@2x.png"), png_icon(120)?));
        }
        if let Some(team_name) = &self.team_name {
            files.push((
                format!("{app_dir}/embedded.mobileprovision"),
                self.provisioning_profile(team_name)?,
            ));
        }
        zip_entries(&files)
    }

    fn info_plist(&self) -> Result<Vec<u8>> {
        let mut dict = Dictionary::new();
        dict.insert(
            "CFBundleIdentifier".to_string(),
            Value::String(self.bundle_id.clone()),
        );
        if let Some(display_name) = &self.display_name {
            dict.insert(
                "CFBundleDisplayName".to_string(),
                Value::String(display_name.clone()),
            );
        }
        dict.insert(
            "CFBundleName".to_string(),
            Value::String(self.bundle_name.clone()),
        );
        dict.insert(
            "CFBundleShortVersionString".to_string(),
            Value::String(self.version.clone()),
        );
        dict.insert(
            "CFBundleVersion".to_string(),
            Value::String(self.build.clone()),
        );

        let mut primary = Dictionary::new();
        primary.insert(
            "CFBundleIconFiles".to_string(),
            Value::Array(vec![Value::String("AppIcon60x60".to_string())]),
        );
        let mut icons = Dictionary::new();
        icons.insert("CFBundlePrimaryIcon".to_string(), Value::Dictionary(primary));
        dict.insert("CFBundleIcons".to_string(), Value::Dictionary(icons));

        let mut buffer = Vec::new();
        Value::Dictionary(dict).to_writer_xml(&mut buffer)?;
        Ok(buffer)
    }

    fn provisioning_profile(&self, team_name: &str) -> Result<Vec<u8>> {
        let mut dict = Dictionary::new();
        dict.insert("TeamName".to_string(), Value::String(team_name.to_string()));
        if !self.devices.is_empty() {
            dict.insert(
                "ProvisionedDevices".to_string(),
                Value::Array(self.devices.iter().cloned().map(Value::String).collect()),
            );
        }
        if self.provisions_all_devices {
            dict.insert("ProvisionsAllDevices".to_string(), Value::Boolean(true));
        }
        let mut entitlements = Dictionary::new();
        entitlements.insert(
            "get-task-allow".to_string(),
            Value::Boolean(self.get_task_allow),
        );
        dict.insert("Entitlements".to_string(), Value::Dictionary(entitlements));

        let mut xml = Vec::new();
        Value::Dictionary(dict).to_writer_xml(&mut xml)?;

        // Surround the plist with bytes standing in for the CMS signature
        let mut profile = vec![0x30, 0x80, 0x06, 0x09];
        profile.extend_from_slice(&xml);
        profile.extend_from_slice(&[0xa0, 0x82, 0x0b, 0x00]);
        Ok(profile)
    }
}

/// A zip holding an `AndroidManifest.xml`, enough to be routed to the
/// Android inspector
pub fn apk_stub() -> Result<Vec<u8>> {
    zip_entries(&[
        (
            "AndroidManifest.xml".to_string(),
            vec![0x03, 0x00, 0x08, 0x00],
        ),
        ("classes.dex".to_string(), b"dex\n035\0".to_vec()),
        (
            "res/mipmap-xxhdpi-v4/ic_launcher.png".to_string(),
            png_icon(144)?,
        ),
    ])
}

/// `aapt2 dump badging` output matching [`apk_stub`]
pub const APK_STUB_BADGING: &str = "\
package: name='com.example.app' versionCode='7' versionName='1.0' platformBuildVersionName='14'
sdkVersion:'24'
application-label:'Example App'
application-icon-160:'res/mipmap-mdpi-v4/ic_launcher.png'
application-icon-480:'res/mipmap-xxhdpi-v4/ic_launcher.png'
application: label='Example App' icon='res/mipmap-xxhdpi-v4/ic_launcher.png'
";

/// Write an executable `aapt2` stand-in into `dir` that prints `badging`
#[cfg(unix)]
pub fn aapt_stub(dir: &std::path::Path, badging: &str) -> Result<std::path::PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("aapt2");
    let script = format!("#!/bin/sh\ncat <<'BADGING'\n{badging}BADGING\n");
    std::fs::write(&path, script)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// A valid zip that is not an installer package
pub fn plain_zip() -> Result<Vec<u8>> {
    zip_entries(&[("README.txt".to_string(), b"hello".to_vec())])
}

fn zip_entries(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in files {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(contents)?;
    }
    Ok(writer.finish()?.into_inner())
}

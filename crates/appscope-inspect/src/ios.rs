//! iOS (`.ipa`) inspection

use std::io::{Cursor, Read, Seek};

use plist::{Dictionary, Value};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::archive::{decode_icon, read_entry};
use crate::error::{InspectError, Result};
use crate::types::{DistributionType, IosMetadata, PackageMetadata, Platform};

const PROVISION_XML_START: &[u8] = b"<?xml";
const PROVISION_XML_END: &[u8] = b"</plist>";

/// Extract metadata from an iOS bundle at `app_dir` (`Payload/<App>.app/`)
pub(crate) fn inspect_ipa<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    app_dir: &str,
    size: u64,
) -> Result<PackageMetadata> {
    let contents = read_entry(archive, &format!("{app_dir}Info.plist"))?;
    let plist: Value = plist::from_reader(Cursor::new(&contents))?;
    let dict = plist
        .as_dictionary()
        .ok_or_else(|| InspectError::Parse("Info.plist is not a dictionary".to_string()))?;

    let bundle_id = dict_string(dict, "CFBundleIdentifier")
        .ok_or_else(|| InspectError::Parse("Missing CFBundleIdentifier".to_string()))?;

    let name = dict_string(dict, "CFBundleDisplayName")
        .or_else(|| dict_string(dict, "CFBundleName"))
        .unwrap_or_default();

    let version = dict_string(dict, "CFBundleShortVersionString").unwrap_or_default();
    let build = dict_string(dict, "CFBundleVersion").unwrap_or_default();

    let icon = find_icon_entry(archive, app_dir, &icon_names(dict))
        .and_then(|entry| decode_icon(archive, &entry));

    let ios = read_provisioning(archive, app_dir)?;

    Ok(PackageMetadata {
        name,
        bundle_id,
        version,
        build,
        size,
        platform: Platform::Ios,
        icon,
        ios: Some(ios),
    })
}

fn dict_string(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key)
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Icon base names declared by the bundle, most preferred last
fn icon_names(dict: &Dictionary) -> Vec<String> {
    let primary = dict
        .get("CFBundleIcons")
        .and_then(|v| v.as_dictionary())
        .and_then(|d| d.get("CFBundlePrimaryIcon"))
        .and_then(|v| v.as_dictionary())
        .and_then(|d| d.get("CFBundleIconFiles"))
        .and_then(|v| v.as_array());

    let files = primary.or_else(|| dict.get("CFBundleIconFiles").and_then(|v| v.as_array()));

    let mut names: Vec<String> = files
        .map(|files| {
            files
                .iter()
                .filter_map(|v| v.as_string())
                .map(|s| s.trim_end_matches(".png").to_string())
                .collect()
        })
        .unwrap_or_default();

    if names.is_empty() {
        names.push("AppIcon".to_string());
    }
    names
}

/// Pick the largest PNG at the top of the bundle matching a declared icon name
fn find_icon_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    app_dir: &str,
    names: &[String],
) -> Option<String> {
    let mut pngs: Vec<(String, u64)> = Vec::new();
    for i in 0..archive.len() {
        let Ok(file) = archive.by_index(i) else {
            continue;
        };
        let Some(relative) = file.name().strip_prefix(app_dir) else {
            continue;
        };
        if relative.contains('/') || !relative.ends_with(".png") {
            continue;
        }
        pngs.push((relative.to_string(), file.size()));
    }

    for name in names.iter().rev() {
        let best = pngs
            .iter()
            .filter(|(relative, _)| relative.starts_with(name.as_str()))
            .max_by_key(|(_, size)| *size);
        if let Some((relative, _)) = best {
            debug!(icon = %relative, "selected bundle icon");
            return Some(format!("{app_dir}{relative}"));
        }
    }
    None
}

/// Read `embedded.mobileprovision`; a bundle without one yields defaults
fn read_provisioning<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    app_dir: &str,
) -> Result<IosMetadata> {
    let contents = match read_entry(archive, &format!("{app_dir}embedded.mobileprovision")) {
        Ok(contents) => contents,
        Err(InspectError::Zip(ZipError::FileNotFound)) => {
            debug!("bundle has no embedded.mobileprovision");
            return Ok(IosMetadata::default());
        }
        Err(e) => return Err(e),
    };

    let Some(xml) = embedded_plist(&contents) else {
        debug!("embedded.mobileprovision carries no XML plist");
        return Ok(IosMetadata::default());
    };

    let profile: Value = plist::from_reader(Cursor::new(xml))?;
    let Some(profile) = profile.as_dictionary() else {
        return Ok(IosMetadata::default());
    };

    let allow_device = profile
        .get("ProvisionedDevices")
        .and_then(|v| v.as_array())
        .map(|devices| {
            devices
                .iter()
                .filter_map(|v| v.as_string())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(IosMetadata {
        distribution: distribution_type(profile),
        allow_device,
        team_name: dict_string(profile, "TeamName").unwrap_or_default(),
    })
}

/// The profile is a CMS envelope around an XML plist; slice the plist out
fn embedded_plist(contents: &[u8]) -> Option<&[u8]> {
    let start = find_subslice(contents, PROVISION_XML_START)?;
    let end = start
        + find_subslice(&contents[start..], PROVISION_XML_END)?
        + PROVISION_XML_END.len();
    Some(&contents[start..end])
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn distribution_type(profile: &Dictionary) -> DistributionType {
    if profile
        .get("ProvisionsAllDevices")
        .and_then(|v| v.as_boolean())
        .unwrap_or(false)
    {
        return DistributionType::Enterprise;
    }

    let has_devices = profile
        .get("ProvisionedDevices")
        .and_then(|v| v.as_array())
        .is_some_and(|devices| !devices.is_empty());

    let debuggable = profile
        .get("Entitlements")
        .and_then(|v| v.as_dictionary())
        .and_then(|d| d.get("get-task-allow"))
        .and_then(|v| v.as_boolean())
        .unwrap_or(false);

    match (has_devices, debuggable) {
        (true, true) => DistributionType::Development,
        (true, false) => DistributionType::AdHoc,
        (false, _) => DistributionType::AppStore,
    }
}

//! Zip-based installer package inspector

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{InspectError, Result};
use crate::traits::PackageInspector;
use crate::types::PackageMetadata;
use crate::{android, ios};

/// Default tool used to read Android manifests
pub const DEFAULT_AAPT_PATH: &str = "aapt2";

/// Largest archive entry read into memory (plists, profiles, icons)
pub const MAX_ENTRY_BYTES: u64 = 8 * 1024 * 1024;

/// Kind of package found inside a zip archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PackageKind {
    Android,
    /// iOS bundle; `app_dir` is the `Payload/<App>.app/` prefix
    Ios { app_dir: String },
}

/// Inspector for `.apk` and `.ipa` files
///
/// Both formats are zip archives; the platform is decided by content, never
/// by file name.
#[derive(Debug, Clone)]
pub struct ArchiveInspector {
    aapt_path: PathBuf,
}

impl ArchiveInspector {
    /// Create an inspector that looks up `aapt2` on `PATH`
    pub fn new() -> Self {
        Self {
            aapt_path: PathBuf::from(DEFAULT_AAPT_PATH),
        }
    }

    /// Use a specific `aapt2` binary for Android packages
    pub fn with_aapt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.aapt_path = path.into();
        self
    }
}

impl Default for ArchiveInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageInspector for ArchiveInspector {
    fn inspect(&self, path: &Path) -> Result<PackageMetadata> {
        let size = std::fs::metadata(path)?.len();
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file).map_err(|e| match e {
            ZipError::Io(io) => InspectError::Io(io),
            other => InspectError::UnknownFormat(other.to_string()),
        })?;

        let kind = detect_kind(&archive).ok_or_else(|| {
            InspectError::UnknownFormat(
                "archive contains neither AndroidManifest.xml nor Payload/*.app/Info.plist"
                    .to_string(),
            )
        })?;
        debug!(path = %path.display(), kind = ?kind, "detected package kind");

        let metadata = match kind {
            PackageKind::Ios { app_dir } => ios::inspect_ipa(&mut archive, &app_dir, size)?,
            PackageKind::Android => {
                android::inspect_apk(&self.aapt_path, path, &mut archive, size)?
            }
        };

        info!(
            platform = %metadata.platform,
            bundle_id = %metadata.bundle_id,
            version = %metadata.version,
            has_icon = metadata.icon.is_some(),
            "inspected package"
        );
        Ok(metadata)
    }
}

/// Work out which platform an archive belongs to
pub(crate) fn detect_kind<R: Read + Seek>(archive: &ZipArchive<R>) -> Option<PackageKind> {
    let mut android = false;
    for name in archive.file_names() {
        if let Some(app_dir) = ios_app_dir(name) {
            return Some(PackageKind::Ios {
                app_dir: app_dir.to_string(),
            });
        }
        if name == "AndroidManifest.xml" {
            android = true;
        }
    }
    android.then_some(PackageKind::Android)
}

/// `Payload/Demo.app/Info.plist` -> `Payload/Demo.app/`
fn ios_app_dir(name: &str) -> Option<&str> {
    let app_dir = name.strip_suffix("Info.plist")?;
    let bundle = app_dir.strip_prefix("Payload/")?.strip_suffix(".app/")?;
    (!bundle.is_empty() && !bundle.contains('/')).then_some(app_dir)
}

/// Read a whole archive entry into memory
///
/// Entries larger than [`MAX_ENTRY_BYTES`], declared or actual, are
/// rejected before they are buffered.
pub(crate) fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    let declared = file.size();
    if declared > MAX_ENTRY_BYTES {
        return Err(entry_too_large(name, declared));
    }

    let mut contents = Vec::with_capacity(declared as usize);
    (&mut file)
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut contents)?;
    if contents.len() as u64 > MAX_ENTRY_BYTES {
        return Err(entry_too_large(name, contents.len() as u64));
    }
    Ok(contents)
}

fn entry_too_large(name: &str, size: u64) -> InspectError {
    InspectError::Parse(format!(
        "entry too large: {} ({} bytes, limit {})",
        name, size, MAX_ENTRY_BYTES
    ))
}

/// Decode an icon entry, giving up quietly when the bytes are not a raster
/// image this build can read
pub(crate) fn decode_icon<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Option<DynamicImage> {
    let bytes = match read_entry(archive, name) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(entry = name, error = %e, "icon entry unreadable");
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(icon) => Some(icon),
        Err(e) => {
            debug!(entry = name, error = %e, "icon entry is not a decodable image");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::io::Cursor;

    fn archive_of(bytes: Vec<u8>) -> ZipArchive<Cursor<Vec<u8>>> {
        ZipArchive::new(Cursor::new(bytes)).expect("open fixture archive")
    }

    #[test]
    fn test_ios_app_dir() {
        assert_eq!(
            ios_app_dir("Payload/Demo.app/Info.plist"),
            Some("Payload/Demo.app/")
        );
        assert_eq!(
            ios_app_dir("Payload/Demo.app/Frameworks/X.framework/Info.plist"),
            None
        );
        assert_eq!(ios_app_dir("Demo.app/Info.plist"), None);
        assert_eq!(ios_app_dir("Payload/.app/Info.plist"), None);
    }

    #[test]
    fn test_detect_kind() {
        let ipa = fixtures::IpaFixture::default().build().expect("build ipa");
        assert_eq!(
            detect_kind(&archive_of(ipa)),
            Some(PackageKind::Ios {
                app_dir: "Payload/Demo.app/".to_string()
            })
        );

        let apk = fixtures::apk_stub().expect("build apk");
        assert_eq!(detect_kind(&archive_of(apk)), Some(PackageKind::Android));

        let plain = fixtures::plain_zip().expect("build zip");
        assert_eq!(detect_kind(&archive_of(plain)), None);
    }

    #[test]
    fn test_inspect_rejects_non_zip_as_unknown_format() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, b"definitely not an installer").unwrap();

        let err = ArchiveInspector::new().inspect(&path).unwrap_err();
        assert!(err.is_unknown_format(), "unexpected error: {err}");
    }

    #[test]
    fn test_inspect_rejects_unrelated_zip_as_unknown_format() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bundle.zip");
        std::fs::write(&path, fixtures::plain_zip().unwrap()).unwrap();

        let err = ArchiveInspector::new().inspect(&path).unwrap_err();
        assert!(err.is_unknown_format(), "unexpected error: {err}");
    }

    #[test]
    fn test_inspect_missing_file_is_io_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = ArchiveInspector::new()
            .inspect(&temp.path().join("missing.ipa"))
            .unwrap_err();
        assert!(matches!(err, InspectError::Io(_)));
    }

    #[test]
    fn test_inspect_ipa_ignores_file_name() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("0123456789abcdef");
        std::fs::write(&path, fixtures::IpaFixture::default().build().unwrap()).unwrap();

        let metadata = ArchiveInspector::new().inspect(&path).unwrap();
        assert_eq!(metadata.bundle_id, "com.example.demo");
        assert_eq!(metadata.size, std::fs::metadata(&path).unwrap().len());
    }

    /// A single stored entry whose headers claim `declared` uncompressed bytes
    fn zip_with_declared_size(name: &str, data: &[u8], declared: u32) -> Vec<u8> {
        let name_len = name.len() as u16;
        let mut out = Vec::new();

        // Local file header
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0x0021u16.to_le_bytes()); // mod date, 1980-01-01
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra length
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        // Central directory
        let cd_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version made by
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0x0021u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra length
        out.extend_from_slice(&0u16.to_le_bytes()); // comment length
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name.as_bytes());
        let cd_size = out.len() as u32 - cd_offset;

        // End of central directory
        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn test_read_entry_rejects_inflated_declared_size() {
        let bytes = zip_with_declared_size("Payload/X.app/Info.plist", b"<plist/>", 0x7fff_ffff);
        let mut archive = archive_of(bytes);

        let err = read_entry(&mut archive, "Payload/X.app/Info.plist").unwrap_err();
        assert!(matches!(err, InspectError::Parse(_)), "got {err}");
        assert!(err.to_string().contains("entry too large"));
    }

    #[test]
    fn test_inspect_ipa_with_inflated_info_plist_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("crafted.ipa");
        let bytes = zip_with_declared_size("Payload/X.app/Info.plist", b"<plist/>", 0x7fff_ffff);
        std::fs::write(&path, bytes).unwrap();

        let err = ArchiveInspector::new().inspect(&path).unwrap_err();
        assert!(err.to_string().contains("entry too large"), "got {err}");
        assert!(!err.is_unknown_format());
    }
}

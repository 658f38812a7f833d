//! Package download into temporary storage

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::error::{AppscopeError, PipelineError};

/// Longest extension kept when `preserve_extension` is on
const MAX_EXTENSION_LEN: usize = 8;

/// A downloaded package on local disk
///
/// The file is removed when the guard is dropped, whichever way the request
/// ends.
#[derive(Debug)]
pub struct TempPackage {
    path: PathBuf,
    size: u64,
}

impl TempPackage {
    /// Local path of the package
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for TempPackage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary package"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove temporary package"
            ),
        }
    }
}

/// Downloads packages to uniquely named temporary files
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    temp_dir: PathBuf,
    preserve_extension: bool,
    max_bytes: Option<u64>,
}

impl Fetcher {
    /// Build a fetcher from download configuration
    pub fn new(config: &DownloadConfig) -> Result<Self, AppscopeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("appscope/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let temp_dir = config.resolved_temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            client,
            temp_dir,
            preserve_extension: config.preserve_extension,
            max_bytes: config.size_limit(),
        })
    }

    /// Local file a URL is downloaded to: the MD5 of the URL, optionally
    /// followed by the URL path's extension
    pub fn local_path_for(&self, url: &str) -> PathBuf {
        let mut name = format!("{:x}", md5::compute(url.as_bytes()));
        if self.preserve_extension {
            if let Some(ext) = url_extension(url) {
                name.push('.');
                name.push_str(&ext);
            }
        }
        self.temp_dir.join(name)
    }

    /// Download `url` into its temporary file
    pub async fn fetch(&self, url: &str) -> Result<TempPackage, PipelineError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::DownloadFailed(format!(
                "unexpected HTTP status {} from {}",
                status, url
            )));
        }

        if let (Some(limit), Some(length)) = (self.max_bytes, response.content_length()) {
            if length > limit {
                return Err(size_limit_error(limit));
            }
        }

        let path = self.local_path_for(url);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| download_io_error(&path, e))?;
        let mut package = TempPackage { path, size: 0 };

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::DownloadFailed(e.to_string()))?
        {
            package.size += chunk.len() as u64;
            if let Some(limit) = self.max_bytes {
                if package.size > limit {
                    return Err(size_limit_error(limit));
                }
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| download_io_error(&package.path, e))?;
        }
        file.flush()
            .await
            .map_err(|e| download_io_error(&package.path, e))?;

        info!(
            url,
            path = %package.path.display(),
            bytes = package.size,
            "downloaded package"
        );
        Ok(package)
    }
}

fn size_limit_error(limit: u64) -> PipelineError {
    PipelineError::DownloadFailed(format!("package exceeds size limit of {} bytes", limit))
}

fn download_io_error(path: &Path, error: std::io::Error) -> PipelineError {
    PipelineError::DownloadFailed(format!("failed to write {}: {}", path.display(), error))
}

/// Lowercased extension of the URL's path, if it looks like one
fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let file_name = parsed.path_segments()?.last()?.to_string();
    let ext = Path::new(&file_name).extension()?.to_str()?;
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

//! Resolution of `--document-path` to a local configuration root
//!
//! The configuration tree can be a local directory, a local gzip tarball,
//! or an http(s) URL to a gzip tarball. Archives are unpacked into the
//! run's work directory.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::paths;

/// Maximum size of a downloaded tarball (100 MB)
const MAX_DOWNLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Where the configuration tree comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// A local directory, used in place
    Directory(PathBuf),
    /// A local .tar.gz
    Tarball(PathBuf),
    /// An http(s) URL to a .tar.gz
    Url(String),
}

/// Options for fetching and unpacking archives
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Sent verbatim as the `Authorization` header when downloading
    pub http_auth_token: Option<String>,
    /// Directory inside the archive to use as the root
    pub tar_dir: Option<String>,
}

impl DocumentSource {
    /// Classify a `--document-path` value.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("Please specify --document-path");
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Url(raw.to_string()));
        }

        let path = paths::expand(raw);
        if path.is_dir() {
            Ok(Self::Directory(path))
        } else if path.is_file() {
            Ok(Self::Tarball(path))
        } else {
            bail!("Document path does not exist: {}", path.display())
        }
    }

    /// Whether resolving this source writes into the work directory
    pub fn needs_work_dir(&self) -> bool {
        !matches!(self, Self::Directory(_))
    }

    /// Produce the local configuration root.
    pub fn resolve(&self, work_dir: &Path, opts: &FetchOptions) -> Result<PathBuf> {
        match self {
            Self::Directory(path) => {
                if opts.tar_dir.is_some() {
                    log::warn!("--tar-dir is ignored for directory document paths");
                }
                Ok(path.clone())
            }
            Self::Tarball(path) => {
                let data = fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                unpack_targz(&data, work_dir)
                    .with_context(|| format!("Failed to extract {}", path.display()))?;
                select_root(work_dir, opts.tar_dir.as_deref())
            }
            Self::Url(url) => {
                let data = download(url, opts.http_auth_token.as_deref())?;
                unpack_targz(&data, work_dir)
                    .with_context(|| format!("Failed to extract archive from {url}"))?;
                select_root(work_dir, opts.tar_dir.as_deref())
            }
        }
    }
}

/// Download a tarball.
fn download(url: &str, auth_token: Option<&str>) -> Result<Vec<u8>> {
    log::info!("Downloading {url}");
    let agent = ureq::Agent::new_with_defaults();

    let mut request = agent.get(url).header("User-Agent", "vaultwright");
    if let Some(token) = auth_token {
        request = request.header("Authorization", token);
    }

    let mut response = request
        .call()
        .with_context(|| format!("Failed to download {url}"))?;

    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD_SIZE)
        .read_to_vec()
        .context("Failed to read response body")?;

    log::debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes)
}

/// Unpack a .tar.gz into `dest`.
fn unpack_targz(data: &[u8], dest: &Path) -> Result<()> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let decoder = GzDecoder::new(data);
    let mut archive = Archive::new(decoder);
    archive.unpack(dest)?;
    Ok(())
}

/// Pick the configuration root inside an unpacked archive.
///
/// With `tar_dir`, that directory. Otherwise the single top-level directory
/// if there is exactly one, else the archive root.
fn select_root(extracted: &Path, tar_dir: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = tar_dir {
        let root = extracted.join(dir.trim_matches('/'));
        if !root.is_dir() {
            bail!("Directory '{dir}' not found in archive");
        }
        return Ok(root);
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(extracted).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    if dirs.len() == 1 {
        let root = dirs.remove(0);
        log::debug!("Using single archive directory {}", root.display());
        Ok(root)
    } else {
        log::debug!("Archive has {} top-level directories, using its root", dirs.len());
        Ok(extracted.to_path_buf())
    }
}

// ============================================================================
// Tests
// ============================================================================

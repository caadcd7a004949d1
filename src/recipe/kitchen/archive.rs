// src/recipe/kitchen/archive.rs

//! Source archive download and extraction

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::{debug, info};
use xz2::read::XzDecoder;

/// Connection timeout; transfer time is unbounded
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Download a URL into `dest`, streaming the body
pub fn download_file(url: &str, dest: &mut File) -> Result<u64> {
    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(None)
        .build()
        .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Error::DownloadError(format!("Failed to download {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::DownloadError(format!(
            "Failed to download {url}: HTTP {}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = if total_size > 0 {
        ProgressBar::new(total_size)
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:40}] {bytes}/{total_bytes} ({eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(url.split('/').next_back().unwrap_or(url).to_string());

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| Error::DownloadError(format!("Failed to read response: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        dest.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::DownloadError(format!("Failed to write data: {e}")))?;

        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    pb.finish_and_clear();
    info!("Downloaded {} bytes from {}", downloaded, url);
    Ok(downloaded)
}

/// Compression wrapping the tarball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TarCompression {
    None,
    Gzip,
    Xz,
}

impl TarCompression {
    fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
            Some(Self::Xz)
        } else if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
            Some(Self::Gzip)
        } else if filename.ends_with(".tar") {
            Some(Self::None)
        } else {
            None
        }
    }
}

/// Extract an archive into `dest`, dropping the top-level directory
///
/// Supports: .tar.xz, .txz, .tar.gz, .tgz, .tar
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let compression = TarCompression::from_filename(filename)
        .ok_or_else(|| Error::ExtractionError(format!("Unknown archive format: {}", filename)))?;

    let file = File::open(archive)
        .map_err(|e| Error::ExtractionError(format!("Failed to open {}: {}", archive.display(), e)))?;
    let reader = BufReader::new(file);

    let stream: Box<dyn Read> = match compression {
        TarCompression::None => Box::new(reader),
        TarCompression::Gzip => Box::new(GzDecoder::new(reader)),
        TarCompression::Xz => Box::new(XzDecoder::new(reader)),
    };

    fs::create_dir_all(dest)?;
    let count = unpack_stripped(Archive::new(stream), dest)
        .map_err(|e| Error::ExtractionError(format!("Failed to extract {}: {}", filename, e)))?;

    if count == 0 {
        return Err(Error::ExtractionError(format!("Archive {} is empty", filename)));
    }

    info!("Extracted {} entries to {}", count, dest.display());
    Ok(count)
}

fn unpack_stripped<R: Read>(mut archive: Archive<R>, dest: &Path) -> std::io::Result<usize> {
    let mut count = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        // Strip the first component (e.g., Python-3.12.7/)
        let stripped: PathBuf = path.components().skip(1).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }

        if stripped
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unsafe path in archive: {}", path.display()),
            ));
        }

        let dest_path = dest.join(&stripped);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&dest_path)?;
        count += 1;
    }

    debug!("Unpacked {} entries", count);
    Ok(count)
}

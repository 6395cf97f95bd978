use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("download: invalid filename {0:?}")]
    InvalidFilename(String),
    #[error("download: request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("download: server returned {0}")]
    Status(StatusCode),
    #[error("download: {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

fn io_error(context: &'static str) -> impl FnOnce(io::Error) -> DownloadError {
    move |source| DownloadError::Io { context, source }
}

pub struct Downloader {
    client: Client,
    dir: PathBuf,
}

impl Downloader {
    pub fn new(dir: PathBuf, http_client: Option<Client>) -> Result<Self> {
        let client = match http_client {
            Some(client) => client,
            None => Client::builder()
                .timeout(Duration::from_secs(5 * 60))
                .build()
                .context("download: build http client")?,
        };
        Ok(Self { client, dir })
    }

    pub fn download(&self, url: &str, filename: &str) -> Result<PathBuf, DownloadError> {
        if !is_plain_filename(filename) {
            return Err(DownloadError::InvalidFilename(filename.to_string()));
        }
        fs::create_dir_all(&self.dir).map_err(io_error("create download directory"))?;

        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status()));
        }

        let mut partial = tempfile::Builder::new()
            .prefix(".reactlyve-")
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(io_error("create temporary file"))?;
        let written = response
            .copy_to(partial.as_file_mut())
            .map_err(DownloadError::Request)?;

        let target = self.dir.join(filename);
        partial
            .persist(&target)
            .map_err(|err| DownloadError::Io {
                context: "move download into place",
                source: err.error,
            })?;
        debug!(url, bytes = written, path = %target.display(), "download complete");
        Ok(target)
    }

    pub fn download_best_effort(&self, url: &str, filename: &str) -> Option<PathBuf> {
        match self.download(url, filename) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(url, filename, error = %err, "download failed");
                None
            }
        }
    }
}

fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && Path::new(filename).file_name().and_then(|name| name.to_str()) == Some(filename)
}

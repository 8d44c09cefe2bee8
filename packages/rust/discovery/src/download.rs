//! Bulletin PDF download.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use veglytics_shared::{BULLETIN_DATE_FORMAT, BulletinRef, Result, VeglyticsError};

use crate::BulletinClient;

const FILE_PREFIX: &str = "prices_";
const FILE_SUFFIX: &str = ".pdf";

/// A bulletin persisted to disk.
#[derive(Debug, Clone)]
pub struct DownloadedBulletin {
    pub bulletin: BulletinRef,
    pub path: PathBuf,
    /// Hex SHA-256 of the downloaded bytes.
    pub sha256: String,
    pub size_bytes: usize,
}

/// Deterministic file name for a bulletin date: `prices_DD-MM-YYYY.pdf`.
pub fn bulletin_file_name(date: NaiveDate) -> String {
    format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format(BULLETIN_DATE_FORMAT))
}

/// Recover the bulletin date from a path produced by [`bulletin_file_name`].
pub fn date_from_file_name(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    let raw = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(raw, BULLETIN_DATE_FORMAT).ok()
}

impl BulletinClient {
    /// Download `bulletin` into `dest_dir`, overwriting any earlier copy.
    #[instrument(skip_all, fields(date = %bulletin.date_label()))]
    pub async fn download(
        &self,
        bulletin: &BulletinRef,
        dest_dir: &Path,
    ) -> Result<DownloadedBulletin> {
        let url = bulletin.url.as_str();
        debug!(url, "downloading bulletin");

        let response = self
            .client
            .get(url)
            .timeout(self.opts.download_timeout)
            .send()
            .await
            .map_err(|e| VeglyticsError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VeglyticsError::Network(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VeglyticsError::Network(format!("{url}: failed to read body: {e}")))?;

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| VeglyticsError::io(dest_dir, e))?;
        let path = dest_dir.join(bulletin_file_name(bulletin.publication_date));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| VeglyticsError::io(&path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        info!(path = %path.display(), bytes = bytes.len(), "bulletin saved");

        Ok(DownloadedBulletin {
            bulletin: bulletin.clone(),
            path,
            sha256,
            size_bytes: bytes.len(),
        })
    }
}

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    async_trait::async_trait,
    pinsaver_config::{DownloaderConfig, PinsaverConfig},
    tokio::process::Command,
    tracing::{debug, warn},
};

use super::{Extraction, MediaReference, ResolvedResource, Strategy};
use crate::{
    asset::{FetchedAsset, TempRoot},
    error::{Error, Result},
};

/// Stem of every file the downloader is told to write.
const OUTPUT_STEM: &str = "media";

/// Runs an external media downloader (yt-dlp by default) into a private temp
/// directory.
///
/// The tool has no machine-readable "nothing to download" status, so that
/// outcome is recognised by substring markers in its diagnostic output. The
/// markers are configurable because tool releases reword them.
pub struct ExternalDownloader {
    program: String,
    args: Vec<String>,
    format: String,
    timeout: Duration,
    no_format_markers: Vec<String>,
    temp_root: TempRoot,
}

impl ExternalDownloader {
    #[must_use]
    pub fn new(config: &DownloaderConfig, temp_root: TempRoot) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            format: config.format.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            no_format_markers: config.no_format_markers.clone(),
            temp_root,
        }
    }

    #[must_use]
    pub fn from_config(config: &PinsaverConfig) -> Self {
        Self::new(
            &config.downloader,
            TempRoot::new(config.fetch.temp_dir.clone()),
        )
    }

    fn command(&self, output_template: &Path, url: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("-f")
            .arg(&self.format)
            .arg("-o")
            .arg(output_template)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn reports_no_format(&self, diagnostics: &str) -> bool {
        self.no_format_markers
            .iter()
            .any(|marker| !marker.is_empty() && diagnostics.contains(marker.as_str()))
    }
}

#[async_trait]
impl Strategy for ExternalDownloader {
    fn name(&self) -> &str {
        "external_downloader"
    }

    async fn attempt(&self, resource: &ResolvedResource) -> Result<Extraction> {
        let dir = self.temp_root.dir().await?;
        let template = dir.path().join(format!("{OUTPUT_STEM}.%(ext)s"));
        debug!(program = %self.program, url = %resource.url, dir = %dir.path().display(), "running downloader");

        let output = tokio::time::timeout(
            self.timeout,
            self.command(&template, resource.url.as_str()).output(),
        )
        .await
        .map_err(|_| Error::timeout(self.program.as_str(), self.timeout))?
        .map_err(|e| Error::external(format!("failed to run {}", self.program), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostics = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout)
            } else {
                stderr
            };
            if self.reports_no_format(&diagnostics) {
                debug!(program = %self.program, "downloader found no format");
                return Ok(Extraction::NotFound);
            }
            warn!(program = %self.program, code = ?output.status.code(), "downloader failed");
            return Err(Error::tool(
                self.program.as_str(),
                output.status.code(),
                &diagnostics,
            ));
        }

        let Some((file, size)) = largest_output(dir.path()).await? else {
            debug!(program = %self.program, "downloader exited cleanly but wrote nothing");
            return Ok(Extraction::NotFound);
        };
        debug!(file = %file.display(), bytes = size, "downloader produced media");
        Ok(Extraction::Found(MediaReference::local(
            FetchedAsset::from_temp_dir(dir, file, size),
        )))
    }
}

/// The biggest finished `media.*` file in `dir`. Sidecar files (thumbnails,
/// info json) are smaller than the media, and `.part` files are unfinished.
async fn largest_output(dir: &Path) -> Result<Option<(PathBuf, u64)>> {
    let prefix = format!("{OUTPUT_STEM}.");
    let mut best: Option<(PathBuf, u64)> = None;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(&prefix) || name.ends_with(".part") {
            continue;
        }
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        if best.as_ref().is_none_or(|(_, size)| meta.len() > *size) {
            best = Some((entry.path(), meta.len()));
        }
    }
    Ok(best)
}

//! Self-update against the tool's source repository.
//!
//! File plumbing only: a `.version` marker in the install directory holds a
//! short revision identifier, the latest commit on `master` is the remote
//! truth, and installing means downloading the source archive, backing up the
//! install directory, and swapping the unpacked tree in.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const DEFAULT_REPO_URL: &str = "https://github.com/meetbrief/meetbrief";
const VERSION_MARKER: &str = ".version";
const SHORT_SHA_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub repo_url: String,
    pub install_dir: PathBuf,
}

impl UpdateConfig {
    pub fn detect(repo_override: Option<String>, dir_override: Option<PathBuf>) -> Result<Self> {
        let repo_url = repo_override
            .or_else(|| std::env::var("MEETBRIEF_REPO_URL").ok())
            .unwrap_or_else(|| DEFAULT_REPO_URL.to_string());
        let install_dir = match dir_override
            .or_else(|| std::env::var("MEETBRIEF_INSTALL_DIR").ok().map(PathBuf::from))
        {
            Some(dir) => dir,
            None => std::env::current_exe()
                .context("Failed to resolve current executable")?
                .parent()
                .context("Executable has no parent directory")?
                .to_path_buf(),
        };
        Ok(Self {
            repo_url,
            install_dir,
        })
    }

    pub fn marker_file(&self) -> PathBuf {
        self.install_dir.join(VERSION_MARKER)
    }

    /// Revision recorded by the last install, or `unknown` when the marker
    /// is absent or unreadable.
    pub fn current_revision(&self) -> String {
        std::fs::read_to_string(self.marker_file())
            .map(|raw| raw.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub current: String,
    pub latest: String,
    /// First line of the latest commit message.
    pub subject: String,
}

impl UpdateReport {
    pub fn has_update(&self) -> bool {
        self.current != self.latest
    }
}

pub struct UpdateEngine {
    client: Client,
    config: UpdateConfig,
}

impl UpdateEngine {
    pub fn new(config: UpdateConfig) -> Result<Self> {
        // The GitHub API rejects requests without a user agent.
        let client = Client::builder()
            .user_agent(concat!("meetbrief/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    /// Compares the local marker against the tip of `master`.
    pub async fn check(&self) -> Result<UpdateReport> {
        let api_url = format!(
            "{}/commits/master",
            self.config
                .repo_url
                .replacen("github.com", "api.github.com/repos", 1)
        );
        debug!("Checking latest revision at {api_url}");
        let commit: CommitResponse = self
            .client
            .get(&api_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode commit response")?;
        let latest: String = commit.sha.chars().take(SHORT_SHA_LEN).collect();
        let subject = commit
            .commit
            .message
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(UpdateReport {
            current: self.config.current_revision(),
            latest,
            subject,
        })
    }

    /// Downloads the source archive and swaps the install directory for the
    /// unpacked tree, keeping the previous tree as `<dir>.backup`.
    pub async fn install(&self) -> Result<UpdateReport> {
        let report = self.check().await?;
        if !report.has_update() {
            info!("Already on the latest revision ({})", report.current);
            return Ok(report);
        }

        let archive_url = format!("{}/archive/refs/heads/master.tar.gz", self.config.repo_url);
        info!("Downloading {archive_url}");
        let staging = tempfile::tempdir().context("Failed to create staging directory")?;
        let archive_path = staging.path().join("update.tar.gz");
        let bytes = self
            .client
            .get(&archive_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        std::fs::write(&archive_path, &bytes).context("Failed to write downloaded archive")?;

        extract_archive(&archive_path, staging.path()).await?;
        let unpacked = locate_unpacked_tree(staging.path())?;

        self.replace_install_dir(&unpacked)?;
        std::fs::write(self.config.marker_file(), format!("{}\n", report.latest))
            .context("Failed to write version marker")?;

        info!(
            "Installed revision {} (backup at {})",
            report.latest,
            backup_dir(&self.config.install_dir).display()
        );
        Ok(report)
    }

    fn replace_install_dir(&self, unpacked: &Path) -> Result<()> {
        let install_dir = &self.config.install_dir;
        let backup = backup_dir(install_dir);
        if backup.exists() {
            std::fs::remove_dir_all(&backup).context("Failed to remove previous backup")?;
        }
        if install_dir.exists() {
            copy_tree(install_dir, &backup).context("Failed to back up install directory")?;
            std::fs::remove_dir_all(install_dir).context("Failed to clear install directory")?;
        }
        copy_tree(unpacked, install_dir).context("Failed to install new tree")?;
        Ok(())
    }
}

fn backup_dir(install_dir: &Path) -> PathBuf {
    let name = install_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "meetbrief".to_string());
    install_dir.with_file_name(format!("{name}.backup"))
}

async fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let archive = archive_path.to_path_buf();
    let output = dest.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = File::open(&archive)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        archive
            .unpack(&output)
            .context("Failed to unpack update archive")?;
        Ok(())
    })
    .await?
}

/// GitHub archives unpack to a single `<repo>-master` directory.
fn locate_unpacked_tree(root: &Path) -> Result<PathBuf> {
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            return Ok(entry.path());
        }
    }
    Err(anyhow!("Downloaded archive did not contain a source tree"))
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("Walked path outside the source tree")?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

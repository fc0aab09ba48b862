//! On-disk session archive
//!
//! Sessions exported from the upstream timing provider are stored as
//! `<root>/<year>/<event_key>/<session_name>.json`, optionally zstd-compressed
//! as `.json.zst`. Path components are slugged (lowercase, spaces to
//! underscores). An empty file marks an export that has not finished yet.

use anyhow::Context;
use paddock_core::model::SessionData;
use paddock_core::source::{SessionKey, SessionSource, SourceError};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const ZSTD_LEVEL: i32 = 3;

pub struct ArchiveSource {
    root: PathBuf,
}

impl ArchiveSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory, e.g. `~/.local/share/paddock/sessions`
    pub fn default_root() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("paddock").join("sessions"))
    }

    fn session_dir(&self, key: &SessionKey) -> Option<PathBuf> {
        Some(self.root.join(key.year.to_string()).join(slug(&key.event_key)?))
    }

    fn candidates(&self, key: &SessionKey) -> Option<[PathBuf; 2]> {
        let dir = self.session_dir(key)?;
        let name = slug(&key.session_name)?;
        Some([
            dir.join(format!("{}.json", name)),
            dir.join(format!("{}.json.zst", name)),
        ])
    }

    /// Write a session as compressed JSON, replacing any previous export
    pub fn store(&self, key: &SessionKey, data: &SessionData) -> anyhow::Result<PathBuf> {
        let [plain, compressed] = self
            .candidates(key)
            .with_context(|| format!("invalid session key {}", key))?;
        if let Some(dir) = compressed.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let json = serde_json::to_vec(data)?;
        let bytes = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;
        fs::write(&compressed, bytes).with_context(|| format!("writing {}", compressed.display()))?;
        if plain.exists() {
            fs::remove_file(&plain)?;
        }

        info!("Archived session {} to {}", key, compressed.display());
        Ok(compressed)
    }
}

impl SessionSource for ArchiveSource {
    fn name(&self) -> &str {
        "Archive"
    }

    fn load(&self, key: &SessionKey) -> Result<SessionData, SourceError> {
        let candidates = self
            .candidates(key)
            .ok_or_else(|| SourceError::NotFound(key.to_string()))?;
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| SourceError::NotFound(key.to_string()))?;

        let raw = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        if raw.is_empty() {
            return Err(SourceError::NotLoaded(key.to_string()));
        }

        let json = if path.extension().is_some_and(|e| e == "zst") {
            zstd::decode_all(raw.as_slice())
                .with_context(|| format!("decompressing {}", path.display()))?
        } else {
            raw
        };

        let data: SessionData = serde_json::from_slice(&json)
            .with_context(|| format!("parsing session data in {}", path.display()))?;
        debug!("Loaded {} laps from {}", data.laps.len(), path.display());
        Ok(data)
    }
}

/// Path-safe form of a request identifier; None if it could escape the root
fn slug(value: &str) -> Option<String> {
    let slug: String = value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let unsafe_chars = slug.contains(['/', '\\']) || slug.contains("..");
    if slug.is_empty() || unsafe_chars {
        None
    } else {
        Some(slug)
    }
}

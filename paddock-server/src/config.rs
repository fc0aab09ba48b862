//! Server configuration read from the environment

use anyhow::{bail, Context, Result};
use paddock_core::EngineConfig;
use paddock_core::SessionSource;
use paddock_sources::{ArchiveSource, DemoSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_ADDR: &str = "0.0.0.0:9100";

/// Which backend answers session loads
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Demo,
    Archive(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub source: SourceKind,
    pub engine_config: Option<PathBuf>,
}

impl ServerConfig {
    /// Read `PADDOCK_ADDR`, `PADDOCK_SOURCE`, `PADDOCK_ARCHIVE_DIR` and
    /// `PADDOCK_ENGINE_CONFIG`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr_text = lookup("PADDOCK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_text
            .parse()
            .with_context(|| format!("invalid PADDOCK_ADDR {:?}", addr_text))?;

        let source = match lookup("PADDOCK_SOURCE").as_deref().map(str::trim) {
            None | Some("") | Some("demo") => SourceKind::Demo,
            Some("archive") => {
                let root = match lookup("PADDOCK_ARCHIVE_DIR") {
                    Some(dir) => PathBuf::from(dir),
                    None => ArchiveSource::default_root()
                        .context("no platform data directory; set PADDOCK_ARCHIVE_DIR")?,
                };
                SourceKind::Archive(root)
            }
            Some(other) => bail!("unknown PADDOCK_SOURCE {:?} (expected demo or archive)", other),
        };

        Ok(Self {
            addr,
            source,
            engine_config: lookup("PADDOCK_ENGINE_CONFIG").map(PathBuf::from),
        })
    }

    pub fn build_source(&self) -> Arc<dyn SessionSource> {
        match &self.source {
            SourceKind::Demo => Arc::new(DemoSource::new()),
            SourceKind::Archive(root) => Arc::new(ArchiveSource::new(root.clone())),
        }
    }

    pub fn load_engine_config(&self) -> Result<EngineConfig> {
        let config = match &self.engine_config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading engine config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

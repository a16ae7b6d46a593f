use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use theocosmos_core::QualityTier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Fixed quality tier; device detection is outside this app's scope.
    pub quality_tier: QualityTier,
    /// Optional path to a corpus JSON; the embedded corpus is used otherwise.
    pub corpus_path: Option<PathBuf>,
    pub show_edges: bool,
    pub show_labels: bool,
    pub show_arrows: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            quality_tier: QualityTier::High,
            corpus_path: None,
            show_edges: true,
            show_labels: true,
            show_arrows: true,
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "theocosmos")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|_| ViewerConfig::default())
}

pub fn save(cfg: &ViewerConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn viewer_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        let cfg = ViewerConfig {
            quality_tier: QualityTier::Low,
            corpus_path: Some(PathBuf::from("/tmp/corpus.json")),
            show_edges: false,
            show_labels: true,
            show_arrows: false,
        };

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_or_malformed_config_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert_eq!(load_or_default_from_path(&missing), ViewerConfig::default());

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "quality_tier = \"ultra\"").expect("write");
        assert_eq!(load_or_default_from_path(&bad), ViewerConfig::default());
    }
}

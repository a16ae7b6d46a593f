use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use theocosmos_core::{NodeId, StudyProgress};

/// On-disk study progress: the spec's get/set/delete key-value collaborator.
/// Entries persisted before timestamps existed carry no `studied_at`; the
/// core backfills those as review-due on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProgressFile {
    entries: Vec<ProgressEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProgressEntry {
    id: String,
    #[serde(default)]
    studied_at: Option<u64>,
}

fn progress_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "theocosmos")?;
    Some(proj.data_dir().join("progress.json"))
}

pub fn load() -> Vec<(NodeId, Option<u64>)> {
    let Some(path) = progress_file_path() else {
        return Vec::new();
    };
    load_from_path(&path)
}

fn load_from_path(path: &Path) -> Vec<(NodeId, Option<u64>)> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let file: ProgressFile = serde_json::from_str(&contents).unwrap_or_default();
    file.entries
        .into_iter()
        .map(|e| (NodeId(e.id), e.studied_at))
        .collect()
}

pub fn save(progress: &StudyProgress) -> anyhow::Result<()> {
    let Some(path) = progress_file_path() else {
        return Err(anyhow::anyhow!("no data directory available"));
    };
    save_to_path(progress, &path)
}

fn save_to_path(progress: &StudyProgress, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create data directory {}", parent.display()))?;
    }
    let mut entries: Vec<ProgressEntry> = progress
        .iter()
        .map(|(id, ts)| ProgressEntry {
            id: id.0.clone(),
            studied_at: Some(ts),
        })
        .collect();
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    let data = serde_json::to_string_pretty(&ProgressFile { entries })
        .context("failed to serialize study progress")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write study progress {}", path.display()))?;
    Ok(())
}

/// Reset-progress action: delete the stored file entirely.
pub fn clear() -> anyhow::Result<()> {
    let Some(path) = progress_file_path() else {
        return Ok(());
    };
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("failed to delete study progress {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(s: &str) -> NodeId {
        NodeId(s.to_string())
    }

    #[test]
    fn progress_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("progress.json");

        let mut progress = StudyProgress::default();
        progress.toggle(&id("christ"), 1_000);
        progress.toggle(&id("trinity"), 2_000);
        save_to_path(&progress, &path).expect("save");

        let mut loaded = load_from_path(&path);
        loaded.sort();
        assert_eq!(
            loaded,
            vec![
                (id("christ"), Some(1_000)),
                (id("trinity"), Some(2_000)),
            ]
        );
    }

    #[test]
    fn legacy_entries_without_timestamps_survive_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("progress.json");
        fs::write(
            &path,
            r#"{"entries": [{"id": "christ"}, {"id": "trinity", "studied_at": 5}]}"#,
        )
        .expect("write");

        let mut loaded = load_from_path(&path);
        loaded.sort();
        assert_eq!(loaded, vec![(id("christ"), None), (id("trinity"), Some(5))]);
    }

    #[test]
    fn missing_or_corrupt_file_yields_empty_progress() {
        let dir = tempdir().expect("tempdir");
        assert!(load_from_path(&dir.path().join("nope.json")).is_empty());

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "not json").expect("write");
        assert!(load_from_path(&bad).is_empty());
    }
}

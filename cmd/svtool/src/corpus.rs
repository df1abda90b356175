//! Filesystem discovery for feature corpora.
//!
//! Features are stored as `.lvf` files; a speaker is a directory holding
//! the files of its utterances. Listings are sorted so runs are
//! reproducible regardless of filesystem order.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// One speaker's directory of feature files.
#[derive(Debug, Clone)]
pub struct SpeakerData {
    pub id: String,
    pub files: Vec<PathBuf>,
    pub enroll: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

fn is_lvf(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "lvf")
}

/// Recursively collects every `.lvf` file under `root`, sorted by path.
pub fn collect_lvf_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("invalid directory: {}", root.display());
    }

    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).with_context(|| format!("read dir {}", dir.display()))? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_lvf(&path) {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn lvf_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_lvf(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Walks `root` treating every directory that directly contains `.lvf`
/// files as one speaker. Returned sorted by directory path.
pub fn collect_speakers(root: &Path) -> Result<Vec<SpeakerData>> {
    if !root.is_dir() {
        bail!("invalid directory: {}", root.display());
    }

    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).with_context(|| format!("read dir {}", dir.display()))? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            }
        }
        dirs.push(dir);
    }
    dirs.sort();

    let mut speakers = Vec::new();
    for dir in dirs {
        let files = lvf_files_in(&dir)?;
        if files.is_empty() {
            continue;
        }
        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        speakers.push(SpeakerData {
            id,
            files,
            enroll: Vec::new(),
            test: Vec::new(),
        });
    }
    Ok(speakers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxid_features::{Feature, save_feature_file};

    fn touch_lvf(path: &Path) {
        save_feature_file(path, &Feature::default()).unwrap();
    }

    #[test]
    fn collects_recursively_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch_lvf(&dir.path().join("b").join("2.lvf"));
        touch_lvf(&dir.path().join("a").join("1.lvf"));
        touch_lvf(&dir.path().join("a").join("0.lvf"));
        std::fs::write(dir.path().join("a").join("skip.txt"), b"x").unwrap();

        let files = collect_lvf_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a/0.lvf", "a/1.lvf", "b/2.lvf"]);
    }

    #[test]
    fn speakers_are_leaf_dirs_with_features() {
        let dir = tempfile::tempdir().unwrap();
        touch_lvf(&dir.path().join("dr1").join("alice").join("u1.lvf"));
        touch_lvf(&dir.path().join("dr1").join("alice").join("u2.lvf"));
        touch_lvf(&dir.path().join("dr2").join("bob").join("u1.lvf"));
        std::fs::create_dir_all(dir.path().join("dr3").join("empty")).unwrap();

        let speakers = collect_speakers(dir.path()).unwrap();
        let ids: Vec<&str> = speakers.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert_eq!(speakers[0].files.len(), 2);
    }

    #[test]
    fn missing_root_fails() {
        assert!(collect_lvf_files(Path::new("/no/such/dir")).is_err());
        assert!(collect_speakers(Path::new("/no/such/dir")).is_err());
    }
}

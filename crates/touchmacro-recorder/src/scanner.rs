//! Discovery of `.mmor` recordings in the places emulators put them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const RECORDING_EXTENSION: &str = "mmor";

/// Recursion cap for full scans; symlink loops stop here.
const MAX_DEPTH: usize = 8;

/// Where MuMu builds keep their operation recordings.
pub const DEFAULT_ROOTS: &[&str] = &[
    "/data/data/com.mumu.store/files/macro",
    "/data/data/com.mumu.store/files/record",
    "/data/data/com.mumu.store/files/optscr",
    "/data/user/0/com.mumu.store/files/macro",
    "/sdcard/MuMu",
    "/sdcard/MuMuSharedFolder",
    "/sdcard/Android/data/com.mumu.store/files",
    "/sdcard/Android/data/com.mumu.cantelope/files",
    "/sdcard/Android/data/com.netease.mumu.cloner/files",
    "/data/local/tmp",
    "/sdcard/Download",
    "/sdcard/Downloads",
    "/sdcard/Documents",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub path: PathBuf,
    /// File name including extension
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl ScanResult {
    fn from_path(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            name: path.file_name()?.to_string_lossy().into_owned(),
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// File name without the recording extension.
    pub fn display_name(&self) -> &str {
        let suffix_len = RECORDING_EXTENSION.len() + 1;
        if self.name.len() > suffix_len && is_recording_name(&self.name) {
            &self.name[..self.name.len() - suffix_len]
        } else {
            &self.name
        }
    }

    pub fn size_string(&self) -> String {
        const KB: f64 = 1024.0;
        match self.size {
            s if s < 1024 => format!("{} B", s),
            s if s < 1024 * 1024 => format!("{:.1} KB", s as f64 / KB),
            s => format!("{:.1} MB", s as f64 / (KB * KB)),
        }
    }
}

#[derive(Debug, Clone)]
struct Root {
    path: PathBuf,
    depth: usize,
}

/// Collects recordings from a list of roots, each file reported once.
#[derive(Debug, Clone, Default)]
pub struct RecordingScanner {
    roots: Vec<Root>,
}

impl RecordingScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scanner over [`DEFAULT_ROOTS`].
    pub fn with_default_roots() -> Self {
        DEFAULT_ROOTS
            .iter()
            .fold(Self::new(), |s, root| s.add_root(*root))
    }

    /// Scan `path` recursively.
    pub fn add_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.roots.push(Root {
            path: path.into(),
            depth: MAX_DEPTH,
        });
        self
    }

    /// Scan `path` and at most `depth - 1` levels below it.
    pub fn add_shallow_root(mut self, path: impl Into<PathBuf>, depth: usize) -> Self {
        self.roots.push(Root {
            path: path.into(),
            depth: depth.min(MAX_DEPTH),
        });
        self
    }

    /// Every root with whether it currently exists.
    pub fn searched_paths(&self) -> Vec<(PathBuf, bool)> {
        self.roots
            .iter()
            .map(|r| (r.path.clone(), r.path.is_dir()))
            .collect()
    }

    pub fn scan(&self) -> Vec<ScanResult> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for root in &self.roots {
            walk(&root.path, root.depth, &mut seen, &mut results);
        }
        info!(roots = self.roots.len(), found = results.len(), "recording scan complete");
        results
    }
}

fn walk(dir: &Path, depth: usize, seen: &mut HashSet<PathBuf>, out: &mut Vec<ScanResult>) {
    if depth == 0 {
        return;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                warn!(dir = %dir.display(), "no permission to scan");
            }
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
            walk(&path, depth - 1, seen, out);
            continue;
        }
        let is_recording = path
            .file_name()
            .map(|n| is_recording_name(&n.to_string_lossy()))
            .unwrap_or(false);
        if !is_recording {
            continue;
        }
        let key = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            continue;
        }
        if let Some(found) = ScanResult::from_path(&path) {
            debug!(path = %path.display(), "found recording");
            out.push(found);
        }
    }
}

fn is_recording_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(RECORDING_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, size: u64) -> ScanResult {
        ScanResult {
            path: PathBuf::from(name),
            name: name.to_string(),
            size,
            modified: None,
        }
    }

    #[test]
    fn display_name_strips_extension() {
        assert_eq!(result("daily.mmor", 0).display_name(), "daily");
        assert_eq!(result("LOUD.MMOR", 0).display_name(), "LOUD");
        assert_eq!(result("notes.txt", 0).display_name(), "notes.txt");
    }

    #[test]
    fn size_strings() {
        assert_eq!(result("a", 512).size_string(), "512 B");
        assert_eq!(result("a", 1536).size_string(), "1.5 KB");
        assert_eq!(result("a", 3 * 1024 * 1024).size_string(), "3.0 MB");
    }

    #[test]
    fn finds_nested_recordings_once() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("top.mmor"), b"x").unwrap();
        fs::write(nested.join("deep.MMOR"), b"xyz").unwrap();
        fs::write(nested.join("ignore.json"), b"{}").unwrap();

        let found = RecordingScanner::new()
            .add_root(dir.path())
            .add_root(dir.path())
            .scan();
        let mut names: Vec<&str> = found.iter().map(ScanResult::display_name).collect();
        names.sort();
        assert_eq!(names, ["deep", "top"]);
    }

    #[test]
    fn shallow_root_limits_depth() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a/one.mmor"), b"1").unwrap();
        fs::write(nested.join("two.mmor"), b"2").unwrap();

        let found = RecordingScanner::new().add_shallow_root(dir.path(), 2).scan();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "one.mmor");
        assert!(found[0].modified.is_some());
    }

    #[test]
    fn missing_roots_are_reported_not_fatal() {
        let scanner = RecordingScanner::new().add_root("/no/such/dir");
        assert!(scanner.scan().is_empty());
        assert_eq!(scanner.searched_paths(), vec![(PathBuf::from("/no/such/dir"), false)]);
    }
}

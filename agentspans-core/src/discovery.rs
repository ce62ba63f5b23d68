//! Locating session streams on disk.
//!
//! Claude Code writes one JSONL stream per session under
//! `~/.claude/projects/[encoded-path]/[session-id].jsonl`. Sidechain
//! transcripts (`agent-*.jsonl`) are a sub-agent's own view of its work and
//! are not sessions, so they are left out.

use crate::error::{Error, Result};
use crate::spans::session_id_from_path;
use std::path::{Path, PathBuf};

/// Glob pattern for session streams, relative to the Claude root.
pub const SESSION_PATTERN: &str = "projects/*/*.jsonl";

/// One stream to reconstruct, with the identifiers the caller attaches to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    pub path: PathBuf,
    /// File stem of the stream
    pub session_id: String,
    /// Encoded project directory the stream lives in
    pub project_id: Option<String>,
}

impl StreamSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let project_id = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());

        Self {
            session_id: session_id_from_path(&path),
            project_id,
            path,
        }
    }

    fn is_sidechain(&self) -> bool {
        self.session_id.starts_with("agent-")
    }
}

/// Discover all session streams under a Claude root, sorted by path.
pub fn discover_streams(root: &Path) -> Result<Vec<StreamSource>> {
    if !root.is_dir() {
        return Err(Error::Discovery(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let full_pattern = root.join(SESSION_PATTERN);
    let pattern_str = full_pattern.to_string_lossy();

    let entries = glob::glob(&pattern_str)
        .map_err(|e| Error::Discovery(format!("Invalid glob pattern: {}", e)))?;

    let mut sources: Vec<StreamSource> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable entry during discovery");
                None
            }
        })
        .filter(|path| path.is_file())
        .map(StreamSource::from_path)
        .filter(|source| !source.is_sidechain())
        .collect();

    sources.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::info!(
        root = %root.display(),
        count = sources.len(),
        "Discovered session streams"
    );

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_stream_source_from_path() {
        let source = StreamSource::from_path("/home/u/.claude/projects/-Users-u-dev-app/b4749c81.jsonl");
        assert_eq!(source.session_id, "b4749c81");
        assert_eq!(source.project_id.as_deref(), Some("-Users-u-dev-app"));
    }

    #[test]
    fn test_discover_streams_skips_sidechains() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("projects/-tmp-app");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("s2.jsonl"), "").unwrap();
        fs::write(project.join("s1.jsonl"), "").unwrap();
        fs::write(project.join("agent-a1b2.jsonl"), "").unwrap();
        fs::write(project.join("notes.txt"), "").unwrap();

        let sources = discover_streams(dir.path()).unwrap();
        let ids: Vec<_> = sources.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert!(sources
            .iter()
            .all(|s| s.project_id.as_deref() == Some("-tmp-app")));
    }

    #[test]
    fn test_discover_streams_missing_root() {
        let err = discover_streams(Path::new("/nonexistent/claude-root")).unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
    }
}

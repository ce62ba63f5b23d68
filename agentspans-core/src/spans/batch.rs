//! Reconstructing many streams at once.
//!
//! Streams share no correlation state, so each one runs on its own blocking
//! worker. A semaphore caps how many are open at the same time, and a stream
//! that cannot be opened is reported without affecting the others.

use crate::discovery::StreamSource;
use crate::error::{Error, Result};
use crate::spans::reconstruct::reconstruct_file;
use crate::types::AgentSpan;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-stream summary of a batch run.
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub path: PathBuf,
    pub session_id: String,
    pub spans: usize,
    pub lines_read: usize,
    pub lines_skipped: usize,
}

/// Result of reconstructing a batch of streams.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Spans from every stream, `project_id` assigned, sorted by
    /// session, launch time and invocation id
    pub spans: Vec<AgentSpan>,
    /// Streams that were read, sorted by path
    pub streams: Vec<StreamSummary>,
    /// Warnings from all streams, prefixed with the stream path
    pub warnings: Vec<String>,
    /// Streams that failed (file path → error message)
    pub errors: Vec<(PathBuf, String)>,
}

type StreamOutcome = std::result::Result<(StreamSource, crate::spans::StreamReport), String>;

/// Bounded-concurrency driver for [`reconstruct_file`].
///
/// Owns its own runtime; call it from synchronous code only.
pub struct BatchReconstructor {
    runtime: tokio::runtime::Runtime,
    max_open_streams: usize,
}

impl BatchReconstructor {
    pub fn new(max_open_streams: usize) -> Result<Self> {
        if max_open_streams == 0 {
            return Err(Error::Config(
                "max_open_streams must be at least 1".to_string(),
            ));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .max_blocking_threads(max_open_streams)
            .enable_all()
            .build()
            .map_err(|e| Error::Runtime(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            runtime,
            max_open_streams,
        })
    }

    pub fn max_open_streams(&self) -> usize {
        self.max_open_streams
    }

    /// Reconstruct every source.
    pub fn reconstruct_all(&self, sources: &[StreamSource]) -> BatchResult {
        self.reconstruct_all_with_progress(sources, |_, _, _| {})
    }

    /// Reconstruct every source, reporting progress.
    ///
    /// The callback receives `(completed_streams, total_streams, path)` after
    /// each stream finishes, in completion order.
    pub fn reconstruct_all_with_progress<F>(
        &self,
        sources: &[StreamSource],
        mut on_progress: F,
    ) -> BatchResult
    where
        F: FnMut(usize, usize, &Path),
    {
        let total = sources.len();
        let mut result = BatchResult::default();

        self.runtime.block_on(async {
            let semaphore = Arc::new(Semaphore::new(self.max_open_streams));
            let mut workers: JoinSet<(PathBuf, StreamOutcome)> = JoinSet::new();

            for source in sources.iter().cloned() {
                let semaphore = Arc::clone(&semaphore);
                workers.spawn(async move {
                    let path = source.path.clone();
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return (path, Err(e.to_string())),
                    };

                    let outcome = tokio::task::spawn_blocking(move || {
                        reconstruct_file(&source.path).map(|report| (source, report))
                    })
                    .await;

                    let outcome = match outcome {
                        Ok(Ok(done)) => Ok(done),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(e) => Err(format!("worker failed: {}", e)),
                    };
                    (path, outcome)
                });
            }

            let mut completed = 0;
            while let Some(joined) = workers.join_next().await {
                completed += 1;
                let (path, outcome) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        tracing::warn!(error = %e, "Stream worker aborted");
                        continue;
                    }
                };

                match outcome {
                    Ok((source, report)) => {
                        result.streams.push(StreamSummary {
                            path: path.clone(),
                            session_id: report.session_id.clone(),
                            spans: report.spans.len(),
                            lines_read: report.lines_read,
                            lines_skipped: report.lines_skipped,
                        });
                        result.warnings.extend(
                            report
                                .warnings
                                .into_iter()
                                .map(|w| format!("{}: {}", path.display(), w)),
                        );
                        result
                            .spans
                            .extend(report.spans.into_iter().map(|mut span| {
                                span.project_id = source.project_id.clone();
                                span
                            }));
                    }
                    Err(message) => {
                        tracing::warn!(path = %path.display(), error = %message, "Stream failed");
                        result.errors.push((path.clone(), message));
                    }
                }

                on_progress(completed, total, &path);
            }
        });

        result.streams.sort_by(|a, b| a.path.cmp(&b.path));
        result.errors.sort_by(|a, b| a.0.cmp(&b.0));
        result.spans.sort_by(|a, b| {
            a.session_id
                .cmp(&b.session_id)
                .then_with(|| a.started_at.cmp(&b.started_at))
                .then_with(|| a.tool_use_id.cmp(&b.tool_use_id))
        });

        tracing::info!(
            streams = result.streams.len(),
            spans = result.spans.len(),
            errors = result.errors.len(),
            "Batch reconstruction complete"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LAUNCH: &str = r#"{"type":"assistant","timestamp":"2025-11-20T10:00:00Z","message":{"content":[{"type":"tool_use","id":"toolu_1","name":"Task","input":{"description":"d"}}]}}"#;
    const RESULT: &str = r#"{"type":"user","timestamp":"2025-11-20T10:00:05Z","message":{"content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"ok"}]}}"#;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(BatchReconstructor::new(0), Err(Error::Config(_))));
    }

    #[test]
    fn test_failed_stream_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("-tmp-app");
        fs::create_dir_all(&project).unwrap();
        let good = project.join("s1.jsonl");
        fs::write(&good, format!("{}\n{}\n", LAUNCH, RESULT)).unwrap();

        let sources = vec![
            StreamSource::from_path(project.join("missing.jsonl")),
            StreamSource::from_path(good),
        ];

        let batch = BatchReconstructor::new(2).unwrap();
        let mut calls = 0;
        let result = batch.reconstruct_all_with_progress(&sources, |done, total, _| {
            calls += 1;
            assert!(done <= total);
        });

        assert_eq!(calls, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].0.ends_with("missing.jsonl"));
        assert_eq!(result.streams.len(), 1);
        assert_eq!(result.spans.len(), 1);
        assert_eq!(result.spans[0].project_id.as_deref(), Some("-tmp-app"));
        assert_eq!(result.spans[0].session_id, "s1");
    }

    #[test]
    fn test_many_streams_with_single_worker() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("-tmp-app");
        fs::create_dir_all(&project).unwrap();

        let sources: Vec<_> = (0..6)
            .map(|i| {
                let path = project.join(format!("s{}.jsonl", i));
                fs::write(&path, format!("{}\n{}\n", LAUNCH, RESULT)).unwrap();
                StreamSource::from_path(path)
            })
            .collect();

        let result = BatchReconstructor::new(1)
            .unwrap()
            .reconstruct_all(&sources);

        assert!(result.errors.is_empty());
        let sessions: Vec<_> = result.spans.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(sessions, vec!["s0", "s1", "s2", "s3", "s4", "s5"]);
    }
}

//! Integration tests for span reconstruction and wave aggregation
//!
//! These tests use fixture files in `tests/fixtures/claude-code/` to verify
//! the end-to-end flow from raw JSONL to SAW sessions.

use agentspans_core::spans::reconstruct_lines;
use agentspans_core::{
    aggregate_waves, discover_streams, reconstruct_file, AgentRunStatus, BatchReconstructor,
    DEFAULT_AGENT_TYPE,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the path to a fixture file
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/claude-code")
        .join(name)
}

/// Lay out fixtures the way Claude Code stores them under a root directory
fn claude_root_with(fixtures: &[(&str, &str)]) -> TempDir {
    let root = TempDir::new().expect("failed to create temp dir");
    for (project, name) in fixtures {
        let dir = root.path().join("projects").join(project);
        fs::create_dir_all(&dir).expect("failed to create project dir");
        fs::copy(fixture_path(name), dir.join(name)).expect("failed to copy fixture");
    }
    root
}

// ============================================
// Span reconstruction
// ============================================

#[test]
fn test_reconstruct_saw_session() {
    agentspans_core::logging::init_test();

    let report =
        reconstruct_file(&fixture_path("saw-session.jsonl")).expect("parse should succeed");

    assert_eq!(report.session_id, "saw-session");
    assert_eq!(report.lines_read, 13);
    assert_eq!(report.lines_skipped, 1);
    assert_eq!(report.warnings.len(), 1);

    // Finalized in completion order; TaskStop never becomes a span
    let ids: Vec<_> = report.spans.iter().map(|s| s.tool_use_id.as_str()).collect();
    assert_eq!(ids, vec!["toolu_w1b", "toolu_w1a", "toolu_w2a", "toolu_plain"]);

    let w1b = &report.spans[0];
    assert_eq!(w1b.agent_type, "Explore");
    assert!(!w1b.success);
    assert!(!w1b.killed);
    assert_eq!(w1b.duration_ms, Some(15_000));
    assert_eq!(w1b.result_chars, "Agent failed".len());

    let w1a = &report.spans[1];
    assert!(w1a.success);
    assert!(w1a.background);
    assert_eq!(w1a.duration_ms, Some(60_000));
    assert_eq!(w1a.result_chars, "Parser implemented".len());
    assert_eq!(w1a.prompt_excerpt, "Implement the parser");

    let w2a = &report.spans[2];
    assert!(w2a.killed);
    assert!(!w2a.success);
    assert_eq!(w2a.duration_ms, Some(21_000));

    let plain = &report.spans[3];
    assert_eq!(plain.agent_type, DEFAULT_AGENT_TYPE);
    assert!(plain.success);
    assert_eq!(plain.result_chars, 5);
    assert_eq!(plain.duration_ms, Some(50_000));
}

#[test]
fn test_reconstruct_incomplete_session() {
    let report =
        reconstruct_file(&fixture_path("incomplete-session.jsonl")).expect("parse should succeed");

    assert_eq!(report.spans.len(), 2);

    let quick = &report.spans[0];
    assert_eq!(quick.tool_use_id, "toolu_2");
    assert!(quick.success);
    // Offset-less completion timestamp is read as UTC
    assert_eq!(quick.duration_ms, Some(2_000));

    let long = &report.spans[1];
    assert_eq!(long.tool_use_id, "toolu_bg");
    assert!(!long.success);
    assert!(long.completed_at.is_none());
    assert!(long.duration_ms.is_none());
}

#[test]
fn test_malformed_lines_do_not_reduce_span_count() {
    let content = fs::read_to_string(fixture_path("saw-session.jsonl")).unwrap();
    let clean: Vec<&str> = content
        .lines()
        .filter(|l| serde_json::from_str::<serde_json::Value>(l).is_ok())
        .collect();

    let mut noisy = Vec::new();
    for line in &clean {
        noisy.push(*line);
        noisy.push("{\"type\":\"user\",\"message\":{\"content\":[{\"type\":\"tool_result\"}]}}");
        noisy.push("garbage");
    }

    let clean_report = reconstruct_lines("s", clean.iter().copied());
    let noisy_report = reconstruct_lines("s", noisy);

    assert_eq!(clean_report.spans, noisy_report.spans);
    assert_eq!(noisy_report.lines_skipped, clean.len() * 2);
}

#[test]
fn test_kill_resolution_independent_of_order() {
    let launch = r#"{"type":"assistant","timestamp":"2025-11-20T10:00:00Z","message":{"content":[{"type":"tool_use","id":"toolu_1","name":"Task","input":{"description":"[SAW:wave1:agent-A] x"}}]}}"#;
    let progress = r#"{"type":"progress","parentToolUseID":"toolu_1","data":{"type":"agent_progress","agentId":"rt1"}}"#;
    let stop = r#"{"type":"assistant","timestamp":"2025-11-20T10:00:03Z","message":{"content":[{"type":"tool_use","id":"toolu_9","name":"TaskStop","input":{"task_id":"rt1"}}]}}"#;
    let result = r#"{"type":"user","timestamp":"2025-11-20T10:00:04Z","message":{"content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"done"}]}}"#;

    let orders = [
        vec![launch, progress, stop, result],
        vec![launch, progress, result, stop],
        vec![launch, stop, result, progress],
        vec![stop, launch, result, progress],
    ];

    for order in orders {
        let report = reconstruct_lines("s", order);
        assert_eq!(report.spans.len(), 1);
        assert!(report.spans[0].killed);
        assert!(!report.spans[0].success);
    }
}

// ============================================
// Discovery, batch and aggregation
// ============================================

#[test]
fn test_batch_to_waves() {
    let root = claude_root_with(&[
        ("-Users-test-dev-app", "saw-session.jsonl"),
        ("-Users-test-dev-other", "incomplete-session.jsonl"),
    ]);

    let sources = discover_streams(root.path()).expect("discovery should succeed");
    assert_eq!(sources.len(), 2);

    let batch = BatchReconstructor::new(2).unwrap().reconstruct_all(&sources);
    assert!(batch.errors.is_empty());
    assert_eq!(batch.spans.len(), 6);

    let sessions = aggregate_waves(&batch.spans);
    let ids: Vec<_> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["incomplete-session", "saw-session"]);

    let incomplete = &sessions[0];
    assert_eq!(incomplete.project_id.as_deref(), Some("-Users-test-dev-other"));
    assert_eq!(incomplete.total_agents, 2);
    let wave = &incomplete.waves[0];
    let runs: Vec<_> = wave
        .agents
        .iter()
        .map(|a| (a.agent.as_str(), a.status))
        .collect();
    assert_eq!(
        runs,
        vec![("X", AgentRunStatus::Failed), ("Y", AgentRunStatus::Completed)]
    );
    assert_eq!(wave.duration_ms, Some(3_000));

    let saw = &sessions[1];
    assert_eq!(saw.project_id.as_deref(), Some("-Users-test-dev-app"));
    assert_eq!(saw.total_agents, 3);
    let waves: Vec<_> = saw.waves.iter().map(|w| w.wave).collect();
    assert_eq!(waves, vec![1, 2]);

    let wave1: Vec<_> = saw.waves[0]
        .agents
        .iter()
        .map(|a| (a.agent.as_str(), a.status))
        .collect();
    assert_eq!(
        wave1,
        vec![("A", AgentRunStatus::Completed), ("B", AgentRunStatus::Failed)]
    );
    assert_eq!(saw.waves[0].duration_ms, Some(60_000));
    assert_eq!(saw.waves[1].agents[0].status, AgentRunStatus::Killed);
}

#[test]
fn test_waves_serialize_to_json() {
    let report = reconstruct_file(&fixture_path("saw-session.jsonl")).unwrap();
    let sessions = aggregate_waves(&report.spans);

    let json = serde_json::to_value(&sessions).unwrap();
    assert_eq!(json[0]["session_id"], "saw-session");
    assert_eq!(json[0]["waves"][1]["agents"][0]["status"], "killed");
    assert_eq!(json[0]["total_agents"], 3);
}

//! SAW wave aggregation.
//!
//! A Task description may start with a coordination tag:
//!
//! ```text
//! [SAW:wave<N>:agent-<X>] rest of the description
//! ```
//!
//! `N` is a decimal integer >= 1 and `X` a non-empty label without `:`.
//! Tagged spans are grouped session → wave → agent run; untagged or
//! malformed spans are simply left out.

use crate::types::{duration_between, AgentSpan, SawAgentRun, SawSession, SawWave};
use std::collections::BTreeMap;

const TAG_NAME: &str = "SAW";
const WAVE_PREFIX: &str = "wave";
const AGENT_PREFIX: &str = "agent-";

/// Wave number and agent label parsed from a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SawTag {
    pub wave: u32,
    pub agent: String,
}

/// Parse the SAW tag at the start of a description.
///
/// Returns `None` for anything that is not a well-formed tag; that is a
/// classification, not an error.
pub fn parse_saw_tag(description: &str) -> Option<SawTag> {
    let rest = description.strip_prefix('[')?;
    let close = rest.find(']')?;
    let inner = &rest[..close];

    let mut segments = inner.split(':');
    let (name, wave, agent) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() || name != TAG_NAME {
        return None;
    }

    let digits = wave.strip_prefix(WAVE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let wave = digits.parse::<u32>().ok().filter(|n| *n >= 1)?;

    let agent = agent.strip_prefix(AGENT_PREFIX)?;
    if agent.is_empty() {
        return None;
    }

    Some(SawTag {
        wave,
        agent: agent.to_string(),
    })
}

#[derive(Default)]
struct SessionBucket {
    project_id: Option<String>,
    waves: BTreeMap<u32, Vec<SawAgentRun>>,
}

/// Group tagged spans into sessions and waves.
///
/// Sessions come out ordered by id, waves by number and runs by agent label.
/// Returns an empty list when no span carries a valid tag.
pub fn aggregate_waves(spans: &[AgentSpan]) -> Vec<SawSession> {
    let mut sessions: BTreeMap<&str, SessionBucket> = BTreeMap::new();

    for span in spans {
        let Some(tag) = parse_saw_tag(&span.description) else {
            continue;
        };

        let bucket = sessions.entry(span.session_id.as_str()).or_default();
        // Sessions map to one project; the last span seen decides
        bucket.project_id = span.project_id.clone();
        bucket.waves.entry(tag.wave).or_default().push(SawAgentRun {
            agent: tag.agent,
            agent_type: span.agent_type.clone(),
            description: span.description.clone(),
            status: span.status(),
            duration_ms: span.duration_ms,
            started_at: span.started_at,
            completed_at: span.completed_at,
        });
    }

    sessions
        .into_iter()
        .map(|(session_id, bucket)| {
            let waves: Vec<SawWave> = bucket
                .waves
                .into_iter()
                .map(|(wave, runs)| build_wave(wave, runs))
                .collect();
            let total_agents = waves.iter().map(|w| w.agents.len()).sum();

            SawSession {
                session_id: session_id.to_string(),
                project_id: bucket.project_id,
                waves,
                total_agents,
            }
        })
        .collect()
}

fn build_wave(wave: u32, mut agents: Vec<SawAgentRun>) -> SawWave {
    agents.sort_by(|a, b| a.agent.cmp(&b.agent));

    let started_at = agents.iter().filter_map(|a| a.started_at).min();
    let ended_at = agents.iter().filter_map(|a| a.completed_at).max();

    SawWave {
        wave,
        agents,
        started_at,
        ended_at,
        duration_ms: duration_between(started_at, ended_at),
    }
}

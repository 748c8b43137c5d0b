use scheduler::SearchOutcome;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UnassignedSession {
    pub group: String,
    pub subject_id: String,
    pub seq: u32,
}

/// Summary of one scheduling run, written next to the timetable on request.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub attempts_run: usize,
    pub winning_attempt: usize,
    pub sessions_total: usize,
    pub sessions_placed: usize,
    pub complete: bool,
    pub unassigned: Vec<UnassignedSession>,
}

impl From<&SearchOutcome> for RunReport {
    fn from(outcome: &SearchOutcome) -> Self {
        let unassigned = outcome
            .unassigned
            .iter()
            .map(|session| UnassignedSession {
                group: session.group.to_string(),
                subject_id: session.subject_id.clone(),
                seq: session.seq,
            })
            .collect();

        Self {
            seed: outcome.seed,
            attempts_run: outcome.attempts_run,
            winning_attempt: outcome.attempt + 1,
            sessions_total: outcome.session_count,
            sessions_placed: outcome.assignments.len(),
            complete: outcome.is_complete(),
            unassigned,
        }
    }
}

impl RunReport {
    /// Writes the report as pretty-printed JSON.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("run report written to {}", path.display());
        Ok(())
    }
}

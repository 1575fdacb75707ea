use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    ActivityEntry, ActivityKind, Candidate, CandidateId, ConsistencyMode, MatchLevel,
};
use super::export::{build_export, CsvExport, ExportError};
use super::gateway::ScoringGateway;
use super::store::StoreHandle;

pub const MIN_COMPARED: usize = 2;
pub const MAX_COMPARED: usize = 3;

/// Aggregate result of a bulk delete; per-item detail is deliberately not exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub removed_locally: usize,
    /// The backend rejected the credential part way; remaining ids were not attempted.
    pub requires_login: bool,
}

impl DeleteReport {
    pub fn message(&self) -> String {
        let noun = if self.removed_locally == 1 {
            "candidate"
        } else {
            "candidates"
        };
        if self.failed == 0 {
            format!("Deleted {} {noun}", self.removed_locally)
        } else {
            format!(
                "Deleted {} {noun}; {} could not be removed from the server",
                self.removed_locally, self.failed
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparedCandidate {
    pub id: CandidateId,
    pub name: String,
    pub score: f64,
    pub match_level: MatchLevel,
    pub skills: Vec<String>,
    pub skill_matches: Vec<String>,
    /// Skills no other compared candidate lists.
    pub unique_skills: Vec<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
}

/// Read-only side-by-side view over two or three candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub candidates: Vec<ComparedCandidate>,
    pub common_skills: Vec<String>,
    pub top_candidate: CandidateId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("select at least {MIN_COMPARED} candidates to compare (selected {selected})")]
    TooFew { selected: usize },
    #[error("comparison supports at most {MAX_COMPARED} candidates (selected {selected})")]
    TooMany { selected: usize },
}

/// Multi-select over the displayed list plus the batch operations acting on it.
pub struct BulkActionController<G> {
    store: StoreHandle,
    gateway: Arc<G>,
    mode: ConsistencyMode,
    selection: Mutex<BTreeSet<CandidateId>>,
}

impl<G> BulkActionController<G>
where
    G: ScoringGateway + 'static,
{
    pub fn new(store: StoreHandle, gateway: Arc<G>, mode: ConsistencyMode) -> Self {
        Self {
            store,
            gateway,
            mode,
            selection: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn consistency_mode(&self) -> ConsistencyMode {
        self.mode
    }

    /// Flip selection of one candidate, returning whether it is now selected.
    pub fn toggle(&self, candidate_id: &CandidateId) -> bool {
        let mut selection = self.selection();
        if selection.remove(candidate_id) {
            false
        } else {
            selection.insert(candidate_id.clone());
            true
        }
    }

    pub fn is_selected(&self, candidate_id: &CandidateId) -> bool {
        self.selection().contains(candidate_id)
    }

    pub fn selected(&self) -> BTreeSet<CandidateId> {
        self.selection().clone()
    }

    pub fn select_all(&self, displayed: &[Candidate]) {
        let mut selection = self.selection();
        selection.extend(displayed.iter().map(|candidate| candidate.id.clone()));
    }

    /// Deselect the displayed candidates only.
    pub fn clear(&self, displayed: &[Candidate]) {
        let mut selection = self.selection();
        for candidate in displayed {
            selection.remove(&candidate.id);
        }
    }

    /// Drop selected ids that are no longer displayed, e.g. after the criteria changed.
    pub fn retain_displayed(&self, displayed: &[Candidate]) {
        let visible: BTreeSet<&CandidateId> =
            displayed.iter().map(|candidate| &candidate.id).collect();
        self.selection().retain(|id| visible.contains(id));
    }

    /// Selected candidates in displayed order.
    pub fn selected_in(&self, displayed: &[Candidate]) -> Vec<Candidate> {
        selected_rows(displayed, &self.selection())
    }

    /// Delete sequentially against the backend, then converge local state per the
    /// configured [`ConsistencyMode`].
    pub async fn delete_many(&self, ids: &[CandidateId]) -> DeleteReport {
        let mut report = DeleteReport {
            requested: ids.len(),
            ..DeleteReport::default()
        };
        let mut confirmed: Vec<&CandidateId> = Vec::with_capacity(ids.len());

        for id in ids {
            if report.requires_login {
                report.failed += 1;
                continue;
            }

            match self.gateway.delete_candidate(id).await {
                Ok(()) => {
                    report.succeeded += 1;
                    confirmed.push(id);
                }
                Err(err) => {
                    report.failed += 1;
                    if err.is_unauthorized() {
                        report.requires_login = true;
                    }
                    debug!(candidate_id = %id, error = %err, "remote candidate delete failed");
                }
            }
        }

        let to_remove: Vec<&CandidateId> = match self.mode {
            ConsistencyMode::LocalWins => ids.iter().collect(),
            ConsistencyMode::RemoteConfirmed => confirmed,
        };

        report.removed_locally = self.store.write(|store| {
            let mut removed = 0;
            for id in &to_remove {
                let name = store.candidate(id).map(|candidate| candidate.name.clone());
                if store.delete_candidate(id) {
                    removed += 1;
                    let description =
                        format!("{} deleted", name.unwrap_or_else(|| id.to_string()));
                    store.record(
                        ActivityEntry::new(ActivityKind::CandidateDeleted, description)
                            .for_candidate(id),
                    );
                }
            }
            removed
        });

        {
            let mut selection = self.selection();
            for id in &to_remove {
                selection.remove(*id);
            }
        }

        if report.failed > 0 {
            warn!(
                requested = report.requested,
                failed = report.failed,
                mode = self.mode.label(),
                "bulk delete finished with backend failures"
            );
        } else {
            info!(requested = report.requested, "bulk delete finished");
        }

        report
    }

    /// Export the selected displayed candidates, or all displayed ones when none are selected.
    pub fn export(
        &self,
        displayed: &[Candidate],
        job_title: Option<&str>,
        date: NaiveDate,
    ) -> Result<CsvExport, ExportError> {
        let selected = self.selected_in(displayed);
        let rows = if selected.is_empty() {
            displayed
        } else {
            selected.as_slice()
        };
        build_export(rows, job_title, date)
    }

    pub fn compare(&self, displayed: &[Candidate]) -> Result<Comparison, CompareError> {
        compare_candidates(&self.selected_in(displayed))
    }

    fn selection(&self) -> MutexGuard<'_, BTreeSet<CandidateId>> {
        self.selection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Members of `selection` in displayed order; ids not displayed are ignored.
pub fn selected_rows(displayed: &[Candidate], selection: &BTreeSet<CandidateId>) -> Vec<Candidate> {
    displayed
        .iter()
        .filter(|candidate| selection.contains(&candidate.id))
        .cloned()
        .collect()
}

/// Build a comparison over exactly two or three candidates; more disables comparison.
pub fn compare_candidates(candidates: &[Candidate]) -> Result<Comparison, CompareError> {
    let selected = candidates.len();
    if selected < MIN_COMPARED {
        return Err(CompareError::TooFew { selected });
    }
    if selected > MAX_COMPARED {
        return Err(CompareError::TooMany { selected });
    }

    let lowered: Vec<BTreeSet<String>> = candidates
        .iter()
        .map(|candidate| {
            candidate
                .skills
                .iter()
                .map(|skill| skill.to_lowercase())
                .collect()
        })
        .collect();

    let common_skills = candidates[0]
        .skills
        .iter()
        .filter(|skill| {
            let key = skill.to_lowercase();
            lowered.iter().all(|set| set.contains(&key))
        })
        .cloned()
        .collect();

    let compared = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let unique_skills = candidate
                .skills
                .iter()
                .filter(|skill| {
                    let key = skill.to_lowercase();
                    lowered
                        .iter()
                        .enumerate()
                        .all(|(other, set)| other == index || !set.contains(&key))
                })
                .cloned()
                .collect();

            ComparedCandidate {
                id: candidate.id.clone(),
                name: candidate.name.clone(),
                score: candidate.score,
                match_level: candidate.match_level(),
                skills: candidate.skills.clone(),
                skill_matches: candidate.skill_matches.clone(),
                unique_skills,
                experience: candidate.experience.clone(),
                education: candidate.education.clone(),
            }
        })
        .collect();

    let top_candidate = candidates
        .iter()
        .fold(&candidates[0], |best, candidate| {
            if candidate.score > best.score {
                candidate
            } else {
                best
            }
        })
        .id
        .clone();

    Ok(Comparison {
        candidates: compared,
        common_skills,
        top_candidate,
    })
}

use serde::Serialize;

use super::domain::{
    ActivityEntry, ActivityKind, Assignment, Candidate, CandidateId, JobId, PipelineStatus,
};
use super::store::{CandidateStore, StoreHandle};

/// One drag-and-drop column of the pipeline board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub status: PipelineStatus,
    pub label: &'static str,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineBoard {
    pub job_id: JobId,
    pub columns: Vec<BoardColumn>,
}

/// Per-`(candidate, job)` status machine.
///
/// Every transition is permitted, including out of `hired` and `rejected`; the drag-and-drop
/// board and the status dropdown are both just callers of [`PipelineController::set_status`].
#[derive(Debug, Clone)]
pub struct PipelineController {
    store: StoreHandle,
}

impl PipelineController {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Upsert the assignment's status and log one `status_changed` entry.
    pub fn set_status(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
        status: PipelineStatus,
    ) -> Assignment {
        self.store.write(|store| {
            let (previous, assignment) = store.upsert_status(candidate_id, job_id, status);
            let description = format!(
                "{} moved to {} for {}",
                candidate_label(store, candidate_id),
                status.label(),
                job_label(store, job_id)
            );

            let mut entry = ActivityEntry::new(ActivityKind::StatusChanged, description)
                .for_candidate(candidate_id)
                .for_job(job_id)
                .with_metadata("new_status", status.label());
            if let Some(previous) = previous {
                entry = entry.with_metadata("previous_status", previous.label());
            }
            store.record(entry);

            assignment
        })
    }

    /// Explicitly consider a candidate for a job. Idempotent; returns whether it was created.
    pub fn assign(&self, candidate_id: &CandidateId, job_id: &JobId) -> bool {
        self.store.write(|store| {
            let created = store.ensure_assignment(candidate_id, job_id, PipelineStatus::New);
            if created {
                let description = format!(
                    "{} assigned to {}",
                    candidate_label(store, candidate_id),
                    job_label(store, job_id)
                );
                store.record(
                    ActivityEntry::new(ActivityKind::CandidateAssigned, description)
                        .for_candidate(candidate_id)
                        .for_job(job_id),
                );
            }
            created
        })
    }

    pub fn unassign(&self, candidate_id: &CandidateId, job_id: &JobId) -> Option<Assignment> {
        self.store.write(|store| {
            let removed = store.remove_assignment(candidate_id, job_id)?;
            let description = format!(
                "{} removed from {}",
                candidate_label(store, candidate_id),
                job_label(store, job_id)
            );
            store.record(
                ActivityEntry::new(ActivityKind::CandidateUnassigned, description)
                    .for_candidate(candidate_id)
                    .for_job(job_id),
            );
            Some(removed)
        })
    }

    pub fn status(&self, candidate_id: &CandidateId, job_id: &JobId) -> Option<PipelineStatus> {
        self.store.read(|store| {
            store
                .assignment(candidate_id, job_id)
                .map(|assignment| assignment.status)
        })
    }

    pub fn assignment(&self, candidate_id: &CandidateId, job_id: &JobId) -> Option<Assignment> {
        self.store
            .read(|store| store.assignment(candidate_id, job_id).cloned())
    }

    /// Candidates assigned to `job_id`, one column per status in pipeline order.
    pub fn board(&self, job_id: &JobId) -> PipelineBoard {
        self.store.read(|store| {
            let columns = PipelineStatus::ordered()
                .into_iter()
                .map(|status| BoardColumn {
                    status,
                    label: status.label(),
                    candidates: store
                        .candidates()
                        .iter()
                        .filter(|candidate| {
                            store
                                .assignment(&candidate.id, job_id)
                                .is_some_and(|assignment| assignment.status == status)
                        })
                        .cloned()
                        .collect(),
                })
                .collect();

            PipelineBoard {
                job_id: job_id.clone(),
                columns,
            }
        })
    }
}

fn candidate_label(store: &CandidateStore, candidate_id: &CandidateId) -> String {
    store
        .candidate(candidate_id)
        .map(|candidate| candidate.name.clone())
        .unwrap_or_else(|| candidate_id.to_string())
}

fn job_label(store: &CandidateStore, job_id: &JobId) -> String {
    store
        .job(job_id)
        .map(|job| job.title.clone())
        .unwrap_or_else(|| job_id.to_string())
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{ActivityEntry, ActivityKind, Candidate, CandidateId, Job, JobId, PipelineStatus};
use super::gateway::{GatewayError, ScoringGateway, ScreeningResult};
use super::store::StoreHandle;

/// Result of one `load` call as reported to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded {
        jobs: usize,
        candidates: usize,
        failed_jobs: usize,
    },
    /// Already loaded (or loading) and no newer refresh token was supplied.
    Skipped,
    /// A newer load or an invalidation happened while this one was fetching.
    Superseded,
    /// The backend rejected the credential; the driver should redirect to login.
    Unauthorized,
    /// The job listing could not be fetched; the store keeps its last known-good state.
    Failed { reason: String },
}

/// Permission for one load to write into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Everything fetched for one load, already merged.
#[derive(Debug, Clone, Default)]
pub struct ScreeningBatch {
    pub jobs: Vec<Job>,
    pub candidates: Vec<Candidate>,
    /// Every `(candidate, job)` pair the oracle reported, before deduplication.
    pub screened_pairs: Vec<(CandidateId, JobId)>,
    pub failed_jobs: usize,
}

#[derive(Debug, Default)]
struct LoadState {
    in_flight: bool,
    loaded: bool,
    last_refresh: Option<u64>,
    generation: u64,
}

/// Pulls per-job screening results and replaces the store's candidate collection.
pub struct ScreeningResultsLoader<G> {
    gateway: Arc<G>,
    store: StoreHandle,
    state: Mutex<LoadState>,
}

impl<G> ScreeningResultsLoader<G>
where
    G: ScoringGateway + 'static,
{
    pub fn new(gateway: Arc<G>, store: StoreHandle) -> Self {
        Self {
            gateway,
            store,
            state: Mutex::new(LoadState::default()),
        }
    }

    /// Run a full load. Never fails out of this boundary; the outcome says what happened.
    ///
    /// A second load in the same session only runs when `refresh_token` is strictly greater
    /// than every token seen before.
    pub async fn load(&self, refresh_token: Option<u64>) -> LoadOutcome {
        let Some(ticket) = self.begin(refresh_token) else {
            debug!(?refresh_token, "screening results already loaded; skipping");
            return LoadOutcome::Skipped;
        };

        match self.fetch().await {
            Ok(batch) => self.commit(&ticket, batch),
            Err(err) => self.fail(&ticket, err),
        }
    }

    /// Claim the next generation, or `None` when the re-entrancy guard refuses.
    pub fn begin(&self, refresh_token: Option<u64>) -> Option<LoadTicket> {
        let mut state = self.state();
        let newer_token = match (refresh_token, state.last_refresh) {
            (Some(token), Some(last)) => token > last,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if (state.in_flight || state.loaded) && !newer_token {
            return None;
        }

        if let Some(token) = refresh_token {
            state.last_refresh = Some(state.last_refresh.map_or(token, |last| last.max(token)));
        }
        state.in_flight = true;
        state.generation += 1;
        let ticket = LoadTicket {
            generation: state.generation,
        };
        drop(state);

        self.store.write(|store| store.begin_sync());
        Some(ticket)
    }

    /// Fetch jobs and every job's results. Per-job failures are absorbed; only a failed
    /// job listing or a rejected credential aborts the load.
    pub async fn fetch(&self) -> Result<ScreeningBatch, GatewayError> {
        let jobs = self.gateway.list_jobs().await?;
        let mut per_job = Vec::with_capacity(jobs.len());
        let mut failed_jobs = 0;

        for job in &jobs {
            match self.gateway.screening_results(&job.id).await {
                Ok(results) => per_job.push((job.clone(), results)),
                Err(GatewayError::Unauthorized) => return Err(GatewayError::Unauthorized),
                Err(GatewayError::NotFound) => {
                    debug!(job_id = %job.id, "no screening results for job yet");
                }
                Err(err) => {
                    failed_jobs += 1;
                    warn!(job_id = %job.id, error = %err, "screening results unavailable; treating job as empty");
                }
            }
        }

        let screened_pairs = per_job
            .iter()
            .flat_map(|(job, results)| {
                results
                    .iter()
                    .map(move |result| (CandidateId(result.id.clone()), job.id.clone()))
            })
            .collect();
        let candidates = merge_screening_results(per_job);

        Ok(ScreeningBatch {
            jobs,
            candidates,
            screened_pairs,
            failed_jobs,
        })
    }

    /// Write a fetched batch if `ticket` is still the current generation.
    pub fn commit(&self, ticket: &LoadTicket, batch: ScreeningBatch) -> LoadOutcome {
        {
            let mut state = self.state();
            if state.generation != ticket.generation {
                debug!(
                    generation = ticket.generation,
                    current = state.generation,
                    "discarding superseded screening results"
                );
                return LoadOutcome::Superseded;
            }
            state.in_flight = false;
            state.loaded = true;
        }

        let ScreeningBatch {
            jobs,
            candidates,
            screened_pairs,
            failed_jobs,
        } = batch;
        let job_count = jobs.len();

        let written = self.store.write(|store| {
            store.set_jobs(jobs);
            let written = store.replace_candidates(candidates);
            for (candidate_id, job_id) in &screened_pairs {
                if store.contains(candidate_id) {
                    store.ensure_assignment(candidate_id, job_id, PipelineStatus::New);
                }
            }
            store.record(
                ActivityEntry::new(
                    ActivityKind::ResultsLoaded,
                    format!("Loaded {written} candidates across {job_count} jobs"),
                )
                .with_metadata("candidates", written.to_string())
                .with_metadata("failed_jobs", failed_jobs.to_string()),
            );
            written
        });

        info!(
            generation = ticket.generation,
            jobs = job_count,
            candidates = written,
            failed_jobs,
            "screening results loaded"
        );

        LoadOutcome::Loaded {
            jobs: job_count,
            candidates: written,
            failed_jobs,
        }
    }

    fn fail(&self, ticket: &LoadTicket, err: GatewayError) -> LoadOutcome {
        {
            let mut state = self.state();
            if state.generation != ticket.generation {
                return LoadOutcome::Superseded;
            }
            state.in_flight = false;
        }
        self.store.write(|store| store.abandon_sync());

        if err.is_unauthorized() {
            warn!("screening results load rejected; login required");
            LoadOutcome::Unauthorized
        } else {
            warn!(error = %err, "screening results load failed; keeping previous candidates");
            LoadOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }

    /// Drop interest in any in-flight load, e.g. when the results view is left.
    pub fn invalidate(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.in_flight = false;
        drop(state);
        self.store.write(|store| store.abandon_sync());
    }

    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    fn state(&self) -> MutexGuard<'_, LoadState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Concatenate per-job results and keep one entry per candidate id.
///
/// The higher score wins; on equal scores the entry seen first (earlier job in listing
/// order, then earlier row) is kept. Output is score-descending and stable.
pub fn merge_screening_results(per_job: Vec<(Job, Vec<ScreeningResult>)>) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::new();
    let mut positions: HashMap<CandidateId, usize> = HashMap::new();

    for (job, results) in per_job {
        for result in results {
            let candidate = result.into_candidate(&job);
            match positions.get(&candidate.id) {
                Some(&index) => {
                    if candidate.score > merged[index].score {
                        merged[index] = candidate;
                    }
                }
                None => {
                    positions.insert(candidate.id.clone(), merged.len());
                    merged.push(candidate);
                }
            }
        }
    }

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged
}

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::annotations::AnnotationManager;
use super::bulk::{
    compare_candidates, selected_rows, BulkActionController, CompareError, Comparison,
    DeleteReport,
};
use super::controller::PipelineController;
use super::domain::{
    ActivityEntry, Candidate, CandidateId, ConsistencyMode, Job, JobId, Tag, TagId,
};
use super::export::{build_export, CsvExport, ExportError};
use super::filter::FilterCriteria;
use super::gateway::ScoringGateway;
use super::loader::{LoadOutcome, ScreeningResultsLoader};
use super::questions::{QuestionCategory, QuestionGenerator};
use super::store::{CandidateStore, StoreHandle};
use super::summary::ResultsSummary;

/// One recruiter session: the store plus every component writing into it.
///
/// Components share a single [`StoreHandle`]; the session is the dependency-injected
/// replacement for global UI state and is what drivers (router, CLI, tests) hold.
pub struct RecruitingSession<G> {
    store: StoreHandle,
    loader: ScreeningResultsLoader<G>,
    pipeline: PipelineController,
    bulk: BulkActionController<G>,
    annotations: AnnotationManager,
}

impl<G> RecruitingSession<G>
where
    G: ScoringGateway + 'static,
{
    /// Fresh session seeded with the default tag catalog.
    pub fn new(gateway: Arc<G>, mode: ConsistencyMode) -> Self {
        Self::with_store(gateway, mode, CandidateStore::with_default_tags())
    }

    pub fn with_store(gateway: Arc<G>, mode: ConsistencyMode, store: CandidateStore) -> Self {
        let store = StoreHandle::new(store);
        Self {
            loader: ScreeningResultsLoader::new(gateway.clone(), store.clone()),
            pipeline: PipelineController::new(store.clone()),
            bulk: BulkActionController::new(store.clone(), gateway, mode),
            annotations: AnnotationManager::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn loader(&self) -> &ScreeningResultsLoader<G> {
        &self.loader
    }

    pub fn pipeline(&self) -> &PipelineController {
        &self.pipeline
    }

    pub fn bulk(&self) -> &BulkActionController<G> {
        &self.bulk
    }

    pub fn annotations(&self) -> &AnnotationManager {
        &self.annotations
    }

    pub async fn refresh(&self, refresh_token: Option<u64>) -> LoadOutcome {
        self.loader.load(refresh_token).await
    }

    /// The filtered list in store order.
    pub fn displayed(&self, criteria: &FilterCriteria) -> Vec<Candidate> {
        self.store.read(|store| criteria.apply(store))
    }

    pub fn summary(&self, criteria: &FilterCriteria) -> ResultsSummary {
        self.store.read(|store| {
            let displayed = criteria.apply(store);
            ResultsSummary::from_store(store, &displayed)
        })
    }

    pub fn candidate(&self, candidate_id: &CandidateId) -> Option<Candidate> {
        self.store.read(|store| store.candidate(candidate_id).cloned())
    }

    pub fn contains(&self, candidate_id: &CandidateId) -> bool {
        self.store.read(|store| store.contains(candidate_id))
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.store.read(|store| store.jobs().to_vec())
    }

    pub fn job(&self, job_id: &JobId) -> Option<Job> {
        self.store.read(|store| store.job(job_id).cloned())
    }

    pub fn tag(&self, tag_id: &TagId) -> Option<Tag> {
        self.store.read(|store| store.tag(tag_id).cloned())
    }

    pub fn questions(&self, job_id: &JobId) -> Option<Vec<QuestionCategory>> {
        self.job(job_id).as_ref().map(QuestionGenerator::generate)
    }

    /// Newest first.
    pub fn activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.store.read(|store| store.recent_activity(limit))
    }

    pub async fn delete_candidates(&self, ids: &[CandidateId]) -> DeleteReport {
        self.bulk.delete_many(ids).await
    }

    /// Export the displayed list, narrowed to `ids` when any are given.
    ///
    /// Without an explicit title the selected job's title names the file.
    pub fn export(
        &self,
        criteria: &FilterCriteria,
        ids: &BTreeSet<CandidateId>,
        job_title: Option<&str>,
        date: NaiveDate,
    ) -> Result<CsvExport, ExportError> {
        let displayed = self.displayed(criteria);
        let rows = if ids.is_empty() {
            displayed
        } else {
            selected_rows(&displayed, ids)
        };

        let title = match job_title {
            Some(title) => Some(title.to_string()),
            None => criteria
                .job_id
                .as_ref()
                .and_then(|job_id| self.job(job_id))
                .map(|job| job.title),
        };
        build_export(&rows, title.as_deref(), date)
    }

    /// Compare candidates by id in the order given. Unknown and repeated ids are skipped.
    pub fn compare(&self, ids: &[CandidateId]) -> Result<Comparison, CompareError> {
        let mut seen = BTreeSet::new();
        let candidates: Vec<Candidate> = self.store.read(|store| {
            ids.iter()
                .filter(|id| seen.insert(*id))
                .filter_map(|id| store.candidate(id).cloned())
                .collect()
        });
        compare_candidates(&candidates)
    }
}

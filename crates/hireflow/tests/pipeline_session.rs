//! End-to-end behavior of a recruiting session driven through the public facade.
//!
//! A scripted scoring backend stands in for the HTTP gateway so every scenario runs
//! in-process: loading and deduplication, filtering, pipeline transitions, tagging, bulk
//! deletion, and CSV export.

mod common {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use hireflow::pipeline::{
        CandidateId, ConsistencyMode, GatewayError, Job, JobId, JobStatus, RecruitingSession,
        ScoringGateway, ScreeningResult,
    };

    #[derive(Default)]
    pub(super) struct ScriptedBackend {
        jobs: Vec<Job>,
        results: HashMap<JobId, Vec<ScreeningResult>>,
        refused_deletes: BTreeSet<CandidateId>,
        delete_log: Mutex<Vec<CandidateId>>,
    }

    impl ScriptedBackend {
        pub(super) fn job(mut self, id: &str, title: &str, rows: &[(&str, &str, f64)]) -> Self {
            let job = Job {
                id: JobId::new(id),
                title: title.to_string(),
                required_skills: vec!["Rust".to_string(), "SQL".to_string()],
                status: JobStatus::Open,
            };
            let results = rows
                .iter()
                .map(|(candidate_id, name, score)| screening_row(candidate_id, name, *score))
                .collect();
            self.results.insert(job.id.clone(), results);
            self.jobs.push(job);
            self
        }

        pub(super) fn refuse_delete(mut self, candidate_id: &str) -> Self {
            self.refused_deletes.insert(CandidateId::new(candidate_id));
            self
        }

        pub(super) fn delete_log(&self) -> Vec<CandidateId> {
            self.delete_log.lock().expect("delete log poisoned").clone()
        }
    }

    fn screening_row(id: &str, name: &str, score: f64) -> ScreeningResult {
        ScreeningResult {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{id}@example.com"),
            phone: String::new(),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            education: String::new(),
            experience: "Shipped billing systems\nat two startups".to_string(),
            score,
            skill_matches: vec!["Rust".to_string()],
        }
    }

    #[async_trait]
    impl ScoringGateway for ScriptedBackend {
        async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError> {
            Ok(self.jobs.clone())
        }

        async fn screening_results(
            &self,
            job_id: &JobId,
        ) -> Result<Vec<ScreeningResult>, GatewayError> {
            self.results
                .get(job_id)
                .cloned()
                .ok_or(GatewayError::NotFound)
        }

        async fn delete_candidate(&self, candidate_id: &CandidateId) -> Result<(), GatewayError> {
            self.delete_log
                .lock()
                .expect("delete log poisoned")
                .push(candidate_id.clone());
            if self.refused_deletes.contains(candidate_id) {
                return Err(GatewayError::Status {
                    status: 500,
                    message: "delete failed".to_string(),
                });
            }
            Ok(())
        }
    }

    pub(super) fn backend() -> ScriptedBackend {
        ScriptedBackend::default()
            .job(
                "j1",
                "Platform Engineer",
                &[("c1", "Ada Lovelace", 62.0), ("c2", "Grace Hopper", 80.0)],
            )
            .job(
                "j2",
                "Senior Backend Engineer",
                &[
                    ("c1", "Ada Lovelace", 81.0),
                    ("c3", "Alan Turing", 60.0),
                    ("c4", "Edsger Dijkstra", 90.0),
                    ("c5", "Barbara Liskov", 44.0),
                ],
            )
    }

    pub(super) async fn loaded(
        backend: ScriptedBackend,
    ) -> (RecruitingSession<ScriptedBackend>, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let session = RecruitingSession::new(backend.clone(), ConsistencyMode::LocalWins);
        session.refresh(None).await;
        (session, backend)
    }
}

use std::collections::BTreeSet;

use chrono::NaiveDate;
use hireflow::pipeline::{
    ActivityKind, CandidateId, FilterCriteria, JobId, LoadOutcome, PipelineStatus, ScoreFilter,
    TagId,
};

use common::{backend, loaded};

#[tokio::test]
async fn same_candidate_under_two_jobs_is_merged_to_the_higher_score() {
    let (session, _) = loaded(backend()).await;

    let everyone = session.displayed(&FilterCriteria::default());
    let c1: Vec<_> = everyone
        .iter()
        .filter(|candidate| candidate.id == CandidateId::new("c1"))
        .collect();

    assert_eq!(c1.len(), 1);
    assert_eq!(c1[0].score, 81.0);
    assert_eq!(everyone.len(), 5);
}

#[tokio::test]
async fn excellent_filter_keeps_only_scores_from_seventy_five() {
    let (session, _) = loaded(backend()).await;

    let excellent = session.displayed(&FilterCriteria {
        score_filter: ScoreFilter::Excellent,
        ..FilterCriteria::default()
    });

    let scores: Vec<f64> = excellent.iter().map(|candidate| candidate.score).collect();
    assert_eq!(scores, vec![90.0, 81.0, 80.0]);
}

#[tokio::test]
async fn first_status_change_creates_assignment_and_one_activity_entry() {
    let (session, _) = loaded(backend()).await;
    let c3 = CandidateId::new("c3");
    let j1 = JobId::new("j1");
    assert!(session.pipeline().assignment(&c3, &j1).is_none());
    let logged_before = session.activity(usize::MAX).len();

    let assignment = session
        .pipeline()
        .set_status(&c3, &j1, PipelineStatus::Interview);

    assert_eq!(assignment.status, PipelineStatus::Interview);
    let activity = session.activity(usize::MAX);
    assert_eq!(activity.len(), logged_before + 1);
    assert_eq!(activity[0].kind, ActivityKind::StatusChanged);
    assert_eq!(
        activity[0].metadata.get("new_status").map(String::as_str),
        Some("interview")
    );
}

#[tokio::test]
async fn tagging_twice_keeps_a_single_membership() {
    let (session, _) = loaded(backend()).await;
    let c1 = CandidateId::new("c1");
    let t1 = TagId::new("tag-1");

    session.annotations().add_tag(&c1, &t1);
    session.annotations().add_tag(&c1, &t1);

    let tags = session.annotations().tags_for(&c1);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, t1);
}

#[tokio::test]
async fn bulk_delete_converges_locally_whatever_the_backend_says() {
    let (session, backend) = loaded(backend().refuse_delete("c4")).await;
    let targets = vec![CandidateId::new("c4"), CandidateId::new("c5")];

    let report = session.delete_candidates(&targets).await;

    assert_eq!((report.succeeded, report.failed), (1, 1));
    assert_eq!(backend.delete_log(), targets);
    for id in &targets {
        assert!(!session.contains(id));
    }
}

#[tokio::test]
async fn export_of_the_displayed_list_starts_with_rank_one() {
    let (session, _) = loaded(backend()).await;
    let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date");

    let export = session
        .export(
            &FilterCriteria::for_job(JobId::new("j2")),
            &BTreeSet::new(),
            None,
            date,
        )
        .expect("export renders");

    assert_eq!(
        export.filename,
        "Senior_Backend_Engineer_candidates_2026-10-18.csv"
    );
    let mut reader = csv::Reader::from_reader(export.content.as_bytes());
    let headers = reader.headers().expect("header row").clone();
    assert_eq!(&headers[0], "Rank");
    let first = reader
        .records()
        .next()
        .expect("data row")
        .expect("row parses");
    assert_eq!(&first[0], "1");
    assert_eq!(&first[1], "Edsger Dijkstra");
    assert_eq!(&first[4], "90.0");
    assert_eq!(&first[8], "Shipped billing systems at two startups");
}

#[tokio::test]
async fn reload_keeps_pipeline_state_and_annotations() {
    let (session, _) = loaded(backend()).await;
    let c2 = CandidateId::new("c2");
    let j1 = JobId::new("j1");
    session.pipeline().set_status(&c2, &j1, PipelineStatus::Offer);
    session.annotations().add_note(&c2, "Offer drafted");

    assert_eq!(session.refresh(None).await, LoadOutcome::Skipped);
    assert!(matches!(
        session.refresh(Some(1)).await,
        LoadOutcome::Loaded { candidates: 5, .. }
    ));

    assert_eq!(
        session.pipeline().status(&c2, &j1),
        Some(PipelineStatus::Offer)
    );
    assert_eq!(session.annotations().notes(&c2).len(), 1);
}

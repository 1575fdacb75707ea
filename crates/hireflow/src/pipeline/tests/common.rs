use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::pipeline::domain::{Candidate, CandidateId, ConsistencyMode, Job, JobId, JobStatus};
use crate::pipeline::gateway::{GatewayError, ScoringGateway, ScreeningResult};
use crate::pipeline::session::RecruitingSession;

/// In-memory scoring backend. Jobs without registered results answer `NotFound`.
#[derive(Default)]
pub(super) struct MemoryGateway {
    jobs: Mutex<Vec<Job>>,
    results: Mutex<HashMap<JobId, Vec<ScreeningResult>>>,
    failing_jobs: Mutex<BTreeSet<JobId>>,
    failing_deletes: Mutex<BTreeSet<CandidateId>>,
    deleted: Mutex<Vec<CandidateId>>,
    listing_down: AtomicBool,
    reject_credentials: AtomicBool,
}

impl MemoryGateway {
    pub(super) fn with_job(self, job: Job, results: Vec<ScreeningResult>) -> Self {
        self.results
            .lock()
            .expect("results mutex poisoned")
            .insert(job.id.clone(), results);
        self.jobs.lock().expect("jobs mutex poisoned").push(job);
        self
    }

    pub(super) fn with_empty_job(self, job: Job) -> Self {
        self.jobs.lock().expect("jobs mutex poisoned").push(job);
        self
    }

    pub(super) fn set_results(&self, job_id: &JobId, results: Vec<ScreeningResult>) {
        self.results
            .lock()
            .expect("results mutex poisoned")
            .insert(job_id.clone(), results);
    }

    pub(super) fn clear_jobs(&self) {
        self.jobs.lock().expect("jobs mutex poisoned").clear();
    }

    pub(super) fn fail_job(&self, job_id: &JobId) {
        self.failing_jobs
            .lock()
            .expect("failing jobs mutex poisoned")
            .insert(job_id.clone());
    }

    pub(super) fn fail_delete(&self, candidate_id: &str) {
        self.failing_deletes
            .lock()
            .expect("failing deletes mutex poisoned")
            .insert(CandidateId::new(candidate_id));
    }

    pub(super) fn take_listing_down(&self) {
        self.listing_down.store(true, Ordering::SeqCst);
    }

    pub(super) fn reject_credentials(&self) {
        self.reject_credentials.store(true, Ordering::SeqCst);
    }

    /// Every remote delete attempted, in call order.
    pub(super) fn deleted(&self) -> Vec<CandidateId> {
        self.deleted.lock().expect("deleted mutex poisoned").clone()
    }

    fn rejected(&self) -> bool {
        self.reject_credentials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringGateway for MemoryGateway {
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError> {
        if self.rejected() {
            return Err(GatewayError::Unauthorized);
        }
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        Ok(self.jobs.lock().expect("jobs mutex poisoned").clone())
    }

    async fn screening_results(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<ScreeningResult>, GatewayError> {
        if self.rejected() {
            return Err(GatewayError::Unauthorized);
        }
        if self
            .failing_jobs
            .lock()
            .expect("failing jobs mutex poisoned")
            .contains(job_id)
        {
            return Err(GatewayError::Status {
                status: 500,
                message: "scoring worker crashed".to_string(),
            });
        }
        self.results
            .lock()
            .expect("results mutex poisoned")
            .get(job_id)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn delete_candidate(&self, candidate_id: &CandidateId) -> Result<(), GatewayError> {
        if self.rejected() {
            return Err(GatewayError::Unauthorized);
        }
        self.deleted
            .lock()
            .expect("deleted mutex poisoned")
            .push(candidate_id.clone());
        if self
            .failing_deletes
            .lock()
            .expect("failing deletes mutex poisoned")
            .contains(candidate_id)
        {
            return Err(GatewayError::Status {
                status: 503,
                message: "storage unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub(super) fn job(id: &str, title: &str, skills: &[&str]) -> Job {
    Job {
        id: JobId::new(id),
        title: title.to_string(),
        required_skills: skills.iter().map(|skill| skill.to_string()).collect(),
        status: JobStatus::Open,
    }
}

pub(super) fn result(id: &str, name: &str, score: f64, skills: &[&str]) -> ScreeningResult {
    ScreeningResult {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "+1 555 0100".to_string(),
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        education: "BSc Computer Science".to_string(),
        experience: "5 years".to_string(),
        score,
        skill_matches: skills.iter().take(1).map(|skill| skill.to_string()).collect(),
    }
}

pub(super) fn candidate(id: &str, name: &str, score: f64, skills: &[&str]) -> Candidate {
    result(id, name, score, skills).into_candidate(&job("j0", "Unassigned", &[]))
}

/// Two jobs sharing candidate `c1` (62 under j1, 81 under j2).
pub(super) fn two_job_gateway() -> MemoryGateway {
    MemoryGateway::default()
        .with_job(
            job("j1", "Backend Engineer", &["Rust", "Postgres"]),
            vec![
                result("c1", "Ada Lovelace", 62.0, &["Rust", "Python"]),
                result("c2", "Grace Hopper", 91.0, &["COBOL", "Rust"]),
                result("c3", "Alan Turing", 40.0, &["Python"]),
            ],
        )
        .with_job(
            job("j2", "Senior Data Analyst", &["SQL", "Python"]),
            vec![
                result("c1", "Ada Lovelace", 81.0, &["Rust", "Python"]),
                result("c4", "Edsger Dijkstra", 55.0, &["SQL", "Algol"]),
            ],
        )
}

pub(super) fn session(
    gateway: MemoryGateway,
    mode: ConsistencyMode,
) -> (RecruitingSession<MemoryGateway>, Arc<MemoryGateway>) {
    let gateway = Arc::new(gateway);
    (RecruitingSession::new(gateway.clone(), mode), gateway)
}

pub(super) async fn loaded_session(
    mode: ConsistencyMode,
) -> (RecruitingSession<MemoryGateway>, Arc<MemoryGateway>) {
    let (session, gateway) = session(two_job_gateway(), mode);
    session.refresh(None).await;
    (session, gateway)
}

pub(super) fn ids(candidates: &[Candidate]) -> Vec<&str> {
    candidates
        .iter()
        .map(|candidate| candidate.id.0.as_str())
        .collect()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

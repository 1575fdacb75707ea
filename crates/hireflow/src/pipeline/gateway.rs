use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::domain::{normalize_score, Candidate, CandidateId, Job, JobId};

/// One `(candidate, job) -> score, skill matches` fact reported by the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub experience: String,
    pub score: f64,
    #[serde(default)]
    pub skill_matches: Vec<String>,
}

impl ScreeningResult {
    /// Convert into a candidate tagged with the job it was screened against.
    ///
    /// Skill matches are kept only when the candidate lists the skill, compared without
    /// case, and repeats are dropped.
    pub fn into_candidate(self, job: &Job) -> Candidate {
        let mut skill_matches: Vec<String> = Vec::with_capacity(self.skill_matches.len());
        for skill in self.skill_matches {
            let listed = self
                .skills
                .iter()
                .any(|owned| owned.eq_ignore_ascii_case(&skill));
            let repeated = skill_matches
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(&skill));
            if listed && !repeated {
                skill_matches.push(skill);
            }
        }

        Candidate {
            id: CandidateId(self.id),
            name: self.name,
            email: self.email,
            phone: non_blank(self.phone),
            skills: self.skills,
            education: non_blank(self.education),
            experience: non_blank(self.experience),
            score: normalize_score(self.score),
            skill_matches,
            job_id: Some(job.id.clone()),
            job_title: Some(job.title.clone()),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Remote collaborator owning jobs, screening results, and resume deletion.
#[async_trait]
pub trait ScoringGateway: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError>;
    async fn screening_results(&self, job_id: &JobId)
        -> Result<Vec<ScreeningResult>, GatewayError>;
    async fn delete_candidate(&self, candidate_id: &CandidateId) -> Result<(), GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The credential was rejected; callers redirect to login instead of retrying.
    #[error("backend rejected the credential")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("backend responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }
}

/// `reqwest`-backed client for the recruiting backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpScoringGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpScoringGateway {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self::with_client(client, base_url, token))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(GatewayError::Unauthorized),
        StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
        other => {
            let message = response.text().await.unwrap_or_default();
            Err(GatewayError::Status {
                status: other.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ScoringGateway for HttpScoringGateway {
    async fn list_jobs(&self) -> Result<Vec<Job>, GatewayError> {
        let url = format!("{}/api/jobs/", self.base_url);
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<Vec<Job>>()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }

    async fn screening_results(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<ScreeningResult>, GatewayError> {
        let url = format!("{}/api/jobs/{}/results", self.base_url, job_id);
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<Vec<ScreeningResult>>()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }

    async fn delete_candidate(&self, candidate_id: &CandidateId) -> Result<(), GatewayError> {
        let url = format!("{}/api/resumes/{}", self.base_url, candidate_id);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::JobStatus;

    fn job() -> Job {
        Job {
            id: JobId::new("j1"),
            title: "Backend Engineer".to_string(),
            required_skills: vec!["Rust".to_string()],
            status: JobStatus::Open,
        }
    }

    #[test]
    fn screening_result_deserializes_backend_payload() {
        let payload = r#"{
            "id": "65f0c2",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "",
            "skills": ["Rust", "SQL"],
            "education": "BSc Mathematics",
            "experience": "",
            "score": 104.5,
            "skill_matches": ["Rust", "rust", "Kubernetes"]
        }"#;
        let result: ScreeningResult = serde_json::from_str(payload).expect("valid payload");
        let candidate = result.into_candidate(&job());

        assert_eq!(candidate.id, CandidateId::new("65f0c2"));
        assert_eq!(candidate.phone, None);
        assert_eq!(candidate.experience, None);
        assert_eq!(candidate.education.as_deref(), Some("BSc Mathematics"));
        assert_eq!(candidate.score, 100.0);
        assert_eq!(candidate.skill_matches, vec!["Rust".to_string()]);
        assert_eq!(candidate.job_id, Some(JobId::new("j1")));
        assert_eq!(candidate.job_title.as_deref(), Some("Backend Engineer"));
    }

    #[test]
    fn job_payload_tolerates_unknown_status_and_extra_fields() {
        let payload = r#"[
            {"id": "j1", "title": "Data Analyst", "required_skills": ["SQL"], "status": "archived", "company": "Acme"},
            {"id": "j2", "title": "Designer"}
        ]"#;
        let jobs: Vec<Job> = serde_json::from_str(payload).expect("valid payload");

        assert_eq!(jobs[0].status, JobStatus::Other);
        assert_eq!(jobs[1].status, JobStatus::Open);
        assert!(jobs[1].required_skills.is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = HttpScoringGateway::new("http://localhost:8000/", None).expect("client");
        assert_eq!(gateway.base_url(), "http://localhost:8000");
    }
}

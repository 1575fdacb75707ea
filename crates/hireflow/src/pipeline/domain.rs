use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable candidate identifier; the backend's resume id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub String);

impl TagId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

/// One scored resume as displayed in the results view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub skill_matches: Vec<String>,
    /// Job whose screening reported the retained score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

impl Candidate {
    pub fn match_level(&self) -> MatchLevel {
        MatchLevel::for_score(self.score)
    }

    pub fn has_skill_match(&self, skill: &str) -> bool {
        self.skill_matches
            .iter()
            .any(|matched| matched.eq_ignore_ascii_case(skill))
    }
}

/// Clamp an oracle score into `[0, 100]`; non-finite values collapse to zero.
pub fn normalize_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Score buckets shared by the quick filter, the export, and the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    Excellent,
    Good,
    Fair,
    Low,
}

impl MatchLevel {
    pub const EXCELLENT_FLOOR: f64 = 75.0;
    pub const GOOD_FLOOR: f64 = 60.0;
    pub const FAIR_FLOOR: f64 = 45.0;

    pub const fn ordered() -> [Self; 4] {
        [Self::Excellent, Self::Good, Self::Fair, Self::Low]
    }

    pub fn for_score(score: f64) -> Self {
        if score >= Self::EXCELLENT_FLOOR {
            Self::Excellent
        } else if score >= Self::GOOD_FLOOR {
            Self::Good
        } else if score >= Self::FAIR_FLOOR {
            Self::Fair
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Open,
    Closed,
    Draft,
    #[serde(other)]
    Other,
}

/// Hiring requisition; reference data owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
}

/// Pipeline position of a candidate for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    New,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

impl PipelineStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::New,
            Self::Screening,
            Self::Interview,
            Self::Offer,
            Self::Hired,
            Self::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Screening => "screening",
            Self::Interview => "interview",
            Self::Offer => "offer",
            Self::Hired => "hired",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal for downstream UI affordances only; transitions out are still allowed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Hired | Self::Rejected)
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<PipelineStatus>,
    pub to: PipelineStatus,
    pub changed_at: DateTime<Utc>,
}

/// "Candidate X is being considered for job Y"; unique per `(candidate_id, job_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub status: PipelineStatus,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub candidate_id: CandidateId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ResultsLoaded,
    StatusChanged,
    CandidateAssigned,
    CandidateUnassigned,
    NoteAdded,
    TagAdded,
    TagRemoved,
    Shortlisted,
    Unshortlisted,
    CandidateDeleted,
}

/// Immutable audit record; appended and never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<CandidateId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(kind: ActivityKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            candidate_id: None,
            job_id: None,
            metadata: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn for_candidate(mut self, candidate_id: &CandidateId) -> Self {
        self.candidate_id = Some(candidate_id.clone());
        self
    }

    pub fn for_job(mut self, job_id: &JobId) -> Self {
        self.job_id = Some(job_id.clone());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Delete policy for remote/local disagreement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Remove locally whatever the backend answered.
    #[default]
    LocalWins,
    /// Remove locally only what the backend confirmed.
    RemoteConfirmed,
}

impl ConsistencyMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local_wins" | "local-wins" | "optimistic" => Some(Self::LocalWins),
            "remote_confirmed" | "remote-confirmed" | "strict" => Some(Self::RemoteConfirmed),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LocalWins => "local_wins",
            Self::RemoteConfirmed => "remote_confirmed",
        }
    }
}

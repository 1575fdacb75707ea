use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::domain::{Assignment, Candidate, CandidateId, JobId, MatchLevel};
use super::store::CandidateStore;

/// Quick score-bucket filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFilter {
    #[default]
    All,
    Excellent,
    Good,
    Fair,
    Low,
}

impl ScoreFilter {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::All,
            Self::Excellent,
            Self::Good,
            Self::Fair,
            Self::Low,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|filter| filter.label().eq_ignore_ascii_case(value.trim()))
    }

    pub fn matches(self, score: f64) -> bool {
        let level = MatchLevel::for_score(score);
        match self {
            ScoreFilter::All => true,
            ScoreFilter::Excellent => level == MatchLevel::Excellent,
            ScoreFilter::Good => level == MatchLevel::Good,
            ScoreFilter::Fair => level == MatchLevel::Fair,
            ScoreFilter::Low => level == MatchLevel::Low,
        }
    }
}

/// Conjunctive criteria for the results list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub job_id: Option<JobId>,
    pub shortlisted_only: bool,
    pub search: String,
    pub score_filter: ScoreFilter,
    pub min_score: f64,
    pub max_score: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            job_id: None,
            shortlisted_only: false,
            search: String::new(),
            score_filter: ScoreFilter::All,
            min_score: 0.0,
            max_score: 100.0,
        }
    }
}

impl FilterCriteria {
    pub fn for_job(job_id: JobId) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::default()
        }
    }

    /// Apply against the store's current candidates, assignments, and shortlist.
    pub fn apply(&self, store: &CandidateStore) -> Vec<Candidate> {
        filter_candidates(
            store.candidates(),
            store.assignments(),
            store.shortlist(),
            self,
        )
    }

    pub fn matches_search(&self, candidate: &Candidate) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        candidate.name.to_lowercase().contains(&needle)
            || candidate.email.to_lowercase().contains(&needle)
            || candidate
                .skills
                .iter()
                .any(|skill| skill.to_lowercase().contains(&needle))
    }

    pub fn matches_range(&self, score: f64) -> bool {
        score >= self.min_score && score <= self.max_score
    }
}

/// Derive the visible subset. Pure and order-preserving: the output keeps the input's
/// relative order, so any ranking must already be applied to `candidates`.
pub fn filter_candidates<'a, I>(
    candidates: &[Candidate],
    assignments: I,
    shortlist: &BTreeSet<CandidateId>,
    criteria: &FilterCriteria,
) -> Vec<Candidate>
where
    I: IntoIterator<Item = &'a Assignment>,
{
    let assigned: Option<HashSet<CandidateId>> = criteria.job_id.as_ref().map(|job_id| {
        assignments
            .into_iter()
            .filter(|assignment| &assignment.job_id == job_id)
            .map(|assignment| assignment.candidate_id.clone())
            .collect()
    });

    candidates
        .iter()
        .filter(|candidate| {
            assigned
                .as_ref()
                .map_or(true, |assigned| assigned.contains(&candidate.id))
        })
        .filter(|candidate| !criteria.shortlisted_only || shortlist.contains(&candidate.id))
        .filter(|candidate| criteria.matches_search(candidate))
        .filter(|candidate| criteria.score_filter.matches(candidate.score))
        .filter(|candidate| criteria.matches_range(candidate.score))
        .cloned()
        .collect()
}

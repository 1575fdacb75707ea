use std::collections::HashMap;

use serde::Serialize;

use super::domain::{Candidate, MatchLevel, PipelineStatus};
use super::store::CandidateStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub level: MatchLevel,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: PipelineStatus,
    pub label: &'static str,
    pub count: usize,
}

/// Headline numbers over a candidate list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsSummary {
    pub total: usize,
    pub average_score: f64,
    pub buckets: Vec<BucketCount>,
    pub shortlisted: usize,
    pub pipeline: Vec<StatusCount>,
}

impl ResultsSummary {
    /// Summarise `candidates` (typically the displayed list) against the store's
    /// shortlist and assignments.
    pub fn from_store(store: &CandidateStore, candidates: &[Candidate]) -> Self {
        let mut levels: HashMap<MatchLevel, usize> = HashMap::new();
        for candidate in candidates {
            *levels.entry(candidate.match_level()).or_default() += 1;
        }

        let buckets = MatchLevel::ordered()
            .into_iter()
            .map(|level| BucketCount {
                level,
                label: level.label(),
                count: levels.get(&level).copied().unwrap_or_default(),
            })
            .collect();

        let mut statuses: HashMap<PipelineStatus, usize> = HashMap::new();
        for candidate in candidates {
            for assignment in store.assignments_for_candidate(&candidate.id) {
                *statuses.entry(assignment.status).or_default() += 1;
            }
        }

        let pipeline = PipelineStatus::ordered()
            .into_iter()
            .map(|status| StatusCount {
                status,
                label: status.label(),
                count: statuses.get(&status).copied().unwrap_or_default(),
            })
            .collect();

        let shortlisted = candidates
            .iter()
            .filter(|candidate| store.is_shortlisted(&candidate.id))
            .count();

        Self {
            total: candidates.len(),
            average_score: average_score(candidates),
            buckets,
            shortlisted,
            pipeline,
        }
    }

    pub fn bucket(&self, level: MatchLevel) -> usize {
        self.buckets
            .iter()
            .find(|bucket| bucket.level == level)
            .map_or(0, |bucket| bucket.count)
    }

    pub fn in_status(&self, status: PipelineStatus) -> usize {
        self.pipeline
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

/// Mean score rounded to one decimal; zero for an empty list.
pub fn average_score(candidates: &[Candidate]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    let total: f64 = candidates.iter().map(|candidate| candidate.score).sum();
    (total / candidates.len() as f64 * 10.0).round() / 10.0
}

//! Candidate screening results, pipeline tracking, and recruiter annotations for one
//! session.

pub mod annotations;
pub mod bulk;
pub mod controller;
pub mod domain;
pub mod export;
pub mod filter;
pub mod gateway;
pub mod loader;
pub mod questions;
pub mod router;
pub mod session;
pub mod store;
pub mod summary;

#[cfg(test)]
mod tests;

pub use annotations::AnnotationManager;
pub use bulk::{
    compare_candidates, BulkActionController, CompareError, ComparedCandidate, Comparison,
    DeleteReport,
};
pub use controller::{BoardColumn, PipelineBoard, PipelineController};
pub use domain::{
    ActivityEntry, ActivityKind, Assignment, Candidate, CandidateId, ConsistencyMode, Job,
    JobId, JobStatus, MatchLevel, Note, NoteId, PipelineStatus, StatusChange, Tag, TagId,
};
pub use export::{build_export, candidates_to_csv, export_filename, CsvExport, ExportError};
pub use filter::{filter_candidates, FilterCriteria, ScoreFilter};
pub use gateway::{GatewayError, HttpScoringGateway, ScoringGateway, ScreeningResult};
pub use loader::{merge_screening_results, LoadOutcome, LoadTicket, ScreeningResultsLoader};
pub use questions::{QuestionCategory, QuestionGenerator};
pub use router::pipeline_router;
pub use session::RecruitingSession;
pub use store::{CandidateStore, StoreHandle};
pub use summary::ResultsSummary;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    ActivityEntry, Assignment, Candidate, CandidateId, Job, JobId, Note, NoteId, PipelineStatus,
    StatusChange, Tag, TagId,
};

/// Session-scoped state behind the results view.
///
/// Every mutation is a plain method call; nothing here performs I/O. Candidates are kept in
/// display order (score-descending after a load) and are unique by id. Notes, tags, the
/// shortlist, and assignments are keyed by candidate id outside the candidate collection so
/// that replacing the collection on reload leaves them intact.
#[derive(Debug, Default)]
pub struct CandidateStore {
    candidates: Vec<Candidate>,
    jobs: Vec<Job>,
    assignments: BTreeMap<(CandidateId, JobId), Assignment>,
    tags: Vec<Tag>,
    candidate_tags: BTreeMap<CandidateId, BTreeSet<TagId>>,
    notes: BTreeMap<CandidateId, Vec<Note>>,
    shortlist: BTreeSet<CandidateId>,
    activity: Vec<ActivityEntry>,
    note_sequence: u64,
    tag_sequence: u64,
    sync: Option<SyncWindow>,
}

/// Ids deleted locally while a load is in flight.
#[derive(Debug, Default)]
struct SyncWindow {
    tombstones: BTreeSet<CandidateId>,
}

const DEFAULT_TAGS: &[(&str, &str)] = &[
    ("Top Talent", "#16a34a"),
    ("Follow Up", "#2563eb"),
    ("Needs Review", "#d97706"),
    ("Culture Fit", "#9333ea"),
];

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_tags() -> Self {
        let mut store = Self::default();
        for (label, color) in DEFAULT_TAGS {
            store.create_tag(label, color);
        }
        store
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| &candidate.id == id)
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.candidate(id).is_some()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| &job.id == id)
    }

    pub fn set_jobs(&mut self, jobs: Vec<Job>) {
        self.jobs = jobs;
    }

    /// Open a tombstone window for a load that is about to fetch.
    pub fn begin_sync(&mut self) {
        self.sync = Some(SyncWindow::default());
    }

    /// Close the tombstone window without writing anything.
    pub fn abandon_sync(&mut self) {
        self.sync = None;
    }

    pub fn sync_in_flight(&self) -> bool {
        self.sync.is_some()
    }

    /// Replace the candidate collection, skipping ids deleted since `begin_sync`.
    ///
    /// Returns the number of candidates written.
    pub fn replace_candidates(&mut self, candidates: Vec<Candidate>) -> usize {
        let tombstones = self.sync.take().map(|window| window.tombstones);
        self.candidates = match tombstones {
            Some(tombstones) if !tombstones.is_empty() => candidates
                .into_iter()
                .filter(|candidate| !tombstones.contains(&candidate.id))
                .collect(),
            _ => candidates,
        };
        self.candidates.len()
    }

    /// Remove a candidate and every structure keyed by its id. The activity log is kept.
    pub fn delete_candidate(&mut self, id: &CandidateId) -> bool {
        let before = self.candidates.len();
        self.candidates.retain(|candidate| &candidate.id != id);
        let removed = self.candidates.len() != before;

        self.assignments
            .retain(|(candidate_id, _), _| candidate_id != id);
        self.candidate_tags.remove(id);
        self.notes.remove(id);
        self.shortlist.remove(id);

        if let Some(window) = self.sync.as_mut() {
            window.tombstones.insert(id.clone());
        }

        removed
    }

    pub fn assignment(&self, candidate_id: &CandidateId, job_id: &JobId) -> Option<&Assignment> {
        self.assignments
            .get(&(candidate_id.clone(), job_id.clone()))
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    pub fn assignments_for_candidate<'a>(
        &'a self,
        candidate_id: &'a CandidateId,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments
            .values()
            .filter(move |assignment| &assignment.candidate_id == candidate_id)
    }

    /// Create an assignment with `status` unless one exists. Returns whether it was created.
    pub fn ensure_assignment(
        &mut self,
        candidate_id: &CandidateId,
        job_id: &JobId,
        status: PipelineStatus,
    ) -> bool {
        let key = (candidate_id.clone(), job_id.clone());
        if self.assignments.contains_key(&key) {
            return false;
        }

        let now = Utc::now();
        self.assignments.insert(
            key,
            Assignment {
                candidate_id: candidate_id.clone(),
                job_id: job_id.clone(),
                status,
                assigned_at: now,
                history: vec![StatusChange {
                    from: None,
                    to: status,
                    changed_at: now,
                }],
            },
        );
        true
    }

    /// Upsert the status of an assignment, returning the previous status if there was one.
    pub fn upsert_status(
        &mut self,
        candidate_id: &CandidateId,
        job_id: &JobId,
        status: PipelineStatus,
    ) -> (Option<PipelineStatus>, Assignment) {
        let now = Utc::now();
        let assignment = self
            .assignments
            .entry((candidate_id.clone(), job_id.clone()))
            .or_insert_with(|| Assignment {
                candidate_id: candidate_id.clone(),
                job_id: job_id.clone(),
                status,
                assigned_at: now,
                history: Vec::new(),
            });

        let previous = if assignment.history.is_empty() {
            None
        } else {
            Some(assignment.status)
        };
        assignment.status = status;
        assignment.history.push(StatusChange {
            from: previous,
            to: status,
            changed_at: now,
        });

        (previous, assignment.clone())
    }

    pub fn remove_assignment(
        &mut self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Option<Assignment> {
        self.assignments
            .remove(&(candidate_id.clone(), job_id.clone()))
    }

    pub fn add_note(&mut self, candidate_id: &CandidateId, content: &str) -> Note {
        self.note_sequence += 1;
        let note = Note {
            id: NoteId(format!("note-{:06}", self.note_sequence)),
            candidate_id: candidate_id.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.notes
            .entry(candidate_id.clone())
            .or_default()
            .push(note.clone());
        note
    }

    pub fn notes_for(&self, candidate_id: &CandidateId) -> &[Note] {
        self.notes
            .get(candidate_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|tag| &tag.id == id)
    }

    pub fn create_tag(&mut self, label: &str, color: &str) -> Tag {
        self.tag_sequence += 1;
        let tag = Tag {
            id: TagId(format!("tag-{}", self.tag_sequence)),
            label: label.to_string(),
            color: color.to_string(),
        };
        self.tags.push(tag.clone());
        tag
    }

    pub fn candidate_tags(&self, candidate_id: &CandidateId) -> Option<&BTreeSet<TagId>> {
        self.candidate_tags.get(candidate_id)
    }

    /// Returns whether membership changed.
    pub fn insert_tag(&mut self, candidate_id: &CandidateId, tag_id: &TagId) -> bool {
        self.candidate_tags
            .entry(candidate_id.clone())
            .or_default()
            .insert(tag_id.clone())
    }

    /// Returns whether membership changed.
    pub fn remove_tag(&mut self, candidate_id: &CandidateId, tag_id: &TagId) -> bool {
        let Some(tags) = self.candidate_tags.get_mut(candidate_id) else {
            return false;
        };
        let removed = tags.remove(tag_id);
        if tags.is_empty() {
            self.candidate_tags.remove(candidate_id);
        }
        removed
    }

    pub fn shortlist(&self) -> &BTreeSet<CandidateId> {
        &self.shortlist
    }

    pub fn is_shortlisted(&self, candidate_id: &CandidateId) -> bool {
        self.shortlist.contains(candidate_id)
    }

    /// Flip shortlist membership, returning the new state.
    pub fn toggle_shortlist(&mut self, candidate_id: &CandidateId) -> bool {
        if self.shortlist.remove(candidate_id) {
            false
        } else {
            self.shortlist.insert(candidate_id.clone());
            true
        }
    }

    pub fn record(&mut self, entry: ActivityEntry) {
        self.activity.push(entry);
    }

    /// Oldest first.
    pub fn activity(&self) -> &[ActivityEntry] {
        &self.activity
    }

    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.activity.iter().rev().take(limit).cloned().collect()
    }
}

/// Shared handle to the session store.
///
/// Locks are only held inside the closures passed to [`StoreHandle::read`] and
/// [`StoreHandle::write`], so no guard can be carried across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct StoreHandle {
    inner: Arc<Mutex<CandidateStore>>,
}

impl StoreHandle {
    pub fn new(store: CandidateStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn read<T>(&self, f: impl FnOnce(&CandidateStore) -> T) -> T {
        f(&self.lock())
    }

    pub fn write<T>(&self, f: impl FnOnce(&mut CandidateStore) -> T) -> T {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, CandidateStore> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{ActivityKind, PipelineStatus};

    fn candidate(id: &str, score: f64) -> Candidate {
        Candidate {
            id: CandidateId::new(id),
            name: format!("Candidate {id}"),
            email: format!("{id}@example.com"),
            phone: None,
            skills: Vec::new(),
            education: None,
            experience: None,
            score,
            skill_matches: Vec::new(),
            job_id: None,
            job_title: None,
        }
    }

    #[test]
    fn delete_cascades_to_keyed_structures_but_keeps_activity() {
        let mut store = CandidateStore::with_default_tags();
        let c1 = CandidateId::new("c1");
        let job = JobId::new("j1");
        store.replace_candidates(vec![candidate("c1", 80.0), candidate("c2", 70.0)]);
        store.ensure_assignment(&c1, &job, PipelineStatus::New);
        store.add_note(&c1, "strong systems background");
        let tag = store.tags()[0].id.clone();
        store.insert_tag(&c1, &tag);
        store.toggle_shortlist(&c1);
        store.record(ActivityEntry::new(ActivityKind::Shortlisted, "shortlisted").for_candidate(&c1));

        assert!(store.delete_candidate(&c1));

        assert!(!store.contains(&c1));
        assert!(store.assignment(&c1, &job).is_none());
        assert!(store.notes_for(&c1).is_empty());
        assert!(store.candidate_tags(&c1).is_none());
        assert!(!store.is_shortlisted(&c1));
        assert_eq!(store.activity().len(), 1);
        assert_eq!(store.candidates().len(), 1);
    }

    #[test]
    fn replace_skips_ids_deleted_during_sync() {
        let mut store = CandidateStore::new();
        store.replace_candidates(vec![candidate("c1", 80.0), candidate("c2", 70.0)]);

        store.begin_sync();
        store.delete_candidate(&CandidateId::new("c2"));
        let written =
            store.replace_candidates(vec![candidate("c1", 82.0), candidate("c2", 71.0)]);

        assert_eq!(written, 1);
        assert_eq!(store.candidates()[0].score, 82.0);
        assert!(!store.sync_in_flight());
    }

    #[test]
    fn upsert_status_tracks_history() {
        let mut store = CandidateStore::new();
        let c1 = CandidateId::new("c1");
        let job = JobId::new("j1");

        let (previous, created) = store.upsert_status(&c1, &job, PipelineStatus::Screening);
        assert_eq!(previous, None);
        assert_eq!(created.history.len(), 1);

        let (previous, updated) = store.upsert_status(&c1, &job, PipelineStatus::Interview);
        assert_eq!(previous, Some(PipelineStatus::Screening));
        assert_eq!(updated.status, PipelineStatus::Interview);
        assert_eq!(updated.history.len(), 2);
        assert_eq!(updated.history[1].from, Some(PipelineStatus::Screening));
        assert_eq!(store.assignments().count(), 1);
    }

    #[test]
    fn ensure_assignment_never_overwrites() {
        let mut store = CandidateStore::new();
        let c1 = CandidateId::new("c1");
        let job = JobId::new("j1");
        store.upsert_status(&c1, &job, PipelineStatus::Offer);

        assert!(!store.ensure_assignment(&c1, &job, PipelineStatus::New));
        assert_eq!(
            store.assignment(&c1, &job).map(|assignment| assignment.status),
            Some(PipelineStatus::Offer)
        );
    }

    #[test]
    fn notes_get_sequential_ids_in_creation_order() {
        let mut store = CandidateStore::new();
        let c1 = CandidateId::new("c1");
        let first = store.add_note(&c1, "phone screen booked");
        let second = store.add_note(&c1, "references pending");

        assert_ne!(first.id, second.id);
        let contents: Vec<_> = store
            .notes_for(&c1)
            .iter()
            .map(|note| note.content.as_str())
            .collect();
        assert_eq!(contents, vec!["phone screen booked", "references pending"]);
    }

    #[test]
    fn recent_activity_is_newest_first() {
        let mut store = CandidateStore::new();
        store.record(ActivityEntry::new(ActivityKind::ResultsLoaded, "first"));
        store.record(ActivityEntry::new(ActivityKind::ResultsLoaded, "second"));
        store.record(ActivityEntry::new(ActivityKind::ResultsLoaded, "third"));

        let recent = store.recent_activity(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "third");
        assert_eq!(recent[1].description, "second");
    }
}

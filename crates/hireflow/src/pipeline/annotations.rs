use super::domain::{ActivityEntry, ActivityKind, CandidateId, Note, Tag, TagId};
use super::store::{CandidateStore, StoreHandle};

/// Notes, tags, and shortlist membership keyed by candidate id.
///
/// Nothing here validates its inputs: blank note content and unknown ids are rejected by
/// the caller before reaching this layer.
#[derive(Debug, Clone)]
pub struct AnnotationManager {
    store: StoreHandle,
}

impl AnnotationManager {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn add_note(&self, candidate_id: &CandidateId, content: &str) -> Note {
        self.store.write(|store| {
            let note = store.add_note(candidate_id, content);
            let description = format!("Note added to {}", candidate_name(store, candidate_id));
            store.record(
                ActivityEntry::new(ActivityKind::NoteAdded, description)
                    .for_candidate(candidate_id)
                    .with_metadata("note_id", note.id.0.clone()),
            );
            note
        })
    }

    /// Creation order.
    pub fn notes(&self, candidate_id: &CandidateId) -> Vec<Note> {
        self.store
            .read(|store| store.notes_for(candidate_id).to_vec())
    }

    /// Idempotent. Returns whether membership changed; activity is only logged on change.
    pub fn add_tag(&self, candidate_id: &CandidateId, tag_id: &TagId) -> bool {
        self.store.write(|store| {
            let changed = store.insert_tag(candidate_id, tag_id);
            if changed {
                let description = format!(
                    "Tagged {} as {}",
                    candidate_name(store, candidate_id),
                    tag_label(store, tag_id)
                );
                store.record(
                    ActivityEntry::new(ActivityKind::TagAdded, description)
                        .for_candidate(candidate_id)
                        .with_metadata("tag_id", tag_id.0.clone()),
                );
            }
            changed
        })
    }

    /// Idempotent. Removing an absent tag is a no-op.
    pub fn remove_tag(&self, candidate_id: &CandidateId, tag_id: &TagId) -> bool {
        self.store.write(|store| {
            let changed = store.remove_tag(candidate_id, tag_id);
            if changed {
                let description = format!(
                    "Removed {} tag from {}",
                    tag_label(store, tag_id),
                    candidate_name(store, candidate_id)
                );
                store.record(
                    ActivityEntry::new(ActivityKind::TagRemoved, description)
                        .for_candidate(candidate_id)
                        .with_metadata("tag_id", tag_id.0.clone()),
                );
            }
            changed
        })
    }

    /// Tags currently attached to a candidate, in catalog order.
    pub fn tags_for(&self, candidate_id: &CandidateId) -> Vec<Tag> {
        self.store.read(|store| {
            let Some(attached) = store.candidate_tags(candidate_id) else {
                return Vec::new();
            };
            store
                .tags()
                .iter()
                .filter(|tag| attached.contains(&tag.id))
                .cloned()
                .collect()
        })
    }

    pub fn catalog(&self) -> Vec<Tag> {
        self.store.read(|store| store.tags().to_vec())
    }

    pub fn create_tag(&self, label: &str, color: &str) -> Tag {
        self.store.write(|store| store.create_tag(label.trim(), color.trim()))
    }

    /// Returns the new membership state.
    pub fn toggle_shortlist(&self, candidate_id: &CandidateId) -> bool {
        self.store.write(|store| {
            let shortlisted = store.toggle_shortlist(candidate_id);
            let name = candidate_name(store, candidate_id);
            let (kind, description) = if shortlisted {
                (ActivityKind::Shortlisted, format!("{name} added to shortlist"))
            } else {
                (
                    ActivityKind::Unshortlisted,
                    format!("{name} removed from shortlist"),
                )
            };
            store.record(ActivityEntry::new(kind, description).for_candidate(candidate_id));
            shortlisted
        })
    }

    pub fn is_shortlisted(&self, candidate_id: &CandidateId) -> bool {
        self.store.read(|store| store.is_shortlisted(candidate_id))
    }
}

fn candidate_name(store: &CandidateStore, candidate_id: &CandidateId) -> String {
    store
        .candidate(candidate_id)
        .map(|candidate| candidate.name.clone())
        .unwrap_or_else(|| candidate_id.to_string())
}

fn tag_label(store: &CandidateStore, tag_id: &TagId) -> String {
    store
        .tag(tag_id)
        .map(|tag| tag.label.clone())
        .unwrap_or_else(|| tag_id.0.clone())
}

//! In-memory document store

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use super::{DocumentStore, ReviewFilter, StatusCommit};
use crate::error::StoreError;
use crate::manuscript::{Manuscript, ManuscriptId};
use crate::review::{Review, ReviewId};
use crate::timeline::TimelineEntry;

#[derive(Debug, Default)]
struct Inner {
    manuscripts: HashMap<ManuscriptId, Manuscript>,
    reviews: HashMap<ReviewId, Review>,
    index_by_manuscript: HashMap<ManuscriptId, Vec<ReviewId>>,
    timelines: HashMap<ManuscriptId, Vec<TimelineEntry>>,
}

impl Inner {
    fn push_entry(&mut self, mut entry: TimelineEntry) -> TimelineEntry {
        let timeline = self.timelines.entry(entry.manuscript_id).or_default();
        entry.sequence = timeline.len() as u64 + 1;
        timeline.push(entry.clone());
        entry
    }

    /// Advance a manuscript's version after its review set changed
    fn touch(&mut self, id: &ManuscriptId) -> Result<(), StoreError> {
        let manuscript = self
            .manuscripts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        manuscript.version += 1;
        manuscript.updated_at = Utc::now();
        Ok(())
    }
}

/// In-memory store; a single lock makes every write atomic
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Database("document store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Database("document store lock poisoned".to_string()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.manuscripts.contains_key(&manuscript.id) {
            return Err(StoreError::AlreadyExists(manuscript.id.to_string()));
        }
        inner.manuscripts.insert(manuscript.id, manuscript.clone());
        Ok(())
    }

    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        Ok(self.read()?.manuscripts.get(id).cloned())
    }

    fn commit_status(&self, commit: StatusCommit) -> Result<Manuscript, StoreError> {
        let mut inner = self.write()?;

        let manuscript = inner
            .manuscripts
            .get_mut(&commit.manuscript_id)
            .ok_or_else(|| StoreError::NotFound(commit.manuscript_id.to_string()))?;

        if manuscript.version != commit.expected_version {
            return Err(StoreError::Conflict {
                expected: commit.expected_version,
                actual: manuscript.version,
            });
        }

        manuscript.status = commit.status;
        manuscript.status_override = commit.status_override;
        manuscript.version += 1;
        manuscript.updated_at = commit.entry.date;
        let updated = manuscript.clone();

        inner.push_entry(commit.entry);
        Ok(updated)
    }

    fn delete_manuscript(&self, id: &ManuscriptId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.manuscripts.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        for review_id in inner.index_by_manuscript.remove(id).unwrap_or_default() {
            inner.reviews.remove(&review_id);
        }
        inner.timelines.remove(id);
        Ok(())
    }

    fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if !inner.manuscripts.contains_key(&review.manuscript_id) {
            return Err(StoreError::NotFound(review.manuscript_id.to_string()));
        }
        if inner.reviews.contains_key(&review.id) {
            return Err(StoreError::AlreadyExists(review.id.to_string()));
        }
        inner
            .index_by_manuscript
            .entry(review.manuscript_id)
            .or_default()
            .push(review.id);
        inner.reviews.insert(review.id, review.clone());
        inner.touch(&review.manuscript_id)
    }

    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError> {
        Ok(self.read()?.reviews.get(id).cloned())
    }

    fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        match inner.reviews.get_mut(&review.id) {
            Some(stored) => *stored = review.clone(),
            None => return Err(StoreError::NotFound(review.id.to_string())),
        }
        inner.touch(&review.manuscript_id)
    }

    fn load_reviews(
        &self,
        manuscript_id: &ManuscriptId,
        filter: ReviewFilter,
    ) -> Result<Vec<Review>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .index_by_manuscript
            .get(manuscript_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.reviews.get(id))
                    .filter(|review| filter.matches(review))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn append_timeline(&self, entry: TimelineEntry) -> Result<TimelineEntry, StoreError> {
        let mut inner = self.write()?;
        if !inner.manuscripts.contains_key(&entry.manuscript_id) {
            return Err(StoreError::NotFound(entry.manuscript_id.to_string()));
        }
        Ok(inner.push_entry(entry))
    }

    fn load_timeline(&self, manuscript_id: &ManuscriptId) -> Result<Vec<TimelineEntry>, StoreError> {
        Ok(self
            .read()?
            .timelines
            .get(manuscript_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use crate::manuscript::{AuthorRecord, ManuscriptStatus};
    use crate::review::ReviewStatus;
    use crate::timeline::TimelineEvent;

    fn seeded() -> (InMemoryDocumentStore, Manuscript) {
        let store = InMemoryDocumentStore::new();
        let manuscript = Manuscript::new(
            "Title",
            ActorId::from("owner"),
            vec![AuthorRecord::new("Owner", "o@example.org").corresponding()],
        );
        store.insert_manuscript(&manuscript).unwrap();
        (store, manuscript)
    }

    fn commit(manuscript: &Manuscript, expected_version: u64) -> StatusCommit {
        StatusCommit {
            manuscript_id: manuscript.id,
            expected_version,
            status: ManuscriptStatus::Accepted,
            status_override: None,
            entry: TimelineEntry::new(manuscript.id, TimelineEvent::StatusDerived, "accepted"),
        }
    }

    #[test]
    fn test_commit_bumps_version_and_appends() {
        let (store, manuscript) = seeded();
        let updated = store.commit_status(commit(&manuscript, 0)).unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.status, ManuscriptStatus::Accepted);

        let timeline = store.load_timeline(&manuscript.id).unwrap();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].sequence, 1);
    }

    #[test]
    fn test_stale_commit_conflicts() {
        let (store, manuscript) = seeded();
        store.commit_status(commit(&manuscript, 0)).unwrap();

        let err = store.commit_status(commit(&manuscript, 0)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, actual: 1 }));
        assert_eq!(store.load_timeline(&manuscript.id).unwrap().len(), 1);
    }

    #[test]
    fn test_review_filter() {
        let (store, manuscript) = seeded();
        let pending = Review::new(manuscript.id, ActorId::from("r1"));
        let mut done = Review::new(manuscript.id, ActorId::from("r2"));
        done.status = ReviewStatus::Completed;
        store.insert_review(&pending).unwrap();
        store.insert_review(&done).unwrap();

        assert_eq!(store.load_reviews(&manuscript.id, ReviewFilter::All).unwrap().len(), 2);
        let completed = store
            .load_reviews(&manuscript.id, ReviewFilter::COMPLETED)
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done.id);
    }

    #[test]
    fn test_delete_cascades() {
        let (store, manuscript) = seeded();
        store.commit_status(commit(&manuscript, 0)).unwrap();
        let review = Review::new(manuscript.id, ActorId::from("r1"));
        store.insert_review(&review).unwrap();

        store.delete_manuscript(&manuscript.id).unwrap();
        assert!(store.load_manuscript(&manuscript.id).unwrap().is_none());
        assert!(store.load_review(&review.id).unwrap().is_none());
        assert!(store.load_timeline(&manuscript.id).unwrap().is_empty());
        assert!(matches!(
            store.delete_manuscript(&manuscript.id),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_review_writes_advance_version() {
        let (store, manuscript) = seeded();
        let mut review = Review::new(manuscript.id, ActorId::from("r1"));
        store.insert_review(&review).unwrap();
        assert_eq!(store.load_manuscript(&manuscript.id).unwrap().unwrap().version, 1);

        review.status = ReviewStatus::Completed;
        store.save_review(&review).unwrap();
        assert_eq!(store.load_manuscript(&manuscript.id).unwrap().unwrap().version, 2);

        // A derivation read before the save is now stale
        let err = store.commit_status(commit(&manuscript, 1)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, actual: 2 }));
    }

    #[test]
    fn test_review_requires_manuscript() {
        let store = InMemoryDocumentStore::new();
        let review = Review::new(ManuscriptId::new(), ActorId::from("r1"));
        assert!(matches!(store.insert_review(&review), Err(StoreError::NotFound(_))));
    }
}

//! Shared actors, manuscripts, and collaborator doubles for engine tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use imreview_core::{
    AcceptanceHandoff, Actor, ActorId, AuthorRecord, DecisionEngine, DocumentStore,
    HandoffError, HandoffOutcome, InMemoryDocumentStore, Manuscript, ManuscriptId,
    ManuscriptStatus, Recommendation, Review, ReviewCompletion, ReviewFilter, ReviewId,
    ReviewRatings, ReviewSubmission, Role, StatusCommit, StoreError, TimelineEntry,
};

/// Route engine logs to the test harness; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn editor() -> Actor {
    Actor::new("editor", vec![Role::Editor])
}

pub fn admin() -> Actor {
    Actor::new("admin", vec![Role::Admin])
}

pub fn owner() -> Actor {
    Actor::new("owner", vec![Role::Author])
}

pub fn reviewer(name: &str) -> Actor {
    Actor::new(name, vec![Role::Reviewer])
}

pub fn new_manuscript() -> Manuscript {
    Manuscript::new(
        "Majority Rules in Peer Review",
        ActorId::from("owner"),
        vec![
            AuthorRecord::new("Olive Owner", "owner@example.org").corresponding(),
            AuthorRecord::new("Carl Coauthor", "carl@example.org").with_affiliation("Leiden"),
        ],
    )
}

/// Store a manuscript already at `status`, bypassing the engine
pub fn seed_manuscript(store: &dyn DocumentStore, status: ManuscriptStatus) -> Manuscript {
    let manuscript = new_manuscript().with_status(status);
    store
        .insert_manuscript(&manuscript)
        .expect("seed manuscript");
    manuscript
}

/// Store a completed review directly, without running any decision
pub fn seed_completed_review(
    store: &dyn DocumentStore,
    manuscript: &ManuscriptId,
    reviewer: &str,
    recommendation: Recommendation,
) -> Review {
    let mut review = Review::new(*manuscript, ActorId::from(reviewer));
    review
        .complete(recommendation, ReviewRatings::default(), None)
        .expect("complete review");
    store.insert_review(&review).expect("seed review");
    review
}

/// Hand-off double that records every call and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingHandoff {
    calls: Mutex<Vec<(ManuscriptId, Option<ActorId>)>>,
    failing: AtomicBool,
}

impl RecordingHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let handoff = Self::default();
        handoff.failing.store(true, Ordering::SeqCst);
        handoff
    }

    pub fn calls(&self) -> Vec<(ManuscriptId, Option<ActorId>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl AcceptanceHandoff for RecordingHandoff {
    fn on_manuscript_accepted(
        &self,
        manuscript: &Manuscript,
        triggering_actor: Option<&ActorId>,
    ) -> Result<HandoffOutcome, HandoffError> {
        self.calls
            .lock()
            .unwrap()
            .push((manuscript.id, triggering_actor.cloned()));
        if self.failing.load(Ordering::SeqCst) {
            Err(HandoffError::Delivery("fee service timed out".to_string()))
        } else {
            Ok(HandoffOutcome::Dispatched)
        }
    }
}

/// Engine over an in-memory store with a recording hand-off
pub struct Harness {
    pub engine: DecisionEngine,
    pub store: Arc<InMemoryDocumentStore>,
    pub handoff: Arc<RecordingHandoff>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_handoff(RecordingHandoff::new())
    }

    pub fn with_handoff(handoff: RecordingHandoff) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryDocumentStore::new());
        let handoff = Arc::new(handoff);
        let engine = DecisionEngine::new(store.clone()).with_handoff(handoff.clone());
        Self {
            engine,
            store,
            handoff,
        }
    }

    /// Store a freshly submitted manuscript
    pub fn submit(&self) -> Manuscript {
        let manuscript = new_manuscript();
        manuscript.validate().expect("valid manuscript");
        self.store
            .insert_manuscript(&manuscript)
            .expect("insert manuscript");
        manuscript
    }

    pub fn assign(&self, manuscript: &ManuscriptId, name: &str) -> Review {
        self.engine
            .assign_reviewer(manuscript, &editor(), ActorId::from(name), None)
            .expect("assign reviewer")
    }

    pub fn complete(&self, review: &Review, recommendation: Recommendation) -> ReviewCompletion {
        self.engine
            .record_review_completion(
                &review.id,
                ReviewSubmission::new(review.reviewer_id.clone(), recommendation),
            )
            .expect("record review completion")
    }

    pub fn status(&self, manuscript: &ManuscriptId) -> ManuscriptStatus {
        self.store
            .load_manuscript(manuscript)
            .unwrap()
            .expect("manuscript exists")
            .status
    }

    pub fn timeline(&self, manuscript: &ManuscriptId) -> Vec<TimelineEntry> {
        self.store.load_timeline(manuscript).unwrap()
    }

    pub fn status_changes(&self, manuscript: &ManuscriptId) -> Vec<TimelineEntry> {
        self.timeline(manuscript)
            .into_iter()
            .filter(TimelineEntry::is_status_change)
            .collect()
    }
}

type Interference = Box<dyn FnOnce(&Arc<InMemoryDocumentStore>) + Send>;

/// Store wrapper that lets another writer get in just before the next
/// status commit
pub struct RacingStore {
    inner: Arc<InMemoryDocumentStore>,
    interference: Mutex<Option<Interference>>,
}

impl RacingStore {
    pub fn new(inner: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            inner,
            interference: Mutex::new(None),
        }
    }

    /// Run `f` against the underlying store right before the next commit
    pub fn interfere_once(&self, f: impl FnOnce(&Arc<InMemoryDocumentStore>) + Send + 'static) {
        *self.interference.lock().unwrap() = Some(Box::new(f));
    }
}

impl DocumentStore for RacingStore {
    fn insert_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError> {
        self.inner.insert_manuscript(manuscript)
    }

    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        self.inner.load_manuscript(id)
    }

    fn commit_status(&self, commit: StatusCommit) -> Result<Manuscript, StoreError> {
        let pending = self.interference.lock().unwrap().take();
        if let Some(interfere) = pending {
            interfere(&self.inner);
        }
        self.inner.commit_status(commit)
    }

    fn delete_manuscript(&self, id: &ManuscriptId) -> Result<(), StoreError> {
        self.inner.delete_manuscript(id)
    }

    fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        self.inner.insert_review(review)
    }

    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError> {
        self.inner.load_review(id)
    }

    fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        self.inner.save_review(review)
    }

    fn load_reviews(
        &self,
        manuscript_id: &ManuscriptId,
        filter: ReviewFilter,
    ) -> Result<Vec<Review>, StoreError> {
        self.inner.load_reviews(manuscript_id, filter)
    }

    fn append_timeline(&self, entry: TimelineEntry) -> Result<TimelineEntry, StoreError> {
        self.inner.append_timeline(entry)
    }

    fn load_timeline(&self, manuscript_id: &ManuscriptId) -> Result<Vec<TimelineEntry>, StoreError> {
        self.inner.load_timeline(manuscript_id)
    }
}

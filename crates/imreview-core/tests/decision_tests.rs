//! End-to-end decision engine scenarios

mod common;

use common::fixtures::{
    editor, owner, reviewer, seed_completed_review, seed_manuscript, Harness, RecordingHandoff,
};
use imreview_core::access::resolve;
use imreview_core::{
    Actor, ActorId, Capabilities, DocumentStore, HandoffReport, ManuscriptStatus, Recommendation, ReviewError,
    ReviewSubmission, Role, TimelineEvent,
};

use Recommendation::{Accept, MajorRevision, MinorRevision, Reject};

/// Drive a fresh manuscript through review with the given recommendations
fn run_reviews(recommendations: &[Recommendation]) -> (Harness, imreview_core::ManuscriptId) {
    let h = Harness::new();
    let m = h.submit();
    let reviews: Vec<_> = (0..recommendations.len())
        .map(|i| h.assign(&m.id, &format!("reviewer-{}", i)))
        .collect();
    for (review, rec) in reviews.iter().zip(recommendations) {
        h.complete(review, *rec);
    }
    (h, m.id)
}

// === Scenarios ===

#[test]
fn test_scenario_a_no_completed_reviews() {
    let h = Harness::new();
    let m = h.submit();
    h.assign(&m.id, "r1");

    let outcome = h.engine.on_review_completed(&m.id, None).unwrap();
    assert!(!outcome.status_changed());
    assert_eq!(outcome.status(), ManuscriptStatus::UnderReview);
}

#[test]
fn test_scenario_b_single_accept() {
    let (h, id) = run_reviews(&[Accept]);
    assert_eq!(h.status(&id), ManuscriptStatus::Accepted);
}

#[test]
fn test_scenario_c_even_split_accepts() {
    let (h, id) = run_reviews(&[Accept, Reject]);
    assert_eq!(h.status(&id), ManuscriptStatus::Accepted);
}

#[test]
fn test_scenario_d_reject_majority() {
    let (h, id) = run_reviews(&[Reject, Reject, MajorRevision]);
    assert_eq!(h.status(&id), ManuscriptStatus::Rejected);
}

#[test]
fn test_scenario_e_major_overrides_minor() {
    let (h, id) = run_reviews(&[MinorRevision, MajorRevision]);
    assert_eq!(h.status(&id), ManuscriptStatus::MajorRevisionRequested);
}

#[test]
fn test_scenario_f_published_is_public() {
    let h = Harness::new();
    let m = seed_manuscript(h.store.as_ref(), ManuscriptStatus::Published);
    let actor = Actor::new("bystander", vec![Role::Author, Role::Reviewer])
        .with_active_role(Role::Reviewer);

    assert!(resolve(&actor, &m, false).can_view());
    let view = h.engine.get_manuscript_for_actor(&m.id, &actor).unwrap();
    assert_eq!(view.capabilities, Capabilities::VIEW);
}

// === Audit trail ===

#[test]
fn test_timeline_grows_by_one_per_status_change() {
    let h = Harness::new();
    let m = h.submit();
    let r1 = h.assign(&m.id, "r1");
    let r2 = h.assign(&m.id, "r2");
    let r3 = h.assign(&m.id, "r3");
    let initial = h.timeline(&m.id).len();

    let changes = [
        h.complete(&r1, MinorRevision),
        h.complete(&r2, MajorRevision),
        h.complete(&r3, MajorRevision),
    ]
    .iter()
    .filter(|c| c.status_changed)
    .count();

    assert_eq!(changes, 2);
    assert_eq!(h.timeline(&m.id).len(), initial + changes);
    let sequences: Vec<u64> = h.timeline(&m.id).iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=sequences.len() as u64).collect::<Vec<_>>());
}

#[test]
fn test_transition_records_full_recommendation_list() {
    let (h, id) = run_reviews(&[MinorRevision, MajorRevision]);

    let last = h.status_changes(&id).pop().unwrap();
    assert_eq!(last.event, TimelineEvent::StatusDerived);
    assert_eq!(last.performed_by, Some(ActorId::from("reviewer-1")));
    let transition = last.transition.unwrap();
    assert_eq!(transition.from, ManuscriptStatus::MinorRevisionRequested);
    assert_eq!(transition.to, ManuscriptStatus::MajorRevisionRequested);
    assert_eq!(transition.review_count, 2);
    assert_eq!(transition.recommendations, vec![MinorRevision, MajorRevision]);
}

#[test]
fn test_audit_chain_is_consistent() {
    let (h, id) = run_reviews(&[MinorRevision, Accept, Accept, Reject]);

    let changes = h.status_changes(&id);
    assert_eq!(changes[0].transition.as_ref().unwrap().from, ManuscriptStatus::Submitted);
    for pair in changes.windows(2) {
        assert_eq!(
            pair[0].transition.as_ref().unwrap().to,
            pair[1].transition.as_ref().unwrap().from
        );
    }
    assert_eq!(changes.last().unwrap().transition.as_ref().unwrap().to, h.status(&id));
}

// === Acceptance hand-off ===

#[test]
fn test_handoff_fires_once_per_transition_into_accepted() {
    let (h, id) = run_reviews(&[Accept, Accept, Accept]);

    assert_eq!(h.status(&id), ManuscriptStatus::Accepted);
    let calls = h.handoff.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (id, Some(ActorId::from("reviewer-0"))));
}

#[test]
fn test_handoff_refires_after_leaving_accepted() {
    let h = Harness::new();
    let m = h.submit();
    let r1 = h.assign(&m.id, "r1");
    h.complete(&r1, Accept);

    h.engine
        .apply_editorial_override(&m.id, &editor(), ManuscriptStatus::UnderEditorialReview, "conflict of interest")
        .unwrap();
    let outcome = h.engine.recompute(&m.id, &editor()).unwrap();

    assert_eq!(outcome.status(), ManuscriptStatus::Accepted);
    assert_eq!(h.handoff.calls().len(), 2);
}

#[test]
fn test_failed_handoff_keeps_status() {
    let h = Harness::with_handoff(RecordingHandoff::failing());
    let m = h.submit();
    let r1 = h.assign(&m.id, "r1");

    let completion = h.complete(&r1, Accept);

    assert!(completion.status_changed);
    assert_eq!(completion.new_status, Some(ManuscriptStatus::Accepted));
    assert!(completion.decision_error.is_none());
    let report = completion.decision.unwrap().handoff.unwrap();
    assert!(matches!(report, HandoffReport::Failed(_)));
    assert_eq!(h.status(&m.id), ManuscriptStatus::Accepted);
    assert_eq!(h.status_changes(&m.id).len(), 2);
}

// === Data integrity ===

#[test]
fn test_corrupt_recommendation_leaves_status() {
    let h = Harness::new();
    let m = seed_manuscript(h.store.as_ref(), ManuscriptStatus::UnderReview);
    let mut review = seed_completed_review(h.store.as_ref(), &m.id, "r1", Accept);
    review.recommendation = Some(Recommendation::Unrecognized);
    h.store.save_review(&review).unwrap();

    let outcome = h.engine.on_review_completed(&m.id, None).unwrap();
    assert_eq!(outcome.status(), ManuscriptStatus::UnderReview);
    assert_eq!(outcome.tally.total, 0);
    assert_eq!(outcome.tally.anomalies, vec![review.id]);

    let view = h.engine.get_manuscript_for_actor(&m.id, &owner()).unwrap();
    assert_eq!(view.manuscript.status, ManuscriptStatus::UnderReview);
}

#[test]
fn test_anomaly_is_noted_on_committed_entry() {
    let h = Harness::new();
    let m = seed_manuscript(h.store.as_ref(), ManuscriptStatus::UnderReview);
    let mut bad = seed_completed_review(h.store.as_ref(), &m.id, "r1", Accept);
    bad.recommendation = None;
    h.store.save_review(&bad).unwrap();
    seed_completed_review(h.store.as_ref(), &m.id, "r2", Reject);

    let outcome = h.engine.on_review_completed(&m.id, None).unwrap();
    assert_eq!(outcome.status(), ManuscriptStatus::Rejected);
    let entry = h.status_changes(&m.id).pop().unwrap();
    assert_eq!(
        entry.metadata.get("excluded_reviews"),
        Some(&bad.id.to_string())
    );
}

// === Submission rules ===

#[test]
fn test_reviewer_submission_rules() {
    let h = Harness::new();
    let m = h.submit();
    let r1 = h.assign(&m.id, "r1");

    let err = h
        .engine
        .record_review_completion(&r1.id, ReviewSubmission::new(ActorId::from("r2"), Accept))
        .unwrap_err();
    assert!(matches!(err, ReviewError::Forbidden { .. }));

    let err = h
        .engine
        .record_review_completion(
            &r1.id,
            ReviewSubmission::new(ActorId::from("r1"), Recommendation::Unrecognized),
        )
        .unwrap_err();
    assert!(matches!(err, ReviewError::Validation(_)));

    let completion = h
        .engine
        .record_review_completion(
            &r1.id,
            ReviewSubmission::new(ActorId::from("r1"), MinorRevision).with_comments("Tighten section 3"),
        )
        .unwrap();
    assert_eq!(completion.review.comments.as_deref(), Some("Tighten section 3"));
    assert_eq!(completion.new_status, Some(ManuscriptStatus::MinorRevisionRequested));
}

#[test]
fn test_assigned_reviewer_capabilities() {
    let h = Harness::new();
    let m = h.submit();
    h.assign(&m.id, "r1");

    let view = h.engine.get_manuscript_for_actor(&m.id, &reviewer("r1")).unwrap();
    assert_eq!(view.capabilities, Capabilities::REVIEWING);

    let err = h
        .engine
        .get_manuscript_for_actor(&m.id, &reviewer("r2"))
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotFound(_)));
}

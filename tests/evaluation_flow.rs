use std::thread;

use campori_score::club::NewClub;
use campori_score::config::EventConfig;
use campori_score::identity::{Actor, Role};
use campori_score::scoring::CriterionAddress;
use campori_score::store::{JsonStore, MemoryStore, Store};
use campori_score::workflow::{Evaluation, SubmitOutcome};
use campori_score::ScoreError;

fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

fn staff(id: &str) -> Actor {
    Actor::new(id, Role::Staff)
}

fn addr(s: &str) -> CriterionAddress {
    s.parse().unwrap()
}

fn register<S: Store>(eval: &Evaluation<S>, id: &str) {
    eval.register_club(
        NewClub {
            id: id.to_string(),
            name: format!("Club {}", id),
            region: "central".to_string(),
            members: 20,
        },
        &admin(),
    )
    .unwrap();
}

fn memory_eval() -> Evaluation<MemoryStore> {
    let eval = Evaluation::new(EventConfig::default(), MemoryStore::new());
    register(&eval, "orion");
    eval
}

#[test]
fn test_fresh_club_scores_max() {
    let eval = memory_eval();
    let result = eval.score_breakdown("orion").unwrap();
    assert_eq!(result.total, 1910.0);
    assert_eq!(result.classification, "MISSIONÁRIO");
    assert_eq!(result.breakdown.evaluated, 0);
}

#[test]
fn test_partial_score_and_unevaluated_placeholders() {
    let eval = memory_eval();
    eval.submit_criterion_score("orion", &addr("general.uniform"), 40.0, &staff("s1"))
        .unwrap();
    // Every other criterion still holds its 0 placeholder without cost
    assert_eq!(eval.get_total_score("orion").unwrap(), 1870.0);
}

#[test]
fn test_demerit_never_blocked() {
    let eval = memory_eval();
    eval.submit_criterion_score("orion", &addr("general.uniform"), 80.0, &staff("s1"))
        .unwrap();
    let total = eval
        .record_demerit("orion", "late_arrival", 2, &staff("s2"))
        .unwrap();
    assert_eq!(total, 1710.0);
}

#[test]
fn test_double_lock_then_unlock_and_relock() {
    let eval = memory_eval();
    let uniform = addr("general.uniform");
    eval.submit_criterion_score("orion", &uniform, 40.0, &staff("s1"))
        .unwrap();
    let err = eval
        .submit_criterion_score("orion", &uniform, 40.0, &staff("s2"))
        .unwrap_err();
    assert!(matches!(err, ScoreError::AlreadyLocked { .. }));

    eval.unlock_all("orion", &admin()).unwrap();
    let outcome = eval
        .submit_criterion_score("orion", &uniform, 80.0, &staff("s2"))
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Locked(_)));
    assert_eq!(eval.get_total_score("orion").unwrap(), 1910.0);
}

#[test]
fn test_supervisor_edit_of_one_nested_criterion() {
    let eval = memory_eval();
    eval.submit_criterion_score("orion", &addr("events.carousel.noah"), 40.0, &staff("s1"))
        .unwrap();
    let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();

    let mut revised = session.original.clone();
    revised.set(&addr("events.carousel.abel"), 20.0).unwrap();
    let report = eval
        .commit_supervisor_edits("orion", &revised, &admin())
        .unwrap();

    assert_eq!(report.locked, vec![addr("events.carousel.abel")]);
    assert_eq!(report.restored, 1);
    assert!(eval
        .is_criterion_locked("orion", &addr("events.carousel.noah"))
        .unwrap());
    assert_eq!(eval.get_total_score("orion").unwrap(), 1890.0);
}

#[test]
fn test_reset_then_reconcile_is_clean() {
    let eval = memory_eval();
    register(&eval, "vega");
    eval.record_demerit("vega", "noise_after_curfew", 1, &staff("s1"))
        .unwrap();

    eval.reset_club("vega", &admin()).unwrap();
    assert_eq!(eval.get_total_score("vega").unwrap(), 1910.0);
    assert_eq!(eval.get_classification("vega").unwrap(), "MISSIONÁRIO");

    let first = eval.validate_all_classifications(&admin()).unwrap();
    assert_eq!(first.corrected, 0);
    assert_eq!(first.failed, 0);
    assert!(first.invalid_leaves.is_empty());
}

#[test]
fn test_concurrent_locks_single_winner() {
    let eval = memory_eval();
    let uniform = addr("general.uniform");

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let eval = &eval;
                let uniform = &uniform;
                scope.spawn(move || {
                    eval.submit_criterion_score("orion", uniform, 40.0, &staff(&format!("s{}", i)))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(ScoreError::AlreadyLocked { .. })))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(eval.get_total_score("orion").unwrap(), 1870.0);
}

#[test]
fn test_json_store_persists_locks_and_totals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clubs.json");

    {
        let eval = Evaluation::new(EventConfig::default(), JsonStore::new(path.clone()));
        register(&eval, "orion");
        eval.submit_criterion_score("orion", &addr("general.uniform"), 40.0, &staff("s1"))
            .unwrap();
        eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
    }

    let eval = Evaluation::new(EventConfig::default(), JsonStore::new(path));
    assert_eq!(eval.get_total_score("orion").unwrap(), 1870.0);
    // The edit session survives a restart and still protects the criterion
    let err = eval
        .submit_criterion_score("orion", &addr("general.uniform"), 80.0, &staff("s2"))
        .unwrap_err();
    assert!(matches!(err, ScoreError::AlreadyLocked { .. }));
    assert_eq!(eval.cancel_supervisor_edits("orion", &admin()).unwrap(), 1);

    let entry = eval
        .lock_entry("orion", &addr("general.uniform"))
        .unwrap()
        .unwrap();
    assert_eq!(entry.evaluator, "s1");
    assert!(entry.is_locked);
}

#[test]
fn test_json_store_failed_transaction_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clubs.json");
    let eval = Evaluation::new(EventConfig::default(), JsonStore::new(path.clone()));
    register(&eval, "orion");
    let before = std::fs::read_to_string(&path).unwrap();

    let err = eval
        .submit_criterion_score("orion", &addr("general.uniform"), 55.0, &staff("s1"))
        .unwrap_err();
    assert!(matches!(err, ScoreError::Validation { .. }));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

use chrono::NaiveDate;
use lms::catalog::DefaultTypes;
use lms::engine::{Decision, LeaveEngine};
use lms::error::DomainError;
use lms::model::leave_request::LeaveStatus;
use lms::model::leave_type::{LeaveCategory, NewLeaveType};
use lms::model::role::{Principal, Role};
use lms::notify::TracingNotifier;
use lms::policy::AccessPolicy;
use lms::store::{LedgerSettings, MemoryStore};
use std::sync::Arc;

fn engine_with(settings: LedgerSettings) -> LeaveEngine {
    LeaveEngine::new(
        Arc::new(MemoryStore::new(settings)),
        AccessPolicy::open(),
        Arc::new(TracingNotifier),
    )
}

fn engine() -> LeaveEngine {
    engine_with(LedgerSettings {
        initial_allotment: 20,
        annual_cap: None,
    })
}

async fn seeded(engine: &LeaveEngine) -> DefaultTypes {
    engine.catalog().seed_defaults().await.unwrap()
}

fn employee(id: u64) -> Principal {
    Principal {
        user_id: id,
        role: Role::Employee,
    }
}

fn manager(id: u64) -> Principal {
    Principal {
        user_id: id,
        role: Role::Manager,
    }
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

// Mon 2026-03-02 .. Wed 2026-03-04: three business days.
const MON: &str = "2026-03-02";
const WED: &str = "2026-03-04";

#[actix_web::test]
async fn submit_with_reversed_range_creates_nothing() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);

    let err = engine
        .submit(&user, types.annual.id, date(WED), date(MON), "trip".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert!(engine.own_requests(&user, None).await.unwrap().is_empty());
}

#[actix_web::test]
async fn submit_rejects_blank_reason_and_weekend_only_range() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);

    let err = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "   ".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // Sat..Sun has zero business days
    let err = engine
        .submit(
            &user,
            types.annual.id,
            date("2026-03-07"),
            date("2026-03-08"),
            "weekend".into(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[actix_web::test]
async fn submit_with_unknown_type_fails_not_found() {
    let engine = engine();
    seeded(&engine).await;

    let err = engine
        .submit(&employee(10), 999, date(MON), date(WED), "trip".into())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[actix_web::test]
async fn approve_then_cancel_round_trips_the_balance() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);
    let boss = manager(2);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();
    assert_eq!(request.status, LeaveStatus::Pending);
    assert_eq!(request.duration, 3);
    // pending requests do not touch the ledger
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 20);

    let approved = engine
        .decide(&boss, request.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(approved.status, LeaveStatus::Approved);
    assert_eq!(approved.decided_by, Some(2));
    assert!(approved.decided_at.is_some());
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 17);

    let cancelled = engine.cancel(&user, request.id).await.unwrap();
    assert_eq!(cancelled.status, LeaveStatus::Cancelled);
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 20);
}

#[actix_web::test]
async fn sick_leave_auto_approves_and_deducts_immediately() {
    let engine = engine_with(LedgerSettings {
        initial_allotment: 5,
        annual_cap: None,
    });
    let types = seeded(&engine).await;
    let user = employee(10);

    let request = engine
        .submit(
            &user,
            types.sick.id,
            date("2026-03-03"),
            date("2026-03-03"),
            "flu".into(),
        )
        .await
        .unwrap();

    assert_eq!(request.status, LeaveStatus::Approved);
    assert!(request.decided_at.is_some());
    assert_eq!(request.decided_by, None);
    assert_eq!(engine.balance(&user, None, types.sick.id).await.unwrap(), 4);
}

#[actix_web::test]
async fn failed_reservation_leaves_request_pending() {
    let engine = engine_with(LedgerSettings {
        initial_allotment: 2,
        annual_cap: None,
    });
    let types = seeded(&engine).await;
    let user = employee(10);
    let boss = manager(2);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();

    let err = engine
        .decide(&boss, request.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::InsufficientBalance {
            needed: 3,
            available: 2
        }
    ));

    let unchanged = engine.request(&user, request.id).await.unwrap();
    assert_eq!(unchanged.status, LeaveStatus::Pending);
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 2);
}

#[actix_web::test]
async fn concurrent_decisions_have_exactly_one_winner() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();

    let approver = manager(2);
    let rejecter = manager(3);
    let approve = engine.decide(&approver, request.id, Decision::Approve);
    let reject = engine.decide(&rejecter, request.id, Decision::Reject);
    let (a, r) = futures::join!(approve, reject);

    assert_eq!(a.is_ok() as u8 + r.is_ok() as u8, 1, "exactly one decision wins");
    let loser = if a.is_ok() { r.unwrap_err() } else { a.unwrap_err() };
    assert!(matches!(loser, DomainError::State(_)));

    // the ledger reflects only the winning transition
    let final_status = engine.request(&user, request.id).await.unwrap().status;
    let balance = engine.balance(&user, None, types.annual.id).await.unwrap();
    match final_status {
        LeaveStatus::Approved => assert_eq!(balance, 17),
        LeaveStatus::Rejected => assert_eq!(balance, 20),
        other => panic!("unexpected final status {other}"),
    }
}

#[actix_web::test]
async fn second_decision_observes_state_error() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);
    let boss = manager(2);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();
    engine
        .decide(&boss, request.id, Decision::Reject)
        .await
        .unwrap();

    let err = engine
        .decide(&boss, request.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::State(_)));
    // rejection never touched the ledger
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 20);
}

#[actix_web::test]
async fn employees_cannot_decide_requests() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();

    let err = engine
        .decide(&employee(11), request.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
    assert_eq!(
        engine.request(&user, request.id).await.unwrap().status,
        LeaveStatus::Pending
    );
}

#[actix_web::test]
async fn strangers_cannot_cancel_someone_elses_request() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();

    let err = engine.cancel(&employee(11), request.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
    assert_eq!(
        engine.request(&user, request.id).await.unwrap().status,
        LeaveStatus::Pending
    );
}

#[actix_web::test]
async fn cancelling_pending_request_leaves_balance_alone() {
    let engine = engine();
    let types = seeded(&engine).await;
    let user = employee(10);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();
    let cancelled = engine.cancel(&user, request.id).await.unwrap();
    assert_eq!(cancelled.status, LeaveStatus::Cancelled);
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 20);

    // terminal states refuse further cancellation
    let err = engine.cancel(&user, request.id).await.unwrap_err();
    assert!(matches!(err, DomainError::State(_)));
}

#[actix_web::test]
async fn approving_non_deducting_type_keeps_balance() {
    let engine = engine();
    seeded(&engine).await;
    let user = employee(10);
    let boss = manager(2);

    let unpaid = engine
        .catalog()
        .create(NewLeaveType {
            name: "Unpaid Personal".into(),
            category: LeaveCategory::Personal,
            requires_approval: true,
            deducts_balance: false,
            description: None,
        })
        .await
        .unwrap();

    let request = engine
        .submit(&user, unpaid.id, date(MON), date(WED), "errand".into())
        .await
        .unwrap();
    engine
        .decide(&boss, request.id, Decision::Approve)
        .await
        .unwrap();

    assert_eq!(engine.balance(&user, None, unpaid.id).await.unwrap(), 20);
}

#[actix_web::test]
async fn release_is_bounded_by_the_annual_cap() {
    let engine = engine_with(LedgerSettings {
        initial_allotment: 20,
        annual_cap: Some(18),
    });
    let types = seeded(&engine).await;
    let user = employee(10);
    let boss = manager(2);

    let request = engine
        .submit(&user, types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();
    engine
        .decide(&boss, request.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 17);

    engine.cancel(&user, request.id).await.unwrap();
    assert_eq!(engine.balance(&user, None, types.annual.id).await.unwrap(), 18);
}

#[actix_web::test]
async fn team_scope_limits_which_requests_a_manager_decides() {
    let scope_boss = Principal {
        user_id: 2,
        role: Role::Manager,
    };
    let engine = LeaveEngine::new(
        Arc::new(MemoryStore::new(LedgerSettings::default())),
        // manager 2 only manages user 10
        AccessPolicy::with_team_scope(Arc::new(|p, owner| p.user_id == 2 && owner == 10)),
        Arc::new(TracingNotifier),
    );
    let types = seeded(&engine).await;

    let in_team = engine
        .submit(&employee(10), types.annual.id, date(MON), date(WED), "a".into())
        .await
        .unwrap();
    let outside = engine
        .submit(&employee(99), types.annual.id, date(MON), date(WED), "b".into())
        .await
        .unwrap();

    engine
        .decide(&scope_boss, in_team.id, Decision::Approve)
        .await
        .unwrap();
    let err = engine
        .decide(&scope_boss, outside.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    // team listing only shows in-scope owners
    let team = engine.team_requests(&scope_boss, None).await.unwrap();
    assert!(team.iter().all(|r| r.user_id == 10));
}

#[actix_web::test]
async fn deleting_a_referenced_type_conflicts() {
    let engine = engine();
    let types = seeded(&engine).await;

    engine
        .submit(&employee(10), types.annual.id, date(MON), date(WED), "trip".into())
        .await
        .unwrap();

    let err = engine.catalog().delete(types.annual.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // unreferenced types delete fine
    engine.catalog().delete(types.sick.id).await.unwrap();
    let err = engine.catalog().get(types.sick.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[actix_web::test]
async fn balance_lookup_respects_roles() {
    let engine = engine();
    let types = seeded(&engine).await;

    // another employee's balance is off limits
    let err = engine
        .balance(&employee(11), Some(10), types.annual.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));

    // a manager may look anyone up
    assert_eq!(
        engine
            .balance(&manager(2), Some(10), types.annual.id)
            .await
            .unwrap(),
        20
    );
}

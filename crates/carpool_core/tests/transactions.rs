use carpool_core::{
    ConstraintKind, DataAccessKind, DomainError, ErrorCategory, ErrorKind, Route, SessionMode,
    StoreError, TransactionCoordinator, Trip, TripStatus, UnitOfWorkState, User, WorkError,
};
use std::panic::{catch_unwind, AssertUnwindSafe};

fn coordinator() -> TransactionCoordinator {
    TransactionCoordinator::open_in_memory().unwrap()
}

fn row_count(coordinator: &TransactionCoordinator, table: &str) -> u64 {
    coordinator
        .run_read_only(|session| Ok(session.row_count(table)?))
        .unwrap()
}

/// Persists a driver, a route and a scheduled trip; returns the trip id.
fn seed_trip(coordinator: &TransactionCoordinator) -> String {
    coordinator
        .run_in_transaction(|session| {
            let driver = session
                .store::<User>()
                .persist(&User::new("Eve", "Blanc", "eve@example.com", "h"))?;
            let route = session
                .store::<Route>()
                .persist(&Route::new("Tours", "Orléans", 116.0, 75))?;
            Ok(session
                .store::<Trip>()
                .persist(&Trip::new(driver, route, 1_700_000_000_000, 3, 1_100))?)
        })
        .unwrap()
}

#[test]
fn successful_unit_of_work_commits() {
    let coordinator = coordinator();
    assert_eq!(coordinator.last_state(), UnitOfWorkState::NotStarted);

    seed_trip(&coordinator);

    assert_eq!(coordinator.last_state(), UnitOfWorkState::Committed);
    assert!(!coordinator.is_active());
    assert_eq!(row_count(&coordinator, "trips"), 1);
}

#[test]
fn failure_after_first_write_persists_neither_entity() {
    let coordinator = coordinator();

    let err = coordinator
        .run_in_transaction(|session| -> Result<(), WorkError> {
            session
                .store::<Route>()
                .persist(&Route::new("Pau", "Tarbes", 43.0, 40))?;
            Err(DomainError::new("route_rejected", "second write never happens").into())
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert_eq!(coordinator.last_state(), UnitOfWorkState::RolledBack);
    assert_eq!(row_count(&coordinator, "routes"), 0);
}

#[test]
fn failed_status_update_leaves_persisted_status_unchanged() {
    let coordinator = coordinator();
    let trip_id = seed_trip(&coordinator);

    let err = coordinator
        .run_in_transaction(|session| -> Result<(), WorkError> {
            let trips = session.store::<Trip>();
            let mut trip = trips.find_by_id(&trip_id)?.unwrap();
            trip.status = TripStatus::InProgress;
            trips.merge(&trip)?;
            session
                .store::<User>()
                .persist(&User::new("Eve", "Clone", "eve@example.com", "h"))?;
            Ok(())
        })
        .unwrap_err();
    assert!(err.as_store().unwrap().is_unique_violation());

    let status = coordinator
        .run_read_only(|session| Ok(session.store::<Trip>().find_by_id(&trip_id)?))
        .unwrap()
        .unwrap()
        .status;
    assert_eq!(status, TripStatus::Scheduled);
}

#[test]
fn business_error_keeps_its_domain_kind_after_rollback() {
    let coordinator = coordinator();

    let err = coordinator
        .run_in_transaction(|_| -> Result<(), WorkError> {
            Err(DomainError::new("seat_capacity_exceeded", "no seats left").into())
        })
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Domain);
    let domain = err.as_domain().unwrap();
    assert_eq!(domain.rule, "seat_capacity_exceeded");
    assert_eq!(domain.message, "no seats left");
}

#[test]
fn read_only_span_never_commits_and_reports_write_attempts() {
    let coordinator = coordinator();

    let err = coordinator
        .run_read_only(|session| {
            assert_eq!(session.mode(), SessionMode::ReadOnly);
            session
                .store::<Route>()
                .persist(&Route::new("Caen", "Rouen", 130.0, 90))?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(
        err.as_store().unwrap().data_access_kind(),
        Some(DataAccessKind::ReadOnly)
    );
    assert_eq!(row_count(&coordinator, "routes"), 0);

    // The connection is writable again once the read-only span ends.
    seed_trip(&coordinator);
    assert_eq!(row_count(&coordinator, "routes"), 1);
}

#[test]
fn nested_calls_reuse_the_active_span() {
    let coordinator = coordinator();

    let err = coordinator
        .run_in_transaction(|outer| -> Result<(), WorkError> {
            assert!(!outer.is_nested());
            outer
                .store::<Route>()
                .persist(&Route::new("Brest", "Quimper", 72.0, 60))?;

            coordinator.run_in_transaction(|inner| {
                assert!(inner.is_nested());
                assert_eq!(inner.span_id(), outer.span_id());
                inner
                    .store::<Route>()
                    .persist(&Route::new("Quimper", "Lorient", 68.0, 55))?;
                Ok(())
            })?;

            outer.run_read_only(|inner| {
                assert_eq!(inner.span_id(), outer.span_id());
                assert_eq!(inner.row_count("routes")?, 2);
                Ok(())
            })?;

            Err(DomainError::new("abort", "undo both writes").into())
        })
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Domain);
    assert_eq!(row_count(&coordinator, "routes"), 0);
}

#[test]
fn write_span_inside_read_only_span_is_rejected() {
    let coordinator = coordinator();

    let err = coordinator
        .run_read_only(|session| session.run_in_transaction(|_| Ok(())))
        .unwrap_err();
    assert_eq!(
        err.as_store().unwrap().data_access_kind(),
        Some(DataAccessKind::ReadOnly)
    );

    let nested = coordinator
        .run_read_only(|_| coordinator.run_in_transaction(|_| Ok(())))
        .unwrap_err();
    assert_eq!(nested.kind(), ErrorKind::DataAccess);
}

#[test]
fn panic_inside_unit_of_work_rolls_back() {
    let coordinator = coordinator();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        coordinator.run_in_transaction(|session| -> Result<(), WorkError> {
            session
                .store::<Route>()
                .persist(&Route::new("Nice", "Cannes", 33.0, 35))?;
            panic!("driver app crashed");
        })
    }));

    assert!(outcome.is_err());
    assert!(!coordinator.is_active());
    assert_eq!(coordinator.last_state(), UnitOfWorkState::RolledBack);
    assert_eq!(row_count(&coordinator, "routes"), 0);
}

#[test]
fn committed_data_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("carpool.sqlite3");

    let trip_id = seed_trip(&TransactionCoordinator::open(&path).unwrap());

    let reopened = TransactionCoordinator::open(&path).unwrap();
    let trip = reopened
        .run_read_only(|session| Ok(session.store::<Trip>().find_by_id(&trip_id)?))
        .unwrap()
        .unwrap();
    assert_eq!(trip.seats_total, 3);
}

#[test]
fn deferred_constraint_failing_at_commit_rolls_back_and_reports_commit() {
    let coordinator = coordinator();

    let err = coordinator
        .run_in_transaction(|session| {
            coordinator
                .connection()
                .execute_batch("PRAGMA defer_foreign_keys = ON;")
                .unwrap();
            session
                .store::<Route>()
                .persist(&Route::new("Albi", "Rodez", 77.0, 70))?;
            // Driver and route do not exist; the check only runs at COMMIT.
            Ok(session
                .store::<Trip>()
                .persist(&Trip::new("no-driver", "no-route", 0, 2, 500))?)
        })
        .unwrap_err();

    match err {
        WorkError::Store(StoreError::DataAccess {
            operation, kind, ..
        }) => {
            assert_eq!(operation, "commit");
            assert_eq!(kind, DataAccessKind::ConstraintViolation(ConstraintKind::ForeignKey));
        }
        other => panic!("expected a commit failure, got {other}"),
    }
    assert_eq!(coordinator.last_state(), UnitOfWorkState::RolledBack);
    assert!(!coordinator.is_active());
    assert_eq!(row_count(&coordinator, "routes"), 0);
    assert_eq!(row_count(&coordinator, "trips"), 0);
}

#[test]
fn span_ended_inside_failed_work_surfaces_both_errors() {
    let coordinator = coordinator();

    let err = coordinator
        .run_in_transaction(|session| -> Result<(), WorkError> {
            session
                .store::<Route>()
                .persist(&Route::new("Auch", "Agen", 71.0, 65))?;
            coordinator.connection().execute_batch("COMMIT;").unwrap();
            Err(DomainError::new("route_rejected", "too late to undo").into())
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CompoundFailure);
    assert_eq!(err.category(), ErrorCategory::Domain);
    match err {
        WorkError::CompoundFailure { original, rollback } => {
            assert_eq!(original.as_domain().unwrap().rule, "route_rejected");
            assert_eq!(rollback.data_access_kind(), Some(DataAccessKind::StaleSession));
        }
        other => panic!("expected a compound failure, got {other}"),
    }
    assert_eq!(coordinator.last_state(), UnitOfWorkState::RolledBack);
    assert!(!coordinator.is_active());
}

#[test]
fn span_ended_inside_successful_work_is_not_reported_as_committed() {
    let coordinator = coordinator();

    let err = coordinator
        .run_in_transaction(|session| {
            session
                .store::<Route>()
                .persist(&Route::new("Sète", "Agde", 24.0, 25))?;
            coordinator.connection().execute_batch("COMMIT;").unwrap();
            Ok(())
        })
        .unwrap_err();

    let store = err.as_store().unwrap();
    assert_eq!(store.data_access_kind(), Some(DataAccessKind::StaleSession));
    assert_ne!(coordinator.last_state(), UnitOfWorkState::Committed);

    // The coordinator is usable again afterwards.
    seed_trip(&coordinator);
    assert_eq!(coordinator.last_state(), UnitOfWorkState::Committed);
}

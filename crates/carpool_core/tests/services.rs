use carpool_core::dao::Dao;
use carpool_core::document::DocumentStores;
use carpool_core::file::CsvStore;
use carpool_core::service::rules;
use carpool_core::{
    Booking, BookingLedger, BookingStatus, ErrorCategory, ErrorKind, Route,
    TransactionCoordinator, Trip, TripService, TripStatus, UnsupportedCheckPolicy, User,
    WorkError,
};

struct Fixture {
    coordinator: TransactionCoordinator,
    driver: String,
    riders: Vec<String>,
}

fn fixture() -> Fixture {
    let coordinator = TransactionCoordinator::open_in_memory().unwrap();
    let (driver, riders) = coordinator
        .run_in_transaction(|session| {
            let users = session.store::<User>();
            let driver = users.persist(&User::new("Kim", "Lambert", "kim@example.com", "h"))?;
            let riders = ["lea", "max", "noe"]
                .iter()
                .map(|name| users.persist(&User::new(*name, "Rider", format!("{name}@example.com"), "h")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((driver, riders))
        })
        .unwrap();
    Fixture {
        coordinator,
        driver,
        riders,
    }
}

fn publish(fixture: &Fixture, seats: u32) -> (String, String) {
    TripService::new(&fixture.coordinator)
        .publish_trip(
            &Route::new("Angers", "Le Mans", 97.0, 70),
            &Trip::new(&fixture.driver, "replaced", 1_700_000_000_000, seats, 1_000),
        )
        .unwrap()
}

fn rule_of(err: &WorkError) -> &'static str {
    err.as_domain().map(|domain| domain.rule).unwrap_or("<not a domain error>")
}

fn bookings_on(fixture: &Fixture, trip_id: &str) -> Vec<Booking> {
    fixture
        .coordinator
        .run_read_only(|session| {
            Ok(session
                .store::<Booking>()
                .find_where("trip_id", carpool_core::relational::SqlValue::Text(trip_id.to_string()))?)
        })
        .unwrap()
}

#[test]
fn publish_trip_creates_route_and_trip_together() {
    let fixture = fixture();
    let (route_id, trip_id) = publish(&fixture, 3);

    let trip = fixture
        .coordinator
        .run_read_only(|session| Ok(session.store::<Trip>().find_by_id(&trip_id)?))
        .unwrap()
        .unwrap();
    assert_eq!(trip.route_id, route_id);
    assert_eq!(trip.status, TripStatus::Scheduled);
}

#[test]
fn publish_trip_is_atomic_across_entities() {
    let fixture = fixture();
    let err = TripService::new(&fixture.coordinator)
        .publish_trip(
            &Route::new("Vannes", "Lorient", 58.0, 45),
            &Trip::new("unknown-driver", "replaced", 0, 2, 500),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataAccess);

    let routes = fixture
        .coordinator
        .run_read_only(|session| Ok(session.row_count("routes")?))
        .unwrap();
    assert_eq!(routes, 0);
}

#[test]
fn book_seats_confirms_booking_within_capacity() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 3);
    let service = TripService::new(&fixture.coordinator);

    service
        .book_seats(&fixture.riders[0], &trip_id, 2, UnsupportedCheckPolicy::FailClosed)
        .unwrap();
    service
        .book_seats(&fixture.riders[1], &trip_id, 1, UnsupportedCheckPolicy::FailClosed)
        .unwrap();

    let bookings = bookings_on(&fixture, &trip_id);
    assert_eq!(bookings.len(), 2);
    assert!(bookings
        .iter()
        .all(|booking| booking.status == BookingStatus::Confirmed));
}

#[test]
fn overbooking_is_a_domain_error_and_writes_nothing() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 3);
    let service = TripService::new(&fixture.coordinator);
    service
        .book_seats(&fixture.riders[0], &trip_id, 2, UnsupportedCheckPolicy::FailClosed)
        .unwrap();

    let err = service
        .book_seats(&fixture.riders[1], &trip_id, 2, UnsupportedCheckPolicy::FailClosed)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Domain);
    assert_eq!(rule_of(&err), rules::SEAT_CAPACITY_EXCEEDED);
    assert_eq!(bookings_on(&fixture, &trip_id).len(), 1);
}

#[test]
fn second_live_booking_by_same_user_is_rejected() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 4);
    let service = TripService::new(&fixture.coordinator);
    service
        .book_seats(&fixture.riders[2], &trip_id, 1, UnsupportedCheckPolicy::Skip)
        .unwrap();

    let err = service
        .book_seats(&fixture.riders[2], &trip_id, 1, UnsupportedCheckPolicy::Skip)
        .unwrap_err();
    assert_eq!(rule_of(&err), rules::DUPLICATE_BOOKING);
}

#[test]
fn rebooking_after_cancellation_still_allows_only_one_live_booking() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 4);
    let service = TripService::new(&fixture.coordinator);
    let rider = &fixture.riders[1];

    let first = service
        .book_seats(rider, &trip_id, 1, UnsupportedCheckPolicy::FailClosed)
        .unwrap();
    fixture
        .coordinator
        .run_in_transaction(|session| {
            let bookings = session.store::<Booking>();
            let mut booking = bookings.find_by_id(&first)?.unwrap();
            booking.status = BookingStatus::Cancelled;
            Ok(bookings.merge(&booking)?)
        })
        .unwrap();

    service
        .book_seats(rider, &trip_id, 1, UnsupportedCheckPolicy::FailClosed)
        .unwrap();
    let err = service
        .book_seats(rider, &trip_id, 1, UnsupportedCheckPolicy::FailClosed)
        .unwrap_err();
    assert_eq!(rule_of(&err), rules::DUPLICATE_BOOKING);

    let live = bookings_on(&fixture, &trip_id)
        .into_iter()
        .filter(Booking::holds_seats)
        .count();
    assert_eq!(live, 1);
}

#[test]
fn invalid_requests_are_rejected_before_any_write() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 2);
    let service = TripService::new(&fixture.coordinator);

    let err = service
        .book_seats(&fixture.riders[0], &trip_id, 0, UnsupportedCheckPolicy::FailClosed)
        .unwrap_err();
    assert_eq!(rule_of(&err), rules::INVALID_SEAT_COUNT);

    let missing = uuid::Uuid::new_v4().to_string();
    let err = service
        .book_seats(&fixture.riders[0], &missing, 1, UnsupportedCheckPolicy::FailClosed)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    service.update_trip_status(&trip_id, TripStatus::Cancelled).unwrap();
    let err = service
        .book_seats(&fixture.riders[0], &trip_id, 1, UnsupportedCheckPolicy::FailClosed)
        .unwrap_err();
    assert_eq!(rule_of(&err), rules::TRIP_NOT_BOOKABLE);
    assert!(bookings_on(&fixture, &trip_id).is_empty());
}

#[test]
fn final_trip_status_cannot_change() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 2);
    let service = TripService::new(&fixture.coordinator);

    let trip = service
        .update_trip_status(&trip_id, TripStatus::InProgress)
        .unwrap();
    assert_eq!(trip.status, TripStatus::InProgress);
    service
        .update_trip_status(&trip_id, TripStatus::Completed)
        .unwrap();

    let err = service
        .update_trip_status(&trip_id, TripStatus::Scheduled)
        .unwrap_err();
    assert_eq!(rule_of(&err), rules::TRIP_STATUS_FINAL);
}

fn open_trip(seats: u32) -> Trip {
    let mut trip = Trip::new("driver", "route", 0, seats, 700);
    trip.id = Some("trip-1".to_string());
    trip
}

#[test]
fn ledger_over_file_backend_follows_the_caller_policy() {
    let dir = tempfile::tempdir().unwrap();
    let trip = open_trip(2);

    let strict = BookingLedger::new(
        CsvStore::<Booking>::new(dir.path().join("strict.csv")),
        UnsupportedCheckPolicy::FailClosed,
    );
    let err = strict.book("rider", &trip, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
    assert!(strict.bookings().find_all().unwrap().is_empty());

    let lenient = BookingLedger::new(
        CsvStore::<Booking>::new(dir.path().join("lenient.csv")),
        UnsupportedCheckPolicy::Skip,
    );
    lenient.book("rider", &trip, 1).unwrap();
    // Neither check can run here, so nothing stops a second booking.
    lenient.book("rider", &trip, 5).unwrap();
    assert_eq!(lenient.bookings().find_all().unwrap().len(), 2);
}

#[test]
fn ledger_over_document_backend_checks_duplicates_but_not_capacity() {
    let stores = DocumentStores::in_memory();
    let ledger = BookingLedger::new(&stores.bookings, UnsupportedCheckPolicy::Skip);
    let trip = open_trip(1);

    ledger.book("rider-a", &trip, 1).unwrap();
    let err = ledger.book("rider-a", &trip, 1).unwrap_err();
    assert_eq!(rule_of(&err), rules::DUPLICATE_BOOKING);

    // Capacity cannot be counted by this backend and the policy skips it.
    ledger.book("rider-b", &trip, 1).unwrap();
    assert_eq!(stores.bookings.find_all().unwrap().len(), 2);

    let strict = BookingLedger::new(&stores.bookings, UnsupportedCheckPolicy::FailClosed);
    let err = strict.book("rider-c", &trip, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationNotSupported);
}

#[test]
fn ledger_rebooking_after_cancellation_rejects_a_second_live_booking() {
    let stores = DocumentStores::in_memory();
    let ledger = BookingLedger::new(&stores.bookings, UnsupportedCheckPolicy::Skip);
    let trip = open_trip(3);

    let first = ledger.book("rider-a", &trip, 1).unwrap();
    let mut cancelled = stores.bookings.find_by_id(&first).unwrap().unwrap();
    cancelled.status = BookingStatus::Cancelled;
    stores.bookings.update(&cancelled).unwrap();

    ledger.book("rider-a", &trip, 1).unwrap();
    let err = ledger.book("rider-a", &trip, 1).unwrap_err();
    assert_eq!(rule_of(&err), rules::DUPLICATE_BOOKING);
    assert_eq!(stores.bookings.find_all().unwrap().len(), 2);
}

#[test]
fn ledger_over_relational_backend_enforces_capacity() {
    let fixture = fixture();
    let (_, trip_id) = publish(&fixture, 2);

    let err = fixture
        .coordinator
        .run_in_transaction(|session| {
            let trip = session.store::<Trip>().find_by_id(&trip_id)?.unwrap();
            let ledger = BookingLedger::new(session.store::<Booking>(), UnsupportedCheckPolicy::FailClosed);
            ledger.book(&fixture.riders[0], &trip, 2)?;
            ledger.book(&fixture.riders[1], &trip, 1)?;
            Ok(())
        })
        .unwrap_err();

    assert_eq!(rule_of(&err), rules::SEAT_CAPACITY_EXCEEDED);
    assert!(bookings_on(&fixture, &trip_id).is_empty());
}

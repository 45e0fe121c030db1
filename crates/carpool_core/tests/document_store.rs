use carpool_core::db::open_db_in_memory;
use carpool_core::document::{
    Document, DocumentCollection, DocumentKey, DocumentStore, DocumentStores, MemoryCollection,
    SqliteCollection, SURROGATE_KEY,
};
use carpool_core::{Booking, BookingStatus, ErrorKind, Rating, Trip, User};
use serde_json::{json, Value};

fn user_store() -> DocumentStore<User, MemoryCollection> {
    DocumentStore::new(MemoryCollection::new("users"))
}

fn carol() -> User {
    User::new("Carol", "Petit", "carol@example.com", "argon2$carol")
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[test]
fn create_returns_hex_of_stored_surrogate_key() {
    let store = user_store();
    let id = store.create(&carol()).unwrap();

    assert_eq!(id.len(), 24);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    let key = DocumentKey::parse_str(&id).unwrap();
    let raw = store.collection().find_one(&key).unwrap().unwrap();
    assert_eq!(raw.get(SURROGATE_KEY), Some(&Value::String(id.clone())));
    assert!(!raw.contains_key("id"));

    let loaded = store.get(&id).unwrap().unwrap();
    assert_eq!(loaded.id.as_deref(), Some(id.as_str()));
    assert_eq!(loaded.email, "carol@example.com");
}

#[test]
fn to_document_omits_unassigned_id() {
    let doc = DocumentStore::<User, MemoryCollection>::to_document(&carol()).unwrap();
    assert!(!doc.contains_key("id"));
    assert!(!doc.contains_key(SURROGATE_KEY));
    assert_eq!(doc.get("first_name"), Some(&json!("Carol")));
}

#[test]
fn from_document_moves_surrogate_key_into_id() {
    let key = DocumentKey::generate();
    let doc = object(json!({
        "_id": key.to_hex(),
        "user_id": "u-1",
        "trip_id": "t-1",
        "score": 4,
        "comment": "smooth ride"
    }));

    let rating = DocumentStore::<Rating, MemoryCollection>::from_document(doc).unwrap();
    assert_eq!(rating.id, Some(key.to_hex()));
    assert_eq!(rating.score, 4);
    assert_eq!(rating.comment.as_deref(), Some("smooth ride"));
}

#[test]
fn from_document_rejects_bad_surrogate_key_or_missing_fields() {
    let missing_key = object(json!({ "user_id": "u", "trip_id": "t", "score": 3 }));
    let err = DocumentStore::<Rating, MemoryCollection>::from_document(missing_key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mapping);

    let numeric_key = object(json!({ "_id": 42, "user_id": "u", "trip_id": "t", "score": 3 }));
    let err = DocumentStore::<Rating, MemoryCollection>::from_document(numeric_key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mapping);

    let missing_field = object(json!({ "_id": DocumentKey::generate().to_hex(), "user_id": "u" }));
    let err = DocumentStore::<Rating, MemoryCollection>::from_document(missing_field).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mapping);
}

#[test]
fn invalid_identifier_fails_before_touching_the_collection() {
    let store = user_store();
    let before = store.collection().operation_count();

    for bad in ["", "not-hex", "0123456789abcdef0123456", "0123456789ABCDEF01234567"] {
        assert_eq!(store.get(bad).unwrap_err().kind(), ErrorKind::InvalidIdentifier);
        assert_eq!(store.delete(bad).unwrap_err().kind(), ErrorKind::InvalidIdentifier);
    }
    assert_eq!(store.collection().operation_count(), before);
}

#[test]
fn update_of_missing_document_is_not_found_and_delete_is_silent() {
    let store = user_store();
    store.create(&carol()).unwrap();

    let mut ghost = carol();
    ghost.id = Some(DocumentKey::generate().to_hex());
    assert!(store.update(&ghost).unwrap_err().is_not_found());
    assert_eq!(store.find_all().unwrap().len(), 1);

    let ghost_id = ghost.id.unwrap();
    assert!(!store.delete(&ghost_id).unwrap());
    assert!(!store.delete(&ghost_id).unwrap());
}

#[test]
fn update_replaces_fields_and_keeps_key() {
    let store = user_store();
    let id = store.create(&carol()).unwrap();

    let mut changed = store.get(&id).unwrap().unwrap();
    changed.phone = Some("+33 7 00 00 00 00".to_string());
    store.update(&changed).unwrap();

    assert_eq!(store.get(&id).unwrap().unwrap(), changed);
}

#[test]
fn find_where_matches_every_filter_field() {
    let store: DocumentStore<Booking, _> = DocumentStore::new(MemoryCollection::new("bookings"));
    store.create(&Booking::new("u-1", "t-1", 1, 10)).unwrap();
    store.create(&Booking::new("u-2", "t-1", 2, 20)).unwrap();
    store.create(&Booking::new("u-1", "t-2", 3, 30)).unwrap();

    let filter = object(json!({ "user_id": "u-1", "trip_id": "t-1" }));
    let found = store.find_where(filter).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].seats, 1);

    let by_status = object(json!({ "status": "pending" }));
    assert_eq!(store.count_where(by_status).unwrap(), 3);
}

#[test]
fn sqlite_collection_persists_documents_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let store: DocumentStore<Trip, _> = DocumentStore::new(SqliteCollection::new(&conn, "trips"));

    let first = store.create(&Trip::new("d-1", "r-1", 100, 3, 500)).unwrap();
    let second = store.create(&Trip::new("d-2", "r-1", 200, 4, 700)).unwrap();

    let ids: Vec<_> = store
        .find_all()
        .unwrap()
        .into_iter()
        .map(|trip| trip.id.unwrap())
        .collect();
    assert_eq!(ids, vec![first.clone(), second]);

    assert!(store.delete(&first).unwrap());
    assert!(!store.delete(&first).unwrap());

    let stored: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = 'trips';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn sqlite_collection_rejects_duplicate_keys() {
    let conn = open_db_in_memory().unwrap();
    let collection = SqliteCollection::new(&conn, "ratings");
    let doc = object(json!({ "_id": DocumentKey::generate().to_hex(), "score": 5 }));

    collection.insert_one(&doc).unwrap();
    assert!(collection.insert_one(&doc).is_err());
    assert_eq!(collection.count(&Document::new()).unwrap(), 1);
}

#[test]
fn corrupt_stored_document_surfaces_as_mapping_error() {
    let conn = open_db_in_memory().unwrap();
    let key = DocumentKey::generate();
    conn.execute(
        "INSERT INTO documents (collection, doc_key, seq, body) VALUES ('bookings', ?1, 1, ?2);",
        rusqlite::params![key.to_hex(), format!("{{\"_id\":\"{}\",\"seats\":\"many\"}}", key.to_hex())],
    )
    .unwrap();

    let store: DocumentStore<Booking, _> =
        DocumentStore::new(SqliteCollection::new(&conn, "bookings"));
    assert_eq!(store.get(&key.to_hex()).unwrap_err().kind(), ErrorKind::Mapping);
}

#[test]
fn document_stores_keep_collections_apart() {
    let stores = DocumentStores::in_memory();
    stores.users.create(&carol()).unwrap();
    let mut booking = Booking::new("u", "t", 1, 5);
    booking.status = BookingStatus::Confirmed;
    stores.bookings.create(&booking).unwrap();
    stores.bookings.create(&booking).unwrap();

    let counts = stores.document_counts().unwrap();
    assert_eq!(
        counts,
        vec![("users", 1), ("routes", 0), ("trips", 0), ("bookings", 2), ("ratings", 0)]
    );
}

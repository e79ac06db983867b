use bookseek::books::read_jsonl;
use bookseek::storage::Database;
use bookseek::test_utils::fixtures::{UnitTestFixture, sample_books};

pub const COLLECTION: &str = "book_info";

/// Fixture database holding `COLLECTION` with the sample books loaded.
pub fn seeded(fixture: &UnitTestFixture) -> Database {
    seed_collection(fixture, COLLECTION)
}

pub fn seed_collection(fixture: &UnitTestFixture, collection: &str) -> Database {
    let path = fixture.create_books_file(&format!("{collection}.jsonl"), &sample_books());
    let loaded = read_jsonl(&path).unwrap();
    assert_eq!(loaded.validation_errors, 0);

    let db = fixture.open_db().unwrap();
    let store = db.collections();
    store.create_collection(collection, false).unwrap();
    let summary = store.add_books(collection, &loaded.records, 2).unwrap();
    assert_eq!(summary.inserted, 5);
    db
}

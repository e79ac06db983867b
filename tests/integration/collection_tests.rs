use bookseek::books::parse_jsonl;
use bookseek::test_utils::fixtures::UnitTestFixture;

use super::fixture::{COLLECTION, seeded};

#[test]
fn list_and_delete_collections() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let store = db.collections();
    assert!(store.create_collection("reviews", false).unwrap());
    assert!(!store.create_collection("reviews", false).unwrap());

    assert_eq!(
        store.list_collections().unwrap(),
        vec![COLLECTION.to_string(), "reviews".to_string()]
    );
    assert!(store.delete_collection("reviews").unwrap());
    assert!(!store.delete_collection("reviews").unwrap());
    assert_eq!(store.list_collections().unwrap(), vec![COLLECTION.to_string()]);
}

#[test]
fn recreate_discards_documents_and_indexes() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    db.synchronizer()
        .ensure_field_indexed(COLLECTION, &bookseek::schema::FieldSpec::for_book_field("year"))
        .unwrap();

    let store = db.collections();
    assert!(store.create_collection(COLLECTION, true).unwrap());
    assert_eq!(store.count(COLLECTION).unwrap(), 0);
    assert!(db.synchronizer().field_states(COLLECTION).unwrap().is_empty());
}

#[test]
fn invalid_rows_keep_fallback_metadata() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let input = concat!(
        "{\"Name\": \"Odd\", \"Author\": \"Nobody\", \"User Rating\": 9.5, \"Reviews\": 1, \"Price\": 1, \"Year\": 1850, \"Genre\": \"Fiction\"}\n",
    );
    let loaded = parse_jsonl(input.as_bytes()).unwrap();
    assert_eq!(loaded.validation_errors, 1);

    db.collections().create_collection("odd", false).unwrap();
    let summary = db.collections().add_books("odd", &loaded.records, 10).unwrap();
    assert_eq!(summary.inserted, 1);

    let year: i64 = db
        .conn()
        .query_row(
            "SELECT json_extract(metadata, '$.year') FROM \"c$v1$odd\"",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(year, 2000);
}

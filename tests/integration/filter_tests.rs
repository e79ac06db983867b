use bookseek::error::BsError;
use bookseek::schema::{ExtractionMode, FieldSpec, SqlType};
use bookseek::storage::FilterOp;
use bookseek::test_utils::fixtures::UnitTestFixture;

use super::fixture::{COLLECTION, seeded};

fn names(books: &[bookseek::storage::StoredBook]) -> Vec<String> {
    books
        .iter()
        .map(|b| b.metadata["name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn numeric_range_uses_the_index_order() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let spec = FieldSpec::for_book_field("year");
    db.synchronizer().ensure_field_indexed(COLLECTION, &spec).unwrap();

    let books = db
        .collections()
        .filter(COLLECTION, &spec, FilterOp::Ge, "2018", 10)
        .unwrap();
    assert_eq!(names(&books), vec!["Educated", "Dune"]);
}

#[test]
fn query_plan_reports_the_metadata_index() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let spec = FieldSpec::for_book_field("year");
    db.synchronizer().ensure_field_indexed(COLLECTION, &spec).unwrap();

    let plan = db.collections().query_plan(COLLECTION, &spec, FilterOp::Eq).unwrap();
    assert!(
        plan.iter().any(|line| line.contains("idx_metadata_year")),
        "plan: {plan:?}"
    );
}

#[test]
fn text_field_matches_plain_value() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let spec = FieldSpec::for_book_field("genre");
    db.synchronizer().ensure_field_indexed(COLLECTION, &spec).unwrap();

    let books = db
        .collections()
        .filter(COLLECTION, &spec, FilterOp::Eq, "Fiction", 10)
        .unwrap();
    let mut found = names(&books);
    found.sort();
    assert_eq!(found, vec!["Dune", "The Martian"]);

    // Text fields keep the JSON encoding of the value.
    let raw: String = db
        .conn()
        .query_row(
            "SELECT gen_genre FROM \"c$v1$book_info\" WHERE id = '0'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(raw, "\"Fiction\"");
}

#[test]
fn scalar_extraction_stores_bare_text() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let spec = FieldSpec::new("genre", SqlType::Varchar(100), "$.genre", ExtractionMode::AsScalar);
    db.synchronizer().ensure_field_indexed(COLLECTION, &spec).unwrap();

    let books = db
        .collections()
        .filter(COLLECTION, &spec, FilterOp::Eq, "Non Fiction", 10)
        .unwrap();
    assert_eq!(books.len(), 3);

    let raw: String = db
        .conn()
        .query_row(
            "SELECT gen_genre FROM \"c$v1$book_info\" WHERE id = '0'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(raw, "Fiction");
}

#[test]
fn unindexed_field_is_rejected() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let err = db
        .collections()
        .filter(COLLECTION, &FieldSpec::for_book_field("price"), FilterOp::Lt, "12", 10)
        .unwrap_err();
    assert!(matches!(err, BsError::FieldNotIndexed { .. }));
}

#[test]
fn unparseable_number_is_an_invalid_filter() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let spec = FieldSpec::for_book_field("year");
    db.synchronizer().ensure_field_indexed(COLLECTION, &spec).unwrap();
    let err = db
        .collections()
        .filter(COLLECTION, &spec, FilterOp::Eq, "last year", 10)
        .unwrap_err();
    assert!(matches!(err, BsError::InvalidFilter(_)));
}

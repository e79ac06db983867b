use std::collections::BTreeSet;

use bookseek::error::BsError;
use bookseek::schema::{
    DEFAULT_INDEX_FIELDS, ExtractionMode, FieldSpec, FieldState, IndexOutcome, RemovalOutcome,
    SqlType,
};
use bookseek::storage::FilterOp;
use bookseek::test_utils::fixtures::UnitTestFixture;
use bookseek::test_utils::logging::TestLogger;

use super::fixture::{COLLECTION, seed_collection, seeded};

fn default_specs() -> Vec<FieldSpec> {
    DEFAULT_INDEX_FIELDS
        .iter()
        .map(|field| FieldSpec::for_book_field(field))
        .collect()
}

#[test]
fn ensure_defaults_then_rerun_is_idempotent() {
    let log = TestLogger::new("ensure_defaults_then_rerun_is_idempotent");
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let sync = db.synchronizer();

    log.log_step("first pass");
    let first = sync.ensure_all_indexed(COLLECTION, &default_specs()).unwrap();
    log.log_actual(&first);
    assert!(first.iter().all(|r| r.outcome == IndexOutcome::Created));

    log.log_step("second pass");
    let second = sync.ensure_all_indexed(COLLECTION, &default_specs()).unwrap();
    assert!(second.iter().all(|r| r.outcome == IndexOutcome::AlreadyExists));

    let expected: BTreeSet<String> = DEFAULT_INDEX_FIELDS.iter().map(ToString::to_string).collect();
    assert_eq!(sync.list_indexed_fields(COLLECTION).unwrap(), expected);
    assert!(db.integrity_check().unwrap());
    log.pass();
}

#[test]
fn generated_column_tracks_document_metadata() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let spec = FieldSpec::for_book_field("year");
    db.synchronizer().ensure_field_indexed(COLLECTION, &spec).unwrap();

    let years: Vec<i64> = {
        let mut stmt = db
            .conn()
            .prepare("SELECT gen_year FROM \"c$v1$book_info\" ORDER BY CAST(id AS INTEGER)")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(Result::unwrap)
            .collect()
    };
    assert_eq!(years, vec![2019, 2015, 2015, 2018, 2009]);
}

#[test]
fn index_name_is_database_wide() {
    let fixture = UnitTestFixture::new();
    let _first = seed_collection(&fixture, "books_a");
    let db = seed_collection(&fixture, "books_b");
    let sync = db.synchronizer();
    let spec = FieldSpec::for_book_field("year");

    assert_eq!(sync.ensure_field_indexed("books_a", &spec).unwrap(), IndexOutcome::Created);
    let outcome = sync.ensure_field_indexed("books_b", &spec).unwrap();
    assert!(outcome.is_failed(), "got {outcome:?}");
    assert_eq!(sync.field_state("books_b", "year").unwrap(), FieldState::ColumnOnly);
    assert_eq!(sync.field_state("books_a", "year").unwrap(), FieldState::Indexed);
}

#[test]
fn type_drift_fails_until_rebuilt() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let sync = db.synchronizer();

    sync.ensure_field_indexed(COLLECTION, &FieldSpec::for_book_field("year"))
        .unwrap();

    let as_text = FieldSpec::new("year", SqlType::Varchar(8), "$.year", ExtractionMode::AsScalar);
    let drift = sync.ensure_field_indexed(COLLECTION, &as_text).unwrap();
    match drift {
        IndexOutcome::Failed(reason) => assert!(reason.contains("INT"), "{reason}"),
        other => panic!("expected drift failure, got {other:?}"),
    }

    assert_eq!(
        sync.rebuild_field_index(COLLECTION, &as_text).unwrap(),
        IndexOutcome::Created
    );
    assert_eq!(sync.field_state(COLLECTION, "year").unwrap(), FieldState::Indexed);
    assert_eq!(
        sync.ensure_field_indexed(COLLECTION, &as_text).unwrap(),
        IndexOutcome::AlreadyExists
    );
}

#[test]
fn extraction_drift_fails_until_rebuilt() {
    let log = TestLogger::new("extraction_drift_fails_until_rebuilt");
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let sync = db.synchronizer();
    let store = db.collections();

    let as_json = FieldSpec::new("genre", SqlType::Varchar(100), "$.genre", ExtractionMode::AsJson);
    let as_scalar = FieldSpec::new("genre", SqlType::Varchar(100), "$.genre", ExtractionMode::AsScalar);
    let other_path = FieldSpec::new("genre", SqlType::Varchar(100), "$.author", ExtractionMode::AsJson);
    assert_eq!(sync.ensure_field_indexed(COLLECTION, &as_json).unwrap(), IndexOutcome::Created);

    log.log_step("mode and path changes are drift");
    for spec in [&as_scalar, &other_path] {
        let outcome = sync.ensure_field_indexed(COLLECTION, spec).unwrap();
        log.log_actual(&outcome);
        match outcome {
            IndexOutcome::Failed(reason) => assert!(reason.contains("rebuild"), "{reason}"),
            other => panic!("expected drift failure, got {other:?}"),
        }
    }
    assert_eq!(
        sync.ensure_field_indexed(COLLECTION, &as_json).unwrap(),
        IndexOutcome::AlreadyExists
    );

    log.log_step("filtering with a mismatched spec is refused");
    let err = store
        .filter(COLLECTION, &as_scalar, FilterOp::Eq, "Fiction", 10)
        .unwrap_err();
    assert!(matches!(err, BsError::InvalidFilter(_)), "{err}");

    log.log_step("rebuild applies the new mode");
    assert_eq!(
        sync.rebuild_field_index(COLLECTION, &as_scalar).unwrap(),
        IndexOutcome::Created
    );
    let books = store
        .filter(COLLECTION, &as_scalar, FilterOp::Eq, "Fiction", 10)
        .unwrap();
    assert_eq!(books.len(), 2);
    log.pass();
}

#[test]
fn mixed_case_collection_name_finds_the_table() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let sync = db.synchronizer();

    assert_eq!(
        sync.ensure_field_indexed("Book_Info", &FieldSpec::for_book_field("year"))
            .unwrap(),
        IndexOutcome::Created
    );
    assert_eq!(sync.field_state(COLLECTION, "year").unwrap(), FieldState::Indexed);
    assert!(!db.collections().create_collection("BOOK_INFO", false).unwrap());
}

#[test]
fn remove_drops_index_and_column() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let sync = db.synchronizer();
    sync.ensure_all_indexed(COLLECTION, &default_specs()).unwrap();

    assert_eq!(sync.remove_field_index(COLLECTION, "genre").unwrap(), RemovalOutcome::Removed);
    assert_eq!(
        sync.remove_field_index(COLLECTION, "genre").unwrap(),
        RemovalOutcome::AlreadyAbsent
    );
    assert_eq!(sync.field_state(COLLECTION, "genre").unwrap(), FieldState::Unconfigured);
    assert!(!sync.list_indexed_fields(COLLECTION).unwrap().contains("genre"));
    assert_eq!(db.collections().count(COLLECTION).unwrap(), 5);
}

#[test]
fn remove_drops_foreign_indexes_on_the_column() {
    let fixture = UnitTestFixture::new();
    let db = seeded(&fixture);
    let sync = db.synchronizer();
    sync.ensure_field_indexed(COLLECTION, &FieldSpec::for_book_field("year"))
        .unwrap();
    db.conn()
        .execute(
            "CREATE INDEX idx_custom_year ON \"c$v1$book_info\" (gen_year, id)",
            [],
        )
        .unwrap();

    assert_eq!(sync.remove_field_index(COLLECTION, "year").unwrap(), RemovalOutcome::Removed);
    assert_eq!(sync.field_state(COLLECTION, "year").unwrap(), FieldState::Unconfigured);
}

#[test]
fn missing_collection_is_an_error() {
    let fixture = UnitTestFixture::new();
    let db = fixture.open_db().unwrap();
    let err = db
        .synchronizer()
        .ensure_all_indexed("ghost", &default_specs())
        .unwrap_err();
    assert!(matches!(err, BsError::CollectionNotFound(name) if name == "ghost"));
}

#[test]
fn state_survives_reopening_the_database() {
    let fixture = UnitTestFixture::new();
    {
        let db = seeded(&fixture);
        db.synchronizer()
            .ensure_all_indexed(COLLECTION, &default_specs())
            .unwrap();
    }
    let db = fixture.open_db().unwrap();
    let states = db.synchronizer().field_states(COLLECTION).unwrap();
    assert_eq!(states.len(), DEFAULT_INDEX_FIELDS.len());
    assert!(states.values().all(|state| *state == FieldState::Indexed));
}

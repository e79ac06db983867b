use std::collections::BTreeMap;
use std::time::Instant;

use crate::schema::engine::SchemaChange;
use crate::schema::sync::{FieldReport, FieldState};

/// Step-by-step console trace for schema tests; visible with `--nocapture`.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
}

impl TestLogger {
    pub fn new(test_name: &str) -> Self {
        println!("\n[TEST START] {test_name}");
        Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn log_step(&self, step: &str) {
        println!("[STEP] {step}");
    }

    pub fn log_actual<T: std::fmt::Debug>(&self, value: &T) {
        println!("[ACTUAL] {value:?}");
    }

    /// One line per statement, in the order the engine saw them.
    pub fn log_changes(&self, changes: &[SchemaChange]) {
        for (i, change) in changes.iter().enumerate() {
            println!("[DDL {i}] {} on {}", change.object(), change.table());
        }
    }

    pub fn log_reports(&self, reports: &[FieldReport]) {
        for report in reports {
            println!("[FIELD] {} => {:?}", report.field, report.outcome);
        }
    }

    pub fn log_states(&self, states: &BTreeMap<String, FieldState>) {
        for (field, state) in states {
            println!("[STATE] {field}: {state:?}");
        }
    }

    pub fn pass(&self) {
        println!(
            "[RESULT] {} PASSED in {:?}\n",
            self.test_name,
            self.start_time.elapsed()
        );
    }
}

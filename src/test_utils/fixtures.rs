use std::path::PathBuf;

use tempfile::TempDir;

use crate::error::Result;
use crate::storage::sqlite::Database;

/// Test fixture providing an isolated directory and database.
pub struct UnitTestFixture {
    pub temp_dir: TempDir,
    pub data_path: PathBuf,
}

impl UnitTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().to_path_buf();

        println!("[FIXTURE] Created temp directory: {:?}", data_path);

        Self { temp_dir, data_path }
    }

    /// Create a test file with content.
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.data_path.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        println!(
            "[FIXTURE] Created file: {:?} ({} bytes)",
            full_path,
            content.len()
        );
        full_path
    }

    /// Write a JSON-lines book dump, one record per element.
    pub fn create_books_file(&self, relative_path: &str, records: &[serde_json::Value]) -> PathBuf {
        let content: String = records
            .iter()
            .map(|record| format!("{record}\n"))
            .collect();
        self.create_file(relative_path, &content)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_path.join("bookseek.db")
    }

    /// Open (creating if needed) the fixture's database file.
    pub fn open_db(&self) -> Result<Database> {
        Database::open(self.db_path())
    }
}

impl Default for UnitTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UnitTestFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Cleaning up temp directory: {:?}", self.data_path);
    }
}

/// A handful of books spanning both genres and several years.
pub fn sample_books() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({"Name": "Dune", "Author": "Frank Herbert", "User Rating": 4.7, "Reviews": 9000, "Price": 9, "Year": 2019, "Genre": "Fiction"}),
        serde_json::json!({"Name": "Sapiens", "Author": "Yuval Noah Harari", "User Rating": 4.7, "Reviews": 30000, "Price": 17, "Year": 2015, "Genre": "Non Fiction"}),
        serde_json::json!({"Name": "The Martian", "Author": "Andy Weir", "User Rating": 4.6, "Reviews": 12000, "Price": 10, "Year": 2015, "Genre": "Fiction"}),
        serde_json::json!({"Name": "Educated", "Author": "Tara Westover", "User Rating": 4.7, "Reviews": 28000, "Price": 15, "Year": 2018, "Genre": "Non Fiction"}),
        serde_json::json!({"Name": "Becoming", "Author": "Michelle Obama", "User Rating": 4.8, "Reviews": 61000, "Price": 11, "Year": 2009, "Genre": "Non Fiction"}),
    ]
}

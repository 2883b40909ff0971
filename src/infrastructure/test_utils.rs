/// Test utilities for DuckDB-backed workbook tests
///
/// Every `TestWorkbook` opens a fresh database file inside its own temporary
/// directory, already holding an initialized diary sheet. The directory is
/// removed when the harness is dropped.
///
/// ```rust,ignore
/// let test_workbook = TestWorkbook::new();
/// test_workbook.append_rows(&[["2024/06/01", "08:00", "hello"]])?;
/// let diary = test_workbook.diary_at("2024-06-01T00:00:00Z");
/// ```
#[cfg(test)]
pub mod test_harness {
    use crate::entities::Diary;
    use crate::infrastructure::storage::{SheetBinding, initialize_diary_sheet};
    use crate::infrastructure::{DuckDbWorkbook, FixedClock, SheetDiaryRepository};
    use anyhow::Result;
    use chrono::{DateTime, FixedOffset, Utc};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    pub struct TestWorkbook {
        workbook: Arc<DuckDbWorkbook>,
        temp_dir: TempDir,
    }

    impl TestWorkbook {
        pub const SHEET: &'static str = "DB";

        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp directory");
            let workbook = DuckDbWorkbook::new(temp_dir.path().join("test.db"))
                .expect("Failed to initialize test DuckDB workbook");
            initialize_diary_sheet(&workbook, Self::SHEET).expect("Failed to create diary sheet");

            Self {
                workbook: Arc::new(workbook),
                temp_dir,
            }
        }

        pub fn workbook(&self) -> Arc<DuckDbWorkbook> {
            self.workbook.clone()
        }

        pub fn db_path(&self) -> PathBuf {
            self.temp_dir.path().join("test.db")
        }

        /// Close the connection and open the same database file again
        pub fn reopen(self) -> Self {
            let Self { workbook, temp_dir } = self;
            drop(workbook);
            let workbook = DuckDbWorkbook::new(temp_dir.path().join("test.db"))
                .expect("Failed to reopen test DuckDB workbook");

            Self {
                workbook: Arc::new(workbook),
                temp_dir,
            }
        }

        /// Write rows directly after the current last row, bypassing the diary
        pub fn append_rows(&self, rows: &[[&str; 3]]) -> Result<()> {
            let values: Vec<Vec<String>> = rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            let from_row = self.workbook.last_row(Self::SHEET)? + 1;
            self.workbook
                .write_range(Self::SHEET, from_row, 1, &values)
        }

        /// A diary over this workbook whose clock is frozen at `instant` (RFC 3339)
        pub fn diary_at(&self, instant: &str) -> Diary {
            let now: DateTime<Utc> = DateTime::parse_from_rfc3339(instant)
                .expect("Invalid RFC 3339 instant")
                .with_timezone(&Utc);
            let repository = SheetDiaryRepository::new(self.workbook.clone(), Self::SHEET);
            Diary::new(
                Box::new(repository),
                Box::new(FixedClock(now)),
                FixedOffset::east_opt(9 * 3600).expect("valid offset"),
            )
        }
    }

    /// Run a test with a fresh test workbook
    pub fn with_test_workbook<F, R>(test_fn: F) -> R
    where
        F: FnOnce(&TestWorkbook) -> R,
    {
        let test_workbook = TestWorkbook::new();
        test_fn(&test_workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::test_harness::*;
    use crate::infrastructure::storage::{HEADER_ROWS, SheetBinding};

    #[test]
    fn test_harness_starts_with_reserved_rows_only() {
        let test_workbook = TestWorkbook::new();
        assert_eq!(
            test_workbook.workbook().last_row(TestWorkbook::SHEET).unwrap(),
            HEADER_ROWS
        );
        assert!(test_workbook.db_path().exists());
    }

    #[test]
    fn test_harness_with_function() {
        with_test_workbook(|test_workbook| {
            test_workbook
                .append_rows(&[["2024/03/15", "07:00", "a"], ["2024/03/15", "08:00", "b"]])
                .unwrap();
            let diary = test_workbook.diary_at("2024-03-15T12:00:00Z");
            let grouped = diary.get_between("2024/03/15", "2024/03/15").unwrap();
            assert_eq!(grouped["2024/03/15"], vec!["a", "b"]);
        });
    }

    #[test]
    fn test_harness_isolation() {
        let first = TestWorkbook::new();
        let second = TestWorkbook::new();

        first
            .append_rows(&[["2024/03/15", "07:00", "only here"]])
            .unwrap();

        assert_eq!(
            second.workbook().last_row(TestWorkbook::SHEET).unwrap(),
            HEADER_ROWS
        );
    }
}

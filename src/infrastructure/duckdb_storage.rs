use crate::infrastructure::storage::SheetBinding;
use anyhow::{Context, Result, anyhow, bail};
use duckdb::{Connection, params};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Schema migrations compiled into the binary, applied in version order.
const MIGRATIONS: &[(i32, &str, &str)] = &[(
    1,
    "001_workbook",
    include_str!("../../migrations/001_workbook.sql"),
)];

/// Workbook persisted in a DuckDB database, one `cells` row per written cell.
pub struct DuckDbWorkbook {
    conn: Mutex<Connection>,
}

impl DuckDbWorkbook {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open DuckDB connection")?;

        let workbook = Self {
            conn: Mutex::new(conn),
        };
        workbook.initialize()?;
        Ok(workbook)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to create in-memory DuckDB connection")?;

        let workbook = Self {
            conn: Mutex::new(conn),
        };
        workbook.initialize()?;
        Ok(workbook)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("DuckDB connection lock poisoned"))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;
        setup_migration_system(&conn)?;
        run_migrations(&conn)
    }
}

impl SheetBinding for DuckDbWorkbook {
    fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sheets WHERE name = ?",
                params![sheet],
                |row| row.get(0),
            )
            .context("Failed to look up sheet")?;
        Ok(count > 0)
    }

    fn create_sheet(&self, sheet: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO sheets (name) VALUES (?)",
            params![sheet],
        )
        .with_context(|| format!("Failed to create sheet '{}'", sheet))?;
        Ok(())
    }

    fn last_row(&self, sheet: &str) -> Result<usize> {
        let conn = self.lock()?;
        let last: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(row_index), 0) FROM cells WHERE sheet = ?",
                params![sheet],
                |row| row.get(0),
            )
            .context("Failed to find last row")?;
        Ok(last as usize)
    }

    fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT row_index, col_index, value FROM cells WHERE sheet = ? ORDER BY row_index, col_index",
            )
            .context("Failed to prepare select statement")?;

        let cells = stmt.query_map(params![sheet], |row| {
            Ok((
                row.get::<_, i64>(0)? as usize,
                row.get::<_, i64>(1)? as usize,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut written = Vec::new();
        for cell in cells {
            written.push(cell?);
        }

        let height = written.iter().map(|(row, _, _)| *row).max().unwrap_or(0);
        let width = written.iter().map(|(_, col, _)| *col).max().unwrap_or(0);
        let mut grid = vec![vec![String::new(); width]; height];
        for (row, col, value) in written {
            grid[row - 1][col - 1] = value;
        }

        Ok(grid)
    }

    fn write_range(
        &self,
        sheet: &str,
        from_row: usize,
        from_col: usize,
        values: &[Vec<String>],
    ) -> Result<()> {
        if from_row == 0 || from_col == 0 {
            bail!("Sheet coordinates are 1-based, got ({}, {})", from_row, from_col);
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .context("Failed to begin write transaction")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO cells (sheet, row_index, col_index, value) VALUES (?, ?, ?, ?)",
                )
                .context("Failed to prepare insert statement")?;

            for (row_offset, row) in values.iter().enumerate() {
                for (col_offset, value) in row.iter().enumerate() {
                    stmt.execute(params![
                        sheet,
                        (from_row + row_offset) as i64,
                        (from_col + col_offset) as i64,
                        value
                    ])
                    .with_context(|| {
                        format!(
                            "Failed to write cell ({}, {}) of sheet '{}'",
                            from_row + row_offset,
                            from_col + col_offset,
                            sheet
                        )
                    })?;
                }
            }
        }
        tx.commit().context("Failed to commit write transaction")?;

        Ok(())
    }

    fn append_row(&self, sheet: &str, values: &[String]) -> Result<Option<usize>> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .context("Failed to begin append transaction")?;

        let exists: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM sheets WHERE name = ?",
                params![sheet],
                |row| row.get(0),
            )
            .context("Failed to look up sheet")?;
        if exists == 0 {
            return Ok(None);
        }

        let row_index: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(row_index), 0) + 1 FROM cells WHERE sheet = ?",
                params![sheet],
                |row| row.get(0),
            )
            .context("Failed to find last row")?;
        {
            // Plain INSERT: a row collision must fail rather than overwrite a record
            let mut stmt = tx
                .prepare("INSERT INTO cells (sheet, row_index, col_index, value) VALUES (?, ?, ?, ?)")
                .context("Failed to prepare append statement")?;
            for (col_offset, value) in values.iter().enumerate() {
                stmt.execute(params![sheet, row_index, (col_offset + 1) as i64, value])
                    .with_context(|| {
                        format!("Failed to append row {} of sheet '{}'", row_index, sheet)
                    })?;
            }
        }
        tx.commit().context("Failed to commit append transaction")?;

        Ok(Some(row_index as usize))
    }

    fn backend_info(&self) -> &str {
        "DuckDB Workbook v1.0"
    }
}

fn setup_migration_system(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
            CREATE TABLE IF NOT EXISTS migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    )
    .context("Failed to create migrations table")?;
    Ok(())
}

fn run_migrations(conn: &Connection) -> Result<()> {
    let applied = get_applied_migrations(conn)?;

    for (version, name, sql_content) in MIGRATIONS {
        if !applied.contains(version) {
            apply_migration(conn, *version, name, sql_content)
                .with_context(|| format!("Failed to apply migration {}: {}", version, name))?;
        }
    }

    Ok(())
}

fn get_applied_migrations(conn: &Connection) -> Result<HashSet<i32>> {
    let mut stmt = conn
        .prepare("SELECT version FROM migrations ORDER BY version")
        .context("Failed to prepare migration query")?;

    let rows = stmt.query_map([], |row| row.get::<_, i32>(0))?;

    let mut applied = HashSet::new();
    for version in rows {
        applied.insert(version?);
    }

    Ok(applied)
}

fn apply_migration(conn: &Connection, version: i32, name: &str, sql_content: &str) -> Result<()> {
    conn.execute_batch(sql_content)
        .with_context(|| format!("Failed to execute migration SQL for {}", name))?;

    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?, ?)",
        params![version, name],
    )
    .with_context(|| format!("Failed to record migration {} as applied", name))?;

    Ok(())
}

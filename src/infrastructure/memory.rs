use crate::infrastructure::storage::SheetBinding;
use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;
use std::sync::RwLock;

/// Workbook held entirely in process memory. Contents vanish on drop.
#[derive(Default)]
pub struct MemoryWorkbook {
    sheets: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SheetBinding for MemoryWorkbook {
    fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        let sheets = self
            .sheets
            .read()
            .map_err(|_| anyhow!("workbook lock poisoned"))?;
        Ok(sheets.contains_key(sheet))
    }

    fn create_sheet(&self, sheet: &str) -> Result<()> {
        let mut sheets = self
            .sheets
            .write()
            .map_err(|_| anyhow!("workbook lock poisoned"))?;
        sheets.entry(sheet.to_string()).or_default();
        Ok(())
    }

    fn last_row(&self, sheet: &str) -> Result<usize> {
        let sheets = self
            .sheets
            .read()
            .map_err(|_| anyhow!("workbook lock poisoned"))?;
        Ok(sheets.get(sheet).map_or(0, Vec::len))
    }

    fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let sheets = self
            .sheets
            .read()
            .map_err(|_| anyhow!("workbook lock poisoned"))?;
        let Some(rows) = sheets.get(sheet) else {
            return Ok(Vec::new());
        };

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Ok(rows
            .iter()
            .map(|row| {
                let mut padded = row.clone();
                padded.resize(width, String::new());
                padded
            })
            .collect())
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

        let mut sheets = self
            .sheets
            .write()
            .map_err(|_| anyhow!("workbook lock poisoned"))?;
        let Some(rows) = sheets.get_mut(sheet) else {
            bail!("Sheet '{}' does not exist", sheet);
        };

        for (row_offset, values_row) in values.iter().enumerate() {
            let row_index = from_row - 1 + row_offset;
            if rows.len() <= row_index {
                rows.resize(row_index + 1, Vec::new());
            }
            let row = &mut rows[row_index];
            let needed = from_col - 1 + values_row.len();
            if row.len() < needed {
                row.resize(needed, String::new());
            }
            for (col_offset, value) in values_row.iter().enumerate() {
                row[from_col - 1 + col_offset] = value.clone();
            }
        }

        Ok(())
    }

    fn append_row(&self, sheet: &str, values: &[String]) -> Result<Option<usize>> {
        let mut sheets = self
            .sheets
            .write()
            .map_err(|_| anyhow!("workbook lock poisoned"))?;
        let Some(rows) = sheets.get_mut(sheet) else {
            return Ok(None);
        };

        rows.push(values.to_vec());
        Ok(Some(rows.len()))
    }

    fn backend_info(&self) -> &str {
        "In-memory Workbook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    #[test]
    fn test_write_to_missing_sheet_fails() {
        let workbook = MemoryWorkbook::new();
        assert!(workbook.write_range("DB", 1, 1, &[row(&["a"])]).is_err());
        assert!(!workbook.sheet_exists("DB").unwrap());
    }

    #[test]
    fn test_sparse_writes_read_back_padded() {
        let workbook = MemoryWorkbook::new();
        workbook.create_sheet("DB").unwrap();
        workbook.write_range("DB", 2, 3, &[row(&["c"])]).unwrap();
        workbook.write_range("DB", 1, 1, &[row(&["a"])]).unwrap();

        assert_eq!(workbook.last_row("DB").unwrap(), 2);
        assert_eq!(
            workbook.read_rows("DB").unwrap(),
            vec![row(&["a", "", ""]), row(&["", "", "c"])]
        );
    }
}

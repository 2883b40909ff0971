use anyhow::Result;

/// Number of leading rows in a diary sheet that hold titles and format hints
/// rather than records.
pub const HEADER_ROWS: usize = 2;

/// Column titles written into row 1 of a freshly created diary sheet.
pub const TITLE_ROW: [&str; 3] = ["date", "time", "text"];

/// Format hints written into row 2 of a freshly created diary sheet.
pub const FORMAT_ROW: [&str; 3] = ["yyyy/MM/dd", "HH:mm", "free text"];

/// Spreadsheet-style storage addressed by sheet name and 1-based `(row, col)`.
///
/// Cells are plain strings; an unwritten cell reads back as `""`.
pub trait SheetBinding: Send + Sync {
    /// Whether a sheet with this name exists
    fn sheet_exists(&self, sheet: &str) -> Result<bool>;

    /// Create an empty sheet; creating an existing sheet is not an error
    fn create_sheet(&self, sheet: &str) -> Result<()>;

    /// Index of the last row holding any cell, or 0 for an empty sheet
    fn last_row(&self, sheet: &str) -> Result<usize>;

    /// Rows `1..=last_row`, each padded to the width of the widest row
    fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Write a rectangular block whose top-left cell is `(from_row, from_col)`.
    /// Either every cell of the block is written or none is.
    fn write_range(
        &self,
        sheet: &str,
        from_row: usize,
        from_col: usize,
        values: &[Vec<String>],
    ) -> Result<()>;

    /// Write `values` into columns `1..` of the row after the last one.
    ///
    /// Finding the end and writing the row happen as one step, so concurrent
    /// appends never land on the same row. Returns the row written, or `None`
    /// when the sheet does not exist.
    fn append_row(&self, sheet: &str, values: &[String]) -> Result<Option<usize>>;

    /// Human-readable description of the backend
    fn backend_info(&self) -> &str;
}

/// Create `sheet` with its two reserved rows unless it already exists.
///
/// Returns `true` when the sheet was created by this call.
pub fn initialize_diary_sheet(binding: &dyn SheetBinding, sheet: &str) -> Result<bool> {
    if binding.sheet_exists(sheet)? {
        return Ok(false);
    }

    binding.create_sheet(sheet)?;
    let header: Vec<Vec<String>> = [TITLE_ROW, FORMAT_ROW]
        .iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    binding.write_range(sheet, 1, 1, &header)?;
    Ok(true)
}

use crate::entities::{DiaryRecord, DiaryRow};
use crate::infrastructure::storage::{HEADER_ROWS, SheetBinding};
use crate::infrastructure::{AppendContext, HookRegistry};
use anyhow::Result;
use std::sync::Arc;

pub trait DiaryRepository: Send + Sync {
    /// Write `record` as a new row after the last one. Does nothing and
    /// returns `false` when the storage target is missing.
    fn append(&self, record: &DiaryRecord) -> Result<bool>;

    /// Data rows oldest first, or `None` when the storage target is missing.
    fn load_rows(&self) -> Result<Option<Vec<DiaryRow>>>;
}

/// Diary rows kept in one named sheet of a workbook.
pub struct SheetDiaryRepository {
    binding: Arc<dyn SheetBinding>,
    sheet: String,
    hook_registry: HookRegistry,
}

impl SheetDiaryRepository {
    pub fn new(binding: Arc<dyn SheetBinding>, sheet: impl Into<String>) -> Self {
        Self {
            binding,
            sheet: sheet.into(),
            hook_registry: HookRegistry::new(),
        }
    }

    pub fn with_hooks(
        binding: Arc<dyn SheetBinding>,
        sheet: impl Into<String>,
        hook_registry: HookRegistry,
    ) -> Self {
        Self {
            binding,
            sheet: sheet.into(),
            hook_registry,
        }
    }
}

impl DiaryRepository for SheetDiaryRepository {
    fn append(&self, record: &DiaryRecord) -> Result<bool> {
        let Some(row) = self.binding.append_row(&self.sheet, &record.to_cells())? else {
            log::warn!("Sheet '{}' not found, diary record dropped", self.sheet);
            return Ok(false);
        };
        log::debug!("Appended diary record to {}!R{}", self.sheet, row);

        let context = AppendContext {
            sheet: self.sheet.clone(),
            row,
        };
        self.hook_registry.execute_append_hooks(&context, record);

        Ok(true)
    }

    fn load_rows(&self) -> Result<Option<Vec<DiaryRow>>> {
        if !self.binding.sheet_exists(&self.sheet)? {
            log::warn!("Sheet '{}' not found, nothing to read", self.sheet);
            return Ok(None);
        }

        let rows = self
            .binding
            .read_rows(&self.sheet)?
            .into_iter()
            .skip(HEADER_ROWS)
            .map(DiaryRow::from_cells)
            .collect();

        Ok(Some(rows))
    }
}

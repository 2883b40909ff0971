use crate::entities::DiaryRecord;
use crate::infrastructure::{AppendContext, AppendHook};
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Plugin that keeps a plain-text trail of every appended record
pub struct AppendLogHook {
    log_path: PathBuf,
}

impl AppendLogHook {
    pub fn new(diary_dir: &Path) -> Self {
        Self {
            log_path: diary_dir.join("append_log.txt"),
        }
    }
}

impl AppendHook for AppendLogHook {
    fn on_record_appended(&self, context: &AppendContext, record: &DiaryRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open {}", self.log_path.display()))?;

        writeln!(
            file,
            "[{} {}] Record appended to {}!R{} - Text length: {} characters",
            record.date,
            record.time,
            context.sheet,
            context.row,
            record.text.chars().count()
        )?;

        Ok(())
    }

    fn name(&self) -> &str {
        "Append Log"
    }
}

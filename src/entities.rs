use crate::infrastructure::{Clock, DiaryRepository};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical date form; lexicographic order equals chronological order.
pub const DATE_FORMAT: &str = "%Y/%m/%d";
/// Canonical wall-clock time form.
pub const TIME_FORMAT: &str = "%H:%M";

// ============================================================================
// Records
// ============================================================================

/// One persisted diary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryRecord {
    pub date: String,
    pub time: String,
    pub text: String,
}

impl DiaryRecord {
    pub fn new(date: impl Into<String>, time: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            text: text.into(),
        }
    }

    /// Cells in storage column order: date, time, text
    pub fn to_cells(&self) -> Vec<String> {
        vec![self.date.clone(), self.time.clone(), self.text.clone()]
    }
}

/// A data row exactly as read from storage, before any date normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct DiaryRow {
    pub date: String,
    pub time: String,
    pub text: String,
}

impl DiaryRow {
    pub fn from_cells(cells: Vec<String>) -> Self {
        let mut cells = cells.into_iter();
        Self {
            date: cells.next().unwrap_or_default(),
            time: cells.next().unwrap_or_default(),
            text: cells.next().unwrap_or_default(),
        }
    }
}

/// Diary texts keyed by canonical date, each list oldest first.
pub type GroupedEntries = BTreeMap<String, Vec<String>>;

/// Normalize a stored date cell to `yyyy/MM/dd`.
///
/// Cells that are neither a date nor an RFC 3339 timestamp are returned
/// trimmed but otherwise untouched, so they still compare as plain strings.
pub fn canonical_date(raw: &str, offset: &FixedOffset) -> String {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return date.format(DATE_FORMAT).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format(DATE_FORMAT).to_string();
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return instant
            .with_timezone(offset)
            .format(DATE_FORMAT)
            .to_string();
    }

    trimmed.to_string()
}

// ============================================================================
// Date Range
// ============================================================================

/// Inclusive `[since, until]` interval of canonical date strings.
///
/// `since <= until` is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub since: String,
    pub until: String,
}

impl DateRange {
    pub fn new(since: impl Into<String>, until: impl Into<String>) -> Self {
        Self {
            since: since.into(),
            until: until.into(),
        }
    }

    pub fn from_dates(since: NaiveDate, until: NaiveDate) -> Self {
        Self::new(
            since.format(DATE_FORMAT).to_string(),
            until.format(DATE_FORMAT).to_string(),
        )
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::from_dates(date, date)
    }

    pub fn week(start_of_week: NaiveDate) -> Self {
        Self::from_dates(start_of_week, start_of_week + chrono::Duration::days(6))
    }

    /// The whole calendar month, or `None` for an invalid year/month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }?;
        Some(Self::from_dates(start, next.pred_opt()?))
    }

    /// The month containing `date`
    pub fn month_of(date: NaiveDate) -> Option<Self> {
        Self::month(date.year(), date.month())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DiaryError {
    #[error("diary text is empty")]
    EmptyText,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

// ============================================================================
// Diary
// ============================================================================

pub struct Diary {
    repository: Box<dyn DiaryRepository>,
    clock: Box<dyn Clock>,
    offset: FixedOffset,
}

impl Diary {
    pub fn new(
        repository: Box<dyn DiaryRepository>,
        clock: Box<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            repository,
            clock,
            offset,
        }
    }

    /// Today's date in the diary's timezone
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Stamp `text` with the current date and time and append it.
    ///
    /// The text is stored verbatim; it is only trimmed to check that it is
    /// not blank.
    pub fn submit(&self, text: &str) -> Result<(), DiaryError> {
        if text.trim().is_empty() {
            return Err(DiaryError::EmptyText);
        }

        let now = self.clock.now().with_timezone(&self.offset);
        let record = DiaryRecord::new(
            now.format(DATE_FORMAT).to_string(),
            now.format(TIME_FORMAT).to_string(),
            text,
        );
        if self.repository.append(&record)? {
            log::info!("Diary entry saved for {} {}", record.date, record.time);
        }
        Ok(())
    }

    /// Entries dated within `[since, until]`, grouped by date.
    ///
    /// Rows are scanned newest first. Rows after `until` are skipped, and the
    /// scan stops at the first row before `since`, since everything older is
    /// earlier still.
    pub fn get_between(&self, since: &str, until: &str) -> Result<GroupedEntries, DiaryError> {
        let Some(rows) = self.repository.load_rows()? else {
            return Ok(GroupedEntries::new());
        };

        let mut matches = Vec::new();
        for row in rows.iter().rev() {
            let date = canonical_date(&row.date, &self.offset);
            if date.is_empty() {
                continue;
            }
            if date.as_str() > until {
                continue;
            }
            if date.as_str() < since {
                break;
            }
            matches.push((date, row.text.as_str()));
        }

        let grouped = matches
            .into_iter()
            .fold(GroupedEntries::new(), |mut acc, (date, text)| {
                acc.entry(date).or_default().insert(0, text.to_string());
                acc
            });

        log::info!(
            "Diary query {}..={} matched {} date(s)",
            since,
            until,
            grouped.len()
        );
        Ok(grouped)
    }

    pub fn get_range(&self, range: &DateRange) -> Result<GroupedEntries, DiaryError> {
        self.get_between(&range.since, &range.until)
    }
}

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_SHEET: &str = "DB";
pub const DEFAULT_UTC_OFFSET: &str = "+09:00";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub diary_dir: PathBuf,
    pub database_path: PathBuf,
    /// Name of the sheet that holds diary rows
    pub sheet_name: String,
    pub utc_offset: FixedOffset,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let diary_dir = std::env::var("DIARY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("diarist")
            });

        let database_path = std::env::var("DIARY_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| diary_dir.join("diary.db"));

        let sheet_name = std::env::var("DIARY_SHEET").unwrap_or_else(|_| DEFAULT_SHEET.to_string());

        let utc_offset = parse_utc_offset(
            &std::env::var("DIARY_UTC_OFFSET").unwrap_or_else(|_| DEFAULT_UTC_OFFSET.to_string()),
        )
        .context("Invalid DIARY_UTC_OFFSET")?;

        let bind_addr = std::env::var("DIARY_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .context("Invalid DIARY_BIND")?;

        Ok(Self {
            diary_dir,
            database_path,
            sheet_name,
            utc_offset,
            bind_addr,
        })
    }
}

/// Parse an offset written as `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("offset out of range"));
    }

    let (sign, rest) = match value.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(anyhow!("offset '{}' must start with '+' or '-'", value)),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("offset '{}' must look like +HH:MM", value));
    }

    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = digits[2..].parse()?;
    if minutes >= 60 {
        return Err(anyhow!("offset '{}' has more than 59 minutes", value));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("offset '{}' is out of range", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_offset_accepts_common_forms() {
        assert_eq!(
            parse_utc_offset("+09:00").unwrap(),
            FixedOffset::east_opt(9 * 3600).unwrap()
        );
        assert_eq!(
            parse_utc_offset("-0530").unwrap(),
            FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            parse_utc_offset("Z").unwrap(),
            FixedOffset::east_opt(0).unwrap()
        );
    }

    #[test]
    fn test_parse_utc_offset_rejects_garbage() {
        for value in ["JST", "09:00", "+9", "+09:75", "+30:00", ""] {
            assert!(parse_utc_offset(value).is_err(), "accepted {:?}", value);
        }
    }
}

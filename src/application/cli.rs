use crate::application::{Config, DiaryApp, parse_utc_offset, web};
use crate::entities::{DATE_FORMAT, DateRange, GroupedEntries};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "diarist")]
#[command(about = "A personal diary kept in a spreadsheet-style workbook")]
#[command(version)]
pub struct Cli {
    /// Workbook database file (overrides DIARY_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Sheet holding the diary rows (overrides DIARY_SHEET)
    #[arg(long, global = true)]
    pub sheet: Option<String>,

    /// Fixed timezone for stamping entries, e.g. +09:00 (overrides DIARY_UTC_OFFSET)
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub utc_offset: Option<String>,

    /// Keep the workbook in memory instead of on disk
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the diary form over HTTP (default)
    Serve {
        /// Address to listen on (overrides DIARY_BIND)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
        /// Do not create the diary sheet when it is missing
        #[arg(long)]
        no_init: bool,
    },
    /// Create the diary sheet and its reserved rows
    Init,
    /// Save an entry from the command line
    Write {
        /// Entry text; words are joined with single spaces
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print entries between two dates, grouped by date
    Show {
        /// First date (yyyy/MM/dd, defaults to today)
        #[arg(short, long)]
        since: Option<String>,
        /// Last date (yyyy/MM/dd, defaults to today)
        #[arg(short, long)]
        until: Option<String>,
        /// Whole month (yyyy/MM), instead of --since/--until
        #[arg(short, long, conflicts_with_all = ["since", "until"])]
        month: Option<String>,
        /// Seven days starting at this date (yyyy/MM/dd)
        #[arg(short, long, conflicts_with_all = ["since", "until", "month"])]
        week: Option<String>,
        /// Print the grouped entries as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn run() -> Result<()> {
        let cli = Self::parse();
        let config = cli.config()?;

        let app = if cli.in_memory {
            DiaryApp::in_memory(config)
        } else {
            DiaryApp::new(config)?
        };

        match cli.command.unwrap_or(Commands::Serve {
            bind: None,
            no_init: false,
        }) {
            Commands::Serve { bind, no_init } => {
                if !no_init {
                    app.init_storage()?;
                }
                let addr = bind.unwrap_or(app.config().bind_addr);
                let runtime = tokio::runtime::Runtime::new()
                    .context("Failed to start async runtime")?;
                runtime.block_on(web::serve(app.diary(), addr))?;
            }
            Commands::Init => {
                if app.init_storage()? {
                    println!("Created sheet '{}'", app.config().sheet_name);
                } else {
                    println!("Sheet '{}' already exists", app.config().sheet_name);
                }
            }
            Commands::Write { text } => {
                app.diary().submit(&text.join(" "))?;
                println!("Entry saved");
            }
            Commands::Show {
                since,
                until,
                month,
                week,
                json,
            } => {
                let diary = app.diary();
                let range = show_range(diary.today(), since, until, month, week)?;

                let grouped = diary.get_range(&range)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&grouped)?);
                } else {
                    print!("{}", render_grouped(&grouped));
                }
            }
        }

        Ok(())
    }

    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env()?;
        if let Some(db) = &self.db {
            config.database_path = db.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.sheet_name = sheet.clone();
        }
        if let Some(offset) = &self.utc_offset {
            config.utc_offset = parse_utc_offset(offset).context("Invalid --utc-offset")?;
        }
        Ok(config)
    }
}

/// Parse `yyyy/MM` (or `yyyy-MM`) into the range covering that month.
pub fn parse_month(value: &str) -> Result<DateRange> {
    let first_day = format!("{}/01", value.trim().replace('-', "/"));
    let date = NaiveDate::parse_from_str(&first_day, DATE_FORMAT)
        .with_context(|| format!("Invalid month '{}', expected yyyy/MM", value))?;
    match DateRange::month_of(date) {
        Some(range) => Ok(range),
        None => bail!("Invalid month '{}'", value),
    }
}

/// Parse a `yyyy/MM/dd` (or `yyyy-MM-dd`) day.
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&value.trim().replace('-', "/"), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{}', expected yyyy/MM/dd", value))
}

/// Range selected by `show`'s options; with none given, just `today`.
pub fn show_range(
    today: NaiveDate,
    since: Option<String>,
    until: Option<String>,
    month: Option<String>,
    week: Option<String>,
) -> Result<DateRange> {
    if let Some(month) = month {
        return parse_month(&month);
    }
    if let Some(week) = week {
        return Ok(DateRange::week(parse_day(&week)?));
    }

    match (since, until) {
        (None, None) => Ok(DateRange::day(today)),
        (since, until) => {
            let today = today.format(DATE_FORMAT).to_string();
            Ok(DateRange::new(
                since.unwrap_or_else(|| today.clone()),
                until.unwrap_or(today),
            ))
        }
    }
}

/// Plain-text listing: each date on its own line, entries indented beneath it.
pub fn render_grouped(grouped: &GroupedEntries) -> String {
    if grouped.is_empty() {
        return "No entries\n".to_string();
    }

    let mut out = String::new();
    for (date, texts) in grouped {
        out.push_str(date);
        out.push('\n');
        for text in texts {
            for (i, line) in text.lines().enumerate() {
                out.push_str(if i == 0 { "  - " } else { "    " });
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(
            parse_month("2024/02").unwrap(),
            DateRange::new("2024/02/01", "2024/02/29")
        );
        assert_eq!(
            parse_month("2023-12").unwrap(),
            DateRange::new("2023/12/01", "2023/12/31")
        );
        assert!(parse_month("2024/13").is_err());
        assert!(parse_month("June").is_err());
    }

    #[test]
    fn test_show_range_options() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();

        assert_eq!(
            show_range(today, None, None, None, Some("2024/06/03".to_string())).unwrap(),
            DateRange::new("2024/06/03", "2024/06/09")
        );
        assert_eq!(
            show_range(today, None, None, None, None).unwrap(),
            DateRange::new("2024/06/12", "2024/06/12")
        );
        assert_eq!(
            show_range(today, Some("2024/06/01".to_string()), None, None, None).unwrap(),
            DateRange::new("2024/06/01", "2024/06/12")
        );
        assert_eq!(
            show_range(today, None, None, Some("2024/05".to_string()), None).unwrap(),
            DateRange::new("2024/05/01", "2024/05/31")
        );
        assert!(show_range(today, None, None, None, Some("next week".to_string())).is_err());
    }

    #[test]
    fn test_cli_parses_show_week() {
        let cli = Cli::try_parse_from(["diarist", "show", "--week", "2024/06/03"]).unwrap();
        match cli.command {
            Some(Commands::Show { week, month, .. }) => {
                assert_eq!(week.as_deref(), Some("2024/06/03"));
                assert!(month.is_none());
            }
            _ => panic!("expected show command"),
        }
        assert!(
            Cli::try_parse_from(["diarist", "show", "--week", "2024/06/03", "--month", "2024/06"])
                .is_err()
        );
    }

    #[test]
    fn test_render_grouped() {
        let mut grouped = GroupedEntries::new();
        grouped.insert(
            "2024/06/01".to_string(),
            vec!["rain\nall day".to_string(), "tea".to_string()],
        );

        assert_eq!(
            render_grouped(&grouped),
            "2024/06/01\n  - rain\n    all day\n  - tea\n"
        );
        assert_eq!(render_grouped(&GroupedEntries::new()), "No entries\n");
    }

    #[test]
    fn test_cli_parses_show_month() {
        let cli = Cli::try_parse_from(["diarist", "show", "--month", "2024/06", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Show { month: Some(_), json: true, .. })
        ));
    }

    #[test]
    fn test_cli_rejects_month_with_since() {
        assert!(
            Cli::try_parse_from(["diarist", "show", "--month", "2024/06", "--since", "2024/06/01"])
                .is_err()
        );
    }

    #[test]
    fn test_cli_write_joins_words() {
        let cli = Cli::try_parse_from(["diarist", "--in-memory", "write", "quiet", "day"]).unwrap();
        assert!(cli.in_memory);
        match cli.command {
            Some(Commands::Write { text }) => assert_eq!(text.join(" "), "quiet day"),
            _ => panic!("expected write command"),
        }
    }
}

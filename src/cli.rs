use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use albumscrobbles::config::{self, Transport};
use albumscrobbles::corrections::reconcile;
use albumscrobbles::period::{CalendarPeriod, Period, PeriodKind, Preset};
use albumscrobbles::stats::{CorrectedAlbumStat, UserStats};
use albumscrobbles::Components;

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "albumscrobbles-cli", about = "Corrected album stats from the command line")]
struct CliArgs {
    /// Path to TOML configuration file, same format as the server's.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the file cache.
    #[clap(long, value_parser = parse_path)]
    pub cache_dir: Option<PathBuf>,

    /// Corrections log. Defaults to corrections.txt in the cache directory.
    #[clap(long, value_parser = parse_path)]
    pub corrections_file: Option<PathBuf>,

    /// How album charts are read from last.fm.
    #[clap(long, default_value = "web")]
    pub transport: Transport,

    /// last.fm API key, required by the api transport.
    #[clap(long)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows corrected album stats of a user.
    Stats {
        username: String,

        /// 7, 30, 90, 180, 365 or random. All time when omitted.
        #[clap(long)]
        range: Option<String>,

        /// Calendar year, optionally narrowed with --month or --week.
        #[clap(long, conflicts_with = "range")]
        year: Option<i32>,

        #[clap(long, requires = "year", conflicts_with = "week")]
        month: Option<u32>,

        #[clap(long, requires = "year")]
        week: Option<u32>,

        /// Print JSON instead of a table.
        #[clap(long)]
        json: bool,
    },

    /// Shows the top album of every period in the overview grid.
    Overview {
        username: String,

        /// Months of this year instead of whole years.
        #[clap(long)]
        year: Option<i32>,

        /// Weeks of --year instead of months.
        #[clap(long, requires = "year")]
        per_week: bool,
    },

    /// Applies track count corrections submitted at least twice.
    ApplyCorrections,

    /// Recomputes the fallback track count from the album cache.
    RecomputeAverage,

    /// Prints the digest of the last complete period.
    Digest {
        username: String,

        #[clap(long, default_value = "week")]
        kind: PeriodKind,
    },

    /// Prints the RSS feed of a user.
    Feed { username: String },
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            cache_dir: args.cache_dir.clone(),
            corrections_file: args.corrections_file.clone(),
            transport: args.transport,
            api_key: args.api_key.clone(),
            // Only used to build default permalinks
            port: 3001,
            ..Default::default()
        }
    }
}

fn stats_period(
    range: Option<String>,
    year: Option<i32>,
    month: Option<u32>,
    week: Option<u32>,
) -> Result<Period> {
    if let Some(year) = year {
        let period = match (month, week) {
            (Some(month), _) => CalendarPeriod::month(year, month),
            (None, Some(week)) => CalendarPeriod::week(year, week),
            (None, None) => CalendarPeriod::year(year),
        };
        return Ok(Period::calendar(period));
    }

    match range.as_deref().unwrap_or("") {
        "" => Ok(Period::Preset(Preset::AllTime)),
        "random" => Ok(Period::Random),
        other => match other.parse().ok().and_then(Preset::from_days) {
            Some(preset) => Ok(Period::Preset(preset)),
            None => bail!("Invalid range: {}", other),
        },
    }
}

fn print_stats(stats: &UserStats) {
    println!("{} - {}", stats.username, stats.period);
    if stats.stats.is_empty() {
        println!("  no albums");
        return;
    }
    for (position, stat) in stats.stats.iter().enumerate() {
        let moved = stat.original_position as i64 - (position as i64 + 1);
        println!(
            "{:>3}. {} by {}: {:.1} plays ({} scrobbles / {} tracks){}",
            position + 1,
            stat.album_name,
            stat.artist_name,
            stat.album_scrobble_count,
            stat.scrobble_count,
            stat.track_count,
            match moved {
                0 => String::new(),
                m if m > 0 => format!(" +{}", m),
                m => format!(" {}", m),
            }
        );
    }
    if let Some(top) = &stats.original_top_album {
        println!(
            "Top album by raw scrobbles: {} by {}",
            top.album_name, top.artist_name
        );
    }
}

const PERIOD_LEN: usize = 18;
const ALBUM_LEN: usize = 40;
const ARTIST_LEN: usize = 30;

fn fit(text: &str, len: usize) -> String {
    if text.chars().count() <= len {
        return format!("{:<width$}", text, width = len);
    }
    let mut fitted: String = text.chars().take(len - 1).collect();
    fitted.push('…');
    fitted
}

fn overview_line(period: &CalendarPeriod, top_album: Option<&CorrectedAlbumStat>) -> String {
    let period = fit(&period.to_string(), PERIOD_LEN);
    match top_album {
        Some(top) => format!(
            "{} {} {} {:.1}",
            period,
            fit(&top.album_name, ALBUM_LEN),
            fit(&top.artist_name, ARTIST_LEN),
            top.album_scrobble_count
        ),
        None => period.trim_end().to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => Some(config::FileConfig::load(path)?),
        None => None,
    };
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;
    std::fs::create_dir_all(&app_config.cache_dir)
        .with_context(|| format!("Failed to create cache dir {:?}", app_config.cache_dir))?;

    let components = Components::build(&app_config)?;

    match cli_args.command {
        Command::Stats {
            username,
            range,
            year,
            month,
            week,
            json,
        } => {
            let period = stats_period(range, year, month, week)?;
            let stats = components.stats.user_stats(&username, &period).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }
        Command::Overview {
            username,
            year,
            per_week,
        } => {
            for cell in components.stats.overview(&username, year, per_week).await? {
                let top_album = if cell.is_complete() {
                    components
                        .stats
                        .overview_block(&username, cell.period)
                        .await?
                        .top_album
                } else {
                    None
                };
                println!("{}", overview_line(&cell.period, top_album.as_ref()));
            }
        }
        Command::ApplyCorrections => {
            let log = components.corrections.read()?;
            let report = reconcile(&log, components.album_details.cache());
            println!(
                "applied: {}, pending: {}, missing: {}, diverged: {}, malformed: {}",
                report.applied, report.pending, report.missing, report.diverged, report.malformed
            );
        }
        Command::RecomputeAverage => {
            let average = components.album_details.recompute_average()?;
            println!("Average track count: {}", average);
        }
        Command::Digest { username, kind } => {
            let digest = components.digest.latest(&username, kind).await?;
            print!("{}", digest.email_text());
        }
        Command::Feed { username } => {
            println!("{}", components.digest.feed(&username).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_periods() {
        assert_eq!(
            stats_period(None, None, None, None).unwrap(),
            Period::Preset(Preset::AllTime)
        );
        assert_eq!(
            stats_period(Some("30".into()), None, None, None).unwrap(),
            Period::Preset(Preset::Days30)
        );
        assert_eq!(
            stats_period(None, Some(2019), Some(4), None).unwrap(),
            Period::Month {
                year: 2019,
                month: 4
            }
        );
        assert_eq!(
            stats_period(None, Some(2019), None, Some(10)).unwrap(),
            Period::Week {
                year: 2019,
                week: 10
            }
        );
        assert!(stats_period(Some("12".into()), None, None, None).is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let args = CliArgs::try_parse_from([
            "albumscrobbles-cli",
            "--cache-dir",
            "/tmp/x",
            "stats",
            "rj",
            "--year",
            "2020",
            "--week",
            "3",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Stats {
                year: Some(2020),
                week: Some(3),
                ..
            }
        ));

        assert!(CliArgs::try_parse_from(["albumscrobbles-cli", "stats", "rj", "--month", "3"])
            .is_err());
    }

    #[test]
    fn overview_lines_pad_and_cut() {
        let top = CorrectedAlbumStat {
            album_name: "A".repeat(50),
            artist_name: "Low".into(),
            scrobble_count: 120,
            track_count: 12,
            album_scrobble_count: 10.0,
            original_position: 1,
            cover_url: String::new(),
        };
        let line = overview_line(&CalendarPeriod::year(2019), Some(&top));
        assert!(line.starts_with(&format!("{:<18} AAAA", "2019")));
        assert!(line.contains(&format!("{}… Low", "A".repeat(39))));
        assert!(line.ends_with(" 10.0"));

        assert_eq!(overview_line(&CalendarPeriod::year(2019), None), "2019");
    }

    #[test]
    fn overview_week_flag_needs_a_year() {
        let args = CliArgs::try_parse_from([
            "albumscrobbles-cli",
            "overview",
            "rj",
            "--year",
            "2020",
            "--per-week",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Overview {
                year: Some(2020),
                per_week: true,
                ..
            }
        ));
        assert!(
            CliArgs::try_parse_from(["albumscrobbles-cli", "overview", "rj", "--per-week"]).is_err()
        );
    }
}

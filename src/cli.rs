use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::filter::NumericRange;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Rankings analytics over competitor and ranking CSV files",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render every dashboard section for the selected filters
    Report(ReportArgs),
    /// Show overall and filtered KPIs
    Kpis(ViewArgs),
    /// List filtered rows ordered by rank
    List(ListArgs),
    /// Show the details of one competitor
    Detail(DetailArgs),
    /// Per-country competitor counts and mean points
    Countries(ViewArgs),
    /// Top-ranked and highest-points leaderboards
    Leaders(LeadersArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Competitor master data file (defaults to Competitors.csv)
    #[arg(long = "competitors")]
    pub competitors: Option<PathBuf>,
    /// Ranking history file (defaults to Competitor_Rankings.csv)
    #[arg(long = "rankings")]
    pub rankings: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML configuration with source paths and extra column aliases
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Year range such as `2022:2024` (defaults to the observed range)
    #[arg(long, value_parser = parse_range)]
    pub year: Option<NumericRange>,
    /// Week range such as `1:10` (defaults to the observed range)
    #[arg(long, value_parser = parse_range)]
    pub week: Option<NumericRange>,
    /// Rank range such as `1:50` (defaults to the first 21 observed ranks)
    #[arg(long, value_parser = parse_range)]
    pub rank: Option<NumericRange>,
    /// Points range such as `1000:5000` (defaults to the observed range)
    #[arg(long, value_parser = parse_range)]
    pub points: Option<NumericRange>,
    /// Genders to include (defaults to every observed gender)
    #[arg(long = "gender", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub genders: Vec<String>,
    /// Countries to include (defaults to all)
    #[arg(long = "country", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub countries: Vec<String>,
    /// Case-insensitive search on competitor name
    #[arg(long = "name")]
    pub name: Option<String>,
    /// Leave unspecified filters unrestricted instead of using dashboard defaults
    #[arg(long = "no-defaults")]
    pub no_defaults: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    #[command(flatten)]
    pub sources: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Competitor shown in the details section (defaults to the first name)
    #[arg(long = "select")]
    pub select: Option<String>,
    /// Leaderboard length (defaults to 10)
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Limit number of rows displayed
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct DetailArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Competitor name to show (defaults to the first name)
    #[arg(long = "select")]
    pub select: Option<String>,
}

#[derive(Debug, Args)]
pub struct LeadersArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    /// Leaderboard length (defaults to 10)
    #[arg(long)]
    pub top: Option<usize>,
}

pub fn parse_range(value: &str) -> Result<NumericRange, String> {
    value.parse::<NumericRange>().map_err(|err| err.to_string())
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

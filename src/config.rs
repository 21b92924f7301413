//! Optional YAML configuration.
//!
//! ```yaml
//! competitors: data/Competitors.csv
//! rankings: data/Competitor_Rankings.csv
//! delimiter: ";"
//! input_encoding: windows-1252
//! leaderboard_size: 15
//! competitor_aliases:
//!   player_name: name
//! ranking_aliases:
//!   pts: points
//! ```
//!
//! Every key is optional; command-line flags win over configured values.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::{
    cli::{SourceArgs, parse_delimiter},
    dataset::Sources,
    io_utils,
    schema::Normalization,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub competitors: Option<std::path::PathBuf>,
    pub rankings: Option<std::path::PathBuf>,
    pub delimiter: Option<String>,
    pub input_encoding: Option<String>,
    pub leaderboard_size: Option<usize>,
    pub competitor_aliases: BTreeMap<String, String>,
    pub ranking_aliases: BTreeMap<String, String>,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing config YAML")
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context("Parsing config YAML")
    }

    /// Loads the file named by `--config`, or the empty configuration.
    pub fn resolve(args: &SourceArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Merges command-line source flags over this configuration.
    pub fn sources(&self, args: &SourceArgs) -> Result<Sources> {
        let defaults = Sources::default();
        let delimiter = match (args.delimiter, self.delimiter.as_deref()) {
            (Some(delimiter), _) => Some(delimiter),
            (None, Some(raw)) => Some(
                parse_delimiter(raw).map_err(|err| anyhow!("Invalid configured delimiter: {err}"))?,
            ),
            (None, None) => None,
        };
        let encoding_label = args
            .input_encoding
            .as_deref()
            .or(self.input_encoding.as_deref());
        Ok(Sources {
            competitors: args
                .competitors
                .clone()
                .or_else(|| self.competitors.clone())
                .unwrap_or(defaults.competitors),
            rankings: args
                .rankings
                .clone()
                .or_else(|| self.rankings.clone())
                .unwrap_or(defaults.rankings),
            delimiter,
            encoding: io_utils::resolve_encoding(encoding_label)?,
            competitor_schema: Normalization::competitors()
                .with_aliases(&self.competitor_aliases)
                .context("Invalid competitor_aliases")?,
            ranking_schema: Normalization::rankings()
                .with_aliases(&self.ranking_aliases)
                .context("Invalid ranking_aliases")?,
        })
    }
}

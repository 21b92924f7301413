//! Loaded, normalized and merged source data plus its memoized cache.
//!
//! A [`Dataset`] is everything derived from the two source files: the
//! normalized tables, the merged table and the overall KPI baseline. The
//! baseline lives in the same entry as the table it was computed from, so a
//! reload can never leave a stale baseline behind.

use std::{path::PathBuf, rc::Rc};

use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    error::LoadError,
    frame::Table,
    join,
    loader::{self, ReadOptions},
    report::{self, Kpis},
    schema::Normalization,
};

pub const DEFAULT_COMPETITORS_FILE: &str = "Competitors.csv";
pub const DEFAULT_RANKINGS_FILE: &str = "Competitor_Rankings.csv";

/// Everything that determines the content of a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sources {
    pub competitors: PathBuf,
    pub rankings: PathBuf,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub competitor_schema: Normalization,
    pub ranking_schema: Normalization,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            competitors: PathBuf::from(DEFAULT_COMPETITORS_FILE),
            rankings: PathBuf::from(DEFAULT_RANKINGS_FILE),
            delimiter: None,
            encoding: encoding_rs::UTF_8,
            competitor_schema: Normalization::competitors(),
            ranking_schema: Normalization::rankings(),
        }
    }
}

impl Sources {
    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            delimiter: self.delimiter,
            encoding: self.encoding,
        }
    }
}

#[derive(Debug)]
pub struct Dataset {
    pub competitors: Table,
    pub rankings: Table,
    pub merged: Table,
    pub overall: Kpis,
    /// One entry per source that could not be loaded.
    pub notices: Vec<LoadError>,
}

impl Dataset {
    pub fn load(sources: &Sources) -> Dataset {
        let options = sources.read_options();
        let (raw_competitors, competitor_notice) = loader::load_or_empty(&sources.competitors, options);
        let (raw_rankings, ranking_notice) = loader::load_or_empty(&sources.rankings, options);

        let competitors = sources.competitor_schema.apply(&raw_competitors);
        let rankings = sources.ranking_schema.apply(&raw_rankings);
        let merged = join::merge(&rankings, &competitors);
        let overall = report::kpis(&merged);
        info!(
            "Dataset ready: {} merged row(s), {} competitor(s), {} country(ies)",
            merged.row_count(),
            overall.competitors,
            overall.countries
        );

        Dataset {
            competitors,
            rankings,
            merged,
            overall,
            notices: competitor_notice.into_iter().chain(ranking_notice).collect(),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.merged.is_empty()
    }
}

/// Single-entry memo of the last loaded dataset.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(Sources, Rc<Dataset>)>,
    loads: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dataset when `sources` matches the cached key,
    /// otherwise loads and replaces the entry.
    pub fn get_or_load(&mut self, sources: &Sources) -> Rc<Dataset> {
        if let Some((key, dataset)) = &self.entry
            && key == sources
        {
            debug!("Reusing cached dataset");
            return Rc::clone(dataset);
        }
        let dataset = Rc::new(Dataset::load(sources));
        self.loads += 1;
        self.entry = Some((sources.clone(), Rc::clone(&dataset)));
        dataset
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Number of loads performed, cache hits excluded.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

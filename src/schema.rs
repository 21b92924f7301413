//! Canonical column names and the normalization that maps source tables
//! onto them.
//!
//! A [`Normalization`] pairs an alias map (source header → canonical header)
//! with the set of columns that must hold numbers. Applying it renames
//! matching headers, leaves the rest untouched and coerces numeric columns,
//! turning unparseable values into missing cells. Applying it twice gives the
//! same table as applying it once.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use anyhow::{Result, bail};
use log::debug;

use crate::{data::coerce_numeric, frame::Table};

pub const COMPETITOR_ID: &str = "competitor_id";
pub const NAME: &str = "name";
pub const COUNTRY: &str = "country";
pub const COUNTRY_CODE: &str = "country_code";
pub const ABBREVIATION: &str = "abbreviation";
pub const RANK: &str = "rank";
pub const POINTS: &str = "points";
pub const MOVEMENT: &str = "movement";
pub const COMPETITIONS_PLAYED: &str = "competitions_played";
pub const YEAR: &str = "year";
pub const WEEK: &str = "week";
pub const GENDER: &str = "gender";
pub const TYPE: &str = "type";

const COMPETITOR_ALIASES: &[(&str, &str)] = &[
    ("id", COMPETITOR_ID),
    ("competitorId", COMPETITOR_ID),
    ("name", NAME),
    ("country_name", COUNTRY),
    ("country", COUNTRY),
    ("country_code", COUNTRY_CODE),
    ("abbr", ABBREVIATION),
];

const RANKING_ALIASES: &[(&str, &str)] = &[
    ("id", COMPETITOR_ID),
    ("competitorId", COMPETITOR_ID),
    ("rank", RANK),
    ("points", POINTS),
    ("movement", MOVEMENT),
    ("competitions_played", COMPETITIONS_PLAYED),
    ("year", YEAR),
    ("week", WEEK),
    ("gender", GENDER),
    ("type", TYPE),
];

const RANKING_NUMERIC: &[&str] = &[RANK, POINTS, MOVEMENT, COMPETITIONS_PLAYED, YEAR, WEEK];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Normalization {
    aliases: BTreeMap<String, String>,
    numeric: BTreeSet<String>,
}

impl Normalization {
    pub fn new<A, N>(aliases: A, numeric: N) -> Self
    where
        A: IntoIterator<Item = (String, String)>,
        N: IntoIterator<Item = String>,
    {
        Self {
            aliases: aliases.into_iter().collect(),
            numeric: numeric.into_iter().collect(),
        }
    }

    pub fn competitors() -> Self {
        Self::new(owned_pairs(COMPETITOR_ALIASES), Vec::new())
    }

    pub fn rankings() -> Self {
        Self::new(
            owned_pairs(RANKING_ALIASES),
            RANKING_NUMERIC.iter().map(|s| s.to_string()),
        )
    }

    /// Adds extra aliases; an extra alias replaces a built-in one for the same
    /// source header. Chained aliases (`score -> pts -> points`) are resolved
    /// so every source maps straight to its final name; a cycle is an error.
    pub fn with_aliases(mut self, extra: &BTreeMap<String, String>) -> Result<Self> {
        for (source, canonical) in extra {
            self.aliases.insert(source.clone(), canonical.clone());
        }
        let resolved = self
            .aliases
            .keys()
            .map(|source| Ok((source.clone(), self.resolve_alias(source)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        self.aliases = resolved;
        Ok(self)
    }

    fn resolve_alias(&self, source: &str) -> Result<String> {
        let mut visited = vec![source];
        let mut current = source;
        while let Some(next) = self.aliases.get(current).map(String::as_str) {
            if next == current {
                break;
            }
            if visited.contains(&next) {
                bail!(
                    "Column aliases form a cycle: {} -> {next}",
                    visited.join(" -> ")
                );
            }
            visited.push(next);
            current = next;
        }
        Ok(current.to_string())
    }

    pub fn canonical_for(&self, source: &str) -> Option<&str> {
        self.aliases.get(source).map(String::as_str)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.contains(column)
    }

    pub fn apply(&self, table: &Table) -> Table {
        let headers = self.rename_headers(table.headers());
        let mut normalized = table.with_headers(headers);
        for column in &self.numeric {
            if normalized.has_column(column) {
                normalized = normalized.map_column(column, coerce_numeric);
            }
        }
        normalized
    }

    fn rename_headers(&self, headers: &[String]) -> Vec<String> {
        // Headers that keep their own name claim it first, so a rename never
        // shadows a column that is already canonical.
        let mut claimed: HashSet<String> = headers
            .iter()
            .filter(|h| self.canonical_for(h).is_none_or(|target| target == h.as_str()))
            .cloned()
            .collect();

        headers
            .iter()
            .map(|header| match self.canonical_for(header) {
                Some(target) if target != header.as_str() => {
                    if claimed.insert(target.to_string()) {
                        debug!("Renaming column '{header}' to '{target}'");
                        target.to_string()
                    } else {
                        debug!("Keeping column '{header}'; '{target}' is already present");
                        header.clone()
                    }
                }
                _ => header.clone(),
            })
            .collect()
    }
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(source, canonical)| (source.to_string(), canonical.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn competitor_aliases_map_to_canonical_names() {
        let table = Table::from_text(
            headers(&["competitorId", "name", "country_name", "abbr", "extra"]),
            vec![headers(&["sr:1", "Alice", "Spain", "ALI", "x"])],
        );
        let normalized = Normalization::competitors().apply(&table);
        assert_eq!(
            normalized.headers(),
            headers(&[COMPETITOR_ID, NAME, COUNTRY, ABBREVIATION, "extra"]).as_slice()
        );
    }

    #[test]
    fn second_alias_for_taken_target_keeps_source_name() {
        let table = Table::from_text(
            headers(&["id", "competitorId"]),
            vec![headers(&["1", "2"])],
        );
        let normalization = Normalization::rankings();
        let once = normalization.apply(&table);
        assert_eq!(once.headers(), headers(&[COMPETITOR_ID, "competitorId"]).as_slice());
        assert_eq!(normalization.apply(&once), once);
    }

    #[test]
    fn canonical_header_is_not_shadowed_by_later_alias() {
        let table = Table::from_text(
            headers(&["country_name", "country"]),
            vec![headers(&["Spain", "ES"])],
        );
        let normalized = Normalization::competitors().apply(&table);
        assert_eq!(normalized.headers(), headers(&["country_name", COUNTRY]).as_slice());
    }

    #[test]
    fn numeric_columns_coerce_unparseable_values_to_missing() {
        let table = Table::from_text(
            headers(&["id", "points", "gender"]),
            vec![headers(&["1", "N/A", "M"]), headers(&["2", "1800", "F"])],
        );
        let normalized = Normalization::rankings().apply(&table);
        assert_eq!(normalized.row_count(), 2);
        assert_eq!(normalized.rows()[0][1], None);
        assert_eq!(normalized.rows()[1][1], Some(Value::Number(1800.0)));
        assert_eq!(normalized.rows()[1][2], Some(Value::Text("F".into())));
    }

    #[test]
    fn extra_aliases_override_builtins() {
        let mut extra = BTreeMap::new();
        extra.insert("pts".to_string(), POINTS.to_string());
        let normalization = Normalization::rankings()
            .with_aliases(&extra)
            .expect("aliases");
        assert_eq!(normalization.canonical_for("pts"), Some(POINTS));
        assert!(normalization.is_numeric(POINTS));
    }

    #[test]
    fn chained_aliases_resolve_to_final_name() {
        let mut extra = BTreeMap::new();
        extra.insert("score".to_string(), "pts".to_string());
        extra.insert("pts".to_string(), POINTS.to_string());
        let normalization = Normalization::rankings()
            .with_aliases(&extra)
            .expect("aliases");
        assert_eq!(normalization.canonical_for("score"), Some(POINTS));

        let table = Table::from_text(headers(&["score"]), vec![headers(&["1800"])]);
        let once = normalization.apply(&table);
        assert_eq!(once.headers(), headers(&[POINTS]).as_slice());
        assert_eq!(once.rows()[0][0], Some(Value::Number(1800.0)));
        assert_eq!(normalization.apply(&once), once);
    }

    #[test]
    fn cyclic_aliases_are_rejected() {
        let mut extra = BTreeMap::new();
        extra.insert("a".to_string(), "b".to_string());
        extra.insert("b".to_string(), "a".to_string());
        let err = Normalization::rankings()
            .with_aliases(&extra)
            .expect_err("cycle should fail");
        assert!(err.to_string().contains("cycle"), "{err}");
    }
}

//! Row filtering over the merged table.
//!
//! A [`FilterSet`] holds independently optional predicates: closed numeric
//! ranges on year, week, rank and points; set membership on gender and
//! country; a case-insensitive substring search on name. Predicates whose
//! column is absent, or which carry the "no restriction" sentinel, are
//! skipped. The rest are combined with AND and the surviving rows keep their
//! input order.

use std::{collections::BTreeSet, fmt, str::FromStr};

use anyhow::{Result, anyhow, bail};
use itertools::Itertools;
use log::{debug, info};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::{
    data::{Value, format_number},
    frame::{Row, Table},
    schema::{COUNTRY, GENDER, NAME, POINTS, RANK, WEEK, YEAR},
};

/// Closed interval `[lo, hi]`. A range with `lo > hi` matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub lo: f64,
    pub hi: f64,
}

impl NumericRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn single(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", format_number(self.lo), format_number(self.hi))
    }
}

impl FromStr for NumericRange {
    type Err = anyhow::Error;

    /// Accepts `LO:HI`, `LO..HI`, `LO..=HI` or a single value.
    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            bail!("Empty range");
        }
        let bound = |raw: &str| -> Result<f64> {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| !n.is_nan())
                .ok_or_else(|| anyhow!("Invalid range bound '{}' in '{trimmed}'", raw.trim()))
        };
        for separator in ["..=", "..", ":"] {
            if let Some((lo, hi)) = trimmed.split_once(separator) {
                return Ok(Self::new(bound(lo)?, bound(hi)?));
            }
        }
        Ok(Self::single(bound(trimmed)?))
    }
}

/// Set-membership predicate. `Any` is the "no restriction" sentinel; an
/// explicit empty selection collapses to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Any,
    OneOf(BTreeSet<String>),
}

impl Selection {
    pub fn of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Selection::Any
        } else {
            Selection::OneOf(set)
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Selection::Any)
    }

    /// Missing cells never belong to an explicit selection.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Selection::Any => true,
            Selection::OneOf(set) => value.is_some_and(|v| set.contains(&v.as_display())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSet {
    pub year: Option<NumericRange>,
    pub week: Option<NumericRange>,
    pub rank: Option<NumericRange>,
    pub points: Option<NumericRange>,
    pub gender: Selection,
    pub country: Selection,
    pub name: Option<String>,
}

enum Predicate<'a> {
    Range {
        column: usize,
        range: NumericRange,
    },
    Member {
        column: usize,
        selection: &'a Selection,
    },
    Contains {
        column: usize,
        needle: NameMatcher,
    },
}

impl Predicate<'_> {
    fn accepts(&self, row: &Row) -> bool {
        match self {
            Predicate::Range { column, range } => row[*column]
                .as_ref()
                .and_then(Value::as_number)
                .is_some_and(|n| range.contains(n)),
            Predicate::Member { column, selection } => selection.matches(row[*column].as_ref()),
            Predicate::Contains { column, needle } => row[*column]
                .as_ref()
                .is_some_and(|v| needle.is_match(&v.as_display())),
        }
    }
}

enum NameMatcher {
    Pattern(Regex),
    Lowercase(String),
}

impl NameMatcher {
    fn new(needle: &str) -> Self {
        match RegexBuilder::new(&regex::escape(needle))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => NameMatcher::Pattern(pattern),
            Err(err) => {
                debug!("Falling back to lowercase search for '{needle}': {err}");
                NameMatcher::Lowercase(needle.to_lowercase())
            }
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            NameMatcher::Pattern(pattern) => pattern.is_match(haystack),
            NameMatcher::Lowercase(needle) => haystack.to_lowercase().contains(needle.as_str()),
        }
    }
}

impl FilterSet {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.year.is_none()
            && self.week.is_none()
            && self.rank.is_none()
            && self.points.is_none()
            && self.gender.is_unrestricted()
            && self.country.is_unrestricted()
            && self.name.as_deref().is_none_or(str::is_empty)
    }

    fn predicates(&self, table: &Table) -> Vec<Predicate<'_>> {
        let mut predicates = Vec::new();
        let column_for = |name: &str| {
            let idx = table.column_index(name);
            if idx.is_none() {
                debug!("Skipping filter on '{name}'; column not present");
            }
            idx
        };

        for (name, range) in [
            (YEAR, self.year),
            (WEEK, self.week),
            (RANK, self.rank),
            (POINTS, self.points),
        ] {
            if let Some(range) = range
                && let Some(column) = column_for(name)
            {
                debug!("Filtering {name} to {range}");
                predicates.push(Predicate::Range { column, range });
            }
        }

        for (name, selection) in [(GENDER, &self.gender), (COUNTRY, &self.country)] {
            if !selection.is_unrestricted()
                && let Some(column) = column_for(name)
            {
                debug!("Filtering {name} to {selection:?}");
                predicates.push(Predicate::Member { column, selection });
            }
        }

        if let Some(needle) = self.name.as_deref().filter(|n| !n.is_empty())
            && let Some(column) = column_for(NAME)
        {
            debug!("Filtering {NAME} containing '{needle}'");
            predicates.push(Predicate::Contains {
                column,
                needle: NameMatcher::new(needle),
            });
        }

        predicates
    }

    /// Returns the rows of `table` accepted by every active predicate.
    pub fn apply(&self, table: &Table) -> Table {
        let predicates = self.predicates(table);
        if predicates.is_empty() {
            return table.clone();
        }
        let kept = table
            .rows()
            .iter()
            .positions(|row| predicates.iter().all(|p| p.accepts(row)))
            .collect::<Vec<_>>();
        info!(
            "Filters kept {} of {} row(s)",
            kept.len(),
            table.row_count()
        );
        table.take(&kept)
    }
}

/// Observed `[min, max]` of a numeric column, ignoring missing cells.
pub fn observed_range(table: &Table, column: &str) -> Option<NumericRange> {
    let numbers = table.numbers(column);
    let lo = numbers.iter().copied().reduce(f64::min)?;
    let hi = numbers.iter().copied().reduce(f64::max)?;
    Some(NumericRange::new(lo, hi))
}

/// Sorted distinct display values of a column, ignoring missing cells.
pub fn observed_values(table: &Table, column: &str) -> Vec<String> {
    table
        .column(column)
        .map(|cells| {
            cells
                .flatten()
                .map(Value::as_display)
                .sorted()
                .dedup()
                .collect()
        })
        .unwrap_or_default()
}

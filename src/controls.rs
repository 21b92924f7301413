//! Turns filter flags into a [`FilterSet`], filling unspecified predicates
//! with the dashboard defaults derived from the loaded table.
//!
//! Year, week and points default to their observed range, rank to the first
//! 21 observed ranks and gender to every observed value. Country and name stay unrestricted. `--no-defaults`
//! leaves every unspecified predicate unrestricted.

use log::debug;

use crate::{
    cli::FilterArgs,
    filter::{FilterSet, NumericRange, Selection, observed_range, observed_values},
    frame::Table,
    schema::{GENDER, POINTS, RANK, WEEK, YEAR},
};

const RANK_WINDOW: f64 = 20.0;

pub fn build_filters(table: &Table, args: &FilterArgs) -> FilterSet {
    let defaults = !args.no_defaults;
    let observed = |column: &str| {
        defaults
            .then(|| observed_range(table, column))
            .flatten()
    };

    let gender = if !args.genders.is_empty() {
        Selection::of(args.genders.iter().cloned())
    } else if defaults {
        Selection::of(observed_values(table, GENDER))
    } else {
        Selection::Any
    };

    let filters = FilterSet {
        year: args.year.or_else(|| observed(YEAR)),
        week: args.week.or_else(|| observed(WEEK)),
        rank: args.rank.or_else(|| observed(RANK).map(rank_window)),
        points: args.points.or_else(|| observed(POINTS)),
        gender,
        country: Selection::of(args.countries.iter().cloned()),
        name: args.name.clone().filter(|n| !n.trim().is_empty()),
    };
    debug!("Resolved filters: {filters:?}");
    filters
}

fn rank_window(observed: NumericRange) -> NumericRange {
    NumericRange::new(observed.lo, (observed.lo + RANK_WINDOW).min(observed.hi))
}

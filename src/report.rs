//! Read-only aggregations over a merged (or filtered) table.
//!
//! Nothing here raises on empty input: counts and maxima fall back to zero and
//! the mean of an empty group is missing.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{Value, cmp_missing_last},
    filter::{FilterSet, observed_values},
    frame::Table,
    schema::{
        COMPETITIONS_PLAYED, COMPETITOR_ID, COUNTRY, GENDER, MOVEMENT, NAME, POINTS, RANK, WEEK,
        YEAR,
    },
};

pub const LEADERBOARD_SIZE: usize = 10;

const LISTING_COLUMNS: &[&str] = &[
    RANK,
    NAME,
    COUNTRY,
    POINTS,
    MOVEMENT,
    COMPETITIONS_PLAYED,
    YEAR,
    WEEK,
    GENDER,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub competitors: usize,
    pub countries: usize,
    pub max_points: i64,
}

pub fn kpis(table: &Table) -> Kpis {
    Kpis {
        competitors: distinct_count(table, COMPETITOR_ID),
        countries: distinct_count(table, COUNTRY),
        max_points: table
            .numbers(POINTS)
            .into_iter()
            .reduce(f64::max)
            .map_or(0, |max| max as i64),
    }
}

fn distinct_count(table: &Table, column: &str) -> usize {
    table
        .column(column)
        .map(|cells| cells.flatten().map(Value::as_display).unique().count())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryStat {
    pub country: String,
    pub competitors: usize,
    pub avg_points: Option<f64>,
}

#[derive(Default)]
struct CountryAccumulator {
    ids: HashSet<String>,
    points_sum: f64,
    points_count: usize,
}

/// Per-country distinct competitors and mean points, largest groups first.
/// Rows without a country are left out; equal counts keep ascending country
/// order.
pub fn country_rollup(table: &Table) -> Vec<CountryStat> {
    let Some(country_idx) = table.column_index(COUNTRY) else {
        return Vec::new();
    };
    let id_idx = table.column_index(COMPETITOR_ID);
    let points_idx = table.column_index(POINTS);

    let mut groups: BTreeMap<String, CountryAccumulator> = BTreeMap::new();
    for row in table.rows() {
        let Some(country) = &row[country_idx] else {
            continue;
        };
        let group = groups.entry(country.as_display()).or_default();
        if let Some(id) = id_idx.and_then(|idx| row[idx].as_ref()) {
            group.ids.insert(id.as_display());
        }
        if let Some(points) = points_idx
            .and_then(|idx| row[idx].as_ref())
            .and_then(Value::as_number)
        {
            group.points_sum += points;
            group.points_count += 1;
        }
    }

    let mut stats = groups
        .into_iter()
        .map(|(country, acc)| CountryStat {
            country,
            competitors: acc.ids.len(),
            avg_points: (acc.points_count > 0).then(|| acc.points_sum / acc.points_count as f64),
        })
        .collect::<Vec<_>>();
    stats.sort_by(|a, b| b.competitors.cmp(&a.competitors));
    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderRow {
    pub rank: Option<Value>,
    pub name: Option<Value>,
    pub country: Option<Value>,
    pub points: Option<Value>,
}

pub fn top_by_rank(table: &Table, limit: usize) -> Vec<LeaderRow> {
    leaderboard(table, RANK, false, limit)
}

pub fn top_by_points(table: &Table, limit: usize) -> Vec<LeaderRow> {
    leaderboard(table, POINTS, true, limit)
}

fn leaderboard(table: &Table, column: &str, descending: bool, limit: usize) -> Vec<LeaderRow> {
    sorted_positions(table, column, descending)
        .into_iter()
        .take(limit)
        .map(|idx| {
            let row = &table.rows()[idx];
            LeaderRow {
                rank: table.cell(row, RANK).cloned(),
                name: table.cell(row, NAME).cloned(),
                country: table.cell(row, COUNTRY).cloned(),
                points: table.cell(row, POINTS).cloned(),
            }
        })
        .collect()
}

/// Stable ordering of row positions by a numeric column, missing values last.
/// An absent column leaves the input order untouched.
fn sorted_positions(table: &Table, column: &str, descending: bool) -> Vec<usize> {
    let mut positions = (0..table.row_count()).collect::<Vec<_>>();
    if let Some(idx) = table.column_index(column) {
        let key = |pos: usize| table.rows()[pos][idx].as_ref().and_then(Value::as_number);
        positions.sort_by(|&a, &b| cmp_missing_last(key(a), key(b), descending));
    }
    positions
}

/// Filtered rows projected to the listing columns that exist, ordered by
/// rank.
pub fn listing(table: &Table) -> Table {
    let columns = LISTING_COLUMNS
        .iter()
        .filter_map(|name| table.column_index(name).map(|idx| (name.to_string(), idx)))
        .collect::<Vec<_>>();
    let rows = sorted_positions(table, RANK, false)
        .into_iter()
        .map(|pos| {
            let row = &table.rows()[pos];
            columns.iter().map(|(_, idx)| row[*idx].clone()).collect()
        })
        .collect();
    Table::new(columns.into_iter().map(|(name, _)| name).collect(), rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorDetail {
    pub name: String,
    pub rank: Option<Value>,
    pub points: Option<Value>,
    pub movement: Option<Value>,
    pub competitions_played: Option<Value>,
    pub country: Option<Value>,
}

/// First row whose name equals `name`, in the table's current order.
// TODO: decide whether the latest year/week should win over first occurrence.
pub fn detail(table: &Table, name: &str) -> Option<CompetitorDetail> {
    let name_idx = table.column_index(NAME)?;
    let row = table
        .rows()
        .iter()
        .find(|row| row[name_idx].as_ref().is_some_and(|v| v.as_display() == name))?;
    Some(CompetitorDetail {
        name: name.to_string(),
        rank: table.cell(row, RANK).cloned(),
        points: table.cell(row, POINTS).cloned(),
        movement: table.cell(row, MOVEMENT).cloned(),
        competitions_played: table.cell(row, COMPETITIONS_PLAYED).cloned(),
        country: table.cell(row, COUNTRY).cloned(),
    })
}

/// Sorted distinct names available for the detail view.
pub fn selectable_names(table: &Table) -> Vec<String> {
    observed_values(table, NAME)
}

/// Every section of the dashboard computed for one filter selection.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub filters: FilterSet,
    pub overall: Kpis,
    pub filtered: Kpis,
    pub listing: Table,
    pub detail: Option<CompetitorDetail>,
    pub countries: Vec<CountryStat>,
    pub top_ranked: Vec<LeaderRow>,
    pub top_points: Vec<LeaderRow>,
}

impl Report {
    /// Assembles the sections from a table `filters` has already been applied
    /// to. `overall` is the baseline computed over the unfiltered table at
    /// load time. Without `selected`, the detail view shows the first
    /// selectable name.
    pub fn build(
        filtered: &Table,
        overall: Kpis,
        filters: &FilterSet,
        selected: Option<&str>,
        top: usize,
    ) -> Report {
        let detail = match selected {
            Some(name) => detail(filtered, name),
            None => selectable_names(filtered)
                .first()
                .and_then(|name| detail(filtered, name)),
        };
        Report {
            filters: filters.clone(),
            overall,
            filtered: kpis(filtered),
            listing: listing(filtered),
            detail,
            countries: country_rollup(filtered),
            top_ranked: top_by_rank(filtered, top),
            top_points: top_by_points(filtered, top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Option<Value> {
        Some(Value::Number(n))
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    fn merged() -> Table {
        Table::new(
            [COMPETITOR_ID, RANK, POINTS, NAME, COUNTRY]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                vec![text("3"), num(3.0), num(1500.0), text("C"), text("FR")],
                vec![text("1"), num(1.0), num(2000.0), text("A"), text("US")],
                vec![text("2"), None, num(1800.0), text("B"), text("FR")],
                vec![text("4"), num(2.0), None, text("D"), None],
                vec![text("1"), num(5.0), num(900.0), text("A"), text("US")],
            ],
        )
    }

    #[test]
    fn kpis_count_distinct_and_ignore_missing() {
        let kpis = kpis(&merged());
        assert_eq!(
            kpis,
            Kpis {
                competitors: 4,
                countries: 2,
                max_points: 2000
            }
        );
    }

    #[test]
    fn kpis_of_empty_table_are_zero() {
        assert_eq!(kpis(&Table::empty()), Kpis::default());
        let headers_only = Table::new(vec![POINTS.to_string()], Vec::new());
        assert_eq!(kpis(&headers_only).max_points, 0);
    }

    #[test]
    fn country_rollup_orders_by_competitor_count() {
        let stats = country_rollup(&merged());
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].country, "FR");
        assert_eq!(stats[0].competitors, 2);
        assert_eq!(stats[0].avg_points, Some(1650.0));
        assert_eq!(stats[1].country, "US");
        assert_eq!(stats[1].competitors, 1);
        assert_eq!(stats[1].avg_points, Some(1450.0));
    }

    #[test]
    fn country_rollup_ties_keep_country_order() {
        let table = Table::new(
            vec![COMPETITOR_ID.into(), COUNTRY.into()],
            vec![
                vec![text("1"), text("US")],
                vec![text("2"), text("AR")],
            ],
        );
        let order = country_rollup(&table)
            .into_iter()
            .map(|s| s.country)
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["AR", "US"]);
    }

    #[test]
    fn leaderboards_sort_missing_last() {
        let table = merged();
        let by_rank = top_by_rank(&table, LEADERBOARD_SIZE);
        let ranks = by_rank.iter().map(|r| r.rank.clone()).collect::<Vec<_>>();
        assert_eq!(ranks, vec![num(1.0), num(2.0), num(3.0), num(5.0), None]);

        let by_points = top_by_points(&table, 2);
        assert_eq!(by_points.len(), 2);
        assert_eq!(by_points[0].points, num(2000.0));
        assert_eq!(by_points[1].name, text("B"));
        assert_eq!(top_by_points(&table, LEADERBOARD_SIZE).last().unwrap().points, None);
    }

    #[test]
    fn listing_projects_present_columns_in_rank_order() {
        let listing = listing(&merged());
        assert_eq!(listing.headers(), &[RANK, NAME, COUNTRY, POINTS]);
        assert_eq!(listing.rows()[0][1], text("A"));
        assert_eq!(listing.rows()[4][0], None);
    }

    #[test]
    fn detail_returns_first_match() {
        let detail = detail(&merged(), "A").expect("detail");
        assert_eq!(detail.rank, num(1.0));
        assert_eq!(detail.points, num(2000.0));
        assert_eq!(detail.movement, None);
        assert!(super::detail(&merged(), "Z").is_none());
    }

    #[test]
    fn report_defaults_detail_to_first_name() {
        let table = merged();
        let report = Report::build(&table, kpis(&table), &FilterSet::default(), None, 3);
        assert_eq!(report.detail.map(|d| d.name), Some("A".to_string()));
        assert_eq!(report.top_ranked.len(), 3);
        assert_eq!(report.filtered, report.overall);
    }

    #[test]
    fn report_uses_the_table_it_is_given() {
        let table = merged();
        let filters = FilterSet {
            rank: Some(crate::filter::NumericRange::new(100.0, 200.0)),
            ..FilterSet::default()
        };
        let report = Report::build(&table, kpis(&table), &filters, None, 3);
        assert_eq!(report.listing.row_count(), table.row_count());
        assert_eq!(report.filters, filters);
    }
}

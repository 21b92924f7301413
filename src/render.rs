//! Plain-text and JSON rendering of report sections.

use std::{borrow::Cow, fmt::Write as _};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    data::{Value, format_number},
    filter::{FilterSet, Selection},
    frame::Table,
    report::{CompetitorDetail, CountryStat, Kpis, LeaderRow, Report},
};

const MISSING: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Lays out rows under their headers. Columns holding only numbers (missing
/// cells aside) are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    let mut numeric = vec![None::<bool>; column_count];

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(sanitize_cell(cell).chars().count());
            if cell != MISSING && !cell.is_empty() {
                let is_number = cell.parse::<f64>().is_ok();
                numeric[idx] = Some(numeric[idx].unwrap_or(true) && is_number);
            }
        }
    }
    let aligns = numeric
        .into_iter()
        .map(|kind| match kind {
            Some(true) => Align::Right,
            _ => Align::Left,
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let cells = values
        .iter()
        .zip(widths.iter().zip(aligns))
        .map(|(value, (&width, align))| {
            let sanitized = sanitize_cell(value);
            match align {
                Align::Left => format!("{sanitized:<width$}"),
                Align::Right => format!("{sanitized:>width$}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn section(output: &mut String, title: &str, body: &str) {
    let _ = writeln!(output, "{title}");
    let _ = writeln!(output, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(output, "{body}");
}

fn cell(value: Option<&Value>) -> String {
    value.map_or_else(|| MISSING.to_string(), Value::as_display)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn render_kpis(overall: &Kpis, filtered: &Kpis) -> String {
    let rows = [
        ("Competitors", overall.competitors, filtered.competitors),
        ("Countries represented", overall.countries, filtered.countries),
    ]
    .into_iter()
    .map(|(metric, all, shown)| vec![metric.to_string(), all.to_string(), shown.to_string()])
    .chain(std::iter::once(vec![
        "Highest points".to_string(),
        overall.max_points.to_string(),
        filtered.max_points.to_string(),
    ]))
    .collect::<Vec<_>>();
    render_table(&strings(&["metric", "overall", "filtered"]), &rows)
}

pub fn render_listing(listing: &Table) -> String {
    if listing.is_empty() {
        return "No results match filters.\n".to_string();
    }
    let rows = listing
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| cell(v.as_ref())).collect())
        .collect::<Vec<_>>();
    render_table(listing.headers(), &rows)
}

pub fn render_detail(detail: Option<&CompetitorDetail>) -> String {
    let Some(detail) = detail else {
        return "No competitor selected.\n".to_string();
    };
    let rows = [
        ("Name", Some(Value::Text(detail.name.clone()))),
        ("Rank", detail.rank.clone()),
        ("Points", detail.points.clone()),
        ("Movement", detail.movement.clone()),
        ("Competitions played", detail.competitions_played.clone()),
        ("Country", detail.country.clone()),
    ]
    .into_iter()
    .map(|(field, value)| vec![field.to_string(), cell(value.as_ref())])
    .collect::<Vec<_>>();
    render_table(&strings(&["field", "value"]), &rows)
}

pub fn render_countries(stats: &[CountryStat]) -> String {
    if stats.is_empty() {
        return "No country data.\n".to_string();
    }
    let rows = stats
        .iter()
        .map(|stat| {
            vec![
                stat.country.clone(),
                stat.competitors.to_string(),
                stat.avg_points.map_or_else(|| MISSING.to_string(), format_number),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&strings(&["country", "total_competitors", "avg_points"]), &rows)
}

pub fn render_leaderboard(rows: &[LeaderRow]) -> String {
    if rows.is_empty() {
        return "No results match filters.\n".to_string();
    }
    let rows = rows
        .iter()
        .map(|row| {
            vec![
                cell(row.rank.as_ref()),
                cell(row.name.as_ref()),
                cell(row.country.as_ref()),
                cell(row.points.as_ref()),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&strings(&["rank", "name", "country", "points"]), &rows)
}

pub fn describe_filters(filters: &FilterSet) -> String {
    let mut parts = Vec::new();
    for (name, range) in [
        ("year", filters.year),
        ("week", filters.week),
        ("rank", filters.rank),
        ("points", filters.points),
    ] {
        if let Some(range) = range {
            parts.push(format!("{name} {range}"));
        }
    }
    for (name, selection) in [("gender", &filters.gender), ("country", &filters.country)] {
        if let Selection::OneOf(values) = selection {
            parts.push(format!(
                "{name} in {}",
                values.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
    }
    if let Some(name) = &filters.name {
        parts.push(format!("name contains '{name}'"));
    }
    if parts.is_empty() {
        "Filters: none".to_string()
    } else {
        format!("Filters: {}", parts.join("; "))
    }
}

pub fn render_report(report: &Report) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}\n", describe_filters(&report.filters));
    section(&mut output, "KPIs", &render_kpis(&report.overall, &report.filtered));
    section(&mut output, "Filtered Competitors", &render_listing(&report.listing));
    section(&mut output, "Competitor Details", &render_detail(report.detail.as_ref()));
    section(&mut output, "Country Analysis", &render_countries(&report.countries));
    section(&mut output, "Top Ranked", &render_leaderboard(&report.top_ranked));
    section(&mut output, "Highest Points", &render_leaderboard(&report.top_points));
    output
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Serializing report to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_are_right_aligned() {
        let headers = strings(&["rank", "name"]);
        let rows = vec![strings(&["1", "Alice"]), strings(&["10", "Bob"])];
        let rendered = render_table(&headers, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["rank  name", "----  -----", "   1  Alice", "  10  Bob"]);
    }

    #[test]
    fn control_characters_are_flattened() {
        let headers = strings(&["note"]);
        let rows = vec![strings(&["line1\nline2\tvalue"])];
        let rendered = render_table(&headers, &rows);
        assert_eq!(rendered.lines().nth(2), Some("line1 line2 value"));
    }

    #[test]
    fn missing_cells_render_as_dash() {
        let rows = vec![LeaderRow {
            rank: Some(Value::Number(1.0)),
            name: Some(Value::Text("A".into())),
            country: None,
            points: Some(Value::Number(2000.0)),
        }];
        let rendered = render_leaderboard(&rows);
        assert_eq!(rendered.lines().nth(2), Some("   1  A     -          2000"));
    }

    #[test]
    fn listing_renders_every_row_it_is_given() {
        let listing = Table::from_text(
            strings(&["rank", "name"]),
            vec![strings(&["1", "A"]), strings(&["2", "B"]), strings(&["3", "C"])],
        );
        let rendered = render_listing(&listing);
        assert_eq!(rendered.lines().count(), 5);
        assert_eq!(render_listing(&Table::empty()), "No results match filters.\n");
    }

    #[test]
    fn empty_sections_render_notices() {
        assert_eq!(render_leaderboard(&[]), "No results match filters.\n");
        assert_eq!(render_countries(&[]), "No country data.\n");
        assert_eq!(render_detail(None), "No competitor selected.\n");
    }

    #[test]
    fn describes_active_filters() {
        let filters = FilterSet {
            rank: Some(crate::filter::NumericRange::new(1.0, 20.0)),
            country: Selection::of(["US", "FR"]),
            ..FilterSet::default()
        };
        assert_eq!(
            describe_filters(&filters),
            "Filters: rank 1..20; country in FR, US"
        );
        assert_eq!(describe_filters(&FilterSet::default()), "Filters: none");
    }
}

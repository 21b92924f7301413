use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::{
    data::{Value, parse_numeric},
    frame::{Row, Table},
    schema::COMPETITOR_ID,
};

const COLLISION_PREFIX: &str = "competitor_";

/// Left-joins `rankings` onto `competitors` by `competitor_id`.
///
/// Every ranking row appears exactly once in the output, in input order. When
/// either side lacks the identifier column the ranking table is returned
/// unchanged.
pub fn merge(rankings: &Table, competitors: &Table) -> Table {
    let (Some(left_key), Some(right_key)) = (
        rankings.column_index(COMPETITOR_ID),
        competitors.column_index(COMPETITOR_ID),
    ) else {
        debug!("'{COMPETITOR_ID}' missing from one side; using rankings as the merged table");
        return rankings.clone();
    };

    let lookup = build_lookup(competitors, right_key);
    let (headers, right_columns) =
        build_output_headers(rankings.headers(), competitors.headers(), right_key);

    let mut matched_rows = 0usize;
    let rows: Vec<Row> = rankings
        .rows()
        .iter()
        .map(|left| {
            let mut combined = left.clone();
            let matched = left[left_key]
                .as_ref()
                .and_then(|key| lookup.get(&join_key(key)))
                .map(|&idx| &competitors.rows()[idx]);
            if matched.is_some() {
                matched_rows += 1;
            }
            combined.extend(
                right_columns
                    .iter()
                    .map(|&col| matched.and_then(|right| right[col].clone())),
            );
            combined
        })
        .collect();

    info!(
        "Merged {} ranking row(s); {} matched a competitor",
        rows.len(),
        matched_rows
    );
    Table::new(headers, rows)
}

/// Identifiers that parse as numbers compare by value, so `1`, `1.0` and
/// ` 1 ` share a key. Anything else compares by its trimmed text.
fn join_key(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Text(s) => parse_numeric(s)
            .map_or_else(|| s.trim().to_string(), |n| n.to_string()),
    }
}

/// First competitor row per identifier. Later duplicates are ignored so the
/// join never fans out.
fn build_lookup(competitors: &Table, key: usize) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, row) in competitors.rows().iter().enumerate() {
        if let Some(value) = &row[key] {
            map.entry(join_key(value)).or_insert(idx);
        }
    }
    if map.len() < competitors.row_count() {
        debug!(
            "{} competitor row(s) skipped for duplicate or missing identifiers",
            competitors.row_count() - map.len()
        );
    }
    map
}

fn build_output_headers(
    left_headers: &[String],
    right_headers: &[String],
    right_key: usize,
) -> (Vec<String>, Vec<usize>) {
    let mut headers = left_headers.to_vec();
    let mut seen: HashSet<String> = headers.iter().cloned().collect();
    let mut right_columns = Vec::new();

    for (idx, name) in right_headers.iter().enumerate() {
        if idx == right_key {
            continue;
        }
        let mut candidate = name.clone();
        if seen.contains(&candidate) {
            let base = format!("{COLLISION_PREFIX}{name}");
            candidate = base.clone();
            let mut counter = 2usize;
            while seen.contains(&candidate) {
                candidate = format!("{base}_{counter}");
                counter += 1;
            }
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
        right_columns.push(idx);
    }

    (headers, right_columns)
}

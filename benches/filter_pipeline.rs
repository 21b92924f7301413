use std::fs::File;
use std::io::Write;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rankings_dashboard::dataset::{Dataset, Sources};
use rankings_dashboard::filter::{FilterSet, NumericRange, Selection};
use rankings_dashboard::report::{self, Report};
use tempfile::TempDir;

const COUNTRIES: &[&str] = &["Spain", "France", "Italy", "Serbia", "USA", "Poland"];

fn generate_sources(competitors: usize, weeks: usize) -> (TempDir, Sources) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let competitors_path = temp_dir.path().join("Competitors.csv");
    let rankings_path = temp_dir.path().join("Competitor_Rankings.csv");

    let mut file = File::create(&competitors_path).expect("create competitors");
    writeln!(file, "id,name,country,country_code,abbr").expect("header");
    for i in 0..competitors {
        let country = COUNTRIES[i % COUNTRIES.len()];
        writeln!(file, "sr:competitor:{i},Player {i},{country},{},P{i}", &country[..3])
            .expect("row");
    }

    let mut file = File::create(&rankings_path).expect("create rankings");
    writeln!(
        file,
        "competitorId,rank,points,movement,competitions_played,year,week,gender,type"
    )
    .expect("header");
    for week in 1..=weeks {
        for i in 0..competitors {
            let gender = if i % 2 == 0 { "men" } else { "women" };
            let points = 10_000 - (i * 7) % 9_000;
            writeln!(
                file,
                "sr:competitor:{i},{},{points},{},{},2024,{week},{gender},singles",
                i + 1,
                (i % 5) as i64 - 2,
                10 + i % 15
            )
            .expect("row");
        }
    }

    let sources = Sources {
        competitors: competitors_path,
        rankings: rankings_path,
        ..Sources::default()
    };
    (temp_dir, sources)
}

fn bench_filter_pipeline(c: &mut Criterion) {
    let (temp_dir, sources) = generate_sources(500, 52);
    let dataset = Dataset::load(&sources);
    let filters = FilterSet {
        week: Some(NumericRange::new(10.0, 40.0)),
        rank: Some(NumericRange::new(1.0, 100.0)),
        country: Selection::of(["Spain", "Serbia"]),
        name: Some("player 1".to_string()),
        ..FilterSet::default()
    };

    let mut group = c.benchmark_group("dashboard");

    group.bench_function("load_and_merge", |b| {
        b.iter_batched(
            || sources.clone(),
            |sources| Dataset::load(&sources),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("filter", |b| {
        b.iter(|| filters.apply(&dataset.merged));
    });

    group.bench_function("full_report", |b| {
        b.iter(|| {
            let filtered = filters.apply(&dataset.merged);
            Report::build(
                &filtered,
                dataset.overall,
                &filters,
                None,
                report::LEADERBOARD_SIZE,
            )
        });
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_filter_pipeline);
criterion_main!(benches);

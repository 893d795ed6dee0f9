use chrono::{NaiveDate, TimeDelta};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use weather_map_plotter::{nearest_observation, ObservationRow};

fn bench_selection(c: &mut Criterion) {
    let target = NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    // A day of ten-minute rows, every third one missing the dew point.
    let rows: Vec<ObservationRow> = (-72..72)
        .map(|i| ObservationRow {
            time: target + TimeDelta::minutes(i * 10),
            temperature: Some(25.0),
            dew_point: (i % 3 != 0).then_some(20.0),
            wind_speed: Some(12.0),
            wind_direction: Some(180.0),
        })
        .collect();

    c.bench_function("nearest_observation", |b| {
        b.iter(|| nearest_observation(black_box(&rows), black_box(target), TimeDelta::minutes(30)))
    });
}

criterion_group!(benches, bench_selection);
criterion_main!(benches);

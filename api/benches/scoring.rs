use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::Rng;

// Standalone replica of the per-item trending arithmetic so the hot path can
// be measured without a database.

#[derive(Clone)]
struct Aggregate {
    downloads: i64,
    snap_count_24h: i64,
    delta_downloads_24h: i64,
    delta_downloads_7d: i64,
    delta_thumbs_24h: i64,
    delta_thumbs_7d: i64,
    min_downloads_7d: i64,
    thumbs: i64,
    update_days_90d: i64,
    updated_within_7d: bool,
}

fn generate(n: usize) -> Vec<Aggregate> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| {
            let downloads = rng.random_range(0..5_000_000i64);
            let delta_7d = rng.random_range(0..50_000i64);
            Aggregate {
                downloads,
                snap_count_24h: rng.random_range(0..25),
                delta_downloads_24h: delta_7d / 7,
                delta_downloads_7d: delta_7d,
                delta_thumbs_24h: rng.random_range(0..20),
                delta_thumbs_7d: rng.random_range(0..140),
                min_downloads_7d: (downloads - delta_7d).max(0),
                thumbs: rng.random_range(0..10_000),
                update_days_90d: rng.random_range(0..12),
                updated_within_7d: rng.random_range(0..10) == 0,
            }
        })
        .collect()
}

fn velocity(delta: i64, hours: f64) -> f64 {
    delta.max(0) as f64 / hours
}

fn blended(v_short: f64, v_long: f64, confident: bool) -> f64 {
    if confident {
        0.8 * v_short + 0.2 * v_long
    } else {
        0.3 * v_short + 0.7 * v_long
    }
}

fn size_multiplier(downloads: i64, p95: f64) -> f64 {
    if downloads <= 0 {
        return 0.1;
    }
    ((downloads as f64 + 1.0).log10() / (p95 + 1.0).log10()).clamp(0.1, 1.0)
}

fn maintenance_multiplier(update_days: i64) -> f64 {
    if update_days == 0 {
        return 0.95;
    }
    let avg = 90.0 / update_days as f64;
    if avg <= 14.0 {
        1.15
    } else if avg <= 30.0 {
        1.10
    } else if avg <= 60.0 {
        1.05
    } else {
        1.00
    }
}

fn score_batch(items: &[Aggregate], p95: f64) -> (f64, f64) {
    let mut hot_sum = 0.0;
    let mut rising_sum = 0.0;

    for item in items {
        let confident = item.snap_count_24h >= 5 && item.delta_downloads_24h >= 10;
        let dv = blended(
            velocity(item.delta_downloads_24h, 24.0),
            velocity(item.delta_downloads_7d, 168.0),
            confident,
        );
        let tv = blended(
            velocity(item.delta_thumbs_24h, 24.0),
            velocity(item.delta_thumbs_7d, 168.0),
            item.snap_count_24h >= 5 && item.delta_thumbs_24h >= 10,
        );

        let growth = if item.min_downloads_7d > 0 {
            item.delta_downloads_7d as f64 / item.min_downloads_7d as f64 * 100.0
        } else {
            0.0
        };
        let thumbs_base = item.thumbs - item.delta_thumbs_7d;
        let thumbs_growth = if thumbs_base > 0 {
            item.delta_thumbs_7d as f64 / thumbs_base as f64 * 100.0
        } else {
            0.0
        };

        let boost = if item.updated_within_7d { 10.0 } else { 0.0 };
        let signal = 0.7 * dv + 0.2 * tv + 0.1 * boost;
        let growth_signal = 0.7 * growth + 0.2 * thumbs_growth + 0.1 * boost;

        let size = size_multiplier(item.downloads, p95);
        let maint = maintenance_multiplier(item.update_days_90d);

        if item.downloads >= 500 && signal > 0.0 {
            hot_sum += signal * size * maint / 2f64.powf(1.5);
        }
        if (50..=10_000).contains(&item.downloads) && growth_signal > 0.0 {
            rising_sum += growth_signal * size * maint / 2f64.powf(1.8);
        }
    }

    (hot_sum, rising_sum)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("trending_scoring");
    for n in [100usize, 1_000, 10_000, 100_000] {
        let items = generate(n);
        group.bench_function(BenchmarkId::new("score_batch", n), |b| {
            b.iter(|| score_batch(&items, 500_000.0))
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

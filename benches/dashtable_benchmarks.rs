use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dashtable::*;

const GENRES: [&str; 8] = ["Action", "Comedy", "Drama", "Horror", "Romance", "Sci-Fi", "Crime", "Western"];

fn ratings_csv(size: usize) -> String {
    let mut csv = String::from("user_id,movie_id,title,genres,rating,year,age\n");
    for i in 0..size {
        let first = GENRES[i % GENRES.len()];
        let second = GENRES[(i / 3) % GENRES.len()];
        csv.push_str(&format!(
            "{},{},movie_{},{}|{},{},{},{}\n",
            i % 500,
            i % 200,
            i % 200,
            first,
            second,
            1 + (i * 7) % 5,
            1950 + (i % 60),
            18 + (i % 50)
        ));
    }
    csv
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_ratings");

    for size in [1000, 10000].iter() {
        let csv = ratings_csv(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &csv, |b, csv| {
            b.iter(|| load_str("ratings", black_box(csv), &LoadOptions::movie_ratings()).unwrap());
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_ratings");

    for size in [1000, 10000, 100000].iter() {
        let dataset = load_str("ratings", &ratings_csv(*size), &LoadOptions::movie_ratings()).unwrap();
        let specs = [
            FilterSpec::range("year", 1970.0, 1990.0),
            FilterSpec::has_tag("genres", "Drama"),
        ];
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| dataset.filter(black_box(&specs)).unwrap());
        });
    }
    group.finish();
}

fn bench_genre_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("genre_statistics");
    let metrics = [
        MetricDef::mean("mean_rating", "rating"),
        MetricDef::count("n", "rating"),
        MetricDef::std("std", "rating"),
        MetricDef::ci_lower("ci_lower", "mean_rating", "std", "n"),
        MetricDef::ci_upper("ci_upper", "mean_rating", "std", "n"),
    ];

    for size in [1000, 10000, 100000].iter() {
        let dataset = load_str("ratings", &ratings_csv(*size), &LoadOptions::movie_ratings()).unwrap();
        let exploded = dataset.exploded().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| aggregate(exploded, &GroupKey::new(["genres"]), black_box(&metrics)).unwrap());
        });
    }
    group.finish();
}

fn bench_top_movies(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_movies");

    for size in [1000, 10000, 100000].iter() {
        let dataset = load_str("ratings", &ratings_csv(*size), &LoadOptions::movie_ratings()).unwrap();
        let stats = aggregate(
            dataset.base(),
            &GroupKey::new(["title"]),
            &[MetricDef::count("n", "rating"), MetricDef::mean("mean_rating", "rating")],
        )
        .unwrap();
        let keys = [SortKey::descending("mean_rating"), SortKey::descending("n")];
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let shown = filter_groups(&stats, &[FilterSpec::min_count(black_box(5))]).unwrap();
                rank(&shown, &keys, Some(5), None).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_load,
    bench_filter,
    bench_genre_statistics,
    bench_top_movies,
);

criterion_main!(benches);

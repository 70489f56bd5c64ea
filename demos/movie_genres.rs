/// Movie Genres Example
///
/// This example demonstrates:
/// - Exploding the multi-value `genres` column
/// - Genre shares with small genres folded into "Other"
/// - Mean rating per genre with confidence intervals and a minimum count
/// - Smoothing the release-year trend

use dashtable::report::{genre_breakdown, genre_satisfaction, release_year_trend, ReportConfig};
use dashtable::{load_str, LoadOptions};

const RATINGS: &str = "user_id,movie_id,title,genres,rating,year\n\
    1,1,Toy Story,Animation|Children's|Comedy,5,1995\n\
    2,1,Toy Story,Animation|Children's|Comedy,4,1995\n\
    3,2,Heat,Action|Crime|Thriller,4,1995\n\
    1,2,Heat,Action|Crime|Thriller,3,1995\n\
    2,3,Casino,Drama|Thriller,4,1995\n\
    3,4,Speed,Action|Romance|Thriller,3,1994\n\
    1,5,Alien,Action|Horror|Sci-Fi|Thriller,5,1979\n\
    2,5,Alien,Action|Horror|Sci-Fi|Thriller,4,1979\n\
    3,6,Fargo,Crime|Drama|Thriller,5,1996\n\
    1,7,Big,Comedy|Fantasy,3,1988\n";

fn main() -> dashtable::Result<()> {
    println!("=== dashtable Movie Genres Example ===\n");

    let dataset = load_str("ratings", RATINGS, &LoadOptions::movie_ratings())?;
    let exploded = dataset.require_exploded("movie_genres")?;
    println!("Loaded {} ratings ({} genre rows)\n", dataset.base().len(), exploded.len());

    let config = ReportConfig {
        min_count: 2,
        other_threshold: 5.0,
        ..ReportConfig::default()
    };

    // 1. Genre breakdown
    println!("1. Ratings per genre (under {}% grouped as Other):", config.other_threshold);
    let breakdown = genre_breakdown(exploded, &config)?;
    for row in 0..breakdown.len() {
        println!(
            "   {:<10} {:>3}  {:>5.1}%",
            breakdown.get_value(row, "genres")?,
            breakdown.get_value(row, "count")?,
            breakdown.get_value(row, "pct")?.as_f64().unwrap_or(0.0)
        );
    }

    // 2. Satisfaction with confidence intervals
    println!("\n2. Mean rating by genre (n >= {}):", config.min_count);
    let satisfaction = genre_satisfaction(exploded, &config)?;
    for row in 0..satisfaction.len() {
        let interval = match (
            satisfaction.get_value(row, "ci_lower")?.as_f64(),
            satisfaction.get_value(row, "ci_upper")?.as_f64(),
        ) {
            (Some(lo), Some(hi)) => format!("[{:.2}, {:.2}]", lo, hi),
            _ => "n/a".to_string(),
        };
        println!(
            "   {:<10} {:.2} {}",
            satisfaction.get_value(row, "genres")?,
            satisfaction.get_value(row, "mean_rating")?.as_f64().unwrap_or(0.0),
            interval
        );
    }

    // 3. Release-year trend
    println!("\n3. Mean rating by release year (smoothed over {} years):", config.smoothing_window);
    let trend = release_year_trend(dataset.base(), &config)?;
    println!("{}", trend.table().to_csv());

    println!("=== Example Complete ===");
    Ok(())
}

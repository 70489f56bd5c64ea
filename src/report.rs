//! Dashboard recipes built from the four pipeline stages, plus write-out.
//!
//! Each recipe is a plain composition of `filter`, `aggregate` and `rank`
//! that yields the summary rows one dashboard panel displays. A `Report`
//! collects the panels of one dataset together with its headline KPIs.

use crate::aggregate::{aggregate, pearson, summarize, AggregateTable, Edges, GroupKey, MetricDef, Window};
use crate::column::ColumnValue;
use crate::error::{Error, Result};
use crate::filter::{filter, filter_groups, FilterSpec};
use crate::loader::{bin_numeric, Dataset};
use crate::rank::{common_labels, rank, OtherBucket, SortKey};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Report parameters. Every field has a default so a partial JSON object
/// (or none at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Minimum ratings for a group to be shown.
    pub min_count: usize,
    /// Stricter threshold for the second top-movies list.
    pub strict_min_count: usize,
    /// Genres below this share (percent) are folded into "Other".
    pub other_threshold: f64,
    /// Release-year smoothing window; 0 disables smoothing.
    pub smoothing_window: usize,
    /// Smooth the series edges over the partial window instead of leaving
    /// them empty.
    pub partial_smoothing: bool,
    pub top_n: usize,
    pub age_bin_width: u32,
    /// Genres shown in the age breakdown; empty shows all.
    pub genres: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            min_count: 50,
            strict_min_count: 150,
            other_threshold: 2.0,
            smoothing_window: 3,
            partial_smoothing: false,
            top_n: 5,
            age_bin_width: 10,
            genres: Vec::new(),
        }
    }
}

/// The panels and headline numbers of one dashboard.
#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    pub tables: Vec<(String, AggregateTable)>,
    pub kpis: serde_json::Value,
}

impl Report {
    pub fn table(&self, name: &str) -> Option<&AggregateTable> {
        self.tables.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

// ============================================================================
// Superstore
// ============================================================================

const SALES: &str = "Sales";
const ORDER_ID: &str = "Order ID";
const CUSTOMER_ID: &str = "Customer ID";

/// Sales, transaction and order counts shared by every superstore panel.
fn sales_metrics() -> Vec<MetricDef> {
    vec![
        MetricDef::sum("Total_Sales", SALES),
        MetricDef::mean("Avg_Sales", SALES),
        MetricDef::count("Transaction_Count", SALES),
        MetricDef::nunique("Order_Count", ORDER_ID),
    ]
}

pub fn geographic(orders: &Table) -> Result<AggregateTable> {
    let mut metrics = sales_metrics();
    metrics.push(MetricDef::ratio("Sales_Per_Order", "Total_Sales", "Order_Count"));
    aggregate(orders, &GroupKey::new(["State", "Region"]), &metrics)
}

/// Yearly totals with year-over-year growth of total sales.
pub fn yearly(orders: &Table) -> Result<AggregateTable> {
    let mut metrics = sales_metrics();
    metrics.push(MetricDef::growth("Sales_Growth", "Total_Sales"));
    aggregate(orders, &GroupKey::new(["Order Year"]), &metrics)
}

pub fn monthly(orders: &Table) -> Result<AggregateTable> {
    aggregate(
        orders,
        &GroupKey::new(["Order Year", "Order Month"]),
        &[
            MetricDef::sum("Total_Sales", SALES),
            MetricDef::nunique("Order_Count", ORDER_ID),
        ],
    )
}

pub fn category(orders: &Table) -> Result<AggregateTable> {
    let mut metrics = sales_metrics();
    metrics.push(MetricDef::percent_of_total("Market_Share", "Total_Sales"));
    aggregate(orders, &GroupKey::new(["Category"]), &metrics)
}

pub fn subcategory(orders: &Table) -> Result<AggregateTable> {
    aggregate(orders, &GroupKey::new(["Category", "Sub-Category"]), &sales_metrics())
}

pub fn segment(orders: &Table) -> Result<AggregateTable> {
    let mut metrics = sales_metrics();
    metrics.extend([
        MetricDef::nunique("Customer_Count", CUSTOMER_ID),
        MetricDef::ratio("Sales_Per_Customer", "Total_Sales", "Customer_Count"),
        MetricDef::ratio("Orders_Per_Customer", "Order_Count", "Customer_Count"),
    ]);
    aggregate(orders, &GroupKey::new(["Segment"]), &metrics)
}

pub fn ship_mode(orders: &Table) -> Result<AggregateTable> {
    let mut metrics = sales_metrics();
    metrics.push(MetricDef::percent_of_total("Order_Percentage", "Order_Count"));
    aggregate(orders, &GroupKey::new(["Ship Mode"]), &metrics)
}

/// Largest-sales group of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopGroup {
    pub label: String,
    pub sales: f64,
}

/// Headline numbers of the superstore dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessKpis {
    pub total_sales: f64,
    pub total_orders: i64,
    pub total_customers: i64,
    pub total_transactions: i64,
    pub avg_order_value: Option<f64>,
    pub avg_sales_per_customer: Option<f64>,
    pub avg_orders_per_customer: Option<f64>,
    /// First year to last year, in percent. Needs at least two years.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_growth_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_region: Option<TopGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_category: Option<TopGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_segment: Option<TopGroup>,
}

fn top_group(orders: &Table, column: &str) -> Result<Option<TopGroup>> {
    if !orders.schema().contains(column) {
        return Ok(None);
    }
    let groups = aggregate(orders, &GroupKey::new([column]), &[MetricDef::sum("sales", SALES)])?;
    let top = rank(&groups, &[SortKey::descending("sales")], Some(1), None)?;
    if top.is_empty() {
        return Ok(None);
    }
    Ok(Some(TopGroup {
        label: top.get_value(0, column)?.to_string(),
        sales: top.get_value(0, "sales")?.as_f64().unwrap_or(0.0),
    }))
}

pub fn business_kpis(orders: &Table) -> Result<BusinessKpis> {
    let totals = summarize(
        orders,
        &[
            MetricDef::sum("sales", SALES),
            MetricDef::nunique("orders", ORDER_ID),
            MetricDef::nunique("customers", CUSTOMER_ID),
            MetricDef::size("transactions"),
            MetricDef::ratio("avg_order_value", "sales", "orders"),
            MetricDef::ratio("avg_sales_per_customer", "sales", "customers"),
            MetricDef::ratio("avg_orders_per_customer", "orders", "customers"),
        ],
    )?;
    let number = |column: &str| -> Result<Option<f64>> { Ok(totals.get_value(0, column)?.as_f64()) };
    let integer = |column: &str| -> Result<i64> { Ok(totals.get_value(0, column)?.as_i64().unwrap_or(0)) };

    let total_growth_rate = if orders.schema().contains("Order Year") {
        let years = aggregate(orders, &GroupKey::new(["Order Year"]), &[MetricDef::sum("sales", SALES)])?;
        let sales = years.series("sales")?;
        match (sales.first().copied().flatten(), sales.last().copied().flatten()) {
            (Some(first), Some(last)) if sales.len() > 1 && first != 0.0 => Some((last - first) / first * 100.0),
            _ => None,
        }
    } else {
        None
    };

    Ok(BusinessKpis {
        total_sales: number("sales")?.unwrap_or(0.0),
        total_orders: integer("orders")?,
        total_customers: integer("customers")?,
        total_transactions: integer("transactions")?,
        avg_order_value: number("avg_order_value")?,
        avg_sales_per_customer: number("avg_sales_per_customer")?,
        avg_orders_per_customer: number("avg_orders_per_customer")?,
        total_growth_rate,
        top_region: top_group(orders, "Region")?,
        top_category: top_group(orders, "Category")?,
        top_segment: top_group(orders, "Segment")?,
    })
}

/// One dashboard panel: its name, the columns it cannot run without, and
/// how to build it.
type Panel<'a> = (&'static str, &'static [&'static str], Box<dyn Fn() -> Result<AggregateTable> + 'a>);

/// Builds every panel whose columns are present. A panel that is missing a
/// column, or fails with a view-local error, is skipped with a warning so
/// its siblings still render.
fn build_panels<'a>(
    dataset: &Dataset,
    panels: impl IntoIterator<Item = Panel<'a>>,
) -> Result<Vec<(String, AggregateTable)>> {
    let mut tables = Vec::new();
    for (name, needs, build) in panels {
        if let Some(missing) = needs.iter().find(|c| !dataset.capabilities().has(c)) {
            log::warn!("skipping {}: column '{}' not available", name, missing);
            continue;
        }
        match build() {
            Ok(table) => tables.push((name.to_string(), table)),
            Err(e) if e.is_view_local() => log::warn!("skipping {}: {}", name, e),
            Err(e) => return Err(e),
        }
    }
    Ok(tables)
}

/// Every superstore panel over the (already filtered) dataset. Panels whose
/// columns are absent are skipped with a warning.
pub fn superstore_report(dataset: &Dataset) -> Result<Report> {
    let orders = dataset.base();
    let panels: [Panel<'_>; 7] = [
        ("geographic", &["State", "Region", SALES], Box::new(|| geographic(orders))),
        ("yearly", &["Order Year", SALES], Box::new(|| yearly(orders))),
        ("monthly", &["Order Year", "Order Month", SALES], Box::new(|| monthly(orders))),
        ("category", &["Category", SALES], Box::new(|| category(orders))),
        ("subcategory", &["Category", "Sub-Category", SALES], Box::new(|| subcategory(orders))),
        ("segment", &["Segment", CUSTOMER_ID, SALES], Box::new(|| segment(orders))),
        ("ship_mode", &["Ship Mode", SALES], Box::new(|| ship_mode(orders))),
    ];
    let tables = build_panels(dataset, panels)?;
    let kpis = serde_json::to_value(business_kpis(orders)?)?;
    log::info!("superstore report: {} panels over {} orders", tables.len(), orders.len());

    Ok(Report {
        name: "superstore".to_string(),
        tables,
        kpis,
    })
}

// ============================================================================
// Movie ratings
// ============================================================================

const RATING: &str = "rating";
const GENRES: &str = "genres";

/// Ratings per genre with each genre's share; genres under the configured
/// share are folded into one "Other" row at the end.
pub fn genre_breakdown(exploded: &Table, config: &ReportConfig) -> Result<AggregateTable> {
    let counts = aggregate(
        exploded,
        &GroupKey::new([GENRES]).keep_nulls(),
        &[MetricDef::size("count"), MetricDef::percent_of_total("pct", "count")],
    )?;
    let bucket = OtherBucket::new(GENRES, "pct", config.other_threshold).summing(["count"]);
    rank(&counts, &[SortKey::descending("count")], None, Some(&bucket))
}

/// Mean rating per genre with a 95% confidence interval, for genres with
/// at least `min_count` ratings, best first.
pub fn genre_satisfaction(exploded: &Table, config: &ReportConfig) -> Result<AggregateTable> {
    let stats = aggregate(
        exploded,
        &GroupKey::new([GENRES]),
        &[
            MetricDef::mean("mean_rating", RATING),
            MetricDef::count("n", RATING),
            MetricDef::std("std", RATING),
            MetricDef::ci_lower("ci_lower", "mean_rating", "std", "n"),
            MetricDef::ci_upper("ci_upper", "mean_rating", "std", "n"),
        ],
    )?;
    let shown = filter_groups(&stats, &[FilterSpec::min_count(config.min_count)])?;
    rank(&shown, &[SortKey::descending("mean_rating")], None, None)
}

/// Mean rating per release year, optionally smoothed.
pub fn release_year_trend(ratings: &Table, config: &ReportConfig) -> Result<AggregateTable> {
    let mut metrics = vec![MetricDef::mean("mean_rating", RATING), MetricDef::count("n", RATING)];
    if config.smoothing_window > 0 {
        let edges = if config.partial_smoothing { Edges::Partial } else { Edges::RequireFull };
        let window = Window::centered(config.smoothing_window).with_edges(edges);
        metrics.push(MetricDef::rolling_mean("mean_rating_smoothed", "mean_rating", window));
    }
    aggregate(ratings, &GroupKey::new(["year"]), &metrics)
}

/// Columns identifying one movie: id and title together when both exist,
/// so two films sharing a title stay apart.
fn movie_key(ratings: &Table) -> Vec<&'static str> {
    ["movie_id", "title"]
        .into_iter()
        .filter(|c| ratings.schema().contains(c))
        .collect()
}

/// Highest-rated movies among those with at least `min_count` ratings,
/// ties broken by the number of ratings.
pub fn top_movies(ratings: &Table, min_count: usize, k: usize) -> Result<AggregateTable> {
    let key = movie_key(ratings);
    if key.is_empty() {
        return Err(Error::schema_mismatch("movie_id", "top_movies"));
    }
    let stats = aggregate(
        ratings,
        &GroupKey::new(key),
        &[MetricDef::count("n", RATING), MetricDef::mean("mean_rating", RATING)],
    )?;
    let shown = filter_groups(&stats, &[FilterSpec::min_count(min_count)])?;
    rank(
        &shown,
        &[SortKey::descending("mean_rating"), SortKey::descending("n")],
        Some(k),
        None,
    )
}

/// Mean rating per genre and age bin, for the configured genres.
pub fn genre_by_age(exploded: &Table, config: &ReportConfig) -> Result<AggregateTable> {
    let binned = bin_numeric(exploded, "age", config.age_bin_width, "age_bin")?;
    let selected = filter(&binned, &[FilterSpec::one_of(GENRES, config.genres.iter().map(String::as_str))])?;
    let stats = aggregate(
        &selected,
        &GroupKey::new([GENRES, "age_bin_start", "age_bin"]),
        &[MetricDef::mean("mean_rating", RATING), MetricDef::count("n", RATING)],
    )?;
    filter_groups(&stats, &[FilterSpec::min_count(config.min_count)])
}

/// Correlation between how often a genre is rated and how well.
pub fn volume_rating_correlation(exploded: &Table) -> Result<Option<f64>> {
    let stats = aggregate(
        exploded,
        &GroupKey::new([GENRES]),
        &[MetricDef::count("n", RATING), MetricDef::mean("mean_rating", RATING)],
    )?;
    pearson(&stats, "n", "mean_rating")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingsKpis {
    pub total_ratings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<i64>,
    pub total_movies: i64,
    pub mean_rating: Option<f64>,
    pub genre_count: i64,
    pub volume_rating_correlation: Option<f64>,
    /// Titles in both top lists (default and strict minimum counts).
    pub common_top_titles: Vec<String>,
}

fn nunique(table: &Table, column: &str) -> Result<i64> {
    let totals = summarize(table, &[MetricDef::nunique("n", column)])?;
    Ok(totals.get_value(0, "n")?.as_i64().unwrap_or(0))
}

/// Titles of the movies present in both top lists, in `relaxed` order.
/// Movies are matched on `movie_id` when the table has it.
fn common_titles(relaxed: &AggregateTable, strict: &AggregateTable) -> Result<Vec<String>> {
    let id = if relaxed.table().schema().contains("movie_id") { "movie_id" } else { "title" };
    let label = if relaxed.table().schema().contains("title") { "title" } else { id };
    let shared = common_labels(relaxed, strict, id)?;

    let mut titles = Vec::with_capacity(shared.len());
    for row in 0..relaxed.len() {
        if !relaxed.is_synthetic(row) && shared.contains(relaxed.get_value(row, id)?) {
            titles.push(relaxed.get_value(row, label)?.to_string());
        }
    }
    Ok(titles)
}

pub fn ratings_kpis(dataset: &Dataset, config: &ReportConfig) -> Result<RatingsKpis> {
    let ratings = dataset.base();
    let exploded = dataset.require_exploded("ratings_kpis")?;
    let movie_id = if ratings.schema().contains("movie_id") { "movie_id" } else { "title" };

    let totals = summarize(ratings, &[MetricDef::count("n", RATING), MetricDef::mean("mean", RATING)])?;
    let relaxed = top_movies(ratings, config.min_count, config.top_n)?;
    let strict = top_movies(ratings, config.strict_min_count, config.top_n)?;

    Ok(RatingsKpis {
        total_ratings: totals.get_value(0, "n")?.as_i64().unwrap_or(0),
        total_users: if dataset.capabilities().has("user_id") {
            Some(nunique(ratings, "user_id")?)
        } else {
            None
        },
        total_movies: nunique(ratings, movie_id)?,
        mean_rating: totals.get_value(0, "mean")?.as_f64(),
        genre_count: nunique(exploded, GENRES)?,
        volume_rating_correlation: volume_rating_correlation(exploded)?,
        common_top_titles: common_titles(&relaxed, &strict)?,
    })
}

/// Every ratings panel over the (already filtered) dataset. Panels whose
/// optional columns are absent are skipped with a warning.
pub fn ratings_report(dataset: &Dataset, config: &ReportConfig) -> Result<Report> {
    let ratings = dataset.base();
    let exploded = dataset.require_exploded("ratings_report")?;

    let mut tables = vec![
        ("genre_breakdown".to_string(), genre_breakdown(exploded, config)?),
        ("genre_satisfaction".to_string(), genre_satisfaction(exploded, config)?),
    ];
    let panels: [Panel<'_>; 4] = [
        ("release_year_trend", &["year"], Box::new(|| release_year_trend(ratings, config))),
        ("top_movies", &[RATING], Box::new(|| top_movies(ratings, config.min_count, config.top_n))),
        (
            "top_movies_strict",
            &[RATING],
            Box::new(|| top_movies(ratings, config.strict_min_count, config.top_n)),
        ),
        ("genre_by_age", &["age"], Box::new(|| genre_by_age(exploded, config))),
    ];
    tables.extend(build_panels(dataset, panels)?);

    let kpis = serde_json::to_value(ratings_kpis(dataset, config)?)?;
    log::info!("ratings report: {} panels over {} ratings", tables.len(), ratings.len());

    Ok(Report {
        name: "ratings".to_string(),
        tables,
        kpis,
    })
}

// ============================================================================
// Write-out
// ============================================================================

/// Writes `<panel>_data.csv` for every panel and `kpis.json` into `dir`,
/// creating it when needed. Returns the written paths.
pub fn write_report(dir: impl AsRef<Path>, report: &Report) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(report.tables.len() + 1);
    for (name, table) in &report.tables {
        let path = dir.join(format!("{}_data.csv", name));
        std::fs::write(&path, table.table().to_csv())?;
        log::debug!("wrote {} ({} rows)", path.display(), table.len());
        written.push(path);
    }

    let path = dir.join("kpis.json");
    std::fs::write(&path, serde_json::to_string_pretty(&report.kpis)?)?;
    written.push(path);

    log::info!("{} report written to {}", report.name, dir.display());
    Ok(written)
}

/// Reads a `ReportConfig` from a JSON file.
pub fn read_config(path: impl AsRef<Path>) -> Result<ReportConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::unavailable(path, e.to_string()))?;
    Ok(serde_json::from_str(&text)?)
}

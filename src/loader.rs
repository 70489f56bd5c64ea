//! Loading and normalizing source CSV files.
//!
//! `load` reads a CSV into a `Dataset`: the normalized base table (date
//! columns parsed, year/decade/period columns derived), an exploded copy
//! with one row per tag when the dataset has a multi-value tag column, and
//! the `Capabilities` record that tells downstream stages which optional
//! columns exist.
//!
//! # Examples
//!
//! ```
//! use dashtable::{load_str, LoadOptions};
//!
//! let csv = "user_id,title,genres,rating,year\n\
//!            1,Heat,Action|Crime,4,1995\n\
//!            2,Alien,Horror|Sci-Fi,5,1979\n";
//! let dataset = load_str("ratings", csv, &LoadOptions::movie_ratings()).unwrap();
//!
//! assert_eq!(dataset.base().len(), 2);
//! assert_eq!(dataset.exploded().unwrap().len(), 4);
//! assert!(dataset.capabilities().has("decade"));
//! ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Error, Result};
use crate::filter::{self, FilterSpec};
use crate::table::{days_from_epoch_seconds, parse_date, ymd_from_days, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Column added to exploded tables holding the index of the base row each
/// tag row came from.
pub const SOURCE_ROW: &str = "source_row";

/// How a source file is normalized after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Columns parsed into dates. Unparseable cells become null.
    pub date_columns: Vec<String>,
    /// Columns coerced to numbers. A stray non-numeric cell becomes null
    /// instead of turning the whole column into text.
    pub numeric_columns: Vec<String>,
    /// Date column that `year` is derived from when the file has no `year`.
    pub year_source: Option<String>,
    /// When set, `<prefix> Year`, `<prefix> Month` and `<prefix> Quarter`
    /// are derived from `year_source`.
    pub period_prefix: Option<String>,
    /// Timestamp column that `rating_year` is derived from.
    pub rating_timestamp: Option<String>,
    /// Multi-value categorical column to explode.
    pub tag_column: Option<String>,
    pub tag_delimiter: char,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            date_columns: Vec::new(),
            numeric_columns: Vec::new(),
            year_source: None,
            period_prefix: None,
            rating_timestamp: None,
            tag_column: None,
            tag_delimiter: '|',
        }
    }
}

impl LoadOptions {
    /// Movie ratings: pipe-delimited `genres`, release `year`, optional
    /// rating `timestamp`.
    pub fn movie_ratings() -> Self {
        LoadOptions {
            date_columns: vec!["timestamp".to_string()],
            numeric_columns: ["rating", "year", "age"].map(String::from).to_vec(),
            rating_timestamp: Some("timestamp".to_string()),
            tag_column: Some("genres".to_string()),
            ..LoadOptions::default()
        }
    }

    /// Superstore orders: order/ship dates with order-period columns.
    pub fn superstore() -> Self {
        LoadOptions {
            date_columns: vec!["Order Date".to_string(), "Ship Date".to_string()],
            numeric_columns: ["Sales", "Quantity", "Discount", "Profit"].map(String::from).to_vec(),
            year_source: Some("Order Date".to_string()),
            period_prefix: Some("Order".to_string()),
            ..LoadOptions::default()
        }
    }
}

/// Columns present after normalization, and which of them were derived.
///
/// Stages consult this once instead of probing for optional columns such as
/// `age` or `rating_year` at every call site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    columns: BTreeSet<String>,
    derived: BTreeSet<String>,
    tag_column: Option<String>,
}

impl Capabilities {
    fn from_table(table: &Table, derived: BTreeSet<String>, tag_column: Option<String>) -> Self {
        Capabilities {
            columns: table.schema().get_column_names().into_iter().map(str::to_string).collect(),
            derived,
            tag_column,
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn is_derived(&self, column: &str) -> bool {
        self.derived.contains(column)
    }

    pub fn derived(&self) -> impl Iterator<Item = &str> {
        self.derived.iter().map(String::as_str)
    }

    /// The exploded tag column, when the dataset has one.
    pub fn tag_column(&self) -> Option<&str> {
        self.tag_column.as_deref()
    }

    pub fn require(&self, column: &str, operation: &str) -> Result<()> {
        if self.has(column) {
            Ok(())
        } else {
            Err(Error::schema_mismatch(column, operation))
        }
    }
}

/// A loaded, normalized source.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    options: LoadOptions,
    base: Table,
    exploded: Option<Table>,
    capabilities: Capabilities,
}

impl Dataset {
    /// Normalizes a parsed table according to `options`.
    pub fn from_table(table: Table, options: &LoadOptions) -> Result<Self> {
        let (base, derived) = normalize(table, options)?;
        let tag_column = options
            .tag_column
            .clone()
            .filter(|tag| base.schema().contains(tag));
        let exploded = match &tag_column {
            Some(tag) => Some(explode(&base, tag, options.tag_delimiter)?),
            None => None,
        };
        let capabilities = Capabilities::from_table(&base, derived, tag_column);

        Ok(Dataset {
            source: None,
            options: options.clone(),
            base,
            exploded,
            capabilities,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The un-exploded table: one row per observation. Use this for counts
    /// that must not double-count a multi-tag row.
    pub fn base(&self) -> &Table {
        &self.base
    }

    /// One row per tag, when the dataset has a tag column.
    pub fn exploded(&self) -> Option<&Table> {
        self.exploded.as_ref()
    }

    /// The exploded table, or `SchemaMismatch` naming the configured tag
    /// column when there is none.
    pub fn require_exploded(&self, operation: &str) -> Result<&Table> {
        self.exploded.as_ref().ok_or_else(|| {
            let tag = self.options.tag_column.as_deref().unwrap_or("tag column");
            Error::schema_mismatch(tag, operation)
        })
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Filters the base table and rebuilds the exploded table from the
    /// surviving rows, so a row removed from the base can never reappear
    /// among the tag rows.
    pub fn filter(&self, specs: &[FilterSpec]) -> Result<Dataset> {
        let base = filter::filter(&self.base, specs)?;
        let exploded = match self.capabilities.tag_column() {
            Some(tag) => Some(explode(&base, tag, self.options.tag_delimiter)?),
            None => None,
        };
        log::debug!(
            "dataset filter kept {} of {} rows ({} tag rows)",
            base.len(),
            self.base.len(),
            exploded.as_ref().map_or(0, Table::len)
        );

        Ok(Dataset {
            source: self.source.clone(),
            options: self.options.clone(),
            base,
            exploded,
            capabilities: self.capabilities.clone(),
        })
    }
}

/// Reads and normalizes a CSV file.
///
/// A missing, unreadable or empty file fails with `Error::DataUnavailable`;
/// malformed cells only null out the affected cell.
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::unavailable(path, e.to_string()))?;
    if text.trim().is_empty() {
        return Err(Error::unavailable(path, "file is empty"));
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());

    let mut dataset = load_str(&name, &text, options).map_err(|e| match e {
        Error::DataUnavailable { reason, .. } => Error::unavailable(path, reason),
        other => other,
    })?;
    dataset.source = Some(path.to_path_buf());

    log::info!(
        "loaded {} rows x {} columns from {}",
        dataset.base.len(),
        dataset.base.schema().len(),
        path.display()
    );
    Ok(dataset)
}

/// Parses and normalizes CSV text already in memory.
pub fn load_str(name: &str, csv: &str, options: &LoadOptions) -> Result<Dataset> {
    let table = Table::from_csv(name, csv)?;
    Dataset::from_table(table, options)
}

fn normalize(table: Table, options: &LoadOptions) -> Result<(Table, BTreeSet<String>)> {
    let mut table = table;
    let mut derived = BTreeSet::new();

    for name in &options.date_columns {
        if let Some(column) = table.column(name) {
            if column.column_type() != ColumnType::Date {
                let parsed = parse_date_column(column)?;
                table = table.replace_column(parsed)?;
            }
        }
    }

    for name in &options.numeric_columns {
        if let Some(column) = table.column(name) {
            if !matches!(column.column_type(), ColumnType::Int64 | ColumnType::Float64) {
                let parsed = parse_numeric_column(column)?;
                table = table.replace_column(parsed)?;
            }
        }
    }

    let mut additions = Vec::new();
    if let Some(source) = options.year_source.as_deref() {
        if let Some(dates) = table.column(source).filter(|c| c.column_type() == ColumnType::Date) {
            if let Some(prefix) = options.period_prefix.as_deref() {
                additions.push(date_part(dates, &format!("{} Year", prefix), DatePart::Year)?);
                additions.push(date_part(dates, &format!("{} Month", prefix), DatePart::Month)?);
                additions.push(date_part(dates, &format!("{} Quarter", prefix), DatePart::Quarter)?);
            }
            additions.push(date_part(dates, "year", DatePart::Year)?);
        }
    }
    for column in additions {
        if !table.schema().contains(column.name()) {
            derived.insert(column.name().to_string());
            table = table.with_column(column)?;
        }
    }

    if let Some(source) = options.rating_timestamp.as_deref() {
        let rating_year = match table.column(source) {
            Some(c) if c.column_type() == ColumnType::Date && !table.schema().contains("rating_year") => {
                Some(date_part(c, "rating_year", DatePart::Year)?)
            }
            _ => None,
        };
        if let Some(column) = rating_year {
            derived.insert("rating_year".to_string());
            table = table.with_column(column)?;
        }
    }

    let decade = match table.column("year") {
        Some(years) if !table.schema().contains("decade") => {
            let values = years
                .values()
                .iter()
                .map(|v| match v.as_f64() {
                    Some(year) => ColumnValue::Int64(((year / 10.0).floor() * 10.0) as i64),
                    None => ColumnValue::Null,
                })
                .collect();
            Some(Column::from_values("decade", ColumnType::Int64, values)?)
        }
        _ => None,
    };
    if let Some(column) = decade {
        derived.insert("decade".to_string());
        table = table.with_column(column)?;
    }

    if !derived.is_empty() {
        log::debug!("{}: derived columns {:?}", table.name(), derived);
    }
    Ok((table, derived))
}

fn parse_date_column(column: &Column) -> Result<Column> {
    let mut failures = 0usize;
    let values: Vec<ColumnValue> = column
        .values()
        .iter()
        .map(|v| {
            let parsed = match v {
                ColumnValue::String(s) => parse_date(s)
                    .or_else(|| s.trim().parse::<i64>().ok().and_then(days_from_epoch_seconds)),
                ColumnValue::Int64(secs) => days_from_epoch_seconds(*secs),
                ColumnValue::Date(d) => Some(*d),
                _ => None,
            };
            if parsed.is_none() && !v.is_null() {
                failures += 1;
            }
            parsed.map(ColumnValue::Date).into()
        })
        .collect();

    if failures > 0 {
        log::warn!(
            "{} cell(s) in '{}' are not dates and were set to null",
            failures,
            column.name()
        );
    }
    Column::from_values(column.name(), ColumnType::Date, values)
}

fn parse_numeric_column(column: &Column) -> Result<Column> {
    let mut failures = 0usize;
    let values: Vec<ColumnValue> = column
        .values()
        .iter()
        .map(|v| {
            let parsed = match v {
                ColumnValue::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .map(ColumnValue::Int64)
                        .or_else(|_| s.parse::<f64>().map(|f| ColumnValue::from_metric(Some(f))))
                        .unwrap_or(ColumnValue::Null)
                }
                ColumnValue::Int64(_) | ColumnValue::Float64(_) => v.clone(),
                _ => ColumnValue::Null,
            };
            if parsed.is_null() && !v.is_null() {
                failures += 1;
            }
            parsed
        })
        .collect();

    if failures > 0 {
        log::warn!(
            "{} cell(s) in '{}' are not numbers and were set to null",
            failures,
            column.name()
        );
    }
    let column_type = if values.iter().any(|v| matches!(v, ColumnValue::Float64(_))) {
        ColumnType::Float64
    } else {
        ColumnType::Int64
    };
    Column::from_values(column.name(), column_type, values)
}

#[derive(Debug, Clone, Copy)]
enum DatePart {
    Year,
    Month,
    Quarter,
}

fn date_part(dates: &Column, name: &str, part: DatePart) -> Result<Column> {
    let values = dates
        .values()
        .iter()
        .map(|v| match v.as_date() {
            Some(days) => {
                let (year, month, _) = ymd_from_days(days);
                ColumnValue::Int64(match part {
                    DatePart::Year => year as i64,
                    DatePart::Month => month as i64,
                    DatePart::Quarter => ((month - 1) / 3 + 1) as i64,
                })
            }
            None => ColumnValue::Null,
        })
        .collect();
    Column::from_values(name, ColumnType::Int64, values)
}

/// Expands a delimited multi-value column into one row per value.
///
/// Values are trimmed and empty values dropped, so a row whose field is null
/// or blank contributes no rows. Every other column is copied unchanged and a
/// `source_row` column records the originating row index.
pub fn explode(table: &Table, column: &str, delimiter: char) -> Result<Table> {
    let tags = table.require_column(column, "explode")?;

    let mut indices = Vec::with_capacity(table.len());
    let mut values = Vec::with_capacity(table.len());
    for (row, value) in tags.values().iter().enumerate() {
        if value.is_null() {
            continue;
        }
        let text = value.to_string();
        for tag in text.split(delimiter).map(str::trim).filter(|t| !t.is_empty()) {
            indices.push(row);
            values.push(ColumnValue::String(tag.to_string()));
        }
    }

    let source_rows = table
        .column(SOURCE_ROW)
        .map(|existing| existing.take(&indices).values().to_vec())
        .unwrap_or_else(|| indices.iter().map(|&i| ColumnValue::Int64(i as i64)).collect());

    let mut exploded = table
        .take(&indices)
        .replace_column(Column::from_values(column, ColumnType::String, values)?)?;
    let source = Column::from_values(SOURCE_ROW, ColumnType::Int64, source_rows)?;
    exploded = if exploded.schema().contains(SOURCE_ROW) {
        exploded.replace_column(source)?
    } else {
        exploded.with_column(source)?
    };
    Ok(exploded)
}

/// Adds a string bin-label column over a numeric column.
///
/// Bins are `width` wide, left-closed, and start at the column minimum:
/// with minimum 18 and width 10 the labels are `"18-27"`, `"28-37"`, ...
/// The bin's lower edge goes into `<output>_start` so bins can be ordered
/// numerically. Null or non-numeric cells get a null bin.
pub fn bin_numeric(table: &Table, column: &str, width: u32, output: &str) -> Result<Table> {
    if width == 0 {
        return Err(Error::InvalidArgument("bin width must be positive".to_string()));
    }
    let source = table.require_column(column, "bin_numeric")?;
    let min = match table.min(column)? {
        Some(m) => m.floor() as i64,
        None => {
            let labels = vec![ColumnValue::Null; table.len()];
            return table
                .with_column(Column::from_values(output, ColumnType::String, labels.clone())?)?
                .with_column(Column::from_values(format!("{}_start", output), ColumnType::Int64, labels)?);
        }
    };
    let width = width as i64;

    let mut labels = Vec::with_capacity(table.len());
    let mut starts = Vec::with_capacity(table.len());
    for value in source.values() {
        match value.as_f64() {
            Some(v) => {
                let start = min + ((v.floor() as i64 - min).div_euclid(width)) * width;
                labels.push(ColumnValue::String(format!("{}-{}", start, start + width - 1)));
                starts.push(ColumnValue::Int64(start));
            }
            None => {
                labels.push(ColumnValue::Null);
                starts.push(ColumnValue::Null);
            }
        }
    }

    table
        .with_column(Column::from_values(output, ColumnType::String, labels)?)?
        .with_column(Column::from_values(format!("{}_start", output), ColumnType::Int64, starts)?)
}

struct CacheEntry {
    dataset: Rc<Dataset>,
    options: LoadOptions,
    loaded_at: Instant,
}

/// Memoizes loaded datasets by source path.
///
/// Entries are replaced only by an explicit `reload`/`invalidate`, by a
/// request with different `LoadOptions`, or, when a TTL is configured, once
/// they are older than the TTL.
#[derive(Default)]
pub struct DatasetCache {
    entries: HashMap<PathBuf, CacheEntry>,
    ttl: Option<Duration>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        DatasetCache {
            entries: HashMap::new(),
            ttl: Some(ttl),
        }
    }

    pub fn get_or_load(&mut self, path: impl AsRef<Path>, options: &LoadOptions) -> Result<Rc<Dataset>> {
        let path = path.as_ref();
        if let Some(entry) = self.entries.get(path) {
            let expired = self.ttl.map_or(false, |ttl| entry.loaded_at.elapsed() >= ttl);
            if !expired && entry.options == *options {
                return Ok(Rc::clone(&entry.dataset));
            }
        }
        self.reload(path, options)
    }

    /// Loads `path` unconditionally and replaces any cached entry. On
    /// failure the previous entry is dropped as well.
    pub fn reload(&mut self, path: impl AsRef<Path>, options: &LoadOptions) -> Result<Rc<Dataset>> {
        let path = path.as_ref();
        self.entries.remove(path);
        let dataset = Rc::new(load(path, options)?);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                dataset: Rc::clone(&dataset),
                options: options.clone(),
                loaded_at: Instant::now(),
            },
        );
        Ok(dataset)
    }

    /// Returns true if an entry was removed.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RATINGS: &str = "user_id,movie_id,title,genres,rating,year,age,timestamp\n\
        1,10,Heat,Action|Crime,4,1995,25,2001-03-04 10:00:00\n\
        2,11,Alien,Horror| Sci-Fi ,5,1979,31,978300760\n\
        3,12,Untagged,,3,1988,,garbage\n";

    const SALES: &str = "Order ID,Order Date,Ship Date,Region,Sales,Customer ID\n\
        CA-1,11/8/2016,11/11/2016,South,261.96,C1\n\
        CA-2,2017-06-12,2017-06-16,West,14.62,C2\n\
        CA-3,not-a-date,2015-10-18,East,957.58,C1\n";

    #[test]
    fn test_movie_ratings_normalization() {
        let dataset = load_str("ratings", RATINGS, &LoadOptions::movie_ratings()).unwrap();
        let base = dataset.base();

        assert_eq!(base.len(), 3);
        assert_eq!(base.schema().get_column_type("timestamp"), Some(ColumnType::Date));
        // epoch seconds and datetime strings both parse; garbage degrades to null
        assert_eq!(base.get_value(0, "rating_year").unwrap().as_i64(), Some(2001));
        assert_eq!(base.get_value(1, "rating_year").unwrap().as_i64(), Some(2000));
        assert!(base.get_value(2, "rating_year").unwrap().is_null());
        assert_eq!(base.get_value(0, "decade").unwrap().as_i64(), Some(1990));
        assert_eq!(base.get_value(1, "decade").unwrap().as_i64(), Some(1970));

        let caps = dataset.capabilities();
        assert!(caps.has("age"));
        assert!(caps.is_derived("decade"));
        assert!(caps.is_derived("rating_year"));
        assert!(!caps.is_derived("year"));
        assert_eq!(caps.tag_column(), Some("genres"));
    }

    #[test]
    fn test_malformed_numeric_cell_becomes_null() {
        let csv = "user_id,title,genres,rating,year\n\
            1,Heat,Action,4,1995\n\
            2,Alien,Horror,?,1979\n\
            3,Big,Comedy,3.5,unknown\n";
        let dataset = load_str("ratings", csv, &LoadOptions::movie_ratings()).unwrap();
        let base = dataset.base();

        assert_eq!(base.schema().get_column_type("rating"), Some(ColumnType::Float64));
        assert_eq!(base.schema().get_column_type("year"), Some(ColumnType::Int64));
        assert!(base.get_value(1, "rating").unwrap().is_null());
        assert_eq!(base.get_value(2, "rating").unwrap().as_f64(), Some(3.5));
        assert!(base.get_value(2, "year").unwrap().is_null());
        assert!(base.get_value(2, "decade").unwrap().is_null());

        let stats = crate::aggregate::summarize(
            base,
            &[crate::aggregate::MetricDef::mean("mean", "rating")],
        )
        .unwrap();
        assert_eq!(stats.get_value(0, "mean").unwrap().as_f64(), Some(3.75));
    }

    #[test]
    fn test_exploded_form_strips_blank_tags() {
        let dataset = load_str("ratings", RATINGS, &LoadOptions::movie_ratings()).unwrap();
        let exploded = dataset.exploded().unwrap();

        let tags: Vec<String> = exploded
            .column("genres")
            .unwrap()
            .values()
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(tags, vec!["Action", "Crime", "Horror", "Sci-Fi"]);

        let sources: Vec<i64> = exploded
            .column(SOURCE_ROW)
            .unwrap()
            .values()
            .iter()
            .filter_map(|v| v.as_i64())
            .collect();
        assert_eq!(sources, vec![0, 0, 1, 1]);
        assert_eq!(exploded.get_value(3, "title").unwrap().as_string(), Some("Alien"));
    }

    #[test]
    fn test_superstore_periods() {
        let dataset = load_str("orders", SALES, &LoadOptions::superstore()).unwrap();
        let base = dataset.base();

        assert_eq!(base.get_value(0, "Order Year").unwrap().as_i64(), Some(2016));
        assert_eq!(base.get_value(0, "Order Month").unwrap().as_i64(), Some(11));
        assert_eq!(base.get_value(0, "Order Quarter").unwrap().as_i64(), Some(4));
        assert_eq!(base.get_value(1, "Order Quarter").unwrap().as_i64(), Some(2));
        assert_eq!(base.get_value(1, "year").unwrap().as_i64(), Some(2017));
        assert_eq!(base.get_value(1, "decade").unwrap().as_i64(), Some(2010));
        assert!(base.get_value(2, "Order Year").unwrap().is_null());
        assert!(dataset.exploded().is_none());
        assert!(dataset.require_exploded("genre breakdown").is_err());
    }

    #[test]
    fn test_dataset_filter_keeps_exploded_consistent() {
        let dataset = load_str("ratings", RATINGS, &LoadOptions::movie_ratings()).unwrap();
        let filtered = dataset
            .filter(&[FilterSpec::range("year", 1990.0, 2000.0)])
            .unwrap();

        assert_eq!(filtered.base().len(), 1);
        let exploded = filtered.exploded().unwrap();
        assert_eq!(exploded.len(), 2);
        assert!(exploded
            .column("title")
            .unwrap()
            .values()
            .iter()
            .all(|t| t.as_string() == Some("Heat")));
    }

    #[test]
    fn test_bin_numeric_labels() {
        let table = Table::from_csv("users", "age\n18\n27\n28\n45\n\n").unwrap();
        let binned = bin_numeric(&table, "age", 10, "age_bin").unwrap();

        let labels: Vec<String> = binned.column("age_bin").unwrap().values().iter().map(|v| v.to_string()).collect();
        assert_eq!(labels, vec!["18-27", "18-27", "28-37", "38-47"]);
        assert_eq!(binned.get_value(3, "age_bin_start").unwrap().as_i64(), Some(38));
        assert!(bin_numeric(&table, "age", 0, "age_bin").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load("/definitely/not/here.csv", &LoadOptions::default()).unwrap_err();
        match err {
            Error::DataUnavailable { path, .. } => assert_eq!(path, PathBuf::from("/definitely/not/here.csv")),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_empty_file() {
        let (_dir, path) = write_temp("empty.csv", "  \n");
        let err = load(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn test_cache_memoizes_until_invalidated() {
        let (_dir, path) = write_temp("cache.csv", SALES);
        let options = LoadOptions::superstore();
        let mut cache = DatasetCache::new();

        let first = cache.get_or_load(&path, &options).unwrap();
        let second = cache.get_or_load(&path, &options).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        // Different options are a different memo key
        let third = cache.get_or_load(&path, &LoadOptions::default()).unwrap();
        assert!(!Rc::ptr_eq(&first, &third));

        assert!(cache.invalidate(&path));
        assert!(cache.is_empty());

        let mut expiring = DatasetCache::with_ttl(Duration::ZERO);
        let a = expiring.get_or_load(&path, &options).unwrap();
        let b = expiring.get_or_load(&path, &options).unwrap();
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: LoadOptions = serde_json::from_str(r#"{"tag_column": "genres"}"#).unwrap();
        assert_eq!(options.tag_column.as_deref(), Some("genres"));
        assert_eq!(options.tag_delimiter, '|');
        assert!(options.date_columns.is_empty());
    }
}

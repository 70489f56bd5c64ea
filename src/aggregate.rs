//! Group-by aggregation.
//!
//! `aggregate` partitions a table by a `GroupKey`, evaluates base metrics over
//! the rows of each group and then derived metrics over the finished metric
//! columns, in declaration order. Groups come out in ascending key order with
//! null keys last.
//!
//! A metric that is undefined for a group (mean of no values, standard
//! deviation of one value, ratio over zero) is a null cell, never an error.

use crate::column::{compare_non_null, compare_nulls_last, Column, ColumnType, ColumnValue, GroupValue};
use crate::error::{Error, Result};
use crate::table::Table;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Normal quantile used for the 95% confidence bounds.
pub const Z_95: f64 = 1.96;

/// Grouping columns plus the null policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    columns: Vec<String>,
    dropna: bool,
}

impl GroupKey {
    /// Key over `columns`; rows with a null in any key column are dropped.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        GroupKey {
            columns: columns.into_iter().map(Into::into).collect(),
            dropna: true,
        }
    }

    /// Nulls form their own group instead of being dropped.
    pub fn keep_nulls(mut self) -> Self {
        self.dropna = false;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dropna(&self) -> bool {
        self.dropna
    }
}

/// How a rolling window treats positions with too few observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edges {
    /// Null unless the window holds `size` non-null values.
    RequireFull,
    /// Any non-null value in the clipped window is enough.
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub size: usize,
    pub centered: bool,
    pub edges: Edges,
}

impl Window {
    pub fn centered(size: usize) -> Self {
        Window { size, centered: true, edges: Edges::RequireFull }
    }

    pub fn trailing(size: usize) -> Self {
        Window { size, centered: false, edges: Edges::RequireFull }
    }

    pub fn with_edges(mut self, edges: Edges) -> Self {
        self.edges = edges;
        self
    }

    /// Inclusive index bounds of the window at `i`, clipped to `[0, len)`.
    fn bounds(&self, i: usize, len: usize) -> (usize, usize) {
        let ahead = if self.centered { (self.size - 1) / 2 } else { 0 };
        let behind = self.size - 1 - ahead;
        (i.saturating_sub(behind), (i + ahead).min(len.saturating_sub(1)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    Size,
    Count(String),
    Sum(String),
    Mean(String),
    Min(String),
    Max(String),
    Std(String),
    NUnique(String),
    Ratio { numerator: String, denominator: String },
    PercentOfTotal(String),
    StdError { std: String, count: String },
    CiLower { mean: String, std: String, count: String },
    CiUpper { mean: String, std: String, count: String },
    Growth(String),
    RollingMean { metric: String, window: Window },
}

impl MetricKind {
    /// Derived metrics read other metric columns instead of source rows.
    pub fn is_derived(&self) -> bool {
        !matches!(
            self,
            MetricKind::Size
                | MetricKind::Count(_)
                | MetricKind::Sum(_)
                | MetricKind::Mean(_)
                | MetricKind::Min(_)
                | MetricKind::Max(_)
                | MetricKind::Std(_)
                | MetricKind::NUnique(_)
        )
    }

    fn inputs(&self) -> Vec<&str> {
        match self {
            MetricKind::Size => vec![],
            MetricKind::Count(c)
            | MetricKind::Sum(c)
            | MetricKind::Mean(c)
            | MetricKind::Min(c)
            | MetricKind::Max(c)
            | MetricKind::Std(c)
            | MetricKind::NUnique(c)
            | MetricKind::PercentOfTotal(c)
            | MetricKind::Growth(c) => vec![c],
            MetricKind::Ratio { numerator, denominator } => vec![numerator, denominator],
            MetricKind::StdError { std, count } => vec![std, count],
            MetricKind::CiLower { mean, std, count } | MetricKind::CiUpper { mean, std, count } => {
                vec![mean, std, count]
            }
            MetricKind::RollingMean { metric, .. } => vec![metric],
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            MetricKind::Size => "size",
            MetricKind::Count(_) => "count",
            MetricKind::Sum(_) => "sum",
            MetricKind::Mean(_) => "mean",
            MetricKind::Min(_) => "min",
            MetricKind::Max(_) => "max",
            MetricKind::Std(_) => "std",
            MetricKind::NUnique(_) => "nunique",
            MetricKind::Ratio { .. } => "ratio",
            MetricKind::PercentOfTotal(_) => "percent_of_total",
            MetricKind::StdError { .. } => "std_error",
            MetricKind::CiLower { .. } => "ci_lower",
            MetricKind::CiUpper { .. } => "ci_upper",
            MetricKind::Growth(_) => "growth",
            MetricKind::RollingMean { .. } => "rolling_mean",
        }
    }
}

/// A named output column of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDef {
    pub name: String,
    pub kind: MetricKind,
}

impl MetricDef {
    pub fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        MetricDef { name: name.into(), kind }
    }

    pub fn size(name: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Size)
    }

    pub fn count(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Count(column.into()))
    }

    pub fn sum(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Sum(column.into()))
    }

    pub fn mean(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Mean(column.into()))
    }

    pub fn min(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Min(column.into()))
    }

    pub fn max(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Max(column.into()))
    }

    pub fn std(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Std(column.into()))
    }

    pub fn nunique(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(name, MetricKind::NUnique(column.into()))
    }

    pub fn ratio(name: impl Into<String>, numerator: impl Into<String>, denominator: impl Into<String>) -> Self {
        Self::new(
            name,
            MetricKind::Ratio {
                numerator: numerator.into(),
                denominator: denominator.into(),
            },
        )
    }

    pub fn percent_of_total(name: impl Into<String>, metric: impl Into<String>) -> Self {
        Self::new(name, MetricKind::PercentOfTotal(metric.into()))
    }

    pub fn std_error(name: impl Into<String>, std: impl Into<String>, count: impl Into<String>) -> Self {
        Self::new(name, MetricKind::StdError { std: std.into(), count: count.into() })
    }

    pub fn ci_lower(
        name: impl Into<String>,
        mean: impl Into<String>,
        std: impl Into<String>,
        count: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            MetricKind::CiLower { mean: mean.into(), std: std.into(), count: count.into() },
        )
    }

    pub fn ci_upper(
        name: impl Into<String>,
        mean: impl Into<String>,
        std: impl Into<String>,
        count: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            MetricKind::CiUpper { mean: mean.into(), std: std.into(), count: count.into() },
        )
    }

    pub fn growth(name: impl Into<String>, metric: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Growth(metric.into()))
    }

    pub fn rolling_mean(name: impl Into<String>, metric: impl Into<String>, window: Window) -> Self {
        Self::new(name, MetricKind::RollingMean { metric: metric.into(), window })
    }
}

/// The result of an aggregation: one row per group.
///
/// Besides the key and metric columns the table remembers how many source
/// rows fed each group, which `filter_groups` uses for minimum-count
/// thresholds, and which rows are synthetic ("Other").
#[derive(Debug, Clone)]
pub struct AggregateTable {
    pub(crate) table: Table,
    pub(crate) keys: Vec<String>,
    pub(crate) group_sizes: Vec<usize>,
    pub(crate) synthetic: Vec<bool>,
}

impl AggregateTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn group_sizes(&self) -> &[usize] {
        &self.group_sizes
    }

    pub fn is_synthetic(&self, row: usize) -> bool {
        self.synthetic.get(row).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when the selection left no groups; renderers show "no data".
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.table.column(name)
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<&ColumnValue> {
        self.table.get_value(row, column)
    }

    /// Numeric values of a column; nulls and non-numeric cells are `None`.
    pub fn series(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let col = self.table.require_column(column, "series")?;
        Ok(numeric_series(col))
    }

    /// Rows at `indices`, in that order, with their sizes and markers.
    pub fn take(&self, indices: &[usize]) -> AggregateTable {
        AggregateTable {
            table: self.table.take(indices),
            keys: self.keys.clone(),
            group_sizes: indices.iter().map(|&i| self.group_sizes.get(i).copied().unwrap_or(0)).collect(),
            synthetic: indices.iter().map(|&i| self.is_synthetic(i)).collect(),
        }
    }

    /// Adds `name` = period-over-period growth of `metric`, in percent, along
    /// the current row order.
    pub fn with_growth(&self, name: &str, metric: &str) -> Result<AggregateTable> {
        self.require_temporal_key("growth")?;
        let values = self.series(metric)?;
        self.with_metric_column(float_column(name, growth_series(&values)))
    }

    /// Adds `name` = rolling mean of `metric` along the current row order.
    pub fn with_rolling_mean(&self, name: &str, metric: &str, window: &Window) -> Result<AggregateTable> {
        let values = self.series(metric)?;
        let smoothed = rolling_mean_series(&values, window)?;
        self.with_metric_column(float_column(name, smoothed))
    }

    /// Adds `name` = share of `metric` over the rows currently in the table.
    pub fn with_percent_of_total(&self, name: &str, metric: &str) -> Result<AggregateTable> {
        let values = self.series(metric)?;
        self.with_metric_column(float_column(name, percent_series(&values)))
    }

    fn with_metric_column(&self, column: Result<Column>) -> Result<AggregateTable> {
        Ok(AggregateTable {
            table: self.table.with_column(column?)?,
            keys: self.keys.clone(),
            group_sizes: self.group_sizes.clone(),
            synthetic: self.synthetic.clone(),
        })
    }

    fn require_temporal_key(&self, operation: &str) -> Result<()> {
        temporal_key(self.table.columns(), &self.keys, operation)
    }
}

/// Groups `table` by `key` and computes `metrics` for every group.
///
/// # Examples
///
/// ```
/// use dashtable::{aggregate, ColumnValue, GroupKey, MetricDef, Table};
///
/// let ratings = Table::from_csv(
///     "ratings",
///     "genres,rating\nAction,4\nAction,2\nComedy,5\nComedy,4\nDrama,3\n",
/// ).unwrap();
///
/// let by_genre = aggregate(
///     &ratings,
///     &GroupKey::new(["genres"]),
///     &[MetricDef::mean("mean", "rating"), MetricDef::size("n")],
/// ).unwrap();
///
/// assert_eq!(by_genre.len(), 3);
/// assert_eq!(by_genre.get_value(1, "mean").unwrap(), &ColumnValue::Float64(4.5));
/// ```
pub fn aggregate(table: &Table, key: &GroupKey, metrics: &[MetricDef]) -> Result<AggregateTable> {
    let key_columns = key
        .columns
        .iter()
        .map(|name| table.require_column(name, "aggregate"))
        .collect::<Result<Vec<_>>>()?;
    validate_metrics(table, &key.columns, metrics)?;

    let groups = group_rows(table, &key_columns, key.dropna);
    log::debug!(
        "aggregate '{}' by [{}]: {} rows into {} groups",
        table.name(),
        key.columns.join(", "),
        table.len(),
        groups.len()
    );

    let mut columns = Vec::with_capacity(key_columns.len() + metrics.len());
    for (i, source) in key_columns.iter().enumerate() {
        let values = groups.iter().map(|(k, _)| k[i].clone()).collect();
        columns.push(Column::from_values(source.name(), source.column_type(), values)?);
    }

    let name = format!("{}_by_{}", table.name(), key.columns.join("_"));
    build(table, name, key.columns.clone(), groups, columns, metrics)
}

/// Whole-table aggregation: one row computed over every row of `table`.
///
/// Unlike `aggregate`, an empty table still yields a row (size 0, sums 0,
/// other metrics null).
pub fn summarize(table: &Table, metrics: &[MetricDef]) -> Result<AggregateTable> {
    validate_metrics(table, &[], metrics)?;
    let groups = vec![(Vec::new(), (0..table.len()).collect())];
    build(table, table.name().to_string(), Vec::new(), groups, Vec::new(), metrics)
}

fn build(
    table: &Table,
    name: String,
    keys: Vec<String>,
    groups: Vec<(Vec<ColumnValue>, Vec<usize>)>,
    mut columns: Vec<Column>,
    metrics: &[MetricDef],
) -> Result<AggregateTable> {
    for metric in metrics {
        let column = if metric.kind.is_derived() {
            let lookup = |name: &str| -> Result<Vec<Option<f64>>> {
                columns
                    .iter()
                    .find(|c| c.name() == name)
                    .map(numeric_series)
                    .ok_or_else(|| Error::schema_mismatch(name, metric.kind.operation()))
            };
            derived_metric(&metric.name, &metric.kind, lookup, || {
                temporal_key(&columns, &keys, metric.kind.operation())
            })?
        } else {
            base_metric(table, &metric.name, &metric.kind, &groups)?
        };
        if columns.iter().any(|c| c.name() == column.name()) {
            return Err(Error::DuplicateColumn(column.name().to_string()));
        }
        columns.push(column);
    }

    let group_sizes: Vec<usize> = groups.iter().map(|(_, rows)| rows.len()).collect();
    let synthetic = vec![false; group_sizes.len()];
    let table = Table::from_columns(name, columns)?;
    Ok(AggregateTable { table, keys, group_sizes, synthetic })
}

/// Growth runs along a single numeric or date key.
fn temporal_key(columns: &[Column], keys: &[String], operation: &str) -> Result<()> {
    let [key] = keys else {
        return Err(Error::InvalidArgument(format!(
            "{} needs exactly one ordered key column, got {}",
            operation,
            keys.len()
        )));
    };
    match columns.iter().find(|c| c.name() == key) {
        Some(c) if c.column_type().is_ordered_numeric() => Ok(()),
        Some(c) => Err(Error::InvalidArgument(format!(
            "{} needs a numeric or date key, '{}' is {:?}",
            operation,
            key,
            c.column_type()
        ))),
        None => Err(Error::schema_mismatch(key.clone(), operation)),
    }
}

/// Checks every referenced column once, before any rows are touched.
fn validate_metrics(table: &Table, keys: &[String], metrics: &[MetricDef]) -> Result<()> {
    let mut available: HashSet<&str> = keys.iter().map(String::as_str).collect();
    for metric in metrics {
        let operation = metric.kind.operation();
        for input in metric.kind.inputs() {
            if metric.kind.is_derived() {
                if !available.contains(input) {
                    return Err(Error::schema_mismatch(input, operation));
                }
            } else {
                let column = table.require_column(input, operation)?;
                let numeric = matches!(column.column_type(), ColumnType::Int64 | ColumnType::Float64);
                let needs_numeric = matches!(
                    metric.kind,
                    MetricKind::Sum(_) | MetricKind::Mean(_) | MetricKind::Std(_)
                );
                if needs_numeric && !numeric {
                    return Err(Error::InvalidArgument(format!(
                        "{} needs a numeric column, '{}' is {:?}",
                        operation,
                        input,
                        column.column_type()
                    )));
                }
            }
        }
        if let MetricKind::RollingMean { window, .. } = &metric.kind {
            check_window(window)?;
        }
        available.insert(metric.name.as_str());
    }
    Ok(())
}

/// Partitions rows by key, in ascending key order with nulls last.
fn group_rows(table: &Table, key_columns: &[&Column], dropna: bool) -> Vec<(Vec<ColumnValue>, Vec<usize>)> {
    let mut index: HashMap<Vec<GroupValue>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<ColumnValue>, Vec<usize>)> = Vec::new();

    'rows: for row in 0..table.len() {
        let mut key = Vec::with_capacity(key_columns.len());
        for column in key_columns {
            let value = column.get(row).cloned().unwrap_or(ColumnValue::Null);
            if dropna && value.is_null() {
                continue 'rows;
            }
            key.push(GroupValue(value));
        }

        match index.get(&key) {
            Some(&g) => groups[g].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key.into_iter().map(|v| v.0).collect(), vec![row]));
            }
        }
    }

    groups.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .map(|(x, y)| compare_nulls_last(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    groups
}

fn base_metric(
    table: &Table,
    name: &str,
    kind: &MetricKind,
    groups: &[(Vec<ColumnValue>, Vec<usize>)],
) -> Result<Column> {
    let source = |column: &str| table.require_column(column, kind.operation());
    let numbers = |column: &Column, rows: &[usize]| -> Vec<f64> {
        rows.iter().filter_map(|&r| column.get_f64(r)).collect()
    };

    match kind {
        MetricKind::Size => int_column(name, groups.iter().map(|(_, rows)| rows.len())),
        MetricKind::Count(c) => {
            let column = source(c)?;
            int_column(name, groups.iter().map(|(_, rows)| rows.iter().filter(|&&r| !column.is_null_at(r)).count()))
        }
        MetricKind::NUnique(c) => {
            let column = source(c)?;
            int_column(
                name,
                groups.iter().map(|(_, rows)| {
                    rows.iter()
                        .filter_map(|&r| column.get(r).filter(|v| !v.is_null()))
                        .map(|v| GroupValue(v.clone()))
                        .collect::<HashSet<_>>()
                        .len()
                }),
            )
        }
        MetricKind::Sum(c) => {
            let column = source(c)?;
            float_column(name, groups.iter().map(|(_, rows)| Some(numbers(column, rows).iter().sum())).collect())
        }
        MetricKind::Mean(c) => {
            let column = source(c)?;
            float_column(name, groups.iter().map(|(_, rows)| mean(&numbers(column, rows))).collect())
        }
        MetricKind::Std(c) => {
            let column = source(c)?;
            float_column(name, groups.iter().map(|(_, rows)| sample_std(&numbers(column, rows))).collect())
        }
        MetricKind::Min(c) | MetricKind::Max(c) => {
            let column = source(c)?;
            let want = if matches!(kind, MetricKind::Min(_)) { Ordering::Less } else { Ordering::Greater };
            let values = groups
                .iter()
                .map(|(_, rows)| {
                    rows.iter()
                        .filter_map(|&r| column.get(r).filter(|v| !v.is_null()))
                        .fold(None::<&ColumnValue>, |best, v| match best {
                            Some(b) if compare_non_null(v, b) != want => Some(b),
                            _ => Some(v),
                        })
                        .cloned()
                        .unwrap_or(ColumnValue::Null)
                })
                .collect();
            Column::from_values(name, column.column_type(), values)
        }
        _ => Err(Error::InvalidArgument(format!("{} is not a base metric", kind.operation()))),
    }
}

fn derived_metric(
    name: &str,
    kind: &MetricKind,
    lookup: impl Fn(&str) -> Result<Vec<Option<f64>>>,
    temporal: impl Fn() -> Result<()>,
) -> Result<Column> {
    let values = match kind {
        MetricKind::Ratio { numerator, denominator } => {
            let (num, den) = (lookup(numerator)?, lookup(denominator)?);
            num.iter().zip(&den).map(|(n, d)| ratio(*n, *d)).collect()
        }
        MetricKind::PercentOfTotal(metric) => percent_series(&lookup(metric)?),
        MetricKind::StdError { std, count } => {
            let (s, n) = (lookup(std)?, lookup(count)?);
            s.iter().zip(&n).map(|(s, n)| std_error(*s, *n)).collect()
        }
        MetricKind::CiLower { mean, std, count } | MetricKind::CiUpper { mean, std, count } => {
            let sign = if matches!(kind, MetricKind::CiLower { .. }) { -1.0 } else { 1.0 };
            let (m, s, n) = (lookup(mean)?, lookup(std)?, lookup(count)?);
            m.iter()
                .zip(&s)
                .zip(&n)
                .map(|((m, s), n)| Some(m.as_ref()? + sign * Z_95 * std_error(*s, *n)?))
                .collect()
        }
        MetricKind::Growth(metric) => {
            temporal()?;
            growth_series(&lookup(metric)?)
        }
        MetricKind::RollingMean { metric, window } => rolling_mean_series(&lookup(metric)?, window)?,
        _ => return Err(Error::InvalidArgument(format!("{} is not a derived metric", kind.operation()))),
    };
    float_column(name, values)
}

fn int_column(name: &str, values: impl Iterator<Item = usize>) -> Result<Column> {
    Column::from_values(name, ColumnType::Int64, values.map(|v| ColumnValue::Int64(v as i64)).collect())
}

fn float_column(name: &str, values: Vec<Option<f64>>) -> Result<Column> {
    Column::from_values(name, ColumnType::Float64, values.into_iter().map(ColumnValue::from_metric).collect())
}

pub(crate) fn numeric_series(column: &Column) -> Vec<Option<f64>> {
    column.values().iter().map(ColumnValue::as_number).collect()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (divisor `n - 1`).
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

fn std_error(std: Option<f64>, count: Option<f64>) -> Option<f64> {
    match (std, count) {
        (Some(s), Some(n)) if n > 0.0 => Some(s / n.sqrt()),
        _ => None,
    }
}

fn percent_series(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let total: f64 = values.iter().flatten().sum();
    values
        .iter()
        .map(|v| if total == 0.0 { None } else { v.map(|v| v / total * 100.0) })
        .collect()
}

fn growth_series(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut growth = Vec::with_capacity(values.len());
    for (i, current) in values.iter().enumerate() {
        let previous = if i == 0 { None } else { values[i - 1] };
        growth.push(match (previous, current) {
            (Some(p), Some(c)) if p != 0.0 => Some((c - p) / p * 100.0),
            _ => None,
        });
    }
    growth
}

fn check_window(window: &Window) -> Result<()> {
    if window.size == 0 {
        return Err(Error::InvalidArgument("rolling window size must be at least 1".to_string()));
    }
    Ok(())
}

fn rolling_mean_series(values: &[Option<f64>], window: &Window) -> Result<Vec<Option<f64>>> {
    check_window(window)?;
    let required = match window.edges {
        Edges::RequireFull => window.size,
        Edges::Partial => 1,
    };
    Ok((0..values.len())
        .map(|i| {
            let (lo, hi) = window.bounds(i, values.len());
            let present: Vec<f64> = values[lo..=hi].iter().flatten().copied().collect();
            if present.len() >= required {
                mean(&present)
            } else {
                None
            }
        })
        .collect())
}

/// Pearson correlation between two columns of an aggregate table, over the
/// rows where both are present. `None` with fewer than two complete pairs or
/// when either side has zero variance.
pub fn pearson(groups: &AggregateTable, x: &str, y: &str) -> Result<Option<f64>> {
    let xs = groups.series(x)?;
    let ys = groups.series(y)?;
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(&ys)
        .enumerate()
        .filter(|(row, _)| !groups.is_synthetic(*row))
        .filter_map(|(_, (a, b))| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return Ok(None);
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Ok(None);
    }
    Ok(Some(sxy / (sxx.sqrt() * syy.sqrt())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings() -> Table {
        Table::from_csv(
            "ratings",
            "movie,genres,rating,year\n\
             m1,Action,4,1995\n\
             m2,Action,2,1995\n\
             m3,Comedy,5,1996\n\
             m4,Comedy,4,1997\n\
             m5,Drama,3,\n",
        )
        .unwrap()
    }

    fn genre_stats() -> Vec<MetricDef> {
        vec![
            MetricDef::mean("mean", "rating"),
            MetricDef::count("count", "rating"),
            MetricDef::std("std", "rating"),
            MetricDef::ci_lower("ci_lower", "mean", "std", "count"),
            MetricDef::ci_upper("ci_upper", "mean", "std", "count"),
        ]
    }

    fn floats(groups: &AggregateTable, column: &str) -> Vec<Option<f64>> {
        groups.series(column).unwrap()
    }

    #[test]
    fn test_genre_scenario() {
        let groups = aggregate(&ratings(), &GroupKey::new(["genres"]), &genre_stats()).unwrap();

        let labels: Vec<String> = groups.column("genres").unwrap().values().iter().map(|v| v.to_string()).collect();
        assert_eq!(labels, vec!["Action", "Comedy", "Drama"]);
        assert_eq!(floats(&groups, "mean"), vec![Some(3.0), Some(4.5), Some(3.0)]);
        assert_eq!(floats(&groups, "count"), vec![Some(2.0), Some(2.0), Some(1.0)]);
        assert_eq!(groups.group_sizes(), &[2, 2, 1]);

        // A single rating has no spread and therefore no interval
        assert!(groups.get_value(2, "std").unwrap().is_null());
        assert!(groups.get_value(2, "ci_lower").unwrap().is_null());
        assert!(groups.get_value(2, "ci_upper").unwrap().is_null());
    }

    #[test]
    fn test_ci_symmetric_around_mean() {
        let groups = aggregate(&ratings(), &GroupKey::new(["genres"]), &genre_stats()).unwrap();
        for row in 0..2 {
            let m = groups.get_value(row, "mean").unwrap().as_f64().unwrap();
            let lo = groups.get_value(row, "ci_lower").unwrap().as_f64().unwrap();
            let hi = groups.get_value(row, "ci_upper").unwrap().as_f64().unwrap();
            assert!(((m - lo) - (hi - m)).abs() < 1e-9);
        }
        // Action: std of {4, 2} is sqrt(2)
        let lo = groups.get_value(0, "ci_lower").unwrap().as_f64().unwrap();
        assert!((lo - (3.0 - 1.96 * 2f64.sqrt() / 2f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_dropna_and_keep_nulls() {
        let table = ratings();
        let dropped = aggregate(&table, &GroupKey::new(["year"]), &[MetricDef::size("n")]).unwrap();
        assert_eq!(dropped.len(), 3);
        assert_eq!(dropped.group_sizes().iter().sum::<usize>(), 4);

        let kept = aggregate(&table, &GroupKey::new(["year"]).keep_nulls(), &[MetricDef::size("n")]).unwrap();
        assert_eq!(kept.len(), 4);
        assert_eq!(kept.group_sizes().iter().sum::<usize>(), table.len());
        // Null group sorts last
        assert!(kept.get_value(3, "year").unwrap().is_null());
    }

    #[test]
    fn test_empty_table_yields_empty_aggregate() {
        let table = ratings().take(&[]);
        let groups = aggregate(&table, &GroupKey::new(["genres"]), &genre_stats()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let err = aggregate(&ratings(), &GroupKey::new(["age"]), &[MetricDef::size("n")]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref column, .. } if column == "age"));

        let err = aggregate(&ratings(), &GroupKey::new(["genres"]), &[MetricDef::ratio("r", "a", "b")]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref column, .. } if column == "a"));
    }

    #[test]
    fn test_mean_of_string_column_rejected() {
        let err = aggregate(&ratings(), &GroupKey::new(["genres"]), &[MetricDef::mean("m", "movie")]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_sum_min_max_nunique() {
        let table = Table::from_csv(
            "orders",
            "Region,Order ID,Sales\nEast,A,10\nEast,A,5\nEast,B,\nWest,C,7\n",
        )
        .unwrap();
        let groups = aggregate(
            &table,
            &GroupKey::new(["Region"]),
            &[
                MetricDef::sum("sales", "Sales"),
                MetricDef::min("lo", "Sales"),
                MetricDef::max("hi", "Sales"),
                MetricDef::nunique("orders", "Order ID"),
                MetricDef::ratio("per_order", "sales", "orders"),
                MetricDef::percent_of_total("share", "sales"),
            ],
        )
        .unwrap();

        assert_eq!(floats(&groups, "sales"), vec![Some(15.0), Some(7.0)]);
        assert_eq!(groups.get_value(0, "lo").unwrap(), &ColumnValue::Int64(5));
        assert_eq!(groups.get_value(0, "hi").unwrap(), &ColumnValue::Int64(10));
        assert_eq!(floats(&groups, "orders"), vec![Some(2.0), Some(1.0)]);
        assert_eq!(floats(&groups, "per_order"), vec![Some(7.5), Some(7.0)]);

        let share = floats(&groups, "share");
        assert!((share[0].unwrap() - 68.1818).abs() < 1e-3);
        assert!((share.iter().flatten().sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratio_over_zero_is_null() {
        assert_eq!(ratio(Some(3.0), Some(0.0)), None);
        assert_eq!(ratio(None, Some(2.0)), None);
        assert_eq!(ratio(Some(3.0), Some(2.0)), Some(1.5));
    }

    #[test]
    fn test_percent_of_zero_total_is_null() {
        assert_eq!(percent_series(&[Some(0.0), Some(0.0)]), vec![None, None]);
    }

    #[test]
    fn test_growth_on_year_key() {
        let table = Table::from_csv(
            "orders",
            "Order Year,Sales\n2015,100\n2016,150\n2016,50\n2017,0\n2018,10\n",
        )
        .unwrap();
        let groups = aggregate(
            &table,
            &GroupKey::new(["Order Year"]),
            &[MetricDef::sum("Sales", "Sales"), MetricDef::growth("Growth", "Sales")],
        )
        .unwrap();

        // 2017 -> 2018 grows from zero and is undefined
        assert_eq!(floats(&groups, "Growth"), vec![None, Some(100.0), Some(-100.0), None]);
    }

    #[test]
    fn test_constant_series_has_zero_growth() {
        let values = vec![Some(4.0); 5];
        let growth = growth_series(&values);
        assert_eq!(growth[0], None);
        assert!(growth[1..].iter().all(|g| *g == Some(0.0)));
    }

    #[test]
    fn test_growth_needs_temporal_key() {
        let err = aggregate(
            &ratings(),
            &GroupKey::new(["genres"]),
            &[MetricDef::mean("mean", "rating"), MetricDef::growth("g", "mean")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_rolling_mean_centered() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)];

        let full = rolling_mean_series(&values, &Window::centered(3)).unwrap();
        assert_eq!(full, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);

        let partial = rolling_mean_series(&values, &Window::centered(3).with_edges(Edges::Partial)).unwrap();
        assert_eq!(partial, vec![Some(1.5), Some(2.0), Some(3.0), Some(4.0), Some(4.5)]);
    }

    #[test]
    fn test_rolling_mean_even_and_trailing_windows() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)];

        // Even centered windows look one further back than ahead
        let even = rolling_mean_series(&values, &Window::centered(4)).unwrap();
        assert_eq!(even, vec![None, None, Some(2.5), Some(3.5), None]);

        let trailing = rolling_mean_series(&values, &Window::trailing(2)).unwrap();
        assert_eq!(trailing, vec![None, Some(1.5), Some(2.5), Some(3.5), Some(4.5)]);
    }

    #[test]
    fn test_rolling_mean_skips_gaps() {
        let values = vec![Some(1.0), None, Some(3.0)];
        let full = rolling_mean_series(&values, &Window::centered(3)).unwrap();
        assert_eq!(full, vec![None, None, None]);

        let partial = rolling_mean_series(&values, &Window::centered(3).with_edges(Edges::Partial)).unwrap();
        assert_eq!(partial, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = rolling_mean_series(&[Some(1.0)], &Window::centered(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_standalone_operations_after_filter() {
        let table = Table::from_csv("t", "year,n\n2000,10\n2001,30\n2002,60\n").unwrap();
        let groups = aggregate(&table, &GroupKey::new(["year"]), &[MetricDef::sum("n", "n")]).unwrap();

        let tail = groups.take(&[1, 2]).with_percent_of_total("share", "n").unwrap();
        let share = floats(&tail, "share");
        assert!((share[0].unwrap() - 100.0 / 3.0).abs() < 1e-9);
        assert!((share[1].unwrap() - 200.0 / 3.0).abs() < 1e-9);

        let grown = tail.with_growth("growth", "n").unwrap();
        assert_eq!(floats(&grown, "growth"), vec![None, Some(100.0)]);

        let err = grown.with_growth("growth", "n").unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(_)));
    }

    #[test]
    fn test_summarize_whole_table() {
        let kpis = summarize(
            &ratings(),
            &[MetricDef::size("rows"), MetricDef::mean("avg", "rating"), MetricDef::nunique("genres", "genres")],
        )
        .unwrap();
        assert_eq!(kpis.len(), 1);
        assert_eq!(kpis.get_value(0, "rows").unwrap(), &ColumnValue::Int64(5));
        assert_eq!(kpis.get_value(0, "avg").unwrap(), &ColumnValue::Float64(3.6));
        assert_eq!(kpis.get_value(0, "genres").unwrap(), &ColumnValue::Int64(3));

        let empty = summarize(&ratings().take(&[]), &[MetricDef::size("rows"), MetricDef::sum("s", "rating")]).unwrap();
        assert_eq!(empty.get_value(0, "rows").unwrap(), &ColumnValue::Int64(0));
        assert_eq!(empty.get_value(0, "s").unwrap(), &ColumnValue::Float64(0.0));
    }

    #[test]
    fn test_pearson() {
        let table = Table::from_csv("t", "k,x,y\na,1,2\nb,2,4\nc,3,6\nd,4,\n").unwrap();
        let groups = aggregate(
            &table,
            &GroupKey::new(["k"]),
            &[MetricDef::mean("x", "x"), MetricDef::mean("y", "y")],
        )
        .unwrap();
        let r = pearson(&groups, "x", "y").unwrap().unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let flat = Table::from_csv("t", "k,x,y\na,1,5\nb,2,5\n").unwrap();
        let groups = aggregate(&flat, &GroupKey::new(["k"]), &[MetricDef::mean("x", "x"), MetricDef::mean("y", "y")]).unwrap();
        assert_eq!(pearson(&groups, "x", "y").unwrap(), None);
    }
}

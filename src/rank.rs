//! Ordering, truncation and "Other" bucketing of aggregate rows.

use crate::aggregate::AggregateTable;
use crate::column::{compare_non_null, ColumnType, ColumnValue, GroupValue};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Label given to the synthetic bucket row.
pub const OTHER_LABEL: &str = "Other";

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (smallest first)
    Ascending,
    /// Descending order (largest first)
    Descending,
}

/// A single sort key specifying a column and order.
///
/// Nulls always sort after every non-null value, in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }

    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        SortKey {
            column: column.into(),
            order,
        }
    }

    fn compare(&self, a: &ColumnValue, b: &ColumnValue) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match self.order {
                SortOrder::Ascending => compare_non_null(a, b),
                SortOrder::Descending => compare_non_null(a, b).reverse(),
            },
        }
    }
}

/// Collapses low-share groups into one synthetic row.
///
/// Every group whose `share_column` is below `threshold` is removed. The
/// replacement row carries [`OTHER_LABEL`] in `label_column`, the sums of the
/// removed groups in `share_column` and each of `summed_columns`, and nulls
/// everywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct OtherBucket {
    pub label_column: String,
    pub share_column: String,
    pub threshold: f64,
    pub summed_columns: Vec<String>,
}

impl OtherBucket {
    pub fn new(label_column: impl Into<String>, share_column: impl Into<String>, threshold: f64) -> Self {
        OtherBucket {
            label_column: label_column.into(),
            share_column: share_column.into(),
            threshold,
            summed_columns: Vec::new(),
        }
    }

    /// Additional columns summed into the Other row (counts, sums).
    pub fn summing<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.summed_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    fn is_below(&self, share: &ColumnValue) -> bool {
        self.threshold > 0.0 && share.as_f64().map_or(false, |s| s < self.threshold)
    }
}

/// Orders `groups` by `sort_keys`, optionally buckets low-share groups into
/// an "Other" row and keeps the first `top_n` of the remaining rows.
///
/// The sort is stable, so rows tied on every key keep their incoming order
/// and the top `n` rows are always a prefix of the top `n + k`. The Other
/// row is appended after truncation and does not count toward `top_n`.
///
/// # Examples
///
/// ```
/// use dashtable::{aggregate, rank, GroupKey, MetricDef, SortKey, Table};
///
/// let sales = Table::from_csv("orders", "Region,Sales\nEast,10\nWest,30\nSouth,20\n").unwrap();
/// let by_region = aggregate(&sales, &GroupKey::new(["Region"]), &[MetricDef::sum("Sales", "Sales")]).unwrap();
///
/// let top = rank(&by_region, &[SortKey::descending("Sales")], Some(2), None).unwrap();
/// assert_eq!(top.get_value(0, "Region").unwrap().as_string(), Some("West"));
/// assert_eq!(top.len(), 2);
/// ```
pub fn rank(
    groups: &AggregateTable,
    sort_keys: &[SortKey],
    top_n: Option<usize>,
    other: Option<&OtherBucket>,
) -> Result<AggregateTable> {
    let table = groups.table();
    let key_columns = sort_keys
        .iter()
        .map(|key| table.require_column(&key.column, "rank").map(|c| (key, c)))
        .collect::<Result<Vec<_>>>()?;

    let mut kept: Vec<usize> = (0..groups.len()).collect();
    let mut bucketed: Vec<usize> = Vec::new();
    if let Some(bucket) = other {
        validate_bucket(groups, bucket)?;
        let shares = table.require_column(&bucket.share_column, "rank")?;
        let (below, above): (Vec<usize>, Vec<usize>) = kept
            .into_iter()
            .partition(|&row| !groups.is_synthetic(row) && shares.get(row).map_or(false, |s| bucket.is_below(s)));
        bucketed = below;
        kept = above;
    }

    kept.sort_by(|&a, &b| {
        for (key, column) in &key_columns {
            let cmp = key.compare(&column.values()[a], &column.values()[b]);
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
    if let Some(n) = top_n {
        kept.truncate(n);
    }

    let ranked = groups.take(&kept);
    log::debug!(
        "rank kept {} of {} groups, {} bucketed",
        kept.len(),
        groups.len(),
        bucketed.len()
    );

    match other {
        Some(bucket) if !bucketed.is_empty() => append_other(ranked, groups, bucket, &bucketed),
        _ => Ok(ranked),
    }
}

fn validate_bucket(groups: &AggregateTable, bucket: &OtherBucket) -> Result<()> {
    let table = groups.table();
    let label = table.require_column(&bucket.label_column, "other bucket")?;
    if label.column_type() != ColumnType::String {
        return Err(Error::InvalidArgument(format!(
            "other bucket label column '{}' must be a string column",
            bucket.label_column
        )));
    }
    if bucket.threshold.is_nan() || bucket.threshold < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "other bucket threshold must be a non-negative percentage, got {}",
            bucket.threshold
        )));
    }
    table.require_column(&bucket.share_column, "other bucket")?;
    for column in &bucket.summed_columns {
        table.require_column(column, "other bucket")?;
    }
    Ok(())
}

fn append_other(
    mut ranked: AggregateTable,
    groups: &AggregateTable,
    bucket: &OtherBucket,
    bucketed: &[usize],
) -> Result<AggregateTable> {
    let table = groups.table();
    let mut row: HashMap<String, ColumnValue> = table
        .schema()
        .get_column_names()
        .into_iter()
        .map(|name| (name.to_string(), ColumnValue::Null))
        .collect();
    row.insert(bucket.label_column.clone(), ColumnValue::from(OTHER_LABEL));

    let summed = std::iter::once(&bucket.share_column).chain(&bucket.summed_columns);
    for name in summed {
        let column = table.require_column(name, "other bucket")?;
        let value = match column.column_type() {
            ColumnType::Int64 => ColumnValue::Int64(bucketed.iter().filter_map(|&r| column.values()[r].as_i64()).sum()),
            _ => ColumnValue::Float64(bucketed.iter().filter_map(|&r| column.get_f64(r)).sum()),
        };
        row.insert(name.clone(), value);
    }

    ranked.table.append_row(row)?;
    ranked
        .group_sizes
        .push(bucketed.iter().map(|&r| groups.group_sizes()[r]).sum());
    ranked.synthetic.push(true);
    Ok(ranked)
}

/// Labels present in both ranked tables, in the order they appear in `a`.
/// Synthetic rows never match.
pub fn common_labels(a: &AggregateTable, b: &AggregateTable, label: &str) -> Result<Vec<ColumnValue>> {
    let labels_a = a.table().require_column(label, "common_labels")?;
    let labels_b = b.table().require_column(label, "common_labels")?;

    let in_b: HashSet<GroupValue> = (0..b.len())
        .filter(|&row| !b.is_synthetic(row))
        .filter_map(|row| labels_b.get(row))
        .filter(|v| !v.is_null())
        .map(|v| GroupValue(v.clone()))
        .collect();

    let mut seen = HashSet::new();
    Ok((0..a.len())
        .filter(|&row| !a.is_synthetic(row))
        .filter_map(|row| labels_a.get(row))
        .filter(|v| in_b.contains(&GroupValue((*v).clone())))
        .filter(|v| seen.insert(GroupValue((*v).clone())))
        .cloned()
        .collect())
}

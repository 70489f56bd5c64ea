//! Row and group filters.
//!
//! A filter run resolves every `FilterSpec` against the table schema once,
//! then walks the rows and keeps those matching all specs, preserving their
//! order. Specs compose by conjunction. A set-membership spec with an empty
//! selection means "nothing selected yet" and passes every row through.

use crate::aggregate::AggregateTable;
use crate::column::{Column, ColumnType, ColumnValue, GroupValue};
use crate::error::{Error, Result};
use crate::loader::SOURCE_ROW;
use crate::table::Table;
use std::collections::HashSet;

/// A predicate over one column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// Numeric or date range, inclusive on both bounds. Nulls never match.
    Range { column: String, lo: f64, hi: f64 },
    /// Set membership. An empty `values` list selects everything.
    OneOf { column: String, values: Vec<ColumnValue> },
    /// The delimited field contains `tag` as one of its (trimmed) values.
    HasTag { column: String, tag: String, delimiter: char },
    /// Minimum underlying group size. Only valid after aggregation.
    MinCount { min: usize },
}

impl FilterSpec {
    pub fn range(column: impl Into<String>, lo: f64, hi: f64) -> Self {
        FilterSpec::Range { column: column.into(), lo, hi }
    }

    pub fn one_of<V: Into<ColumnValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        FilterSpec::OneOf {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Tag membership over a `|`-delimited column.
    pub fn has_tag(column: impl Into<String>, tag: impl Into<String>) -> Self {
        FilterSpec::HasTag {
            column: column.into(),
            tag: tag.into(),
            delimiter: '|',
        }
    }

    pub fn min_count(min: usize) -> Self {
        FilterSpec::MinCount { min }
    }

    /// True for specs that select everything (an empty membership list).
    pub fn is_pass_through(&self) -> bool {
        matches!(self, FilterSpec::OneOf { values, .. } if values.is_empty())
            || matches!(self, FilterSpec::MinCount { min: 0 })
    }

    pub fn is_post_aggregation(&self) -> bool {
        matches!(self, FilterSpec::MinCount { .. })
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            FilterSpec::Range { column, .. }
            | FilterSpec::OneOf { column, .. }
            | FilterSpec::HasTag { column, .. } => Some(column),
            FilterSpec::MinCount { .. } => None,
        }
    }
}

/// A spec resolved against a concrete column.
enum Predicate<'a> {
    Range { column: &'a Column, lo: f64, hi: f64 },
    OneOf { column: &'a Column, values: HashSet<GroupValue> },
    HasTag { column: &'a Column, tag: &'a str, delimiter: char },
}

impl Predicate<'_> {
    fn matches(&self, row: usize) -> bool {
        match self {
            Predicate::Range { column, lo, hi } => column
                .get(row)
                .and_then(ColumnValue::as_number)
                .map_or(false, |v| *lo <= v && v <= *hi),
            Predicate::OneOf { column, values } => column
                .get(row)
                .map_or(false, |v| values.contains(&GroupValue(v.clone()))),
            Predicate::HasTag { column, tag, delimiter } => match column.get(row) {
                Some(ColumnValue::Null) | None => false,
                Some(value) => value
                    .to_string()
                    .split(*delimiter)
                    .any(|t| t.trim() == tag.trim()),
            },
        }
    }
}

/// Aligns a selected value with the column type so `3` selects `3.0` in a
/// float column and vice versa.
fn coerce_selection(value: &ColumnValue, column_type: ColumnType) -> ColumnValue {
    match (value, column_type) {
        (ColumnValue::Int64(n), ColumnType::Float64) => ColumnValue::Float64(*n as f64),
        (ColumnValue::Float64(f), ColumnType::Int64) if f.fract() == 0.0 => ColumnValue::Int64(*f as i64),
        (other, _) => other.clone(),
    }
}

fn compile<'a>(table: &'a Table, specs: &'a [FilterSpec], operation: &str) -> Result<Vec<Predicate<'a>>> {
    let mut predicates = Vec::with_capacity(specs.len());
    for spec in specs {
        if spec.is_pass_through() {
            continue;
        }
        match spec {
            FilterSpec::Range { column, lo, hi } => {
                let col = table.require_column(column, operation)?;
                if !col.column_type().is_ordered_numeric() {
                    return Err(Error::InvalidArgument(format!(
                        "range filter on non-numeric column '{}'",
                        column
                    )));
                }
                predicates.push(Predicate::Range { column: col, lo: *lo, hi: *hi });
            }
            FilterSpec::OneOf { column, values } => {
                let col = table.require_column(column, operation)?;
                let values = values
                    .iter()
                    .map(|v| GroupValue(coerce_selection(v, col.column_type())))
                    .collect();
                predicates.push(Predicate::OneOf { column: col, values });
            }
            FilterSpec::HasTag { column, tag, delimiter } => {
                let col = table.require_column(column, operation)?;
                predicates.push(Predicate::HasTag { column: col, tag, delimiter: *delimiter });
            }
            FilterSpec::MinCount { .. } => {
                return Err(Error::InvalidArgument(
                    "minimum-count thresholds apply to aggregated rows; use filter_groups".to_string(),
                ));
            }
        }
    }
    Ok(predicates)
}

/// Indices of the rows matching every spec, in table order.
pub fn matching_rows(table: &Table, specs: &[FilterSpec]) -> Result<Vec<usize>> {
    let predicates = compile(table, specs, "filter")?;
    Ok((0..table.len())
        .filter(|&row| predicates.iter().all(|p| p.matches(row)))
        .collect())
}

/// Rows of `table` satisfying all `specs`, in their original order.
///
/// `MinCount` is rejected here; it is a post-aggregation threshold handled by
/// `filter_groups`.
///
/// # Examples
///
/// ```
/// use dashtable::{filter, FilterSpec, Table};
///
/// let table = Table::from_csv("orders", "Region,Sales\nEast,10\nWest,20\nSouth,5\n").unwrap();
///
/// // Nothing selected yet: every row passes
/// let all = filter(&table, &[FilterSpec::one_of("Region", Vec::<&str>::new())]).unwrap();
/// assert_eq!(all.len(), 3);
///
/// let some = filter(&table, &[
///     FilterSpec::one_of("Region", ["East", "West"]),
///     FilterSpec::range("Sales", 15.0, 100.0),
/// ]).unwrap();
/// assert_eq!(some.len(), 1);
/// ```
pub fn filter(table: &Table, specs: &[FilterSpec]) -> Result<Table> {
    let rows = matching_rows(table, specs)?;
    log::debug!("filter on '{}' kept {} of {} rows", table.name(), rows.len(), table.len());
    Ok(table.take(&rows))
}

/// Keeps the rows of an exploded table whose `source_row` is among `rows`.
///
/// Use with the indices returned by `matching_rows` on the base table when
/// the exploded table was built before filtering.
pub fn restrict_to_rows(exploded: &Table, rows: &[usize]) -> Result<Table> {
    let sources = exploded.require_column(SOURCE_ROW, "restrict_to_rows")?;
    let keep: HashSet<i64> = rows.iter().map(|&r| r as i64).collect();
    let indices: Vec<usize> = (0..exploded.len())
        .filter(|&i| {
            sources
                .get(i)
                .and_then(ColumnValue::as_i64)
                .map_or(false, |src| keep.contains(&src))
        })
        .collect();
    Ok(exploded.take(&indices))
}

/// Applies post-aggregation filters to aggregate rows.
///
/// `MinCount` compares against each row's underlying group size; `Range`
/// and `OneOf` specs test the aggregate columns (keys or metrics).
pub fn filter_groups(groups: &AggregateTable, specs: &[FilterSpec]) -> Result<AggregateTable> {
    let (thresholds, column_specs): (Vec<&FilterSpec>, Vec<&FilterSpec>) =
        specs.iter().partition(|s| s.is_post_aggregation());
    let column_specs: Vec<FilterSpec> = column_specs.into_iter().cloned().collect();

    let min = thresholds
        .iter()
        .filter_map(|s| match s {
            FilterSpec::MinCount { min } => Some(*min),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let predicates = compile(groups.table(), &column_specs, "filter_groups")?;
    let sizes = groups.group_sizes();
    let rows: Vec<usize> = (0..groups.len())
        .filter(|&row| sizes[row] >= min && predicates.iter().all(|p| p.matches(row)))
        .collect();

    log::debug!("group filter kept {} of {} groups", rows.len(), groups.len());
    Ok(groups.take(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, GroupKey, MetricDef};
    use crate::loader::explode;

    fn orders() -> Table {
        Table::from_csv(
            "orders",
            "Region,Category,Sales,Order Year\n\
             East,Furniture,100.0,2015\n\
             West,Technology,250.5,2016\n\
             East,Technology,80.0,2017\n\
             South,Office Supplies,12.5,\n",
        )
        .unwrap()
    }

    #[test]
    fn test_empty_selection_is_pass_through() {
        let table = orders();
        let result = filter(&table, &[FilterSpec::one_of("Region", Vec::<String>::new())]).unwrap();
        assert_eq!(result.len(), table.len());
    }

    #[test]
    fn test_range_is_inclusive_and_skips_nulls() {
        let table = orders();
        let result = filter(&table, &[FilterSpec::range("Order Year", 2015.0, 2016.0)]).unwrap();
        assert_eq!(result.len(), 2);

        let result = filter(&table, &[FilterSpec::range("Sales", 80.0, 100.0)]).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_specs_compose_with_and_and_keep_order() {
        let table = orders();
        let result = filter(
            &table,
            &[
                FilterSpec::one_of("Category", ["Technology", "Furniture"]),
                FilterSpec::one_of("Region", ["East"]),
            ],
        )
        .unwrap();

        let years: Vec<Option<i64>> = result
            .column("Order Year")
            .unwrap()
            .values()
            .iter()
            .map(ColumnValue::as_i64)
            .collect();
        assert_eq!(years, vec![Some(2015), Some(2017)]);
    }

    #[test]
    fn test_selection_coerces_numeric_types() {
        let table = orders();
        let result = filter(&table, &[FilterSpec::one_of("Order Year", [2016.0])]).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let table = orders();
        let err = filter(&table, &[FilterSpec::one_of("gender", ["F"])]).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { ref column, .. } if column == "gender"));

        // An empty selection is a no-op and is not validated
        assert!(filter(&table, &[FilterSpec::one_of("gender", Vec::<&str>::new())]).is_ok());
    }

    #[test]
    fn test_min_count_rejected_at_row_level() {
        let err = filter(&orders(), &[FilterSpec::min_count(2)]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_range_rejects_string_column() {
        let err = filter(&orders(), &[FilterSpec::range("Region", 0.0, 1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_has_tag_then_explode_matches_explode_then_select() {
        let table = Table::from_csv(
            "ratings",
            "title,genres,rating\nA,Action|Comedy,4\nB,Comedy,5\nC,Drama,3\nD,Action,2\n",
        )
        .unwrap();

        let titles = |t: &Table| -> HashSet<String> {
            t.column("title").unwrap().values().iter().map(|v| v.to_string()).collect()
        };

        let tagged = filter(&table, &[FilterSpec::has_tag("genres", "Comedy")]).unwrap();
        let exploded = explode(&table, "genres", '|').unwrap();
        let selected = filter(&exploded, &[FilterSpec::one_of("genres", ["Comedy"])]).unwrap();

        assert_eq!(titles(&tagged), titles(&selected));
        assert_eq!(titles(&tagged), HashSet::from(["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn test_restrict_to_rows() {
        let table = Table::from_csv("ratings", "title,genres\nA,Action|Comedy\nB,Comedy\nC,Drama\n").unwrap();
        let exploded = explode(&table, "genres", '|').unwrap();

        let rows = matching_rows(&table, &[FilterSpec::one_of("title", ["A", "C"])]).unwrap();
        let restricted = restrict_to_rows(&exploded, &rows).unwrap();
        assert_eq!(restricted.len(), 3);
        assert!(restricted
            .column("title")
            .unwrap()
            .values()
            .iter()
            .all(|t| t.as_string() != Some("B")));
    }

    #[test]
    fn test_filter_groups_min_count() {
        let table = Table::from_csv(
            "ratings",
            "genres,rating\nAction,4\nComedy,4\nComedy,5\nDrama,3\nAction,2\n",
        )
        .unwrap();
        let groups = aggregate(
            &table,
            &GroupKey::new(["genres"]),
            &[MetricDef::mean("mean_rating", "rating"), MetricDef::size("n")],
        )
        .unwrap();

        let kept = filter_groups(&groups, &[FilterSpec::min_count(2)]).unwrap();
        let labels: Vec<String> = kept.table().column("genres").unwrap().values().iter().map(|v| v.to_string()).collect();
        assert_eq!(labels, vec!["Action", "Comedy"]);

        let high = filter_groups(&groups, &[FilterSpec::range("mean_rating", 3.5, 5.0)]).unwrap();
        assert_eq!(high.len(), 1);
    }
}

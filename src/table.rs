//! Immutable columnar tables.
//!
//! A Table is a collection of equally long columns described by a `Schema`.
//! Tables are built once (from CSV or row by row) and never edited in place
//! afterwards: selecting rows or deriving a column produces a new table.
//!
//! # Examples
//!
//! ```
//! use dashtable::{ColumnValue, Table};
//!
//! let csv = "title,rating\nHeat,4\nAlien,5";
//! let table = Table::from_csv("ratings", csv).unwrap();
//!
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.get_value(1, "title").unwrap(), &ColumnValue::from("Alien"));
//! ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Cells that read as null regardless of column type.
const NULL_TOKENS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Schema definition with column names and types.
///
/// A schema defines the structure of a table, specifying the name, type,
/// and nullability of each column. Column names are unique.
///
/// # Examples
///
/// ```
/// use dashtable::{ColumnType, Schema};
///
/// let schema = Schema::new(vec![
///     ("title".to_string(), ColumnType::String, false),
///     ("rating".to_string(), ColumnType::Float64, true),
/// ]);
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.get_column_index("rating"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType, bool)>, // (name, type, nullable)
}

impl Schema {
    /// Creates a new schema with the specified columns.
    ///
    /// When a name repeats, the later entry is dropped; use `try_new` to
    /// reject such schemas instead.
    pub fn new(columns: Vec<(String, ColumnType, bool)>) -> Self {
        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .filter(|(name, _, _)| seen.insert(name.clone()))
            .collect();
        Schema { columns }
    }

    /// Creates a schema, failing on the first duplicated column name.
    pub fn try_new(columns: Vec<(String, ColumnType, bool)>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (name, _, _) in &columns {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateColumn(name.clone()));
            }
        }
        Ok(Schema { columns })
    }

    /// Returns the number of columns in the schema.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns a list of all column names.
    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    /// Returns the index of a column by name, or None if not found.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    /// Returns the type of a column by name, or None if not found.
    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, ty, _)| *ty)
    }

    /// Index of a column an operation depends on.
    pub fn require(&self, name: &str, operation: &str) -> Result<usize> {
        self.get_column_index(name)
            .ok_or_else(|| Error::schema_mismatch(name, operation))
    }

    fn push(&mut self, name: &str, column_type: ColumnType, nullable: bool) -> Result<()> {
        if self.contains(name) {
            return Err(Error::DuplicateColumn(name.to_string()));
        }
        self.columns.push((name.to_string(), column_type, nullable));
        Ok(())
    }
}

/// Root table owning its data.
#[derive(Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create an empty table for the schema. Rows are added with
    /// `append_row` while the table is being built.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        let columns = schema
            .columns
            .iter()
            .map(|(col_name, col_type, _)| Column::new(col_name.clone(), *col_type))
            .collect();

        Table {
            name: name.into(),
            schema,
            columns,
            row_count: 0,
        }
    }

    /// Assemble a table from finished columns.
    ///
    /// All columns must have the same length and distinct names. Columns are
    /// nullable.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut schema = Schema { columns: Vec::with_capacity(columns.len()) };
        for column in &columns {
            if column.len() != row_count {
                return Err(Error::InvalidArgument(format!(
                    "column '{}' has {} values, expected {}",
                    column.name(),
                    column.len(),
                    row_count
                )));
            }
            schema.push(column.name(), column.column_type(), true)?;
        }

        Ok(Table {
            name: name.into(),
            schema,
            columns,
            row_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.schema.get_column_index(name).map(|idx| &self.columns[idx])
    }

    /// Column lookup for an operation that cannot run without it.
    pub fn require_column(&self, name: &str, operation: &str) -> Result<&Column> {
        let idx = self.schema.require(name, operation)?;
        Ok(&self.columns[idx])
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<&ColumnValue> {
        let col = self.require_column(column, "get_value")?;
        col.get(row).ok_or_else(|| {
            Error::InvalidArgument(format!("row {} out of range [0, {})", row, self.row_count))
        })
    }

    pub fn append_row(&mut self, row: HashMap<String, ColumnValue>) -> Result<()> {
        // Validate all columns are present
        for col_name in self.schema.get_column_names() {
            if !row.contains_key(col_name) {
                return Err(Error::InvalidArgument(format!(
                    "missing value for column '{}'",
                    col_name
                )));
            }
        }

        let mut row = row;
        for col in self.columns.iter_mut() {
            let value = row.remove(col.name()).unwrap_or(ColumnValue::Null);
            col.push(value)?;
        }

        self.row_count += 1;
        Ok(())
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            schema: self.schema.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            row_count: indices.len(),
        }
    }

    /// New table with one extra derived column.
    pub fn with_column(&self, column: Column) -> Result<Table> {
        if column.len() != self.row_count {
            return Err(Error::InvalidArgument(format!(
                "derived column '{}' has {} values, table has {} rows",
                column.name(),
                column.len(),
                self.row_count
            )));
        }
        let mut schema = self.schema.clone();
        schema.push(column.name(), column.column_type(), true)?;

        let mut columns = self.columns.clone();
        columns.push(column);
        Ok(Table {
            name: self.name.clone(),
            schema,
            columns,
            row_count: self.row_count,
        })
    }

    /// New table with an existing column replaced by `column` (same name).
    pub fn replace_column(&self, column: Column) -> Result<Table> {
        let idx = self.schema.require(column.name(), "replace_column")?;
        if column.len() != self.row_count {
            return Err(Error::InvalidArgument(format!(
                "replacement column '{}' has {} values, table has {} rows",
                column.name(),
                column.len(),
                self.row_count
            )));
        }
        let mut schema = self.schema.clone();
        schema.columns[idx].1 = column.column_type();

        let mut columns = self.columns.clone();
        columns[idx] = column;
        Ok(Table {
            name: self.name.clone(),
            schema,
            columns,
            row_count: self.row_count,
        })
    }

    // ========================================================================
    // Aggregation Methods
    // ========================================================================

    /// Find the minimum numeric (or date) value in a column.
    pub fn min(&self, column: &str) -> Result<Option<f64>> {
        let col = self.require_column(column, "min")?;
        Ok(col.values().iter().filter_map(ColumnValue::as_number).reduce(f64::min))
    }

    // ========================================================================
    // Serialization Methods
    // ========================================================================

    /// Export table to CSV format.
    ///
    /// Returns a CSV string with headers and data rows.
    /// NULL values become empty strings.
    /// Strings containing commas, quotes, or newlines are properly escaped.
    pub fn to_csv(&self) -> String {
        let mut result = String::new();
        let header: Vec<String> = self
            .schema
            .get_column_names()
            .iter()
            .map(|name| escape_csv_field(name))
            .collect();
        result.push_str(&header.join(","));
        result.push('\n');

        for row in 0..self.row_count {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| match &col.values()[row] {
                    ColumnValue::String(s) => escape_csv_field(s),
                    other => other.to_string(),
                })
                .collect();
            result.push_str(&values.join(","));
            result.push('\n');
        }
        result
    }

    /// Export table to JSON format (array of objects).
    ///
    /// Returns a pretty-printed JSON string representing the table as an array
    /// of objects, where each object is a row with column names as keys.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value())?)
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = (0..self.row_count)
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .map(|col| (col.name().to_string(), col.values()[row].to_json_value()))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    /// Create a table from a CSV string.
    ///
    /// The first line is treated as the header row containing column names.
    /// Column types are inferred from every non-empty cell of a column:
    /// - all integers → INT64
    /// - all numbers → FLOAT64
    /// - all "true"/"false" (case-insensitive) → BOOL
    /// - all ISO dates (YYYY-MM-DD) → DATE
    /// - everything else → STRING
    ///
    /// Empty cells and the usual missing-value markers (`NA`, `NaN`, `null`)
    /// are NULL. Short rows are padded with NULL.
    pub fn from_csv(name: &str, csv: &str) -> Result<Table> {
        // Parse all rows at once to handle multi-line quoted fields
        let mut all_rows = parse_csv_rows(csv);

        if all_rows.is_empty() {
            return Err(Error::unavailable(name, "CSV is empty"));
        }

        // First row is the header
        let column_names: Vec<String> = all_rows
            .remove(0)
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        if column_names.iter().all(|h| h.is_empty()) {
            return Err(Error::unavailable(name, "CSV header is empty"));
        }

        // Filter out empty rows
        let rows: Vec<Vec<String>> = all_rows
            .into_iter()
            .filter(|row| !row.iter().all(|f| f.trim().is_empty()))
            .collect();

        let ragged = rows.iter().filter(|r| r.len() != column_names.len()).count();
        if ragged > 0 {
            log::warn!(
                "{}: {} row(s) do not have {} fields; missing cells read as null",
                name,
                ragged,
                column_names.len()
            );
        }

        let mut columns = Vec::with_capacity(column_names.len());
        for (idx, col_name) in column_names.iter().enumerate() {
            let cells: Vec<&str> = rows
                .iter()
                .map(|r| r.get(idx).map(|s| s.as_str()).unwrap_or(""))
                .collect();
            let col_type = infer_column_type(&cells);
            let values = cells
                .iter()
                .map(|cell| parse_csv_value(cell, col_type))
                .collect();
            columns.push(Column::from_values(col_name.clone(), col_type, values)?);
        }

        Table::from_columns(name, columns)
    }
}

// ============================================================================
// Helper functions for serialization
// ============================================================================

/// Convert days since Unix epoch (1970-01-01) to (year, month, day)
pub(crate) fn ymd_from_days(days: i32) -> (i32, u32, u32) {
    // Algorithm from https://howardhinnant.github.io/date_algorithms.html
    let z = days + 719468;
    let era = if z >= 0 { z / 146097 } else { (z - 146096) / 146097 };
    let doe = (z - era * 146097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = (yoe as i32) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year, m, d)
}

/// Convert (year, month, day) to days since Unix epoch
pub(crate) fn days_from_ymd(year: i32, month: u32, day: u32) -> i32 {
    // Algorithm from https://howardhinnant.github.io/date_algorithms.html
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y / 400 } else { (y - 399) / 400 };
    let yoe = (y - era * 400) as u32;
    let m = month;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146097 + doe as i32) - 719468
}

/// Format a date (days since epoch) as ISO 8601 date string (YYYY-MM-DD)
pub(crate) fn format_date(days: i32) -> String {
    let (year, month, day) = ymd_from_days(days);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

fn valid_ymd(year: i32, month: u32, day: u32) -> Option<i32> {
    if !(1..=12).contains(&month) || day < 1 {
        return None;
    }
    let days_in_month = match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    };
    if day > days_in_month {
        return None;
    }
    Some(days_from_ymd(year, month, day))
}

/// Parse an ISO 8601 date string (YYYY-MM-DD) to days since epoch
fn parse_iso_date(s: &str) -> Option<i32> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 3 || parts[0].len() != 4 {
        return None;
    }
    let year: i32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    valid_ymd(year, month, day)
}

/// Parse a US-style M/D/YYYY date to days since epoch
fn parse_us_date(s: &str) -> Option<i32> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    let month: u32 = parts[0].parse().ok()?;
    let day: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;
    valid_ymd(year, month, day)
}

/// Parse a date or datetime string to days since epoch.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS[Z]`
/// and `M/D/YYYY`; the time of day is discarded.
pub(crate) fn parse_date(s: &str) -> Option<i32> {
    let s = s.trim();
    let date_part = s.split(|c| c == 'T' || c == ' ').next()?;
    parse_iso_date(date_part).or_else(|| parse_us_date(date_part))
}

/// Days since epoch for a Unix timestamp in seconds.
pub(crate) fn days_from_epoch_seconds(secs: i64) -> Option<i32> {
    i32::try_from(secs.div_euclid(86_400)).ok()
}

fn escape_csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Parse a CSV string into rows, handling quoted fields with embedded newlines
fn parse_csv_rows(csv: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut current_row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = csv.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // Check for escaped quote (double quote)
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current_field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if !in_quotes => {
                in_quotes = true;
            }
            ',' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
            }
            '\n' if !in_quotes => {
                current_row.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut current_row));
            }
            '\r' if !in_quotes => {
                // Skip \r, will be followed by \n
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    // Don't forget the last field/row
    if !current_field.is_empty() || !current_row.is_empty() {
        current_row.push(current_field);
        rows.push(current_row);
    }

    rows
}

fn is_null_token(trimmed: &str) -> bool {
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed)
}

/// Infer a column type from all of its cells
fn infer_column_type(cells: &[&str]) -> ColumnType {
    let mut could_be_int = true;
    let mut could_be_float = true;
    let mut could_be_bool = true;
    let mut could_be_date = true;
    let mut seen_value = false;

    for cell in cells {
        let trimmed = cell.trim();
        if is_null_token(trimmed) {
            continue;
        }
        seen_value = true;
        could_be_int &= trimmed.parse::<i64>().is_ok();
        could_be_float &= trimmed.parse::<f64>().is_ok();
        could_be_bool &= trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false");
        could_be_date &= trimmed.len() == 10 && parse_iso_date(trimmed).is_some();
    }

    if !seen_value {
        ColumnType::String
    } else if could_be_int {
        ColumnType::Int64
    } else if could_be_float {
        ColumnType::Float64
    } else if could_be_bool {
        ColumnType::Bool
    } else if could_be_date {
        ColumnType::Date
    } else {
        ColumnType::String
    }
}

/// Parse a CSV value into a ColumnValue based on expected type.
/// Cells that do not parse become NULL.
fn parse_csv_value(value: &str, col_type: ColumnType) -> ColumnValue {
    let trimmed = value.trim();

    if is_null_token(trimmed) {
        return ColumnValue::Null;
    }

    match col_type {
        ColumnType::Int64 => trimmed.parse::<i64>().map(ColumnValue::Int64).ok().into(),
        ColumnType::Float64 => trimmed.parse::<f64>().map(ColumnValue::Float64).ok().into(),
        ColumnType::Bool => {
            if trimmed.eq_ignore_ascii_case("true") {
                ColumnValue::Bool(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                ColumnValue::Bool(false)
            } else {
                ColumnValue::Null
            }
        }
        ColumnType::Date => parse_date(trimmed).map(ColumnValue::Date).into(),
        ColumnType::String => ColumnValue::String(trimmed.to_string()),
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.schema.len(),
            self.row_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_basic() {
        let schema = Schema::new(vec![
            ("user_id".to_string(), ColumnType::Int64, false),
            ("title".to_string(), ColumnType::String, false),
            ("rating".to_string(), ColumnType::Float64, true),
        ]);

        let mut table = Table::new("ratings", schema);

        let mut row = HashMap::new();
        row.insert("user_id".to_string(), ColumnValue::Int64(1));
        row.insert("title".to_string(), ColumnValue::String("Heat".to_string()));
        row.insert("rating".to_string(), ColumnValue::Float64(4.0));
        table.append_row(row).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get_value(0, "title").unwrap().as_string(), Some("Heat"));
    }

    #[test]
    fn test_append_row_requires_every_column() {
        let schema = Schema::new(vec![
            ("a".to_string(), ColumnType::Int64, false),
            ("b".to_string(), ColumnType::Int64, false),
        ]);
        let mut table = Table::new("t", schema);

        let mut row = HashMap::new();
        row.insert("a".to_string(), ColumnValue::Int64(1));
        assert!(table.append_row(row).is_err());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = Schema::try_new(vec![
            ("Sales".to_string(), ColumnType::Float64, true),
            ("Sales".to_string(), ColumnType::Float64, true),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(name) if name == "Sales"));
    }

    #[test]
    fn test_from_csv_infers_types() {
        let csv = "movie_id,title,rating,seen,released\n\
                   1,\"Heat, Director's Cut\",4.5,true,1995-12-15\n\
                   2,Alien,5,false,1979-05-25\n";
        let table = Table::from_csv("movies", csv).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.schema().get_column_type("movie_id"), Some(ColumnType::Int64));
        assert_eq!(table.schema().get_column_type("rating"), Some(ColumnType::Float64));
        assert_eq!(table.schema().get_column_type("seen"), Some(ColumnType::Bool));
        assert_eq!(table.schema().get_column_type("released"), Some(ColumnType::Date));
        assert_eq!(
            table.get_value(0, "title").unwrap().as_string(),
            Some("Heat, Director's Cut")
        );
        assert_eq!(table.get_value(1, "rating").unwrap().as_f64(), Some(5.0));
    }

    #[test]
    fn test_from_csv_nulls_and_short_rows() {
        let csv = "age,gender\n25,F\nNA,M\n31\n";
        let table = Table::from_csv("users", csv).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.schema().get_column_type("age"), Some(ColumnType::Int64));
        assert!(table.get_value(1, "age").unwrap().is_null());
        assert!(table.get_value(2, "gender").unwrap().is_null());
    }

    #[test]
    fn test_from_csv_empty_is_unavailable() {
        let err = Table::from_csv("empty", "").unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn test_from_csv_duplicate_header() {
        let err = Table::from_csv("dup", "a,a\n1,2\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(_)));
    }

    #[test]
    fn test_csv_export_escapes() {
        let table = Table::from_columns(
            "out",
            vec![
                Column::from_values("label", ColumnType::String, vec!["a,b".into(), "plain".into()]).unwrap(),
                Column::from_values("n", ColumnType::Int64, vec![1i64.into(), ColumnValue::Null]).unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(table.to_csv(), "label,n\n\"a,b\",1\nplain,\n");
    }

    #[test]
    fn test_take_and_with_column() {
        let table = Table::from_csv("t", "x\n10\n20\n30\n").unwrap();
        let subset = table.take(&[2, 0]);
        assert_eq!(subset.get_value(0, "x").unwrap().as_i64(), Some(30));

        let doubled = Column::from_values(
            "double_x",
            ColumnType::Int64,
            vec![60i64.into(), 20i64.into()],
        )
        .unwrap();
        let derived = subset.with_column(doubled).unwrap();
        assert_eq!(derived.schema().get_column_names(), vec!["x", "double_x"]);

        let clash = Column::from_values("x", ColumnType::Int64, vec![0i64.into(), 0i64.into()]).unwrap();
        assert!(matches!(derived.with_column(clash), Err(Error::DuplicateColumn(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("1970-01-02"), Some(1));
        assert_eq!(parse_date("2016-11-08"), parse_date("11/8/2016"));
        assert_eq!(parse_date("2000-03-01 12:30:00"), parse_date("2000-03-01T00:00:00Z"));
        assert_eq!(parse_date("2019-02-30"), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(format_date(days_from_ymd(2024, 2, 29)), "2024-02-29");
        assert_eq!(days_from_epoch_seconds(86_400 * 3 + 5), Some(3));
    }

    #[test]
    fn test_min_skips_nulls_and_reads_dates() {
        let table = Table::from_csv("s", "Sales,Order Date\n10.5,2015-01-03\n,1970-01-02\n-2,\n").unwrap();
        assert_eq!(table.min("Sales").unwrap(), Some(-2.0));
        assert_eq!(table.min("Order Date").unwrap(), Some(1.0));
        assert!(matches!(table.min("Profit"), Err(Error::SchemaMismatch { .. })));
    }
}

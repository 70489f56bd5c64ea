/// dashtable - Aggregation and Filtering Engine for Analytics Dashboards
///
/// Turns a raw ratings or sales table into the summary rows a dashboard
/// chart displays: load and normalize, filter, group and aggregate, then
/// rank, truncate and bucket. Every stage is a pure function returning a new
/// immutable table.

pub mod error;
pub mod column;
pub mod table;
pub mod loader;
pub mod filter;
pub mod aggregate;
pub mod rank;
pub mod report;

pub use error::{Error, Result};
pub use column::{Column, ColumnType, ColumnValue};
pub use table::{Schema, Table};
pub use loader::{bin_numeric, explode, load, load_str, Capabilities, Dataset, DatasetCache, LoadOptions, SOURCE_ROW};
pub use filter::{filter, filter_groups, matching_rows, restrict_to_rows, FilterSpec};
pub use aggregate::{aggregate, pearson, summarize, AggregateTable, Edges, GroupKey, MetricDef, MetricKind, Window};
pub use rank::{common_labels, rank, OtherBucket, SortKey, SortOrder, OTHER_LABEL};
pub use report::{write_report, Report, ReportConfig};

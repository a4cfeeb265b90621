//! Rows written by the workflow and the textual form of rows read back.

use std::fmt::{self, Display, Write as _};

use chrono::{DateTime, Utc};
use scylla::value::{CqlTimestamp, CqlValue, Row};

/// Header printed above the scanned rows.
pub const HEADER: &str = "key\t|\tcolumn1\t|\tcolumn2";

/// Separator printed between the header and the rows.
pub const SEPARATOR: &str = "---\t----\t----";

/// Clustering value shared by every seed row.
pub const CLUSTERING_VALUE: &str = "a";

/// Value written to the `timestamp` column, in one of two client-side representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    /// Raw integer: milliseconds since unix epoch, the unit of the CQL `timestamp` type.
    EpochMillis(i64),
    /// Native date-time, truncated to milliseconds by the column type.
    DateTime(DateTime<Utc>),
}

impl TimeValue {
    /// The value the database stores for this timestamp.
    pub fn to_cql(self) -> CqlTimestamp {
        match self {
            TimeValue::EpochMillis(millis) => CqlTimestamp(millis),
            TimeValue::DateTime(datetime) => CqlTimestamp::from(datetime),
        }
    }
}

impl Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::EpochMillis(millis) => write!(f, "{millis}"),
            TimeValue::DateTime(datetime) => write!(f, "{datetime}"),
        }
    }
}

/// How a seed row is sent to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertStyle {
    /// Ad-hoc statement with bound values.
    Simple,
    /// Previously prepared statement.
    Prepared,
}

/// One row inserted by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRow {
    /// Partition key.
    pub key: &'static str,
    /// Clustering column.
    pub column1: &'static str,
    /// Timestamp column.
    pub column2: TimeValue,
    /// Statement form used for the insert.
    pub style: InsertStyle,
}

impl SeedRow {
    /// Bound values in the order of the insert's markers.
    pub fn values(&self) -> Vec<CqlValue> {
        vec![
            CqlValue::Text(self.key.to_owned()),
            CqlValue::Text(self.column1.to_owned()),
            CqlValue::Timestamp(self.column2.to_cql()),
        ]
    }

    /// Whether `row`, as read back from the table, holds exactly this seed.
    pub fn matches(&self, row: &Row) -> bool {
        match row.columns.as_slice() {
            [Some(CqlValue::Text(key)), Some(CqlValue::Text(column1)), Some(CqlValue::Timestamp(ts))] => {
                key == self.key && column1 == self.column1 && *ts == self.column2.to_cql()
            }
            _ => false,
        }
    }
}

/// The four rows of a run, all derived from a single clock reading.
///
/// Every combination of statement style and timestamp representation
/// appears once, each under its own partition key.
pub fn seed_rows(now: DateTime<Utc>) -> [SeedRow; 4] {
    let epoch = TimeValue::EpochMillis(now.timestamp_millis());
    let native = TimeValue::DateTime(now);

    [
        SeedRow {
            key: "simple",
            column1: CLUSTERING_VALUE,
            column2: epoch,
            style: InsertStyle::Simple,
        },
        SeedRow {
            key: "prepared",
            column1: CLUSTERING_VALUE,
            column2: epoch,
            style: InsertStyle::Prepared,
        },
        SeedRow {
            key: "d_simple",
            column1: CLUSTERING_VALUE,
            column2: native,
            style: InsertStyle::Simple,
        },
        SeedRow {
            key: "d_prepared",
            column1: CLUSTERING_VALUE,
            column2: native,
            style: InsertStyle::Prepared,
        },
    ]
}

/// Tab-joined cells of a row, in column order.
pub fn render_row(row: &Row) -> String {
    let mut line = String::new();
    for (i, cell) in row.columns.iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        // Writing into a String can't fail
        let _ = write!(line, "{}", CellDisplayer(cell.as_ref()));
    }
    line
}

struct CellDisplayer<'a>(Option<&'a CqlValue>);

impl Display for CellDisplayer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(value) = self.0 else {
            return write!(f, "null");
        };
        match value {
            CqlValue::Ascii(s) | CqlValue::Text(s) => write!(f, "{s}"),
            CqlValue::Timestamp(ts) => {
                let datetime: Result<DateTime<Utc>, _> = (*ts).try_into();
                match datetime {
                    Ok(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S%.3f")),
                    // Outside of chrono's range, fall back to raw millis
                    Err(_) => write!(f, "{}", ts.0),
                }
            }
            CqlValue::Boolean(b) => write!(f, "{b}"),
            CqlValue::Int(i) => write!(f, "{i}"),
            CqlValue::BigInt(i) => write!(f, "{i}"),
            CqlValue::SmallInt(i) => write!(f, "{i}"),
            CqlValue::TinyInt(i) => write!(f, "{i}"),
            CqlValue::Float(x) => write!(f, "{x}"),
            CqlValue::Double(x) => write!(f, "{x}"),
            CqlValue::Uuid(uuid) => write!(f, "{uuid}"),
            CqlValue::Inet(addr) => write!(f, "{addr}"),
            other => write!(f, "{other:?}"),
        }
    }
}

use super::Target;
use crate::Result;
use crate::values::SqlValue;

/// Columns and rows returned by one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: impl IntoIterator<Item = SqlValue>) -> Self {
        self.rows.push(row.into_iter().collect());
        self
    }

    /// First column of the first row, if any.
    #[must_use]
    pub fn first_value(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// A pooled handle to one database.
pub trait Session: Send + Sync + 'static {
    /// Lightweight liveness probe.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Run a query and return every row.
    fn query(&self, sql: &str) -> impl Future<Output = Result<QueryResult>> + Send;

    /// Release the handle. Further use fails.
    fn close(&self);
}

/// Opens sessions to targets.
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    fn connect(&self, target: &Target) -> impl Future<Output = Result<Self::Session>> + Send;
}

//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// Every [`Model`](crate::Model) implements this so relation queries can map
/// the rows they fetch. Columns are looked up by name; relation queries select
/// the model's columns under their own names.
///
/// # Example
///
/// ```ignore
/// use pgassoc::{FromRow, OrmResult, Ref, RowExt};
///
/// struct Bar {
///     key: i64,
///     name: String,
///     parent: Option<Ref<Bar>>,
/// }
///
/// impl FromRow for Bar {
///     fn from_row(row: &tokio_postgres::Row) -> OrmResult<Self> {
///         Ok(Self {
///             key: row.try_get_column("key")?,
///             name: row.try_get_column("name")?,
///             parent: row.try_get_column("parent")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }
}

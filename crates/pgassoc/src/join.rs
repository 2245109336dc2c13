//! Many-to-many relations through a join table.
//!
//! A [`JoinTable<A, B>`] pairs a [`JoinShape`] (which table links `A` and `B`,
//! and through which columns) with the [`JoinQueries`] derived from it. Shapes
//! come from one of the composition strategies:
//!
//! - [`JoinTable::external`]: a dedicated table named after both models
//!   (`bar_foo` for `Foo`/`Bar`, whatever the declaration order), with columns
//!   `<table>_<primary key>`.
//! - [`JoinTable::reverse`]: the same table seen from the other side.
//! - [`JoinTable::through`] / [`JoinTable::through_via`]: an existing model
//!   holding one reference to each side, found by type or named explicitly.
//!   Such a table has columns of its own, so it is always read-only here.
//! - [`JoinTable::named`] / [`JoinTable::from_shape`]: an explicitly described
//!   table, e.g. for self-joins.
//!
//! ```ignore
//! use pgassoc::JoinTable;
//!
//! let foo_bars = JoinTable::<Foo, Bar>::external()?;
//! let bar_foos = foo_bars.reverse()?;
//! assert_eq!(foo_bars.shape().table_name, "bar_foo");
//! # Ok::<(), pgassoc::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::{quote, quote_qualified};
use crate::locate::{locate_column_any, locate_reference_any};
use crate::model::{Model, model_name, primary_key_column, select_fragment, select_list, validate_schema};
use std::fmt;
use std::marker::PhantomData;

/// Alias under which batch lookups return the `A` key each row belongs to.
pub(crate) const JOIN_PARENT_KEY_ALIAS: &str = "__pgassoc_parent_key";

/// The physical layout of a join table linking `A` rows to `B` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinShape {
    /// Join table name.
    pub table_name: String,
    /// Whether rows may be inserted/deleted through the relation.
    pub allow_modification: bool,
    /// Join table column holding `A`'s key.
    pub column_a: String,
    /// `A`'s primary key column.
    pub key_a: String,
    /// Join table column holding `B`'s key.
    pub column_b: String,
    /// `B`'s primary key column.
    pub key_b: String,
}

impl JoinShape {
    /// The same table seen from `B`'s side.
    pub fn reversed(&self) -> JoinShape {
        JoinShape {
            table_name: self.table_name.clone(),
            allow_modification: self.allow_modification,
            column_a: self.column_b.clone(),
            key_a: self.key_b.clone(),
            column_b: self.column_a.clone(),
            key_b: self.key_a.clone(),
        }
    }

    fn validate<A: Model, B: Model>(&self) -> OrmResult<()> {
        for name in [&self.table_name, &self.column_a, &self.column_b] {
            quote(name).map_err(|e| {
                OrmError::schema(format!("join table {}: {e}", self.table_name))
            })?;
        }
        if self.column_a == self.column_b {
            return Err(OrmError::schema(format!(
                "join table {} uses column '{}' for both {} and {}; name the columns explicitly",
                self.table_name,
                self.column_a,
                model_name::<A>(),
                model_name::<B>()
            )));
        }
        if self.key_a != primary_key_column::<A>()? || self.key_b != primary_key_column::<B>()? {
            return Err(OrmError::schema(format!(
                "join table {}: keys ({}, {}) must be the primary keys of {} and {}",
                self.table_name,
                self.key_a,
                self.key_b,
                model_name::<A>(),
                model_name::<B>()
            )));
        }
        Ok(())
    }
}

/// SQL derived from a [`JoinShape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinQueries {
    /// `B` rows linked to one `A`; binds `A`'s key as `$1`.
    pub lookup: String,
    /// Insert a link unless it exists; binds `(a, b, a, b)`.
    pub add: String,
    /// Delete a link; binds `(a, b)`.
    pub remove: String,
    pub(crate) batch_lookup: String,
}

impl JoinQueries {
    /// Derive the lookup/add/remove statements for `shape` between `A` and `B`.
    pub fn derive<A: Model, B: Model>(shape: &JoinShape) -> OrmResult<Self> {
        validate_schema::<A>()?;
        validate_schema::<B>()?;
        let jt = quote(&shape.table_name)?;
        let col_a = quote(&shape.column_a)?;
        let col_b = quote(&shape.column_b)?;
        let jt_a = quote_qualified(&shape.table_name, &shape.column_a)?;
        let jt_b = quote_qualified(&shape.table_name, &shape.column_b)?;
        let b_key = quote_qualified(B::TABLE, &shape.key_b)?;

        let join = format!("JOIN {jt} ON {jt_b} = {b_key}");
        let lookup = format!("{} {join} WHERE {jt_a} = $1", select_fragment::<B>()?);
        let batch_lookup = format!(
            "SELECT {jt_a} AS {}, {} FROM {} {join} WHERE {jt_a} = ANY($1)",
            quote(JOIN_PARENT_KEY_ALIAS)?,
            select_list::<B>()?,
            quote(B::TABLE)?
        );

        let (add, remove) = if shape.allow_modification {
            (
                format!(
                    "INSERT INTO {jt} ({col_a}, {col_b}) SELECT $1, $2 \
                     WHERE NOT EXISTS (SELECT 1 FROM {jt} WHERE {col_a} = $3 AND {col_b} = $4)"
                ),
                format!("DELETE FROM {jt} WHERE {col_a} = $1 AND {col_b} = $2"),
            )
        } else {
            let refused = read_only_statement(&shape.table_name)?;
            (refused.clone(), refused)
        };

        Ok(Self {
            lookup,
            add,
            remove,
            batch_lookup,
        })
    }
}

/// A statement the database is certain to reject.
///
/// It targets a relation that cannot exist, so it fails while being prepared,
/// before any parameter is looked at, with an error naming the join table.
fn read_only_statement(table: &str) -> OrmResult<String> {
    Ok(format!(
        "UPDATE {} SET refused = $1",
        quote(&format!("{table} is a read-only join table"))?
    ))
}

/// A many-to-many relation from `A` to `B`.
pub struct JoinTable<A: Model, B: Model> {
    shape: JoinShape,
    queries: JoinQueries,
    _marker: PhantomData<fn() -> (A, B)>,
}

impl<A: Model, B: Model> JoinTable<A, B> {
    /// A dedicated join table named after both models.
    ///
    /// The name is the two table names sorted and joined with `_`, so declaring
    /// `(A, B)` and `(B, A)` agree on the table.
    pub fn external() -> OrmResult<Self> {
        validate_schema::<A>()?;
        validate_schema::<B>()?;

        let mut tables = [A::TABLE, B::TABLE];
        tables.sort_unstable();
        let key_a = primary_key_column::<A>()?;
        let key_b = primary_key_column::<B>()?;

        Self::from_shape(JoinShape {
            table_name: tables.join("_"),
            allow_modification: true,
            column_a: format!("{}_{}", A::TABLE, key_a),
            key_a: key_a.to_string(),
            column_b: format!("{}_{}", B::TABLE, key_b),
            key_b: key_b.to_string(),
        })
    }

    /// An explicitly named, modifiable join table.
    pub fn named(table: &str, column_a: &str, column_b: &str) -> OrmResult<Self> {
        validate_schema::<A>()?;
        validate_schema::<B>()?;
        Self::from_shape(JoinShape {
            table_name: table.to_string(),
            allow_modification: true,
            column_a: column_a.to_string(),
            key_a: primary_key_column::<A>()?.to_string(),
            column_b: column_b.to_string(),
            key_b: primary_key_column::<B>()?.to_string(),
        })
    }

    /// Join through an existing model `J` holding exactly one reference to `A` and one to `B`.
    ///
    /// The resulting relation never inserts or deletes `J` rows: its add/remove
    /// statements are rejected by the database.
    pub fn through<J: Model>() -> OrmResult<Self> {
        validate_schema::<J>()?;
        let column_a = locate_reference_any::<J, A>()?;
        let column_b = locate_reference_any::<J, B>()?;
        Self::through_columns::<J>(column_a, column_b)
    }

    /// Join through explicitly named reference columns of `J`.
    ///
    /// Needed when `J` references a side more than once, e.g. a self-join
    /// through a model with two `Ref<Bar>` columns. Read-only like [`JoinTable::through`].
    pub fn through_via<J: Model>(column_a: &str, column_b: &str) -> OrmResult<Self> {
        validate_schema::<J>()?;
        let column_a = locate_column_any::<J, A>(column_a)?;
        let column_b = locate_column_any::<J, B>(column_b)?;
        Self::through_columns::<J>(column_a, column_b)
    }

    fn through_columns<J: Model>(column_a: usize, column_b: usize) -> OrmResult<Self> {
        validate_schema::<A>()?;
        validate_schema::<B>()?;
        Self::from_shape(JoinShape {
            table_name: J::TABLE.to_string(),
            allow_modification: false,
            column_a: J::COLUMNS[column_a].name().to_string(),
            key_a: primary_key_column::<A>()?.to_string(),
            column_b: J::COLUMNS[column_b].name().to_string(),
            key_b: primary_key_column::<B>()?.to_string(),
        })
    }

    /// Build the relation from a complete shape.
    pub fn from_shape(shape: JoinShape) -> OrmResult<Self> {
        validate_schema::<A>()?;
        validate_schema::<B>()?;
        shape.validate::<A, B>()?;
        let queries = JoinQueries::derive::<A, B>(&shape)?;

        tracing::debug!(
            target: "pgassoc.relation",
            a = model_name::<A>(),
            b = model_name::<B>(),
            table = %shape.table_name,
            column_a = %shape.column_a,
            column_b = %shape.column_b,
            allow_modification = shape.allow_modification,
            sql = %queries.lookup,
            "declared join-table relation"
        );

        Ok(Self {
            shape,
            queries,
            _marker: PhantomData,
        })
    }

    /// The same relation from `B` to `A`, over the same table.
    pub fn reverse(&self) -> OrmResult<JoinTable<B, A>> {
        JoinTable::from_shape(self.shape.reversed())
    }

    pub fn shape(&self) -> &JoinShape {
        &self.shape
    }

    pub fn queries(&self) -> &JoinQueries {
        &self.queries
    }

    pub fn allows_modification(&self) -> bool {
        self.shape.allow_modification
    }
}

impl<A: Model, B: Model> Clone for JoinTable<A, B> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape.clone(),
            queries: self.queries.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A: Model, B: Model> fmt::Debug for JoinTable<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinTable")
            .field("a", &model_name::<A>())
            .field("b", &model_name::<B>())
            .field("shape", &self.shape)
            .finish()
    }
}

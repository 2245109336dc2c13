//! Record metadata.
//!
//! A [`Model`] describes how a Rust struct maps onto a table: the table name,
//! the ordered column list, which column is the primary key, and which columns
//! hold [`Ref`](crate::Ref)s to other models. The column list is an explicit
//! schema descriptor; relation declarations search it instead of inspecting
//! the struct.
//!
//! # Example
//!
//! ```ignore
//! use pgassoc::{Column, Model, Normal, Ref};
//! use std::any::Any;
//!
//! impl Model for Bar {
//!     type Key = i64;
//!     const TABLE: &'static str = "bar";
//!     const COLUMNS: &'static [Column] = &[
//!         Column::new("key"),
//!         Column::new("count"),
//!         Column::new("name"),
//!         Column::reference::<Bar, Normal>("parent"),
//!     ];
//!     const PRIMARY_KEY: usize = 0;
//!
//!     fn key(&self) -> &i64 {
//!         &self.key
//!     }
//!
//!     fn field(&self, column: usize) -> Option<&dyn Any> {
//!         match column {
//!             0 => Some(&self.key),
//!             1 => Some(&self.count),
//!             2 => Some(&self.name),
//!             3 => Some(&self.parent),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::{quote, quote_qualified};
use crate::reference::{Kind, RefKind};
use crate::row::FromRow;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use tokio_postgres::types::{FromSqlOwned, ToSql};

/// A record type stored in one table.
pub trait Model: FromRow + Send + Sync + 'static {
    /// Primary key type.
    type Key: ToSql + FromSqlOwned + Clone + Eq + Hash + Send + Sync + 'static;

    /// Table name (unquoted).
    const TABLE: &'static str;

    /// Ordered column list. Reference columns carry their target.
    const COLUMNS: &'static [Column];

    /// Position of the primary key in [`Model::COLUMNS`].
    const PRIMARY_KEY: usize;

    /// The primary key of this record.
    fn key(&self) -> &Self::Key;

    /// The field stored at column position `column`, or `None` past the end.
    ///
    /// Reference columns must return the `Ref<_, _>` (or `Option<Ref<_, _>>`) field itself.
    ///
    /// Declarations only read [`Model::COLUMNS`], so a field that disagrees with
    /// its column is not caught when a relation is declared. It surfaces as
    /// [`OrmError::Schema`] from the operations that read references off a
    /// record: `selector`, `BelongsTo::reference`, `find_parent` and
    /// `BelongsTo::load_map`. Queries that bind only the record's own key
    /// (`find_many`, `find_one`, `find_joined`) never call this.
    fn field(&self, column: usize) -> Option<&dyn Any>;
}

/// One column of a model's schema.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    name: &'static str,
    reference: Option<RefTarget>,
}

impl Column {
    /// A plain (non-reference) column.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            reference: None,
        }
    }

    /// A column holding a `Ref<T, K>` (or `Option<Ref<T, K>>`).
    pub const fn reference<T: Model, K: Kind>(name: &'static str) -> Self {
        Self {
            name,
            reference: Some(RefTarget {
                kind: K::KIND,
                model: TypeId::of::<T>,
                model_name: std::any::type_name::<T>,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn reference_target(&self) -> Option<&RefTarget> {
        self.reference.as_ref()
    }
}

/// The model and kind a reference column points at.
#[derive(Clone, Copy)]
pub struct RefTarget {
    kind: RefKind,
    model: fn() -> TypeId,
    model_name: fn() -> &'static str,
}

impl RefTarget {
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// Whether this target is the model `P`.
    pub fn is<P: Model>(&self) -> bool {
        (self.model)() == TypeId::of::<P>()
    }

    pub fn model_name(&self) -> &'static str {
        short_name((self.model_name)())
    }
}

impl fmt::Debug for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefTarget")
            .field("kind", &self.kind)
            .field("model", &self.model_name())
            .finish()
    }
}

/// Unqualified type name of `T`, for messages.
pub fn model_name<T: ?Sized + 'static>() -> &'static str {
    short_name(std::any::type_name::<T>())
}

fn short_name(full: &'static str) -> &'static str {
    // Generic arguments may contain paths too; only strip the leading path.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// Check that a model's metadata is self-consistent.
///
/// Run by every relation constructor, so an inconsistent model is reported at
/// declaration time rather than on first query.
pub fn validate_schema<M: Model>() -> OrmResult<()> {
    let name = model_name::<M>();
    quote(M::TABLE)
        .map_err(|e| OrmError::schema(format!("{name}: invalid table name: {e}")))?;

    if M::COLUMNS.is_empty() {
        return Err(OrmError::schema(format!("{name}: no columns declared")));
    }
    if M::PRIMARY_KEY >= M::COLUMNS.len() {
        return Err(OrmError::schema(format!(
            "{name}: primary key index {} out of range for {} column(s)",
            M::PRIMARY_KEY,
            M::COLUMNS.len()
        )));
    }
    if M::COLUMNS[M::PRIMARY_KEY].reference.is_some() {
        return Err(OrmError::schema(format!(
            "{name}: primary key column '{}' cannot be a reference",
            M::COLUMNS[M::PRIMARY_KEY].name
        )));
    }

    let mut seen = HashSet::with_capacity(M::COLUMNS.len());
    for column in M::COLUMNS {
        quote(column.name).map_err(|e| {
            OrmError::schema(format!("{name}: invalid column name '{}': {e}", column.name))
        })?;
        if !seen.insert(column.name) {
            return Err(OrmError::schema(format!(
                "{name}: duplicate column '{}'",
                column.name
            )));
        }
    }
    Ok(())
}

/// Name of the primary key column.
pub fn primary_key_column<M: Model>() -> OrmResult<&'static str> {
    M::COLUMNS
        .get(M::PRIMARY_KEY)
        .map(|c| c.name)
        .ok_or_else(|| {
            OrmError::schema(format!(
                "{}: primary key index {} out of range for {} column(s)",
                model_name::<M>(),
                M::PRIMARY_KEY,
                M::COLUMNS.len()
            ))
        })
}

/// Comma-separated, table-qualified column list of `M`.
pub(crate) fn select_list<M: Model>() -> OrmResult<String> {
    let mut out = String::new();
    for (i, column) in M::COLUMNS.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote_qualified(M::TABLE, column.name)?);
    }
    Ok(out)
}

/// `SELECT "t"."c1", "t"."c2", ... FROM "t"`
pub fn select_fragment<M: Model>() -> OrmResult<String> {
    Ok(format!("SELECT {} FROM {}", select_list::<M>()?, quote(M::TABLE)?))
}

/// Select one row of `M` by primary key; binds the key as `$1`.
pub fn select_by_key_sql<M: Model>() -> OrmResult<String> {
    Ok(format!(
        "{} WHERE {} = $1",
        select_fragment::<M>()?,
        quote_qualified(M::TABLE, primary_key_column::<M>()?)?
    ))
}

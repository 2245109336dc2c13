//! Foreign-key relations: `has_many`, `has_one` and `belongs_to`.
//!
//! A declaration is built once (usually in a `static LazyLock`) and holds the
//! SQL it needs, so running it only binds a primary key.
//!
//! ```ignore
//! use pgassoc::HasMany;
//! use std::sync::LazyLock;
//!
//! static BAR_CHILDREN: LazyLock<HasMany<Bar, Bar>> =
//!     LazyLock::new(|| HasMany::new().expect("bar.parent references bar"));
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::quote_qualified;
use crate::locate::{extract_reference, locate_column, locate_reference};
use crate::model::{
    Model, model_name, primary_key_column, select_by_key_sql, select_fragment, validate_schema,
};
use crate::reference::{Kind, Normal, Ref, Unique};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

/// A parent → child relation through a reference column stored on the child.
pub struct ForeignKey<P: Model, C: Model, K: Kind> {
    column: usize,
    column_name: &'static str,
    query: String,
    pub(crate) batch_query: String,
    _marker: PhantomData<fn() -> (P, C, K)>,
}

/// `P` has many `C`s (`C` stores a `Ref<P>`).
pub type HasMany<P, C> = ForeignKey<P, C, Normal>;

/// `P` has at most one `C` (`C` stores a `Ref<P, Unique>`).
pub type HasOne<P, C> = ForeignKey<P, C, Unique>;

impl<P: Model, C: Model, K: Kind> ForeignKey<P, C, K> {
    /// Declare the relation through the single column of `C` that references `P` with kind `K`.
    pub fn new() -> OrmResult<Self> {
        validate_schema::<P>()?;
        validate_schema::<C>()?;
        let column = locate_reference::<C, P, K>()?;
        Self::build(column)
    }

    /// Declare the relation through an explicitly named column of `C`.
    ///
    /// Use this when `C` references `P` more than once.
    pub fn via(column: &str) -> OrmResult<Self> {
        validate_schema::<P>()?;
        validate_schema::<C>()?;
        let column = locate_column::<C, P, K>(column)?;
        Self::build(column)
    }

    fn build(column: usize) -> OrmResult<Self> {
        let column_name = C::COLUMNS[column].name();
        let select = select_fragment::<C>()?;
        let fk = quote_qualified(C::TABLE, column_name)?;
        let query = format!("{select} WHERE {fk} = $1");
        let batch_query = format!("{select} WHERE {fk} = ANY($1)");

        tracing::debug!(
            target: "pgassoc.relation",
            parent = model_name::<P>(),
            child = model_name::<C>(),
            kind = K::KIND.as_str(),
            column = column_name,
            sql = %query,
            "declared foreign-key relation"
        );

        Ok(Self {
            column,
            column_name,
            query,
            batch_query,
            _marker: PhantomData,
        })
    }

    /// Position of the reference column in `C::COLUMNS`.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn column_name(&self) -> &'static str {
        self.column_name
    }

    /// `SELECT <C columns> FROM <C> WHERE <C>.<column> = $1`
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The parent reference stored on `child`.
    ///
    /// Fails with a schema error if `C::field` does not return a `Ref<P, K>` for
    /// the relation's column (see [`Model::field`]).
    pub fn selector(&self, child: &C) -> OrmResult<Option<Ref<P, K>>> {
        extract_reference::<C, P, K>(child, self.column)
    }

    /// The inverse relation over the same column.
    pub fn belongs_to(&self) -> OrmResult<BelongsTo<C, P, K>> {
        BelongsTo::build(self.column)
    }
}

impl<P: Model, C: Model, K: Kind> Clone for ForeignKey<P, C, K> {
    fn clone(&self) -> Self {
        Self {
            column: self.column,
            column_name: self.column_name,
            query: self.query.clone(),
            batch_query: self.batch_query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<P: Model, C: Model, K: Kind> fmt::Debug for ForeignKey<P, C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("parent", &model_name::<P>())
            .field("child", &model_name::<C>())
            .field("kind", &K::KIND)
            .field("column", &self.column_name)
            .field("query", &self.query)
            .finish()
    }
}

/// A child → parent relation: read the reference stored on `C`, then load the `P` it points at.
pub struct BelongsTo<C: Model, P: Model, K: Kind = Normal> {
    column: usize,
    column_name: &'static str,
    query: String,
    pub(crate) batch_query: String,
    _marker: PhantomData<fn() -> (C, P, K)>,
}

impl<C: Model, P: Model, K: Kind> BelongsTo<C, P, K> {
    /// Declare the relation through the single column of `C` that references `P` with kind `K`.
    pub fn new() -> OrmResult<Self> {
        validate_schema::<P>()?;
        validate_schema::<C>()?;
        let column = locate_reference::<C, P, K>()?;
        Self::build(column)
    }

    /// Declare the relation through an explicitly named column of `C`.
    pub fn via(column: &str) -> OrmResult<Self> {
        validate_schema::<P>()?;
        validate_schema::<C>()?;
        let column = locate_column::<C, P, K>(column)?;
        Self::build(column)
    }

    fn build(column: usize) -> OrmResult<Self> {
        let column_name = C::COLUMNS[column].name();
        let query = select_by_key_sql::<P>()?;
        let batch_query = format!(
            "{} WHERE {} = ANY($1)",
            select_fragment::<P>()?,
            quote_qualified(P::TABLE, primary_key_column::<P>()?)?
        );

        tracing::debug!(
            target: "pgassoc.relation",
            child = model_name::<C>(),
            parent = model_name::<P>(),
            column = column_name,
            sql = %query,
            "declared belongs-to relation"
        );

        Ok(Self {
            column,
            column_name,
            query,
            batch_query,
            _marker: PhantomData,
        })
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn column_name(&self) -> &'static str {
        self.column_name
    }

    /// `SELECT <P columns> FROM <P> WHERE <P>.<pk> = $1`
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The reference stored on `child`, if set.
    pub fn reference(&self, child: &C) -> OrmResult<Option<Ref<P, K>>> {
        extract_reference::<C, P, K>(child, self.column)
    }

    /// Parent keys referenced by `children`, without duplicates, in first-seen order.
    pub(crate) fn referenced_keys(&self, children: &[C]) -> OrmResult<Vec<P::Key>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for child in children {
            if let Some(r) = self.reference(child)? {
                if seen.insert(r.key().clone()) {
                    keys.push(r.into_key());
                }
            }
        }
        Ok(keys)
    }
}

impl<C: Model, P: Model, K: Kind> Clone for BelongsTo<C, P, K> {
    fn clone(&self) -> Self {
        Self {
            column: self.column,
            column_name: self.column_name,
            query: self.query.clone(),
            batch_query: self.batch_query.clone(),
            _marker: PhantomData,
        }
    }
}

impl<C: Model, P: Model, K: Kind> fmt::Debug for BelongsTo<C, P, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BelongsTo")
            .field("child", &model_name::<C>())
            .field("parent", &model_name::<P>())
            .field("column", &self.column_name)
            .field("query", &self.query)
            .finish()
    }
}

/// Error used when a has-one relation finds more than one child.
pub(crate) fn not_unique<P: Model, C: Model>(column: &str, got: usize) -> OrmError {
    tracing::warn!(
        target: "pgassoc.relation",
        parent = model_name::<P>(),
        child = model_name::<C>(),
        column,
        rows = got,
        "has-one relation matched more than one row"
    );
    OrmError::too_many_rows(1, got)
}

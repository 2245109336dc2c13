//! # pgassoc
//!
//! Typed relationship declarations for PostgreSQL.
//!
//! Declare once how two record types relate, and pgassoc derives the SQL to
//! traverse the relation. Declarations are plain values; running one binds
//! only primary keys.
//!
//! ## Features
//!
//! - **Explicit schemas**: each record type lists its columns and which of them
//!   hold a [`Ref`] to another type ([`Model`])
//! - **Foreign keys**: [`HasMany`], [`HasOne`] and [`BelongsTo`], resolved from
//!   the single matching reference column (or an explicitly named one)
//! - **Join tables**: [`JoinTable`] with external, reversed, through-model and
//!   named strategies
//! - **Safe SQL**: every identifier is quoted, every value is a bound parameter
//! - **Typed**: a relation between the wrong pair of types does not compile, and
//!   an inconsistent declaration fails when it is built, not when it runs
//! - **Transaction-friendly**: pass a transaction or a pooled client anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgassoc::{HasMany, JoinTable};
//!
//! let children = HasMany::<Bar, Bar>::new()?;
//! let foo_bars = JoinTable::<Foo, Bar>::external()?;
//!
//! let kids: Vec<Bar> = children.find_many(&client, &root).await?;
//! foo_bars.add_join(&client, &foo, &bar).await?;
//! let bars: Vec<Bar> = foo_bars.find_joined(&client, &foo).await?;
//! ```

mod assoc;
pub mod client;
pub mod eager;
pub mod error;
pub mod ident;
pub mod join;
pub mod locate;
pub mod model;
pub mod prelude;
pub mod reference;
pub mod relation;
pub mod row;

#[cfg(test)]
mod test_support;

pub use client::GenericClient;
pub use eager::{BelongsToMap, HasManyMap, HasOneMap};
pub use error::{OrmError, OrmResult};
pub use ident::Ident;
pub use join::{JoinQueries, JoinShape, JoinTable};
pub use locate::{
    extract_reference, locate_column, locate_column_any, locate_reference, locate_reference_any,
};
pub use model::{
    Column, Model, RefTarget, primary_key_column, select_by_key_sql, select_fragment,
    validate_schema,
};
pub use reference::{Kind, Normal, Ref, RefKind, Unique};
pub use relation::{BelongsTo, ForeignKey, HasMany, HasOne};
pub use row::{FromRow, RowExt};

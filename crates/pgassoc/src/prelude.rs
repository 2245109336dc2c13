//! Convenient imports for typical `pgassoc` usage.
//!
//! ```ignore
//! use pgassoc::prelude::*;
//! ```

pub use crate::{
    BelongsTo, Column, FromRow, GenericClient, HasMany, HasOne, JoinTable, Model, Normal,
    OrmError, OrmResult, Ref, RowExt, Unique,
};

//! Typed foreign-key references.
//!
//! A [`Ref<T, K>`] is the value a child record stores to point at a parent of
//! type `T`. It wraps the parent's primary key and is tagged at the type level
//! with a [`Kind`]:
//!
//! - [`Normal`]: many children may point at the same parent (`has_many`)
//! - [`Unique`]: at most one child per parent (`has_one`)
//!
//! On the wire a reference is exactly its key, so `Ref<T, K>` binds and
//! decodes like `T::Key` and `Option<Ref<T, K>>` maps SQL `NULL`.

use crate::model::Model;
use bytes::BytesMut;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

/// Runtime tag of a reference kind, as recorded in a model's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Normal,
    Unique,
}

impl RefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Normal => "normal",
            RefKind::Unique => "unique",
        }
    }
}

/// Type-level reference kind.
pub trait Kind: Send + Sync + 'static {
    const KIND: RefKind;
}

/// Many children may reference one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Normal;

/// At most one child references a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Unique;

impl Kind for Normal {
    const KIND: RefKind = RefKind::Normal;
}

impl Kind for Unique {
    const KIND: RefKind = RefKind::Unique;
}

/// A reference to a row of `T`, holding `T`'s primary key.
pub struct Ref<T: Model, K: Kind = Normal> {
    key: T::Key,
    _marker: PhantomData<fn() -> (T, K)>,
}

impl<T: Model, K: Kind> Ref<T, K> {
    pub fn new(key: T::Key) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// Reference an existing record.
    pub fn to(target: &T) -> Self {
        Self::new(target.key().clone())
    }

    pub fn key(&self) -> &T::Key {
        &self.key
    }

    pub fn into_key(self) -> T::Key {
        self.key
    }

    /// Whether this reference points at `target`.
    pub fn refers_to(&self, target: &T) -> bool {
        &self.key == target.key()
    }
}

impl<T: Model, K: Kind> Clone for Ref<T, K> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone())
    }
}

impl<T: Model, K: Kind> PartialEq for Ref<T, K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: Model, K: Kind> Eq for Ref<T, K> {}

impl<T: Model, K: Kind> Hash for Ref<T, K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: Model, K: Kind> fmt::Debug for Ref<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref<{}>({:?})", T::TABLE, self.key)
    }
}

impl<T: Model, K: Kind> ToSql for Ref<T, K> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.key.to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <T::Key as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

impl<'a, T: Model, K: Kind> FromSql<'a> for Ref<T, K> {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        <T::Key as FromSql<'a>>::from_sql(ty, raw).map(Self::new)
    }

    fn accepts(ty: &Type) -> bool {
        <T::Key as FromSql<'a>>::accepts(ty)
    }
}

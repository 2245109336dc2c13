//! Models and a recording client shared by the unit tests.

use crate::{Column, FromRow, GenericClient, Model, Normal, OrmResult, Ref, RowExt, Unique};
use std::any::Any;
use std::sync::Mutex;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// One statement seen by [`RecordingClient`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: &'static str,
    pub sql: String,
    pub params: Vec<String>,
}

/// A client that records every statement, returns no rows and reports a fixed
/// affected-row count.
#[derive(Default)]
pub(crate) struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    affected: u64,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn affecting(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        self.calls.lock().unwrap().push(Call {
            method,
            sql: sql.to_string(),
            params: params.iter().map(|p| format!("{p:?}")).collect(),
        });
    }
}

impl GenericClient for RecordingClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        self.record("query", sql, params);
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        self.record("execute", sql, params);
        Ok(self.affected)
    }
}

/// A client that fails the test if anything reaches it.
pub(crate) struct PanicClient;

impl GenericClient for PanicClient {
    async fn query(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        panic!("unexpected query() call")
    }

    async fn execute(&self, _sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        panic!("unexpected execute() call")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Foo {
    pub key: i64,
    pub name: String,
}

impl Foo {
    pub fn new(key: i64, name: &str) -> Self {
        Self {
            key,
            name: name.to_string(),
        }
    }
}

impl FromRow for Foo {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            key: row.try_get_column("key")?,
            name: row.try_get_column("name")?,
        })
    }
}

impl Model for Foo {
    type Key = i64;
    const TABLE: &'static str = "foo";
    const COLUMNS: &'static [Column] = &[Column::new("key"), Column::new("name")];
    const PRIMARY_KEY: usize = 0;

    fn key(&self) -> &i64 {
        &self.key
    }

    fn field(&self, column: usize) -> Option<&dyn Any> {
        match column {
            0 => Some(&self.key),
            1 => Some(&self.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Bar {
    pub key: i64,
    pub count: i32,
    pub name: String,
    pub parent: Option<Ref<Bar>>,
}

impl Bar {
    pub fn new(key: i64, name: &str, parent: Option<i64>) -> Self {
        Self {
            key,
            count: 0,
            name: name.to_string(),
            parent: parent.map(Ref::new),
        }
    }
}

impl FromRow for Bar {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            key: row.try_get_column("key")?,
            count: row.try_get_column("count")?,
            name: row.try_get_column("name")?,
            parent: row.try_get_column("parent")?,
        })
    }
}

impl Model for Bar {
    type Key = i64;
    const TABLE: &'static str = "bar";
    const COLUMNS: &'static [Column] = &[
        Column::new("key"),
        Column::new("count"),
        Column::new("name"),
        Column::reference::<Bar, Normal>("parent"),
    ];
    const PRIMARY_KEY: usize = 0;

    fn key(&self) -> &i64 {
        &self.key
    }

    fn field(&self, column: usize) -> Option<&dyn Any> {
        match column {
            0 => Some(&self.key),
            1 => Some(&self.count),
            2 => Some(&self.name),
            3 => Some(&self.parent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Joiner {
    pub key: i64,
    pub comment: String,
    pub foo: Ref<Foo>,
    pub bar: Option<Ref<Bar>>,
}

impl FromRow for Joiner {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            key: row.try_get_column("key")?,
            comment: row.try_get_column("comment")?,
            foo: row.try_get_column("foo")?,
            bar: row.try_get_column("bar")?,
        })
    }
}

impl Model for Joiner {
    type Key = i64;
    const TABLE: &'static str = "joiner";
    const COLUMNS: &'static [Column] = &[
        Column::new("key"),
        Column::new("comment"),
        Column::reference::<Foo, Normal>("foo"),
        Column::reference::<Bar, Normal>("bar"),
    ];
    const PRIMARY_KEY: usize = 0;

    fn key(&self) -> &i64 {
        &self.key
    }

    fn field(&self, column: usize) -> Option<&dyn Any> {
        match column {
            0 => Some(&self.key),
            1 => Some(&self.comment),
            2 => Some(&self.foo),
            3 => Some(&self.bar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Profile {
    pub key: i64,
    pub bio: String,
    pub foo: Ref<Foo, Unique>,
}

impl FromRow for Profile {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            key: row.try_get_column("key")?,
            bio: row.try_get_column("bio")?,
            foo: row.try_get_column("foo")?,
        })
    }
}

impl Model for Profile {
    type Key = i64;
    const TABLE: &'static str = "profile";
    const COLUMNS: &'static [Column] = &[
        Column::new("key"),
        Column::new("bio"),
        Column::reference::<Foo, Unique>("foo"),
    ];
    const PRIMARY_KEY: usize = 0;

    fn key(&self) -> &i64 {
        &self.key
    }

    fn field(&self, column: usize) -> Option<&dyn Any> {
        match column {
            0 => Some(&self.key),
            1 => Some(&self.bio),
            2 => Some(&self.foo),
            _ => None,
        }
    }
}

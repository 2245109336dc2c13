//! Running declared relations against a connection.
//!
//! Every operation binds only primary keys to SQL derived when the relation was
//! declared. "Nothing found" is an empty result, never an error; driver errors
//! are passed through unchanged.

use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::join::JoinTable;
use crate::model::Model;
use crate::reference::{Kind, Normal, Unique};
use crate::relation::{BelongsTo, ForeignKey, not_unique};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

pub(crate) async fn fetch(
    conn: &impl GenericClient,
    op: &'static str,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<Vec<Row>> {
    tracing::debug!(target: "pgassoc.sql", op, sql, params = params.len(), "query");
    conn.query(sql, params).await
}

async fn execute(
    conn: &impl GenericClient,
    op: &'static str,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> OrmResult<u64> {
    tracing::debug!(target: "pgassoc.sql", op, sql, params = params.len(), "execute");
    conn.execute(sql, params).await
}

impl<C: Model, P: Model, K: Kind> BelongsTo<C, P, K> {
    /// Load the parent `child` points at.
    ///
    /// `None` if the reference is unset or the parent row no longer exists.
    pub async fn find_parent(&self, conn: &impl GenericClient, child: &C) -> OrmResult<Option<P>> {
        let Some(parent) = self.reference(child)? else {
            return Ok(None);
        };
        tracing::debug!(target: "pgassoc.sql", op = "find_parent", sql = self.query(), params = 1, "query");
        let row = conn.query_opt(self.query(), &[parent.key()]).await?;
        row.as_ref().map(P::from_row).transpose()
    }
}

impl<P: Model, C: Model> ForeignKey<P, C, Normal> {
    /// All children referencing `parent`, in no particular order.
    pub async fn find_many(&self, conn: &impl GenericClient, parent: &P) -> OrmResult<Vec<C>> {
        let rows = fetch(conn, "find_many", self.query(), &[parent.key()]).await?;
        rows.iter().map(C::from_row).collect()
    }
}

impl<P: Model, C: Model> ForeignKey<P, C, Unique> {
    /// The child referencing `parent`, if any.
    ///
    /// More than one matching row is an integrity violation and fails with
    /// [`OrmError::TooManyRows`](crate::OrmError::TooManyRows); no row is picked arbitrarily.
    pub async fn find_one(&self, conn: &impl GenericClient, parent: &P) -> OrmResult<Option<C>> {
        let rows = fetch(conn, "find_one", self.query(), &[parent.key()]).await?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => C::from_row(row).map(Some),
            _ => Err(not_unique::<P, C>(self.column_name(), rows.len())),
        }
    }
}

impl<A: Model, B: Model> JoinTable<A, B> {
    /// All `B`s linked to `a`.
    pub async fn find_joined(&self, conn: &impl GenericClient, a: &A) -> OrmResult<Vec<B>> {
        let rows = fetch(conn, "find_joined", &self.queries().lookup, &[a.key()]).await?;
        rows.iter().map(B::from_row).collect()
    }

    /// Link `a` to `b`. Returns `false` if the link already existed.
    ///
    /// On a read-only relation (see [`JoinTable::through`]) the statement is
    /// rejected by the database and the error is returned as is.
    pub async fn add_join(&self, conn: &impl GenericClient, a: &A, b: &B) -> OrmResult<bool> {
        let affected = execute(
            conn,
            "add_join",
            &self.queries().add,
            &[a.key(), b.key(), a.key(), b.key()],
        )
        .await?;
        Ok(affected > 0)
    }

    /// Unlink `a` from `b`. Returns the number of rows deleted.
    pub async fn remove_join(&self, conn: &impl GenericClient, a: &A, b: &B) -> OrmResult<u64> {
        execute(
            conn,
            "remove_join",
            &self.queries().remove,
            &[a.key(), b.key()],
        )
        .await
    }
}

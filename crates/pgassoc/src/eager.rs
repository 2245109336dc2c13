//! Eager loading (batch preloading for relations).
//!
//! Each `load_map` runs exactly one query for a whole slice of records, binding
//! their keys as one array parameter (`= ANY($1)`), and groups the result by
//! key. Duplicate input keys are collapsed; an empty input returns an empty map
//! without touching the connection.

use crate::assoc::fetch;
use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::join::{JOIN_PARENT_KEY_ALIAS, JoinTable};
use crate::model::Model;
use crate::reference::{Kind, Normal, Unique};
use crate::relation::{BelongsTo, ForeignKey, not_unique};
use crate::row::RowExt;
use std::collections::{HashMap, HashSet};

pub type HasManyMap<Id, Child> = HashMap<Id, Vec<Child>>;
pub type BelongsToMap<Id, Parent> = HashMap<Id, Parent>;
pub type HasOneMap<Id, Child> = HashMap<Id, Child>;

/// Keys of `models`, without duplicates, in first-seen order.
fn unique_keys<M: Model>(models: &[M]) -> Vec<M::Key> {
    let mut seen = HashSet::with_capacity(models.len());
    models
        .iter()
        .map(|m| m.key())
        .filter(|k| seen.insert(*k))
        .cloned()
        .collect()
}

impl<P: Model, C: Model> ForeignKey<P, C, Normal> {
    /// Children of every parent in `parents`, keyed by parent key.
    ///
    /// Parents without children have no entry.
    pub async fn load_map(
        &self,
        conn: &impl GenericClient,
        parents: &[P],
    ) -> OrmResult<HasManyMap<P::Key, C>> {
        let keys = unique_keys(parents);
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = fetch(conn, "load_has_many", &self.batch_query, &[&keys]).await?;

        let mut out: HasManyMap<P::Key, C> = HashMap::new();
        for row in rows {
            let fk: Option<P::Key> = row.try_get_column(self.column_name())?;
            let Some(fk) = fk else { continue };
            out.entry(fk).or_default().push(C::from_row(&row)?);
        }
        Ok(out)
    }
}

impl<P: Model, C: Model> ForeignKey<P, C, Unique> {
    /// The child of every parent in `parents`, keyed by parent key.
    ///
    /// A parent with several children fails the whole load with
    /// [`OrmError::TooManyRows`](crate::OrmError::TooManyRows).
    pub async fn load_map(
        &self,
        conn: &impl GenericClient,
        parents: &[P],
    ) -> OrmResult<HasOneMap<P::Key, C>> {
        let keys = unique_keys(parents);
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = fetch(conn, "load_has_one", &self.batch_query, &[&keys]).await?;

        let mut counts: HashMap<P::Key, usize> = HashMap::new();
        let mut out: HasOneMap<P::Key, C> = HashMap::new();
        for row in rows {
            let fk: Option<P::Key> = row.try_get_column(self.column_name())?;
            let Some(fk) = fk else { continue };
            *counts.entry(fk.clone()).or_default() += 1;
            if out.contains_key(&fk) {
                continue;
            }
            out.insert(fk, C::from_row(&row)?);
        }

        if let Some(&got) = counts.values().find(|&&n| n > 1) {
            return Err(not_unique::<P, C>(self.column_name(), got));
        }
        Ok(out)
    }
}

impl<C: Model, P: Model, K: Kind> BelongsTo<C, P, K> {
    /// Parents referenced by `children`, keyed by parent key.
    ///
    /// Unset references and dangling keys have no entry.
    pub async fn load_map(
        &self,
        conn: &impl GenericClient,
        children: &[C],
    ) -> OrmResult<BelongsToMap<P::Key, P>> {
        let keys = self.referenced_keys(children)?;
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = fetch(conn, "load_belongs_to", &self.batch_query, &[&keys]).await?;

        let mut out: BelongsToMap<P::Key, P> = HashMap::new();
        for row in rows {
            let parent = P::from_row(&row)?;
            out.insert(parent.key().clone(), parent);
        }
        Ok(out)
    }
}

impl<A: Model, B: Model> JoinTable<A, B> {
    /// `B`s linked to every `A` in `items`, keyed by `A` key.
    pub async fn load_map(
        &self,
        conn: &impl GenericClient,
        items: &[A],
    ) -> OrmResult<HasManyMap<A::Key, B>> {
        let keys = unique_keys(items);
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = fetch(
            conn,
            "load_joined",
            &self.queries().batch_lookup,
            &[&keys],
        )
        .await?;

        let mut out: HasManyMap<A::Key, B> = HashMap::new();
        for row in rows {
            let parent: A::Key = row.try_get_column(JOIN_PARENT_KEY_ALIAS)?;
            out.entry(parent).or_default().push(B::from_row(&row)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Bar, Foo, PanicClient, Profile, RecordingClient};
    use crate::{HasMany, HasOne};

    #[tokio::test]
    async fn empty_input_fast_path() {
        let conn = PanicClient;

        let hm = HasMany::<Bar, Bar>::new()
            .unwrap()
            .load_map(&conn, &[])
            .await
            .unwrap();
        assert!(hm.is_empty());

        let ho = HasOne::<Foo, Profile>::new()
            .unwrap()
            .load_map(&conn, &[])
            .await
            .unwrap();
        assert!(ho.is_empty());

        // Only unset references: nothing to look up.
        let bt = BelongsTo::<Bar, Bar>::new()
            .unwrap()
            .load_map(&conn, &[Bar::new(1, "a", None), Bar::new(2, "b", None)])
            .await
            .unwrap();
        assert!(bt.is_empty());

        let m2m = JoinTable::<Foo, Bar>::external()
            .unwrap()
            .load_map(&conn, &[])
            .await
            .unwrap();
        assert!(m2m.is_empty());
    }

    #[tokio::test]
    async fn keys_are_deduplicated_into_one_array() {
        let conn = RecordingClient::new();
        let rel = HasMany::<Bar, Bar>::new().unwrap();
        let parents = [
            Bar::new(1, "a", None),
            Bar::new(2, "b", None),
            Bar::new(1, "a again", None),
        ];

        rel.load_map(&conn, &parents).await.unwrap();

        let calls = conn.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].sql,
            r#"SELECT "bar"."key", "bar"."count", "bar"."name", "bar"."parent" FROM "bar" WHERE "bar"."parent" = ANY($1)"#
        );
        assert_eq!(calls[0].params, vec!["[1, 2]"]);
    }

    #[tokio::test]
    async fn belongs_to_batches_referenced_keys() {
        let conn = RecordingClient::new();
        let rel = BelongsTo::<Bar, Bar>::new().unwrap();
        let children = [
            Bar::new(3, "c", Some(1)),
            Bar::new(4, "d", Some(1)),
            Bar::new(5, "e", Some(2)),
        ];

        rel.load_map(&conn, &children).await.unwrap();

        let calls = conn.calls();
        assert_eq!(
            calls[0].sql,
            r#"SELECT "bar"."key", "bar"."count", "bar"."name", "bar"."parent" FROM "bar" WHERE "bar"."key" = ANY($1)"#
        );
        assert_eq!(calls[0].params, vec!["[1, 2]"]);
    }

    #[tokio::test]
    async fn join_batch_uses_lookup_alias() {
        let conn = RecordingClient::new();
        let jt = JoinTable::<Foo, Bar>::external().unwrap();
        jt.load_map(&conn, &[Foo::new(7, "seven")]).await.unwrap();

        let calls = conn.calls();
        assert_eq!(calls[0].sql, jt.queries().batch_lookup);
        assert!(calls[0].sql.contains(JOIN_PARENT_KEY_ALIAS));
        assert_eq!(calls[0].params, vec!["[7]"]);
    }
}

//! Locating reference columns in a model's schema and reading them off records.

use crate::error::{OrmError, OrmResult};
use crate::model::{Model, model_name};
use crate::reference::{Kind, Ref, RefKind};

/// Find the single column of `M` declared as `Ref<P, K>`.
///
/// Fails with [`OrmError::MissingReference`] if there is none and
/// [`OrmError::AmbiguousReference`] if there are several.
pub fn locate_reference<M: Model, P: Model, K: Kind>() -> OrmResult<usize> {
    locate_matching::<M, P>(Some(K::KIND))
}

/// Find the single column of `M` referencing `P`, whatever its kind.
pub fn locate_reference_any<M: Model, P: Model>() -> OrmResult<usize> {
    locate_matching::<M, P>(None)
}

/// Resolve an explicitly named column of `M` and check it is declared as `Ref<P, K>`.
pub fn locate_column<M: Model, P: Model, K: Kind>(name: &str) -> OrmResult<usize> {
    locate_named::<M, P>(name, Some(K::KIND))
}

/// Resolve an explicitly named column of `M` and check it references `P`, whatever its kind.
pub fn locate_column_any<M: Model, P: Model>(name: &str) -> OrmResult<usize> {
    locate_named::<M, P>(name, None)
}

fn locate_named<M: Model, P: Model>(name: &str, kind: Option<RefKind>) -> OrmResult<usize> {
    let index = M::COLUMNS
        .iter()
        .position(|c| c.name() == name)
        .ok_or_else(|| {
            OrmError::schema(format!(
                "{} has no column '{name}'",
                model_name::<M>()
            ))
        })?;

    match M::COLUMNS[index].reference_target() {
        Some(target) if target.is::<P>() && kind.is_none_or(|k| target.kind() == k) => Ok(index),
        _ => Err(OrmError::schema(format!(
            "{}.{name} is not declared as a {}reference to {}",
            model_name::<M>(),
            kind.map_or(String::new(), |k| format!("{} ", k.as_str())),
            model_name::<P>()
        ))),
    }
}

fn locate_matching<M: Model, P: Model>(kind: Option<RefKind>) -> OrmResult<usize> {
    let matches: Vec<usize> = M::COLUMNS
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.reference_target()
                .is_some_and(|t| t.is::<P>() && kind.is_none_or(|k| t.kind() == k))
        })
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(OrmError::MissingReference {
            model: model_name::<M>(),
            target: model_name::<P>(),
            kind: kind.map_or("any", RefKind::as_str),
        }),
        several => Err(OrmError::AmbiguousReference {
            model: model_name::<M>(),
            target: model_name::<P>(),
            columns: several
                .iter()
                .map(|&i| M::COLUMNS[i].name())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Read the `Ref<P, K>` stored at `column` of `value`.
///
/// The field may be a `Ref<P, K>` or an `Option<Ref<P, K>>`; an unset optional
/// reference yields `Ok(None)`. Any other layout means `M::field` disagrees with
/// `M::COLUMNS` and is reported as a schema error.
pub fn extract_reference<M: Model, P: Model, K: Kind>(
    value: &M,
    column: usize,
) -> OrmResult<Option<Ref<P, K>>> {
    let field = value.field(column).ok_or_else(|| {
        OrmError::schema(format!(
            "{} declares {} column(s) but has no field at position {column}",
            model_name::<M>(),
            M::COLUMNS.len()
        ))
    })?;

    if let Some(r) = field.downcast_ref::<Ref<P, K>>() {
        return Ok(Some(r.clone()));
    }
    if let Some(r) = field.downcast_ref::<Option<Ref<P, K>>>() {
        return Ok(r.clone());
    }
    Err(OrmError::schema(format!(
        "{}: field at position {column} is not a {} reference to {}",
        model_name::<M>(),
        K::KIND.as_str(),
        model_name::<P>()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;
    use crate::reference::{Normal, Unique};
    use crate::{FromRow, OrmResult};
    use std::any::Any;
    use tokio_postgres::Row;

    struct User {
        id: i64,
    }

    struct Message {
        id: i64,
        sender: Ref<User>,
        recipient: Option<Ref<User>>,
        profile_of: Option<Ref<User, Unique>>,
    }

    impl FromRow for User {
        fn from_row(_row: &Row) -> OrmResult<Self> {
            unreachable!()
        }
    }

    impl FromRow for Message {
        fn from_row(_row: &Row) -> OrmResult<Self> {
            unreachable!()
        }
    }

    impl Model for User {
        type Key = i64;
        const TABLE: &'static str = "users";
        const COLUMNS: &'static [Column] = &[Column::new("id")];
        const PRIMARY_KEY: usize = 0;

        fn key(&self) -> &i64 {
            &self.id
        }

        fn field(&self, column: usize) -> Option<&dyn Any> {
            (column == 0).then_some(&self.id as &dyn Any)
        }
    }

    impl Model for Message {
        type Key = i64;
        const TABLE: &'static str = "messages";
        const COLUMNS: &'static [Column] = &[
            Column::new("id"),
            Column::reference::<User, Normal>("sender"),
            Column::reference::<User, Normal>("recipient"),
            Column::reference::<User, Unique>("profile_of"),
            Column::new("body"),
        ];
        const PRIMARY_KEY: usize = 0;

        fn key(&self) -> &i64 {
            &self.id
        }

        fn field(&self, column: usize) -> Option<&dyn Any> {
            match column {
                0 => Some(&self.id),
                1 => Some(&self.sender),
                2 => Some(&self.recipient),
                3 => Some(&self.profile_of),
                _ => None,
            }
        }
    }

    fn message() -> Message {
        Message {
            id: 1,
            sender: Ref::new(10),
            recipient: None,
            profile_of: Some(Ref::new(30)),
        }
    }

    #[test]
    fn unique_kind_is_unambiguous() {
        assert_eq!(locate_reference::<Message, User, Unique>().unwrap(), 3);
    }

    #[test]
    fn two_normal_references_are_ambiguous() {
        let err = locate_reference::<Message, User, Normal>().unwrap_err();
        match err {
            OrmError::AmbiguousReference { columns, .. } => {
                assert_eq!(columns, "sender, recipient")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(locate_reference_any::<Message, User>().is_err());
    }

    #[test]
    fn missing_reference() {
        let err = locate_reference::<User, Message, Normal>().unwrap_err();
        assert!(matches!(
            err,
            OrmError::MissingReference {
                model: "User",
                target: "Message",
                kind: "normal"
            }
        ));
    }

    #[test]
    fn explicit_column_is_checked() {
        assert_eq!(
            locate_column::<Message, User, Normal>("recipient").unwrap(),
            2
        );
        assert!(locate_column::<Message, User, Unique>("recipient").is_err());
        assert!(locate_column::<Message, User, Normal>("body").is_err());
        assert!(locate_column::<Message, User, Normal>("nope").is_err());
    }

    #[test]
    fn explicit_column_of_any_kind() {
        assert_eq!(locate_column_any::<Message, User>("recipient").unwrap(), 2);
        assert_eq!(locate_column_any::<Message, User>("profile_of").unwrap(), 3);
        assert!(locate_column_any::<Message, User>("body").is_err());
        assert!(locate_column_any::<Message, Message>("sender").is_err());
    }

    #[test]
    fn extracts_plain_and_optional_references() {
        let m = message();
        let sender = extract_reference::<Message, User, Normal>(&m, 1).unwrap();
        assert_eq!(sender.map(Ref::into_key), Some(10));

        let recipient = extract_reference::<Message, User, Normal>(&m, 2).unwrap();
        assert!(recipient.is_none());

        let profile = extract_reference::<Message, User, Unique>(&m, 3).unwrap();
        assert_eq!(profile.map(Ref::into_key), Some(30));
    }

    #[test]
    fn extract_reports_layout_mismatch() {
        let m = message();
        // wrong kind for the stored field
        assert!(extract_reference::<Message, User, Unique>(&m, 1).is_err());
        // not a reference at all
        assert!(extract_reference::<Message, User, Normal>(&m, 0).is_err());
        // past the fields the model exposes
        assert!(extract_reference::<Message, User, Normal>(&m, 4).is_err());
    }
}

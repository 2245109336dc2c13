//! Safe SQL identifier handling.
//!
//! Every table and column name that ends up in generated SQL goes through
//! [`Ident`], which always renders double-quoted parts:
//!
//! - a part may contain any character except NUL
//! - an embedded `"` is escaped as `""`
//!
//! Names come from static record metadata, never from row data, but they are
//! still quoted so that reserved words (`user`, `order`, ...) and mixed-case
//! names round-trip exactly.
//!
//! # Example
//! ```ignore
//! use pgassoc::Ident;
//!
//! assert_eq!(Ident::quoted("order")?.to_sql(), r#""order""#);
//! assert_eq!(Ident::qualified("bar", "parent")?.to_sql(), r#""bar"."parent""#);
//! # Ok::<(), pgassoc::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// A SQL identifier made of one or more quoted parts (`"table"` or `"table"."column"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Create a single-part quoted identifier.
    pub fn quoted(name: &str) -> OrmResult<Self> {
        check_part(name)?;
        Ok(Self {
            parts: vec![name.to_string()],
        })
    }

    /// Create a `table.column` identifier with both parts quoted.
    pub fn qualified(table: &str, column: &str) -> OrmResult<Self> {
        check_part(table)?;
        check_part(column)?;
        Ok(Self {
            parts: vec![table.to_string(), column.to_string()],
        })
    }

    /// The unquoted parts.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let cap = self
            .parts
            .iter()
            .map(|p| p.len() + 3) // quotes + separating dot
            .sum();
        let mut out = String::with_capacity(cap);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push('"');
            for ch in part.chars() {
                if ch == '"' {
                    out.push('"');
                    out.push('"');
                } else {
                    out.push(ch);
                }
            }
            out.push('"');
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Quote a single identifier part.
pub fn quote(name: &str) -> OrmResult<String> {
    Ok(Ident::quoted(name)?.to_sql())
}

/// Quote a `table.column` pair.
pub fn quote_qualified(table: &str, column: &str) -> OrmResult<String> {
    Ok(Ident::qualified(table, column)?.to_sql())
}

fn check_part(name: &str) -> OrmResult<()> {
    if name.is_empty() {
        return Err(OrmError::validation("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(OrmError::validation(
            "Identifier cannot contain NUL character",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        assert_eq!(Ident::quoted("users").unwrap().to_sql(), r#""users""#);
    }

    #[test]
    fn ident_reserved_word() {
        assert_eq!(quote("order").unwrap(), r#""order""#);
    }

    #[test]
    fn ident_keeps_case() {
        assert_eq!(quote("CamelCase").unwrap(), r#""CamelCase""#);
    }

    #[test]
    fn ident_escapes_quote() {
        assert_eq!(quote(r#"has"quote"#).unwrap(), r#""has""quote""#);
    }

    #[test]
    fn ident_qualified() {
        let ident = Ident::qualified("bar", "parent").unwrap();
        assert_eq!(ident.to_sql(), r#""bar"."parent""#);
        assert_eq!(ident.parts(), ["bar".to_string(), "parent".to_string()]);
    }

    #[test]
    fn ident_dot_stays_inside_part() {
        assert_eq!(quote("a.b").unwrap(), r#""a.b""#);
    }

    #[test]
    fn ident_rejects_empty() {
        assert!(Ident::quoted("").is_err());
        assert!(Ident::qualified("bar", "").is_err());
    }

    #[test]
    fn ident_rejects_nul() {
        assert!(quote("bad\0name").is_err());
    }
}

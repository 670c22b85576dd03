//! Opaque string identifiers.

macro_rules! make_id_type {
    ($name:ident, $what:literal) => {
        #[doc = concat!("Opaque identifier of a ", $what, ".")]
        #[derive(
            Serialize, Deserialize, Debug, Clone, Default, Hash, PartialOrd, Ord, PartialEq, Eq,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[inline]
            pub fn new<S: Into<String>>(value: S) -> Self {
                $name(value.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ToSql for $name {
            #[inline]
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            #[inline]
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                String::column_result(value).map($name)
            }
        }
    };
}

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

make_id_type!(VoteId, "vote");
make_id_type!(VoterId, "voter");
make_id_type!(EntityId, "rated entity");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = VoterId::from("voter-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"voter-1\"");

        let back: VoterId = serde_json::from_str("\"voter-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_blank_detection() {
        assert!(EntityId::from("   ").is_blank());
        assert!(!EntityId::from("movie-9").is_blank());
    }
}

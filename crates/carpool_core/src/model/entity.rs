//! Entity contract shared by every generic store.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Backend-agnostic identifier as seen by callers.
///
/// UUID text for file and relational backends, 24-char hex for documents.
pub type EntityId = String;

/// Describes one persisted entity type.
///
/// Serde derives act as the entity-level serialize/deserialize functions that
/// parameterize the file, document and relational stores.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Singular name used in errors and logs (`user`).
    const NAME: &'static str;
    /// Plural name used for files, tables and collections (`users`).
    const COLLECTION: &'static str;
    /// Field names in serialization order. Used as the tabular header row.
    const FIELDS: &'static [&'static str];
    /// `Option<String>` fields, where an empty string differs from an absent value.
    const OPTIONAL_TEXT_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> Option<&str>;

    /// Stores the identifier generated by a backend.
    ///
    /// Stores call this exactly once per entity, during `create`.
    fn assign_id(&mut self, id: EntityId);

    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}

/// Declares an enum whose wire form is a fixed snake_case string in every
/// serialization format (tabular, markup, document, SQL).
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value.as_str()).ok_or_else(|| {
                    format!("unknown {} value `{value}`", stringify!($name))
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use string_enum;

use serde::{Deserialize, Serialize};

/// Declares a string-backed identifier newtype.
///
/// All identifiers in the storefront are assigned by the backend as opaque
/// strings (Mongo object ids in practice), so none of them can be generated
/// locally except `LineId`, which has a synthesized fallback.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a product listing.
    ProductId
);

string_id!(
    /// Identifier of a persisted cart.
    CartId
);

string_id!(
    /// Identifier of an authenticated user.
    UserId
);

string_id!(
    /// Identifier of a single cart line.
    LineId
);

impl LineId {
    /// Synthesizes a line id for a line the server returned without one.
    ///
    /// The format is `{product_id}-{timestamp_millis}`.
    pub fn synthesize(product_id: &ProductId, timestamp_millis: i64) -> Self {
        Self(format!("{product_id}-{timestamp_millis}"))
    }
}

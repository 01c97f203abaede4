//! Newtype IDs for type-safe entity references.
//!
//! Saleor issues opaque string identifiers (base64-encoded global IDs for
//! lines and variants, UUID tokens for checkouts). Use the `define_id!` macro
//! to create wrappers that prevent mixing a line ID with a variant ID.

use thiserror::Error;

/// Error returned when constructing an ID from an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input string is empty or whitespace only.
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` (deserialization rejects empty strings)
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `FromStr` and `TryFrom<String>`
///
/// # Example
///
/// ```rust
/// # use baxoq_core::define_id;
/// define_id!(OrderToken, "order token");
///
/// let token = OrderToken::parse("abc").unwrap();
/// assert_eq!(token.as_str(), "abc");
/// assert!(OrderToken::parse("").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $label:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Human-readable name used in error messages.
            pub const LABEL: &'static str = $label;

            /// Parse an ID, rejecting empty or whitespace-only input.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::Empty`] if the trimmed input is empty.
            pub fn parse(value: impl Into<String>) -> ::core::result::Result<Self, $crate::IdError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err($crate::IdError::Empty($label));
                }
                Ok(Self(value))
            }

            /// Get the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert into the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(value: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(ChannelSlug, "channel");
define_id!(CheckoutId, "checkout id");
define_id!(LineId, "line id");
define_id!(VariantId, "variant id");
define_id!(ProductId, "product id");

impl ChannelSlug {
    /// Name of the cookie holding this channel's checkout ID.
    ///
    /// Checkout IDs are scoped per channel so that switching channels never
    /// reuses a cart priced in another currency.
    #[must_use]
    pub fn checkout_cookie_name(&self) -> String {
        format!("checkoutId-{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(
            CheckoutId::parse("").unwrap_err(),
            IdError::Empty("checkout id")
        );
        assert!(LineId::parse("   ").is_err());
    }

    #[test]
    fn test_parse_keeps_value_verbatim() {
        let id = VariantId::parse("UHJvZHVjdFZhcmlhbnQ6MQ==").unwrap();
        assert_eq!(id.as_str(), "UHJvZHVjdFZhcmlhbnQ6MQ==");
        assert_eq!(id.to_string(), "UHJvZHVjdFZhcmlhbnQ6MQ==");
    }

    #[test]
    fn test_serde_transparent() {
        let id = LineId::parse("line-1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"line-1\"");

        let parsed: LineId = serde_json::from_str("\"line-1\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        let result: Result<CheckoutId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_checkout_cookie_name() {
        let channel = ChannelSlug::parse("default-channel").unwrap();
        assert_eq!(channel.checkout_cookie_name(), "checkoutId-default-channel");
    }
}

//! Tagless sum types.
//!
//! Many protocol fields accept "one of" several record or primitive shapes and
//! the wire format carries no discriminator. A union is therefore modelled as a
//! closed Rust enum whose variants are listed in a fixed order:
//!
//! - encoding matches on the held variant and serializes its payload as is;
//! - decoding tries the variants strictly in declaration order and keeps the
//!   first that parses;
//! - a literal `null` is never offered to the variants. Absent values are
//!   spelled `Option<Union>`.
//!
//! Keeping the alternatives structurally disjoint is the declaring author's
//! job. [`UnionValue::check_unshadowed`] reports a value whose encoding an
//! earlier alternative would claim; encoding never refuses such a value.
//!
//! Declare new unions with [`union_type!`](crate::union_type).

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

/// Log target for union codec events.
pub(crate) const UNION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::union");

/// Errors raised while encoding or decoding a union value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnionError {
    /// None of the declared alternatives accepted the value.
    #[error("no alternative of {union} matched; tried {}", .tried.join(", "))]
    NoAlternativeMatched {
        /// Union being decoded.
        union: &'static str,
        /// Alternatives attempted, in declaration order.
        tried: &'static [&'static str],
    },

    /// A literal `null` reached a union that has no absent state.
    #[error("{union} cannot be decoded from null")]
    UnexpectedNull {
        /// Union being decoded.
        union: &'static str,
    },

    /// The encoded form of the held alternative would decode as an earlier one.
    #[error("{union}::{held} encodes to a value that decodes as {union}::{shadowed_by}")]
    Ambiguous {
        /// Union being encoded.
        union: &'static str,
        /// Alternative held by the value.
        held: &'static str,
        /// Earlier alternative that claims the encoded form.
        shadowed_by: &'static str,
    },

    /// Serializing the held payload failed.
    #[error("failed to encode {union}::{held}: {message}")]
    Encode {
        /// Union being encoded.
        union: &'static str,
        /// Alternative held by the value.
        held: &'static str,
        /// Serializer failure description.
        message: String,
    },
}

impl UnionError {
    /// Builds a `NoAlternativeMatched` error.
    #[must_use]
    pub fn no_match(union: &'static str, tried: &'static [&'static str]) -> Self {
        Self::NoAlternativeMatched { union, tried }
    }

    /// Builds an `UnexpectedNull` error.
    #[must_use]
    pub fn unexpected_null(union: &'static str) -> Self {
        Self::UnexpectedNull { union }
    }

    /// Builds an `Encode` error from a serializer failure.
    #[must_use]
    pub fn encode(union: &'static str, held: &'static str, error: &serde_json::Error) -> Self {
        Self::Encode {
            union,
            held,
            message: error.to_string(),
        }
    }
}

/// Behaviour shared by every tagless union.
///
/// Implementations are generated by [`union_type!`](crate::union_type); the
/// trait exists so generic code (tests, diagnostics, the dispatcher) can talk
/// about unions without knowing their alternatives.
pub trait UnionValue: Sized {
    /// Name of the union, used in error messages.
    const NAME: &'static str;

    /// Alternative names in declaration (and decode) order.
    const ALTERNATIVES: &'static [&'static str];

    /// Name of the alternative currently held.
    fn alternative(&self) -> &'static str;

    /// Serializes the held alternative.
    ///
    /// # Errors
    ///
    /// Returns [`UnionError::Encode`] when the payload fails to serialize.
    fn encode(&self) -> Result<Value, UnionError>;

    /// Decodes the first alternative, in declaration order, that accepts `value`.
    ///
    /// # Errors
    ///
    /// Returns [`UnionError::UnexpectedNull`] for a literal `null` and
    /// [`UnionError::NoAlternativeMatched`] when every alternative rejects the
    /// value.
    fn decode(value: &Value) -> Result<Self, UnionError>;

    /// Decodes a value that may be absent, mapping `null` to `None`.
    ///
    /// # Errors
    ///
    /// Propagates [`UnionValue::decode`] failures for non-null input.
    fn decode_optional(value: &Value) -> Result<Option<Self>, UnionError> {
        if value.is_null() {
            return Ok(None);
        }
        Self::decode(value).map(Some)
    }

    /// Re-decodes the encoded form and reports an earlier alternative that
    /// would claim it.
    ///
    /// # Errors
    ///
    /// Returns [`UnionError::Ambiguous`] naming the shadowing alternative, or
    /// the encode/decode failure itself.
    fn check_unshadowed(&self) -> Result<(), UnionError> {
        let held = self.alternative();
        let decoded = Self::decode(&self.encode()?)?;
        let decoded_as = decoded.alternative();
        if held == decoded_as {
            Ok(())
        } else {
            Err(UnionError::Ambiguous {
                union: Self::NAME,
                held,
                shadowed_by: decoded_as,
            })
        }
    }
}

/// Attempts to decode a single alternative.
#[doc(hidden)]
#[must_use]
pub fn try_alternative<T>(union: &'static str, alternative: &'static str, value: &Value) -> Option<T>
where
    T: DeserializeOwned,
{
    match T::deserialize(value) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            trace!(
                target: UNION_TARGET,
                union,
                alternative,
                %error,
                "alternative rejected"
            );
            None
        }
    }
}

/// Declares a tagless union.
///
/// Variants are tuple variants holding exactly one payload each; their order
/// is the decode order. The macro derives `Debug`, `Clone` and `PartialEq`,
/// implements [`UnionValue`], and routes `Serialize`/`Deserialize` through it.
///
/// ```
/// use switchyard_protocol::union_type;
///
/// union_type! {
///     /// A count or a label.
///     pub enum CountOrLabel {
///         /// Numeric form.
///         Count(u32),
///         /// Textual form.
///         Label(String),
///     }
/// }
///
/// let decoded: CountOrLabel = serde_json::from_str("\"seven\"").unwrap();
/// assert_eq!(decoded, CountOrLabel::Label("seven".into()));
/// ```
#[macro_export]
macro_rules! union_type {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident($ty:ty)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant($ty),
            )+
        }

        impl $crate::union::UnionValue for $name {
            const NAME: &'static str = stringify!($name);
            const ALTERNATIVES: &'static [&'static str] = &[$(stringify!($variant)),+];

            fn alternative(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)+
                }
            }

            fn encode(
                &self,
            ) -> ::core::result::Result<$crate::__private::serde_json::Value, $crate::union::UnionError>
            {
                let held = $crate::union::UnionValue::alternative(self);
                match self {
                    $(Self::$variant(inner) => $crate::__private::serde_json::to_value(inner),)+
                }
                .map_err(|error| $crate::union::UnionError::encode(stringify!($name), held, &error))
            }

            fn decode(
                value: &$crate::__private::serde_json::Value,
            ) -> ::core::result::Result<Self, $crate::union::UnionError> {
                if value.is_null() {
                    return ::core::result::Result::Err(
                        $crate::union::UnionError::unexpected_null(stringify!($name)),
                    );
                }
                $(
                    if let ::core::option::Option::Some(inner) = $crate::union::try_alternative::<$ty>(
                        stringify!($name),
                        stringify!($variant),
                        value,
                    ) {
                        return ::core::result::Result::Ok(Self::$variant(inner));
                    }
                )+
                ::core::result::Result::Err($crate::union::UnionError::no_match(
                    stringify!($name),
                    <Self as $crate::union::UnionValue>::ALTERNATIVES,
                ))
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                let encoded = $crate::union::UnionValue::encode(self)
                    .map_err(<S::Error as $crate::__private::serde::ser::Error>::custom)?;
                $crate::__private::serde::Serialize::serialize(&encoded, serializer)
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                let value = <$crate::__private::serde_json::Value as $crate::__private::serde::Deserialize>::deserialize(
                    deserializer,
                )?;
                <Self as $crate::union::UnionValue>::decode(&value)
                    .map_err(<D::Error as $crate::__private::serde::de::Error>::custom)
            }
        }
    };
}

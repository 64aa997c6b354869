//! Two-phase decoding for `{"type": ..., ...}` tagged unions.
//!
//! The discriminator is read first, then the whole object is decoded into the
//! variant registered for it. Unregistered discriminators are not an error: the
//! result keeps the tag and carries no variant, so newer upstream kinds pass
//! through older clients untouched.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Decoder for one registered variant of a union.
pub type VariantDecoder<T> = fn(&Value) -> serde_json::Result<T>;

/// A union whose variants are selected by a `type` field.
pub trait TaggedUnion: Sized + 'static {
    /// Union name used in decode error messages.
    const NAME: &'static str;
    /// Discriminator value to variant decoder.
    const VARIANTS: &'static [(&'static str, VariantDecoder<Self>)];
}

#[derive(Debug, Error)]
/// Enumerates failures raised while decoding a tagged union.
pub enum FrameDecodeError {
    #[error("malformed json: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("{union} must be a json object")]
    NotAnObject { union: &'static str },
    #[error("{union} discriminator `type` must be a string")]
    InvalidDiscriminator { union: &'static str },
    #[error("failed to decode {union} variant `{kind}`: {source}")]
    Variant {
        union: &'static str,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// Decoded union value: the raw discriminator plus the matching variant, if known.
pub struct Tagged<T> {
    pub kind: String,
    pub variant: Option<T>,
}

impl<T> Tagged<T> {
    pub fn is_unknown(&self) -> bool {
        self.variant.is_none()
    }
}

/// Decodes one registered variant; used to fill `TaggedUnion::VARIANTS`.
pub fn decode_variant<V, T>(value: &Value) -> serde_json::Result<T>
where
    V: DeserializeOwned + Into<T>,
{
    V::deserialize(value).map(Into::into)
}

/// Reads the discriminator of `value`, then decodes the registered variant.
pub fn decode_tagged<T: TaggedUnion>(value: &Value) -> Result<Tagged<T>, FrameDecodeError> {
    let Some(object) = value.as_object() else {
        return Err(FrameDecodeError::NotAnObject { union: T::NAME });
    };
    let kind = match object.get("type") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(kind)) => kind.clone(),
        Some(_) => return Err(FrameDecodeError::InvalidDiscriminator { union: T::NAME }),
    };

    let Some((_, decoder)) = T::VARIANTS.iter().find(|(tag, _)| *tag == kind) else {
        return Ok(Tagged {
            kind,
            variant: None,
        });
    };
    let variant = decoder(value).map_err(|source| FrameDecodeError::Variant {
        union: T::NAME,
        kind: kind.clone(),
        source,
    })?;
    Ok(Tagged {
        kind,
        variant: Some(variant),
    })
}

/// Parses raw text and decodes it as a tagged union.
pub fn decode_tagged_str<T: TaggedUnion>(raw: &str) -> Result<Tagged<T>, FrameDecodeError> {
    let value = serde_json::from_str::<Value>(raw).map_err(FrameDecodeError::Syntax)?;
    decode_tagged(&value)
}

impl<'de, T: TaggedUnion> Deserialize<'de> for Tagged<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        decode_tagged(&value).map_err(D::Error::custom)
    }
}

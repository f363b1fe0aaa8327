/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/
use crate::utils::DecodeError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Turns the raw payload text of a frame into a typed value.
///
/// Any `Fn(&str) -> Result<T, DecodeError>` closure is a decoder, which is handy
/// for payloads that are not JSON or need post-processing.
pub trait PayloadDecoder<T>: Send + Sync {
    /// Decodes `raw` into a `T`.
    ///
    /// # Errors
    ///
    /// Returns the decoder's error when `raw` does not match the target shape.
    fn decode(&self, raw: &str) -> Result<T, DecodeError>;
}

impl<T, F> PayloadDecoder<T> for F
where
    F: Fn(&str) -> Result<T, DecodeError> + Send + Sync,
{
    fn decode(&self, raw: &str) -> Result<T, DecodeError> {
        self(raw)
    }
}

/// Decodes JSON payloads with `serde_json`.
pub struct JsonDecoder<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonDecoder<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> PayloadDecoder<T> for JsonDecoder<T> {
    fn decode(&self, raw: &str) -> Result<T, DecodeError> {
        serde_json::from_str(raw).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        a: i32,
    }

    #[test]
    fn test_json_decoder() {
        let decoder = JsonDecoder::<Sample>::new();
        assert_eq!(decoder.decode("{\"a\":1}").unwrap(), Sample { a: 1 });
    }

    #[test]
    fn test_json_decoder_rejects_invalid_payload() {
        let decoder = JsonDecoder::<Sample>::new();
        assert!(decoder.decode("not-json").is_err());
        assert!(decoder.decode("{\"b\":1}").is_err());
    }

    #[test]
    fn test_json_decoder_into_value() {
        let decoder = JsonDecoder::<serde_json::Value>::default();
        let value = decoder.decode("{\"a\":[1,2]}").unwrap();
        assert_eq!(value["a"][1], 2);
    }

    #[test]
    fn test_closure_decoder() {
        let decoder = |raw: &str| -> Result<usize, DecodeError> { Ok(raw.len()) };
        assert_eq!(decoder.decode("abcd").unwrap(), 4);
    }

    #[test]
    fn test_closure_decoder_error() {
        let decoder = |raw: &str| -> Result<u32, DecodeError> { Ok(raw.trim().parse()?) };
        assert_eq!(decoder.decode(" 42 ").unwrap(), 42);
        assert!(decoder.decode("x").is_err());
    }

    #[test]
    fn test_debug_names_target() {
        let decoder = JsonDecoder::<Sample>::new();
        assert!(format!("{:?}", decoder).contains("Sample"));
    }
}

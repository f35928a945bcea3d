//! Typed-value envelope for names, metadata and attribute values
//!
//! An [`AnyValue`] pairs a type url with a compact tagged payload:
//! one tag byte, one length byte, then the UTF-8 content. The set of
//! supported type urls is closed; decoding dispatches on [`PayloadKind`].

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type url of the string wrapper, the only payload kind seen on the wire
pub const STRING_VALUE_TYPE_URL: &str = "type.googleapis.com/google.protobuf.StringValue";

/// Field tag preceding a length-delimited string
const STRING_FIELD_TAG: u8 = 0x0A;

/// Largest content length representable by the single length byte
pub const MAX_CONTENT_LEN: usize = u8::MAX as usize;

/// Payload kinds understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    String,
}

impl PayloadKind {
    /// Resolve a type url by the message name after its last `/`
    pub fn for_type_url(type_url: &str) -> Option<Self> {
        let message = type_url.rsplit('/').next().unwrap_or(type_url);
        match message {
            "google.protobuf.StringValue" => Some(PayloadKind::String),
            _ => None,
        }
    }

    /// Canonical type url for this kind
    pub fn type_url(&self) -> &'static str {
        match self {
            PayloadKind::String => STRING_VALUE_TYPE_URL,
        }
    }
}

/// A decoded payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedValue {
    String(String),
}

impl TypedValue {
    pub fn kind(&self) -> PayloadKind {
        match self {
            TypedValue::String(_) => PayloadKind::String,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
        }
    }

    pub fn into_string(self) -> String {
        match self {
            TypedValue::String(s) => s,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Typed-value envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyValue {
    type_url: String,
    payload: Vec<u8>,
}

impl AnyValue {
    /// Encode a typed value under its canonical type url
    pub fn encode(value: &TypedValue) -> Result<Self> {
        match value {
            TypedValue::String(s) => Self::encode_string(STRING_VALUE_TYPE_URL, s),
        }
    }

    /// Encode a string under the string wrapper type url
    pub fn string(value: impl AsRef<str>) -> Result<Self> {
        Self::encode_string(STRING_VALUE_TYPE_URL, value.as_ref())
    }

    /// Encode a string under the given type url
    ///
    /// Fails with a validation error if the type url is not a string wrapper
    /// or the content does not fit the single length byte.
    pub fn encode_string(type_url: impl Into<String>, value: &str) -> Result<Self> {
        let type_url = type_url.into();
        if PayloadKind::for_type_url(&type_url) != Some(PayloadKind::String) {
            return Err(Error::ValidationError(format!(
                "type url {} does not denote a string value",
                type_url
            )));
        }

        let content = value.as_bytes();
        if content.len() > MAX_CONTENT_LEN {
            return Err(Error::ValidationError(format!(
                "string value of {} bytes exceeds the {} byte payload limit",
                content.len(),
                MAX_CONTENT_LEN
            )));
        }

        let mut payload = Vec::with_capacity(content.len() + 2);
        payload.push(STRING_FIELD_TAG);
        payload.push(content.len() as u8);
        payload.extend_from_slice(content);

        Ok(Self { type_url, payload })
    }

    /// Wrap raw payload bytes without checking them
    pub fn from_raw(type_url: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            payload,
        }
    }

    /// Build from a textual payload, trying hex first and then base64
    ///
    /// A candidate is accepted only if it decodes to a well-formed payload.
    pub fn from_text(type_url: impl Into<String>, text: &str) -> Result<Self> {
        let type_url = type_url.into();

        if let Ok(bytes) = hex::decode(text) {
            let candidate = Self::from_raw(type_url.clone(), bytes);
            if candidate.decode().is_ok() {
                return Ok(candidate);
            }
        }

        if let Ok(bytes) = STANDARD.decode(text) {
            let candidate = Self::from_raw(type_url.clone(), bytes);
            if candidate.decode().is_ok() {
                return Ok(candidate);
            }
        }

        Err(Error::Decode(format!(
            "payload for {} is neither hex nor base64 of a valid value",
            type_url
        )))
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decode the payload through the type url dispatch table
    pub fn decode(&self) -> Result<TypedValue> {
        match PayloadKind::for_type_url(&self.type_url) {
            Some(PayloadKind::String) => decode_string_payload(&self.payload).map(TypedValue::String),
            None => Err(Error::Decode(format!(
                "unsupported type url: {}",
                self.type_url
            ))),
        }
    }

    /// Decode a string wrapper payload
    pub fn decode_string(&self) -> Result<String> {
        self.decode().map(TypedValue::into_string)
    }

    /// Lowercase hex of the payload bytes
    pub fn to_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Standard base64 of the payload bytes
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.payload)
    }
}

fn decode_string_payload(payload: &[u8]) -> Result<String> {
    // An empty string is sometimes serialized with no field at all
    if payload.is_empty() {
        return Ok(String::new());
    }

    let (header, content) = payload
        .split_at_checked(2)
        .ok_or_else(|| Error::Decode("payload shorter than its header".to_string()))?;

    if header[0] != STRING_FIELD_TAG {
        return Err(Error::Decode(format!(
            "unexpected field tag 0x{:02X}",
            header[0]
        )));
    }

    let declared = header[1] as usize;
    if declared != content.len() {
        return Err(Error::Decode(format!(
            "declared length {} does not match {} content bytes",
            declared,
            content.len()
        )));
    }

    String::from_utf8(content.to_vec())
        .map_err(|e| Error::Decode(format!("payload is not valid UTF-8: {}", e)))
}

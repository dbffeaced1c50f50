//! Basic-style credential encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Header carrying the credential.
pub const AUTHORIZATION: &str = "authorization";

/// Scheme token preceding the encoded credential.
pub const BASIC_SCHEME: &str = "basic ";

/// Logical identity a quota is tracked against.
pub type Principal = String;

/// Reasons a credential could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Header value does not start with the `basic ` scheme.
    #[error("missing basic scheme")]
    MissingScheme,

    /// Payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(String),

    /// Decoded payload is not UTF-8.
    #[error("credential is not valid UTF-8")]
    Utf8,

    /// Decoded payload has no `:` separator.
    #[error("credential has no ':' separator")]
    MissingSeparator,
}

/// Build the `authorization` header value for a principal.
pub fn encode_credential(principal: &str) -> String {
    let pair = format!("{principal}:{principal}");
    format!("{}{}", BASIC_SCHEME, STANDARD.encode(pair.as_bytes()))
}

/// Recover the principal from an `authorization` header value.
///
/// The scheme is matched case-insensitively and whitespace inside the payload
/// is ignored, so MIME-wrapped encodings decode too.
pub fn decode_credential(header_value: &str) -> Result<Principal, DecodeError> {
    let scheme_len = BASIC_SCHEME.len();
    let scheme = header_value
        .get(..scheme_len)
        .ok_or(DecodeError::MissingScheme)?;
    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(DecodeError::MissingScheme);
    }

    let payload: String = header_value[scheme_len..]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let pair = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;

    pair.split_once(':')
        .map(|(principal, _)| principal.to_string())
        .ok_or(DecodeError::MissingSeparator)
}

/// Resolve the principal for a request, failing open.
///
/// A missing or undecodable header yields the empty principal.
pub fn principal_from_header(header_value: Option<&str>) -> Principal {
    let Some(value) = header_value else {
        return Principal::new();
    };

    match decode_credential(value) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::debug!(error = %e, "Credential rejected, treating as anonymous");
            Principal::new()
        }
    }
}

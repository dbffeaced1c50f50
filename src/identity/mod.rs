//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! Client:
//!     principal → codec.rs (encode_credential) → `authorization` header
//!
//! Server:
//!     `authorization` header → codec.rs (decode_credential)
//!     → principal_from_header (fail-open) → principal or ""
//! ```
//!
//! # Design Decisions
//! - The credential is an encoding, not a secret
//! - Decoding reports precise errors; the request path collapses them to the
//!   empty (anonymous) principal and never rejects a request

pub mod codec;

pub use codec::{
    decode_credential, encode_credential, principal_from_header, DecodeError, Principal,
    AUTHORIZATION, BASIC_SCHEME,
};

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → authority (principal + remaining quota)
//!     → response.rs (200 with `user` / `ratelimit-remaining`)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, EchoServer, ServerError};

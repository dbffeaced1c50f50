//! Network plumbing.

pub mod tls;

//! Shared response envelope types for API handlers.
//!
//! JSON responses produced by the gateway itself use a `{ "data": ... }`
//! envelope. Pass-through bodies from the backend (audio, model lists) are
//! returned as-is.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

//! API request and response types.

use serde::{Deserialize, Serialize};

/// Form fields submitted by the persona page.
///
/// Field names are the wire format expected by existing clients.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaForm {
    /// Industry the persona is targeted at
    pub branche: String,

    /// Free-text product description
    pub produktbeschreibung: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

//! Transport-level request/response shapes.

use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A normalized HTTP response handed back to the request pipeline.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: JsonValue,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

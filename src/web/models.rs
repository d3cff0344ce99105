use serde::{Deserialize, Serialize};

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // admin username
    pub exp: usize,
}

/// The admin behind a verified token, passed to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedAdmin {
    pub username: String,
}

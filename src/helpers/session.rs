use axum::http::HeaderMap;

pub const USER_HEADER: &str = "x-user-id";

/// Source of the authenticated user for the current interaction.
pub trait Session: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// Session resolved from the header the auth proxy sets on each request.
#[derive(Debug, Clone, Default)]
pub struct HeaderSession {
    user_id: Option<String>,
}

impl HeaderSession {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self { user_id }
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl Session for HeaderSession {
    fn current_user(&self) -> Option<String> {
        self.user_id.clone()
    }
}

/// Backend connection configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend API (default: `http://localhost:3000/api/v1`).
    pub base_url: String,
    /// Bearer token attached to every request, if any.
    pub access_token: Option<String>,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                        |
    /// |------------------------------|--------------------------------|
    /// | `JALON_API_URL`              | `http://localhost:3000/api/v1` |
    /// | `JALON_ACCESS_TOKEN`         | unset                          |
    /// | `JALON_REQUEST_TIMEOUT_SECS` | `30`                           |
    pub fn from_env() -> Self {
        let base_url = std::env::var("JALON_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000/api/v1".into());

        let access_token = std::env::var("JALON_ACCESS_TOKEN").ok();

        let request_timeout_secs: u64 = std::env::var("JALON_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("JALON_REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            base_url,
            access_token,
            request_timeout_secs,
        }
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            request_timeout_secs: 30,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

pub mod error;
pub mod stages;
pub mod versions;

pub use crate::error::ApiError;
pub use crate::stages::StagesApi;
pub use crate::versions::VersionsApi;

/// Documented local default, used when `STORYFORGE_API_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

pub const BASE_URL_ENV: &str = "STORYFORGE_API_URL";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn from_env() -> Self {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The same base with the scheme swapped to ws/wss, for the streaming
    /// generation channel.
    pub fn ws_base_url(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https") {
            format!("wss{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http") {
            format!("ws{rest}")
        } else {
            self.base_url.clone()
        }
    }
}

/// Thin facade over the stage/version HTTP resources. Cheap to clone; the
/// underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn stages(&self) -> StagesApi<'_> {
        StagesApi { client: self }
    }

    pub fn versions(&self) -> VersionsApi<'_> {
        VersionsApi { client: self }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }
}

use serde::Deserialize;

/// How vote/star actions reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStrategy {
    /// Full page navigation to a GET url, `like` in the query string.
    Navigation,
    /// Form POST in the background, then reload on success.
    #[default]
    Background,
}

/// Page level settings. Every field falls back to what the hasker templates
/// render, so a page without a `qa-config` block behaves like the stock site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub search_input_id: String,
    pub search_path: String,
    /// Prefix for every endpoint, empty for same-origin relative urls.
    pub base_url: String,
    pub csrf_cookie: String,
    pub csrf_field: String,
    pub strategy: RequestStrategy,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            search_input_id: "search_input".to_string(),
            search_path: "/qa/search".to_string(),
            base_url: String::new(),
            csrf_cookie: "csrftoken".to_string(),
            csrf_field: "csrfmiddlewaretoken".to_string(),
            strategy: RequestStrategy::default(),
        }
    }
}

impl QaConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Same as [`QaConfig::from_json`] but a broken block only costs a warning.
    pub fn from_json_or_default(raw: &str) -> Self {
        match Self::from_json(raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring malformed qa-config: {}", e);
                Self::default()
            }
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

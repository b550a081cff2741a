use crate::config::QaConfig;

pub const ENTER_KEY_CODE: u32 = 13;

/// A search results page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    page: Option<u32>,
}

impl SearchRequest {
    /// `None` when the input holds nothing but whitespace.
    pub fn from_input(value: &str) -> Option<Self> {
        if value.trim().is_empty() {
            return None;
        }
        Some(Self {
            query: value.to_string(),
            page: None,
        })
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn url(&self, config: &QaConfig) -> String {
        let mut url = format!(
            "{}?q={}",
            config.endpoint(&config.search_path),
            urlencoding::encode(&self.query)
        );
        if let Some(page) = self.page {
            url.push_str(&format!("&page={}", page));
        }
        url
    }
}

/// Where a key release in the search box should take the browser, if anywhere.
pub fn on_key_up(key_code: u32, value: &str, config: &QaConfig) -> Option<String> {
    if key_code != ENTER_KEY_CODE {
        return None;
    }
    SearchRequest::from_input(value).map(|request| request.url(config))
}

use std::collections::BTreeMap;

use crate::http::FetchError;

/// One candidate origin (base URL) for a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceCandidate {
    pub origin: String,
}

impl SourceCandidate {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }

    /// Candidates from origin strings, preserving order.
    pub fn list<I, S>(origins: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        origins.into_iter().map(Self::new).collect()
    }

    /// Absolute URL for `path` under the origin's own path, with `query` appended.
    ///
    /// `https://host/cms` and `/api/news` give `https://host/cms/api/news`.
    pub fn url_for(&self, path: &str, query: &BTreeMap<String, String>) -> Result<String, FetchError> {
        let mut base = url::Url::parse(&self.origin)
            .map_err(|e| FetchError::InvalidRequest(format!("origin {}: {}", self.origin, e)))?;
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }
        let mut url = base
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidRequest(format!("path {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url.into())
    }
}

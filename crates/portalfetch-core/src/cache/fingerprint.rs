use std::collections::BTreeMap;
use std::fmt;

/// Deterministic cache key for a request.
///
/// Renders as `endpoint` or `endpoint?k1=v1&k2=v2` with parameters sorted by
/// name, so the same parameters in any order address the same entry and
/// invalidation by endpoint substring stays readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    endpoint: String,
    params: BTreeMap<String, String>,
}

impl Fingerprint {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_only() {
        assert_eq!(Fingerprint::new("/api/channels").as_key(), "/api/channels");
    }

    #[test]
    fn params_sorted_regardless_of_order() {
        let a = Fingerprint::new("/api/news")
            .param("page", "2")
            .param("channel", "sports");
        let b = Fingerprint::new("/api/news").params([("channel", "sports"), ("page", "2")]);
        assert_eq!(a, b);
        assert_eq!(a.as_key(), "/api/news?channel=sports&page=2");
    }
}

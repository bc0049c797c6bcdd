use std::fmt;

/// Query-string key holding the directory search text.
pub const SEARCH_PARAM: &str = "search";

/// Path plus query pairs of an app location. Fragments are dropped; other
/// query parameters survive a search rewrite untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    path: String,
    params: Vec<(String, String)>,
}

impl Location {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.split('#').next().unwrap_or_default();
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));

        let params = serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed query string {:?}: {}", query, e);
            Vec::new()
        });

        Self {
            path: path.to_string(),
            params,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The search text, empty when absent.
    pub fn search(&self) -> &str {
        self.params
            .iter()
            .find(|(key, _)| key == SEARCH_PARAM)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    }

    /// This location with its search text replaced. Blank text removes the
    /// parameter.
    pub fn with_search(&self, text: &str) -> Self {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(key, _)| key != SEARCH_PARAM)
            .cloned()
            .collect();
        if !text.trim().is_empty() {
            params.push((SEARCH_PARAM.to_string(), text.to_string()));
        }
        Self {
            path: self.path.clone(),
            params,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.params.is_empty() {
            let query = serde_urlencoded::to_string(&self.params).map_err(|_| fmt::Error)?;
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

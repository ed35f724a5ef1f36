//! Session credentials: a JSON cookie jar exported from a logged-in browser
//! session, e.g. `[{"name": "c_user", "value": "1000..."}, ...]`.

use std::path::Path;

use serde::Deserialize;

use crate::error::SourceError;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    #[serde(alias = "key")]
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    cookies: Vec<Cookie>,
}

impl Credentials {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    /// Read and validate a cookie jar file.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
            .map_err(|e| SourceError::Credentials(format!("{}: {}", path.display(), e)))
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let cookies: Vec<Cookie> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        let cookies: Vec<Cookie> = cookies
            .into_iter()
            .filter(|c| !c.name.trim().is_empty())
            .collect();
        if cookies.is_empty() {
            return Err("cookie jar is empty".into());
        }
        Ok(Self { cookies })
    }

    /// Render as a single `Cookie` request header value.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

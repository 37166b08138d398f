use serde::{Deserialize, Deserializer, Serialize};

/// Opaque continuation cursor issued by the server.
///
/// Passed back verbatim on the next request. An absent or empty token
/// on the wire both decode to `None`, which ends pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl AsRef<str> for PageToken {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}
impl From<String> for PageToken {
    fn from(token: String) -> Self {
        PageToken(token)
    }
}
impl From<&str> for PageToken {
    fn from(token: &str) -> Self {
        PageToken(token.to_owned())
    }
}

impl PageToken {
    pub(crate) fn deserialize_next<'de, D>(deserializer: D) -> Result<Option<PageToken>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = Option::<String>::deserialize(deserializer)?;
        Ok(token.filter(|token| !token.is_empty()).map(PageToken))
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<PageToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<PageToken>) -> Self {
        Page { items, next_page_token }
    }

    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Page { items, next_page_token: None }
    }
}

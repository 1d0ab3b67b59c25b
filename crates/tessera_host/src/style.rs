//! Stylesheets adopted onto shadow roots

/// A stylesheet attached to an encapsulated boundary
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StyleSource {
    /// Linked by URL
    Url(String),
    /// Inline stylesheet text
    Inline(String),
}

impl StyleSource {
    pub fn url(href: impl Into<String>) -> Self {
        StyleSource::Url(href.into())
    }

    pub fn inline(css: impl Into<String>) -> Self {
        StyleSource::Inline(css.into())
    }
}

// Element selectors and ordered locator strategies
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
    TagName(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::TagName(value.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(v) => write!(f, "css={v}"),
            Selector::XPath(v) => write!(f, "xpath={v}"),
            Selector::TagName(v) => write!(f, "tag={v}"),
        }
    }
}

/// Candidates tried in order; later entries are less specific.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorStrategy {
    what: String,
    candidates: Vec<Selector>,
}

impl LocatorStrategy {
    pub fn new(what: impl Into<String>, candidates: Vec<Selector>) -> Self {
        Self {
            what: what.into(),
            candidates,
        }
    }

    pub fn what(&self) -> &str {
        &self.what
    }

    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }
}

use serde::{Deserialize, Serialize};

/// A model URI: `<resource-uri>#<fragment>`
///
/// An empty resource part means "the same resource as the referring
/// object"; a missing fragment addresses the resource's first root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelUri {
    resource: String,
    fragment: Option<String>,
}

impl ModelUri {
    pub fn new(resource: impl Into<String>, fragment: Option<String>) -> Self {
        Self {
            resource: resource.into(),
            fragment,
        }
    }

    /// Split `text` at the first `#`
    pub fn parse(text: &str) -> Self {
        match text.split_once('#') {
            Some((resource, fragment)) => Self::new(resource, Some(fragment.to_string())),
            None => Self::new(text, None),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// True when the URI names no resource and so points into the referrer's own
    pub fn is_local(&self) -> bool {
        self.resource.is_empty()
    }
}

impl From<&str> for ModelUri {
    fn from(text: &str) -> Self {
        ModelUri::parse(text)
    }
}

impl std::fmt::Display for ModelUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.fragment {
            Some(fragment) => write!(f, "{}#{}", self.resource, fragment),
            None => write!(f, "{}", self.resource),
        }
    }
}

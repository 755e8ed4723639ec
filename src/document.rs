use serde::{Deserialize, Serialize};

/// One extracted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Assigned by the store; absent until the document is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub url: String,
    pub title: String,
    #[serde(rename = "subsections")]
    pub sections: Vec<Section>,
}

impl Document {
    /// An empty document for a page about to be extracted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn paragraph_count(&self) -> usize {
        self.sections.iter().map(|s| s.paragraphs.len()).sum()
    }
}

/// A heading-delimited block of paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "subtitle")]
    pub heading: String,
    pub paragraphs: Vec<String>,
}

impl Section {
    pub fn titled(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            paragraphs: Vec::new(),
        }
    }

    /// No heading and no paragraphs yet.
    pub fn is_blank(&self) -> bool {
        self.heading.is_empty() && self.paragraphs.is_empty()
    }
}

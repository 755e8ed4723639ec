use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^h[1-9]$").unwrap());

/// Which recognized region of the page is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    #[default]
    None,
    Title,
    Heading,
    Paragraph,
}

impl Context {
    pub fn is_recognized(self) -> bool {
        self != Context::None
    }
}

/// Map a tag name to the context it opens. Unrecognized names map to [`Context::None`].
pub fn classify(name: &str) -> Context {
    match name {
        "title" => Context::Title,
        "p" => Context::Paragraph,
        _ if HEADING_RE.is_match(name) => Context::Heading,
        _ => Context::None,
    }
}

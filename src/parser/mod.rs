pub mod classify;
pub mod extract;
pub mod html;
pub mod token;

use std::io::Read;

pub use classify::{classify, Context};
pub use extract::{extract, extract_with, ExtractOptions, SENTINEL_HEADING};
pub use html::HtmlTokens;
pub use token::{Token, TokenKind, TokenList, TokenSource};

use crate::document::Document;
use crate::error::StreamError;

/// Two-stage pipeline: bytes → html tokens → document.
pub fn extract_html<R: Read>(
    reader: R,
    url: &str,
    options: &ExtractOptions,
) -> Result<Document, StreamError> {
    let mut tokens = HtmlTokens::new(reader);
    extract_with(&mut tokens, Document::new(url), options)
}

use serde::Deserialize;
use tracing::{debug, trace};

use super::classify::{classify, Context};
use super::token::{Token, TokenKind, TokenSource};
use crate::document::{Document, Section};
use crate::error::StreamError;

/// Heading given to paragraphs that appear before any heading.
pub const SENTINEL_HEADING: &str = "1st subsection";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub sentinel_heading: String,
    /// Keep the text that triggers the sentinel section instead of dropping it.
    pub keep_leading_text: bool,
    /// Commit an unterminated paragraph when another recognized tag opens or the stream ends.
    /// Without it only `</p>` commits paragraph text.
    pub close_open_paragraphs: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            sentinel_heading: SENTINEL_HEADING.to_string(),
            keep_leading_text: false,
            close_open_paragraphs: false,
        }
    }
}

/// Walk `tokens` until end-of-stream and fill `document` with its title and sections.
pub fn extract<S>(tokens: &mut S, document: Document) -> Result<Document, StreamError>
where
    S: TokenSource + ?Sized,
{
    extract_with(tokens, document, &ExtractOptions::default())
}

pub fn extract_with<S>(
    tokens: &mut S,
    document: Document,
    options: &ExtractOptions,
) -> Result<Document, StreamError>
where
    S: TokenSource + ?Sized,
{
    let mut extractor = Extractor {
        document,
        context: Context::None,
        section: Section::default(),
        paragraph: String::new(),
        options,
    };

    loop {
        let token = tokens.next_token()?;
        if token == Token::End {
            return Ok(extractor.finish());
        }
        extractor.step(token);
    }
}

struct Extractor<'a> {
    document: Document,
    context: Context,
    section: Section,
    paragraph: String,
    options: &'a ExtractOptions,
}

impl Extractor<'_> {
    fn step(&mut self, token: Token) {
        let kind = token.kind();
        let class = token.tag_name().map(classify).unwrap_or_default();

        match (kind, self.context) {
            (TokenKind::StartTag | TokenKind::EndTag, Context::None) if !class.is_recognized() => {}
            (TokenKind::StartTag, _) if class.is_recognized() => self.open(class),
            (TokenKind::EndTag, _) if class.is_recognized() => self.close(class),
            (_, Context::Title) => self.document.title = token.into_text(),
            (_, Context::Heading) => self.start_section(token.into_text()),
            (TokenKind::Text, Context::Paragraph) => self.push_text(token.into_text()),
            _ => {}
        }
    }

    fn open(&mut self, class: Context) {
        // Nested recognized tags replace the open context.
        if self.context == Context::Paragraph && self.options.close_open_paragraphs {
            self.commit_paragraph();
        }
        if class == Context::Paragraph {
            self.paragraph.clear();
        }
        self.context = class;
    }

    fn close(&mut self, class: Context) {
        if class == Context::Paragraph {
            self.commit_paragraph();
        }
        self.context = Context::None;
    }

    fn start_section(&mut self, heading: String) {
        trace!(heading = %heading, "starting section");
        let finished = std::mem::replace(&mut self.section, Section::titled(heading));
        if !finished.is_blank() {
            self.document.sections.push(finished);
        }
        self.paragraph.clear();
    }

    fn push_text(&mut self, text: String) {
        if self.section.heading.is_empty() {
            self.section = Section::titled(self.options.sentinel_heading.clone());
            if !self.options.keep_leading_text {
                return;
            }
        }
        self.paragraph.push_str(&text);
    }

    fn commit_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.section.paragraphs.push(std::mem::take(&mut self.paragraph));
        }
    }

    fn finish(mut self) -> Document {
        if self.context == Context::Paragraph && self.options.close_open_paragraphs {
            self.commit_paragraph();
        }
        self.document.sections.push(self.section);
        debug!(
            url = %self.document.url,
            sections = self.document.sections.len(),
            paragraphs = self.document.paragraph_count(),
            "extracted document"
        );
        self.document
    }
}

//! Pull-style token source over the html5ever tokenizer.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer,
    TokenizerOpts,
};

use super::token::{Token, TokenSource};
use crate::error::StreamError;

const READ_CHUNK: usize = 8 * 1024;

/// Collects tokenizer output, merging adjacent character runs into one text token.
#[derive(Default)]
struct Collector {
    ready: VecDeque<Token>,
    text: String,
}

impl Collector {
    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.ready.push_back(Token::Text(std::mem::take(&mut self.text)));
        }
    }
}

impl TokenSink for Collector {
    type Handle = ();

    fn process_token(&mut self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            HtmlToken::CharacterTokens(chars) => self.text.push_str(&chars),
            HtmlToken::NullCharacterToken => self.text.push('\u{FFFD}'),
            HtmlToken::TagToken(tag) => {
                self.flush_text();
                let name = tag.name.to_string();
                match tag.kind {
                    TagKind::StartTag => {
                        let raw = if tag.self_closing {
                            None
                        } else {
                            raw_kind(&name)
                        };
                        self.ready.push_back(Token::StartTag(name));
                        if let Some(kind) = raw {
                            return TokenSinkResult::RawData(kind);
                        }
                    }
                    TagKind::EndTag => self.ready.push_back(Token::EndTag(name)),
                }
            }
            HtmlToken::CommentToken(_) | HtmlToken::DoctypeToken(_) | HtmlToken::EOFToken => {
                self.flush_text()
            }
            HtmlToken::ParseError(_) => {}
        }
        TokenSinkResult::Continue
    }
}

/// Elements whose content is text rather than markup.
fn raw_kind(name: &str) -> Option<RawKind> {
    match name {
        "title" | "textarea" => Some(RawKind::Rcdata),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "script" => Some(RawKind::ScriptData),
        _ => None,
    }
}

/// Tokens read incrementally from any byte stream.
pub struct HtmlTokens<R> {
    reader: R,
    tokenizer: Tokenizer<Collector>,
    input: BufferQueue,
    undecoded: Vec<u8>,
    exhausted: bool,
}

impl<R: Read> HtmlTokens<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tokenizer: Tokenizer::new(Collector::default(), TokenizerOpts::default()),
            input: BufferQueue::new(),
            undecoded: Vec::new(),
            exhausted: false,
        }
    }

    fn fill(&mut self) -> Result<(), StreamError> {
        let mut buf = [0u8; READ_CHUNK];
        let read = loop {
            match self.reader.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if read == 0 {
            if !self.undecoded.is_empty() {
                let rest = String::from_utf8_lossy(&self.undecoded).into_owned();
                self.undecoded.clear();
                self.feed(rest);
            }
            self.tokenizer.end();
            self.exhausted = true;
            return Ok(());
        }

        self.undecoded.extend_from_slice(&buf[..read]);
        let text = drain_utf8(&mut self.undecoded);
        if !text.is_empty() {
            self.feed(text);
        }
        Ok(())
    }

    fn feed(&mut self, text: String) {
        self.input.push_back(StrTendril::from(text));
        let _ = self.tokenizer.feed(&mut self.input);
    }
}

impl<R: Read> TokenSource for HtmlTokens<R> {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        loop {
            if let Some(token) = self.tokenizer.sink.ready.pop_front() {
                return Ok(token);
            }
            if self.exhausted {
                return Ok(Token::End);
            }
            self.fill()?;
        }
    }
}

/// Decode the complete UTF-8 prefix of `bytes`, leaving a trailing partial sequence behind.
/// Invalid sequences become U+FFFD.
fn drain_utf8(bytes: &mut Vec<u8>) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut start = 0;
    while start < bytes.len() {
        match std::str::from_utf8(&bytes[start..]) {
            Ok(s) => {
                out.push_str(s);
                start = bytes.len();
            }
            Err(e) => {
                let valid = start + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&bytes[start..valid]));
                match e.error_len() {
                    Some(len) => {
                        out.push('\u{FFFD}');
                        start = valid + len;
                    }
                    None => {
                        start = valid;
                        break;
                    }
                }
            }
        }
    }
    bytes.drain(..start);
    out
}

use crate::error::StreamError;

/// A single lexical unit of markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag(String),
    EndTag(String),
    Text(String),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    StartTag,
    EndTag,
    Text,
    End,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::StartTag(_) => TokenKind::StartTag,
            Token::EndTag(_) => TokenKind::EndTag,
            Token::Text(_) => TokenKind::Text,
            Token::End => TokenKind::End,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Token::StartTag(name) | Token::EndTag(name) => Some(name),
            _ => None,
        }
    }

    /// Text content; tags and end-of-stream carry none.
    pub fn into_text(self) -> String {
        match self {
            Token::Text(text) => text,
            _ => String::new(),
        }
    }
}

/// Sequential producer of tokens.
///
/// Once the underlying input is exhausted, every further call yields [`Token::End`].
pub trait TokenSource {
    fn next_token(&mut self) -> Result<Token, StreamError>;
}

/// Tokens already held in memory.
#[derive(Debug, Clone)]
pub struct TokenList {
    tokens: std::vec::IntoIter<Token>,
}

impl TokenList {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }
}

impl TokenSource for TokenList {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        Ok(self.tokens.next().unwrap_or(Token::End))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_repeats_end() {
        let mut tokens = TokenList::new(vec![Token::Text("a".into())]);
        assert_eq!(tokens.next_token().unwrap(), Token::Text("a".into()));
        assert_eq!(tokens.next_token().unwrap(), Token::End);
        assert_eq!(tokens.next_token().unwrap(), Token::End);
    }

    #[test]
    fn tags_have_no_text() {
        assert_eq!(Token::StartTag("p".into()).into_text(), "");
        assert_eq!(Token::EndTag("p".into()).tag_name(), Some("p"));
        assert_eq!(Token::Text("x".into()).tag_name(), None);
        assert_eq!(Token::End.kind(), TokenKind::End);
    }
}

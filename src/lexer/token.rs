use std::fmt;

/// Kind of the most recently produced token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Nothing has been scanned yet.
    #[default]
    None,
    /// Plain text between separators.
    Normal,
    /// A balanced (or best-effort) quoted region, delimiters included.
    Quoted,
    /// A registered keyword.
    Keyword,
    /// The source is exhausted.
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenKind::None => "NONE",
            TokenKind::Normal => "NORMAL",
            TokenKind::Quoted => "QUOTED",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::End => "END",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Normal, text)
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Quoted, text)
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Keyword, text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.text)
    }
}

use thiserror::Error;

/// Configuration conflicts raised by the lexer's mutators.
///
/// Every check runs before the mutator writes anything, so a returned error
/// leaves the lexer state exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("Quote opener '{0}' starts with a whitespace character")]
    QuoteStartsWithWhitespace(String),

    #[error("Quote closer '{closer}' for '{opener}' is already registered as a quote opener")]
    QuoteEndIsQuoteStart { opener: String, closer: String },

    #[error("Keyword '{0}' starts with a whitespace character")]
    KeywordStartsWithWhitespace(String),

    #[error("Keyword '{keyword}' is a prefix of quote opener '{opener}'")]
    KeywordStartsWithQuote { keyword: String, opener: String },

    #[error("Empty symbols cannot be registered")]
    EmptySymbol,
}

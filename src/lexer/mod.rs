pub mod config;
pub mod error;
pub mod helpers;
pub mod state;
pub mod token;

use tracing::trace;

pub use config::{LexerConfig, Preset};
pub use error::LexerError;
pub use helpers::{escape_symbol, unescape_symbol};
pub use state::State;
pub use token::{Token, TokenKind};

/// Outcome of a longest-match lookup.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Match {
    Found(String),
    /// Characters read past the first one, still to be pushed back.
    Missed(String),
}

#[derive(Debug, Default)]
struct ScanState {
    /// An escape character was read and deferred: the next character is data.
    pending_escape: bool,
    /// The last quoted region ended with its quote stack empty.
    quote_closed: bool,
}

/// Character source plus everything that belongs to one scan session.
pub(crate) struct Scanner<I> {
    source: I,
    pushed: Vec<char>,
    escape: Option<char>,
    scan: ScanState,
}

impl<I: Iterator<Item = char>> Scanner<I> {
    pub(crate) fn new(source: I, escape: Option<char>) -> Self {
        Scanner {
            source,
            pushed: Vec::new(),
            escape,
            scan: ScanState::default(),
        }
    }

    /// Pulls the next token under `state`. Keyword text is returned in its
    /// stored (escape-doubled) form.
    fn next_token(&mut self, state: &State) -> Option<Token> {
        let mut buf = String::new();

        loop {
            let Some(c) = self.read_char() else {
                if std::mem::take(&mut self.scan.pending_escape) {
                    buf.extend(self.escape);
                }
                return (!buf.is_empty()).then(|| Token::normal(buf));
            };
            let is_escape = self.escape == Some(c);
            let was_escape = self.scan.pending_escape;

            if state.is_whitespace(c) {
                if !was_escape {
                    if !buf.is_empty() {
                        return Some(Token::normal(buf));
                    }
                    continue;
                }
                if !buf.is_empty() {
                    // The escaped separator starts the next token.
                    self.unread_char(c);
                    return Some(Token::normal(buf));
                }
                buf.push(c);
                self.scan.pending_escape = false;
                continue;
            }

            if !was_escape {
                if let Some(begin) = self.match_symbol(c, state.quote_starts()) {
                    if !buf.is_empty() {
                        self.unread(&begin);
                        return Some(Token::normal(buf));
                    }
                    return Some(Token::quoted(self.quoted_region(&begin, state)));
                }
                if let Some(keyword) = self.match_symbol(c, state.keywords()) {
                    if !buf.is_empty() {
                        self.unread(&keyword);
                        return Some(Token::normal(buf));
                    }
                    return Some(Token::keyword(keyword));
                }
            }

            self.scan.pending_escape = false;
            if is_escape && !was_escape && self.defers_escape(state) {
                self.scan.pending_escape = true;
            } else {
                buf.push(c);
            }
        }
    }

    /// Looks past a lone escape character. The escape is held back when it is
    /// followed by another escape, whitespace, or a registered symbol.
    fn defers_escape(&mut self, state: &State) -> bool {
        let Some(next) = self.read_char() else {
            return false;
        };
        if self.escape == Some(next) || state.is_whitespace(next) {
            self.unread_char(next);
            return true;
        }

        let symbol = self
            .match_symbol(next, state.quote_starts())
            .or_else(|| self.match_symbol(next, state.keywords()));
        match symbol {
            Some(symbol) => {
                self.unread(&symbol);
                true
            }
            None => {
                self.unread_char(next);
                false
            }
        }
    }

    /// Scans the rest of a quoted region opened by `begin`, balancing nested
    /// quotes of every kind registered in `outer`.
    ///
    /// Running out of input or meeting a closer that belongs to no open quote
    /// ends the region early; neither is an error, but the region is then
    /// recorded as unclosed.
    fn quoted_region(&mut self, begin: &str, outer: &State) -> String {
        let inner = outer.quoted_region();
        let mut buf = self.unescape(begin);
        let mut open = vec![begin.to_string()];
        trace!(opener = begin, "entering quoted region");

        while let Some(top) = open.last() {
            let expected = outer.closer_for(top);
            let Some(token) = self.next_token(&inner) else {
                trace!(depth = open.len(), "input ended inside quoted region");
                break;
            };

            match token.kind {
                TokenKind::Normal => buf.push_str(&token.text),
                TokenKind::Keyword => {
                    let symbol = token.text;
                    buf.push_str(&self.unescape(&symbol));
                    if outer.is_quote_end(&symbol) {
                        if expected == Some(symbol.as_str()) {
                            open.pop();
                        } else if outer.is_quote_start(&symbol) {
                            open.push(symbol);
                        } else {
                            trace!(closer = %symbol, "mismatched closer ends quoted region");
                            break;
                        }
                    } else if outer.is_quote_start(&symbol) {
                        open.push(symbol);
                    }
                }
                kind => unreachable!("{kind} token inside a quoted region"),
            }
        }

        self.scan.quote_closed = open.is_empty();
        buf
    }
}

/// A lexer that splits a character stream into normal, quoted and keyword
/// tokens.
///
/// Quote pairs, keywords and the whitespace class are configured at runtime
/// and can be changed between calls to [`next_token`](Self::next_token).
/// A lexer belongs to one source; scanning needs `&mut self`, so an instance
/// is never shared between threads while it scans.
pub struct BalancingLexer<I> {
    scanner: Scanner<I>,
    state: State,
    token: TokenKind,
    quote_closed: bool,
}

impl<'a> BalancingLexer<std::str::Chars<'a>> {
    pub fn from_text(text: &'a str, escape: Option<char>) -> Self {
        BalancingLexer::new(text.chars(), escape)
    }
}

impl<I: Iterator<Item = char>> BalancingLexer<I> {
    pub fn new(source: I, escape: Option<char>) -> Self {
        BalancingLexer {
            scanner: Scanner::new(source, escape),
            state: State::new(),
            token: TokenKind::None,
            quote_closed: false,
        }
    }

    pub fn with_config(source: I, config: LexerConfig) -> Result<Self, LexerError> {
        let mut lexer = BalancingLexer::new(source, config.escape);
        lexer.apply_preset(config.preset)?;
        for keyword in &config.keywords {
            lexer.add_keyword(keyword)?;
        }
        Ok(lexer)
    }

    pub fn escape_char(&self) -> Option<char> {
        self.scanner.escape
    }

    /// A copy of the current configuration.
    pub fn state(&self) -> State {
        self.state.clone()
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn word_range(&mut self, lo: char, hi: char) {
        self.state.mark_word(lo..=hi);
    }

    pub fn word_chars(&mut self, chars: impl IntoIterator<Item = char>) {
        self.state.mark_word(chars);
    }

    pub fn whitespace_range(&mut self, lo: char, hi: char) {
        self.state.mark_whitespace(lo..=hi, self.scanner.escape);
    }

    pub fn whitespace(&mut self, chars: impl IntoIterator<Item = char>) {
        self.state.mark_whitespace(chars, self.scanner.escape);
    }

    /// Registers a quote pair. An existing pair with the same opener is
    /// replaced, and keywords starting with the opener are dropped.
    pub fn add_quotes(&mut self, begin: &str, end: &str) -> Result<(), LexerError> {
        self.state.add_quotes(begin, end, self.scanner.escape)
    }

    pub fn add_keyword(&mut self, keyword: &str) -> Result<(), LexerError> {
        self.state.add_keyword(keyword, self.scanner.escape)
    }

    pub fn default_whitespace_setup(&mut self) {
        self.word_range('\0', '\u{ff}');
        self.whitespace_range('\0', ' ');
    }

    pub fn default_two_quote_setup(&mut self) -> Result<(), LexerError> {
        self.apply_preset(Preset::TwoQuote)
    }

    pub fn default_three_quote_setup(&mut self) -> Result<(), LexerError> {
        self.apply_preset(Preset::ThreeQuote)
    }

    pub fn default_two_quote_dollar_curly_setup(&mut self) -> Result<(), LexerError> {
        self.apply_preset(Preset::TwoQuoteDollarCurly)
    }

    pub fn default_three_quote_dollar_curly_setup(&mut self) -> Result<(), LexerError> {
        self.apply_preset(Preset::ThreeQuoteDollarCurly)
    }

    pub fn apply_preset(&mut self, preset: Preset) -> Result<(), LexerError> {
        self.default_whitespace_setup();
        for (begin, end) in preset.quote_pairs() {
            self.add_quotes(begin, end)?;
        }
        Ok(())
    }

    /// Returns the text of the next token, or `None` once the source is
    /// exhausted. [`token`](Self::token) reports its kind.
    pub fn next_token(&mut self) -> Option<String> {
        match self.scanner.next_token(&self.state) {
            Some(token) => {
                self.token = token.kind;
                self.quote_closed = token.kind == TokenKind::Quoted && self.scanner.scan.quote_closed;
                let text = match token.kind {
                    TokenKind::Keyword => self.scanner.unescape(&token.text),
                    _ => token.text,
                };
                Some(text)
            }
            None => {
                self.token = TokenKind::End;
                self.quote_closed = false;
                None
            }
        }
    }

    /// Kind of the token most recently returned by
    /// [`next_token`](Self::next_token).
    pub fn token(&self) -> TokenKind {
        self.token
    }

    /// Whether the most recent token was a quoted region whose opener found
    /// its closer. Unterminated and mismatched regions report `false`.
    pub fn quote_closed(&self) -> bool {
        self.quote_closed
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }
}

impl<I: Iterator<Item = char>> Iterator for BalancingLexer<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let text = self.next_token()?;
        Some(Token::new(self.token, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lexer(input: &str, escape: Option<char>) -> BalancingLexer<std::str::Chars<'_>> {
        let mut lexer = BalancingLexer::from_text(input, escape);
        lexer.default_whitespace_setup();
        lexer
    }

    fn assert_tokens(lexer: &mut BalancingLexer<std::str::Chars<'_>>, expected: Vec<Token>) {
        let tokens = lexer.tokenize();
        assert_eq!(tokens, expected);
        assert_eq!(lexer.token(), TokenKind::End);
        assert_eq!(lexer.next_token(), None);
    }

    #[test]
    fn test_whitespace_only_split() {
        let mut lexer = lexer("abc def\\ ghi 123\n456", None);
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("abc"),
                Token::normal("def\\"),
                Token::normal("ghi"),
                Token::normal("123"),
                Token::normal("456"),
            ],
        );
    }

    #[test]
    fn test_empty_input() {
        let mut lexer = lexer("", Some('\\'));
        assert_eq!(lexer.token(), TokenKind::None);
        assert_eq!(lexer.next_token(), None);
        assert_eq!(lexer.token(), TokenKind::End);
    }

    #[test]
    fn test_only_whitespace() {
        let mut lexer = lexer(" \t\r\n  ", Some('\\'));
        assert_tokens(&mut lexer, vec![]);
    }

    #[test]
    fn test_token_kind_follows_each_call() {
        let mut lexer = lexer("a 'b' ;", None);
        lexer.default_two_quote_setup().unwrap();
        lexer.add_keyword(";").unwrap();

        assert_eq!(lexer.token(), TokenKind::None);
        assert_eq!(lexer.next_token().as_deref(), Some("a"));
        assert_eq!(lexer.token(), TokenKind::Normal);
        assert_eq!(lexer.next_token().as_deref(), Some("'b'"));
        assert_eq!(lexer.token(), TokenKind::Quoted);
        assert_eq!(lexer.next_token().as_deref(), Some(";"));
        assert_eq!(lexer.token(), TokenKind::Keyword);
        assert_eq!(lexer.next_token(), None);
        assert_eq!(lexer.token(), TokenKind::End);
    }

    #[test]
    fn test_nested_different_quotes() {
        let mut lexer = lexer("abc \"def ghi 'abc'\" 123", Some('\\'));
        lexer.default_two_quote_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("abc"),
                Token::quoted("\"def ghi 'abc'\""),
                Token::normal("123"),
            ],
        );
    }

    #[test]
    fn test_quote_keeps_inner_whitespace_and_keywords() {
        let mut lexer = lexer("'a ; b';", None);
        lexer.default_two_quote_setup().unwrap();
        lexer.add_keyword(";").unwrap();
        assert_tokens(
            &mut lexer,
            vec![Token::quoted("'a ; b'"), Token::keyword(";")],
        );
    }

    #[test]
    fn test_mismatched_closer_ends_quote() {
        let mut lexer = lexer("'abc}", None);
        lexer.add_quotes("${", "}").unwrap();
        lexer.add_quotes("'", "'").unwrap();
        assert_tokens(&mut lexer, vec![Token::quoted("'abc}")]);
    }

    #[test]
    fn test_mismatched_closer_leaves_rest_for_next_token() {
        let mut lexer = lexer("'abc} def'", None);
        lexer.default_two_quote_dollar_curly_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::quoted("'abc}"),
                Token::normal("def"),
                Token::quoted("'"),
            ],
        );
    }

    #[test]
    fn test_quote_closed_tracks_each_region() {
        let mut lexer = lexer("'a' x \"b\\\" 'c}", Some('\\'));
        lexer.default_two_quote_dollar_curly_setup().unwrap();

        assert_eq!(lexer.next_token().as_deref(), Some("'a'"));
        assert!(lexer.quote_closed());
        assert_eq!(lexer.next_token().as_deref(), Some("x"));
        assert!(!lexer.quote_closed());
        // The escaped closer is data, so the region never closes.
        assert_eq!(lexer.next_token().as_deref(), Some("\"b\" 'c}"));
        assert_eq!(lexer.token(), TokenKind::Quoted);
        assert!(!lexer.quote_closed());
        assert_eq!(lexer.next_token(), None);
        assert!(!lexer.quote_closed());
    }

    #[test]
    fn test_unterminated_quote_takes_rest_of_input() {
        let mut lexer = lexer("x \"never closed 'here", None);
        lexer.default_two_quote_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![Token::normal("x"), Token::quoted("\"never closed 'here")],
        );
    }

    #[test]
    fn test_quote_directly_after_text_starts_next_token() {
        let mut lexer = lexer("abc\"d e\"f", None);
        lexer.default_two_quote_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("abc"),
                Token::quoted("\"d e\""),
                Token::normal("f"),
            ],
        );
    }

    #[test]
    fn test_dollar_curly_end_to_end() {
        let mut lexer = lexer("abc=${def;ghi='abc'};123", Some('\\'));
        lexer.default_three_quote_dollar_curly_setup().unwrap();
        lexer.add_keyword(";").unwrap();
        lexer.add_keyword("=").unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("abc"),
                Token::keyword("="),
                Token::quoted("${def;ghi='abc'}"),
                Token::keyword(";"),
                Token::normal("123"),
            ],
        );
    }

    #[test]
    fn test_deeply_nested_quotes() {
        let mut lexer = lexer("${a \"b `c ${d}` e\" f} g", None);
        lexer.default_three_quote_dollar_curly_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::quoted("${a \"b `c ${d}` e\" f}"),
                Token::normal("g"),
            ],
        );
    }

    #[test]
    fn test_keywords_without_shared_prefix() {
        let mut lexer = lexer("abc", None);
        for keyword in ["apple", "alabama", "anthem"] {
            lexer.add_keyword(keyword).unwrap();
        }
        assert_tokens(&mut lexer, vec![Token::normal("abc")]);
    }

    #[test]
    fn test_strict_prefix_is_not_a_keyword() {
        let mut lexer = lexer("alabamx anthem alabama an", None);
        for keyword in ["apple", "alabama", "anthem"] {
            lexer.add_keyword(keyword).unwrap();
        }
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("alabamx"),
                Token::keyword("anthem"),
                Token::keyword("alabama"),
                Token::normal("an"),
            ],
        );
    }

    #[test]
    fn test_keywords_split_text_without_whitespace() {
        let mut lexer = lexer("a<=b<c", None);
        lexer.add_keyword("<").unwrap();
        lexer.add_keyword("<=").unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("a"),
                Token::keyword("<="),
                Token::normal("b"),
                Token::keyword("<"),
                Token::normal("c"),
            ],
        );
    }

    #[test]
    fn test_whitespace_reclassification_prunes_keyword() {
        let mut lexer = lexer("hello", None);
        lexer.add_keyword("hello").unwrap();
        lexer.whitespace_range('\0', 'h');

        assert!(lexer.state().keywords().is_empty());
        // Everything up to and including 'h' is now whitespace.
        assert_tokens(&mut lexer, vec![Token::normal("llo")]);
    }

    #[test]
    fn test_whitespace_reclassification_prunes_quote() {
        let mut lexer = lexer("a'b c'd", None);
        lexer.default_two_quote_setup().unwrap();
        lexer.whitespace(['\'']);

        assert!(!lexer.state().is_quote_start("'"));
        assert!(lexer.state().is_quote_start("\""));
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("a"),
                Token::normal("b"),
                Token::normal("c"),
                Token::normal("d"),
            ],
        );
    }

    #[test]
    fn test_word_reclassification_prunes_keyword_and_quote() {
        let mut lexer = lexer("hello 'x'", None);
        lexer.default_two_quote_setup().unwrap();
        lexer.add_keyword("hello").unwrap();
        lexer.word_chars(['h', '\'']);

        let state = lexer.state();
        assert!(state.keywords().is_empty());
        assert!(!state.is_quote_start("'"));
        assert!(!state.is_quote_end("'"));
        assert_tokens(
            &mut lexer,
            vec![Token::normal("hello"), Token::normal("'x'")],
        );
    }

    #[test]
    fn test_escaped_whitespace_starts_next_token() {
        let mut lexer = lexer("foo\\ bar", Some('\\'));
        assert_tokens(
            &mut lexer,
            vec![Token::normal("foo"), Token::normal(" bar")],
        );
    }

    #[test]
    fn test_escaped_whitespace_at_token_start() {
        let mut lexer = lexer("\\ x foo\\ ", Some('\\'));
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal(" x"),
                Token::normal("foo"),
                Token::normal(" "),
            ],
        );
    }

    #[test]
    fn test_doubled_escape_is_one_literal_escape() {
        let mut lexer = lexer("a\\\\b", Some('\\'));
        assert_tokens(&mut lexer, vec![Token::normal("a\\b")]);
    }

    #[test]
    fn test_lone_escape_before_data_is_literal() {
        let mut lexer = lexer("a\\b c \\", Some('\\'));
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("a\\b"),
                Token::normal("c"),
                Token::normal("\\"),
            ],
        );
    }

    #[test]
    fn test_escaped_quote_is_data() {
        let mut lexer = lexer("say \\\"hi\\\"", Some('\\'));
        lexer.default_two_quote_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![Token::normal("say"), Token::normal("\"hi\"")],
        );
    }

    #[test]
    fn test_escaped_quote_inside_quoted_region() {
        let mut lexer = lexer("\"a \\\"b\\\" c\" d", Some('\\'));
        lexer.default_two_quote_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![Token::quoted("\"a \"b\" c\""), Token::normal("d")],
        );
    }

    #[test]
    fn test_escaped_keyword_is_data() {
        let mut lexer = lexer("a\\;b;c", Some('\\'));
        lexer.add_keyword(";").unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("a;b"),
                Token::keyword(";"),
                Token::normal("c"),
            ],
        );
    }

    #[test]
    fn test_escape_char_leading_a_symbol() {
        let mut lexer = lexer("${a} $${b}", Some('$'));
        lexer.default_two_quote_dollar_curly_setup().unwrap();
        assert_tokens(
            &mut lexer,
            vec![Token::quoted("${a}"), Token::normal("${b}")],
        );
    }

    #[test]
    fn test_keyword_with_inner_escape_is_reported_unescaped() {
        let mut lexer = lexer("x a$$b y", Some('$'));
        lexer.add_keyword("a$b").unwrap();

        assert!(lexer.state().keywords().contains("a$$b"));
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("x"),
                Token::keyword("a$b"),
                Token::normal("y"),
            ],
        );
    }

    #[test]
    fn test_configuration_errors_leave_state_untouched() {
        let mut lexer = lexer("", Some('\\'));
        lexer.default_two_quote_dollar_curly_setup().unwrap();
        let before = lexer.state();

        assert_eq!(
            lexer.add_quotes(" x", "x"),
            Err(LexerError::QuoteStartsWithWhitespace(" x".to_string()))
        );
        assert_eq!(
            lexer.add_keyword("\tk"),
            Err(LexerError::KeywordStartsWithWhitespace("\tk".to_string()))
        );
        assert!(matches!(
            lexer.add_keyword("$"),
            Err(LexerError::KeywordStartsWithQuote { .. })
        ));
        assert!(matches!(
            lexer.add_quotes("<", "${"),
            Err(LexerError::QuoteEndIsQuoteStart { .. })
        ));
        assert_eq!(lexer.state(), before);
    }

    #[test]
    fn test_escape_char_is_never_whitespace() {
        let mut lexer = lexer("a\\ b", Some(' '));
        lexer.whitespace([' ']);
        assert!(!lexer.state().is_whitespace(' '));
    }

    #[test]
    fn test_state_can_be_shared_between_lexers() {
        let mut first = lexer("", Some('\\'));
        first.default_three_quote_setup().unwrap();
        first.add_keyword("|").unwrap();

        let mut second = BalancingLexer::from_text("ls 'a b'|wc", Some('\\'));
        second.set_state(first.state());
        assert_tokens(
            &mut second,
            vec![
                Token::normal("ls"),
                Token::quoted("'a b'"),
                Token::keyword("|"),
                Token::normal("wc"),
            ],
        );
    }

    #[test]
    fn test_configuration_can_change_between_tokens() {
        let mut lexer = lexer("a;b c;d", None);
        assert_eq!(lexer.next_token().as_deref(), Some("a;b"));

        lexer.add_keyword(";").unwrap();
        assert_tokens(
            &mut lexer,
            vec![
                Token::normal("c"),
                Token::keyword(";"),
                Token::normal("d"),
            ],
        );
    }

    #[test]
    fn test_with_config() {
        let config = LexerConfig {
            escape: Some('\\'),
            preset: Preset::TwoQuote,
            keywords: vec!["&&".to_string()],
        };
        let mut lexer = BalancingLexer::with_config("a&&'b c'".chars(), config).unwrap();
        assert_eq!(lexer.escape_char(), Some('\\'));
        assert_eq!(
            lexer.tokenize(),
            vec![
                Token::normal("a"),
                Token::keyword("&&"),
                Token::quoted("'b c'"),
            ]
        );
    }
}

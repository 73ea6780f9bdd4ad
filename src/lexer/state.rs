use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::error::LexerError;
use super::helpers::escape_symbol;

/// Character classes, quote pairs and keywords that drive a scan.
///
/// Symbols are stored escape-doubled (see [`escape_symbol`]) so they can be
/// compared directly against raw input. A `State` is a plain value: clone it
/// to snapshot a configuration and hand it to another lexer with
/// [`BalancingLexer::set_state`](super::BalancingLexer::set_state). The
/// receiving lexer should use the same escape character, otherwise the stored
/// forms will not line up with its input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    whitespace: BTreeSet<char>,
    quote_starts: BTreeSet<String>,
    quote_ends: BTreeSet<String>,
    quote_pairs: BTreeMap<String, String>,
    keywords: BTreeSet<String>,
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    pub fn is_whitespace(&self, c: char) -> bool {
        self.whitespace.contains(&c)
    }

    pub fn whitespace(&self) -> &BTreeSet<char> {
        &self.whitespace
    }

    pub fn quote_starts(&self) -> &BTreeSet<String> {
        &self.quote_starts
    }

    pub fn quote_ends(&self) -> &BTreeSet<String> {
        &self.quote_ends
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    pub fn is_quote_start(&self, symbol: &str) -> bool {
        self.quote_starts.contains(symbol)
    }

    pub fn is_quote_end(&self, symbol: &str) -> bool {
        self.quote_ends.contains(symbol)
    }

    /// The closer registered for `opener`, in stored form.
    pub fn closer_for(&self, opener: &str) -> Option<&str> {
        self.quote_pairs.get(opener).map(String::as_str)
    }

    /// Removes `chars` from the whitespace class and drops every keyword and
    /// quote opener that starts with one of them.
    pub(crate) fn mark_word(&mut self, chars: impl IntoIterator<Item = char>) {
        let chars: BTreeSet<char> = chars.into_iter().collect();
        for c in &chars {
            self.whitespace.remove(c);
        }
        self.prune_leading(&chars);
    }

    /// Adds `chars` to the whitespace class and drops every keyword and quote
    /// opener that starts with one of them. The escape character is never
    /// added.
    pub(crate) fn mark_whitespace(
        &mut self,
        chars: impl IntoIterator<Item = char>,
        escape: Option<char>,
    ) {
        let chars: BTreeSet<char> = chars
            .into_iter()
            .filter(|c| Some(*c) != escape)
            .collect();
        self.whitespace.extend(chars.iter().copied());
        self.prune_leading(&chars);
    }

    pub(crate) fn add_quotes(
        &mut self,
        begin: &str,
        end: &str,
        escape: Option<char>,
    ) -> Result<(), LexerError> {
        let Some(first) = begin.chars().next() else {
            return Err(LexerError::EmptySymbol);
        };
        if end.is_empty() {
            return Err(LexerError::EmptySymbol);
        }
        if self.is_whitespace(first) {
            return Err(LexerError::QuoteStartsWithWhitespace(begin.to_string()));
        }

        let stored_begin = escape_symbol(begin, escape);
        let stored_end = escape_symbol(end, escape);
        if stored_end != stored_begin && self.quote_starts.contains(&stored_end) {
            return Err(LexerError::QuoteEndIsQuoteStart {
                opener: begin.to_string(),
                closer: end.to_string(),
            });
        }

        if self.quote_starts.contains(&stored_begin) {
            debug!(opener = begin, "replacing existing quote pair");
            self.remove_quote(&stored_begin);
        }

        let shadowed: Vec<String> = self
            .keywords
            .iter()
            .filter(|keyword| keyword.starts_with(stored_begin.as_str()))
            .cloned()
            .collect();
        for keyword in shadowed {
            debug!(keyword = %keyword, opener = begin, "keyword shadowed by quote opener");
            self.keywords.remove(&keyword);
        }

        self.quote_starts.insert(stored_begin.clone());
        self.quote_ends.insert(stored_end.clone());
        self.quote_pairs.insert(stored_begin, stored_end);
        Ok(())
    }

    pub(crate) fn add_keyword(&mut self, keyword: &str, escape: Option<char>) -> Result<(), LexerError> {
        let Some(first) = keyword.chars().next() else {
            return Err(LexerError::EmptySymbol);
        };
        if self.is_whitespace(first) {
            return Err(LexerError::KeywordStartsWithWhitespace(keyword.to_string()));
        }

        let stored = escape_symbol(keyword, escape);
        if let Some(opener) = self
            .quote_starts
            .iter()
            .find(|opener| opener.starts_with(stored.as_str()))
        {
            return Err(LexerError::KeywordStartsWithQuote {
                keyword: keyword.to_string(),
                opener: opener.clone(),
            });
        }

        self.keywords.insert(stored);
        Ok(())
    }

    /// State used while inside a quoted region: nothing is whitespace, no
    /// opener starts a new region, and every outer opener or closer is
    /// reported as a keyword.
    pub(crate) fn quoted_region(&self) -> State {
        State {
            keywords: self
                .quote_starts
                .union(&self.quote_ends)
                .cloned()
                .collect(),
            ..State::default()
        }
    }

    fn prune_leading(&mut self, chars: &BTreeSet<char>) {
        let starts_in = |symbol: &str| {
            symbol
                .chars()
                .next()
                .is_some_and(|first| chars.contains(&first))
        };

        let keywords: Vec<String> = self.keywords.iter().filter(|k| starts_in(k.as_str())).cloned().collect();
        for keyword in keywords {
            debug!(keyword = %keyword, "pruned keyword after reclassification");
            self.keywords.remove(&keyword);
        }

        let openers: Vec<String> = self
            .quote_starts
            .iter()
            .filter(|q| starts_in(q.as_str()))
            .cloned()
            .collect();
        for opener in openers {
            debug!(opener = %opener, "pruned quote pair after reclassification");
            self.remove_quote(&opener);
        }
    }

    fn remove_quote(&mut self, opener: &str) {
        self.quote_starts.remove(opener);
        if let Some(closer) = self.quote_pairs.remove(opener) {
            // Closers may be shared between pairs.
            if !self.quote_pairs.values().any(|other| *other == closer) {
                self.quote_ends.remove(&closer);
            }
        }
    }
}

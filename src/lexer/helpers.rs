use std::collections::BTreeSet;
use std::ops::Bound;

use super::{Match, Scanner};

/// Doubles every occurrence of `escape` after the first character of `symbol`.
///
/// The first character is never doubled: a leading escape character in a
/// symbol is part of the symbol, not an escape.
pub fn escape_symbol(symbol: &str, escape: Option<char>) -> String {
    let Some(escape) = escape else {
        return symbol.to_string();
    };
    let mut chars = symbol.chars();
    let mut escaped = String::with_capacity(symbol.len());
    escaped.extend(chars.next());
    for c in chars {
        escaped.push(c);
        if c == escape {
            escaped.push(escape);
        }
    }
    escaped
}

/// Inverse of [`escape_symbol`]: collapses doubled escapes after the first
/// character.
pub fn unescape_symbol(symbol: &str, escape: Option<char>) -> String {
    let Some(escape) = escape else {
        return symbol.to_string();
    };
    let mut chars = symbol.chars().peekable();
    let mut unescaped = String::with_capacity(symbol.len());
    unescaped.extend(chars.next());
    while let Some(c) = chars.next() {
        unescaped.push(c);
        if c == escape && chars.peek() == Some(&escape) {
            chars.next();
        }
    }
    unescaped
}

/// At most two candidates starting with `prefix`; enough to tell "none",
/// "exactly one" and "ambiguous" apart.
fn prefixed<'c>(candidates: &'c BTreeSet<String>, prefix: &str) -> Vec<&'c String> {
    candidates
        .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(|candidate| candidate.starts_with(prefix))
        .take(2)
        .collect()
}

impl<I: Iterator<Item = char>> Scanner<I> {
    pub(super) fn read_char(&mut self) -> Option<char> {
        self.pushed.pop().or_else(|| self.source.next())
    }

    pub(super) fn unread_char(&mut self, c: char) {
        self.pushed.push(c);
    }

    pub(super) fn unread(&mut self, text: &str) {
        self.pushed.extend(text.chars().rev());
    }

    pub(super) fn unescape(&self, symbol: &str) -> String {
        unescape_symbol(symbol, self.escape)
    }

    /// Longest-match lookup of the symbol starting with the already consumed
    /// `first` character.
    ///
    /// On a miss the characters read after `first` are handed back in
    /// [`Match::Missed`] for the caller to push back.
    pub(super) fn find_match(&mut self, first: char, candidates: &BTreeSet<String>) -> Match {
        let mut buf = String::from(first);
        let mut longest = candidates.contains(&buf).then(|| buf.clone());
        let mut survivors = prefixed(candidates, &buf);
        let mut exhausted = false;

        while survivors.len() > 1 {
            let Some(c) = self.read_char() else {
                exhausted = true;
                break;
            };
            buf.push(c);
            survivors = prefixed(candidates, &buf);
            if candidates.contains(&buf) {
                longest = Some(buf.clone());
            }
        }

        if let [single] = survivors.as_slice() {
            if !exhausted {
                let wanted = single.chars().count();
                while buf.chars().count() < wanted {
                    match self.read_char() {
                        Some(c) => buf.push(c),
                        None => break,
                    }
                }
                if buf == **single {
                    return Match::Found(buf);
                }
            }
        }

        if let Some(symbol) = longest {
            let overshoot: String = buf.chars().skip(symbol.chars().count()).collect();
            self.unread(&overshoot);
            return Match::Found(symbol);
        }

        Match::Missed(buf.chars().skip(1).collect())
    }

    /// [`find_match`](Self::find_match) with the pushback applied on a miss.
    pub(super) fn match_symbol(&mut self, first: char, candidates: &BTreeSet<String>) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        match self.find_match(first, candidates) {
            Match::Found(symbol) => Some(symbol),
            Match::Missed(lookahead) => {
                self.unread(&lookahead);
                None
            }
        }
    }
}

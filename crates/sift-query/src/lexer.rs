//! Query lexer (tokenizer).
//!
//! Converts a query string into a stream of tokens for the parser. Lexing
//! never fails: malformed input degrades to the best available tokens and a
//! list of [`Issue`]s.

use std::{iter::Peekable, str::Chars};

use serde::{Deserialize, Serialize};

use crate::{
    ast::CompareOp,
    issue::{Issue, IssueCode},
};

/// A token in the query language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// The AND keyword.
    And,

    /// The OR keyword.
    Or,

    /// The NOT keyword or negation prefix (-).
    Not,

    /// A structured `field:value` condition.
    Filter {
        /// Field name, escapes resolved.
        field: String,
        /// Comparison operator (`=` when none was written).
        operator: CompareOp,
        /// Comparison value, escapes resolved.
        value: String,
    },

    /// A free-text term, bare or quoted, escapes resolved.
    Text(String),

    /// End of input.
    Eof,
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Tokens produced so far.
    tokens: Vec<Token>,
    /// Issues discovered so far.
    issues: Vec<Issue>,
    /// Token budget; scanning stops once this many tokens exist.
    max_tokens: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str, max_tokens: usize) -> Self {
        Self {
            chars: input.chars().peekable(),
            tokens: Vec::new(),
            issues: Vec::new(),
            max_tokens,
        }
    }

    /// Tokenizes the entire input.
    ///
    /// A trailing [`Token::Eof`] is appended unless the token budget cut
    /// scanning short, in which case the partial list is returned as-is and
    /// the parser treats the premature end of stream as end of input. The
    /// budget only fires while unscanned input remains, so a query that
    /// lands exactly on the limit is not flagged.
    fn run(mut self) -> (Vec<Token>, Vec<Issue>) {
        loop {
            self.skip_whitespace();
            let Some(&ch) = self.chars.peek() else {
                break;
            };

            if self.tokens.len() >= self.max_tokens {
                self.issues.push(Issue::new(IssueCode::MaxTokensExceeded));
                return (self.tokens, self.issues);
            }

            match ch {
                '(' => {
                    self.chars.next();
                    self.tokens.push(Token::LParen);
                }
                ')' => {
                    self.chars.next();
                    self.tokens.push(Token::RParen);
                }
                '"' => {
                    let text = self.read_quoted();
                    self.tokens.push(Token::Text(text));
                }
                '-' => self.scan_negation(),
                _ => {
                    let word = self.read_word();
                    let token = self.classify(&word);
                    self.tokens.push(token);
                }
            }
        }

        self.tokens.push(Token::Eof);
        (self.tokens, self.issues)
    }

    /// Scans a `-` at token start.
    ///
    /// Followed by a non-whitespace character it negates the next token;
    /// otherwise it is an ordinary text term. A parenthesis after the `-` is
    /// left for the next scan step, so `-(a b)` negates the whole group.
    fn scan_negation(&mut self) {
        self.chars.next(); // consume -

        let negates = self
            .chars
            .peek()
            .is_some_and(|&next| !next.is_whitespace());
        if !negates {
            self.tokens.push(Token::Text("-".to_string()));
            return;
        }

        self.tokens.push(Token::Not);
        match self.chars.peek() {
            Some(&'(') | Some(&')') => {}
            Some(&'"') => {
                let text = self.read_quoted();
                self.tokens.push(Token::Text(text));
            }
            _ => {
                // keywords are not recognized here: -AND negates the literal word
                let word = self.read_word();
                let token = self
                    .filter_token(&word)
                    .unwrap_or_else(|| Token::Text(resolve_escapes(&word)));
                self.tokens.push(token);
            }
        }
    }

    /// Classifies a raw unquoted word as keyword, filter, or text.
    fn classify(&mut self, word: &str) -> Token {
        if word.eq_ignore_ascii_case("AND") {
            return Token::And;
        }
        if word.eq_ignore_ascii_case("OR") {
            return Token::Or;
        }
        if word.eq_ignore_ascii_case("NOT") {
            return Token::Not;
        }

        self.filter_token(word)
            .unwrap_or_else(|| Token::Text(resolve_escapes(word)))
    }

    /// Builds a filter token if the word contains an unescaped colon.
    ///
    /// When nothing remains after the optional comparison operator, the value
    /// is read fresh from the input stream, which lets `tag:"some value"` and
    /// `tag: value` resolve to a single filter.
    fn filter_token(&mut self, word: &str) -> Option<Token> {
        let colon = find_unescaped_colon(word)?;
        let field = resolve_escapes(&word[..colon]);
        let (operator, remainder) = CompareOp::split_prefix(&word[colon + 1..]);

        let value = if remainder.is_empty() {
            self.read_value()
        } else {
            resolve_escapes(remainder)
        };

        Some(Token::Filter {
            field,
            operator,
            value,
        })
    }

    /// Reads a filter value directly from the stream (quoted or unquoted).
    fn read_value(&mut self) -> String {
        self.skip_whitespace();
        match self.chars.peek() {
            Some(&'"') => self.read_quoted(),
            Some(_) => {
                let word = self.read_word();
                resolve_escapes(&word)
            }
            None => String::new(),
        }
    }

    /// Reads a quoted string, resolving escapes.
    ///
    /// `\` escapes the next character unconditionally. If the closing quote
    /// is missing the partial content is kept and an issue is recorded.
    fn read_quoted(&mut self) -> String {
        self.chars.next(); // consume opening quote
        let mut content = String::new();

        loop {
            match self.chars.next() {
                Some('"') => return content,
                Some('\\') => match self.chars.next() {
                    Some(escaped) => content.push(escaped),
                    None => {
                        content.push('\\');
                        self.issues.push(Issue::new(IssueCode::UnclosedQuotedString));
                        return content;
                    }
                },
                Some(ch) => content.push(ch),
                None => {
                    self.issues.push(Issue::new(IssueCode::UnclosedQuotedString));
                    return content;
                }
            }
        }
    }

    /// Reads an unquoted word, preserving backslashes.
    ///
    /// Escapes stay unresolved so filter detection can still tell an escaped
    /// colon (`\:`) apart from a real field separator.
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            word.push(ch);
            self.chars.next();
        }
        word
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|ch| ch.is_whitespace()) {
            self.chars.next();
        }
    }
}

/// Returns the byte index of the first unescaped colon, if any.
fn find_unescaped_colon(word: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, ch) in word.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            ':' if !escaped => return Some(index),
            _ => escaped = false,
        }
    }
    None
}

/// Resolves backslash escapes: `\x` becomes `x`, a trailing `\` is kept.
fn resolve_escapes(raw: &str) -> String {
    let mut resolved = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            resolved.push(chars.next().unwrap_or('\\'));
        } else {
            resolved.push(ch);
        }
    }
    resolved
}

/// Tokenizes a query string under the given token budget.
///
/// Returns the tokens and any non-fatal issues, in discovery order.
pub fn tokenize(input: &str, max_tokens: usize) -> (Vec<Token>, Vec<Issue>) {
    Lexer::new(input, max_tokens).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokenizes with the default budget and asserts no issues were found.
    fn ok(input: &str) -> Vec<Token> {
        let (tokens, issues) = tokenize(input, crate::DEFAULT_MAX_TOKENS);
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        tokens
    }

    fn text(value: &str) -> Token {
        Token::Text(value.into())
    }

    fn filter(field: &str, operator: CompareOp, value: &str) -> Token {
        Token::Filter {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(ok(""), vec![Token::Eof]);
    }

    #[test]
    fn whitespace_only() {
        assert_eq!(ok("   "), vec![Token::Eof]);
    }

    #[test]
    fn single_term() {
        assert_eq!(ok("invoice"), vec![text("invoice"), Token::Eof]);
    }

    #[test]
    fn multiple_terms() {
        assert_eq!(
            ok("my  invoice "),
            vec![text("my"), text("invoice"), Token::Eof]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            ok("\"my special invoice\""),
            vec![text("my special invoice"), Token::Eof]
        );
    }

    #[test]
    fn quoted_escapes() {
        assert_eq!(
            ok(r#""say \"hi\" \\ there""#),
            vec![text(r#"say "hi" \ there"#), Token::Eof]
        );
    }

    #[test]
    fn unclosed_quote_keeps_partial_text() {
        let (tokens, issues) = tokenize("\"unclosed string", 200);
        assert_eq!(tokens, vec![text("unclosed string"), Token::Eof]);
        assert_eq!(issues, vec![Issue::new(IssueCode::UnclosedQuotedString)]);
    }

    #[test]
    fn keywords_case_insensitive() {
        assert_eq!(
            ok("a AND b or c Not d"),
            vec![
                text("a"),
                Token::And,
                text("b"),
                Token::Or,
                text("c"),
                Token::Not,
                text("d"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn quoted_keyword_is_text() {
        assert_eq!(ok("\"AND\""), vec![text("AND"), Token::Eof]);
    }

    #[test]
    fn parentheses() {
        assert_eq!(
            ok("(a)b"),
            vec![
                Token::LParen,
                text("a"),
                Token::RParen,
                text("b"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn simple_filter() {
        assert_eq!(
            ok("tag:invoice"),
            vec![filter("tag", CompareOp::Eq, "invoice"), Token::Eof]
        );
    }

    #[test]
    fn explicit_equals_filter() {
        assert_eq!(
            ok("tag:=invoice"),
            vec![filter("tag", CompareOp::Eq, "invoice"), Token::Eof]
        );
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            ok("createdAt:>2024-01-01 price:<=100"),
            vec![
                filter("createdAt", CompareOp::Gt, "2024-01-01"),
                filter("price", CompareOp::Lte, "100"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn quoted_filter_value() {
        assert_eq!(
            ok("tag:\"year end\""),
            vec![filter("tag", CompareOp::Eq, "year end"), Token::Eof]
        );
    }

    #[test]
    fn quoted_filter_value_after_operator() {
        assert_eq!(
            ok("createdAt:>\"2024-01-01\""),
            vec![filter("createdAt", CompareOp::Gt, "2024-01-01"), Token::Eof]
        );
    }

    #[test]
    fn filter_value_read_from_following_token() {
        assert_eq!(
            ok("tag: invoice"),
            vec![filter("tag", CompareOp::Eq, "invoice"), Token::Eof]
        );
    }

    #[test]
    fn filter_with_no_value_at_end_of_input() {
        assert_eq!(
            ok("tag:"),
            vec![filter("tag", CompareOp::Eq, ""), Token::Eof]
        );
    }

    #[test]
    fn escaped_colon_is_text() {
        assert_eq!(ok(r"tag\:invoice"), vec![text("tag:invoice"), Token::Eof]);
    }

    #[test]
    fn escaped_colon_inside_value() {
        assert_eq!(
            ok(r"time:10\:30"),
            vec![filter("time", CompareOp::Eq, "10:30"), Token::Eof]
        );
    }

    #[test]
    fn escaped_backslash_before_colon_still_splits() {
        // \\ is a literal backslash, so the colon is a real separator
        assert_eq!(
            ok(r"a\\:b"),
            vec![filter("a\\", CompareOp::Eq, "b"), Token::Eof]
        );
    }

    #[test]
    fn negated_text() {
        assert_eq!(
            ok("-archived"),
            vec![Token::Not, text("archived"), Token::Eof]
        );
    }

    #[test]
    fn negated_filter() {
        assert_eq!(
            ok("-tag:personal"),
            vec![
                Token::Not,
                filter("tag", CompareOp::Eq, "personal"),
                Token::Eof
            ]
        );
    }

    #[test]
    fn negated_quoted_text() {
        assert_eq!(
            ok("-\"year end\""),
            vec![Token::Not, text("year end"), Token::Eof]
        );
    }

    #[test]
    fn negated_keyword_is_text() {
        assert_eq!(ok("-AND"), vec![Token::Not, text("AND"), Token::Eof]);
    }

    #[test]
    fn negated_group() {
        assert_eq!(
            ok("-(a b)"),
            vec![
                Token::Not,
                Token::LParen,
                text("a"),
                text("b"),
                Token::RParen,
                Token::Eof
            ]
        );
    }

    #[test]
    fn bare_dash_is_text() {
        assert_eq!(ok("- a"), vec![text("-"), text("a"), Token::Eof]);
        assert_eq!(ok("-"), vec![text("-"), Token::Eof]);
    }

    #[test]
    fn interior_dash_is_part_of_word() {
        assert_eq!(ok("year-end"), vec![text("year-end"), Token::Eof]);
    }

    #[test]
    fn token_budget_truncates_without_eof() {
        let (tokens, issues) = tokenize("a b c d", 2);
        assert_eq!(tokens, vec![text("a"), text("b")]);
        assert_eq!(issues, vec![Issue::new(IssueCode::MaxTokensExceeded)]);
    }

    #[test]
    fn exact_budget_with_exhausted_input_is_clean() {
        let (tokens, issues) = tokenize("a b", 2);
        assert_eq!(tokens, vec![text("a"), text("b"), Token::Eof]);
        assert!(issues.is_empty());
    }

    #[test]
    fn trailing_whitespace_does_not_trip_the_budget() {
        let (tokens, issues) = tokenize("a b   ", 2);
        assert_eq!(tokens, vec![text("a"), text("b"), Token::Eof]);
        assert!(issues.is_empty());
    }

    #[test]
    fn budget_fires_when_input_remains() {
        let (tokens, issues) = tokenize("a b c", 2);
        assert_eq!(tokens, vec![text("a"), text("b")]);
        assert_eq!(issues, vec![Issue::new(IssueCode::MaxTokensExceeded)]);
    }

    #[test]
    fn under_budget_appends_eof() {
        let (tokens, issues) = tokenize("a b", 3);
        assert_eq!(tokens, vec![text("a"), text("b"), Token::Eof]);
        assert!(issues.is_empty());
    }
}

//! Search-query parsing, AST, and optimization for sift.
//!
//! This crate compiles a human-typed search-query string into a structured
//! expression tree that downstream code can translate into a concrete query
//! (full-text search, SQL, an in-memory filter, ...):
//!
//! - **Terms**: `invoice` - free-text words
//! - **Phrases**: `"year end"` - quoted text, kept verbatim
//! - **Filters**: `tag:invoice`, `createdAt:>2024-01-01`, `price:<=100`
//! - **Negation**: `-archived` or `NOT archived`
//! - **Boolean**: `a b` (implicit AND), explicit `AND` / `OR`
//! - **Grouping**: `(status:open OR status:pending)`
//! - **Escaping**: `\"` inside quotes, `\:` for a literal colon
//!
//! Malformed input never fails the parse: every problem is reported as a
//! soft [`Issue`] next to the best-effort [`Expr`] built from what could be
//! understood. The whole pipeline is pure and synchronous; concurrent
//! callers share no state.
//!
//! # Example
//!
//! ```
//! use sift_query::{Expr, parse};
//!
//! let parsed = parse("tag:invoice AND (status:open OR status:pending)");
//! assert!(parsed.issues.is_empty());
//! assert!(matches!(parsed.expression, Expr::And(_)));
//! ```

#![warn(missing_docs)]

mod ast;
mod issue;
mod lexer;
mod parser;
mod simplify;

use serde::{Deserialize, Serialize};

pub use ast::{CompareOp, Expr};
pub use issue::{Issue, IssueCode};
pub use lexer::{Token, tokenize};
pub use simplify::simplify;

/// Default token budget for a single query.
pub const DEFAULT_MAX_TOKENS: usize = 200;

/// Default nesting-depth budget for groups and NOT chains.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Tuning knobs for [`parse_with_options`].
///
/// The two limits bound worst-case work against adversarial input (a query
/// with thousands of terms, or `((((((...))))))`); both fail soft by
/// emitting an issue and returning a partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum number of tokens before tokenization stops.
    pub max_tokens: usize,
    /// Maximum nesting depth before subtrees are dropped.
    pub max_depth: usize,
    /// Whether to run the optimizer over the parsed expression.
    pub optimize: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_depth: DEFAULT_MAX_DEPTH,
            optimize: false,
        }
    }
}

/// The result of parsing a query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Best-effort expression built from the input.
    pub expression: Expr,
    /// Non-fatal problems found along the way, tokenizer first.
    pub issues: Vec<Issue>,
}

/// Parses a query string with default options.
pub fn parse(query: &str) -> ParsedQuery {
    parse_with_options(query, &ParseOptions::default())
}

/// Parses a query string with explicit options.
///
/// Data flows strictly forward: string → tokens → expression → (optionally)
/// canonical expression. Issues from the tokenizer and the parser are
/// concatenated in discovery order.
pub fn parse_with_options(query: &str, options: &ParseOptions) -> ParsedQuery {
    let (tokens, mut issues) = lexer::tokenize(query, options.max_tokens);
    let (expression, parse_issues) = parser::parse_tokens(&tokens, options.max_depth);
    issues.extend(parse_issues);

    let expression = if options.optimize {
        simplify::simplify(expression)
    } else {
        expression
    };

    ParsedQuery { expression, issues }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.max_tokens, 200);
        assert_eq!(options.max_depth, 10);
        assert!(!options.optimize);
    }

    #[test]
    fn empty_query_is_empty_expression() {
        assert_eq!(
            parse(""),
            ParsedQuery {
                expression: Expr::Empty,
                issues: vec![]
            }
        );
    }

    #[test]
    fn optimize_flag_dedupes() {
        let plain = parse("foo foo bar");
        assert_eq!(
            plain.expression,
            Expr::And(vec![Expr::text("foo"), Expr::text("foo"), Expr::text("bar")])
        );

        let optimized = parse_with_options(
            "foo foo bar",
            &ParseOptions {
                optimize: true,
                ..ParseOptions::default()
            },
        );
        assert_eq!(
            optimized.expression,
            Expr::And(vec![Expr::text("foo"), Expr::text("bar")])
        );
    }

    #[test]
    fn issues_concatenate_tokenizer_then_parser() {
        let parsed = parse("\"unclosed (group");
        assert_eq!(
            parsed
                .issues
                .iter()
                .map(|issue| issue.code)
                .collect::<Vec<_>>(),
            vec![IssueCode::UnclosedQuotedString]
        );

        // lexer issue first, then the parser's, regardless of text order
        let parsed = parse("tag:invoice) \"unclosed");
        assert_eq!(
            parsed
                .issues
                .iter()
                .map(|issue| issue.code)
                .collect::<Vec<_>>(),
            vec![
                IssueCode::UnclosedQuotedString,
                IssueCode::UnmatchedClosingParenthesis
            ]
        );
    }

    #[test]
    fn custom_limits_are_applied() {
        let parsed = parse_with_options(
            "((((((((((tag:invoice))))))))))",
            &ParseOptions {
                max_depth: 5,
                ..ParseOptions::default()
            },
        );
        assert!(
            parsed
                .issues
                .iter()
                .any(|issue| issue.code == IssueCode::MaxNestingDepthExceeded)
        );

        let parsed = parse_with_options(
            "a b c d e",
            &ParseOptions {
                max_tokens: 3,
                ..ParseOptions::default()
            },
        );
        assert!(
            parsed
                .issues
                .iter()
                .any(|issue| issue.code == IssueCode::MaxTokensExceeded)
        );
    }

    #[test]
    fn parsed_query_round_trips_through_json() {
        let parsed = parse("tag:invoice -archived \"year end");
        let json = serde_json::to_string(&parsed).unwrap();
        let back: ParsedQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(back, parsed);
    }

    #[test]
    fn query_string_output_reparses_equivalently() {
        let inputs = [
            "tag:invoice AND (status:open OR status:pending) -archived \"year end\"",
            "createdAt:>=2024-01-01 price:<100",
            "NOT (a OR b) c",
        ];
        for input in inputs {
            let first = parse(input);
            assert!(first.issues.is_empty(), "issues for {input}");
            let rendered = first.expression.to_query_string();
            let second = parse(&rendered);
            assert!(second.issues.is_empty(), "issues for rendered {rendered}");
            assert_eq!(second.expression, first.expression, "via {rendered}");
        }
    }
}

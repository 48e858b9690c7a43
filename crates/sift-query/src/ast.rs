//! Query abstract syntax tree.
//!
//! Represents parsed query expressions before translation into a concrete
//! backend query (full-text search, SQL, in-memory filter, ...).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operator of a [`Expr::Filter`] condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equality (the implicit operator of `field:value`).
    #[serde(rename = "=")]
    Eq,

    /// Greater than (`field:>value`).
    #[serde(rename = ">")]
    Gt,

    /// Less than (`field:<value`).
    #[serde(rename = "<")]
    Lt,

    /// Greater than or equal (`field:>=value`).
    #[serde(rename = ">=")]
    Gte,

    /// Less than or equal (`field:<=value`).
    #[serde(rename = "<=")]
    Lte,
}

impl CompareOp {
    /// Returns the source form of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }

    /// Splits an optional operator prefix off a filter value.
    ///
    /// Two-character operators are matched before their one-character
    /// prefixes; a value with no operator prefix gets the implicit `=`.
    pub(crate) fn split_prefix(value: &str) -> (Self, &str) {
        for (symbol, op) in [
            (">=", Self::Gte),
            ("<=", Self::Lte),
            (">", Self::Gt),
            ("<", Self::Lt),
            ("=", Self::Eq),
        ] {
            if let Some(rest) = value.strip_prefix(symbol) {
                return (op, rest);
            }
        }
        (Self::Eq, value)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed query expression.
///
/// The tree is immutable once built: the parser and optimizer replace nodes,
/// they never mutate them. The derived `PartialEq` is the structural,
/// order-sensitive equality the optimizer deduplicates with — `And([a, b])`
/// and `And([b, a])` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// No condition at all ("nothing specified").
    Empty,

    /// A free-text search term.
    Text(String),

    /// A structured `field:value` condition.
    Filter {
        /// Field name, escapes resolved.
        field: String,
        /// Comparison operator.
        operator: CompareOp,
        /// Comparison value, escapes resolved.
        value: String,
    },

    /// Negation: results must NOT match the operand.
    Not(Box<Self>),

    /// Conjunction: all operands must match.
    And(Vec<Self>),

    /// Disjunction: at least one operand must match.
    Or(Vec<Self>),
}

impl Expr {
    /// Creates a text term.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a filter condition.
    pub fn filter(field: impl Into<String>, operator: CompareOp, value: impl Into<String>) -> Self {
        Self::Filter {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Creates a negation.
    pub fn not(operand: Self) -> Self {
        Self::Not(Box::new(operand))
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Empty => writeln!(f, "{prefix}Empty"),
            Self::Text(value) => writeln!(f, "{prefix}Text({value:?})"),
            Self::Filter {
                field,
                operator,
                value,
            } => writeln!(f, "{prefix}Filter({field} {operator} {value:?})"),
            Self::Not(operand) => {
                writeln!(f, "{prefix}Not")?;
                operand.fmt_tree(f, indent + 1)
            }
            Self::And(operands) => {
                writeln!(f, "{prefix}And")?;
                for operand in operands {
                    operand.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(operands) => {
                writeln!(f, "{prefix}Or")?;
                for operand in operands {
                    operand.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
        }
    }

    /// Formats the expression back in query syntax.
    ///
    /// The output re-parses to an equivalent expression: terms and values are
    /// quoted or escaped as needed, and operands are parenthesized where
    /// precedence demands it. `Empty` renders as the empty string.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => quote_term(value),
            Self::Filter {
                field,
                operator,
                value,
            } => {
                let op = match operator {
                    CompareOp::Eq => "",
                    other => other.as_str(),
                };
                format!("{}:{}{}", escape_word(field), op, quote_term(value))
            }
            Self::Not(operand) => match operand.as_ref() {
                Self::Text(_) | Self::Filter { .. } => format!("-{}", operand.to_query_string()),
                other => format!("NOT ({})", other.to_query_string()),
            },
            Self::And(operands) => {
                let parts: Vec<String> = operands
                    .iter()
                    .map(|operand| match operand {
                        // OR binds looser than the surrounding AND
                        Self::Or(_) => format!("({})", operand.to_query_string()),
                        other => other.to_query_string(),
                    })
                    .collect();
                parts.join(" ")
            }
            Self::Or(operands) => {
                let parts: Vec<String> = operands
                    .iter()
                    .map(Self::to_query_string)
                    .collect();
                parts.join(" OR ")
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Renders a term or filter value, quoting when it cannot stand bare.
fn quote_term(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|ch| ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"');
    if needs_quotes {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('"');
        for ch in value.chars() {
            if ch == '"' || ch == '\\' {
                quoted.push('\\');
            }
            quoted.push(ch);
        }
        quoted.push('"');
        quoted
    } else {
        escape_word(value)
    }
}

/// Escapes colons and backslashes so a bare word survives filter detection.
fn escape_word(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for ch in word.chars() {
        if ch == ':' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_prefix_longest_match_wins() {
        assert_eq!(CompareOp::split_prefix(">=10"), (CompareOp::Gte, "10"));
        assert_eq!(CompareOp::split_prefix("<=10"), (CompareOp::Lte, "10"));
        assert_eq!(CompareOp::split_prefix(">10"), (CompareOp::Gt, "10"));
        assert_eq!(CompareOp::split_prefix("=10"), (CompareOp::Eq, "10"));
        assert_eq!(CompareOp::split_prefix("10"), (CompareOp::Eq, "10"));
    }

    #[test]
    fn equality_is_order_sensitive() {
        let ab = Expr::And(vec![Expr::text("a"), Expr::text("b")]);
        let ba = Expr::And(vec![Expr::text("b"), Expr::text("a")]);
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());
    }

    #[test]
    fn display_renders_tree() {
        let expr = Expr::And(vec![
            Expr::filter("tag", CompareOp::Eq, "invoice"),
            Expr::not(Expr::text("archived")),
        ]);
        let rendered = expr.to_string();
        assert!(rendered.contains("And"));
        assert!(rendered.contains("Filter(tag = \"invoice\")"));
        assert!(rendered.contains("Not"));
        assert!(rendered.contains("Text(\"archived\")"));
    }

    #[test]
    fn query_string_plain() {
        let expr = Expr::And(vec![
            Expr::filter("tag", CompareOp::Eq, "invoice"),
            Expr::filter("createdAt", CompareOp::Gt, "2024-01-01"),
            Expr::not(Expr::text("archived")),
        ]);
        assert_eq!(
            expr.to_query_string(),
            "tag:invoice createdAt:>2024-01-01 -archived"
        );
    }

    #[test]
    fn query_string_quotes_and_groups() {
        let expr = Expr::And(vec![
            Expr::text("year end"),
            Expr::Or(vec![
                Expr::filter("status", CompareOp::Eq, "open"),
                Expr::filter("status", CompareOp::Eq, "pending"),
            ]),
        ]);
        assert_eq!(
            expr.to_query_string(),
            "\"year end\" (status:open OR status:pending)"
        );
    }

    #[test]
    fn query_string_escapes_colons() {
        let expr = Expr::text("a:b");
        assert_eq!(expr.to_query_string(), "a\\:b");
    }

    #[test]
    fn serde_representation() {
        let expr = Expr::filter("price", CompareOp::Gte, "100");
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["Filter"]["operator"], ">=");
        let back: Expr = serde_json::from_value(json).unwrap();
        assert_eq!(back, expr);
    }
}

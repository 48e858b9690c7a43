//! Query parser.
//!
//! Parses a token stream into an expression tree using recursive descent
//! with one token of lookahead.
//!
//! # Grammar
//!
//! ```text
//! query    → or_expr ( ")"* or_expr )*     stray ) reported and skipped
//! or_expr  → and_expr ("OR" and_expr)*
//! and_expr → ("AND"? unary)+               AND between operands is optional
//! unary    → "NOT" unary | primary
//! primary  → "(" or_expr ")" | FILTER | TEXT
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Negation: `NOT` / `-`
//! 3. AND (explicit keyword or implicit between adjacent operands)
//! 4. OR (explicit keyword)
//!
//! Malformed input never aborts the parse: problems are recorded as
//! [`Issue`]s and the best-effort partial expression is returned.

use crate::{
    ast::Expr,
    issue::{Issue, IssueCode},
    lexer::Token,
};

/// Recursive descent parser for query expressions.
struct Parser<'a> {
    /// Token stream to parse.
    tokens: &'a [Token],
    /// Current position in the token stream.
    position: usize,
    /// Current nesting depth (groups and NOT operands).
    depth: usize,
    /// Depth limit guarding against adversarial nesting.
    max_depth: usize,
    /// Issues discovered so far.
    issues: Vec<Issue>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser over a token stream.
    fn new(tokens: &'a [Token], max_depth: usize) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            max_depth,
            issues: Vec::new(),
        }
    }

    /// Parses the whole stream into one expression.
    ///
    /// Stray closing parentheses left over after an or-expression are each
    /// reported and skipped; any fragments parsed after them are joined with
    /// implicit AND. An empty stream yields [`Expr::Empty`] with no issues.
    fn parse(mut self) -> (Expr, Vec<Issue>) {
        let mut operands = Vec::new();

        loop {
            if let Some(expr) = self.parse_or_expr() {
                operands.push(expr);
            }
            if self.check(&Token::RParen) {
                self.issues
                    .push(Issue::new(IssueCode::UnmatchedClosingParenthesis));
                self.advance();
            } else {
                // nothing but Eof can remain here
                break;
            }
        }

        let expression = collapse(operands, Expr::And).unwrap_or(Expr::Empty);
        (expression, self.issues)
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    ///
    /// A dangling OR contributes nothing; single operands collapse.
    fn parse_or_expr(&mut self) -> Option<Expr> {
        let mut operands = Vec::new();

        if let Some(expr) = self.parse_and_expr() {
            operands.push(expr);
        }
        while self.check(&Token::Or) {
            self.advance(); // consume OR
            if let Some(expr) = self.parse_and_expr() {
                operands.push(expr);
            }
        }

        collapse(operands, Expr::Or)
    }

    /// Parses: and_expr → ("AND"? unary)+
    ///
    /// Explicit AND keywords are consumed wherever they appear but carry no
    /// information beyond the implicit adjacency conjunction.
    fn parse_and_expr(&mut self) -> Option<Expr> {
        let mut operands = Vec::new();

        loop {
            if self.check(&Token::And) {
                self.advance();
                continue;
            }
            if !self.can_start_unary() {
                break;
            }
            if let Some(expr) = self.parse_unary() {
                operands.push(expr);
            }
        }

        collapse(operands, Expr::And)
    }

    /// Checks if the current token can start a unary expression.
    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Text(_)) | Some(Token::Filter { .. }) | Some(Token::Not) | Some(Token::LParen)
        )
    }

    /// Parses: unary → "NOT" unary | primary
    ///
    /// The depth guard runs before descending into the operand; when it
    /// rejects, the NOT is dropped with only the depth issue. A NOT whose
    /// operand parse legitimately produced nothing reports the missing
    /// operand and contributes nothing to its parent.
    fn parse_unary(&mut self) -> Option<Expr> {
        if !self.check(&Token::Not) {
            return self.parse_primary();
        }
        self.advance(); // consume NOT

        if !self.try_descend() {
            return None;
        }
        let operand = self.parse_unary();
        self.ascend();

        match operand {
            Some(expr) => Some(Expr::not(expr)),
            None => {
                self.issues.push(Issue::new(IssueCode::MissingOperandForNot));
                None
            }
        }
    }

    /// Parses: primary → "(" or_expr ")" | FILTER | TEXT
    fn parse_primary(&mut self) -> Option<Expr> {
        match self.peek().cloned() {
            Some(Token::LParen) => {
                self.advance(); // consume (
                self.parse_group()
            }
            Some(Token::Filter {
                field,
                operator,
                value,
            }) => {
                self.advance();
                Some(Expr::Filter {
                    field,
                    operator,
                    value,
                })
            }
            Some(Token::Text(value)) => {
                self.advance();
                Some(Expr::Text(value))
            }
            _ => None,
        }
    }

    /// Parses the inside of a group whose `(` was already consumed.
    ///
    /// A missing `)` keeps the inner expression and records the unmatched
    /// opening parenthesis. When the depth guard rejects the group, its
    /// content is abandoned where it stands; the unconsumed remainder
    /// surfaces through the regular recovery paths.
    fn parse_group(&mut self) -> Option<Expr> {
        if !self.try_descend() {
            return None;
        }
        let inner = self.parse_or_expr();
        self.ascend();

        if self.check(&Token::RParen) {
            self.advance(); // consume )
        } else {
            self.issues
                .push(Issue::new(IssueCode::UnmatchedOpeningParenthesis));
        }

        inner
    }

    /// Increments the depth counter, or reports exhaustion and refuses.
    fn try_descend(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.issues
                .push(Issue::new(IssueCode::MaxNestingDepthExceeded));
            return false;
        }
        self.depth += 1;
        true
    }

    /// Decrements the depth counter after a successful descent.
    fn ascend(&mut self) {
        self.depth -= 1;
    }

    /// Returns the current token without consuming it.
    ///
    /// Running off the end of a budget-truncated stream behaves like Eof.
    fn peek(&self) -> Option<&Token> {
        match self.tokens.get(self.position) {
            Some(Token::Eof) | None => None,
            token => token,
        }
    }

    /// Checks if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Collapses an operand list: none → nothing, one → the operand itself,
/// more → the n-ary node. No singleton And/Or is ever constructed.
fn collapse(mut operands: Vec<Expr>, variant: fn(Vec<Expr>) -> Expr) -> Option<Expr> {
    match operands.len() {
        0 => None,
        1 => operands.pop(),
        _ => Some(variant(operands)),
    }
}

/// Parses a token stream into an expression plus any issues found.
pub(crate) fn parse_tokens(tokens: &[Token], max_depth: usize) -> (Expr, Vec<Issue>) {
    Parser::new(tokens, max_depth).parse()
}

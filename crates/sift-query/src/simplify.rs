//! Expression optimizer.
//!
//! Rewrites an expression into a canonical, reduced form without changing
//! its matching semantics. The rewrite is a pure post-order pass: children
//! are simplified before their parents, and a fixed rule set is applied at
//! each node, which makes the whole pass idempotent.
//!
//! Rules:
//!
//! - leaves (`Empty`, `Text`, `Filter`) are returned unchanged
//! - `Not(Not(x))` → `x`, `Not(Empty)` → `Empty`
//! - `And`/`Or`: same-type children are flattened into the parent (an `And`
//!   inside an `Or` is never flattened), `Empty` children are dropped,
//!   structural duplicates are removed keeping the first occurrence, and the
//!   survivors collapse to `Empty` (none) or the lone child (one)

use crate::ast::Expr;

/// Simplifies an expression into its canonical reduced form.
pub fn simplify(expr: Expr) -> Expr {
    match expr {
        Expr::Empty | Expr::Text(_) | Expr::Filter { .. } => expr,
        Expr::Not(operand) => match simplify(*operand) {
            Expr::Not(inner) => *inner,
            Expr::Empty => Expr::Empty,
            other => Expr::not(other),
        },
        Expr::And(operands) => simplify_nary(operands, true),
        Expr::Or(operands) => simplify_nary(operands, false),
    }
}

/// Simplifies the operand list of an `And` (`conjunctive`) or `Or` node.
fn simplify_nary(operands: Vec<Expr>, conjunctive: bool) -> Expr {
    let mut survivors: Vec<Expr> = Vec::with_capacity(operands.len());

    for operand in operands.into_iter().map(simplify) {
        // same-type children flatten; anything else passes through whole
        let children = match operand {
            Expr::And(inner) if conjunctive => inner,
            Expr::Or(inner) if !conjunctive => inner,
            other => vec![other],
        };
        for child in children {
            if child == Expr::Empty || survivors.contains(&child) {
                continue;
            }
            survivors.push(child);
        }
    }

    match survivors.len() {
        0 => Expr::Empty,
        1 => survivors
            .pop()
            .unwrap_or(Expr::Empty),
        _ if conjunctive => Expr::And(survivors),
        _ => Expr::Or(survivors),
    }
}

// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

//! Evaluation of schema must-expressions against the tree.
//!
//! The supported expression subset covers what device schemas use in
//! practice: location paths (relative and absolute, `.` and `..`),
//! string and number literals, the six comparisons, `and`, `or`, `not()`,
//! `true()` / `false()` and parentheses.
//!
//! Tree entries are exposed to the evaluator through a four-operation
//! adapter: value coercion, path, relative navigation and leafref
//! following. Key value levels are transparent; ascending from an entry
//! without a schema first rises to the nearest ancestor that has one.

use intentd_schema::{LeafKind, SchemaElem, TypedValue};

use crate::entry::{EntryId, Tree, TreeError};

/// A parsed must-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Literal(String),
    Boolean(bool),
    Location { absolute: bool, steps: Vec<String> },
    Not(Box<Expr>),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

/// The value domain of the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Bool(bool),
    Num(f64),
    Str(String),
    /// An empty node-set: the referenced entry does not exist. Compares
    /// false against everything and is falsy.
    Empty,
}

impl Datum {
    pub fn truthy(&self) -> bool {
        match self {
            Datum::Bool(value) => *value,
            Datum::Num(value) => *value != 0.0,
            Datum::Str(value) => !value.is_empty(),
            Datum::Empty => false,
        }
    }

    fn as_num(&self) -> Option<f64> {
        match self {
            Datum::Num(value) => Some(*value),
            Datum::Str(value) => value.parse().ok(),
            Datum::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Datum::Empty => None,
        }
    }

    fn as_str(&self) -> String {
        match self {
            Datum::Bool(value) => value.to_string(),
            Datum::Num(value) => {
                if value.fract() == 0.0 {
                    format!("{}", *value as i64)
                } else {
                    value.to_string()
                }
            }
            Datum::Str(value) => value.clone(),
            Datum::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum XpathError {
    #[display("unexpected character '{found}' in expression")]
    UnexpectedChar { found: char },
    #[display("unexpected token '{found}' in expression")]
    UnexpectedToken { found: String },
    #[display("unterminated string literal")]
    UnterminatedLiteral,
    #[display("expression ended unexpectedly")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Number(f64),
    Literal(String),
    Slash,
    Dot,
    DotDot,
    LParen,
    RParen,
    Op(BinOp),
}

fn tokenize(input: &str) -> Result<Vec<Token>, XpathError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Eq));
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some('=') => tokens.push(Token::Op(BinOp::Ne)),
                    _ => return Err(XpathError::UnexpectedChar { found: '!' }),
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Le));
                } else {
                    tokens.push(Token::Op(BinOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Ge));
                } else {
                    tokens.push(Token::Op(BinOp::Gt));
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => literal.push(ch),
                        None => return Err(XpathError::UnterminatedLiteral),
                    }
                }
                tokens.push(Token::Literal(literal));
            }
            '.' => {
                chars.next();
                if chars.peek() == Some(&'.') {
                    chars.next();
                    tokens.push(Token::DotDot);
                } else {
                    tokens.push(Token::Dot);
                }
            }
            c if c.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        number.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let parsed = number
                    .parse()
                    .map_err(|_| XpathError::UnexpectedToken { found: number })?;
                tokens.push(Token::Number(parsed));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || matches!(d, '_' | '-' | ':' | '.') {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(XpathError::UnexpectedChar { found: other }),
        }
    }
    Ok(tokens)
}

/// Parse a must-expression into its AST.
pub fn parse(input: &str) -> Result<Expr, XpathError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(XpathError::UnexpectedToken {
            found: format!("{token:?}"),
        }),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), XpathError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(XpathError::UnexpectedToken {
                found: format!("{token:?}"),
            }),
            None => Err(XpathError::UnexpectedEnd),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, XpathError> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek(), Some(Token::Name(name)) if name == "or") {
            self.next();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, XpathError> {
        let mut lhs = self.cmp_expr()?;
        while matches!(self.peek(), Some(Token::Name(name)) if name == "and") {
            self.next();
            let rhs = self.cmp_expr()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, XpathError> {
        let lhs = self.primary()?;
        if let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            self.next();
            let rhs = self.primary()?;
            return Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, XpathError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if name == "not" && self.peek() == Some(&Token::LParen) => {
                self.next();
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some(Token::Name(name))
                if (name == "true" || name == "false") && self.peek() == Some(&Token::LParen) =>
            {
                self.next();
                self.expect(&Token::RParen)?;
                Ok(Expr::Boolean(name == "true"))
            }
            Some(Token::Name(name)) => self.location_path(Some(name), false),
            Some(Token::Dot) => self.location_path(Some(".".to_string()), false),
            Some(Token::DotDot) => self.location_path(Some("..".to_string()), false),
            Some(Token::Slash) => self.location_path(None, true),
            Some(token) => Err(XpathError::UnexpectedToken {
                found: format!("{token:?}"),
            }),
            None => Err(XpathError::UnexpectedEnd),
        }
    }

    fn location_path(&mut self, first: Option<String>, absolute: bool) -> Result<Expr, XpathError> {
        let mut steps = Vec::new();
        if let Some(first) = first {
            steps.push(first);
        }
        loop {
            if absolute && steps.is_empty() {
                // the step after the leading slash
            } else if self.peek() == Some(&Token::Slash) {
                self.next();
            } else {
                break;
            }
            match self.next() {
                Some(Token::Name(name)) => steps.push(name),
                Some(Token::Dot) => steps.push(".".to_string()),
                Some(Token::DotDot) => steps.push("..".to_string()),
                Some(token) => {
                    return Err(XpathError::UnexpectedToken {
                        found: format!("{token:?}"),
                    })
                }
                None => return Err(XpathError::UnexpectedEnd),
            }
        }
        Ok(Expr::Location { absolute, steps })
    }
}

/// The XPath view of one tree entry.
#[derive(Debug, Clone, Copy)]
pub struct EntryAdapter {
    id: EntryId,
}

impl EntryAdapter {
    pub fn new(id: EntryId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The entry's path in the data tree.
    pub fn path(&self, tree: &Tree) -> intentd_schema::Path {
        tree.path(self.id)
    }

    /// Coerce the entry into a datum: containers are truthy by existence,
    /// leaves yield their effective value, identityrefs render with their
    /// schema prefix.
    pub fn value(&self, tree: &Tree) -> Result<Datum, TreeError> {
        if let Some(SchemaElem::Container(_)) = tree.schema(self.id) {
            return Ok(Datum::Bool(true));
        }
        let Some(variant) = tree.node(self.id).leaf_variants.get_highest_precedence(false) else {
            return Ok(Datum::Empty);
        };
        let value = variant.update.value()?;
        let datum = match value {
            TypedValue::Bool(value) => Datum::Bool(value),
            TypedValue::Int(value) => Datum::Num(value as f64),
            TypedValue::Uint(value) => Datum::Num(value as f64),
            TypedValue::Identity { prefix, value } => Datum::Str(format!("{prefix}:{value}")),
            TypedValue::String(value) => {
                // Plain strings on identityref leaves still render prefixed.
                let prefix = tree
                    .schema(self.id)
                    .and_then(SchemaElem::as_field)
                    .filter(|field| field.typ.kind == LeafKind::Identityref)
                    .and_then(|field| field.typ.identity_prefix.clone());
                match prefix {
                    Some(prefix) => Datum::Str(format!("{prefix}:{value}")),
                    None => Datum::Str(value),
                }
            }
            other => Datum::Str(other.render()),
        };
        Ok(datum)
    }

    /// Navigate relative to this entry. Ascending from a key value level
    /// first rises to the nearest ancestor with a schema. Errors resolve to
    /// `None` (an empty node-set), mirroring how must-expressions treat
    /// missing branches.
    pub fn navigate(&self, tree: &mut Tree, steps: &[String], absolute: bool) -> Option<EntryAdapter> {
        let mut current = if absolute { tree.root() } else { self.id };
        for step in steps {
            if step == ".." && tree.schema(current).is_none() {
                current = tree.first_with_schema(current);
            }
            current = tree
                .navigate(current, std::slice::from_ref(step))
                .ok()?;
        }
        Some(EntryAdapter::new(current))
    }

    /// Follow the leafref of this entry to the entries its value points at.
    pub fn follow_leaf_ref(&self, tree: &mut Tree) -> Result<Vec<EntryAdapter>, TreeError> {
        Ok(navigate_leafref(tree, self.id)?
            .into_iter()
            .map(EntryAdapter::new)
            .collect())
    }
}

/// Evaluate a parsed must-expression with the given entry as context node.
pub fn eval(tree: &mut Tree, node: EntryId, expr: &Expr) -> Result<Datum, TreeError> {
    match expr {
        Expr::Number(value) => Ok(Datum::Num(*value)),
        Expr::Literal(value) => Ok(Datum::Str(value.clone())),
        Expr::Boolean(value) => Ok(Datum::Bool(*value)),
        Expr::Location { absolute, steps } => {
            let adapter = EntryAdapter::new(node);
            match adapter.navigate(tree, steps, *absolute) {
                Some(target) => target.value(tree),
                None => Ok(Datum::Empty),
            }
        }
        Expr::Not(inner) => {
            let value = eval(tree, node, inner)?;
            Ok(Datum::Bool(!value.truthy()))
        }
        Expr::Binary { op, lhs, rhs } => {
            match op {
                BinOp::And => {
                    let lhs = eval(tree, node, lhs)?;
                    if !lhs.truthy() {
                        return Ok(Datum::Bool(false));
                    }
                    let rhs = eval(tree, node, rhs)?;
                    Ok(Datum::Bool(rhs.truthy()))
                }
                BinOp::Or => {
                    let lhs = eval(tree, node, lhs)?;
                    if lhs.truthy() {
                        return Ok(Datum::Bool(true));
                    }
                    let rhs = eval(tree, node, rhs)?;
                    Ok(Datum::Bool(rhs.truthy()))
                }
                _ => {
                    let lhs = eval(tree, node, lhs)?;
                    let rhs = eval(tree, node, rhs)?;
                    Ok(Datum::Bool(compare(&lhs, &rhs, *op)))
                }
            }
        }
    }
}

/// Compare two datums. Comparisons against an empty node-set are false.
/// If both sides coerce to numbers the comparison is numeric, otherwise the
/// string renderings are compared.
fn compare(lhs: &Datum, rhs: &Datum, op: BinOp) -> bool {
    if matches!(lhs, Datum::Empty) || matches!(rhs, Datum::Empty) {
        return false;
    }
    if let (Some(l), Some(r)) = (lhs.as_num(), rhs.as_num()) {
        return match op {
            BinOp::Eq => l == r,
            BinOp::Ne => l != r,
            BinOp::Lt => l < r,
            BinOp::Gt => l > r,
            BinOp::Le => l <= r,
            BinOp::Ge => l >= r,
            BinOp::And | BinOp::Or => unreachable!(),
        };
    }
    let (l, r) = (lhs.as_str(), rhs.as_str());
    match op {
        BinOp::Eq => l == r,
        BinOp::Ne => l != r,
        BinOp::Lt => l < r,
        BinOp::Gt => l > r,
        BinOp::Le => l <= r,
        BinOp::Ge => l >= r,
        BinOp::And | BinOp::Or => unreachable!(),
    }
}

/// Resolve the leafref target of the given leaf entry.
///
/// The target expression is split into steps; bracket predicates are
/// stripped. Stepping into a keyed container without naming an instance
/// fans out over every instance, so a target like `/interface/name` yields
/// one candidate entry per interface.
pub fn navigate_leafref(tree: &mut Tree, id: EntryId) -> Result<Vec<EntryId>, TreeError> {
    let Some(target) = tree
        .schema(id)
        .and_then(SchemaElem::as_field)
        .and_then(|field| field.typ.leafref.clone())
    else {
        return Ok(Vec::new());
    };
    let (absolute, steps) = parse_leafref(&target);

    let mut frontier = vec![if absolute { tree.root() } else { id }];
    for step in &steps {
        let mut next = Vec::new();
        for &node in &frontier {
            match step.as_str() {
                "." => next.push(node),
                ".." => {
                    let risen = if tree.schema(node).is_none() {
                        tree.first_with_schema(node)
                    } else {
                        node
                    };
                    if let Some(parent) = tree.parent(risen) {
                        next.push(parent);
                    }
                }
                name => {
                    if let Ok(child) = tree.navigate(node, &[name.to_string()]) {
                        next.push(child);
                        continue;
                    }
                    // Fan out across the instances of a keyed container.
                    let keys = match tree.schema(node) {
                        Some(SchemaElem::Container(container)) => container.keys.len(),
                        _ => 0,
                    };
                    if keys > 0 {
                        for instance in instances_below(tree, node, keys) {
                            if let Some(child) = tree.active_child(instance, name) {
                                next.push(child);
                            }
                        }
                    }
                }
            }
        }
        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }
    Ok(frontier)
}

/// All entries exactly `levels` below the given entry: the value level of
/// every instance of a keyed container.
fn instances_below(tree: &Tree, id: EntryId, levels: usize) -> Vec<EntryId> {
    let mut current = vec![id];
    for _ in 0..levels {
        let mut next = Vec::new();
        for &node in &current {
            next.extend(tree.children(node).into_iter().map(|(_, child)| child));
        }
        current = next;
    }
    current
}

/// Split a leafref target expression into navigation steps, dropping
/// bracket predicates.
pub(crate) fn parse_leafref(target: &str) -> (bool, Vec<String>) {
    let absolute = target.starts_with('/');
    let steps = target
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('[') {
            Some((name, _)) => name.to_string(),
            None => segment.to_string(),
        })
        .collect();
    (absolute, steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_comparison() {
        let expr = parse("../mtu >= 1280").unwrap();
        match expr {
            Expr::Binary { op, lhs, .. } => {
                assert_eq!(op, BinOp::Ge);
                assert_eq!(
                    *lhs,
                    Expr::Location {
                        absolute: false,
                        steps: vec!["..".to_string(), "mtu".to_string()],
                    }
                );
            }
            other => panic!("unexpected expr {other:?}"),
        }
    }

    #[test]
    fn parse_boolean_combinators() {
        let expr = parse("not(enabled = 'false') or /sys/hostname != ''").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinOp::Or, .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("mtu >").is_err());
        assert!(parse("mtu # 3").is_err());
        assert!(parse("'unterminated").is_err());
    }

    #[test]
    fn compare_numeric_over_string() {
        assert!(compare(&Datum::Str("9".to_string()), &Datum::Num(10.0), BinOp::Lt));
        assert!(compare(
            &Datum::Str("b".to_string()),
            &Datum::Str("a".to_string()),
            BinOp::Gt
        ));
    }

    #[test]
    fn compare_empty_is_false() {
        assert!(!compare(&Datum::Empty, &Datum::Num(1.0), BinOp::Eq));
        assert!(!compare(&Datum::Empty, &Datum::Empty, BinOp::Eq));
        assert!(!compare(&Datum::Str(String::new()), &Datum::Empty, BinOp::Ne));
    }

    #[test]
    fn leafref_steps_strip_predicates() {
        let (absolute, steps) = parse_leafref("/interface[name=current()]/name");
        assert!(absolute);
        assert_eq!(steps, ["interface", "name"]);

        let (absolute, steps) = parse_leafref("../../interface/name");
        assert!(!absolute);
        assert_eq!(steps, ["..", "..", "interface", "name"]);
    }
}

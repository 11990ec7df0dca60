//! # Path Expressions
//!
//! A small XPath 1.0 subset, enough to address elements of an input file:
//!
//! ```text
//! /fleurInput/atomSpecies/species[@name="Fe-1"]/mtSphere
//! //atomGroup[relPos/@label="  222"]
//! /fleurInput/output/checks | /fleurInput/output/plotting
//! ```
//!
//! Supported: absolute and relative paths, `//`, `*`, `.`, `..`, unions,
//! positional predicates (`[2]`, `[last()]`) and filter predicates built
//! from `@attr`, child paths, `text()`, string and number literals, `=`,
//! `!=`, `and`, `or` and parentheses.
//!
//! Paths select elements only. Selections are always returned without
//! duplicates, in document order.

use crate::error::{XmlError, XmlResult};
use crate::lexer::{lex, PathToken, SpannedToken};
use crate::tree::{Attribute, Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A parsed path expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    paths: Vec<LocationPath>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    Parent,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    Any,
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Position(f64),
    Last,
    Filter(BoolExpr),
}

#[derive(Debug, Clone, PartialEq)]
enum BoolExpr {
    Or(Box<BoolExpr>, Box<BoolExpr>),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Group(Box<BoolExpr>),
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    Exists(Operand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    NotEq,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Literal(String),
    Number(String),
    Value {
        path: Option<LocationPath>,
        target: Target,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Attribute(String),
    Text,
    Element,
}

/// How to create the last step of a path that matched nothing
///
/// Produced by [`XPath::creation_plan`]: select (or recursively create)
/// `parent`, then append an element `name` carrying `attributes` taken
/// from `[@attr="value"]` predicates of the last step.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationPlan {
    pub parent: XPath,
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl XPath {
    pub fn parse(source: &str) -> XmlResult<Self> {
        let tokens = lex(source).map_err(|pos| {
            XmlError::path_syntax(source, pos, "unexpected character")
        })?;
        if tokens.is_empty() {
            return Err(XmlError::path_syntax(source, 0, "empty path"));
        }

        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let paths = parser.parse_union()?;

        Ok(Self {
            source: source.to_string(),
            paths,
        })
    }

    fn from_paths(paths: Vec<LocationPath>) -> Self {
        let source = paths
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        Self { source, paths }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against the document node
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        self.select_from(doc, doc.document_node())
    }

    /// Evaluate with `context` as the starting node of relative paths
    pub fn select_from(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let evaluator = Evaluator::new(doc);
        let mut out = Vec::new();
        for path in &self.paths {
            out.extend(evaluator.eval_path(path, context));
        }
        evaluator.sort_unique(&mut out);
        out
    }

    /// Describe how to create the node this path addresses
    ///
    /// Only single paths whose last step is a named child step qualify,
    /// and that step may only carry `[@attr="value"]` predicates.
    pub fn creation_plan(&self) -> Option<CreationPlan> {
        let [path] = self.paths.as_slice() else {
            return None;
        };
        let (last, parent_steps) = path.steps.split_last()?;
        if last.axis != Axis::Child {
            return None;
        }
        let NodeTest::Name(name) = &last.test else {
            return None;
        };

        let mut attributes = Vec::new();
        for predicate in &last.predicates {
            attributes.push(predicate_attribute(predicate)?);
        }

        let parent = if parent_steps.is_empty() {
            if path.absolute {
                // Would create a second root element
                return None;
            }
            LocationPath {
                absolute: false,
                steps: vec![Step::abbreviated(Axis::SelfNode)],
            }
        } else {
            LocationPath {
                absolute: path.absolute,
                steps: parent_steps.to_vec(),
            }
        };

        Some(CreationPlan {
            parent: XPath::from_paths(vec![parent]),
            name: name.clone(),
            attributes,
        })
    }
}

fn predicate_attribute(predicate: &Predicate) -> Option<Attribute> {
    let Predicate::Filter(BoolExpr::Compare {
        lhs,
        op: CompareOp::Eq,
        rhs,
    }) = predicate
    else {
        return None;
    };

    match (lhs, rhs) {
        (
            Operand::Value {
                path: None,
                target: Target::Attribute(name),
            },
            Operand::Literal(value) | Operand::Number(value),
        ) => Some(Attribute::new(name.clone(), value.clone())),
        _ => None,
    }
}

/// Quote `value` for use as a string literal inside a path expression
pub fn quote_literal(value: &str) -> String {
    if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for XPath {
    type Err = XmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XPath::parse(s)
    }
}

impl Serialize for XPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for XPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        XPath::parse(&source).map_err(serde::de::Error::custom)
    }
}

impl Step {
    fn abbreviated(axis: Axis) -> Self {
        Self {
            axis,
            test: NodeTest::Any,
            predicates: Vec::new(),
        }
    }
}

// Parser

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&PathToken<'a>> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&PathToken<'a>> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn error(&self, message: &str) -> XmlError {
        let pos = self
            .tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or(self.source.len());
        XmlError::path_syntax(self.source, pos, message)
    }

    fn expect(&mut self, expected: PathToken<'a>, what: &str) -> XmlResult<()> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn parse_union(&mut self) -> XmlResult<Vec<LocationPath>> {
        let mut paths = vec![self.parse_selection()?];
        while self.peek() == Some(&PathToken::Pipe) {
            self.pos += 1;
            paths.push(self.parse_selection()?);
        }

        if self.peek().is_some() {
            return Err(self.error("unexpected token"));
        }
        Ok(paths)
    }

    fn parse_selection(&mut self) -> XmlResult<LocationPath> {
        let start = self.pos;
        let (path, target) = self.parse_path()?;
        if target.is_some() {
            self.pos = start;
            return Err(self.error("only elements can be selected"));
        }
        Ok(path)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                PathToken::Dot
                    | PathToken::DotDot
                    | PathToken::Star
                    | PathToken::At
                    | PathToken::Name(_)
            )
        )
    }

    /// Steps, optionally ending in `@name` or `text()`
    fn parse_path(&mut self) -> XmlResult<(LocationPath, Option<Target>)> {
        let mut path = LocationPath {
            absolute: false,
            steps: Vec::new(),
        };
        let mut axis = Axis::Child;

        match self.peek() {
            Some(PathToken::Slash) => {
                self.pos += 1;
                path.absolute = true;
                if !self.starts_step() {
                    return Ok((path, None));
                }
            }
            Some(PathToken::DoubleSlash) => {
                self.pos += 1;
                path.absolute = true;
                axis = Axis::Descendant;
            }
            _ => {}
        }

        loop {
            if let Some(target) = self.parse_target()? {
                if axis == Axis::Descendant {
                    return Err(self.error("'//' must be followed by an element step"));
                }
                return Ok((path, Some(target)));
            }

            path.steps.push(self.parse_step(axis)?);

            match self.peek() {
                Some(PathToken::Slash) => {
                    self.pos += 1;
                    axis = Axis::Child;
                }
                Some(PathToken::DoubleSlash) => {
                    self.pos += 1;
                    axis = Axis::Descendant;
                }
                _ => return Ok((path, None)),
            }
        }
    }

    fn parse_target(&mut self) -> XmlResult<Option<Target>> {
        match (self.peek(), self.peek_at(1)) {
            (Some(PathToken::At), Some(PathToken::Name(name))) => {
                let target = Target::Attribute(name.to_string());
                self.pos += 2;
                Ok(Some(target))
            }
            (Some(PathToken::At), _) => {
                self.pos += 1;
                Err(self.error("expected attribute name after '@'"))
            }
            (Some(PathToken::Name("text")), Some(PathToken::LParen)) => {
                self.pos += 2;
                self.expect(PathToken::RParen, "')'")?;
                Ok(Some(Target::Text))
            }
            _ => Ok(None),
        }
    }

    fn parse_step(&mut self, axis: Axis) -> XmlResult<Step> {
        let test = match self.peek() {
            Some(PathToken::Dot | PathToken::DotDot) if axis == Axis::Descendant => {
                return Err(self.error("'//' must be followed by an element step"));
            }
            Some(PathToken::Dot) => {
                self.pos += 1;
                return Ok(Step::abbreviated(Axis::SelfNode));
            }
            Some(PathToken::DotDot) => {
                self.pos += 1;
                return Ok(Step::abbreviated(Axis::Parent));
            }
            Some(PathToken::Star) => NodeTest::Any,
            Some(PathToken::Name(name)) => NodeTest::Name(name.to_string()),
            _ => return Err(self.error("expected a step")),
        };
        self.pos += 1;

        let mut predicates = Vec::new();
        while self.peek() == Some(&PathToken::LBracket) {
            self.pos += 1;
            predicates.push(self.parse_predicate()?);
            self.expect(PathToken::RBracket, "']'")?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_predicate(&mut self) -> XmlResult<Predicate> {
        if let (Some(PathToken::Number(n)), Some(PathToken::RBracket)) =
            (self.peek(), self.peek_at(1))
        {
            let position = n
                .parse::<f64>()
                .map_err(|_| self.error("invalid number"))?;
            self.pos += 1;
            return Ok(Predicate::Position(position));
        }

        if self.peek() == Some(&PathToken::Name("last"))
            && self.peek_at(1) == Some(&PathToken::LParen)
            && self.peek_at(2) == Some(&PathToken::RParen)
            && self.peek_at(3) == Some(&PathToken::RBracket)
        {
            self.pos += 3;
            return Ok(Predicate::Last);
        }

        Ok(Predicate::Filter(self.parse_or()?))
    }

    fn parse_or(&mut self) -> XmlResult<BoolExpr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&PathToken::Name("or")) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = BoolExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> XmlResult<BoolExpr> {
        let mut lhs = self.parse_primary()?;
        while self.peek() == Some(&PathToken::Name("and")) {
            self.pos += 1;
            let rhs = self.parse_primary()?;
            lhs = BoolExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> XmlResult<BoolExpr> {
        if self.peek() == Some(&PathToken::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(PathToken::RParen, "')'")?;
            return Ok(BoolExpr::Group(Box::new(inner)));
        }

        let lhs = self.parse_operand()?;
        let op = match self.peek() {
            Some(PathToken::Eq) => CompareOp::Eq,
            Some(PathToken::NotEq) => CompareOp::NotEq,
            _ => return Ok(BoolExpr::Exists(lhs)),
        };
        self.pos += 1;
        let rhs = self.parse_operand()?;

        Ok(BoolExpr::Compare { lhs, op, rhs })
    }

    fn parse_operand(&mut self) -> XmlResult<Operand> {
        match self.peek() {
            Some(PathToken::DoubleQuoted(s) | PathToken::SingleQuoted(s)) => {
                let literal = Operand::Literal(s.to_string());
                self.pos += 1;
                Ok(literal)
            }
            Some(PathToken::Number(n)) => {
                let number = Operand::Number(n.to_string());
                self.pos += 1;
                Ok(number)
            }
            _ => {
                let (path, target) = self.parse_path()?;
                if path.steps.is_empty() && !path.absolute {
                    match target {
                        Some(target) => Ok(Operand::Value { path: None, target }),
                        None => Err(self.error("expected a value")),
                    }
                } else {
                    Ok(Operand::Value {
                        path: Some(path),
                        target: target.unwrap_or(Target::Element),
                    })
                }
            }
        }
    }
}

// Evaluation

struct Evaluator<'d> {
    doc: &'d Document,
    order: Vec<usize>,
}

impl<'d> Evaluator<'d> {
    fn new(doc: &'d Document) -> Self {
        Self {
            doc,
            order: doc.document_order(),
        }
    }

    fn sort_unique(&self, nodes: &mut Vec<NodeId>) {
        nodes.sort_by_key(|n| self.order[n.index()]);
        nodes.dedup();
    }

    fn eval_path(&self, path: &LocationPath, context: NodeId) -> Vec<NodeId> {
        let mut current = if path.absolute {
            vec![self.doc.document_node()]
        } else {
            vec![context]
        };

        for step in &path.steps {
            let mut next = Vec::new();
            for node in &current {
                for group in self.candidates(step, *node) {
                    next.extend(self.apply_predicates(group, &step.predicates));
                }
            }
            self.sort_unique(&mut next);
            current = next;
        }

        current
    }

    /// Nodes reached by one step, grouped by parent for positional predicates
    fn candidates(&self, step: &Step, node: NodeId) -> Vec<Vec<NodeId>> {
        match step.axis {
            Axis::SelfNode => vec![vec![node]],
            Axis::Parent => self.doc.parent(node).map(|p| vec![vec![p]]).unwrap_or_default(),
            Axis::Child => vec![self
                .doc
                .children(node)
                .iter()
                .copied()
                .filter(|c| self.matches(&step.test, *c))
                .collect()],
            Axis::Descendant => {
                let mut groups: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
                for descendant in self.doc.descendants_or_self(node).into_iter().skip(1) {
                    if !self.matches(&step.test, descendant) {
                        continue;
                    }
                    if let Some(parent) = self.doc.parent(descendant) {
                        groups.entry(parent).or_default().push(descendant);
                    }
                }
                groups.into_values().collect()
            }
        }
    }

    fn matches(&self, test: &NodeTest, node: NodeId) -> bool {
        match test {
            NodeTest::Any => !self.doc.is_document(node),
            NodeTest::Name(name) => self.doc.name(node) == name,
        }
    }

    fn apply_predicates(&self, mut group: Vec<NodeId>, predicates: &[Predicate]) -> Vec<NodeId> {
        for predicate in predicates {
            let size = group.len();
            group = group
                .into_iter()
                .enumerate()
                .filter(|(i, node)| match predicate {
                    Predicate::Position(p) => (*i + 1) as f64 == *p,
                    Predicate::Last => *i + 1 == size,
                    Predicate::Filter(expr) => self.eval_bool(expr, *node),
                })
                .map(|(_, node)| node)
                .collect();
        }
        group
    }

    fn eval_bool(&self, expr: &BoolExpr, node: NodeId) -> bool {
        match expr {
            BoolExpr::Or(a, b) => self.eval_bool(a, node) || self.eval_bool(b, node),
            BoolExpr::And(a, b) => self.eval_bool(a, node) && self.eval_bool(b, node),
            BoolExpr::Group(inner) => self.eval_bool(inner, node),
            BoolExpr::Exists(operand) => match operand {
                Operand::Literal(s) => !s.is_empty(),
                Operand::Number(n) => n.parse::<f64>().map(|v| v != 0.0).unwrap_or(false),
                Operand::Value { .. } => !self.values(operand, node).is_empty(),
            },
            BoolExpr::Compare { lhs, op, rhs } => {
                let left = self.values(lhs, node);
                let right = self.values(rhs, node);
                let numeric =
                    matches!(lhs, Operand::Number(_)) || matches!(rhs, Operand::Number(_));

                left.iter().any(|l| {
                    right.iter().any(|r| {
                        let equal = if numeric {
                            match (l.trim().parse::<f64>(), r.trim().parse::<f64>()) {
                                (Ok(a), Ok(b)) => a == b,
                                // NaN compares unequal to everything
                                _ => return *op == CompareOp::NotEq,
                            }
                        } else {
                            l == r
                        };
                        match op {
                            CompareOp::Eq => equal,
                            CompareOp::NotEq => !equal,
                        }
                    })
                })
            }
        }
    }

    fn values(&self, operand: &Operand, node: NodeId) -> Vec<String> {
        match operand {
            Operand::Literal(s) | Operand::Number(s) => vec![s.clone()],
            Operand::Value { path, target } => {
                let nodes = match path {
                    Some(path) => self.eval_path(path, node),
                    None => vec![node],
                };
                nodes
                    .into_iter()
                    .filter_map(|n| match target {
                        Target::Attribute(name) => self.doc.attribute(n, name).map(str::to_string),
                        Target::Text => self.doc.text(n).map(str::to_string),
                        Target::Element => Some(self.doc.text(n).unwrap_or_default().to_string()),
                    })
                    .collect()
            }
        }
    }
}

// Display

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute && self.steps.is_empty() {
            return f.write_str("/");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.axis == Axis::Descendant {
                f.write_str("//")?;
            } else if i > 0 || self.absolute {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.axis {
            Axis::SelfNode => return f.write_str("."),
            Axis::Parent => return f.write_str(".."),
            Axis::Child | Axis::Descendant => {}
        }
        match &self.test {
            NodeTest::Any => f.write_str("*")?,
            NodeTest::Name(name) => f.write_str(name)?,
        }
        for predicate in &self.predicates {
            match predicate {
                Predicate::Position(p) => write!(f, "[{}]", p)?,
                Predicate::Last => f.write_str("[last()]")?,
                Predicate::Filter(expr) => write!(f, "[{}]", expr)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolExpr::Or(a, b) => write!(f, "{} or {}", a, b),
            BoolExpr::And(a, b) => write!(f, "{} and {}", a, b),
            BoolExpr::Group(inner) => write!(f, "({})", inner),
            BoolExpr::Compare { lhs, op, rhs } => {
                let op = match op {
                    CompareOp::Eq => "=",
                    CompareOp::NotEq => "!=",
                };
                write!(f, "{}{}{}", lhs, op, rhs)
            }
            BoolExpr::Exists(operand) => write!(f, "{}", operand),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(s) => f.write_str(&quote_literal(s)),
            Operand::Number(n) => f.write_str(n),
            Operand::Value { path, target } => {
                if let Some(path) = path {
                    write!(f, "{}", path)?;
                    if *target != Target::Element {
                        f.write_str("/")?;
                    }
                }
                match target {
                    Target::Attribute(name) => write!(f, "@{}", name),
                    Target::Text => f.write_str("text()"),
                    Target::Element => Ok(()),
                }
            }
        }
    }
}

use std::cmp::Ordering;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde_json::{Number, Value};

use super::{Predicate, PredicateError, PredicateLanguage};
use crate::filter::is_unset;

/// The built-in predicate language: a JSONPath subset where a field is
/// visible when the query selects at least one value that is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPathLanguage;

impl PredicateLanguage for JsonPathLanguage {
    fn compile(&self, source: &str) -> Result<Arc<dyn Predicate>, PredicateError> {
        Ok(Arc::new(JsonPathPredicate::parse(source)?))
    }
}

#[derive(Debug, Clone)]
pub struct JsonPathPredicate {
    source: String,
    query: JsonPath,
}

impl JsonPathPredicate {
    pub fn parse(source: &str) -> Result<Self, PredicateError> {
        Ok(Self {
            source: source.to_string(),
            query: JsonPath::parse(source)?,
        })
    }

    pub fn query(&self) -> &JsonPath {
        &self.query
    }
}

impl Predicate for JsonPathPredicate {
    fn evaluate(&self, record: &Value) -> bool {
        self.query
            .select(record)
            .into_iter()
            .any(|matched| !is_unset(Some(matched)))
    }

    fn source(&self) -> &str {
        &self.source
    }
}

/// A compiled JSONPath query.
///
/// Supported syntax: `$`, `.name`, `['name']`, `[n]` (negative counts from
/// the end), unions such as `['a','b']` or `[0,2]`, `*`, `..` recursive
/// descent and filters `[?(...)]`. Filters accept `@`/`$` relative paths,
/// string, number, boolean and null literals, the comparisons
/// `== != === !== < <= > >=`, regex matching with `=~ /re/flags`, the
/// logical operators `&& || !` and parentheses.
#[derive(Debug, Clone)]
pub struct JsonPath {
    steps: Vec<Step>,
}

impl JsonPath {
    pub fn parse(source: &str) -> Result<Self, PredicateError> {
        let mut parser = Parser::new(source);
        parser.skip_ws();
        parser.expect('$')?;
        let steps = parser.parse_steps()?;
        parser.skip_ws();
        if let Some(c) = parser.peek() {
            return Err(parser.error(format!("unexpected '{c}'")));
        }
        Ok(Self { steps })
    }

    pub fn select<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        run(&self.steps, root, root)
    }
}

#[derive(Debug, Clone)]
enum Step {
    Child(Selector),
    Descendant(Selector),
}

#[derive(Debug, Clone)]
enum Selector {
    Name(String),
    Index(i64),
    Wildcard,
    Union(Vec<Selector>),
    Filter(Box<Expr>),
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Test(Operand),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Match {
        operand: Operand,
        pattern: Regex,
    },
}

#[derive(Debug, Clone)]
enum Operand {
    Current(Vec<Step>),
    Root(Vec<Step>),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn run<'a>(steps: &[Step], start: &'a Value, root: &'a Value) -> Vec<&'a Value> {
    let mut current = vec![start];
    for step in steps {
        let mut next = Vec::new();
        for node in current {
            match step {
                Step::Child(selector) => selector.apply(node, root, &mut next),
                Step::Descendant(selector) => {
                    let mut nodes = Vec::new();
                    descendants(node, &mut nodes);
                    for inner in nodes {
                        selector.apply(inner, root, &mut next);
                    }
                }
            }
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }
    current
}

fn descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    for child in children(node) {
        descendants(child, out);
    }
}

fn children(node: &Value) -> Vec<&Value> {
    match node {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    }
}

impl Selector {
    fn apply<'a>(&self, node: &'a Value, root: &'a Value, out: &mut Vec<&'a Value>) {
        match self {
            Selector::Name(name) => {
                if let Value::Object(map) = node {
                    if let Some(value) = map.get(name) {
                        out.push(value);
                    }
                }
            }
            Selector::Index(index) => {
                if let Value::Array(items) = node {
                    let len = items.len() as i64;
                    let resolved = if *index < 0 { len + index } else { *index };
                    if (0..len).contains(&resolved) {
                        out.push(&items[resolved as usize]);
                    }
                }
            }
            Selector::Wildcard => out.extend(children(node)),
            Selector::Union(selectors) => {
                for selector in selectors {
                    selector.apply(node, root, out);
                }
            }
            Selector::Filter(expr) => {
                out.extend(
                    children(node)
                        .into_iter()
                        .filter(|child| expr.holds(child, root)),
                );
            }
        }
    }
}

impl Expr {
    fn holds(&self, current: &Value, root: &Value) -> bool {
        match self {
            Expr::Or(left, right) => left.holds(current, root) || right.holds(current, root),
            Expr::And(left, right) => left.holds(current, root) && right.holds(current, root),
            Expr::Not(inner) => !inner.holds(current, root),
            Expr::Test(operand) => operand.resolve(current, root).is_some_and(truthy),
            Expr::Compare { left, op, right } => compare(
                left.resolve(current, root),
                *op,
                right.resolve(current, root),
            ),
            Expr::Match { operand, pattern } => operand
                .resolve(current, root)
                .and_then(Value::as_str)
                .is_some_and(|text| pattern.is_match(text)),
        }
    }
}

impl Operand {
    fn resolve<'a>(&'a self, current: &'a Value, root: &'a Value) -> Option<&'a Value> {
        match self {
            Operand::Current(steps) => run(steps, current, root).into_iter().next(),
            Operand::Root(steps) => run(steps, root, root).into_iter().next(),
            Operand::Literal(value) => Some(value),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(left: Option<&Value>, op: CompareOp, right: Option<&Value>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => match op {
            CompareOp::Eq => equal(left, right),
            CompareOp::Ne => !equal(left, right),
            CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
            CompareOp::Le => matches!(
                ordering(left, right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
            CompareOp::Ge => matches!(
                ordering(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        },
        (None, None) => op == CompareOp::Eq,
        _ => op == CompareOp::Ne,
    }
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Deepest nesting of `!`, parentheses and filters a predicate may use.
const MAX_NESTING: usize = 64;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let len = expected.chars().count();
        let matches = self.chars.len() >= self.pos + len
            && self.chars[self.pos..self.pos + len]
                .iter()
                .copied()
                .eq(expected.chars());
        if matches {
            self.pos += len;
        }
        matches
    }

    fn expect(&mut self, expected: char) -> Result<(), PredicateError> {
        if self.eat(expected) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(self.error(format!("expected '{expected}', found '{found}'"))),
                None => Err(self.error(format!("expected '{expected}', found end of input"))),
            }
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> PredicateError {
        PredicateError::new(self.pos, message)
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, PredicateError>,
    ) -> Result<T, PredicateError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!(
                "expression nests deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn parse_steps(&mut self) -> Result<Vec<Step>, PredicateError> {
        let mut steps = Vec::new();
        loop {
            if self.eat_str("..") {
                let selector = match self.peek() {
                    Some('[') => self.parse_bracket()?,
                    Some('*') => {
                        self.bump();
                        Selector::Wildcard
                    }
                    _ => Selector::Name(self.parse_name()?),
                };
                steps.push(Step::Descendant(selector));
            } else if self.eat('.') {
                let selector = if self.eat('*') {
                    Selector::Wildcard
                } else {
                    Selector::Name(self.parse_name()?)
                };
                steps.push(Step::Child(selector));
            } else if self.peek() == Some('[') {
                steps.push(Step::Child(self.parse_bracket()?));
            } else {
                return Ok(steps);
            }
        }
    }

    fn parse_name(&mut self) -> Result<String, PredicateError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a member name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_bracket(&mut self) -> Result<Selector, PredicateError> {
        self.expect('[')?;
        self.skip_ws();
        if self.eat('?') {
            let expr = self.nested(Self::parse_or)?;
            self.skip_ws();
            self.expect(']')?;
            return Ok(Selector::Filter(Box::new(expr)));
        }

        let mut selectors = Vec::new();
        loop {
            self.skip_ws();
            let selector = match self.peek() {
                Some(quote @ ('\'' | '"')) => Selector::Name(self.parse_string(quote)?),
                Some('*') => {
                    self.bump();
                    Selector::Wildcard
                }
                Some(c) if c == '-' || c.is_ascii_digit() => Selector::Index(self.parse_index()?),
                _ => return Err(self.error("expected a name, index or '*' selector")),
            };
            selectors.push(selector);
            self.skip_ws();
            if !self.eat(',') {
                break;
            }
        }
        self.expect(']')?;
        if selectors.len() == 1 {
            Ok(selectors.remove(0))
        } else {
            Ok(Selector::Union(selectors))
        }
    }

    fn parse_index(&mut self) -> Result<i64, PredicateError> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse::<i64>()
            .map_err(|_| PredicateError::new(start, format!("invalid index '{digits}'")))
    }

    fn parse_string(&mut self, quote: char) -> Result<String, PredicateError> {
        let start = self.pos;
        self.expect(quote)?;
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(PredicateError::new(start, "unterminated string literal")),
                Some(c) if c == quote => return Ok(text),
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(other) => text.push(other),
                    None => return Err(PredicateError::new(start, "unterminated string literal")),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.eat_str("||") {
                return Ok(left);
            }
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if !self.eat_str("&&") {
                return Ok(left);
            }
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, PredicateError> {
        self.skip_ws();
        if self.peek() == Some('!') && self.peek_at(1) != Some('=') {
            self.bump();
            let inner = self.nested(Self::parse_unary)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, PredicateError> {
        self.skip_ws();
        if self.eat('(') {
            let expr = self.nested(Self::parse_or)?;
            self.skip_ws();
            self.expect(')')?;
            return Ok(expr);
        }

        let left = self.parse_operand()?;
        self.skip_ws();
        if self.eat_str("=~") {
            self.skip_ws();
            let pattern = self.parse_regex()?;
            return Ok(Expr::Match {
                operand: left,
                pattern,
            });
        }
        match self.parse_compare_op() {
            Some(op) => {
                self.skip_ws();
                let right = self.parse_operand()?;
                Ok(Expr::Compare { left, op, right })
            }
            None => Ok(Expr::Test(left)),
        }
    }

    fn parse_compare_op(&mut self) -> Option<CompareOp> {
        const OPERATORS: [(&str, CompareOp); 8] = [
            ("===", CompareOp::Eq),
            ("!==", CompareOp::Ne),
            ("==", CompareOp::Eq),
            ("!=", CompareOp::Ne),
            ("<=", CompareOp::Le),
            (">=", CompareOp::Ge),
            ("<", CompareOp::Lt),
            (">", CompareOp::Gt),
        ];
        OPERATORS
            .iter()
            .find(|(token, _)| self.eat_str(token))
            .map(|(_, op)| *op)
    }

    fn parse_operand(&mut self) -> Result<Operand, PredicateError> {
        match self.peek() {
            Some('@') => {
                self.bump();
                Ok(Operand::Current(self.parse_steps()?))
            }
            Some('$') => {
                self.bump();
                Ok(Operand::Root(self.parse_steps()?))
            }
            Some(quote @ ('\'' | '"')) => {
                Ok(Operand::Literal(Value::String(self.parse_string(quote)?)))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            _ => {
                for (keyword, value) in [
                    ("true", Value::Bool(true)),
                    ("false", Value::Bool(false)),
                    ("null", Value::Null),
                ] {
                    if self.eat_keyword(keyword) {
                        return Ok(Operand::Literal(value));
                    }
                }
                Err(self.error("expected '@', '$' or a literal"))
            }
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let start = self.pos;
        if !self.eat_str(keyword) {
            return false;
        }
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos = start;
            return false;
        }
        true
    }

    fn parse_number(&mut self) -> Result<Operand, PredicateError> {
        let start = self.pos;
        self.eat('-');
        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '-' || c == '+') && matches!(self.chars.get(self.pos - 1), Some('e' | 'E'));
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let invalid = || PredicateError::new(start, format!("invalid number '{text}'"));
        if let Ok(integer) = text.parse::<i64>() {
            return Ok(Operand::Literal(Value::from(integer)));
        }
        let float = text.parse::<f64>().map_err(|_| invalid())?;
        Number::from_f64(float)
            .map(|number| Operand::Literal(Value::Number(number)))
            .ok_or_else(invalid)
    }

    fn parse_regex(&mut self) -> Result<Regex, PredicateError> {
        let start = self.pos;
        self.expect('/')?;
        let mut pattern = String::new();
        loop {
            match self.bump() {
                None => return Err(PredicateError::new(start, "unterminated regex literal")),
                Some('/') => break,
                Some('\\') => match self.bump() {
                    Some('/') => pattern.push('/'),
                    Some(other) => {
                        pattern.push('\\');
                        pattern.push(other);
                    }
                    None => return Err(PredicateError::new(start, "unterminated regex literal")),
                },
                Some(c) => pattern.push(c),
            }
        }

        let mut builder = RegexBuilder::new(&pattern);
        while let Some(flag) = self.peek().filter(char::is_ascii_alphabetic) {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                // global and unicode flags have no effect on a boolean match
                'g' | 'u' => {}
                other => return Err(self.error(format!("unsupported regex flag '{other}'"))),
            }
            self.bump();
        }
        builder
            .build()
            .map_err(|err| PredicateError::new(start, format!("invalid regex: {err}")))
    }
}

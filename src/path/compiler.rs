//! Path expression compiler
//!
//! Compiles the restricted path grammar into an executable step sequence:
//!
//! ```text
//! path      := ('/' | '//')? step (('/' | '//') step)*
//! step      := '@'? nametest predicate?
//! nametest  := '*' | name | prefix ':' name
//! predicate := '[' digits ']' | '[' '@' nametest '=' quoted ']'
//! ```
//!
//! Prefixes are resolved against the supplied namespace bindings at compile
//! time, so evaluation compares resolved URIs and never sees a raw prefix.
//! A compiled path holds no reference to any document and can be evaluated
//! against many documents, from many threads.

use crate::error::{Error, Result};
use log::trace;

/// Default prefix accepted in expressions without an explicit binding
pub const DEFAULT_PREFIX: &str = "ns";

/// Ordered namespace bindings plus the default prefix.
///
/// This is the single canonical representation of namespace input: ordered
/// `(prefix, uri)` pairs, later entries overriding earlier ones for the
/// same prefix. A binding with an empty prefix is registered under the
/// default prefix.
#[derive(Debug, Clone)]
pub struct Namespaces {
    default_prefix: String,
    bindings: Vec<(String, String)>,
}

impl Namespaces {
    /// Empty binding set with the default prefix `"ns"`
    pub fn new() -> Self {
        Self::with_default_prefix(DEFAULT_PREFIX)
    }

    /// Empty binding set with an explicit default prefix
    pub fn with_default_prefix(prefix: impl Into<String>) -> Self {
        Namespaces {
            default_prefix: prefix.into(),
            bindings: Vec::new(),
        }
    }

    /// Append a binding. An empty prefix binds the default prefix.
    pub fn bind(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = if prefix.is_empty() {
            self.default_prefix.clone()
        } else {
            prefix
        };
        self.bindings.push((prefix, uri.into()));
        self
    }

    /// The prefix usable in expressions without a binding
    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// The bindings in insertion order
    pub fn bindings(&self) -> &[(String, String)] {
        &self.bindings
    }

    /// Resolve a prefix; the most recently added binding wins
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for Namespaces {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Namespaces::new(), |ns, (p, u)| ns.bind(p, u))
    }
}

/// Traversal relation of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    Attribute,
}

/// Name test with the prefix already resolved to a URI.
/// `uri: None` matches names in no namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Any,
    Name { local: String, uri: Option<String> },
}

/// Per-step filter
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// 1-based position within each context item's own candidate subset
    Position(usize),
    /// Attribute-value equality
    AttrEquals { test: NameTest, value: String },
}

/// One segment of a compiled path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    pub predicate: Option<Predicate>,
}

/// A compiled, immutable, document-independent path expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    expression: String,
    steps: Vec<Step>,
}

impl CompiledPath {
    /// Compile a path expression against a set of namespace bindings.
    ///
    /// Fails with `InvalidPath` on an empty expression, a prefix that is
    /// neither bound nor the default prefix, or syntax outside the
    /// supported grammar. A failed compile never reaches evaluation.
    pub fn compile(expression: &str, namespaces: &Namespaces) -> Result<CompiledPath> {
        if expression.is_empty() {
            return Err(Error::invalid_path("empty expression"));
        }

        let steps = Parser {
            input: expression,
            pos: 0,
            namespaces,
        }
        .parse()?;

        trace!("compiled '{}' into {} steps", expression, steps.len());
        Ok(CompiledPath {
            expression: expression.to_string(),
            steps,
        })
    }

    /// The source expression this path was compiled from
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    namespaces: &'a Namespaces,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<Vec<Step>> {
        let mut steps = Vec::new();
        let mut axis_hint = Axis::Child;

        // Leading '/' anchors at the root; '//' makes the first step a
        // descendant step
        if self.eat('/') {
            if self.eat('/') {
                axis_hint = Axis::Descendant;
            } else if self.at_end() {
                // Bare "/" selects the root element
                return Ok(steps);
            }
        }

        loop {
            steps.push(self.parse_step(axis_hint)?);
            if self.at_end() {
                return Ok(steps);
            }
            if !self.eat('/') {
                return Err(self.unexpected("expected '/' between steps"));
            }
            axis_hint = if self.eat('/') {
                Axis::Descendant
            } else {
                Axis::Child
            };
        }
    }

    fn parse_step(&mut self, axis_hint: Axis) -> Result<Step> {
        let mut axis = axis_hint;
        if self.eat('@') {
            // '//@name' searches attributes of all descendants; the
            // descendant hop happens on the element side, so the attribute
            // axis replaces the hint only after an explicit child separator
            if axis == Axis::Descendant {
                return Err(Error::invalid_path("'//@' is not supported; use '//*' then '@'"));
            }
            axis = Axis::Attribute;
        }

        let test = self.parse_name_test()?;
        let predicate = if self.eat('[') {
            let predicate = self.parse_predicate()?;
            if !self.eat(']') {
                return Err(self.unexpected("expected ']'"));
            }
            Some(predicate)
        } else {
            None
        };

        Ok(Step {
            axis,
            test,
            predicate,
        })
    }

    fn parse_name_test(&mut self) -> Result<NameTest> {
        if self.eat('*') {
            return Ok(NameTest::Any);
        }

        let first = self.read_name()?;
        if self.eat(':') {
            let local = self.read_name()?;
            let uri = self.resolve_prefix(first)?;
            Ok(NameTest::Name {
                local: local.to_string(),
                uri,
            })
        } else {
            // Unprefixed names match only names in no namespace
            Ok(NameTest::Name {
                local: first.to_string(),
                uri: None,
            })
        }
    }

    /// Resolve a query prefix against the bindings. The default prefix is
    /// always accepted; unbound it denotes "no namespace".
    fn resolve_prefix(&self, prefix: &str) -> Result<Option<String>> {
        match self.namespaces.resolve(prefix) {
            Some(uri) => Ok(Some(uri.to_string())),
            None if prefix == self.namespaces.default_prefix() => Ok(None),
            None => Err(Error::invalid_path(format!(
                "unknown namespace prefix '{prefix}'"
            ))),
        }
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        if self.eat('@') {
            let test = self.parse_name_test()?;
            if !self.eat('=') {
                return Err(self.unexpected("expected '=' in attribute predicate"));
            }
            let value = self.read_quoted()?;
            Ok(Predicate::AttrEquals { test, value })
        } else {
            let digits = self.read_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(self.unexpected("expected position or '@name=value' predicate"));
            }
            let position: usize = digits
                .parse()
                .map_err(|_| Error::invalid_path(format!("position '{digits}' out of range")))?;
            Ok(Predicate::Position(position))
        }
    }

    // -- low-level cursor helpers ------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn read_name(&mut self) -> Result<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => self.pos += c.len_utf8(),
            _ => return Err(self.unexpected("expected a name")),
        }
        self.read_while(is_name_char);
        Ok(&self.input[start..self.pos])
    }

    fn read_quoted(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.unexpected("expected quoted value")),
        };
        self.pos += 1;
        let value = self.read_while(|c| c != quote).to_string();
        if !self.eat(quote) {
            return Err(self.unexpected("unterminated quoted value"));
        }
        Ok(value)
    }

    fn unexpected(&self, message: &str) -> Error {
        match self.peek() {
            Some(c) => Error::invalid_path(format!(
                "{message} at offset {} (found '{c}') in '{}'",
                self.pos, self.input
            )),
            None => Error::invalid_path(format!(
                "{message} at end of expression '{}'",
                self.input
            )),
        }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

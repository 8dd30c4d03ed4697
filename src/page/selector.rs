//! A small CSS selector engine
//!
//! Supports what anchor selectors on the host pages use: type selectors,
//! `*`, `#id`, `.class`, `:nth-child(n)`, the child combinator `>` and the
//! descendant combinator (whitespace).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected character '{found}' at offset {offset} in selector")]
    Unexpected { found: char, offset: usize },

    #[error("Combinator '>' without a selector on both sides")]
    DanglingCombinator,

    #[error("Unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),

    #[error("Invalid :nth-child argument '{0}'")]
    InvalidNth(String),
}

/// How a compound relates to the compound on its left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Child,
    Descendant,
}

/// One compound selector, e.g. `div.badge_row_inner:nth-child(2)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub nth_child: Option<usize>,
}

/// What a compound needs to know about an element to match it
pub trait ElementInfo {
    fn tag(&self) -> &str;
    fn id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    /// 1-based position among element siblings
    fn position(&self) -> usize;
}

impl Compound {
    pub fn matches(&self, el: &impl ElementInfo) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(el.tag()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        match self.nth_child {
            Some(n) => el.position() == n,
            None => true,
        }
    }
}

/// A parsed selector: a chain of compounds joined by combinators
///
/// `first` is the leftmost compound; every entry of `rest` carries the
/// combinator linking it to the compound before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    first: Compound,
    rest: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The rightmost compound, which the matched element itself must satisfy
    pub fn subject(&self) -> &Compound {
        self.rest.last().map(|(_, c)| c).unwrap_or(&self.first)
    }

    /// Compounds from right to left paired with the combinator to their left
    pub(crate) fn chain(&self) -> (&Compound, Vec<(Combinator, &Compound)>) {
        let mut compounds: Vec<&Compound> = vec![&self.first];
        compounds.extend(self.rest.iter().map(|(_, c)| c));
        let combinators: Vec<Combinator> = self.rest.iter().map(|(c, _)| *c).collect();

        let subject = compounds.pop().unwrap_or(&self.first);
        let ancestors = combinators
            .into_iter()
            .rev()
            .zip(compounds.into_iter().rev())
            .collect();
        (subject, ancestors)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                found,
                offset: self.pos,
            },
            None => SelectorError::DanglingCombinator,
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(SelectorError::Empty);
        }

        let first = self.compound()?;
        let mut rest = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            rest.push((combinator, self.compound()?));
        }

        Ok(Selector {
            source: self.input.trim().to_string(),
            first,
            rest,
        })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let start = self.pos;

        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(c) if c.is_alphabetic() => compound.tag = Some(self.ident().to_ascii_lowercase()),
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(self.unexpected());
                    }
                    compound.id = Some(id);
                }
                Some('.') => {
                    self.bump();
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(self.unexpected());
                    }
                    compound.classes.push(class);
                }
                Some(':') => {
                    self.bump();
                    compound.nth_child = Some(self.pseudo()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn pseudo(&mut self) -> Result<usize, SelectorError> {
        let name = self.ident();
        if name != "nth-child" {
            return Err(SelectorError::UnsupportedPseudo(name));
        }
        if self.bump() != Some('(') {
            return Err(SelectorError::InvalidNth(String::new()));
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.bump();
        }
        let arg = self.input[start..self.pos].trim().to_string();
        if self.bump() != Some(')') {
            return Err(SelectorError::InvalidNth(arg));
        }
        match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(SelectorError::InvalidNth(arg)),
        }
    }
}

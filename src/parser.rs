// Copyright 2026-present rtrv contributors
// SPDX-License-Identifier: Apache-2.0

//! Query parsing: strings in, syntax trees out.
//!
//! A small hand-rolled lexer feeds a recursive-descent parser for the
//! grammar (precedence high → low):
//!
//! ```text
//! atom       := '(' expr ')' | phrase | field-term | term
//! phrase     := '"' WORD+ '"' ( '~' NUMBER )?
//! field-term := WORD ':' ( phrase | term )
//! factor     := 'NOT'? atom
//! term-expr  := factor ( 'OR' factor )*
//! expr       := term-expr ( ( 'AND' | implicit ) term-expr )*
//! ```
//!
//! `AND`/`OR`/`NOT` are case-insensitive and only recognized as bare words.
//! Adjacent term-exprs with no operator get an implicit AND.
//!
//! Parsing never fails to the caller: anything unrecoverable (unclosed
//! quote, dangling operator, unbalanced parens) collapses to a single
//! `Term` node carrying the raw query string, and retrieval degrades to
//! treating the query as one term.
//!
//! Note that candidate selection in the engine consumes
//! [`QueryParser::extract_terms`], not the tree: boolean structure is
//! parsed and preserved for callers but does not constrain retrieval.

use serde::{Deserialize, Serialize};

/// Query syntax tree.
///
/// Invariants: `And`/`Or` carry at least one child (the parser only builds
/// them with two or more), `Not` exactly one, `Phrase.terms` is non-empty,
/// and `max_distance` 0 means exact adjacency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryNode {
    Term(String),
    Phrase { terms: Vec<String>, max_distance: u32 },
    Field { name: String, query: Box<QueryNode> },
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    Not(Box<QueryNode>),
}

impl std::fmt::Display for QueryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryNode::Term(t) => write!(f, "{t}"),
            QueryNode::Phrase {
                terms,
                max_distance,
            } => {
                write!(f, "\"{}\"", terms.join(" "))?;
                if *max_distance > 0 {
                    write!(f, "~{max_distance}")?;
                }
                Ok(())
            }
            QueryNode::Field { name, query } => write!(f, "{name}:{query}"),
            QueryNode::And(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            QueryNode::Or(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            QueryNode::Not(child) => write!(f, "NOT {child}"),
        }
    }
}

/// Lexer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Quote,
    LParen,
    RParen,
    Colon,
    Tilde,
    And,
    Or,
    Not,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\''
}

fn lex(input: &str) -> Vec<Tok> {
    let mut toks = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                toks.push(Tok::LParen);
            }
            ')' => {
                chars.next();
                toks.push(Tok::RParen);
            }
            ':' => {
                chars.next();
                toks.push(Tok::Colon);
            }
            '~' => {
                chars.next();
                toks.push(Tok::Tilde);
            }
            '"' => {
                chars.next();
                toks.push(Tok::Quote);
            }
            _ if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if is_word_char(c) {
                        word.push(c.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                toks.push(match word.as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    _ => Tok::Word(word),
                });
            }
            // Whitespace and stray punctuation both separate tokens.
            _ => {
                chars.next();
            }
        }
    }
    toks
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

/// Internal parse failure; collapses to the fallback term at the boundary.
struct ParseError;

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn starts_term_expr(tok: &Tok) -> bool {
        matches!(
            tok,
            Tok::Word(_) | Tok::Quote | Tok::LParen | Tok::Not
        )
    }

    fn expr(&mut self) -> Result<QueryNode, ParseError> {
        let mut children = vec![self.term_expr()?];
        loop {
            match self.peek() {
                Some(Tok::And) => {
                    self.pos += 1;
                    children.push(self.term_expr()?);
                }
                Some(tok) if Self::starts_term_expr(tok) => {
                    children.push(self.term_expr()?);
                }
                _ => break,
            }
        }
        Ok(if children.len() == 1 {
            children.pop().ok_or(ParseError)?
        } else {
            QueryNode::And(children)
        })
    }

    fn term_expr(&mut self) -> Result<QueryNode, ParseError> {
        let mut children = vec![self.factor()?];
        while self.eat(&Tok::Or) {
            children.push(self.factor()?);
        }
        Ok(if children.len() == 1 {
            children.pop().ok_or(ParseError)?
        } else {
            QueryNode::Or(children)
        })
    }

    fn factor(&mut self) -> Result<QueryNode, ParseError> {
        if self.eat(&Tok::Not) {
            Ok(QueryNode::Not(Box::new(self.atom()?)))
        } else {
            self.atom()
        }
    }

    fn atom(&mut self) -> Result<QueryNode, ParseError> {
        match self.bump() {
            Some(Tok::LParen) => {
                let inner = self.expr()?;
                if self.eat(&Tok::RParen) {
                    Ok(inner)
                } else {
                    Err(ParseError)
                }
            }
            Some(Tok::Quote) => self.phrase_body(),
            Some(Tok::Word(word)) => {
                if self.eat(&Tok::Colon) {
                    // field-term: the payload is a phrase or a bare term.
                    let query = if self.eat(&Tok::Quote) {
                        self.phrase_body()?
                    } else {
                        match self.bump() {
                            Some(Tok::Word(term)) => QueryNode::Term(term),
                            _ => return Err(ParseError),
                        }
                    };
                    Ok(QueryNode::Field {
                        name: word,
                        query: Box::new(query),
                    })
                } else {
                    Ok(QueryNode::Term(word))
                }
            }
            _ => Err(ParseError),
        }
    }

    /// Parse `WORD+ '"' ('~' NUMBER)?`; the opening quote is consumed.
    fn phrase_body(&mut self) -> Result<QueryNode, ParseError> {
        let mut terms = Vec::new();
        loop {
            match self.bump() {
                Some(Tok::Word(w)) => terms.push(w),
                // Operator words inside quotes are plain words.
                Some(Tok::And) => terms.push("and".to_string()),
                Some(Tok::Or) => terms.push("or".to_string()),
                Some(Tok::Not) => terms.push("not".to_string()),
                Some(Tok::Quote) => break,
                _ => return Err(ParseError),
            }
        }
        if terms.is_empty() {
            return Err(ParseError);
        }

        let mut max_distance = 0;
        if self.eat(&Tok::Tilde) {
            match self.bump() {
                Some(Tok::Word(digits)) if digits.bytes().all(|b| b.is_ascii_digit()) => {
                    max_distance = digits.parse().map_err(|_| ParseError)?;
                }
                _ => return Err(ParseError),
            }
        }
        Ok(QueryNode::Phrase {
            terms,
            max_distance,
        })
    }
}

/// Parses user queries into [`QueryNode`] trees, and extracts flat term
/// lists for the retrieval path.
#[derive(Debug, Clone, Default)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        QueryParser
    }

    /// Parse a query string. Never fails: unrecoverable input yields a
    /// single `Term` node carrying the raw query, and empty input yields
    /// `Term("")`.
    pub fn parse(&self, query: &str) -> QueryNode {
        let toks = lex(query);
        if toks.is_empty() {
            return QueryNode::Term(String::new());
        }
        let mut parser = Parser { toks, pos: 0 };
        match parser.expr() {
            Ok(node) if parser.peek().is_none() => node,
            _ => QueryNode::Term(query.to_string()),
        }
    }

    /// Flatten a query into lowercased terms: split on whitespace and
    /// punctuation, drop bare `AND`/`OR`/`NOT`, and keep quoted phrases as
    /// single entries. This is what candidate selection consumes.
    pub fn extract_terms(&self, query: &str) -> Vec<String> {
        let mut terms = Vec::new();
        let mut chars = query.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c == '"' {
                chars.next();
                let mut phrase = String::new();
                // An unclosed quote keeps the remainder as the phrase.
                for c in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                    phrase.push(c.to_ascii_lowercase());
                }
                let phrase = phrase.trim().to_string();
                if !phrase.is_empty() {
                    terms.push(phrase);
                }
            } else if is_word_char(c) {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if is_word_char(c) {
                        word.push(c.to_ascii_lowercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !matches!(word.as_str(), "and" | "or" | "not") {
                    terms.push(word);
                }
            } else {
                chars.next();
            }
        }
        terms
    }
}

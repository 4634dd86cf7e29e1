//! Path expressions: `{scope.segment.segment}`.
//!
//! A marker value of this exact shape selects a value inside the store of the
//! provider named `scope`. Anything else is a literal. Lexing is done with
//! logos; the grammar is `"{" SEGMENT ("." SEGMENT)* "}"`.

use std::fmt;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    #[token("{")]
    Open,
    #[token("}")]
    Close,
    #[token(".")]
    Dot,
    #[regex(r"[^{}.\s]+")]
    Segment,
}

/// A parsed `{scope.a.b}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    scope: String,
    segments: Vec<String>,
}

impl PathExpression {
    /// Parse a marker value. Returns `None` for literals.
    pub fn parse(input: &str) -> Option<Self> {
        let tokens = Token::lexer(input)
            .spanned()
            .map(|(tok, span)| tok.ok().map(|tok| (tok, &input[span])))
            .collect::<Option<Vec<_>>>()?;
        let mut tokens = tokens.into_iter();

        if !matches!(tokens.next(), Some((Token::Open, _))) {
            return None;
        }
        let scope = match tokens.next() {
            Some((Token::Segment, text)) => text.to_owned(),
            _ => return None,
        };

        let mut segments = Vec::new();
        loop {
            match tokens.next() {
                Some((Token::Dot, _)) => match tokens.next() {
                    Some((Token::Segment, text)) => segments.push(text.to_owned()),
                    _ => return None,
                },
                Some((Token::Close, _)) => break,
                _ => return None,
            }
        }

        // Nothing may follow the closing brace.
        if tokens.next().is_some() {
            return None;
        }
        Some(Self { scope, segments })
    }

    /// Whether `input` is a path expression rather than a literal.
    pub fn is_path_expression(input: &str) -> bool {
        Self::parse(input).is_some()
    }

    /// Scope name of `input`, if it is a path expression.
    pub fn scope_of(input: &str) -> Option<String> {
        Self::parse(input).map(|p| p.scope)
    }

    /// The provider name this expression selects.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Segments after the scope name. Empty means the store's root value.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dot-joined segments, as accepted by store lookups.
    pub fn path(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.scope)?;
        for seg in &self.segments {
            write!(f, ".{seg}")?;
        }
        f.write_str("}")
    }
}

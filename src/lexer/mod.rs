//! Variable references and substitution.
//!
//! A line is cut into literal text and variable references:
//! - `${NAME}` runs to the next `}`; anything up to it is the name
//! - `$NAME` takes the longest run of `[A-Za-z_]` after the `$`
//! - a `$` followed by neither is literal text
//!
//! Substitution is a single pass. Values are never rescanned, so a value
//! containing `$` is inserted as-is.

use crate::runtime::Runtime;
use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    #[regex(r"\$\{[^}]*\}", |lex| { let s = lex.slice(); &s[2..s.len() - 1] })]
    Braced(&'a str),

    // `${` with no closing brace before end of line
    #[regex(r"\$\{[^}]*")]
    Unterminated,

    #[regex(r"\$[A-Za-z_]*", |lex| &lex.slice()[1..])]
    Bare(&'a str),

    #[regex(r"[^$]+", |lex| lex.slice())]
    Text(&'a str),
}

pub struct Lexer<'a> {
    inner: logos::Lexer<'a, Fragment<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: Fragment::lexer(input),
        }
    }

    #[cfg(test)]
    fn tokenize(input: &'a str) -> Result<Vec<Fragment<'a>>, LexerError> {
        Lexer::new(input).collect()
    }

    /// Byte range of the most recent fragment.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.inner.span()
    }

    pub fn slice(&self) -> &'a str {
        self.inner.slice()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Fragment<'a>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|result| {
            result.map_err(|_| LexerError::InvalidToken {
                position: self.inner.span().start,
                text: self.inner.slice().to_string(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexerError {
    #[error("Variable could not be parsed from '{text}' at position {position}: missing '}}'")]
    UnterminatedBrace { position: usize, text: String },

    #[error("Invalid token at position {position}: '{text}'")]
    InvalidToken { position: usize, text: String },
}

/// Result of substituting every variable reference in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub line: String,
    /// Referenced names with no value in the store, in order of appearance.
    /// Each was replaced by the empty string.
    pub unresolved: Vec<String>,
}

/// Replace every variable reference in `line` with its value.
///
/// All references see the same store. Unknown names expand to nothing and
/// are listed in [`Expansion::unresolved`] for the caller to report. The
/// only hard failure is an unterminated `${`.
pub fn substitute(line: &str, runtime: &Runtime) -> Result<Expansion, LexerError> {
    if !line.contains('$') {
        return Ok(Expansion {
            line: line.to_string(),
            unresolved: Vec::new(),
        });
    }

    let mut expanded = String::with_capacity(line.len());
    let mut unresolved = Vec::new();

    let mut lexer = Lexer::new(line);
    while let Some(fragment) = lexer.next() {
        match fragment? {
            Fragment::Text(text) => expanded.push_str(text),
            Fragment::Bare("") => expanded.push('$'),
            Fragment::Bare(name) | Fragment::Braced(name) => match runtime.get_variable(name) {
                Some(value) => expanded.push_str(value),
                None => unresolved.push(name.to_string()),
            },
            Fragment::Unterminated => {
                return Err(LexerError::UnterminatedBrace {
                    position: lexer.span().start,
                    text: lexer.slice().to_string(),
                })
            }
        }
    }

    tracing::trace!(input = line, output = %expanded, "substituted variables");

    Ok(Expansion {
        line: expanded,
        unresolved,
    })
}

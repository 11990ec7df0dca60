//! Lexer for path expressions using logos

use logos::Logos;

/// Token types for the supported XPath subset
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")] // Skip whitespace
pub enum PathToken<'src> {
    #[token("//")]
    DoubleSlash,
    #[token("/")]
    Slash,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("@")]
    At,
    #[token("|")]
    Pipe,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,

    // Element/attribute names, optionally prefixed (xi:include)
    #[regex(r"[A-Za-z_][A-Za-z0-9_.\-]*(:[A-Za-z_][A-Za-z0-9_.\-]*)?", |lex| lex.slice())]
    Name(&'src str),

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1] // Strip quotes
    })]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1] // Strip quotes
    })]
    SingleQuoted(&'src str),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),
}

/// A token with its byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken<'src> {
    pub token: PathToken<'src>,
    pub pos: usize,
}

/// Lex a path expression, failing on the first unrecognized character
pub fn lex(source: &str) -> Result<Vec<SpannedToken<'_>>, usize> {
    PathToken::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok(SpannedToken {
                token,
                pos: span.start,
            }),
            Err(_) => Err(span.start),
        })
        .collect()
}

use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;

/// Structural CSS tokens.
///
/// Everything that is not structure (identifiers, numbers, combinators,
/// hashes, `!important`, ...) lexes as a `Chunk`; selector and value text is
/// rebuilt from the chunks between structural tokens.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token<'src> {
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", |lex| { let s = lex.slice(); &s[2..s.len() - 2] })]
    Comment(&'src str),

    #[regex(r"@-?[a-zA-Z_][a-zA-Z0-9_-]*", |lex| &lex.slice()[1..])]
    AtKeyword(&'src str),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r#"[^ \t\n\r\f{}()\[\];:,"'@/]+"#, |lex| lex.slice())]
    Chunk(&'src str),

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token("/")]
    Slash,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment(_) => write!(f, "comment"),
            Token::AtKeyword(name) => write!(f, "at-rule '@{}'", name),
            Token::String(s) => write!(f, "string {}", s),
            Token::Chunk(s) => write!(f, "'{}'", s),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Colon => write!(f, "':'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Comma => write!(f, "','"),
            Token::Slash => write!(f, "'/'"),
        }
    }
}

/// Tokenize a source string
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, std::ops::Range<usize>)>> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(ParseError::lex_error(span)),
        })
        .collect()
}

//! Logos-based lexer for Kypher
//!
//! Fast tokenization using the logos crate.

use logos::Logos;

use crate::base::Span;

/// A token with its kind, text, and position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    /// True if this token is an identifier spelling `keyword`
    /// (keywords are case-insensitive and not reserved).
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = match self.inner.next()? {
            Ok(k) => k,
            Err(()) => TokenKind::Error,
        };
        let range = self.inner.span();
        Some(Token {
            kind,
            text: self.inner.slice(),
            span: Span::new(range.start as u32, range.end as u32),
        })
    }
}

/// Tokenize an entire string, dropping whitespace
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input)
        .filter(|t| t.kind != TokenKind::Whitespace)
        .collect()
}

/// Logos token enum for the Kypher dialect
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    /// Backquoted identifier, for column names like `node1;salary`
    #[regex(r"`[^`]*`")]
    QuotedIdent,

    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
    Parameter,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|\.[0-9]+([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleQuotedString,

    #[regex(r"'([^'\\]|\\.)*'")]
    SingleQuotedString,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("->")]
    ArrowRight,

    #[token("<-")]
    ArrowLeft,

    #[token("<=")]
    LtEq,

    #[token(">=")]
    GtEq,

    #[token("<>")]
    LtGt,

    #[token("!=")]
    BangEq,

    #[token("=~")]
    EqTilde,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("|")]
    Pipe,

    #[token("-")]
    Minus,

    #[token("+")]
    Plus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("=")]
    Eq,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    /// Catch-all for characters no other rule matches
    #[regex(r".", priority = 0)]
    Error,
}

impl TokenKind {
    /// Human-readable name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Ident => "identifier",
            Self::QuotedIdent => "quoted identifier",
            Self::Parameter => "parameter",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::DoubleQuotedString | Self::SingleQuotedString => "string",
            Self::ArrowRight => "'->'",
            Self::ArrowLeft => "'<-'",
            Self::LtEq => "'<='",
            Self::GtEq => "'>='",
            Self::LtGt => "'<>'",
            Self::BangEq => "'!='",
            Self::EqTilde => "'=~'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::Pipe => "'|'",
            Self::Minus => "'-'",
            Self::Plus => "'+'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Eq => "'='",
            Self::Lt => "'<'",
            Self::Gt => "'>'",
            Self::Error => "error",
        }
    }
}

use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;

/// Token types for directive expressions
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    // Keywords
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    #[token("undefined")]
    Undefined,

    #[token("typeof")]
    Typeof,

    // Identifiers (`$event`, `$el` and `$refs` are ordinary identifiers)
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice())]
    Ident(&'src str),

    // String literals (quotes kept, unescaped by the parser)
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice())]
    String(&'src str),

    // Template literals (backticks kept)
    #[regex(r"`([^`\\]|\\.)*`", |lex| lex.slice())]
    Template(&'src str),

    // Numbers
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Symbols
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

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("?.")]
    OptionalDot,

    #[token(";")]
    Semicolon,

    #[token(":")]
    Colon,

    #[token("?")]
    Question,

    #[token("??")]
    QuestionQuestion,

    #[token("=>")]
    Arrow,

    // Assignment
    #[token("=")]
    Equals,

    #[token("+=")]
    PlusEquals,

    #[token("-=")]
    MinusEquals,

    #[token("*=")]
    StarEquals,

    #[token("/=")]
    SlashEquals,

    // Comparison
    #[token("==")]
    EqualsEquals,

    #[token("!=")]
    NotEquals,

    #[token("===")]
    StrictEquals,

    #[token("!==")]
    StrictNotEquals,

    #[token("<")]
    LAngle,

    #[token(">")]
    RAngle,

    #[token("<=")]
    LessThanEquals,

    #[token(">=")]
    GreaterThanEquals,

    // Logical
    #[token("&&")]
    And,

    #[token("||")]
    Or,

    #[token("!")]
    Bang,

    // Arithmetic
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("++")]
    PlusPlus,

    #[token("--")]
    MinusMinus,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Undefined => write!(f, "undefined"),
            Token::Typeof => write!(f, "typeof"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string {}", s),
            Token::Template(s) => write!(f, "template {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::OptionalDot => write!(f, "?."),
            Token::Semicolon => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::QuestionQuestion => write!(f, "??"),
            Token::Arrow => write!(f, "=>"),
            Token::Equals => write!(f, "="),
            Token::PlusEquals => write!(f, "+="),
            Token::MinusEquals => write!(f, "-="),
            Token::StarEquals => write!(f, "*="),
            Token::SlashEquals => write!(f, "/="),
            Token::EqualsEquals => write!(f, "=="),
            Token::NotEquals => write!(f, "!="),
            Token::StrictEquals => write!(f, "==="),
            Token::StrictNotEquals => write!(f, "!=="),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::LessThanEquals => write!(f, "<="),
            Token::GreaterThanEquals => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
        }
    }
}

/// Tokenize an expression source string.
///
/// Unlike a lenient scan, an unrecognised character is a hard error: a directive
/// expression that does not lex can never evaluate.
pub fn tokenize(source: &str) -> ParseResult<Vec<(Token<'_>, std::ops::Range<usize>)>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(ParseError::lexer_error(span)),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source)
            .expect("tokenize failed")
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("true falsey null $event _x typeof");
        assert_eq!(tokens[0], Token::True);
        assert_eq!(tokens[1], Token::Ident("falsey"));
        assert_eq!(tokens[2], Token::Null);
        assert_eq!(tokens[3], Token::Ident("$event"));
        assert_eq!(tokens[4], Token::Ident("_x"));
        assert_eq!(tokens[5], Token::Typeof);
    }

    #[test]
    fn test_operators_take_longest_match() {
        let tokens = kinds("a === b !== c == d ?? e ?. f => g ++");
        assert_eq!(tokens[1], Token::StrictEquals);
        assert_eq!(tokens[3], Token::StrictNotEquals);
        assert_eq!(tokens[5], Token::EqualsEquals);
        assert_eq!(tokens[7], Token::QuestionQuestion);
        assert_eq!(tokens[9], Token::OptionalDot);
        assert_eq!(tokens[11], Token::Arrow);
        assert_eq!(tokens[13], Token::PlusPlus);
    }

    #[test]
    fn test_strings_numbers_templates() {
        let tokens = kinds(r#""a \"b\"" 'c' `d ${e}` 42 3.5 .5 1e3"#);
        assert!(matches!(tokens[0], Token::String(_)));
        assert!(matches!(tokens[1], Token::String("'c'")));
        assert!(matches!(tokens[2], Token::Template(_)));
        assert_eq!(tokens[3], Token::Number("42"));
        assert_eq!(tokens[4], Token::Number("3.5"));
        assert_eq!(tokens[5], Token::Number(".5"));
        assert_eq!(tokens[6], Token::Number("1e3"));
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let err = tokenize("a # b").unwrap_err();
        assert!(matches!(err, ParseError::LexerError { .. }));
    }
}

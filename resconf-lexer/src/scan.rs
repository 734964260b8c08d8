//! Splits source text into lexemes
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_a, is_not},
    character::complete::{anychar, char},
    combinator::{cut, map, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{preceded, terminated},
    IResult,
};

use crate::token::Token;

type Res<T, U> = IResult<T, U, VerboseError<T>>;

/// Characters that end an unquoted word
const WORD_END: &str = " \t\r\n{}=,;#\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lexeme {
    Token(Token),
    /// `@path`, naming a file (or a wildcard pattern) to include in place
    Include(String),
}

/// A lexing failure: the byte offset it occurred at and what went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanError {
    pub offset: usize,
    pub message: String,
}

/// Lexes a whole text into lexemes paired with their byte offsets
pub(crate) fn lexemes(text: &str) -> Result<Vec<(Lexeme, usize)>, ScanError> {
    let mut found = vec![];
    let mut rest = text;
    loop {
        if let Ok((after, _)) = blank(rest) {
            rest = after;
        }
        if rest.is_empty() {
            return Ok(found);
        }
        let offset = text.len() - rest.len();
        match lexeme(rest) {
            Ok((remaining, lexeme)) => {
                found.push((lexeme, offset));
                rest = remaining;
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                return Err(describe(text, offset, e));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(ScanError {
                    offset,
                    message: "Unexpected end of input".to_owned(),
                })
            }
        }
    }
}

fn describe(text: &str, offset: usize, e: VerboseError<&str>) -> ScanError {
    // The innermost context names what was being read
    for (remaining, kind) in &e.errors {
        if let VerboseErrorKind::Context(what) = kind {
            return ScanError {
                offset: text.len() - remaining.len(),
                message: format!("Expected {what}"),
            };
        }
    }
    ScanError {
        offset,
        message: format!(
            "Unexpected character {:?}",
            text[offset..].chars().next().unwrap_or_default()
        ),
    }
}

/// Spaces, tabs, carriage returns and `#` comments
fn blank(input: &str) -> Res<&str, Vec<&str>> {
    many0(alt((is_a(" \t\r"), comment)))(input)
}

fn comment(input: &str) -> Res<&str, &str> {
    recognize(preceded(char('#'), opt(is_not("\n"))))(input)
}

fn lexeme(input: &str) -> Res<&str, Lexeme> {
    alt((
        map(punctuation, Lexeme::Token),
        map(quoted, |s| Lexeme::Token(Token::QuotedString(s))),
        map(include, |path| Lexeme::Include(path.to_owned())),
        map(word, |w| Lexeme::Token(classify(w))),
    ))(input)
}

fn punctuation(input: &str) -> Res<&str, Token> {
    alt((
        value(Token::EndOfLine, alt((char('\n'), char(';')))),
        value(Token::BeginBlock, char('{')),
        value(Token::EndBlock, char('}')),
        value(Token::Equals, char('=')),
        value(Token::Comma, char(',')),
        value(Token::Utf8Bom, char('\u{feff}')),
    ))(input)
}

/// A `"…"` string in which a backslash takes the next character literally
fn quoted(input: &str) -> Res<&str, String> {
    preceded(
        char('"'),
        cut(terminated(
            map(opt(escaped_transform(is_not("\\\""), '\\', anychar)), |s| {
                s.unwrap_or_default()
            }),
            context("a closing quote", char('"')),
        )),
    )(input)
}

fn include(input: &str) -> Res<&str, &str> {
    preceded(
        char('@'),
        cut(context("a file name to include", is_not(" \t\r\n;#"))),
    )(input)
}

fn word(input: &str) -> Res<&str, &str> {
    is_not(WORD_END)(input)
}

fn classify(word: &str) -> Token {
    let mut chars = word.chars();
    if word.bytes().all(|b| b.is_ascii_digit()) {
        Token::Number(word.to_owned())
    } else if chars.next().map_or(false, |c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Token::Identifier(word.to_owned())
    } else {
        Token::UnquotedString(word.to_owned())
    }
}

#[cfg(test)]
fn tokens(text: &str) -> Vec<Token> {
    lexemes(text)
        .unwrap()
        .into_iter()
        .filter_map(|(lexeme, _)| match lexeme {
            Lexeme::Token(token) => Some(token),
            Lexeme::Include(_) => None,
        })
        .collect()
}

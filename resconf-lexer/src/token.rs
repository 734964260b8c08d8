use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word starting with a letter and made of letters, digits and underscores
    Identifier(String),
    /// Any other unquoted word, such as `/etc/bareos` or `23:45`
    UnquotedString(String),
    /// The unescaped content of a `"…"` string
    QuotedString(String),
    /// A word made only of digits
    Number(String),
    Equals,
    BeginBlock,
    EndBlock,
    Comma,
    /// A line break or `;`
    EndOfLine,
    EndOfFile,
    Utf8Bom,
    Utf16Bom,
}

impl Token {
    /// The text of an identifier, string or number
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Identifier(s)
            | Token::UnquotedString(s)
            | Token::QuotedString(s)
            | Token::Number(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, Token::QuotedString(_))
    }

    /// Whether the token ends a directive: end of line, end of block or end of file
    pub fn ends_directive(&self) -> bool {
        matches!(self, Token::EndOfLine | Token::EndBlock | Token::EndOfFile)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Identifier(s) | Token::UnquotedString(s) | Token::Number(s) => f.write_str(s),
            Token::QuotedString(s) => write!(f, "{s:?}"),
            Token::Equals => f.write_str("="),
            Token::BeginBlock => f.write_str("{"),
            Token::EndBlock => f.write_str("}"),
            Token::Comma => f.write_str(","),
            Token::EndOfLine => f.write_str("end of line"),
            Token::EndOfFile => f.write_str("end of file"),
            Token::Utf8Bom => f.write_str("UTF-8 byte order mark"),
            Token::Utf16Bom => f.write_str("UTF-16 byte order mark"),
        }
    }
}

/// Where a token starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// Index of the source file within its token stream
    pub source: usize,
    /// One based
    pub line: usize,
    /// Zero based, in bytes
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub location: Location,
}

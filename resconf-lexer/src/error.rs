use std::fmt::Display;

use camino::{Utf8Path, Utf8PathBuf};

/// A fatal error, located in a source file
///
/// Errors raised inside an included file chain to a note at the include site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    error: String,
    file: Utf8PathBuf,
    /// One based; zero when the error concerns the file as a whole
    line: usize,
    column: usize,
    text: String,
    next: Option<Box<ParseError>>,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error: {}", self.error)?;
        if self.line == 0 {
            writeln!(f, "  --> {}", self.file)?;
        } else {
            writeln!(f, "  --> {}:{}", self.file, self.line)?;
            writeln!(f, "     |")?;
            writeln!(f, "{:4} | {}", self.line, self.text)?;
            if self.column == 0 {
                writeln!(f, "     |")?;
            } else {
                writeln!(f, "     | {0:1$}^", "", self.column)?;
            }
        }
        if let Some(next) = &self.next {
            write!(f, "{}", next)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    pub fn new(
        error: String,
        file: impl Into<Utf8PathBuf>,
        line: usize,
        column: usize,
        text: impl Into<String>,
        next: Option<Box<ParseError>>,
    ) -> ParseError {
        ParseError {
            error,
            file: file.into(),
            line,
            column,
            text: text.into(),
            next,
        }
    }

    /// An error about a file as a whole, such as one that cannot be read
    pub fn in_file(error: String, file: impl Into<Utf8PathBuf>) -> ParseError {
        ParseError::new(error, file, 0, 0, "", None)
    }

    pub fn message(&self) -> &str {
        &self.error
    }

    pub fn file(&self) -> &Utf8Path {
        &self.file
    }

    pub fn line_number(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn next(&self) -> Option<&ParseError> {
        self.next.as_deref()
    }
}

impl<'a> IntoIterator for &'a ParseError {
    type Item = &'a ParseError;
    type IntoIter = ParseErrorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        ParseErrorIter { next: Some(self) }
    }
}

pub struct ParseErrorIter<'a> {
    next: Option<&'a ParseError>,
}

impl<'a> Iterator for ParseErrorIter<'a> {
    type Item = &'a ParseError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_caret_under_column() {
        let error = ParseError::new(
            "expected an equals, got: Default".to_owned(),
            "bareos-dir.conf",
            3,
            7,
            "  Pool Default",
            None,
        );
        assert_eq!(
            error.to_string(),
            "Error: expected an equals, got: Default\n  --> bareos-dir.conf:3\n     |\n   3 |   Pool Default\n     |        ^\n"
        );
    }

    #[test]
    fn chained_errors_iterate_in_order() {
        let site = ParseError::new("included from here".into(), "main.conf", 1, 0, "@x", None);
        let error = ParseError::in_file("no such file".into(), "x");
        let error = ParseError {
            next: Some(Box::new(site)),
            ..error
        };
        let messages: Vec<_> = error.into_iter().map(|e| e.message()).collect();
        assert_eq!(messages, ["no such file", "included from here"]);
        assert!(error.to_string().starts_with("Error: no such file\n  --> x\nError: included"));
    }
}

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::{
    error::ParseError,
    scan::{lexemes, Lexeme},
    token::{Location, Spanned, Token},
};

/// How deeply `@` includes may nest
const MAX_INCLUDE_DEPTH: usize = 32;

/// One file (or in-memory text) contributing tokens to a stream
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: Utf8PathBuf,
    text: String,
    included_from: Option<Location>,
}

impl SourceFile {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The text of a one based line number
    pub fn line(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|index| self.text.lines().nth(index))
            .unwrap_or("")
    }
}

/// A fully lexed sequence of tokens, ending in [`Token::EndOfFile`]
///
/// Included files are lexed in place, so the stream reads as one text. Reading past the end
/// keeps returning end of file.
#[derive(Debug, Clone)]
pub struct TokenStream {
    sources: Vec<SourceFile>,
    tokens: Vec<Spanned>,
    position: usize,
    /// Where the most recently read token starts
    current: Location,
}

impl TokenStream {
    /// Lexes a file and everything it includes
    pub fn from_file(path: impl AsRef<Utf8Path>) -> Result<TokenStream, ParseError> {
        Self::from_files([path.as_ref()])
    }

    /// Lexes several files, one after the other, as a single stream
    pub fn from_files<'a>(
        paths: impl IntoIterator<Item = &'a Utf8Path>,
    ) -> Result<TokenStream, ParseError> {
        let mut builder = Builder::default();
        for path in paths {
            builder.add_file(path, None, 0)?;
        }
        Ok(builder.finish())
    }

    /// Lexes text held in memory; `name` is used in messages and to resolve relative includes
    pub fn from_text(
        name: impl Into<Utf8PathBuf>,
        text: impl Into<String>,
    ) -> Result<TokenStream, ParseError> {
        let mut builder = Builder::default();
        builder.add_text(name.into(), text.into(), None, 0)?;
        Ok(builder.finish())
    }

    /// Reads the next token
    pub fn next_token(&mut self) -> Spanned {
        let last = self.tokens.len() - 1;
        let spanned = self.tokens[self.position.min(last)].clone();
        if self.position < last {
            self.position += 1;
        }
        self.current = spanned.location;
        tracing::trace!(token = %spanned.token, line = spanned.location.line, "Token");
        spanned
    }

    /// The token the next call to [`next_token`](Self::next_token) returns
    pub fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// The token `n` places ahead of the next one
    pub fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.position + n).min(last)].token
    }

    pub fn current_location(&self) -> Location {
        self.current
    }

    pub fn current_line_number(&self) -> usize {
        self.current.line
    }

    pub fn current_file_name(&self) -> &Utf8Path {
        self.sources[self.current.source].path()
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// An error located at the most recently read token
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.current, message)
    }

    /// An error located at the given token position, noting any include sites above it
    pub fn error_at(&self, location: Location, message: impl Into<String>) -> ParseError {
        located_error(&self.sources, location, message.into())
    }
}

fn located_error(sources: &[SourceFile], location: Location, message: String) -> ParseError {
    let Some(source) = sources.get(location.source) else {
        return ParseError::new(message, "<unknown>", 0, 0, "", None);
    };
    let next = source.included_from.map(|site| {
        Box::new(located_error(
            sources,
            site,
            "In file included from here".to_owned(),
        ))
    });
    ParseError::new(
        message,
        source.path.clone(),
        location.line,
        location.column,
        source.line(location.line),
        next,
    )
}

#[derive(Default)]
struct Builder {
    sources: Vec<SourceFile>,
    tokens: Vec<Spanned>,
}

impl Builder {
    fn add_file(
        &mut self,
        path: &Utf8Path,
        included_from: Option<Location>,
        depth: usize,
    ) -> Result<(), ParseError> {
        let fail = |builder: &Builder, message: String| match included_from {
            Some(site) => located_error(&builder.sources, site, message),
            None => ParseError::in_file(message, path),
        };
        if depth > MAX_INCLUDE_DEPTH {
            return Err(fail(
                self,
                format!("Too many nested includes (more than {MAX_INCLUDE_DEPTH}) at {path}"),
            ));
        }
        tracing::debug!("Reading {}", path);
        let bytes = std::fs::read(path)
            .map_err(|e| fail(self, format!("Cannot open config file \"{path}\": {e}")))?;
        if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
            let source = self.sources.len();
            self.sources.push(SourceFile {
                path: path.to_owned(),
                text: String::new(),
                included_from,
            });
            self.tokens.push(Spanned {
                token: Token::Utf16Bom,
                location: Location {
                    source,
                    line: 1,
                    column: 0,
                },
            });
            return Ok(());
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| fail(self, format!("Config file \"{path}\" is not valid UTF-8")))?;
        self.add_text(path.to_owned(), text, included_from, depth)
    }

    fn add_text(
        &mut self,
        path: Utf8PathBuf,
        text: String,
        included_from: Option<Location>,
        depth: usize,
    ) -> Result<(), ParseError> {
        let source = self.sources.len();
        let lines = LineIndex::new(&text);
        let found = lexemes(&text);
        self.sources.push(SourceFile {
            path,
            text,
            included_from,
        });
        let found = found.map_err(|e| {
            located_error(&self.sources, lines.locate(source, e.offset), e.message)
        })?;
        for (lexeme, offset) in found {
            let location = lines.locate(source, offset);
            match lexeme {
                Lexeme::Token(token) => self.tokens.push(Spanned { token, location }),
                Lexeme::Include(pattern) => {
                    let base = self.sources[source]
                        .path
                        .parent()
                        .map(Utf8Path::to_owned)
                        .unwrap_or_default();
                    let paths = expand_include(&base, &pattern)
                        .map_err(|message| located_error(&self.sources, location, message))?;
                    for path in paths {
                        self.add_file(&path, Some(location), depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> TokenStream {
        let end = match self.tokens.last() {
            Some(last) => last.location,
            None => Location {
                source: 0,
                line: 1,
                column: 0,
            },
        };
        self.tokens.push(Spanned {
            token: Token::EndOfFile,
            location: end,
        });
        if self.sources.is_empty() {
            self.sources.push(SourceFile {
                path: Utf8PathBuf::from("<empty>"),
                text: String::new(),
                included_from: None,
            });
        }
        TokenStream {
            sources: self.sources,
            tokens: self.tokens,
            position: 0,
            current: end,
        }
    }
}

/// Maps byte offsets to line and column
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    fn locate(&self, source: usize, offset: usize) -> Location {
        let line = self.starts.partition_point(|start| *start <= offset);
        Location {
            source,
            line,
            column: offset - self.starts[line - 1],
        }
    }
}

/// Resolves an include against the including file's directory, expanding `*` and `?` in the
/// final path component to the matching files, in name order
fn expand_include(base: &Utf8Path, pattern: &str) -> Result<Vec<Utf8PathBuf>, String> {
    let path = base.join(pattern);
    let Some(file_pattern) = path.file_name() else {
        return Ok(vec![path]);
    };
    if !file_pattern.contains(['*', '?']) {
        return Ok(vec![path]);
    }
    let directory = path.parent().unwrap_or(base);
    let mut expression = String::from("^");
    for c in file_pattern.chars() {
        match c {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            c => expression.push_str(&regex::escape(&c.to_string())),
        }
    }
    expression.push('$');
    let matcher = Regex::new(&expression).map_err(|e| format!("Bad include pattern {pattern}: {e}"))?;
    let entries = directory
        .read_dir_utf8()
        .map_err(|e| format!("Cannot read include directory \"{directory}\": {e}"))?;
    let mut paths = vec![];
    for entry in entries {
        let entry = entry.map_err(|e| format!("Cannot read include directory \"{directory}\": {e}"))?;
        if matcher.is_match(entry.file_name()) && entry.path().is_file() {
            paths.push(entry.path().to_owned());
        }
    }
    paths.sort();
    Ok(paths)
}

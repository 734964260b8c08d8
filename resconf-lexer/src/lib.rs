//! Turns configuration files into a stream of [Token]s.
//!
//! The whole input, including any files pulled in with `@path` (where `*` and `?` may appear
//! in the last component), is lexed up front. A [TokenStream] then hands out tokens one at a
//! time, each carrying the [Location] it came from, so the parser can build a [ParseError]
//! pointing at any token it has read.
//!
//! ```
//! use resconf_lexer::{Token, TokenStream};
//!
//! let mut stream = TokenStream::from_text("inline.conf", "Pool { Name = Default }")?;
//! assert_eq!(stream.next_token().token, Token::Identifier("Pool".into()));
//! assert_eq!(stream.peek(), &Token::BeginBlock);
//! # Ok::<(), resconf_lexer::ParseError>(())
//! ```
mod error;
mod scan;
mod stream;
mod token;

pub use error::{ParseError, ParseErrorIter};
pub use stream::{SourceFile, TokenStream};
pub use token::{Location, Spanned, Token};

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use indoc::indoc;

    use super::*;

    fn scratch(name: &str) -> Utf8PathBuf {
        let dir = std::env::temp_dir().join(format!("resconf-lexer-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Utf8PathBuf::from_path_buf(dir).unwrap()
    }

    fn words(stream: &mut TokenStream) -> Vec<String> {
        let mut words = vec![];
        loop {
            let spanned = stream.next_token();
            match spanned.token {
                Token::EndOfFile => return words,
                Token::EndOfLine => {}
                token => words.push(token.to_string()),
            }
        }
    }

    #[test]
    fn includes_expand_in_place() {
        let dir = scratch("includes");
        std::fs::create_dir(dir.join("conf.d")).unwrap();
        std::fs::write(dir.join("conf.d/b.conf"), "B\n").unwrap();
        std::fs::write(dir.join("conf.d/a.conf"), "A\n").unwrap();
        std::fs::write(dir.join("conf.d/skip.txt"), "X\n").unwrap();
        std::fs::write(dir.join("single.conf"), "S\n").unwrap();
        std::fs::write(
            dir.join("main.conf"),
            indoc!(
                "
                first
                @single.conf
                @conf.d/*.conf
                last
                "
            ),
        )
        .unwrap();

        let mut stream = TokenStream::from_file(dir.join("main.conf")).unwrap();
        assert_eq!(words(&mut stream), ["first", "S", "A", "B", "last"]);
        assert_eq!(stream.sources().len(), 4);
    }

    #[test]
    fn errors_in_included_files_note_the_include_site() {
        let dir = scratch("nested-error");
        std::fs::write(dir.join("bad.conf"), "Name = \"unterminated\n").unwrap();
        std::fs::write(dir.join("main.conf"), "Pool {\n  @bad.conf\n}\n").unwrap();

        let error = TokenStream::from_file(dir.join("main.conf")).unwrap_err();
        let chain: Vec<_> = error.into_iter().collect();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].message(), "Expected a closing quote");
        assert_eq!(chain[0].file(), dir.join("bad.conf"));
        assert_eq!(chain[1].message(), "In file included from here");
        assert_eq!(chain[1].line_number(), 2);
        assert_eq!(chain[1].column(), 2);
    }

    #[test]
    fn missing_include_is_reported_at_the_include() {
        let dir = scratch("missing");
        std::fs::write(dir.join("main.conf"), "\n@nothere.conf\n").unwrap();
        let error = TokenStream::from_file(dir.join("main.conf")).unwrap_err();
        assert!(error.message().starts_with("Cannot open config file"));
        assert_eq!(error.line_number(), 2);
    }

    #[test]
    fn utf16_files_yield_a_single_bom_token() {
        let dir = scratch("utf16");
        std::fs::write(dir.join("wide.conf"), [0xFF, 0xFE, b'P', 0, b'o', 0]).unwrap();
        let mut stream = TokenStream::from_file(dir.join("wide.conf")).unwrap();
        assert_eq!(stream.next_token().token, Token::Utf16Bom);
        assert_eq!(stream.next_token().token, Token::EndOfFile);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let dir = scratch("latin1");
        std::fs::write(dir.join("latin1.conf"), b"Name = caf\xe9\n").unwrap();
        let error = TokenStream::from_file(dir.join("latin1.conf")).unwrap_err();
        assert!(error.message().contains("not valid UTF-8"));
    }

    #[test]
    fn self_inclusion_stops_at_the_depth_limit() {
        let dir = scratch("recursive");
        std::fs::write(dir.join("loop.conf"), "@loop.conf\n").unwrap();
        let error = TokenStream::from_file(dir.join("loop.conf")).unwrap_err();
        assert!(error.message().starts_with("Too many nested includes"));
    }

    #[test]
    fn errors_point_at_the_current_token() {
        let mut stream = TokenStream::from_text(
            "inline.conf",
            indoc!(
                "
                Pool {
                  Name Default
                }
                "
            ),
        )
        .unwrap();
        while stream.peek() != &Token::Identifier("Default".into()) {
            stream.next_token();
        }
        stream.next_token();
        let error = stream.error("expected an equals, got: Default");
        assert_eq!(error.line_number(), 2);
        assert_eq!(error.column(), 7);
        assert_eq!(
            error.to_string(),
            indoc!(
                "
                Error: expected an equals, got: Default
                  --> inline.conf:2
                     |
                   2 |   Name Default
                     |        ^
                "
            )
            .trim_start()
        );
    }
}

//! The parser driver: reads resources from a token stream into a staging snapshot
//!
//! Each resource is parsed once. References to resources not yet committed are parked as
//! dependencies, and a resolve pass over the finished snapshot patches them in, so resources
//! may refer to each other in any order.
use anyhow::Result;
use resconf_lexer::{Location, ParseError, Token, TokenStream};
use resconf_schema::{find_field, BlockSchema, Record, Schema, Value, Warnings};

use crate::{
    defaults::apply_defaults,
    dependency::{Dependencies, Unresolved},
    registry::Snapshot,
    store::{self, Context},
};

/// The outcome of parsing one token stream
#[derive(Debug)]
pub(crate) struct Parsed {
    pub snapshot: Snapshot,
    /// References naming no resource of the parse
    pub unresolved: Vec<Unresolved>,
}

pub(crate) fn parse_tokens(
    schema: &'static Schema,
    tokens: &mut TokenStream,
    warnings: &mut Warnings,
) -> Result<Parsed> {
    let mut staging = Snapshot::new(schema);
    let mut dependencies = Dependencies::default();
    loop {
        let spanned = tokens.next_token();
        let rtype = match &spanned.token {
            Token::EndOfLine | Token::Utf8Bom => continue,
            Token::EndOfFile => break,
            Token::Utf16Bom => {
                return Err(tokens
                    .error("Currently we cannot handle UTF-16 source files. Please convert the conf file to UTF-8")
                    .into())
            }
            Token::Identifier(word) => match schema.find_type(word, warnings) {
                Some(rtype) => rtype,
                None => {
                    return Err(tokens
                        .error(format!("Expected a Resource name identifier, got: {word}"))
                        .into())
                }
            },
            other => {
                return Err(tokens
                    .error(format!("Expected a Resource name identifier, got: {other}"))
                    .into())
            }
        };
        tracing::trace!(rtype = rtype.name, line = spanned.location.line, "Resource");

        let id = staging.allocate_id(rtype.rcode);
        let mut resource = rtype.instantiate(id);
        apply_defaults(schema, rtype.rcode, resource.record_mut(), warnings)
            .map_err(|e| tokens.error_at(spanned.location, format!("{e:#}")))?;
        expect_begin(tokens)?;
        let mut cx = Context {
            schema,
            tokens: &mut *tokens,
            snapshot: &staging,
            dependencies: &mut dependencies,
            warnings: &mut *warnings,
            owner: id,
            path: vec![],
            single_token: false,
        };
        parse_block(&mut cx, resource.record_mut())?;

        let end = tokens.current_location();
        verify_required(tokens, end, resource.record(), rtype.name)?;
        staging
            .commit(resource)
            .map_err(|e| tokens.error_at(end, e.to_string()))?;
    }

    let unresolved = dependencies.resolve(&mut staging);
    for missing in &unresolved {
        tracing::debug!("Unresolved reference: {}", missing);
    }
    Ok(Parsed {
        snapshot: staging,
        unresolved,
    })
}

/// Skips blank lines up to the `{` opening a resource or block
fn expect_begin(tokens: &mut TokenStream) -> Result<(), ParseError> {
    loop {
        let spanned = tokens.next_token();
        match spanned.token {
            Token::BeginBlock => return Ok(()),
            Token::EndOfLine => continue,
            other => return Err(tokens.error(format!("Expected a block begin {{, got: {other}"))),
        }
    }
}

/// Reads directives into `record` up to and including the closing `}`
pub(crate) fn parse_block(cx: &mut Context<'_>, record: &mut Record) -> Result<(), ParseError> {
    loop {
        let spanned = cx.tokens.next_token();
        match spanned.token {
            Token::EndOfLine => continue,
            Token::EndBlock => return Ok(()),
            Token::EndOfFile => {
                return Err(cx
                    .tokens
                    .error("End of conf file reached with unclosed resource."))
            }
            Token::Identifier(first) => directive(cx, record, first, spanned.location)?,
            other => {
                return Err(cx
                    .tokens
                    .error(format!("Expected a keyword identifier, got: {other}")))
            }
        }
    }
}

/// Reads one `Keyword = value` directive, the keyword starting with `first`
fn directive(
    cx: &mut Context<'_>,
    record: &mut Record,
    first: String,
    location: Location,
) -> Result<(), ParseError> {
    let mut words = vec![first];
    while let Token::Identifier(word) = cx.tokens.peek_nth(words.len() - 1) {
        words.push(word.clone());
    }
    // Keywords may span several words; take the longest that names a field
    let found = (1..=words.len()).rev().find_map(|count| {
        find_field(record.fields(), &words[..count].join(" "), cx.warnings)
            .map(|(index, field)| (count, index, field))
    });
    let Some((count, index, field)) = found else {
        return Err(cx.error_at(
            location,
            format!(
                "Keyword \"{}\" not permitted in this resource.\nPerhaps you left the trailing brace off of the previous resource.",
                words[0]
            ),
        ));
    };
    for _ in 1..count {
        cx.tokens.next_token();
    }
    if field.is_deprecated() {
        let file = cx.tokens.current_file_name().to_owned();
        cx.warnings.add(format!(
            "using deprecated keyword {} on line {} of file {}",
            field.name, location.line, file
        ));
    }
    if field.expects_equals() {
        let spanned = cx.tokens.next_token();
        if spanned.token != Token::Equals {
            return Err(cx
                .tokens
                .error(format!("expected an equals, got: {}", spanned.token)));
        }
    }

    store::store(cx, record, index)?;

    match cx.tokens.peek() {
        Token::EndOfLine => {
            cx.tokens.next_token();
            Ok(())
        }
        Token::EndBlock | Token::EndOfFile => Ok(()),
        _ => {
            let spanned = cx.tokens.next_token();
            Err(cx
                .tokens
                .error(format!("expected an end of line, got: {}", spanned.token)))
        }
    }
}

/// Stores one nested block, such as an `Include` section of a file set
pub(crate) fn store_block(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
    block: &'static BlockSchema,
) -> Result<(), ParseError> {
    expect_begin(cx.tokens)?;
    let start = cx.tokens.current_location();
    let mut nested = Record::new(block.fields);
    apply_defaults(cx.schema, cx.owner.rcode, &mut nested, cx.warnings)
        .map_err(|e| cx.error_at(start, format!("{e:#}")))?;
    let entry = match record.value(index) {
        Value::Blocks(blocks) => blocks.len(),
        _ => 0,
    };
    cx.nested(index, entry, |cx| parse_block(cx, &mut nested))?;
    let end = cx.tokens.current_location();
    verify_required(cx.tokens, end, &nested, block.name)?;
    match record.value_mut(index) {
        Value::Blocks(blocks) => blocks.push(nested),
        value => *value = Value::Blocks(vec![nested]),
    }
    Ok(())
}

/// Checks every required field was given a directive
fn verify_required(
    tokens: &TokenStream,
    location: Location,
    record: &Record,
    owner: &str,
) -> Result<(), ParseError> {
    for (index, field) in record.fields().iter().enumerate() {
        if field.is_required() && !record.is_present(index) {
            return Err(tokens.error_at(
                location,
                format!(
                    "{} item is required in {} resource, but not found.",
                    field.name, owner
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use resconf_schema::{FileCompare, Warnings};

    use crate::tests::{parse, parse_one, parse_with_warnings, FILESET, JOB, POOL, SCHEMA};

    #[test]
    fn forward_and_backward_references_resolve() -> anyhow::Result<()> {
        for text in [
            "Pool { Name = Default }\nJob { Name = Backup1; Pool = Default }\n",
            "Job { Name = Backup1; Pool = Default }\nPool { Name = Default }\n",
        ] {
            let snapshot = parse(text)?;
            let job = snapshot.find_by_name(JOB, "Backup1").unwrap();
            let pool = snapshot.find_by_name(POOL, "Default").unwrap();
            let reference = job.get_reference("Pool").unwrap();
            assert_eq!(reference.target, Some(pool.id()));
            assert_eq!(snapshot.resolve(reference).and_then(|r| r.name()), Some("Default"));
        }
        Ok(())
    }

    #[test]
    fn multi_word_keywords_and_aliases() -> anyhow::Result<()> {
        let (snapshot, warnings) = parse_with_warnings(indoc::indoc!(
            "
            Pool {
              Name = Default
              Maximum Volume Jobs = 10
              MaximumVolumes = 100
              Volume Retention = 30 days
              MaxVolBytes = 10 GB
            }
            "
        ))?;
        let pool = snapshot.find_by_name(POOL, "Default").unwrap();
        assert_eq!(pool.get_int("Maximum Volume Jobs"), Some(10));
        assert_eq!(pool.get_int("Maximum Volumes"), Some(100));
        assert_eq!(pool.get_duration("Volume Retention"), Some(30 * 86400));
        assert_eq!(pool.get_size("Maximum Volume Bytes"), Some(10_000_000_000));
        assert_eq!(
            warnings.as_slice(),
            ["Found directive alias usage \"MaxVolBytes\" in configuration which is discouraged, consider using \"Maximum Volume Bytes\" instead"]
        );
        Ok(())
    }

    #[test]
    fn deprecated_keywords_warn_with_location() -> anyhow::Result<()> {
        let (_, warnings) =
            parse_with_warnings("Pool {\n  Name = Default\n  Use Volume Once = yes\n}\n")?;
        assert_eq!(
            warnings.as_slice(),
            ["using deprecated keyword Use Volume Once on line 3 of file test.conf"]
        );
        Ok(())
    }

    #[test]
    fn unknown_type_and_keyword_are_fatal() {
        let error = parse("Pools { Name = x }\n").unwrap_err();
        assert!(
            error.to_string().contains("Expected a Resource name identifier, got: Pools"),
            "{error}"
        );
        let error = parse("Pool {\n  Name = x\n  Colour = red\n}\n").unwrap_err();
        assert!(
            error
                .to_string()
                .contains("Keyword \"Colour\" not permitted in this resource."),
            "{error}"
        );
    }

    #[test]
    fn syntax_errors_are_located() {
        let error = parse("Pool {\n  Name = x\n  Maximum Volumes 5\n}\n").unwrap_err();
        let error = error.downcast::<resconf_lexer::ParseError>().unwrap();
        assert_eq!(error.message(), "expected an equals, got: 5");
        assert_eq!(error.line_number(), 3);

        let error = parse("Pool {\n  Name = x\n").unwrap_err();
        assert!(
            error
                .to_string()
                .contains("End of conf file reached with unclosed resource."),
            "{error}"
        );
        let error = parse("Pool = { Name = x }\n").unwrap_err();
        assert!(error.to_string().contains("Expected a block begin {, got: ="), "{error}");
        let error = parse("Pool {\n  Name = x y\n}\n").unwrap_err();
        assert!(error.to_string().contains("expected an end of line, got: y"), "{error}");
    }

    #[test]
    fn duplicate_names_and_missing_required_fields_are_fatal() {
        let error = parse("Pool { Name = a }\nPool { Name = a }\n").unwrap_err();
        assert!(
            error
                .to_string()
                .contains("Attempt to define second Pool resource named \"a\" is not permitted."),
            "{error}"
        );
        let error = parse("Pool {\n  Maximum Volumes = 3\n}\n").unwrap_err();
        assert!(
            error
                .to_string()
                .contains("Name item is required in Pool resource, but not found."),
            "{error}"
        );
        let error = parse("Pool { Name = a; Name = b }\n").unwrap_err();
        assert!(
            error.to_string().contains("Attempt to redefine name \"a\" to \"b\""),
            "{error}"
        );
    }

    #[test]
    fn nested_blocks_parse_recursively() -> anyhow::Result<()> {
        let fileset = parse_one(
            FILESET,
            indoc::indoc!(
                r#"
                FileSet {
                  Name = "Full Set"
                  Include {
                    Options {
                      Verify = pins5
                      Compression = gzip9
                    }
                    File = /etc
                  }
                  Include
                  {
                    File = /home
                  }
                }
                "#
            ),
        )?;
        let includes = fileset.get_blocks("Include").unwrap();
        assert_eq!(includes.len(), 2);
        let options = &includes[0].get_blocks("Options").unwrap()[0];
        assert_eq!(
            options.get_file_compare("Verify"),
            FileCompare::from_letters("pins5").ok()
        );
        assert_eq!(includes[1].get_list("File").unwrap(), ["/home"]);
        Ok(())
    }

    #[test]
    fn file_compare_store_replaces_flags() -> anyhow::Result<()> {
        let fileset = parse_one(
            FILESET,
            "FileSet {\n  Name = fs\n  Include {\n    Options {\n      Verify = ipu\n      Verify = s\n    }\n  }\n}\n",
        )?;
        let options = &fileset.get_blocks("Include").unwrap()[0].get_blocks("Options").unwrap()[0];
        assert_eq!(options.get_file_compare("Verify"), Some(FileCompare::SIZE));
        Ok(())
    }

    #[test]
    fn unresolved_references_are_reported_not_fatal() -> anyhow::Result<()> {
        let mut warnings = Warnings::default();
        let mut tokens = resconf_lexer::TokenStream::from_text(
            "test.conf",
            "Job {\n  Name = Backup1\n  Pool = Missing\n}\n",
        )?;
        let parsed = super::parse_tokens(&SCHEMA, &mut tokens, &mut warnings)?;
        assert_eq!(parsed.unresolved.len(), 1);
        assert_eq!(
            parsed.unresolved[0].to_string(),
            "Job \"Backup1\": Pool \"Missing\" not found"
        );
        let job = parsed.snapshot.find_by_name(JOB, "Backup1").unwrap();
        assert!(!job.get_reference("Pool").unwrap().is_resolved());
        Ok(())
    }

    #[test]
    fn byte_order_marks() {
        assert!(parse("\u{feff}Pool { Name = a }\n").is_ok());
    }
}

//! Parsers for the textual literals shared by directives and default values
//!
//! | Literal   | Form                                  | Example               |
//! |-----------|---------------------------------------|-----------------------|
//! | boolean   | `yes`, `true`, `no`, `false`          | `Yes`                 |
//! | duration  | one or more _number_ [_unit_] groups  | `1 day 12 hours`      |
//! | size      | _number_ [_unit_]                     | `10 GB`, `512k`       |
//! | path      | `~` and `$VAR` expanded               | `~/spool`             |
//!
//! Duration units are matched by prefix, in the order `n` (minutes), `seconds`, `months`,
//! `minutes`, `mins`, `hours`, `days`, `weeks`, `quarters`, `years`; so `m` means months and
//! `min` means minutes. Size units are `k`, `m`, `g`, `t` (powers of 1024) and `kb`, `mb`,
//! `gb`, `tb` (powers of 1000).
use anyhow::{anyhow, bail, Context as _, Result};
use md5::{Digest, Md5};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

const DURATION_UNITS: &[(&str, u64)] = &[
    ("n", MINUTE),
    ("seconds", 1),
    ("months", 30 * DAY),
    ("minutes", MINUTE),
    ("mins", MINUTE),
    ("hours", HOUR),
    ("days", DAY),
    ("weeks", 7 * DAY),
    ("quarters", 90 * DAY),
    ("years", 365 * DAY),
];

const SIZE_UNITS: &[(&str, u64)] = &[
    ("k", 1 << 10),
    ("kb", 1_000),
    ("m", 1 << 20),
    ("mb", 1_000_000),
    ("g", 1 << 30),
    ("gb", 1_000_000_000),
    ("t", 1 << 40),
    ("tb", 1_000_000_000_000),
];

/// The longest accepted resource name
pub const MAX_NAME_LENGTH: usize = 127;

pub fn parse_bool(text: &str) -> Result<bool> {
    match text.to_ascii_lowercase().as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        _ => bail!("Expect {}, got: {}", "YES, NO, TRUE, or FALSE", text),
    }
}

pub fn parse_int32(text: &str) -> Result<i64> {
    let value: i32 = text
        .trim()
        .parse()
        .with_context(|| format!("expected an integer number, got: {text}"))?;
    Ok(value.into())
}

pub fn parse_positive_int32(text: &str) -> Result<i64> {
    let value = parse_int32(text)?;
    if value < 0 {
        bail!("expected a positive integer number, got: {}", text);
    }
    Ok(value)
}

pub fn parse_int64(text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .with_context(|| format!("expected an integer number, got: {text}"))
}

/// Parses a duration into seconds
///
/// ```
/// use resconf_schema::literal::parse_duration;
///
/// assert_eq!(parse_duration("90")?, 90);
/// assert_eq!(parse_duration("1 day 2 hours")?, 26 * 3600);
/// assert_eq!(parse_duration("2m")?, 2 * 30 * 86400);
/// assert_eq!(parse_duration("5 min")?, 300);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn parse_duration(text: &str) -> Result<u64> {
    sum_groups(text, "time", |unit| {
        let unit = unit.to_ascii_lowercase();
        DURATION_UNITS
            .iter()
            .find(|(name, _)| name.starts_with(&unit))
            .map(|(_, multiplier)| *multiplier)
    })
}

/// Parses a size into bytes
pub fn parse_size(text: &str) -> Result<u64> {
    sum_groups(text, "size", |unit| {
        SIZE_UNITS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(unit))
            .map(|(_, multiplier)| *multiplier)
    })
}

pub fn parse_size32(text: &str) -> Result<u64> {
    let size = parse_size(text)?;
    if size > u32::MAX.into() {
        bail!("Size {} is too large, at most {} bytes allowed", text, u32::MAX);
    }
    Ok(size)
}

/// Sums `<number>[unit]` groups, where a missing unit multiplies by one
fn sum_groups(text: &str, what: &str, unit: impl Fn(&str) -> Option<u64>) -> Result<u64> {
    let mut rest = text.trim();
    if rest.is_empty() {
        bail!("expected a {} specification, got nothing", what);
    }
    let mut total = 0f64;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_end == 0 {
            bail!("expected a {} specification, got: {}", what, text);
        }
        let number: f64 = rest[..number_end]
            .parse()
            .with_context(|| format!("expected a {what} specification, got: {text}"))?;
        rest = rest[number_end..].trim_start();
        let unit_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let multiplier = match &rest[..unit_end] {
            "" => 1,
            name => unit(name)
                .ok_or_else(|| anyhow!("expected a {} specification, got: {}", what, text))?,
        };
        total += number * multiplier as f64;
        rest = rest[unit_end..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }
    if total > u64::MAX as f64 {
        bail!("{} specification {} is too large", what, text);
    }
    Ok(total as u64)
}

/// Renders seconds using the largest units that divide them, parseable by [`parse_duration`]
///
/// ```
/// use resconf_schema::literal::format_duration;
///
/// assert_eq!(format_duration(0), "0");
/// assert_eq!(format_duration(93784), "1 day 2 hours 3 mins 4 seconds");
/// ```
pub fn format_duration(seconds: u64) -> String {
    const UNITS: &[(&str, u64)] = &[
        ("year", 365 * DAY),
        ("month", 30 * DAY),
        ("week", 7 * DAY),
        ("day", DAY),
        ("hour", HOUR),
        ("min", MINUTE),
        ("second", 1),
    ];
    if seconds == 0 {
        return "0".to_owned();
    }
    let mut parts = vec![];
    let mut rest = seconds;
    for (name, size) in UNITS {
        let count = rest / size;
        if count > 0 {
            rest %= size;
            parts.push(format!("{count} {name}{}", if count == 1 { "" } else { "s" }));
        }
    }
    parts.join(" ")
}

/// Expands a leading `~` and `$VAR` or `${VAR}` references, unless the text is a `|` command
pub fn expand_path(text: &str) -> String {
    if text.starts_with('|') {
        return text.to_owned();
    }
    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;
    if rest == "~" || rest.starts_with("~/") {
        expanded.push_str(&std::env::var("HOME").unwrap_or_default());
        rest = &rest[1..];
    }
    while let Some(dollar) = rest.find('$') {
        expanded.push_str(&rest[..dollar]);
        rest = &rest[dollar + 1..];
        let (name, after) = if let Some(braced) = rest.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], &braced[end + 1..]),
                None => ("", rest),
            }
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };
        if name.is_empty() {
            expanded.push('$');
        } else {
            expanded.push_str(&std::env::var(name).unwrap_or_default());
        }
        rest = after;
    }
    expanded.push_str(rest);
    expanded
}

/// Checks a resource name uses only permitted characters
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Resource name cannot be empty");
    }
    if name.len() > MAX_NAME_LENGTH {
        bail!(
            "Name too long: {} characters, at most {} allowed",
            name.len(),
            MAX_NAME_LENGTH
        );
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || ":.-_/ ".contains(*c)))
    {
        bail!("Illegal character \"{}\" in name \"{}\"", c, name);
    }
    Ok(())
}

/// Lower case hex MD5 digest of a password
pub fn md5_hex(password: &str) -> String {
    format!("{:x}", Md5::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans() {
        assert!(parse_bool("Yes").unwrap());
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn integers() {
        assert_eq!(parse_int32("-5").unwrap(), -5);
        assert!(parse_positive_int32("-5").is_err());
        assert!(parse_int32("4294967296").is_err());
        assert_eq!(parse_int64("4294967296").unwrap(), 4294967296);
        assert!(parse_int64("ten").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("60 days").unwrap(), 60 * DAY);
        assert_eq!(parse_duration("1h30n").unwrap(), HOUR + 30 * MINUTE);
        assert_eq!(parse_duration("2 weeks, 1 day").unwrap(), 15 * DAY);
        assert_eq!(parse_duration("1 quarter").unwrap(), 90 * DAY);
        assert_eq!(parse_duration("1.5 hours").unwrap(), 90 * MINUTE);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("days").is_err());
        assert!(parse_duration("3 fortnights").is_err());
    }

    #[test]
    fn durations_render_back() {
        for seconds in [1, 59, 3600, 86400 * 45, 365 * DAY + 7] {
            assert_eq!(parse_duration(&format_duration(seconds)).unwrap(), seconds);
        }
    }

    #[test]
    fn sizes() {
        assert_eq!(parse_size("512").unwrap(), 512);
        assert_eq!(parse_size("10k").unwrap(), 10 * 1024);
        assert_eq!(parse_size("10 KB").unwrap(), 10_000);
        assert_eq!(parse_size("2 g").unwrap(), 2 << 30);
        assert_eq!(parse_size("1tb").unwrap(), 1_000_000_000_000);
        assert!(parse_size("10 qb").is_err());
        assert!(parse_size32("5g").is_err());
        assert_eq!(parse_size32("1g").unwrap(), 1 << 30);
    }

    #[test]
    fn paths() {
        std::env::set_var("RESCONF_TEST_DIR", "/srv/data");
        assert_eq!(expand_path("$RESCONF_TEST_DIR/spool"), "/srv/data/spool");
        assert_eq!(expand_path("${RESCONF_TEST_DIR}x"), "/srv/datax");
        assert_eq!(expand_path("|echo $RESCONF_TEST_DIR"), "|echo $RESCONF_TEST_DIR");
        assert_eq!(expand_path("/plain/path"), "/plain/path");
        assert_eq!(expand_path("cost: $"), "cost: $");
    }

    #[test]
    fn names() {
        assert!(validate_name("Backup-1 of: host.example/a_b").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("semi;colon").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn md5_digest() {
        assert_eq!(md5_hex("secret"), "5ebe2294ecd0e0f08eab7690d2a6ee69");
    }
}

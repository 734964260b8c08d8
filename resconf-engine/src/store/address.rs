use anyhow::{anyhow, Result};
use resconf_lexer::{Location, ParseError, Token};
use resconf_schema::{AddressFamily, HostAddress, Record, Value};

use super::Context;

pub(crate) fn parse_port(text: &str) -> Result<u16> {
    text.trim()
        .parse()
        .map_err(|_| anyhow!("expected a port number, got: {}", text))
}

/// Stores `{ ip = { addr = <host>; port = <n> } ... }`
///
/// The first directive replaces the default address; later ones add to it.
pub(super) fn store_addresses(
    cx: &mut Context<'_>,
    record: &mut Record,
    index: usize,
) -> Result<(), ParseError> {
    let default_port = match record.value(index) {
        Value::Addresses(addresses) => addresses.first().map_or(0, |a| a.port),
        _ => 0,
    };
    let mut parsed = vec![];
    expect_open(cx)?;
    loop {
        let spanned = cx.tokens.next_token();
        let family = match &spanned.token {
            Token::EndOfLine | Token::Comma => continue,
            Token::EndBlock => break,
            Token::Identifier(word) if word.eq_ignore_ascii_case("ip") => AddressFamily::Any,
            Token::Identifier(word) if word.eq_ignore_ascii_case("ipv4") => AddressFamily::Ipv4,
            Token::Identifier(word) if word.eq_ignore_ascii_case("ipv6") => AddressFamily::Ipv6,
            other => {
                return Err(cx
                    .tokens
                    .error(format!("Expected a string [ip|ipv4|ipv6], got: {other}")))
            }
        };
        expect_equals(cx)?;
        parsed.push(read_address(cx, family, default_port)?);
    }
    let first = !record.is_present(index);
    match record.value_mut(index) {
        Value::Addresses(addresses) if !first => addresses.extend(parsed),
        value => *value = Value::Addresses(parsed),
    }
    Ok(())
}

fn read_address(
    cx: &mut Context<'_>,
    family: AddressFamily,
    default_port: u16,
) -> Result<HostAddress, ParseError> {
    let mut address = HostAddress {
        family,
        host: match family {
            AddressFamily::Ipv6 => "::".to_owned(),
            _ => "0.0.0.0".to_owned(),
        },
        port: default_port,
    };
    expect_open(cx)?;
    loop {
        let spanned = cx.tokens.next_token();
        let key = match &spanned.token {
            Token::EndOfLine | Token::Comma => continue,
            Token::EndBlock => return Ok(address),
            Token::Identifier(key) => key.to_ascii_lowercase(),
            other => {
                return Err(cx
                    .tokens
                    .error(format!("Expected a string [addr|port], got: {other}")))
            }
        };
        expect_equals(cx)?;
        let (location, value) = cx.value_word()?;
        match key.as_str() {
            "addr" => address.host = value,
            "port" => address.port = parse_port(&value).map_err(|e| cx.error_at(location, e))?,
            _ => {
                return Err(cx.error_at(
                    spanned.location,
                    format!("Expected a string [addr|port], got: {key}"),
                ))
            }
        }
    }
}

/// Sets the host of every address in the sibling addresses field
pub(super) fn store_host(
    cx: &mut Context<'_>,
    record: &mut Record,
    sibling: &str,
) -> Result<(), ParseError> {
    let (location, host) = cx.value_word()?;
    let addresses = sibling_addresses(cx, record, sibling, location)?;
    for address in addresses {
        address.host = host.clone();
    }
    Ok(())
}

/// Sets the port of every address in the sibling addresses field
pub(super) fn store_port(
    cx: &mut Context<'_>,
    record: &mut Record,
    sibling: &str,
) -> Result<(), ParseError> {
    let (location, text) = cx.value_word()?;
    let port = parse_port(&text).map_err(|e| cx.error_at(location, e))?;
    let addresses = sibling_addresses(cx, record, sibling, location)?;
    for address in addresses {
        address.port = port;
    }
    Ok(())
}

/// The sibling's addresses, holding at least one entry
fn sibling_addresses<'r>(
    cx: &Context<'_>,
    record: &'r mut Record,
    sibling: &str,
    location: Location,
) -> Result<&'r mut Vec<HostAddress>, ParseError> {
    let index = record
        .index_of(sibling)
        .ok_or_else(|| cx.error_at(location, format!("No addresses field named {sibling}")))?;
    let value = record.value_mut(index);
    if !matches!(value, Value::Addresses(_)) {
        *value = Value::Addresses(vec![]);
    }
    match value {
        Value::Addresses(addresses) => {
            if addresses.is_empty() {
                addresses.push(HostAddress::any(0));
            }
            Ok(addresses)
        }
        _ => Err(cx.error_at(location, format!("{sibling} does not hold addresses"))),
    }
}

fn expect_open(cx: &mut Context<'_>) -> Result<(), ParseError> {
    loop {
        let spanned = cx.tokens.next_token();
        match spanned.token {
            Token::BeginBlock => return Ok(()),
            Token::EndOfLine => continue,
            other => {
                return Err(cx
                    .tokens
                    .error(format!("Expected a block begin {{, got: {other}")))
            }
        }
    }
}

fn expect_equals(cx: &mut Context<'_>) -> Result<(), ParseError> {
    let spanned = cx.tokens.next_token();
    match spanned.token {
        Token::Equals => Ok(()),
        other => Err(cx.tokens.error(format!("expected an equals, got: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use resconf_schema::{AddressFamily, HostAddress};

    use crate::tests::{parse_one, DIRECTOR};

    #[test]
    fn default_listens_everywhere_on_default_port() {
        let director = parse_one(DIRECTOR, "Director { Name = dir; Password = p }\n").unwrap();
        assert_eq!(director.get_addresses("Addresses").unwrap(), [HostAddress::any(9101)]);
    }

    #[test]
    fn address_blocks_replace_the_default() {
        let director = parse_one(
            DIRECTOR,
            indoc::indoc!(
                "
                Director {
                  Name = dir
                  Password = p
                  Addresses = {
                    ip = { addr = 10.0.0.1; port = 9201 }
                    ipv6 = {
                      addr = ::1
                    }
                  }
                }
                "
            ),
        )
        .unwrap();
        assert_eq!(
            director.get_addresses("Addresses").unwrap(),
            [
                HostAddress {
                    family: AddressFamily::Any,
                    host: "10.0.0.1".into(),
                    port: 9201
                },
                HostAddress {
                    family: AddressFamily::Ipv6,
                    host: "::1".into(),
                    port: 9101
                },
            ]
        );
    }

    #[test]
    fn port_and_address_update_the_sibling() {
        let director = parse_one(
            DIRECTOR,
            "Director {\n  Name = dir; Password = p\n  Port = 19101\n  Address = backup.example\n}\n",
        )
        .unwrap();
        let addresses = director.get_addresses("Addresses").unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].host, "backup.example");
        assert_eq!(addresses[0].port, 19101);
    }

    #[test]
    fn bad_family_and_port_are_fatal() {
        let error = parse_one(
            DIRECTOR,
            "Director {\n  Name = dir\n  Addresses = { ipx = { addr = a } }\n}\n",
        )
        .unwrap_err();
        assert!(error.to_string().contains("Expected a string [ip|ipv4|ipv6], got: ipx"));
        let error = parse_one(DIRECTOR, "Director {\n  Name = dir\n  Port = http\n}\n").unwrap_err();
        assert!(error.to_string().contains("expected a port number, got: http"));
    }
}

// Parser for name-addr / addr-spec header values (RFC 3261 Section 20.10)
// name-addr      =  [ display-name ] LAQUOT addr-spec RAQUOT
// addr-spec      =  SIP-URI / SIPS-URI / absoluteURI
// display-name   =  *(token LWS)/ quoted-string

use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_while, take_while1},
    character::complete::{char, space0},
    combinator::{all_consuming, map, opt, verify},
    sequence::{delimited, pair, terminated, tuple},
};

use super::param::{quoted_string, semi_params};
use super::ParseResult;
use crate::error::{Error, Result};
use crate::types::address::NameAddr;

fn has_scheme(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
                && !rest.is_empty()
        }
        None => false,
    }
}

fn unescape_quoted(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn display_name(input: &str) -> ParseResult<Option<String>> {
    alt((
        map(terminated(quoted_string, space0), |q| Some(unescape_quoted(q))),
        map(take_while(|c: char| c != '<' && c != '"'), |tokens: &str| {
            let trimmed = tokens.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }),
    ))(input)
}

fn laquot_uri(input: &str) -> ParseResult<&str> {
    verify(
        delimited(char('<'), map(take_till1(|c| c == '>'), str::trim), char('>')),
        has_scheme,
    )(input)
}

fn name_addr(input: &str) -> ParseResult<NameAddr> {
    map(
        tuple((display_name, laquot_uri, semi_params)),
        |(display_name, uri, params)| NameAddr {
            display_name,
            uri: uri.to_string(),
            params,
        },
    )(input)
}

// Without angle brackets every `;param` belongs to the header, not the URI
fn addr_spec(input: &str) -> ParseResult<NameAddr> {
    map(
        pair(
            verify(
                take_while1(|c: char| c != ';' && c != ',' && !c.is_whitespace()),
                has_scheme,
            ),
            semi_params,
        ),
        |(uri, params): (&str, _)| NameAddr {
            display_name: None,
            uri: uri.to_string(),
            params,
        },
    )(input)
}

pub(crate) fn address(input: &str) -> ParseResult<NameAddr> {
    alt((name_addr, addr_spec))(input)
}

/// Parse one name-addr or addr-spec value
pub fn parse_address(input: &str) -> Result<NameAddr> {
    all_consuming(delimited(space0, address, space0))(input.trim())
        .map(|(_, addr)| addr)
        .map_err(|_| Error::InvalidHeader(format!("invalid address: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_display_name() {
        let addr = parse_address("\"Ada \\\"L\\\"\" <sip:ada@test1.com>;tag=123").unwrap();
        assert_eq!(addr.display_name.as_deref(), Some("Ada \"L\""));
        assert_eq!(addr.uri, "sip:ada@test1.com");
        assert_eq!(addr.tag(), Some("123"));
    }

    #[test]
    fn test_token_display_name() {
        let addr = parse_address("Bob Smith <sip:bob@B;transport=udp>").unwrap();
        assert_eq!(addr.display_name.as_deref(), Some("Bob Smith"));
        assert_eq!(addr.uri, "sip:bob@B;transport=udp");
        assert!(addr.params.is_empty());
    }

    #[test]
    fn test_addr_spec_params_belong_to_header() {
        let addr = parse_address("sip:bob@B;tag=xyz").unwrap();
        assert_eq!(addr.uri, "sip:bob@B");
        assert_eq!(addr.tag(), Some("xyz"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_address("no uri here").is_err());
        assert!(parse_address("<sip:bob@B").is_err());
    }
}

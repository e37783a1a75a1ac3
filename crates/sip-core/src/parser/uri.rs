// Parser for SIP URIs (RFC 3261 Section 19.1)
// SIP-URI   =  "sip:" [ userinfo ] hostport uri-parameters [ headers ]
// userinfo  =  ( user / telephone-subscriber ) [ ":" password ] "@"
// hostport  =  host [ ":" port ]

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt, recognize, rest},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};

use super::ParseResult;
use crate::error::{Error, Result};
use crate::types::param::{Param, Params};
use crate::types::uri::SipUri;

fn is_user_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'()%&=+$,;?/".contains(c)
}

fn is_password_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'()%&=+$,".contains(c)
}

fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-_.!~*'()%[]/:&+$".contains(c)
}

fn scheme(input: &str) -> ParseResult<&str> {
    terminated(
        recognize(pair(
            take_while1(|c: char| c.is_ascii_alphabetic()),
            take_while(|c: char| c.is_ascii_alphanumeric() || "+-.".contains(c)),
        )),
        char(':'),
    )(input)
}

fn userinfo(input: &str) -> ParseResult<(&str, Option<&str>)> {
    terminated(
        pair(
            take_while1(is_user_char),
            opt(preceded(char(':'), take_while(is_password_char))),
        ),
        char('@'),
    )(input)
}

fn ipv6_reference(input: &str) -> ParseResult<&str> {
    recognize(delimited(
        char('['),
        take_while1(|c: char| c.is_ascii_hexdigit() || c == ':' || c == '.'),
        char(']'),
    ))(input)
}

fn hostname(input: &str) -> ParseResult<&str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')(input)
}

pub(crate) fn host(input: &str) -> ParseResult<&str> {
    alt((ipv6_reference, hostname))(input)
}

pub(crate) fn port(input: &str) -> ParseResult<u16> {
    preceded(char(':'), map_res(digit1, |digits: &str| digits.parse::<u16>()))(input)
}

// uri-parameter = transport-param / user-param / ... / other-param
fn uri_param(input: &str) -> ParseResult<Param> {
    map(
        preceded(
            char(';'),
            pair(
                take_while1(is_param_char),
                opt(preceded(char('='), take_while(is_param_char))),
            ),
        ),
        |(name, value): (&str, Option<&str>)| Param::new(name, value.map(str::to_string)),
    )(input)
}

fn uri_headers(input: &str) -> ParseResult<&str> {
    preceded(char('?'), rest)(input)
}

fn sip_uri_body<'a>(scheme: &str, input: &'a str) -> ParseResult<'a, SipUri> {
    let (input, userinfo) = opt(userinfo)(input)?;
    let (input, host) = host(input)?;
    let (input, port) = opt(port)(input)?;
    let (input, params) = many0(uri_param)(input)?;
    let (input, headers) = opt(uri_headers)(input)?;

    let (user, password) = match userinfo {
        Some((user, password)) => (Some(user.to_string()), password.map(str::to_string)),
        None => (None, None),
    };

    Ok((
        input,
        SipUri {
            scheme: scheme.to_ascii_lowercase(),
            user,
            password,
            host: host.to_string(),
            port,
            params: params.into_iter().collect::<Params>(),
            headers: headers.map(str::to_string),
        },
    ))
}

// Non-SIP schemes (tel:, urn:, ...) keep their opaque part in `user`
fn opaque_uri_body<'a>(scheme: &str, input: &'a str) -> ParseResult<'a, SipUri> {
    let (input, opaque) = take_while1(|c: char| c != ';' && c != '?')(input)?;
    let (input, params) = many0(uri_param)(input)?;
    let (input, headers) = opt(uri_headers)(input)?;
    Ok((
        input,
        SipUri {
            scheme: scheme.to_ascii_lowercase(),
            user: Some(opaque.to_string()),
            password: None,
            host: String::new(),
            port: None,
            params: params.into_iter().collect::<Params>(),
            headers: headers.map(str::to_string),
        },
    ))
}

fn uri(input: &str) -> ParseResult<SipUri> {
    let (remaining, scheme) = scheme(input)?;
    if scheme.eq_ignore_ascii_case("sip") || scheme.eq_ignore_ascii_case("sips") {
        sip_uri_body(scheme, remaining)
    } else {
        opaque_uri_body(scheme, remaining)
    }
}

/// Parse a complete URI; trailing garbage is an error
pub fn parse_uri(input: &str) -> Result<SipUri> {
    all_consuming(uri)(input)
        .map(|(_, uri)| uri)
        .map_err(|_| Error::InvalidUri(input.to_string()))
}

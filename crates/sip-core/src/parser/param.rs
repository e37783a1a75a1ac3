// Header parameters (RFC 3261 Section 25.1)
// generic-param  =  token [ EQUAL gen-value ]
// gen-value      =  token / host / quoted-string

use nom::{
    branch::alt,
    bytes::complete::{escaped, is_not, take_while1},
    character::complete::{char, one_of, space0},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
};

use super::ParseResult;
use crate::types::param::{Param, Params};

pub(crate) fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)
}

/// Quoted string, returned with its quotes
pub(crate) fn quoted_string(input: &str) -> ParseResult<&str> {
    recognize(delimited(
        char('"'),
        opt(escaped(is_not("\"\\"), '\\', one_of("\"\\"))),
        char('"'),
    ))(input)
}

fn gen_value(input: &str) -> ParseResult<&str> {
    alt((
        quoted_string,
        take_while1(|c: char| is_token_char(c) || c == ':' || c == '[' || c == ']' || c == '/'),
    ))(input)
}

pub(crate) fn generic_param(input: &str) -> ParseResult<Param> {
    map(
        pair(
            take_while1(is_token_char),
            opt(preceded(tuple((space0, char('='), space0)), gen_value)),
        ),
        |(name, value): (&str, Option<&str>)| Param::new(name, value.map(str::to_string)),
    )(input)
}

/// Zero or more `;name[=value]` parameters, tolerating whitespace around `;`
pub(crate) fn semi_params(input: &str) -> ParseResult<Params> {
    map(
        many0(preceded(tuple((space0, char(';'), space0)), generic_param)),
        |params| params.into_iter().collect(),
    )(input)
}

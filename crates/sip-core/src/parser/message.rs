// Parser for complete SIP messages (RFC 3261 Section 7)
// SIP-message    =  Request / Response
// Request-Line   =  Method SP Request-URI SP SIP-Version CRLF
// Status-Line    =  SIP-Version SP Status-Code SP Reason-Phrase CRLF

use std::str::FromStr;

use nom::{
    bytes::complete::{tag_no_case, take_till1, take_while1, take_while_m_n},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map_res, recognize, rest},
    sequence::{pair, preceded, tuple},
};
use tracing::trace;

use super::address::parse_address;
use super::auth::parse_auth;
use super::param::is_token_char;
use super::utils::{split_head_body, split_list, unfold_lines};
use super::via::parse_via;
use super::ParseResult;
use crate::error::{Error, Result};
use crate::types::headers::{CSeq, HeaderName, HeaderValue, Headers};
use crate::types::method::Method;
use crate::types::sip_message::{SipMessage, StartLine};

fn sip_version(input: &str) -> ParseResult<&str> {
    recognize(tuple((
        tag_no_case("SIP/"),
        digit1,
        char('.'),
        digit1,
    )))(input)
}

fn request_line(input: &str) -> ParseResult<(StartLine, &str)> {
    let (input, (method, _, uri, _, version)) = tuple((
        map_res(take_while1(is_token_char), Method::from_str),
        space1,
        take_till1(|c: char| c == ' ' || c == '\t'),
        space1,
        sip_version,
    ))(input)?;
    let (input, _) = space0(input)?;
    Ok((
        input,
        (
            StartLine::Request {
                method,
                uri: uri.to_string(),
            },
            version,
        ),
    ))
}

fn status_line(input: &str) -> ParseResult<(StartLine, &str)> {
    let (input, (version, _, status, reason)) = tuple((
        sip_version,
        space1,
        map_res(take_while_m_n(3, 3, |c: char| c.is_ascii_digit()), u16::from_str),
        rest,
    ))(input)?;
    Ok((
        input,
        (
            StartLine::Response {
                status,
                reason: reason.trim().to_string(),
            },
            version,
        ),
    ))
}

fn start_line(input: &str) -> Result<(StartLine, String)> {
    let line = input.trim();
    if let Ok((_, (start, version))) = all_consuming(status_line)(line) {
        return Ok((start, version.to_ascii_uppercase()));
    }
    all_consuming(request_line)(line)
        .map(|(_, (start, version))| (start, version.to_ascii_uppercase()))
        .map_err(|_| Error::InvalidFormat(format!("invalid start line: {}", line)))
}

fn cseq_value(input: &str) -> ParseResult<CSeq> {
    let (input, (seq, method)) = pair(
        map_res(digit1, u32::from_str),
        preceded(space1, map_res(take_while1(is_token_char), Method::from_str)),
    )(input)?;
    Ok((input, CSeq::new(seq, method)))
}

fn parse_cseq(input: &str) -> Result<CSeq> {
    all_consuming(cseq_value)(input.trim())
        .map(|(_, cseq)| cseq)
        .map_err(|_| Error::InvalidHeader(format!("invalid CSeq: {}", input)))
}

/// Parse one header value into its structured form.
///
/// Address lists and Via lists are split on commas first; a value whose
/// structured parse fails is kept as text.
pub fn parse_header_value(name: &HeaderName, raw: &str) -> Vec<HeaderValue> {
    let raw = raw.trim();
    match name.as_str() {
        "from" | "to" => vec![structured(raw, parse_address, HeaderValue::Address)],
        "contact" if raw == "*" => vec![HeaderValue::text(raw)],
        "contact" | "route" | "record-route" => split_list(raw)
            .into_iter()
            .map(|part| structured(part, parse_address, HeaderValue::Address))
            .collect(),
        "via" => split_list(raw)
            .into_iter()
            .map(|part| structured(part, parse_via, HeaderValue::Via))
            .collect(),
        "cseq" => vec![structured(raw, parse_cseq, HeaderValue::CSeq)],
        "authorization" | "proxy-authorization" | "www-authenticate" | "proxy-authenticate" => {
            vec![structured(raw, parse_auth, HeaderValue::Auth)]
        }
        _ => vec![HeaderValue::text(raw)],
    }
}

fn structured<T>(
    raw: &str,
    parse: impl Fn(&str) -> Result<T>,
    wrap: impl Fn(T) -> HeaderValue,
) -> HeaderValue {
    match parse(raw) {
        Ok(value) => wrap(value),
        Err(err) => {
            trace!("keeping header value as text: {}", err);
            HeaderValue::text(raw)
        }
    }
}

/// Parse the text form of a SIP message.
///
/// Header names are normalized (compact forms expanded), folded lines are
/// unfolded and a Content-Length shorter than the remaining text truncates
/// the body.
pub fn parse_message(raw: &str) -> Result<SipMessage> {
    let raw = raw.trim_start_matches(['\r', '\n']);
    if raw.trim().is_empty() {
        return Err(Error::InvalidFormat("empty message".to_string()));
    }

    let (head, body) = split_head_body(raw);
    let mut lines = unfold_lines(head).into_iter();
    let first = lines
        .next()
        .ok_or_else(|| Error::InvalidFormat("missing start line".to_string()))?;
    let (start_line, version) = start_line(&first)?;

    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeader(line.clone()))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(is_token_char) {
            return Err(Error::InvalidHeader(line.clone()));
        }
        let name = HeaderName::new(name);
        for value in parse_header_value(&name, value) {
            headers.append(name.clone(), value);
        }
    }

    let declared = headers
        .text("content-length")
        .and_then(|len| len.trim().parse::<usize>().ok());
    let body = match declared {
        Some(len) if len < body.len() && body.is_char_boundary(len) => &body[..len],
        _ => body,
    };

    Ok(SipMessage {
        start_line,
        version,
        headers,
        body: body.to_string(),
    })
}

// Parser for authentication headers (RFC 3261 Section 25.1, RFC 2617)
// challenge    =  ("Digest" LWS digest-cln *(COMMA digest-cln)) / other-challenge
// credentials  =  ("Digest" LWS digest-response) / other-response

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, space0, space1},
    combinator::{all_consuming, map, opt},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
};

use super::param::{generic_param, is_token_char};
use super::ParseResult;
use crate::error::{Error, Result};
use crate::types::headers::AuthParams;

fn comma(input: &str) -> ParseResult<char> {
    delimited(space0, char(','), space0)(input)
}

fn auth_value(input: &str) -> ParseResult<AuthParams> {
    map(
        pair(
            take_while1(is_token_char),
            opt(preceded(space1, separated_list0(comma, generic_param))),
        ),
        |(scheme, params): (&str, _)| AuthParams {
            scheme: scheme.to_string(),
            params: params.unwrap_or_default().into_iter().collect(),
        },
    )(input)
}

/// Parse an Authorization / WWW-Authenticate style value
pub fn parse_auth(input: &str) -> Result<AuthParams> {
    all_consuming(tuple((auth_value, space0)))(input.trim())
        .map(|(_, (auth, _))| auth)
        .map_err(|_| Error::InvalidHeader(format!("invalid auth header: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3261_digest_challenge() {
        let input = "Digest realm=\"atlanta.example.com\", domain=\"sip:boxesbybob.example.com\", qop=\"auth\", nonce=\"f84f1cec41e6cbe5aea9c8e88d359\", opaque=\"\", stale=FALSE, algorithm=MD5";
        let auth = parse_auth(input).unwrap();
        assert_eq!(auth.scheme, "Digest");
        assert_eq!(auth.get("realm"), Some("atlanta.example.com"));
        assert_eq!(auth.get("nonce"), Some("f84f1cec41e6cbe5aea9c8e88d359"));
        assert_eq!(auth.get("opaque"), Some(""));
        assert_eq!(auth.get("algorithm"), Some("MD5"));
    }

    #[test]
    fn test_rfc3261_digest_credentials() {
        let input = "Digest username=\"bob\", realm=\"biloxi.com\", nonce=\"dcd98b\", uri=\"sip:bob@biloxi.com\", qop=auth, nc=00000001, cnonce=\"0a4f113b\", response=\"6629fae49393a05397450978507c4ef1\"";
        let auth = parse_auth(input).unwrap();
        assert_eq!(auth.get("username"), Some("bob"));
        assert_eq!(auth.get("nc"), Some("00000001"));
        assert_eq!(auth.get("uri"), Some("sip:bob@biloxi.com"));
        assert_eq!(auth.params.len(), 8);
    }
}

// Parser for the Via header (RFC 3261 Section 20.42)
// via-parm          =  sent-protocol LWS sent-by *( SEMI via-params )
// sent-protocol     =  protocol-name SLASH protocol-version SLASH transport
// sent-by           =  host [ COLON port ]

use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, space0, space1},
    combinator::{all_consuming, opt},
    sequence::{delimited, preceded, tuple},
};

use super::param::{is_token_char, semi_params};
use super::uri::{host, port};
use super::ParseResult;
use crate::error::{Error, Result};
use crate::types::via::Via;

fn slash(input: &str) -> ParseResult<char> {
    delimited(space0, char('/'), space0)(input)
}

fn via_parm(input: &str) -> ParseResult<Via> {
    let (input, (_, _, version, _, protocol)) = tuple((
        tag_no_case("SIP"),
        slash,
        take_while1(is_token_char),
        slash,
        take_while1(is_token_char),
    ))(input)?;
    let (input, host) = preceded(space1, host)(input)?;
    let (input, port) = opt(port)(input)?;
    let (input, params) = semi_params(input)?;
    Ok((
        input,
        Via {
            version: version.to_string(),
            protocol: protocol.to_ascii_uppercase(),
            host: host.to_string(),
            port,
            params,
        },
    ))
}

/// Parse one Via value (lists are split before this is called)
pub fn parse_via(input: &str) -> Result<Via> {
    all_consuming(via_parm)(input.trim())
        .map(|(_, via)| via)
        .map_err(|_| Error::InvalidHeader(format!("invalid Via: {}", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_via_with_params() {
        let via = parse_via("SIP/2.0/UDP 127.0.0.1:7070;branch=z9hG4bK776;rport").unwrap();
        assert_eq!(via.protocol, "UDP");
        assert_eq!(via.host, "127.0.0.1");
        assert_eq!(via.port, Some(7070));
        assert_eq!(via.branch(), Some("z9hG4bK776"));
        assert_eq!(via.params.get("rport"), Some(None));
    }

    #[test]
    fn test_parse_via_without_port() {
        let via = parse_via("SIP / 2.0 / tcp proxy.example.com ;branch=z9hG4bKx").unwrap();
        assert_eq!(via.protocol, "TCP");
        assert_eq!(via.port, None);
        assert_eq!(via.branch(), Some("z9hG4bKx"));
    }

    #[test]
    fn test_parse_via_malformed() {
        assert!(parse_via("garbage").is_err());
    }
}

use std::fmt::Write;

use md5::{Digest, Md5};
use rand::Rng;
use tracing::debug;

use super::{ChallengeParams, Credentials, DigestAuthenticator};
use crate::error::{Error, Result};
use crate::types::headers::{AuthParams, HeaderValue};
use crate::types::sip_message::SipMessage;

/// `qop=auth` inputs of a digest response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QopParams {
    pub qop: String,
    pub nc: String,
    pub cnonce: String,
}

fn md5_hex(data: &str) -> String {
    let digest = Md5::digest(data.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter() {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Digest `response` value (RFC 2617 Section 3.2.2.1)
pub fn compute_response(
    credentials: &Credentials,
    realm: &str,
    nonce: &str,
    method: &str,
    uri: &str,
    qop: Option<&QopParams>,
) -> String {
    let ha1 = md5_hex(&format!("{}:{}:{}", credentials.username, realm, credentials.password));
    let ha2 = md5_hex(&format!("{}:{}", method, uri));
    match qop {
        Some(q) => md5_hex(&format!("{}:{}:{}:{}:{}:{}", ha1, nonce, q.nc, q.cnonce, q.qop, ha2)),
        None => md5_hex(&format!("{}:{}:{}", ha1, nonce, ha2)),
    }
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Header carrying the challenge and the header answering it, by status
fn header_pair(status: Option<u16>) -> Result<(&'static str, &'static str)> {
    match status {
        Some(401) => Ok(("www-authenticate", "authorization")),
        Some(407) => Ok(("proxy-authenticate", "proxy-authorization")),
        other => Err(Error::Auth(format!("not a challenge status: {:?}", other))),
    }
}

/// MD5 digest authenticator
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Digest;

impl Md5Digest {
    pub fn new() -> Self {
        Self
    }

    /// Check the credentials carried by `request` against `password`
    pub fn verify(&self, request: &SipMessage, password: &str) -> bool {
        let headers = &request.headers;
        let Some(auth) = headers
            .first("authorization")
            .or_else(|| headers.first("proxy-authorization"))
            .and_then(HeaderValue::as_auth)
        else {
            return false;
        };
        let (Some(username), Some(realm), Some(nonce), Some(uri), Some(response), Some(method)) = (
            auth.get("username"),
            auth.get("realm"),
            auth.get("nonce"),
            auth.get("uri"),
            auth.get("response"),
            request.method(),
        ) else {
            return false;
        };
        let qop = match (auth.get("qop"), auth.get("nc"), auth.get("cnonce")) {
            (Some(qop), Some(nc), Some(cnonce)) => Some(QopParams {
                qop: qop.to_string(),
                nc: nc.to_string(),
                cnonce: cnonce.to_string(),
            }),
            _ => None,
        };
        let credentials = Credentials::new(username, password);
        compute_response(&credentials, realm, nonce, method.as_str(), uri, qop.as_ref()) == response
    }
}

impl DigestAuthenticator for Md5Digest {
    fn sign_request(
        &self,
        request: &mut SipMessage,
        challenge: &SipMessage,
        credentials: &Credentials,
    ) -> Result<()> {
        let (challenge_header, answer_header) = header_pair(challenge.status())?;
        let offered = challenge
            .headers
            .first(challenge_header)
            .and_then(HeaderValue::as_auth)
            .ok_or_else(|| Error::Auth(format!("missing {}", challenge_header)))?;
        if !offered.scheme.eq_ignore_ascii_case("digest") {
            return Err(Error::Auth(format!("unsupported scheme {}", offered.scheme)));
        }
        let realm = offered
            .get("realm")
            .ok_or_else(|| Error::Auth("challenge without realm".to_string()))?;
        let nonce = offered
            .get("nonce")
            .ok_or_else(|| Error::Auth("challenge without nonce".to_string()))?;
        if let Some(algorithm) = offered.get("algorithm") {
            if !algorithm.eq_ignore_ascii_case("md5") {
                return Err(Error::Auth(format!("unsupported algorithm {}", algorithm)));
            }
        }
        let method = request
            .method()
            .ok_or_else(|| Error::Auth("cannot sign a response".to_string()))?
            .clone();
        let uri = request
            .uri()
            .ok_or_else(|| Error::MissingField("Request-URI".to_string()))?
            .to_string();

        let qop = offered
            .get("qop")
            .filter(|offer| offer.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")))
            .map(|_| QopParams {
                qop: "auth".to_string(),
                nc: "00000001".to_string(),
                cnonce: random_hex(8),
            });
        let response = compute_response(credentials, realm, nonce, method.as_str(), &uri, qop.as_ref());

        let mut answer = AuthParams::new("Digest");
        answer.set_quoted("username", &credentials.username);
        answer.set_quoted("realm", realm);
        answer.set_quoted("nonce", nonce);
        answer.set_quoted("uri", &uri);
        answer.set_quoted("response", &response);
        answer.set_token("algorithm", "MD5");
        if let Some(opaque) = offered.get("opaque") {
            answer.set_quoted("opaque", opaque);
        }
        if let Some(q) = &qop {
            answer.set_token("qop", &q.qop);
            answer.set_token("nc", &q.nc);
            answer.set_quoted("cnonce", &q.cnonce);
        }
        debug!(realm, header = answer_header, "signed request");
        request.headers.set(answer_header, HeaderValue::Auth(answer));
        Ok(())
    }

    fn build_challenge(&self, params: &ChallengeParams, response: &mut SipMessage) -> Result<()> {
        let (challenge_header, _) = header_pair(response.status())?;
        let nonce = params.nonce.clone().unwrap_or_else(|| random_hex(16));
        let mut challenge = AuthParams::new("Digest");
        challenge.set_quoted("realm", &params.realm);
        challenge.set_quoted("nonce", &nonce);
        if let Some(opaque) = &params.opaque {
            challenge.set_quoted("opaque", opaque);
        }
        challenge.set_token("algorithm", "MD5");
        if params.qop_auth {
            challenge.set_quoted("qop", "auth");
        }
        if params.stale {
            challenge.set_token("stale", "TRUE");
        }
        response.headers.set(challenge_header, HeaderValue::Auth(challenge));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::method::Method;

    fn mufasa() -> Credentials {
        Credentials::new("Mufasa", "Circle Of Life")
    }

    #[test]
    fn test_rfc2617_reference_without_qop() {
        let response = compute_response(
            &mufasa(),
            "testrealm@host.com",
            "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            "GET",
            "/dir/index.html",
            None,
        );
        assert_eq!(response, "670fd8c2df070c60b045671b8b24ff02");
    }

    #[test]
    fn test_rfc2617_reference_with_qop() {
        let qop = QopParams {
            qop: "auth".to_string(),
            nc: "00000001".to_string(),
            cnonce: "0a4f113b".to_string(),
        };
        let response = compute_response(
            &mufasa(),
            "testrealm@host.com",
            "dcd98b7102dd2f0e8b11d0f600bfb0c093",
            "GET",
            "/dir/index.html",
            Some(&qop),
        );
        assert_eq!(response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn test_challenge_then_sign_then_verify() {
        let digest = Md5Digest::new();
        let mut challenge = SipMessage::response(407, "Proxy Authentication Required");
        digest
            .build_challenge(
                &ChallengeParams::new("test1.com").with_nonce("n1").with_qop_auth(),
                &mut challenge,
            )
            .unwrap();
        assert!(challenge.headers.contains("proxy-authenticate"));

        let mut request = SipMessage::request(Method::Invite, "sip:bob@B");
        let creds = Credentials::new("ada", "secret");
        digest.sign_request(&mut request, &challenge, &creds).unwrap();
        assert!(request.headers.contains("proxy-authorization"));
        assert!(!request.headers.contains("authorization"));
        assert!(digest.verify(&request, "secret"));
        assert!(!digest.verify(&request, "wrong"));
    }

    #[test]
    fn test_sign_rejects_non_challenge() {
        let digest = Md5Digest::new();
        let mut request = SipMessage::request(Method::Register, "sip:test1.com");
        let ok = SipMessage::response(200, "OK");
        assert!(digest.sign_request(&mut request, &ok, &mufasa()).is_err());
        let bare = SipMessage::response(401, "Unauthorized");
        assert!(digest.sign_request(&mut request, &bare, &mufasa()).is_err());
    }
}

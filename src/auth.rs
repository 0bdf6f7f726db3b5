use crate::schemas::MemberId;
use crate::settings::Auth;
use actix_web::{http::header::HeaderValue, HttpRequest};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::ParseIntError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    /// Trusted caller holding the service token.
    Service,
    /// A member acting inside their own group.
    Member { group_id: String, member_id: MemberId },
}

impl Session {
    pub fn can_access(&self, group: &str) -> bool {
        match self {
            Session::Service => true,
            Session::Member { group_id, .. } => group_id == group,
        }
    }

    /// The member the session speaks for, if any.
    pub fn member_id(&self) -> Option<&str> {
        match self {
            Session::Service => None,
            Session::Member { member_id, .. } => Some(member_id.as_str()),
        }
    }
}

/// Signed member session, sent as JSON in the `Authorization` header.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SessionClaims {
    pub group_id: String,
    pub member_id: MemberId,
    pub issued_at: String,
    pub hash: String,
}

impl SessionClaims {
    pub fn sign(
        group_id: impl Into<String>,
        member_id: impl Into<MemberId>,
        issued_at: impl Into<String>,
        secret: &str,
    ) -> Self {
        let mut claims = Self {
            group_id: group_id.into(),
            member_id: member_id.into(),
            issued_at: issued_at.into(),
            hash: String::new(),
        };
        claims.hash = session_mac(&claims, secret)
            .map(|mac| mac.finalize().into_bytes().to_vec())
            .unwrap_or_default()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        claims
    }
}

pub fn check_session(request: &HttpRequest, auth: &Auth) -> Option<Session> {
    let authorization = request
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(HeaderValue::to_str)?
        .ok()?;
    if authorization == auth.service_token {
        return Some(Session::Service);
    }
    let claims: SessionClaims = serde_json::from_str(authorization).ok()?;
    let hash = claims
        .hash
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|n| u8::from_str_radix(&String::from_iter(n), 16))
        .collect::<Result<Vec<u8>, ParseIntError>>()
        .ok()?;
    let verified = session_mac(&claims, &auth.session_secret)
        .is_some_and(|mac| mac.verify_slice(&hash).is_ok());
    if verified {
        Some(Session::Member {
            group_id: claims.group_id,
            member_id: claims.member_id,
        })
    } else {
        tracing::warn!(group = %claims.group_id, member = %claims.member_id, "rejected session signature");
        None
    }
}

fn session_mac(claims: &SessionClaims, secret: &str) -> Option<HmacSha256> {
    let hash_content = [
        ("group_id", &claims.group_id),
        ("issued_at", &claims.issued_at),
        ("member_id", &claims.member_id),
    ]
    .iter()
    .map(|(key, value)| format!("{key}={value}"))
    .collect::<Vec<_>>()
    .join("\n");

    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(secret.as_bytes());
    let secret_hash = sha256_hasher.finalize();

    // HMAC accepts keys of any length
    let mut hmac_hasher = HmacSha256::new_from_slice(&secret_hash).ok()?;
    hmac_hasher.update(hash_content.as_bytes());
    Some(hmac_hasher)
}

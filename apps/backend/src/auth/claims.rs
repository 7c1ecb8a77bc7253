//! Token claims carried by every issued token.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Our standard extensions to the registered token claims.
///
/// All fields are omitted from the wire format when empty so tokens stay
/// compact for records that carry no extensions (e.g. ldap-bind logins).
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ExtraClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// Registered claims plus our extensions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the stable identity key used by backends to look up the record
    pub sub: String,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    #[serde(flatten)]
    pub extra: ExtraClaims,
}

impl Claims {
    /// Build claims for a freshly authenticated subject.
    pub fn new(
        sub: impl Into<String>,
        extra: ExtraClaims,
        now: SystemTime,
        expires_at: SystemTime,
    ) -> Self {
        let claims = Self {
            sub: sub.into(),
            iat: epoch_seconds(now),
            exp: epoch_seconds(expires_at),
            extra,
        };
        debug_assert!(claims.exp > claims.iat, "expiry must be after issuance");
        claims
    }
}

fn epoch_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn empty_extensions_are_omitted_from_the_wire() {
        let now = SystemTime::now();
        let claims = Claims::new("alice", ExtraClaims::default(), now, now + Duration::from_secs(60));
        let json = serde_json::to_value(&claims).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["exp", "iat", "sub"]);
    }

    #[test]
    fn extensions_round_trip() {
        let extra = ExtraClaims {
            display_name: Some("Alice".to_string()),
            email: Some("alice@example.org".to_string()),
            email_verified: true,
            groups: vec!["admin".to_string(), "self-service".to_string()],
        };
        let now = SystemTime::now();
        let claims = Claims::new("alice", extra.clone(), now, now + Duration::from_secs(60));
        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claims);
        assert_eq!(back.extra, extra);
    }
}

//! JWT-Claims des Access Tokens
//!
//! Nur für Diagnose-Ausgaben. Die Signatur wird nicht geprüft, ein
//! unlesbares Token ist kein Fehler.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Grants-Block des Tokens
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VoiceGrants {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub voice: Option<serde_json::Value>,
}

/// Payload-Segment des Tokens
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub grants: Option<VoiceGrants>,
}

impl TokenClaims {
    /// Dekodiert das mittlere Segment eines JWT
    pub fn decode(token: &str) -> Option<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) => payload,
            _ => return None,
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn identity(&self) -> Option<&str> {
        self.grants.as_ref()?.identity.as_deref()
    }

    pub fn has_voice_grant(&self) -> bool {
        self.grants
            .as_ref()
            .map(|g| g.voice.is_some())
            .unwrap_or(false)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp?, 0)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_access_token() {
        let token = jwt(serde_json::json!({
            "iss": "SKxxxx",
            "sub": "ACxxxx",
            "exp": 1_700_003_600,
            "grants": {
                "identity": "web_user",
                "voice": { "outgoing": { "application_sid": "APxxxx" } }
            }
        }));

        let claims = TokenClaims::decode(&token).unwrap();
        assert_eq!(claims.identity(), Some("web_user"));
        assert!(claims.has_voice_grant());
        assert_eq!(claims.expires_at().unwrap().timestamp(), 1_700_003_600);
    }

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let claims = TokenClaims::decode(&jwt(serde_json::json!({}))).unwrap();
        assert!(claims.identity().is_none());
        assert!(!claims.has_voice_grant());
        assert!(claims.expires_at().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(TokenClaims::decode("not-a-jwt").is_none());
        assert!(TokenClaims::decode("a.%%%.c").is_none());
        assert!(TokenClaims::decode("").is_none());
    }
}

//! Sign-in credential decoding
//!
//! Students sign in with an identity-provider token. Only the payload is
//! read; the signature is not checked against provider keys. Access is gated
//! on the email domain alone.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// A signed-in student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialClaims {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

fn payload_only_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// True when `email` belongs to `domain` (case-insensitive)
pub fn email_in_domain(email: &str, domain: &str) -> bool {
    let suffix = format!("@{}", domain.trim_start_matches('@').to_ascii_lowercase());
    let email = email.trim().to_ascii_lowercase();
    email.len() > suffix.len() && email.ends_with(&suffix)
}

/// Decode a sign-in credential.
///
/// Returns `None` for a malformed token, a missing email, or an email outside
/// `allowed_domain`; callers cannot tell these apart.
pub fn decode_identity(credential: &str, allowed_domain: &str) -> Option<Identity> {
    let data = decode::<CredentialClaims>(
        credential.trim(),
        &DecodingKey::from_secret(&[]),
        &payload_only_validation(),
    )
    .ok()?;

    let email = data.claims.email?.trim().to_ascii_lowercase();
    if !email_in_domain(&email, allowed_domain) {
        return None;
    }

    let name = data
        .claims
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Some(Identity {
        email,
        name,
        picture: data.claims.picture.filter(|p| !p.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn credential(claims: serde_json::Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"provider")).unwrap()
    }

    #[test]
    fn test_accepts_university_email() {
        let token = credential(json!({
            "email": "Student.Name@g.bracu.ac.bd",
            "name": "Student Name",
            "picture": "https://example.com/p.png",
            "sub": "123",
        }));

        let identity = decode_identity(&token, "g.bracu.ac.bd").unwrap();
        assert_eq!(identity.email, "student.name@g.bracu.ac.bd");
        assert_eq!(identity.name, "Student Name");
        assert_eq!(identity.picture.as_deref(), Some("https://example.com/p.png"));
    }

    #[test]
    fn test_rejects_other_domains() {
        let gmail = credential(json!({ "email": "someone@gmail.com", "name": "X" }));
        assert_eq!(decode_identity(&gmail, "g.bracu.ac.bd"), None);

        let lookalike = credential(json!({ "email": "x@evilg.bracu.ac.bd", "name": "X" }));
        assert_eq!(decode_identity(&lookalike, "g.bracu.ac.bd"), None);
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert_eq!(decode_identity("not-a-token", "g.bracu.ac.bd"), None);
        assert_eq!(decode_identity("a.b.c", "g.bracu.ac.bd"), None);
        assert_eq!(decode_identity("", "g.bracu.ac.bd"), None);
    }

    #[test]
    fn test_rejects_missing_email() {
        let token = credential(json!({ "name": "No Email" }));
        assert_eq!(decode_identity(&token, "g.bracu.ac.bd"), None);
    }

    #[test]
    fn test_expired_credential_still_decodes() {
        let token = credential(json!({ "email": "a@g.bracu.ac.bd", "exp": 1 }));
        let identity = decode_identity(&token, "g.bracu.ac.bd").unwrap();
        assert_eq!(identity.name, "a");
    }

    #[test]
    fn test_email_in_domain() {
        assert!(email_in_domain("a@g.bracu.ac.bd", "g.bracu.ac.bd"));
        assert!(email_in_domain("A@G.BRACU.AC.BD", "@g.bracu.ac.bd"));
        assert!(!email_in_domain("@g.bracu.ac.bd", "g.bracu.ac.bd"));
        assert!(!email_in_domain("a@bracu.ac.bd", "g.bracu.ac.bd"));
    }
}

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use route_gate::{Claims, CredentialVerifier, Role, VerifyError};
use serde_json::json;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn claims(role: Option<&str>, exp_offset: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        subject_id: Some("64f1c0ffee".to_string()),
        email: Some("player@example.com".to_string()),
        role: role.map(str::to_string),
        exp: now + exp_offset,
        iat: Some(now),
    }
}

fn sign<T: serde::Serialize>(payload: &T, secret: &str) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), payload, &key).unwrap()
}

fn verifier() -> CredentialVerifier {
    CredentialVerifier::new(TEST_JWT_SECRET, 0)
}

// --- Tests ---

#[test]
fn test_valid_token_yields_credential() {
    let token = sign(&claims(Some("agent"), 3600), TEST_JWT_SECRET);

    let credential = verifier().try_verify(Some(&token)).unwrap();

    assert_eq!(credential.role, Role::Agent);
    assert_eq!(credential.subject_id.as_deref(), Some("64f1c0ffee"));
    assert_eq!(credential.email.as_deref(), Some("player@example.com"));
    assert!(credential.expires_at > Utc::now());
}

#[test]
fn test_standard_sub_claim_is_accepted() {
    let exp = Utc::now().timestamp() + 600;
    let token = sign(&json!({ "sub": "abc", "role": "admin", "exp": exp }), TEST_JWT_SECRET);

    let credential = verifier().try_verify(Some(&token)).unwrap();

    assert_eq!(credential.subject_id.as_deref(), Some("abc"));
    assert_eq!(credential.role, Role::Admin);
}

#[test]
fn test_missing_role_defaults_to_user() {
    let token = sign(&claims(None, 3600), TEST_JWT_SECRET);
    assert_eq!(verifier().try_verify(Some(&token)).unwrap().role, Role::User);

    let token = sign(&claims(Some(""), 3600), TEST_JWT_SECRET);
    assert_eq!(verifier().try_verify(Some(&token)).unwrap().role, Role::User);
}

#[test]
fn test_unknown_role_is_unrecognized() {
    let token = sign(&claims(Some("superuser"), 3600), TEST_JWT_SECRET);

    assert_eq!(verifier().try_verify(Some(&token)).unwrap().role, Role::Unrecognized);
}

#[test]
fn test_missing_token() {
    assert_eq!(verifier().try_verify(None), Err(VerifyError::Missing));
    assert_eq!(verifier().try_verify(Some("  ")), Err(VerifyError::Missing));
    assert!(verifier().verify(None).is_none());
}

#[test]
fn test_expired_token() {
    let token = sign(&claims(Some("user"), -3600), TEST_JWT_SECRET);

    assert_eq!(verifier().try_verify(Some(&token)), Err(VerifyError::Expired));
    assert!(verifier().verify(Some(&token)).is_none());
}

#[test]
fn test_leeway_tolerates_small_skew() {
    let token = sign(&claims(Some("user"), -5), TEST_JWT_SECRET);

    assert!(CredentialVerifier::new(TEST_JWT_SECRET, 60).verify(Some(&token)).is_some());
    assert!(verifier().verify(Some(&token)).is_none());
}

#[test]
fn test_wrong_secret_is_invalid_signature() {
    let token = sign(&claims(Some("admin"), 3600), "some-other-secret");

    assert_eq!(verifier().try_verify(Some(&token)), Err(VerifyError::InvalidSignature));
    assert!(verifier().verify(Some(&token)).is_none());
}

#[test]
fn test_garbage_is_malformed() {
    assert!(matches!(
        verifier().try_verify(Some("not-a-token")),
        Err(VerifyError::Malformed(_))
    ));
}

#[test]
fn test_token_without_exp_is_rejected() {
    let token = sign(&json!({ "role": "admin" }), TEST_JWT_SECRET);

    assert!(matches!(verifier().try_verify(Some(&token)), Err(VerifyError::Malformed(_))));
}

#[test]
fn test_every_hmac_algorithm_is_accepted() {
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    for algorithm in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
        let token = encode(&Header::new(algorithm), &claims(Some("admin"), 3600), &key).unwrap();

        let credential = verifier().try_verify(Some(&token)).unwrap();
        assert_eq!(credential.role, Role::Admin);
    }
}

#[test]
fn test_hmac_with_wrong_secret_is_rejected_for_every_algorithm() {
    let key = EncodingKey::from_secret(b"some-other-secret");
    for algorithm in [Algorithm::HS384, Algorithm::HS512] {
        let token = encode(&Header::new(algorithm), &claims(Some("admin"), 3600), &key).unwrap();

        assert_eq!(verifier().try_verify(Some(&token)), Err(VerifyError::InvalidSignature));
    }
}

#[test]
fn test_future_nbf_is_rejected() {
    let now = Utc::now().timestamp();
    let token = sign(
        &json!({ "role": "user", "exp": now + 3600, "nbf": now + 600 }),
        TEST_JWT_SECRET,
    );

    assert_eq!(verifier().try_verify(Some(&token)), Err(VerifyError::NotYetValid));
    assert!(verifier().verify(Some(&token)).is_none());
}

#[test]
fn test_past_nbf_is_accepted() {
    let now = Utc::now().timestamp();
    let token = sign(
        &json!({ "role": "agent", "exp": now + 3600, "nbf": now - 60 }),
        TEST_JWT_SECRET,
    );

    assert_eq!(verifier().try_verify(Some(&token)).unwrap().role, Role::Agent);
}

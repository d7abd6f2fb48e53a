// Token issuer/verifier properties: type isolation, expiry, round-trip and
// malformed-token rejection

use item_reward_api::models::auth::TokenType;
use item_reward_api::services::{JwtConfig, JwtError, JwtService};

const SHARED_SECRET: &str = "shared-secret-used-to-isolate-type-checks";
const OTHER_SECRET: &str = "a-completely-different-secret-value-here";
const ISSUER: &str = "item-reward-api-test";
const NOW: u64 = 1_700_000_000;

fn service(token_type: TokenType, secret: &str, expiry: u64) -> JwtService {
    JwtService::new(JwtConfig::new(token_type, secret, ISSUER, expiry).unwrap())
}

#[test]
fn test_access_token_rejected_by_refresh_verifier() {
    // Same secret on purpose: only the type check can tell them apart
    let access = service(TokenType::Access, SHARED_SECRET, 900);
    let refresh = service(TokenType::Refresh, SHARED_SECRET, 86_400);

    let access_token = access.issue_at(7, "u@x.com", None, NOW).unwrap();
    let refresh_token = refresh.issue_at(7, "u@x.com", None, NOW).unwrap();

    assert_eq!(
        refresh.verify_at(&access_token, NOW + 1),
        Err(JwtError::TokenTypeMismatch {
            expected: TokenType::Refresh,
            found: TokenType::Access,
        })
    );
    assert_eq!(
        access.verify_at(&refresh_token, NOW + 1),
        Err(JwtError::TokenTypeMismatch {
            expected: TokenType::Access,
            found: TokenType::Refresh,
        })
    );
}

#[test]
fn test_cross_kind_with_separate_secrets_fails_on_signature() {
    let access = service(TokenType::Access, SHARED_SECRET, 900);
    let admin = service(TokenType::Admin, OTHER_SECRET, 900);

    let token = access.issue_at(7, "u@x.com", None, NOW).unwrap();
    assert_eq!(admin.verify_at(&token, NOW + 1), Err(JwtError::InvalidSignature));
}

#[test]
fn test_expiry_boundary() {
    let access = service(TokenType::Access, SHARED_SECRET, 900);
    let token = access.issue_at(7, "u@x.com", None, NOW).unwrap();

    assert!(access.verify_at(&token, NOW + 899).is_ok());
    assert_eq!(access.verify_at(&token, NOW + 900), Err(JwtError::TokenExpired));
    assert_eq!(access.verify_at(&token, NOW + 901), Err(JwtError::TokenExpired));
}

#[test]
fn test_token_not_valid_before_issue_time() {
    let access = service(TokenType::Access, SHARED_SECRET, 900);
    let token = access.issue_at(7, "u@x.com", None, NOW).unwrap();

    assert_eq!(access.verify_at(&token, NOW - 5), Err(JwtError::NotYetValid));
}

#[test]
fn test_round_trip_preserves_claims() {
    let admin = service(TokenType::Admin, SHARED_SECRET, 3600);
    let token = admin.issue_at(3, "ops@x.com", Some("admin"), NOW).unwrap();

    let claims = admin.verify_at(&token, NOW + 10).unwrap();
    assert_eq!(claims.user_id, 3);
    assert_eq!(claims.email, "ops@x.com");
    assert_eq!(claims.role.as_deref(), Some("admin"));
    assert_eq!(claims.token_type, TokenType::Admin);
    assert_eq!(claims.iss, ISSUER);
    assert_eq!(claims.iat, NOW);
    assert_eq!(claims.nbf, NOW);
    assert_eq!(claims.exp, NOW + 3600);
}

#[test]
fn test_issue_rejects_bad_subject_and_email() {
    let access = service(TokenType::Access, SHARED_SECRET, 900);

    assert_eq!(access.issue_at(0, "u@x.com", None, NOW), Err(JwtError::InvalidSubject));
    assert_eq!(access.issue_at(-4, "u@x.com", None, NOW), Err(JwtError::InvalidSubject));
    assert_eq!(access.issue_at(1, "  ", None, NOW), Err(JwtError::MissingEmail));
}

#[test]
fn test_malformed_tokens_are_distinct_from_expired() {
    let access = service(TokenType::Access, SHARED_SECRET, 900);
    let forged = service(TokenType::Access, OTHER_SECRET, 900)
        .issue_at(7, "u@x.com", None, NOW)
        .unwrap();
    let expired = access.issue_at(7, "u@x.com", None, NOW).unwrap();
    let later = NOW + 10_000;

    let empty = access.verify_at("", later).unwrap_err();
    let garbage = access.verify_at("not-a-jwt", later).unwrap_err();
    let bad_signature = access.verify_at(&forged, later).unwrap_err();
    let too_late = access.verify_at(&expired, later).unwrap_err();

    assert_eq!(empty, JwtError::Malformed);
    assert_eq!(garbage, JwtError::Malformed);
    assert_eq!(bad_signature, JwtError::InvalidSignature);
    assert_eq!(too_late, JwtError::TokenExpired);

    // Each cause has its own log reason
    assert_eq!(empty.log_reason(), "malformed_token");
    assert_eq!(bad_signature.log_reason(), "bad_signature");
    assert_eq!(too_late.log_reason(), "expired");
}

#[test]
fn test_wrong_issuer_rejected() {
    let ours = service(TokenType::Access, SHARED_SECRET, 900);
    let theirs = JwtService::new(
        JwtConfig::new(TokenType::Access, SHARED_SECRET, "someone-else", 900).unwrap(),
    );

    let token = theirs.issue_at(7, "u@x.com", None, NOW).unwrap();
    assert_eq!(ours.verify_at(&token, NOW + 1), Err(JwtError::InvalidIssuer));
}

#[test]
fn test_config_rejects_empty_secret_and_zero_expiry() {
    assert!(matches!(
        JwtConfig::new(TokenType::Access, "", ISSUER, 900),
        Err(JwtError::InvalidKeyFormat(_))
    ));
    assert!(matches!(
        JwtConfig::new(TokenType::Access, SHARED_SECRET, ISSUER, 0),
        Err(JwtError::InvalidConfig(_))
    ));
}

// Integration tests for the authority's session lifecycle
//
// Runs AuthService against the in-memory credential store and registries:
// - Register / Login / ValidateToken / RefreshToken / Logout
// - Refresh rotation under concurrency
// - Revocation and logout-everywhere
// - Fail-closed behavior when a registry is unreachable

mod common;

use actix_middleware::{AuthFailure, LocalTokenVerifier, TokenVerifier};
use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use crypto_core::jwt::{TokenError, TokenKind, TokenSubject};
use identity_service::models::UpdateProfileRequest;
use identity_service::security::SessionStore;
use identity_service::IdentityError;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_defaults_role_and_normalizes_email() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("  Reader@Portal.COM ", None))
        .await
        .unwrap();

    assert_eq!(user.email, "reader@portal.com");
    assert_eq!(user.role, "user");
}

#[tokio::test]
async fn test_register_duplicate_email_case_insensitive() {
    let h = harness();
    h.auth
        .register(register_request("dup@portal.com", None))
        .await
        .unwrap();

    let err = h
        .auth
        .register(register_request("DUP@portal.com", Some("editor")))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::AlreadyExists));
}

#[tokio::test]
async fn test_register_rejects_invalid_input_per_field() {
    let h = harness();
    let mut req = register_request("not-an-email", Some("superuser"));
    req.password = "short".into();

    match h.auth.register(req).await.unwrap_err() {
        IdentityError::Validation(violations) => {
            let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            assert_eq!(fields, vec!["email", "password", "role"]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_issues_pair_and_records_session() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("editor@portal.com", Some("editor")))
        .await
        .unwrap();

    let pair = h
        .auth
        .login(login_request("EDITOR@portal.com", PASSWORD))
        .await
        .unwrap();

    assert_eq!(pair.expires_in(), 900);
    assert_eq!(pair.access.claims.user_id, user.id);
    assert_eq!(pair.access.claims.role, "editor");
    assert!(pair
        .access
        .claims
        .permissions
        .contains(&"manage_categories".to_string()));
    assert_eq!(pair.refresh.claims.token_type, TokenKind::Refresh);
    assert_ne!(pair.access.claims.jti, pair.refresh.claims.jti);
    assert_eq!(h.sessions.count_for(user.id), 1);
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
    let h = harness();
    h.auth
        .register(register_request("known@portal.com", None))
        .await
        .unwrap();

    let wrong_password = h
        .auth
        .login(login_request("known@portal.com", "Wrong-passw0rd"))
        .await
        .unwrap_err();
    let unknown_email = h
        .auth
        .login(login_request("nobody@portal.com", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, IdentityError::InvalidCredentials));
    assert!(matches!(unknown_email, IdentityError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(
        wrong_password.to_status().message(),
        unknown_email.to_status().message()
    );
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_validate_token_returns_claims() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("admin@portal.com", Some("admin")))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("admin@portal.com", PASSWORD))
        .await
        .unwrap();

    let claims = h.auth.validate_token(&pair.access.token).await.unwrap();
    assert_eq!(claims.user_id, user.id);
    assert!(claims.has_permission("manage_users"));
}

#[tokio::test]
async fn test_validate_token_rejects_refresh_expired_and_tampered() {
    let h = harness();
    h.auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    let err = h.auth.validate_token(&pair.refresh.token).await.unwrap_err();
    assert!(matches!(
        err,
        IdentityError::TokenInvalid(TokenError::KindMismatch { .. })
    ));

    let subject = TokenSubject::new(pair.access.claims.user_id, "reader@portal.com", "user");
    let expired = h
        .codec
        .issue_at(
            &subject,
            TokenKind::Access,
            ChronoDuration::minutes(15),
            Utc::now() - ChronoDuration::hours(1),
        )
        .unwrap();
    let err = h.auth.validate_token(&expired.token).await.unwrap_err();
    assert!(matches!(err, IdentityError::TokenInvalid(TokenError::Expired)));

    let mut tampered = pair.access.token.clone();
    tampered.push('x');
    assert!(matches!(
        h.auth.validate_token(&tampered).await.unwrap_err(),
        IdentityError::TokenInvalid(_)
    ));
}

#[tokio::test]
async fn test_revoked_access_token_is_rejected_until_expiry() {
    let h = harness();
    h.auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let first = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();
    let second = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    h.auth
        .revoke_access_token(&first.access.token)
        .await
        .unwrap();

    assert!(matches!(
        h.auth.validate_token(&first.access.token).await.unwrap_err(),
        IdentityError::TokenRevoked
    ));
    // Only the presented token is affected
    assert!(h.auth.validate_token(&second.access.token).await.is_ok());
}

// ============================================================================
// Refresh rotation
// ============================================================================

#[tokio::test]
async fn test_refresh_rotates_and_old_token_cannot_be_replayed() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    let rotated = h.auth.refresh_token(&pair.refresh.token).await.unwrap();
    assert_ne!(rotated.refresh.claims.jti, pair.refresh.claims.jti);
    assert!(h.auth.validate_token(&rotated.access.token).await.is_ok());

    let replay = h.auth.refresh_token(&pair.refresh.token).await.unwrap_err();
    assert!(matches!(replay, IdentityError::SessionNotFound));

    assert!(h.auth.refresh_token(&rotated.refresh.token).await.is_ok());
    assert_eq!(h.sessions.count_for(user.id), 1);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let h = harness();
    h.auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    let err = h.auth.refresh_token(&pair.access.token).await.unwrap_err();
    assert!(matches!(
        err,
        IdentityError::TokenInvalid(TokenError::KindMismatch { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_succeeds_exactly_once() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("racer@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("racer@portal.com", PASSWORD))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let auth = h.auth.clone();
        let token = pair.refresh.token.clone();
        handles.push(tokio::spawn(
            async move { auth.refresh_token(&token).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert!(matches!(e, IdentityError::SessionNotFound)),
        }
    }

    assert_eq!(successes, 1);
    // Losers drop the sessions they created
    assert_eq!(h.sessions.count_for(user.id), 1);
}

#[tokio::test]
async fn test_refresh_picks_up_profile_changes() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("old@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("old@portal.com", PASSWORD))
        .await
        .unwrap();

    h.auth
        .update_profile(
            user.id,
            UpdateProfileRequest {
                email: Some("new@portal.com".into()),
                full_name: None,
            },
        )
        .await
        .unwrap();

    let rotated = h.auth.refresh_token(&pair.refresh.token).await.unwrap();
    assert_eq!(rotated.access.claims.email, "new@portal.com");
}

#[tokio::test]
async fn test_refresh_for_deleted_user_fails() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("gone@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("gone@portal.com", PASSWORD))
        .await
        .unwrap();

    h.users.remove(user.id);

    let err = h.auth.refresh_token(&pair.refresh.token).await.unwrap_err();
    assert!(matches!(err, IdentityError::UserNotFound));
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_ends_session_but_access_token_lives_on() {
    let h = harness();
    h.auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    assert!(h.auth.logout(&pair.refresh.token).await.unwrap());
    // Second logout is harmless
    assert!(!h.auth.logout(&pair.refresh.token).await.unwrap());

    assert!(matches!(
        h.auth.refresh_token(&pair.refresh.token).await.unwrap_err(),
        IdentityError::SessionNotFound
    ));
    assert!(h.auth.validate_token(&pair.access.token).await.is_ok());
}

#[tokio::test]
async fn test_logout_all_ends_every_session_and_revokes_presented_token() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();

    let mut pairs = Vec::new();
    for _ in 0..3 {
        pairs.push(
            h.auth
                .login(login_request("reader@portal.com", PASSWORD))
                .await
                .unwrap(),
        );
    }

    let removed = h.auth.logout_all(&pairs[0].access.token).await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(h.sessions.count_for(user.id), 0);

    assert!(matches!(
        h.auth.validate_token(&pairs[0].access.token).await.unwrap_err(),
        IdentityError::TokenRevoked
    ));
    for pair in &pairs {
        assert!(matches!(
            h.auth.refresh_token(&pair.refresh.token).await.unwrap_err(),
            IdentityError::SessionNotFound
        ));
    }
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
async fn test_profile_read_and_update() {
    let h = harness();
    let user = h
        .auth
        .register(register_request("me@portal.com", None))
        .await
        .unwrap();
    h.auth
        .register(register_request("taken@portal.com", None))
        .await
        .unwrap();

    let profile = h.auth.get_profile(user.id).await.unwrap();
    assert_eq!(profile.full_name, "Test User");

    let unchanged = h
        .auth
        .update_profile(
            user.id,
            UpdateProfileRequest {
                email: None,
                full_name: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(unchanged, profile);

    let renamed = h
        .auth
        .update_profile(
            user.id,
            UpdateProfileRequest {
                email: None,
                full_name: Some("Renamed User".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.full_name, "Renamed User");

    let err = h
        .auth
        .update_profile(
            user.id,
            UpdateProfileRequest {
                email: Some("taken@portal.com".into()),
                full_name: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::AlreadyExists));
}

// ============================================================================
// Fail closed
// ============================================================================

#[tokio::test]
async fn test_registry_outage_fails_login_closed() {
    let auth = harness_with_registry_outage();
    auth.register(register_request("reader@portal.com", None))
        .await
        .unwrap();

    let err = auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UpstreamUnavailable(_)));
    assert_eq!(err.to_status().code(), tonic::Code::Unavailable);
}

#[tokio::test]
async fn test_registry_outage_fails_validation_and_refresh_closed() {
    let auth = harness_with_registry_outage();
    let codec = crypto_core::jwt::TokenCodec::new(SECRET).unwrap();
    let subject = TokenSubject::new(uuid::Uuid::new_v4(), "reader@portal.com", "user");
    let pair = codec
        .issue_pair(
            &subject,
            ChronoDuration::minutes(15),
            ChronoDuration::days(7),
        )
        .unwrap();

    // Well-signed tokens are still refused when the registries cannot answer
    assert!(matches!(
        auth.validate_token(&pair.access.token).await.unwrap_err(),
        IdentityError::UpstreamUnavailable(_)
    ));
    assert!(matches!(
        auth.refresh_token(&pair.refresh.token).await.unwrap_err(),
        IdentityError::UpstreamUnavailable(_)
    ));
    assert!(matches!(
        auth.verify(&pair.access.token).await.unwrap_err(),
        AuthFailure::Unavailable(_)
    ));
}

#[tokio::test]
async fn test_failed_session_write_keeps_old_refresh_token_usable() {
    let (h, flaky) = harness_with_flaky_sessions();
    let user = h
        .auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    flaky.fail_next_save();
    assert!(matches!(
        h.auth.refresh_token(&pair.refresh.token).await.unwrap_err(),
        IdentityError::UpstreamUnavailable(_)
    ));
    assert!(h
        .sessions
        .exists(user.id, &pair.refresh.claims.jti)
        .await
        .unwrap());

    // Retrying the same token rotates normally
    let rotated = h.auth.refresh_token(&pair.refresh.token).await.unwrap();
    assert_ne!(rotated.refresh.claims.jti, pair.refresh.claims.jti);
    assert_eq!(h.sessions.count_for(user.id), 1);
}

#[tokio::test]
async fn test_failed_old_session_delete_discards_new_session() {
    let (h, flaky) = harness_with_flaky_sessions();
    let user = h
        .auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    flaky.fail_next_delete();
    assert!(matches!(
        h.auth.refresh_token(&pair.refresh.token).await.unwrap_err(),
        IdentityError::UpstreamUnavailable(_)
    ));
    // Only the original session is left behind
    assert_eq!(h.sessions.count_for(user.id), 1);
    assert!(h
        .sessions
        .exists(user.id, &pair.refresh.claims.jti)
        .await
        .unwrap());

    assert!(h.auth.refresh_token(&pair.refresh.token).await.is_ok());
}

#[tokio::test]
async fn test_authority_as_token_verifier() {
    let h = harness();
    h.auth
        .register(register_request("mod@portal.com", Some("moderator")))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("mod@portal.com", PASSWORD))
        .await
        .unwrap();

    let identity = h.auth.verify(&pair.access.token).await.unwrap();
    assert_eq!(identity.role, "moderator");
    assert!(identity.has_permission("moderate"));
    assert_eq!(identity.token_id, pair.access.claims.jti);

    h.auth
        .revoke_access_token(&pair.access.token)
        .await
        .unwrap();
    assert!(matches!(
        h.auth.verify(&pair.access.token).await.unwrap_err(),
        AuthFailure::Rejected(_)
    ));
}

#[tokio::test]
async fn test_local_verifier_sees_shared_revocations() {
    let h = harness();
    h.auth
        .register(register_request("reader@portal.com", None))
        .await
        .unwrap();
    let pair = h
        .auth
        .login(login_request("reader@portal.com", PASSWORD))
        .await
        .unwrap();

    let local = LocalTokenVerifier::new(h.codec.clone())
        .with_revocation_check(h.revocations.clone());
    assert!(local.verify(&pair.access.token).await.is_ok());

    h.auth
        .revoke_access_token(&pair.access.token)
        .await
        .unwrap();
    assert!(matches!(
        local.verify(&pair.access.token).await.unwrap_err(),
        AuthFailure::Rejected(_)
    ));

    // Without the registry, revocation goes unnoticed until expiry
    let codec_only = LocalTokenVerifier::new(h.codec.clone());
    assert!(codec_only.verify(&pair.access.token).await.is_ok());
}

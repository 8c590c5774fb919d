use super::*;
use crate::request::HttpMethod;
use crate::storage::SecureStorage;
use crate::testing::{TestApp, status_json};
use mutual_shared::{KEY_ONBOARDING_COMPLETE, KEY_TOKEN, KEY_USER_ID};
use serde_json::json;
use tokio::sync::broadcast;

// =========================================================
// Helpers
// =========================================================

fn persisted_app(profile: bool, prefs: bool, onboarding: bool) -> TestApp {
    let app = TestApp::new();
    let store = app.ctx.store();
    store
        .save_credentials(&Credentials {
            token: "stored-token".into(),
            user_id: "u1".into(),
        })
        .unwrap();
    store
        .save_flags(&OnboardingFlags {
            profile_setup_complete: profile,
            dating_preferences_complete: prefs,
            onboarding_complete: onboarding,
        })
        .unwrap();
    app
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Token and user id are both in storage or both absent.
fn assert_pair_consistent(app: &TestApp) {
    let token = app.storage.get(KEY_TOKEN).unwrap();
    let user_id = app.storage.get(KEY_USER_ID).unwrap();
    assert_eq!(token.is_some(), user_id.is_some(), "persisted pair out of sync");
    let session = app.ctx.snapshot();
    assert_eq!(session.token().is_some(), session.user_id().is_some());
}

// =========================================================
// Phases
// =========================================================

#[test]
fn phase_follows_flags_in_order() {
    let creds = Credentials {
        token: "t".into(),
        user_id: "u".into(),
    };
    let with = |p, d, o| {
        Session::signed_in(
            creds.clone(),
            OnboardingFlags {
                profile_setup_complete: p,
                dating_preferences_complete: d,
                onboarding_complete: o,
            },
        )
        .phase()
    };

    assert_eq!(Session::restoring().phase(), SessionPhase::Restoring);
    assert_eq!(Session::signed_out().phase(), SessionPhase::SignedOut);
    assert_eq!(with(false, true, true), SessionPhase::NeedsProfileSetup);
    assert_eq!(with(true, false, true), SessionPhase::NeedsDatingPreferences);
    assert_eq!(with(true, true, false), SessionPhase::NeedsOnboardingChat);
    assert_eq!(with(true, true, true), SessionPhase::Complete);
}

// =========================================================
// Restore
// =========================================================

#[tokio::test]
async fn restore_adopts_server_flags() {
    let app = persisted_app(false, false, false);
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, true, false));

    let session = app.auth().restore().await;

    assert!(!session.is_loading);
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(session.phase(), SessionPhase::NeedsOnboardingChat);
    // new flags are cached for the next offline start
    assert_eq!(app.storage.get(KEY_ONBOARDING_COMPLETE).unwrap().as_deref(), Some("0"));
    assert!(app.ctx.store().load_flags().dating_preferences_complete);
    // the status request used the restored token
    let req = app.http.last_request().unwrap();
    assert_eq!(
        req.headers.get("Authorization").map(String::as_str),
        Some("Bearer stored-token")
    );
}

#[tokio::test]
async fn restore_with_rejected_token_clears_everything() {
    let app = persisted_app(true, true, true);
    app.mock(HttpMethod::Get, "/chat/status", 401, json!({"detail": "Could not validate credentials"}));

    let session = app.auth().restore().await;

    assert_eq!(session, Session::signed_out());
    assert!(app.storage.is_empty());
    assert_eq!(app.ctx.store().cached_token(), None);
}

#[tokio::test]
async fn restore_offline_keeps_credentials_and_cached_flags() {
    let app = persisted_app(true, false, false);
    app.http.mock_network_error(HttpMethod::Get, &app.url("/chat/status"));

    let session = app.auth().restore().await;

    assert!(!session.is_loading);
    assert_eq!(session.token(), Some("stored-token"));
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(session.phase(), SessionPhase::NeedsDatingPreferences);
    assert_eq!(app.storage.get(KEY_TOKEN).unwrap().as_deref(), Some("stored-token"));
}

#[tokio::test]
async fn restore_server_error_is_treated_like_offline() {
    let app = persisted_app(true, true, true);
    app.mock(HttpMethod::Get, "/chat/status", 500, json!({"detail": "boom"}));

    let session = app.auth().restore().await;
    assert_eq!(session.phase(), SessionPhase::Complete);
}

#[tokio::test]
async fn restore_with_half_credentials_is_signed_out() {
    let app = TestApp::new();
    app.storage.set(KEY_TOKEN, "orphan").unwrap();

    let session = app.auth().restore().await;

    assert_eq!(session, Session::signed_out());
    assert!(app.storage.is_empty());
    assert_eq!(app.http.requests.borrow().len(), 0);
}

// =========================================================
// Sign-in / sign-out
// =========================================================

#[tokio::test]
async fn sign_in_publishes_token_and_flags_together() {
    let app = TestApp::new();
    let auth = app.auth();
    let mut events = app.ctx.events();
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(false, false, false));
    app.mock(HttpMethod::Get, "/account/status", 200, json!({
        "is_active": true, "email": "a@b.c", "created_at": "2024-01-01T00:00:00"
    }));
    // park the status fetch so the intermediate state can be inspected
    app.http.hold_until_concurrent(2);

    let (result, _) = futures::join!(auth.sign_in("fresh", "u9"), async {
        assert!(!app.ctx.snapshot().is_signed_in());
        app.api.account_status().await
    });

    let session = result.unwrap();
    assert_eq!(session.user_id(), Some("u9"));
    assert_eq!(session.phase(), SessionPhase::NeedsProfileSetup);
    assert_eq!(app.storage.get(KEY_TOKEN).unwrap().as_deref(), Some("fresh"));
    assert_eq!(app.ctx.store().cached_token().as_deref(), Some("fresh"));
    assert_eq!(
        drain(&mut events),
        vec![SessionEvent::SignedIn {
            user_id: "u9".into()
        }]
    );
}

#[tokio::test]
async fn sign_in_keeps_pair_consistent_in_every_outcome() {
    // success
    let app = TestApp::new();
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, true, true));
    app.auth().sign_in("t1", "u1").await.unwrap();
    assert_pair_consistent(&app);
    assert!(app.ctx.snapshot().is_signed_in());

    // status unreachable
    let app = TestApp::new();
    app.http.mock_network_error(HttpMethod::Get, &app.url("/chat/status"));
    app.auth().sign_in("t2", "u2").await.unwrap();
    assert_pair_consistent(&app);
    assert_eq!(app.ctx.snapshot().phase(), SessionPhase::NeedsProfileSetup);

    // token rejected straight away
    let app = TestApp::new();
    app.mock(HttpMethod::Get, "/chat/status", 401, json!({"detail": "nope"}));
    assert!(app.auth().sign_in("t3", "u3").await.is_err());
    assert_pair_consistent(&app);
    assert!(app.storage.is_empty());

    // malformed input never touches storage
    let app = TestApp::new();
    assert!(app.auth().sign_in("t4", "").await.is_err());
    assert_pair_consistent(&app);
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn login_signs_in_with_returned_token() {
    let app = TestApp::new();
    app.mock(HttpMethod::Post, "/auth/login", 200, json!({
        "access_token": "jwt", "token_type": "bearer", "user_id": "u5", "is_active": true
    }));
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, true, true));

    let session = app.auth().login("someone@example.com", "secret").await.unwrap();
    assert_eq!(session.token(), Some("jwt"));
    assert_eq!(session.phase(), SessionPhase::Complete);
}

#[tokio::test]
async fn failed_signup_leaves_session_alone() {
    let app = TestApp::new();
    app.mock(HttpMethod::Post, "/auth/signup", 400, json!({"detail": "Email already registered"}));

    let err = app.auth().signup("taken@example.com", "secret").await.unwrap_err();
    assert_eq!(err.user_message("Signup failed"), "Email already registered");
    assert!(app.storage.is_empty());
}

#[tokio::test]
async fn sign_out_is_idempotent() {
    let app = TestApp::signed_in();
    let auth = app.auth();
    let mut events = app.ctx.events();

    auth.sign_out();
    auth.sign_out();

    assert_eq!(app.ctx.snapshot(), Session::signed_out());
    assert!(app.storage.is_empty());
    assert_eq!(app.ctx.store().token(), None);
    assert_eq!(drain(&mut events), vec![SessionEvent::SignedOut]);
}

// =========================================================
// Forced sign-out
// =========================================================

#[tokio::test]
async fn concurrent_401s_run_one_sign_out_cycle() {
    let app = TestApp::signed_in();
    let mut events = app.ctx.events();
    let mut watcher = app.ctx.subscribe();
    app.mock(HttpMethod::Get, "/matches", 401, json!({"detail": "expired"}));
    app.mock(HttpMethod::Get, "/discover", 401, json!({"detail": "expired"}));
    app.http.hold_until_concurrent(2);

    let (a, b) = futures::join!(app.api.matches(20, 0), app.api.discover(10, 0));
    app.http.release_hold();

    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert_eq!(drain(&mut events), vec![SessionEvent::ForcedSignOut]);
    assert!(watcher.has_changed().unwrap());
    assert_eq!(*watcher.borrow_and_update(), Session::signed_out());

    // a straggler after teardown is ignored as well
    app.mock(HttpMethod::Get, "/chat/history", 401, json!({"detail": "expired"}));
    assert!(app.api.chat_history().await.is_err());
    assert!(drain(&mut events).is_empty());
    assert!(!watcher.has_changed().unwrap());
}

#[tokio::test]
async fn next_sign_in_rearms_forced_sign_out() {
    let app = TestApp::signed_in();
    let mut events = app.ctx.events();
    app.mock(HttpMethod::Get, "/matches", 401, json!({"detail": "expired"}));

    assert!(app.api.matches(20, 0).await.is_err());
    assert!(app.ctx.sign_out_in_progress());

    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, true, true));
    app.auth().sign_in("again", "u1").await.unwrap();
    assert!(!app.ctx.sign_out_in_progress());

    assert!(app.api.matches(20, 0).await.is_err());
    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::ForcedSignOut,
            SessionEvent::SignedIn {
                user_id: "u1".into()
            },
            SessionEvent::ForcedSignOut,
        ]
    );
}

#[tokio::test]
async fn late_401_for_replaced_token_keeps_new_session() {
    let app = TestApp::signed_in();
    let auth = app.auth();
    let mut events = app.ctx.events();
    app.mock(HttpMethod::Get, "/matches", 401, json!({"detail": "expired"}));
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, true, true));
    app.http.hold_until_concurrent(2);

    // the old-token request is answered only once the new sign-in is in flight
    let (stale, signed_in) = futures::join!(app.api.matches(20, 0), async {
        auth.sign_out();
        auth.sign_in("fresh", "u2").await
    });
    app.http.release_hold();

    assert!(stale.unwrap_err().is_unauthorized());
    assert!(signed_in.is_ok());
    let session = app.ctx.snapshot();
    assert_eq!(session.token(), Some("fresh"));
    assert_eq!(session.user_id(), Some("u2"));
    assert_eq!(app.storage.get(KEY_TOKEN).unwrap().as_deref(), Some("fresh"));
    assert_eq!(app.ctx.store().cached_token().as_deref(), Some("fresh"));
    assert!(!app.ctx.sign_out_in_progress());
    assert_eq!(
        drain(&mut events),
        vec![
            SessionEvent::SignedOut,
            SessionEvent::SignedIn {
                user_id: "u2".into()
            },
        ]
    );
}

// =========================================================
// Onboarding refresh
// =========================================================

#[tokio::test]
async fn refresh_onboarding_republishes_flags_only() {
    let app = TestApp::new();
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, false, false));
    app.mock(HttpMethod::Get, "/chat/status", 200, status_json(true, true, false));
    let auth = app.auth();
    auth.sign_in("tok", "u1").await.unwrap();
    let mut events = app.ctx.events();

    let flags = auth.refresh_onboarding().await.unwrap();

    assert!(flags.dating_preferences_complete);
    let session = app.ctx.snapshot();
    assert_eq!(session.token(), Some("tok"));
    assert_eq!(session.phase(), SessionPhase::NeedsOnboardingChat);
    assert_eq!(drain(&mut events), vec![SessionEvent::OnboardingUpdated(flags)]);
}

#[tokio::test]
async fn refresh_onboarding_failure_keeps_state() {
    let app = TestApp::signed_in();
    app.http.mock_network_error(HttpMethod::Get, &app.url("/chat/status"));

    assert!(app.auth().refresh_onboarding().await.is_err());
    assert_eq!(app.ctx.snapshot().phase(), SessionPhase::Complete);
}

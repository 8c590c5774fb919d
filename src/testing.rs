//! Shared fixtures for unit tests.

use std::rc::Rc;

use mutual_shared::{DiscoverUser, Message};
use serde_json::{Value, json};

use crate::api::ApiClient;
use crate::request::{HttpMethod, MockHttpClient};
use crate::session::{AuthService, Credentials, OnboardingFlags, Session, SessionContext};
use crate::storage::{MemoryStorage, SessionStore};

pub const BASE: &str = "http://api.test/api/v1";

pub struct TestApp {
    pub http: Rc<MockHttpClient>,
    pub storage: Rc<MemoryStorage>,
    pub ctx: Rc<SessionContext>,
    pub api: Rc<ApiClient<Rc<MockHttpClient>>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_storage(Rc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Rc<MemoryStorage>) -> Self {
        let http = Rc::new(MockHttpClient::new());
        let ctx = SessionContext::new(SessionStore::new(storage.clone()));
        let api = Rc::new(ApiClient::new(BASE, http.clone(), ctx.clone()));
        Self {
            http,
            storage,
            ctx,
            api,
        }
    }

    /// Fully onboarded user `u1` with token `tok`, persisted and published.
    pub fn signed_in() -> Self {
        let app = Self::new();
        let credentials = Credentials {
            token: "tok".into(),
            user_id: "u1".into(),
        };
        let flags = OnboardingFlags {
            profile_setup_complete: true,
            dating_preferences_complete: true,
            onboarding_complete: true,
        };
        let store = app.ctx.store();
        store.save_credentials(&credentials).unwrap();
        store.save_flags(&flags).unwrap();
        store.set_cached_token(Some(credentials.token.clone()));
        app.ctx.publish(Session::signed_in(credentials, flags));
        app
    }

    pub fn auth(&self) -> AuthService<Rc<MockHttpClient>> {
        AuthService::new(self.api.clone())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{BASE}{path}")
    }

    pub fn mock(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        self.http.mock_response(method, &self.url(path), status, body);
    }
}

pub fn status_json(profile: bool, prefs: bool, onboarding: bool) -> Value {
    json!({
        "current_topic": "values",
        "topics_completed": [],
        "onboarding_status": if onboarding { "completed" } else { "in_progress" },
        "profile_completeness": 0.5,
        "profile_setup_complete": profile,
        "dating_preferences_complete": prefs
    })
}

pub fn user_json(id: &str, name: Option<&str>) -> Value {
    json!({
        "id": id,
        "display_name": name,
        "date_of_birth": null,
        "gender": null,
        "location": null,
        "height_inches": null,
        "job_title": null,
        "relationship_goals": null,
        "photos": [],
        "profile": null,
        "compatibility_score": 0.8,
        "created_at": "2024-01-01T00:00:00"
    })
}

pub fn user(id: &str, name: Option<&str>) -> DiscoverUser {
    serde_json::from_value(user_json(id, name)).unwrap()
}

pub fn page_json(ids: &[&str], offset: u32) -> Value {
    let users: Vec<Value> = ids.iter().map(|id| user_json(id, Some(id))).collect();
    json!({"users": users, "total": 100, "limit": 10, "offset": offset})
}

pub fn message_json(id: &str, sender: &str, content: &str) -> Value {
    json!({
        "id": id,
        "match_id": "m1",
        "sender_id": sender,
        "content": content,
        "read_at": null,
        "created_at": "2024-01-01T00:00:00"
    })
}

pub fn message(id: &str, sender: &str, content: &str) -> Message {
    serde_json::from_value(message_json(id, sender, content)).unwrap()
}

//! Client core for the Mutual dating app: session lifecycle, route gating,
//! and the screen state that sits on top of the REST backend.

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod request;
pub mod route;
pub mod screens;
pub mod session;
pub mod storage;
pub mod timer;

#[cfg(test)]
mod testing;

use std::rc::Rc;

use tracing::info;

pub use api::{ApiClient, PhotoUpload};
pub use config::ClientConfig;
pub use error::{ClientError, ClientErrorStatus, ClientResult};
pub use guard::{GuardDecision, RouteGuard};
pub use request::{HttpClient, ReqwestHttpClient};
pub use route::{AppRoute, Section};
pub use session::{
    AuthService, Credentials, OnboardingFlags, Session, SessionContext, SessionEvent, SessionPhase,
};
pub use storage::{FileStorage, MemoryStorage, SecureStorage, SessionStore};

use screens::discover::DiscoverScreen;
use screens::matches::MatchList;
use screens::messages::MessagesScreen;
use screens::onboarding::OnboardingChat;
use screens::photos::PhotoGallery;

// =========================================================
// Composition root
// =========================================================

/// One signed-in-or-not app instance: shared session, API client and screen factories.
pub struct MutualClient<C: HttpClient> {
    config: ClientConfig,
    auth: Rc<AuthService<C>>,
}

impl MutualClient<ReqwestHttpClient> {
    /// Production wiring: reqwest transport and the on-disk session file.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let http = ReqwestHttpClient::new(config.http_timeout)?;
        let storage = FileStorage::open(&config.session_file)?;
        info!(api = %config.api_base(), session_file = %config.session_file.display(), "Client configured");
        Ok(Self::with_parts(config, http, storage))
    }
}

impl<C: HttpClient> MutualClient<C> {
    pub fn with_parts(config: ClientConfig, http: C, storage: impl SecureStorage + 'static) -> Self {
        let ctx = SessionContext::new(SessionStore::new(storage));
        let api = Rc::new(ApiClient::new(config.api_base(), http, ctx));
        Self {
            config,
            auth: Rc::new(AuthService::new(api)),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> &Rc<AuthService<C>> {
        &self.auth
    }

    pub fn api(&self) -> &Rc<ApiClient<C>> {
        self.auth.api()
    }

    pub fn session(&self) -> &Rc<SessionContext> {
        self.api().session()
    }

    /// Restores the persisted session. Call once at start-up.
    pub async fn start(&self) -> Session {
        self.auth.restore().await
    }

    pub fn route_guard(&self, initial_path: &str) -> RouteGuard {
        RouteGuard::new(self.session(), initial_path)
    }

    pub fn discover(&self) -> DiscoverScreen<C> {
        DiscoverScreen::new(
            self.api().clone(),
            self.config.discover_page_size,
            self.config.match_banner,
        )
    }

    pub fn matches(&self) -> MatchList<C> {
        MatchList::new(self.api().clone(), self.config.matches_page_size)
    }

    pub fn messages(&self, match_id: &str) -> MessagesScreen<C> {
        MessagesScreen::new(self.api().clone(), match_id, self.config.message_poll)
    }

    pub fn photos(&self) -> PhotoGallery<C> {
        PhotoGallery::new(self.api().clone())
    }

    pub fn onboarding_chat(&self) -> OnboardingChat<C> {
        OnboardingChat::new(self.auth.clone(), self.config.intro_delay)
    }
}

use std::rc::Rc;

use tracing::{info, warn};

use super::{Credentials, OnboardingFlags, Session, SessionContext, SessionEvent};
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;

/// Drives the session lifecycle: restore, sign-in, sign-out, onboarding refresh.
pub struct AuthService<C: HttpClient> {
    api: Rc<ApiClient<C>>,
}

impl<C: HttpClient> AuthService<C> {
    pub fn new(api: Rc<ApiClient<C>>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Rc<ApiClient<C>> {
        &self.api
    }

    fn ctx(&self) -> &Rc<SessionContext> {
        self.api.session()
    }

    async fn fetch_flags(&self) -> ClientResult<OnboardingFlags> {
        self.api
            .chat_status()
            .await
            .map(|status| OnboardingFlags::from(&status))
    }

    fn persist_flags(&self, flags: &OnboardingFlags) {
        if let Err(e) = self.ctx().store().save_flags(flags) {
            warn!(error = %e, "Failed to cache onboarding flags");
        }
    }

    /// Runs once at start-up. Always leaves `is_loading` false.
    pub async fn restore(&self) -> Session {
        let ctx = self.ctx();
        let store = ctx.store();

        let credentials = match store.load_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Could not read stored credentials");
                None
            }
        };

        let Some(credentials) = credentials else {
            info!("No stored session");
            ctx.reset();
            return ctx.snapshot();
        };

        store.set_cached_token(Some(credentials.token.clone()));
        ctx.rearm_sign_out();

        match self.fetch_flags().await {
            Ok(flags) => {
                self.persist_flags(&flags);
                info!(user_id = %credentials.user_id, ?flags, "Session restored");
                ctx.publish(Session::signed_in(credentials, flags));
            }
            Err(e) if e.is_unauthorized() => {
                info!("Stored session rejected by server");
                ctx.reset();
            }
            Err(e) => {
                let flags = store.load_flags();
                warn!(error = %e, ?flags, "Onboarding status unavailable, using cached flags");
                ctx.publish(Session::signed_in(credentials, flags));
            }
        }

        ctx.snapshot()
    }

    /// Adopts fresh credentials. Observers see the new session only once the
    /// onboarding flags are known.
    pub async fn sign_in(&self, token: &str, user_id: &str) -> ClientResult<Session> {
        if token.is_empty() || user_id.is_empty() {
            return Err(ClientError::invalid_input("Missing token or user id").in_op("session.sign_in"));
        }

        let ctx = self.ctx();
        let store = ctx.store();
        let credentials = Credentials {
            token: token.to_string(),
            user_id: user_id.to_string(),
        };

        store
            .save_credentials(&credentials)
            .map_err(|e| e.in_op("session.sign_in"))?;
        store.set_cached_token(Some(credentials.token.clone()));
        ctx.rearm_sign_out();

        let flags = match self.fetch_flags().await {
            Ok(flags) => {
                self.persist_flags(&flags);
                flags
            }
            Err(e) if e.is_unauthorized() => {
                ctx.reset();
                return Err(e.in_op("session.sign_in"));
            }
            Err(e) => {
                let flags = store.load_flags();
                warn!(error = %e, ?flags, "Onboarding status unavailable, using cached flags");
                flags
            }
        };

        info!(user_id, ?flags, "Signed in");
        ctx.publish(Session::signed_in(credentials, flags));
        ctx.emit(SessionEvent::SignedIn {
            user_id: user_id.to_string(),
        });
        Ok(ctx.snapshot())
    }

    /// User-initiated. Safe to call when already signed out.
    pub fn sign_out(&self) {
        let ctx = self.ctx();
        let was_signed_in = ctx.snapshot().is_signed_in();
        ctx.reset();
        if was_signed_in {
            info!("Signed out");
            ctx.emit(SessionEvent::SignedOut);
        }
    }

    /// Re-reads onboarding status and republishes the flags. The token is untouched.
    pub async fn refresh_onboarding(&self) -> ClientResult<OnboardingFlags> {
        let ctx = self.ctx();
        let flags = self
            .fetch_flags()
            .await
            .map_err(|e| e.in_op("session.refresh_onboarding"))?;

        let current = ctx.snapshot();
        // signed out while the request was in flight
        let Some(credentials) = current.credentials else {
            return Ok(flags);
        };

        self.persist_flags(&flags);
        ctx.publish(Session::signed_in(credentials, flags));
        ctx.emit(SessionEvent::OnboardingUpdated(flags));
        Ok(flags)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let token = self
            .api
            .login(email, password)
            .await
            .map_err(|e| e.in_op("session.login"))?;
        self.sign_in(&token.access_token, &token.user_id).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> ClientResult<Session> {
        let token = self
            .api
            .signup(email, password)
            .await
            .map_err(|e| e.in_op("session.signup"))?;
        self.sign_in(&token.access_token, &token.user_id).await
    }
}

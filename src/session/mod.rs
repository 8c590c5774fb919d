//! Session state and its lifecycle.
//!
//! `Session` is the snapshot observers see; `SessionContext` owns the store
//! and the channels; `AuthService` drives the transitions.

mod auth;
mod context;

#[cfg(test)]
mod tests;

pub use auth::AuthService;
pub use context::SessionContext;

/// Onboarding progress as reported by `/chat/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnboardingFlags {
    pub profile_setup_complete: bool,
    pub dating_preferences_complete: bool,
    pub onboarding_complete: bool,
}

impl From<&mutual_shared::ChatStatus> for OnboardingFlags {
    fn from(status: &mutual_shared::ChatStatus) -> Self {
        Self {
            profile_setup_complete: status.profile_setup_complete,
            dating_preferences_complete: status.dating_preferences_complete,
            onboarding_complete: status.onboarding_complete(),
        }
    }
}

/// Token and user id always travel together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub credentials: Option<Credentials>,
    pub flags: OnboardingFlags,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Restoring,
    SignedOut,
    NeedsProfileSetup,
    NeedsDatingPreferences,
    NeedsOnboardingChat,
    Complete,
}

impl Session {
    /// State at process start, before restore has run.
    pub fn restoring() -> Self {
        Self {
            credentials: None,
            flags: OnboardingFlags::default(),
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            credentials: None,
            flags: OnboardingFlags::default(),
            is_loading: false,
        }
    }

    pub fn signed_in(credentials: Credentials, flags: OnboardingFlags) -> Self {
        Self {
            credentials: Some(credentials),
            flags,
            is_loading: false,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.user_id.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            return SessionPhase::Restoring;
        }
        if self.credentials.is_none() {
            return SessionPhase::SignedOut;
        }
        let f = &self.flags;
        if !f.profile_setup_complete {
            SessionPhase::NeedsProfileSetup
        } else if !f.dating_preferences_complete {
            SessionPhase::NeedsDatingPreferences
        } else if !f.onboarding_complete {
            SessionPhase::NeedsOnboardingChat
        } else {
            SessionPhase::Complete
        }
    }
}

/// Broadcast on every lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedOut,
    /// A 401 from an authenticated endpoint ended the session.
    ForcedSignOut,
    OnboardingUpdated(OnboardingFlags),
}

//! Application routes.
//!
//! Pure domain model; the guard decides which of these a session may see.

use std::fmt::Display;

const MESSAGES_PREFIX: &str = "/messages/";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppRoute {
    #[default]
    Login,
    Signup,
    ProfileSetup,
    DatingPreferences,
    OnboardingChat,
    Discover,
    Matches,
    Profile,
    /// Conversation with one match.
    Messages(String),
    NotFound,
}

/// Groups of routes the guard reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Auth,
    ProfileSetup,
    DatingPreferences,
    OnboardingChat,
    Main,
    NotFound,
}

impl Section {
    /// Where a redirect into this section lands.
    pub fn landing(&self) -> AppRoute {
        match self {
            Section::Auth => AppRoute::Login,
            Section::ProfileSetup => AppRoute::ProfileSetup,
            Section::DatingPreferences => AppRoute::DatingPreferences,
            Section::OnboardingChat => AppRoute::OnboardingChat,
            Section::Main | Section::NotFound => AppRoute::Discover,
        }
    }
}

impl AppRoute {
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            "/auth/login" => Self::Login,
            "/auth/signup" => Self::Signup,
            "/onboarding/profile-setup" => Self::ProfileSetup,
            "/onboarding/dating-preferences" => Self::DatingPreferences,
            "/onboarding" => Self::OnboardingChat,
            "/" | "/discover" => Self::Discover,
            "/matches" => Self::Matches,
            "/profile" => Self::Profile,
            other => match other.strip_prefix(MESSAGES_PREFIX) {
                Some(id) if !id.is_empty() && !id.contains('/') => Self::Messages(id.to_string()),
                _ => Self::NotFound,
            },
        }
    }

    pub fn to_path(&self) -> String {
        match self {
            Self::Login => "/auth/login".into(),
            Self::Signup => "/auth/signup".into(),
            Self::ProfileSetup => "/onboarding/profile-setup".into(),
            Self::DatingPreferences => "/onboarding/dating-preferences".into(),
            Self::OnboardingChat => "/onboarding".into(),
            Self::Discover => "/discover".into(),
            Self::Matches => "/matches".into(),
            Self::Profile => "/profile".into(),
            Self::Messages(id) => format!("{MESSAGES_PREFIX}{id}"),
            Self::NotFound => "/404".into(),
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Self::Login | Self::Signup => Section::Auth,
            Self::ProfileSetup => Section::ProfileSetup,
            Self::DatingPreferences => Section::DatingPreferences,
            Self::OnboardingChat => Section::OnboardingChat,
            Self::Discover | Self::Matches | Self::Profile | Self::Messages(_) => Section::Main,
            Self::NotFound => Section::NotFound,
        }
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for route in [
            AppRoute::Login,
            AppRoute::Signup,
            AppRoute::ProfileSetup,
            AppRoute::DatingPreferences,
            AppRoute::OnboardingChat,
            AppRoute::Discover,
            AppRoute::Matches,
            AppRoute::Profile,
            AppRoute::Messages("m-1".into()),
        ] {
            assert_eq!(AppRoute::from_path(&route.to_path()), route);
        }
    }

    #[test]
    fn loose_paths() {
        assert_eq!(AppRoute::from_path("/matches/?tab=new"), AppRoute::Matches);
        assert_eq!(AppRoute::from_path("/"), AppRoute::Discover);
        assert_eq!(AppRoute::from_path("/messages/"), AppRoute::NotFound);
        assert_eq!(AppRoute::from_path("/messages/a/b"), AppRoute::NotFound);
        assert_eq!(AppRoute::from_path("/nowhere"), AppRoute::NotFound);
    }
}

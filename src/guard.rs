//! Route guard: keeps the current route consistent with the session.

use tokio::sync::watch;
use tracing::{debug, info};

use crate::route::{AppRoute, Section};
use crate::session::{Session, SessionContext, SessionPhase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still restoring; show a loading indicator, do not redirect.
    Wait,
    Stay,
    Redirect(AppRoute),
}

/// Section a session belongs in.
pub fn required_section(session: &Session) -> Option<Section> {
    match session.phase() {
        SessionPhase::Restoring => None,
        SessionPhase::SignedOut => Some(Section::Auth),
        SessionPhase::NeedsProfileSetup => Some(Section::ProfileSetup),
        SessionPhase::NeedsDatingPreferences => Some(Section::DatingPreferences),
        SessionPhase::NeedsOnboardingChat => Some(Section::OnboardingChat),
        SessionPhase::Complete => Some(Section::Main),
    }
}

pub fn evaluate(session: &Session, route: &AppRoute) -> GuardDecision {
    let Some(required) = required_section(session) else {
        return GuardDecision::Wait;
    };
    let current = route.section();
    // a finished user on an unknown path gets the not-found screen
    if current == required || (required == Section::Main && current == Section::NotFound) {
        GuardDecision::Stay
    } else {
        GuardDecision::Redirect(required.landing())
    }
}

/// Navigation state driven by session changes.
pub struct RouteGuard {
    current: watch::Sender<AppRoute>,
    session: watch::Receiver<Session>,
}

impl RouteGuard {
    pub fn new(ctx: &SessionContext, initial_path: &str) -> Self {
        let (current, _) = watch::channel(AppRoute::from_path(initial_path));
        let guard = Self {
            current,
            session: ctx.subscribe(),
        };
        guard.sync();
        guard
    }

    pub fn current(&self) -> AppRoute {
        self.current.borrow().clone()
    }

    /// For views that render the current route.
    pub fn watch_route(&self) -> watch::Receiver<AppRoute> {
        self.current.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.session.borrow().is_loading
    }

    /// Requests a route; returns where navigation ended up.
    pub fn navigate(&self, path: &str) -> AppRoute {
        let target = AppRoute::from_path(path);
        let session = self.session.borrow().clone();
        let landed = match evaluate(&session, &target) {
            GuardDecision::Wait | GuardDecision::Stay => target,
            GuardDecision::Redirect(redirect) => {
                debug!(from = %target, to = %redirect, "Navigation redirected");
                redirect
            }
        };
        self.current.send_replace(landed.clone());
        landed
    }

    /// Re-checks the current route against the latest session. Returns the
    /// new route when a redirect happened.
    pub fn sync(&self) -> Option<AppRoute> {
        let session = self.session.borrow().clone();
        let route = self.current();
        match evaluate(&session, &route) {
            GuardDecision::Redirect(redirect) => {
                info!(from = %route, to = %redirect, phase = ?session.phase(), "Session changed, redirecting");
                self.current.send_replace(redirect.clone());
                Some(redirect)
            }
            GuardDecision::Wait | GuardDecision::Stay => None,
        }
    }

    /// Applies the guard on every published session until the context is dropped.
    pub async fn run(&self) {
        let mut changes = self.session.clone();
        self.sync();
        while changes.changed().await.is_ok() {
            self.sync();
        }
    }
}

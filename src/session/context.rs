use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use super::{Session, SessionEvent};
use crate::storage::SessionStore;

const EVENT_CAPACITY: usize = 16;

type SignOutFlight = Shared<LocalBoxFuture<'static, ()>>;

/// Owns the session store and publishes session state.
///
/// Injected into the HTTP layer at construction; there is no global state.
pub struct SessionContext {
    store: SessionStore,
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    /// Occupied from the first forced sign-out until the next sign-in.
    sign_out_flight: RefCell<Option<SignOutFlight>>,
}

impl SessionContext {
    pub fn new(store: SessionStore) -> Rc<Self> {
        let (state, _) = watch::channel(Session::restoring());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Rc::new(Self {
            store,
            state,
            events,
            sign_out_flight: RefCell::new(None),
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, session: Session) {
        self.state.send_replace(session);
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // no listeners is fine
        let _ = self.events.send(event);
    }

    /// Clears the mirror and every persisted key, then publishes a signed-out session.
    pub(crate) fn reset(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Session keys could not all be removed");
        }
        self.publish(Session::signed_out());
    }

    /// Allows the next 401 to start a new forced sign-out.
    pub(crate) fn rearm_sign_out(&self) {
        self.sign_out_flight.borrow_mut().take();
    }

    pub fn sign_out_in_progress(&self) -> bool {
        self.sign_out_flight.borrow().is_some()
    }

    /// Ends the session after an authenticated request was rejected.
    ///
    /// The first caller starts the teardown; concurrent and later callers
    /// await the same flight and trigger nothing of their own.
    pub async fn force_sign_out(self: &Rc<Self>) {
        let flight = {
            let mut slot = self.sign_out_flight.borrow_mut();
            slot.get_or_insert_with(|| {
                let ctx: Weak<Self> = Rc::downgrade(self);
                async move {
                    if let Some(ctx) = ctx.upgrade() {
                        info!("Session rejected by server, signing out");
                        ctx.reset();
                        ctx.emit(SessionEvent::ForcedSignOut);
                    }
                }
                .boxed_local()
                .shared()
            })
            .clone()
        };
        flight.await;
    }
}

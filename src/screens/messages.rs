use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use mutual_shared::Message;
use mutual_shared::chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};
use uuid::Uuid;

use super::Busy;
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;

pub const PLACEHOLDER_PREFIX: &str = "optimistic-";

// =========================================================
// Thread state
// =========================================================

/// Messages of one match, including at most one unconfirmed placeholder per send.
#[derive(Debug, Clone, Default)]
pub struct MessageThread {
    match_id: String,
    messages: Vec<Message>,
}

impl MessageThread {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            messages: Vec::new(),
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_placeholder(message: &Message) -> bool {
        message.id.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Appends a local copy of the outgoing message and returns its id.
    pub fn begin_send(&mut self, sender_id: &str, content: &str) -> String {
        let id = format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4());
        self.messages.push(Message {
            id: id.clone(),
            match_id: self.match_id.clone(),
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            read_at: None,
            created_at: Utc::now().to_rfc3339(),
        });
        id
    }

    /// Swaps the placeholder for the stored message, keeping its position.
    ///
    /// A poll may already have delivered the stored message, in which case the
    /// placeholder is simply dropped. Returns whether the placeholder was still shown.
    pub fn confirm(&mut self, placeholder_id: &str, message: Message) -> bool {
        let already_listed = self.messages.iter().any(|m| m.id == message.id);
        let slot = self.messages.iter().position(|m| m.id == placeholder_id);
        match (slot, already_listed) {
            (Some(index), true) => {
                self.messages.remove(index);
                true
            }
            (Some(index), false) => {
                self.messages[index] = message;
                true
            }
            (None, true) => false,
            (None, false) => {
                self.messages.push(message);
                false
            }
        }
    }

    pub fn rollback(&mut self, placeholder_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != placeholder_id);
        self.messages.len() != before
    }

    /// Adopts a polled list only when its length differs from the stored
    /// messages shown. Pending placeholders stay at the end.
    pub fn merge_poll(&mut self, fetched: Vec<Message>) -> bool {
        let stored = self.messages.iter().filter(|m| !Self::is_placeholder(m)).count();
        if fetched.len() == stored {
            return false;
        }
        let pending: Vec<Message> = self
            .messages
            .drain(..)
            .filter(Self::is_placeholder)
            .collect();
        self.messages = fetched;
        self.messages.extend(pending);
        true
    }
}

// =========================================================
// Screen
// =========================================================

pub struct MessagesScreen<C: HttpClient> {
    api: Rc<ApiClient<C>>,
    thread: RefCell<MessageThread>,
    sending: Cell<bool>,
    load_failed: Cell<bool>,
    poll_interval: Duration,
}

impl<C: HttpClient> MessagesScreen<C> {
    pub fn new(api: Rc<ApiClient<C>>, match_id: &str, poll_interval: Duration) -> Self {
        Self {
            api,
            thread: RefCell::new(MessageThread::new(match_id)),
            sending: Cell::new(false),
            load_failed: Cell::new(false),
            poll_interval,
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.thread.borrow().messages().to_vec()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.get()
    }

    /// Whether the last full load failed (the screen offers a retry).
    pub fn load_failed(&self) -> bool {
        self.load_failed.get()
    }

    /// Sent by the signed-in user.
    pub fn is_mine(&self, message: &Message) -> bool {
        self.api.session().snapshot().user_id() == Some(message.sender_id.as_str())
    }

    fn match_id(&self) -> String {
        self.thread.borrow().match_id().to_string()
    }

    pub async fn load(&self) -> ClientResult<()> {
        let match_id = self.match_id();
        match self.api.messages(&match_id).await {
            Ok(messages) => {
                self.load_failed.set(false);
                self.thread.borrow_mut().replace_all(messages);
                Ok(())
            }
            Err(e) => {
                error!(match_id = %match_id, error = %e, "Failed to load messages");
                self.load_failed.set(true);
                Err(e.in_op_with("messages.load", match_id))
            }
        }
    }

    /// Pull-to-refresh; same as a full load.
    pub async fn refresh(&self) -> ClientResult<()> {
        self.load().await
    }

    pub async fn send(&self, text: &str) -> ClientResult<Message> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ClientError::invalid_input("Message is empty").in_op("messages.send"));
        }
        let _busy = Busy::acquire(&self.sending, "messages.send")?;

        let match_id = self.match_id();
        let sender_id = self
            .api
            .session()
            .snapshot()
            .user_id()
            .unwrap_or_default()
            .to_string();
        let placeholder = self.thread.borrow_mut().begin_send(&sender_id, content);

        match self.api.send_message(&match_id, content).await {
            Ok(message) => {
                self.thread.borrow_mut().confirm(&placeholder, message.clone());
                Ok(message)
            }
            Err(e) => {
                error!(match_id = %match_id, error = %e, "Failed to send message");
                self.thread.borrow_mut().rollback(&placeholder);
                Err(e.in_op_with("messages.send", match_id))
            }
        }
    }

    /// Background refresh. Failures are ignored. Returns whether the list changed.
    pub async fn poll_once(&self) -> bool {
        let match_id = self.match_id();
        match self.api.messages(&match_id).await {
            Ok(messages) => self.thread.borrow_mut().merge_poll(messages),
            Err(e) => {
                debug!(match_id = %match_id, error = %e, "Message poll failed");
                false
            }
        }
    }

    /// Polls until the future is dropped (i.e. the screen goes away).
    pub async fn run_polling(&self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mutual_shared::ChatReply;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::Busy;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;
use crate::session::AuthService;
use crate::timer::OneShotTimer;

pub const GREETING: &str = "Hello";
pub const SEND_FAILED_LINE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    fn from_wire(role: &str) -> Self {
        if role == "user" {
            ChatRole::User
        } else {
            ChatRole::Assistant
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub role: ChatRole,
    pub content: String,
}

impl ChatLine {
    fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
        }
    }

    fn assistant(content: &str) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.to_string(),
        }
    }
}

type Lines = Arc<watch::Sender<Vec<ChatLine>>>;

fn push_lines(lines: &Lines, new: Vec<ChatLine>) {
    if !new.is_empty() {
        lines.send_modify(|all| all.extend(new));
    }
}

/// Conversational onboarding. Completing it unlocks the main app.
pub struct OnboardingChat<C: HttpClient> {
    auth: Rc<AuthService<C>>,
    lines: Lines,
    /// Intro lines not yet revealed; shared with the reveal timer.
    pending_intro: Arc<Mutex<Vec<String>>>,
    intro_timer: OneShotTimer,
    intro_delay: Duration,
    sending: Cell<bool>,
}

impl<C: HttpClient> OnboardingChat<C> {
    pub fn new(auth: Rc<AuthService<C>>, intro_delay: Duration) -> Self {
        let (lines, _) = watch::channel(Vec::new());
        Self {
            auth,
            lines: Arc::new(lines),
            pending_intro: Arc::new(Mutex::new(Vec::new())),
            intro_timer: OneShotTimer::new(),
            intro_delay,
            sending: Cell::new(false),
        }
    }

    pub fn lines(&self) -> Vec<ChatLine> {
        self.lines.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<ChatLine>> {
        self.lines.subscribe()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.get()
    }

    /// Shows the stored conversation, or opens a new one.
    pub async fn start(&self) -> ClientResult<()> {
        let api = self.auth.api();
        match api.chat_history().await {
            Ok(history) if !history.is_empty() => {
                let lines = history
                    .iter()
                    .map(|m| ChatLine {
                        role: ChatRole::from_wire(&m.role),
                        content: m.content.clone(),
                    })
                    .collect();
                self.lines.send_replace(lines);
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to load chat history"),
        }

        match api.chat_intro().await {
            Ok(intro) if !intro.messages.is_empty() => {
                self.show_intro(intro.messages);
                Ok(())
            }
            result => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to load chat intro, greeting instead");
                }
                self.send(GREETING).await.map(|_| ())
            }
        }
    }

    /// First line now, the rest after the intro delay.
    fn show_intro(&self, mut messages: Vec<String>) {
        let rest = messages.split_off(1);
        push_lines(
            &self.lines,
            messages.iter().map(|m| ChatLine::assistant(m)).collect(),
        );
        if rest.is_empty() {
            return;
        }

        if let Ok(mut pending) = self.pending_intro.lock() {
            *pending = rest;
        }
        let lines = Arc::clone(&self.lines);
        let pending = Arc::clone(&self.pending_intro);
        self.intro_timer.schedule(self.intro_delay, move || {
            let rest = pending.lock().map(|mut p| std::mem::take(&mut *p)).unwrap_or_default();
            push_lines(&lines, rest.iter().map(|m| ChatLine::assistant(m)).collect());
        });
    }

    /// Reveals any intro lines still waiting on the timer.
    fn flush_intro(&self) {
        self.intro_timer.cancel();
        let rest = self
            .pending_intro
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default();
        push_lines(&self.lines, rest.iter().map(|m| ChatLine::assistant(m)).collect());
    }

    pub async fn send(&self, text: &str) -> ClientResult<ChatReply> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ClientError::invalid_input("Message is empty").in_op("onboarding.send"));
        }
        let _busy = Busy::acquire(&self.sending, "onboarding.send")?;

        self.flush_intro();
        push_lines(&self.lines, vec![ChatLine::user(message)]);

        let reply = match self.auth.api().send_chat(message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Failed to send chat message");
                push_lines(&self.lines, vec![ChatLine::assistant(SEND_FAILED_LINE)]);
                return Err(e.in_op("onboarding.send"));
            }
        };
        push_lines(&self.lines, vec![ChatLine::assistant(&reply.reply)]);

        if reply.onboarding_status == mutual_shared::ONBOARDING_COMPLETED {
            info!("Onboarding chat completed");
            if let Err(e) = self.auth.refresh_onboarding().await {
                warn!(error = %e, "Could not refresh onboarding status");
            }
        }
        Ok(reply)
    }
}

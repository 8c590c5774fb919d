use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use mutual_shared::{DiscoverPage, DiscoverUser};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::Busy;
use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;
use crate::timer::OneShotTimer;

const FALLBACK_MATCH_NAME: &str = "Someone";

// =========================================================
// Queue
// =========================================================

/// Loaded candidates plus the cursor into them.
#[derive(Debug, Default, Clone)]
pub struct DiscoveryQueue {
    users: Vec<DiscoverUser>,
    cursor: usize,
    /// Items fetched since the last reset; the offset of the next page.
    offset: u32,
}

impl DiscoveryQueue {
    pub fn current(&self) -> Option<&DiscoverUser> {
        self.users.get(self.cursor)
    }

    pub fn next_offset(&self) -> u32 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.users.len()
    }

    pub fn reset(&mut self, page: DiscoverPage) {
        self.offset = page.users.len() as u32;
        self.users = page.users;
        self.cursor = 0;
    }

    pub fn append(&mut self, page: DiscoverPage) -> usize {
        let added = page.users.len();
        self.offset += added as u32;
        self.users.extend(page.users);
        added
    }

    /// Moves past the current candidate. Returns true when the loaded page is used up.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.users.len() {
            self.cursor += 1;
        }
        self.is_exhausted()
    }
}

// =========================================================
// Match banner
// =========================================================

/// "It's a match" notice that hides itself after a fixed interval.
pub struct MatchBanner {
    name: Arc<watch::Sender<Option<String>>>,
    dismiss: OneShotTimer,
    duration: Duration,
}

impl MatchBanner {
    pub fn new(duration: Duration) -> Self {
        let (name, _) = watch::channel(None);
        Self {
            name: Arc::new(name),
            dismiss: OneShotTimer::new(),
            duration,
        }
    }

    /// Shows the banner, replacing any visible one and its pending dismissal.
    pub fn show(&self, display_name: Option<&str>) {
        let name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_MATCH_NAME)
            .to_string();
        self.name.send_replace(Some(name));

        let slot = Arc::clone(&self.name);
        self.dismiss.schedule(self.duration, move || {
            slot.send_replace(None);
        });
    }

    pub fn dismiss(&self) {
        self.dismiss.cancel();
        self.name.send_replace(None);
    }

    /// Name of the matched user while the banner is visible.
    pub fn visible(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub fn text(&self) -> Option<String> {
        self.visible().map(|name| format!("It's a match with {name}!"))
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.name.subscribe()
    }
}

// =========================================================
// Screen
// =========================================================

pub struct DiscoverScreen<C: HttpClient> {
    api: Rc<ApiClient<C>>,
    queue: RefCell<DiscoveryQueue>,
    page_size: u32,
    banner: MatchBanner,
    acting: Cell<bool>,
}

impl<C: HttpClient> DiscoverScreen<C> {
    pub fn new(api: Rc<ApiClient<C>>, page_size: u32, banner_duration: Duration) -> Self {
        Self {
            api,
            queue: RefCell::new(DiscoveryQueue::default()),
            page_size,
            banner: MatchBanner::new(banner_duration),
            acting: Cell::new(false),
        }
    }

    pub fn current(&self) -> Option<DiscoverUser> {
        self.queue.borrow().current().cloned()
    }

    pub fn queue(&self) -> DiscoveryQueue {
        self.queue.borrow().clone()
    }

    pub fn banner(&self) -> &MatchBanner {
        &self.banner
    }

    pub fn is_acting(&self) -> bool {
        self.acting.get()
    }

    /// Starts over from offset zero and replaces the list.
    pub async fn refresh(&self) -> ClientResult<()> {
        let page = self
            .api
            .discover(self.page_size, 0)
            .await
            .map_err(|e| e.in_op("discover.refresh"))?;
        debug!(count = page.users.len(), "Discover list replaced");
        self.queue.borrow_mut().reset(page);
        Ok(())
    }

    /// Fetches the next page after everything loaded so far and appends it.
    pub async fn load_more(&self) -> ClientResult<usize> {
        let offset = self.queue.borrow().next_offset();
        let page = self
            .api
            .discover(self.page_size, offset)
            .await
            .map_err(|e| e.in_op_with("discover.load_more", offset.to_string()))?;
        let added = self.queue.borrow_mut().append(page);
        debug!(offset, added, "Discover page appended");
        Ok(added)
    }

    pub async fn like(&self) -> ClientResult<bool> {
        let _busy = Busy::acquire(&self.acting, "discover.like")?;
        let user = self.require_current("discover.like")?;

        let resp = self.api.like(&user.id).await.map_err(|e| {
            error!(error = %e, "Failed to like user");
            e.in_op("discover.like")
        })?;

        if resp.is_match {
            info!(match_id = ?resp.match_id, "New match");
            self.banner.show(user.display_name.as_deref());
        }
        self.advance().await;
        Ok(resp.is_match)
    }

    pub async fn pass(&self) -> ClientResult<()> {
        let _busy = Busy::acquire(&self.acting, "discover.pass")?;
        let user = self.require_current("discover.pass")?;

        self.api.pass(&user.id).await.map_err(|e| {
            error!(error = %e, "Failed to pass user");
            e.in_op("discover.pass")
        })?;

        self.advance().await;
        Ok(())
    }

    fn require_current(&self, op: &str) -> ClientResult<DiscoverUser> {
        self.current()
            .ok_or_else(|| ClientError::invalid_input("No one left to discover").in_op(op))
    }

    async fn advance(&self) {
        let exhausted = self.queue.borrow_mut().advance();
        if exhausted {
            if let Err(e) = self.load_more().await {
                warn!(error = %e, "Could not load more candidates");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientErrorStatus;
    use crate::request::HttpMethod;
    use crate::testing::{TestApp, page_json};
    use serde_json::json;

    const BANNER: Duration = Duration::from_millis(2500);

    fn screen(app: &TestApp) -> DiscoverScreen<Rc<crate::request::MockHttpClient>> {
        DiscoverScreen::new(app.api.clone(), 2, BANNER)
    }

    fn like_json(id: &str, is_match: bool) -> serde_json::Value {
        json!({"liked_user_id": id, "is_match": is_match, "match_id": if is_match { Some("m1") } else { None }})
    }

    #[tokio::test]
    async fn exhausting_page_fetches_at_loaded_offset() {
        let app = TestApp::signed_in();
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["a", "b"], 0));
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["c", "d"], 2));
        app.mock(HttpMethod::Post, "/matches/pass", 200, json!({"passed_user_id": "x"}));
        let screen = screen(&app);

        screen.refresh().await.unwrap();
        screen.pass().await.unwrap();
        assert_eq!(screen.current().unwrap().id, "b");
        screen.pass().await.unwrap();

        let req = app.http.last_request().unwrap();
        assert_eq!(req.url, app.url("/discover?limit=2&offset=2"));
        assert_eq!(screen.current().unwrap().id, "c");
        assert_eq!(screen.queue().len(), 4);
        assert_eq!(screen.queue().next_offset(), 4);
    }

    #[tokio::test]
    async fn refresh_resets_offset_and_replaces() {
        let app = TestApp::signed_in();
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["a", "b"], 0));
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["c", "d"], 2));
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["e"], 0));
        let screen = screen(&app);

        screen.refresh().await.unwrap();
        screen.load_more().await.unwrap();
        assert_eq!(screen.queue().len(), 4);

        screen.refresh().await.unwrap();
        let req = app.http.last_request().unwrap();
        assert_eq!(req.url, app.url("/discover?limit=2&offset=0"));
        assert_eq!(screen.queue().len(), 1);
        assert_eq!(screen.queue().next_offset(), 1);
        assert_eq!(screen.current().unwrap().id, "e");
    }

    #[tokio::test]
    async fn failed_like_leaves_state_unchanged() {
        let app = TestApp::signed_in();
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["a", "b"], 0));
        app.mock(HttpMethod::Post, "/matches/like", 500, json!({"detail": "oops"}));
        let screen = screen(&app);
        screen.refresh().await.unwrap();

        assert!(screen.like().await.is_err());
        assert_eq!(screen.current().unwrap().id, "a");
        assert!(!screen.is_acting());
        assert_eq!(screen.banner().visible(), None);
    }

    #[tokio::test]
    async fn actions_are_rejected_while_one_is_pending() {
        let app = TestApp::signed_in();
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["a", "b"], 0));
        app.mock(HttpMethod::Post, "/matches/like", 200, like_json("a", false));
        let screen = screen(&app);
        screen.refresh().await.unwrap();
        app.http.hold_until_concurrent(2);

        let (first, second) = futures::join!(screen.like(), async {
            let rejected = screen.pass().await;
            app.api.account_status().await.ok();
            rejected
        });
        app.http.release_hold();

        assert!(!first.unwrap());
        assert_eq!(second.unwrap_err().status, ClientErrorStatus::InvalidInput);
        assert_eq!(screen.current().unwrap().id, "b");
    }

    #[tokio::test]
    async fn empty_queue_rejects_swipes() {
        let app = TestApp::signed_in();
        let screen = screen(&app);
        assert_eq!(screen.like().await.unwrap_err().status, ClientErrorStatus::InvalidInput);
        assert_eq!(app.http.requests.borrow().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn match_banner_shows_name_then_hides() {
        let app = TestApp::signed_in();
        app.mock(HttpMethod::Get, "/discover", 200, json!({
            "users": [crate::testing::user_json("a", None), crate::testing::user_json("b", Some("Bea"))],
            "total": 2, "limit": 2, "offset": 0
        }));
        app.mock(HttpMethod::Post, "/matches/like", 200, like_json("a", true));
        let screen = screen(&app);
        screen.refresh().await.unwrap();

        assert!(screen.like().await.unwrap());
        assert_eq!(screen.banner().visible().as_deref(), Some("Someone"));
        assert_eq!(screen.banner().text().as_deref(), Some("It's a match with Someone!"));

        tokio::time::sleep(BANNER + Duration::from_millis(1)).await;
        assert_eq!(screen.banner().visible(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_match_replaces_banner_and_its_timer() {
        let app = TestApp::signed_in();
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&["Ann", "Bob"], 0));
        app.mock(HttpMethod::Post, "/matches/like", 200, like_json("x", true));
        app.mock(HttpMethod::Get, "/discover", 200, page_json(&[], 2));
        let screen = screen(&app);
        screen.refresh().await.unwrap();
        let mut banner = screen.banner().subscribe();

        screen.like().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        screen.like().await.unwrap();
        assert_eq!(*banner.borrow_and_update(), Some("Bob".to_string()));

        // the first dismissal would have fired here
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(screen.banner().visible().as_deref(), Some("Bob"));
        assert!(!banner.has_changed().unwrap());

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(screen.banner().visible(), None);
    }
}

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mutual_shared::{Match, MatchPage};
use tracing::{debug, error, info};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;

/// The user's matches, newest first as served.
pub struct MatchList<C: HttpClient> {
    api: Rc<ApiClient<C>>,
    page_size: u32,
    matches: RefCell<Vec<Match>>,
    /// Server-reported total from the last page.
    total: Cell<u32>,
    offset: Cell<u32>,
}

impl<C: HttpClient> MatchList<C> {
    pub fn new(api: Rc<ApiClient<C>>, page_size: u32) -> Self {
        Self {
            api,
            page_size,
            matches: RefCell::new(Vec::new()),
            total: Cell::new(0),
            offset: Cell::new(0),
        }
    }

    pub fn matches(&self) -> Vec<Match> {
        self.matches.borrow().clone()
    }

    pub fn find(&self, match_id: &str) -> Option<Match> {
        self.matches.borrow().iter().find(|m| m.id == match_id).cloned()
    }

    pub fn has_more(&self) -> bool {
        self.offset.get() < self.total.get()
    }

    fn absorb(&self, page: MatchPage, replace: bool) -> usize {
        let added = page.matches.len();
        self.total.set(page.total);
        let mut matches = self.matches.borrow_mut();
        if replace {
            *matches = page.matches;
            self.offset.set(added as u32);
        } else {
            matches.extend(page.matches);
            self.offset.set(self.offset.get() + added as u32);
        }
        added
    }

    pub async fn refresh(&self) -> ClientResult<()> {
        let page = self
            .api
            .matches(self.page_size, 0)
            .await
            .map_err(|e| e.in_op("matches.refresh"))?;
        let count = self.absorb(page, true);
        debug!(count, "Match list replaced");
        Ok(())
    }

    pub async fn load_more(&self) -> ClientResult<usize> {
        let offset = self.offset.get();
        let page = self
            .api
            .matches(self.page_size, offset)
            .await
            .map_err(|e| e.in_op_with("matches.load_more", offset.to_string()))?;
        Ok(self.absorb(page, false))
    }

    /// Blocks the other person in a match. The match disappears only once the server agrees.
    pub async fn block(&self, match_id: &str) -> ClientResult<()> {
        let other_user_id = self
            .find(match_id)
            .map(|m| m.other_user.id)
            .ok_or_else(|| {
                ClientError::invalid_input("Unknown match").in_op_with("matches.block", match_id)
            })?;

        self.api.block(&other_user_id).await.map_err(|e| {
            error!(match_id, error = %e, "Failed to block user");
            e.in_op_with("matches.block", match_id)
        })?;
        info!(match_id, "Blocked match");

        self.matches.borrow_mut().retain(|m| m.id != match_id);
        self.offset.set(self.offset.get().saturating_sub(1));
        self.total.set(self.total.get().saturating_sub(1));
        Ok(())
    }
}

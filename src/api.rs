use std::path::Path;
use std::rc::Rc;

use mutual_shared::protocol::*;
use mutual_shared::{
    AccountStatus, BlockResponse, BlockedUserPage, ChatIntro, ChatMessage, ChatReply, ChatStatus,
    DiscoverPage, HEADER_AUTHORIZATION, LikeResponse, MatchPage, Message, PassResponse, Photo,
    ProfileData, ProfileSetupRequest, ProfileUpdate, TokenResponse, UserProfile, UserUpdate,
};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::request::{FilePart, HttpClient, HttpRequest, HttpResponse};
use crate::session::SessionContext;

// =========================================================
// Photo upload payload
// =========================================================

const PHOTO_FIELD: &str = "file";
const DEFAULT_PHOTO_NAME: &str = "photo.jpg";

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let file_name = if file_name.is_empty() {
            DEFAULT_PHOTO_NAME.to_string()
        } else {
            file_name
        };
        Self {
            content_type: Self::content_type_for(&file_name),
            file_name,
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ClientError::from(e).in_op_with("photo.read", path.display().to_string()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_bytes(file_name, bytes))
    }

    /// `image/<ext>`, with `jpg` spelled `jpeg` and `jpeg` when there is no extension.
    pub fn content_type_for(file_name: &str) -> String {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        match ext.as_deref() {
            None | Some("jpg") => "image/jpeg".to_string(),
            Some(ext) => format!("image/{ext}"),
        }
    }
}

// =========================================================
// API client
// =========================================================

/// Authenticated access to the backend.
///
/// Every call carries the session's bearer token. A 401 from anything other
/// than login/signup ends the session through the shared context.
pub struct ApiClient<C: HttpClient> {
    base: String,
    client: C,
    session: Rc<SessionContext>,
}

impl<C: HttpClient> ApiClient<C> {
    pub fn new(base: impl Into<String>, client: C, session: Rc<SessionContext>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            client,
            session,
        }
    }

    pub fn session(&self) -> &Rc<SessionContext> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    /// Attaches the bearer header and returns the token it carries.
    fn authorize(&self, req: HttpRequest) -> (HttpRequest, Option<String>) {
        match self.session.store().token() {
            Some(token) => {
                let req = req.with_header(HEADER_AUTHORIZATION, &format!("Bearer {token}"));
                (req, Some(token))
            }
            None => (req, None),
        }
    }

    /// Sends the request and applies the response interception rules.
    async fn dispatch(&self, path: &str, req: HttpRequest) -> ClientResult<HttpResponse> {
        let method = req.method;
        let (req, sent_token) = self.authorize(req);
        let resp = self
            .client
            .send(req)
            .await
            .map_err(|e| e.in_op_with("api.send", path.to_string()))?;

        debug!(method = method.as_str(), path, status = resp.status, "API response");

        if resp.ok() {
            return Ok(resp);
        }

        if resp.status == 401 && !is_auth_path(path) {
            // only the token still in use can end the session
            if sent_token.is_some() && sent_token == self.session.store().cached_token() {
                warn!(path, "Authenticated request rejected");
                self.session.force_sign_out().await;
            } else {
                debug!(path, "Ignoring 401 for a token that is no longer current");
            }
        }

        Err(ClientError::from_response(resp.status, &resp.body).in_op_with("api.send", path.to_string()))
    }

    /// Generic typed call. Bodyless methods carry the request's fields as a query string.
    pub async fn call<R: ApiRequest>(&self, req: &R) -> ClientResult<R::Response> {
        let path = req.path();
        let payload = serde_json::to_value(req)?;

        let http = if R::METHOD.has_body() {
            let http = HttpRequest::new(&self.url(&path), R::METHOD);
            match payload {
                Value::Null => http,
                body => http.with_json(body),
            }
        } else {
            HttpRequest::new(&self.query_url(&path, &payload)?, R::METHOD)
        };

        self.dispatch(&path, http)
            .await?
            .json::<R::Response>()
            .map_err(|e| e.in_op_with("api.decode", path))
    }

    fn query_url(&self, path: &str, payload: &Value) -> ClientResult<String> {
        let Value::Object(fields) = payload else {
            return Ok(self.url(path));
        };
        if fields.is_empty() {
            return Ok(self.url(path));
        }

        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ClientError::invalid_input(e.to_string()).in_op_with("api.url", path.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in fields {
                match value {
                    Value::Null => {}
                    Value::String(s) => {
                        pairs.append_pair(key, s);
                    }
                    other => {
                        pairs.append_pair(key, &other.to_string());
                    }
                }
            }
        }
        Ok(url.to_string())
    }

    // --- Auth ---

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        self.call(&LoginRequest {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        })
        .await
    }

    pub async fn signup(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        self.call(&SignupRequest {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
        })
        .await
    }

    // --- Onboarding chat ---

    pub async fn send_chat(&self, message: &str) -> ClientResult<ChatReply> {
        self.call(&ChatRequest {
            message: message.to_string(),
        })
        .await
    }

    pub async fn chat_history(&self) -> ClientResult<Vec<ChatMessage>> {
        self.call(&ChatHistoryRequest).await
    }

    pub async fn chat_status(&self) -> ClientResult<ChatStatus> {
        self.call(&ChatStatusRequest).await
    }

    pub async fn chat_intro(&self) -> ClientResult<ChatIntro> {
        self.call(&ChatIntroRequest).await
    }

    // --- Discovery & matching ---

    pub async fn discover(&self, limit: u32, offset: u32) -> ClientResult<DiscoverPage> {
        self.call(&DiscoverRequest { limit, offset }).await
    }

    pub async fn like(&self, user_id: &str) -> ClientResult<LikeResponse> {
        self.call(&LikeRequest {
            liked_user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn pass(&self, user_id: &str) -> ClientResult<PassResponse> {
        self.call(&PassRequest {
            passed_user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn matches(&self, limit: u32, offset: u32) -> ClientResult<MatchPage> {
        self.call(&ListMatchesRequest { limit, offset }).await
    }

    pub async fn messages(&self, match_id: &str) -> ClientResult<Vec<Message>> {
        self.call(&ListMessagesRequest {
            match_id: match_id.to_string(),
        })
        .await
    }

    pub async fn send_message(&self, match_id: &str, content: &str) -> ClientResult<Message> {
        self.call(&SendMessageRequest {
            match_id: match_id.to_string(),
            content: content.to_string(),
        })
        .await
    }

    // --- Profile ---

    pub async fn my_profile(&self) -> ClientResult<UserProfile> {
        self.call(&MyProfileRequest).await
    }

    pub async fn update_my_profile(&self, update: &UserUpdate) -> ClientResult<UserProfile> {
        self.call(update).await
    }

    pub async fn update_profile_details(&self, update: &ProfileUpdate) -> ClientResult<ProfileData> {
        self.call(update).await
    }

    pub async fn submit_profile_setup(&self, setup: &ProfileSetupRequest) -> ClientResult<UserProfile> {
        self.call(setup).await
    }

    pub async fn upload_photo(&self, upload: &PhotoUpload) -> ClientResult<Photo> {
        let req = HttpRequest::new(&self.url(PATH_PHOTOS), HttpMethod::Post).with_file(FilePart {
            field: PHOTO_FIELD.to_string(),
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            bytes: upload.bytes.clone(),
        });
        self.dispatch(PATH_PHOTOS, req)
            .await?
            .json::<Photo>()
            .map_err(|e| e.in_op_with("api.decode", PATH_PHOTOS))
    }

    pub async fn delete_photo(&self, photo_id: &str) -> ClientResult<()> {
        self.call(&DeletePhotoRequest {
            photo_id: photo_id.to_string(),
        })
        .await
    }

    // --- Blocking ---

    pub async fn block(&self, user_id: &str) -> ClientResult<BlockResponse> {
        self.call(&BlockRequest {
            blocked_user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn blocked_users(&self) -> ClientResult<BlockedUserPage> {
        self.call(&ListBlocksRequest).await
    }

    pub async fn unblock(&self, user_id: &str) -> ClientResult<()> {
        self.call(&UnblockRequest {
            blocked_user_id: user_id.to_string(),
        })
        .await
    }

    // --- Account ---

    pub async fn deactivate(&self) -> ClientResult<AccountStatus> {
        self.call(&DeactivateAccountRequest).await
    }

    pub async fn reactivate(&self) -> ClientResult<AccountStatus> {
        self.call(&ReactivateAccountRequest).await
    }

    pub async fn account_status(&self) -> ClientResult<AccountStatus> {
        self.call(&AccountStatusRequest).await
    }
}

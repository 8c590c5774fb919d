use crate::{
    AccountStatus, BlockResponse, BlockedUserPage, ChatIntro, ChatMessage, ChatReply, ChatStatus,
    DiscoverPage, LikeResponse, MatchPage, Message, PassResponse, ProfileData,
    ProfileSetupRequest, ProfileUpdate, TokenResponse, UserProfile, UserUpdate,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Whether the request is sent as a JSON body rather than a query string.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest: Serialize + DeserializeOwned {
    /// The response type returned by this request.
    type Response: Serialize + DeserializeOwned;
    /// The URL path (relative to the API prefix). May contain `{placeholders}`.
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;

    /// Concrete path for this request. Requests with path parameters override this.
    fn path(&self) -> String {
        Self::PATH.to_string()
    }
}

pub const PATH_LOGIN: &str = "/auth/login";
pub const PATH_SIGNUP: &str = "/auth/signup";

/// Login and signup answer 401 for bad credentials; that must not end the session.
pub fn is_auth_path(path: &str) -> bool {
    path.contains(PATH_LOGIN) || path.contains(PATH_SIGNUP)
}

// =========================================================
// Auth
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl ApiRequest for LoginRequest {
    type Response = TokenResponse;
    const PATH: &'static str = PATH_LOGIN;
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

impl ApiRequest for SignupRequest {
    type Response = TokenResponse;
    const PATH: &'static str = PATH_SIGNUP;
    const METHOD: HttpMethod = HttpMethod::Post;
}

// =========================================================
// Onboarding chat
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

impl ApiRequest for ChatRequest {
    type Response = ChatReply;
    const PATH: &'static str = "/chat";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatHistoryRequest;

impl ApiRequest for ChatHistoryRequest {
    type Response = Vec<ChatMessage>;
    const PATH: &'static str = "/chat/history";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatStatusRequest;

impl ApiRequest for ChatStatusRequest {
    type Response = ChatStatus;
    const PATH: &'static str = "/chat/status";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatIntroRequest;

impl ApiRequest for ChatIntroRequest {
    type Response = ChatIntro;
    const PATH: &'static str = "/chat/intro";
    const METHOD: HttpMethod = HttpMethod::Get;
}

// =========================================================
// Discovery & matching
// =========================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DiscoverRequest {
    pub limit: u32,
    pub offset: u32,
}

impl ApiRequest for DiscoverRequest {
    type Response = DiscoverPage;
    const PATH: &'static str = "/discover";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRequest {
    pub liked_user_id: String,
}

impl ApiRequest for LikeRequest {
    type Response = LikeResponse;
    const PATH: &'static str = "/matches/like";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassRequest {
    pub passed_user_id: String,
}

impl ApiRequest for PassRequest {
    type Response = PassResponse;
    const PATH: &'static str = "/matches/pass";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListMatchesRequest {
    pub limit: u32,
    pub offset: u32,
}

impl ApiRequest for ListMatchesRequest {
    type Response = MatchPage;
    const PATH: &'static str = "/matches";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesRequest {
    #[serde(skip)]
    pub match_id: String,
}

impl ApiRequest for ListMessagesRequest {
    type Response = Vec<Message>;
    const PATH: &'static str = "/matches/{match_id}/messages";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        Self::PATH.replace("{match_id}", &self.match_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    #[serde(skip)]
    pub match_id: String,
    pub content: String,
}

impl ApiRequest for SendMessageRequest {
    type Response = Message;
    const PATH: &'static str = "/matches/{match_id}/messages";
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        Self::PATH.replace("{match_id}", &self.match_id)
    }
}

// =========================================================
// Profile
// =========================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MyProfileRequest;

impl ApiRequest for MyProfileRequest {
    type Response = UserProfile;
    const PATH: &'static str = "/profile/me";
    const METHOD: HttpMethod = HttpMethod::Get;
}

impl ApiRequest for UserUpdate {
    type Response = UserProfile;
    const PATH: &'static str = "/profile/me";
    const METHOD: HttpMethod = HttpMethod::Put;
}

impl ApiRequest for ProfileUpdate {
    type Response = ProfileData;
    const PATH: &'static str = "/profile/me/profile";
    const METHOD: HttpMethod = HttpMethod::Put;
}

impl ApiRequest for ProfileSetupRequest {
    type Response = UserProfile;
    const PATH: &'static str = "/profile/me/setup";
    const METHOD: HttpMethod = HttpMethod::Post;
}

/// Multipart uploads go through a dedicated client call; only the path lives here.
pub const PATH_PHOTOS: &str = "/profile/me/photos";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePhotoRequest {
    #[serde(skip)]
    pub photo_id: String,
}

impl ApiRequest for DeletePhotoRequest {
    type Response = ();
    const PATH: &'static str = "/profile/me/photos/{photo_id}";
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        Self::PATH.replace("{photo_id}", &self.photo_id)
    }
}

// =========================================================
// Blocking
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRequest {
    pub blocked_user_id: String,
}

impl ApiRequest for BlockRequest {
    type Response = BlockResponse;
    const PATH: &'static str = "/block";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListBlocksRequest;

impl ApiRequest for ListBlocksRequest {
    type Response = BlockedUserPage;
    const PATH: &'static str = "/block";
    const METHOD: HttpMethod = HttpMethod::Get;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnblockRequest {
    #[serde(skip)]
    pub blocked_user_id: String,
}

impl ApiRequest for UnblockRequest {
    type Response = ();
    const PATH: &'static str = "/block/{blocked_user_id}";
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        Self::PATH.replace("{blocked_user_id}", &self.blocked_user_id)
    }
}

// =========================================================
// Account
// =========================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DeactivateAccountRequest;

impl ApiRequest for DeactivateAccountRequest {
    type Response = AccountStatus;
    const PATH: &'static str = "/account/deactivate";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReactivateAccountRequest;

impl ApiRequest for ReactivateAccountRequest {
    type Response = AccountStatus;
    const PATH: &'static str = "/account/reactivate";
    const METHOD: HttpMethod = HttpMethod::Post;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountStatusRequest;

impl ApiRequest for AccountStatusRequest {
    type Response = AccountStatus;
    const PATH: &'static str = "/account/status";
    const METHOD: HttpMethod = HttpMethod::Get;
}

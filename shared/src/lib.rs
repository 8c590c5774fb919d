use serde::{Deserialize, Serialize};

pub use chrono;

pub mod protocol;

// =========================================================
// Constants
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const ONBOARDING_COMPLETED: &str = "completed";

/// Persisted session keys. Booleans are stored as "1"/"0".
pub const KEY_TOKEN: &str = "token";
pub const KEY_USER_ID: &str = "userId";
pub const KEY_PROFILE_SETUP_COMPLETE: &str = "profileSetupComplete";
pub const KEY_DATING_PREFERENCES_COMPLETE: &str = "datingPreferencesComplete";
pub const KEY_ONBOARDING_COMPLETE: &str = "onboardingComplete";

pub const SESSION_KEYS: [&str; 5] = [
    KEY_TOKEN,
    KEY_USER_ID,
    KEY_PROFILE_SETUP_COMPLETE,
    KEY_DATING_PREFERENCES_COMPLETE,
    KEY_ONBOARDING_COMPLETE,
];

// =========================================================
// Auth
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// =========================================================
// Profile
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub file_path: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order_index: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileData {
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub values: Option<Vec<String>>,
    pub personality_traits: Option<Vec<String>>,
    pub relationship_goals: Option<String>,
    pub communication_style: Option<String>,
    #[serde(default)]
    pub profile_completeness: f64,
}

/// The signed-in user's own record (`/profile/me`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub gender_preference: Option<Vec<String>>,
    pub location: Option<String>,
    #[serde(default = "default_age_min")]
    pub age_range_min: u32,
    #[serde(default = "default_age_max")]
    pub age_range_max: u32,
    pub max_distance_km: Option<u32>,
    pub height_pref_min: Option<u32>,
    pub height_pref_max: Option<u32>,
    pub religion_preference: Option<Vec<String>>,
    pub height_inches: Option<u32>,
    pub home_town: Option<String>,
    pub sexual_orientation: Option<String>,
    pub job_title: Option<String>,
    pub college_university: Option<String>,
    pub education_level: Option<String>,
    pub languages: Option<Vec<String>>,
    pub religion: Option<String>,
    pub relationship_goals: Option<String>,
    pub hidden_fields: Option<Vec<String>>,
    #[serde(default)]
    pub profile_setup_complete: bool,
    #[serde(default)]
    pub dating_preferences_complete: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub profile: Option<ProfileData>,
    pub created_at: String,
    pub updated_at: String,
}

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 99;

fn default_age_min() -> u32 {
    MIN_AGE
}

fn default_age_max() -> u32 {
    MAX_AGE
}

/// Partial update of the user record. Unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_preference: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_range_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_range_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_pref_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_pref_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub religion_preference: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dating_preferences_complete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personality_traits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
}

/// Body of the one-shot profile setup submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileSetupRequest {
    pub display_name: String,
    pub date_of_birth: String,
    pub height_inches: u32,
    pub location: String,
    pub home_town: String,
    pub gender: String,
    pub sexual_orientation: String,
    pub job_title: String,
    pub college_university: String,
    pub education_level: String,
    pub languages: Vec<String>,
    pub religion: String,
    pub children: String,
    pub family_plans: String,
    pub drinking: String,
    pub smoking: String,
    pub marijuana: String,
    pub drugs: String,
    pub hidden_fields: Vec<String>,
}

// =========================================================
// Onboarding chat
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub current_topic: String,
    pub onboarding_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: String,
    pub content: String,
    pub topic: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStatus {
    pub current_topic: String,
    #[serde(default)]
    pub topics_completed: Vec<String>,
    pub onboarding_status: String,
    #[serde(default)]
    pub profile_completeness: f64,
    #[serde(default)]
    pub profile_setup_complete: bool,
    #[serde(default)]
    pub dating_preferences_complete: bool,
}

impl ChatStatus {
    pub fn onboarding_complete(&self) -> bool {
        self.onboarding_status == ONBOARDING_COMPLETED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatIntro {
    pub messages: Vec<String>,
}

// =========================================================
// Discovery & matching
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverUser {
    pub id: String,
    pub display_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub height_inches: Option<u32>,
    pub job_title: Option<String>,
    pub relationship_goals: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub profile: Option<ProfileData>,
    #[serde(default)]
    pub compatibility_score: f64,
    pub created_at: String,
}

impl DiscoverUser {
    /// Primary photo, or the first one when none is flagged.
    pub fn primary_photo(&self) -> Option<&Photo> {
        self.photos
            .iter()
            .find(|p| p.is_primary)
            .or_else(|| self.photos.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverPage {
    pub users: Vec<DiscoverUser>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked_user_id: String,
    pub is_match: bool,
    pub match_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassResponse {
    pub passed_user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub other_user: DiscoverUser,
    pub compatibility_score: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPage {
    pub matches: Vec<Match>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub content: String,
    pub read_at: Option<String>,
    pub created_at: String,
}

// =========================================================
// Blocking & account
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockResponse {
    pub blocked_user_id: String,
    pub auto_unmatched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub id: String,
    pub blocked_user_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedUserPage {
    pub blocks: Vec<BlockedUser>,
    pub total: u32,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub is_active: bool,
    pub email: String,
    pub created_at: String,
}

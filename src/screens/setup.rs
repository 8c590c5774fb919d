//! Profile setup and dating preference forms.

use std::collections::BTreeMap;

use mutual_shared::chrono::{Datelike, NaiveDate};
use mutual_shared::{MAX_AGE, MIN_AGE, ProfileSetupRequest, UserProfile, UserUpdate};
use tracing::{error, info, warn};

use super::photos::MIN_PHOTOS;
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;
use crate::session::AuthService;

/// Field name to message. Empty means the form can be submitted.
pub type FieldErrors = BTreeMap<&'static str, String>;

const REQUIRED: &str = "Required";

fn require_text(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, REQUIRED.to_string());
    }
}

fn invalid_form(op: &str, errors: &FieldErrors) -> ClientError {
    let fields: Vec<&str> = errors.keys().copied().collect();
    ClientError::invalid_input(format!("Please complete: {}", fields.join(", "))).in_op(op)
}

/// Completed years between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

// =========================================================
// Profile setup
// =========================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSetupDraft {
    pub display_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub height_inches: Option<u32>,
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

impl ProfileSetupDraft {
    pub fn validate(&self, photo_count: usize) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "display_name", &self.display_name);
        if self.date_of_birth.is_none() {
            errors.insert("date_of_birth", REQUIRED.to_string());
        }
        if self.height_inches.is_none() {
            errors.insert("height_inches", REQUIRED.to_string());
        }
        require_text(&mut errors, "location", &self.location);
        require_text(&mut errors, "home_town", &self.home_town);
        require_text(&mut errors, "gender", &self.gender);
        require_text(&mut errors, "sexual_orientation", &self.sexual_orientation);
        require_text(&mut errors, "job_title", &self.job_title);
        require_text(&mut errors, "college_university", &self.college_university);
        require_text(&mut errors, "education_level", &self.education_level);
        if self.languages.is_empty() {
            errors.insert("languages", "Select at least one".to_string());
        }
        require_text(&mut errors, "religion", &self.religion);
        require_text(&mut errors, "children", &self.children);
        require_text(&mut errors, "family_plans", &self.family_plans);
        require_text(&mut errors, "drinking", &self.drinking);
        require_text(&mut errors, "smoking", &self.smoking);
        require_text(&mut errors, "marijuana", &self.marijuana);
        require_text(&mut errors, "drugs", &self.drugs);
        if photo_count < MIN_PHOTOS {
            errors.insert(
                "photos",
                format!("Upload at least {MIN_PHOTOS} photos ({photo_count}/{MIN_PHOTOS})"),
            );
        }
        errors
    }

    /// None while a required value is missing.
    pub fn to_request(&self) -> Option<ProfileSetupRequest> {
        Some(ProfileSetupRequest {
            display_name: self.display_name.trim().to_string(),
            date_of_birth: self.date_of_birth?.format("%Y-%m-%d").to_string(),
            height_inches: self.height_inches?,
            location: self.location.trim().to_string(),
            home_town: self.home_town.trim().to_string(),
            gender: self.gender.clone(),
            sexual_orientation: self.sexual_orientation.clone(),
            job_title: self.job_title.trim().to_string(),
            college_university: self.college_university.trim().to_string(),
            education_level: self.education_level.clone(),
            languages: self.languages.clone(),
            religion: self.religion.clone(),
            children: self.children.clone(),
            family_plans: self.family_plans.clone(),
            drinking: self.drinking.clone(),
            smoking: self.smoking.clone(),
            marijuana: self.marijuana.clone(),
            drugs: self.drugs.clone(),
            hidden_fields: self.hidden_fields.clone(),
        })
    }

    pub async fn submit<C: HttpClient>(
        &self,
        auth: &AuthService<C>,
        photo_count: usize,
    ) -> ClientResult<UserProfile> {
        let errors = self.validate(photo_count);
        let request = match self.to_request() {
            Some(request) if errors.is_empty() => request,
            _ => return Err(invalid_form("setup.profile", &errors)),
        };

        let profile = auth.api().submit_profile_setup(&request).await.map_err(|e| {
            error!(error = %e, "Failed to save profile setup");
            e.in_op("setup.profile")
        })?;
        info!("Profile setup saved");
        if let Err(e) = auth.refresh_onboarding().await {
            warn!(error = %e, "Could not refresh onboarding status");
        }
        Ok(profile)
    }
}

// =========================================================
// Dating preferences
// =========================================================

pub const DEFAULT_AGE_RANGE: (u32, u32) = (23, 33);
pub const DEFAULT_MAX_DISTANCE_KM: u32 = 50;
pub const DEFAULT_HEIGHT_RANGE: (u32, u32) = (60, 72);
const AGE_SPREAD: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DatingPreferencesDraft {
    pub gender_preference: Vec<String>,
    pub age_range: (u32, u32),
    pub max_distance_km: u32,
    /// None when the user has no height preference.
    pub height_range: Option<(u32, u32)>,
    pub religion_preference: Vec<String>,
}

impl Default for DatingPreferencesDraft {
    fn default() -> Self {
        Self {
            gender_preference: Vec::new(),
            age_range: DEFAULT_AGE_RANGE,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            height_range: None,
            religion_preference: Vec::new(),
        }
    }
}

impl DatingPreferencesDraft {
    /// Prefills from the stored record. An untouched age range is centred on the user's age.
    pub fn from_profile(profile: &UserProfile, today: NaiveDate) -> Self {
        let mut draft = Self::default();
        if let Some(genders) = profile.gender_preference.as_ref().filter(|g| !g.is_empty()) {
            draft.gender_preference = genders.clone();
        }

        let untouched = profile.age_range_min == MIN_AGE && profile.age_range_max == MAX_AGE;
        let dob = profile
            .date_of_birth
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        draft.age_range = match dob {
            Some(dob) if untouched => {
                let age = age_on(dob, today);
                (
                    age.saturating_sub(AGE_SPREAD).max(MIN_AGE),
                    (age + AGE_SPREAD).clamp(MIN_AGE, MAX_AGE),
                )
            }
            _ => (profile.age_range_min, profile.age_range_max),
        };

        if let Some(km) = profile.max_distance_km.filter(|km| *km > 0) {
            draft.max_distance_km = km;
        }
        if let (Some(min), Some(max)) = (profile.height_pref_min, profile.height_pref_max) {
            draft.height_range = Some((min, max));
        }
        if let Some(religions) = profile.religion_preference.as_ref() {
            draft.religion_preference = religions.clone();
        }
        draft
    }

    /// Switching the height filter on starts from the default range.
    pub fn set_height_enabled(&mut self, enabled: bool) {
        self.height_range = match (enabled, self.height_range) {
            (false, _) => None,
            (true, Some(range)) => Some(range),
            (true, None) => Some(DEFAULT_HEIGHT_RANGE),
        };
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.gender_preference.is_empty() {
            errors.insert(
                "gender_preference",
                "Please select at least one gender preference.".to_string(),
            );
        }
        let (min, max) = self.age_range;
        if min < MIN_AGE || max > MAX_AGE || min > max {
            errors.insert(
                "age_range",
                format!("Age range must be between {MIN_AGE} and {MAX_AGE}."),
            );
        }
        if self.height_range.is_some_and(|(low, high)| low > high) {
            errors.insert("height_range", "Minimum height is above maximum.".to_string());
        }
        errors
    }

    pub fn to_update(&self) -> UserUpdate {
        UserUpdate {
            gender_preference: Some(self.gender_preference.clone()),
            age_range_min: Some(self.age_range.0),
            age_range_max: Some(self.age_range.1),
            max_distance_km: Some(self.max_distance_km),
            height_pref_min: self.height_range.map(|(low, _)| low),
            height_pref_max: self.height_range.map(|(_, high)| high),
            religion_preference: Some(self.religion_preference.clone())
                .filter(|r| !r.is_empty()),
            dating_preferences_complete: Some(true),
            ..UserUpdate::default()
        }
    }

    pub async fn submit<C: HttpClient>(&self, auth: &AuthService<C>) -> ClientResult<UserProfile> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(invalid_form("setup.preferences", &errors));
        }

        let profile = auth
            .api()
            .update_my_profile(&self.to_update())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to save dating preferences");
                e.in_op("setup.preferences")
            })?;
        info!("Dating preferences saved");
        if let Err(e) = auth.refresh_onboarding().await {
            warn!(error = %e, "Could not refresh onboarding status");
        }
        Ok(profile)
    }
}

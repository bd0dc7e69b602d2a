// User profile domain types
//
// Profiles are created on first login and keyed by the membership user id.
// Field names keep the wire format the mobile client already uses
// (camelCase ids and names, snake_case settings).

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Fallback display name for ids without a profile
pub const UNKNOWN_USER_NAME: &str = "<unknown>";

/// Who may see a user's last known location
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ShowLocation {
    #[default]
    NoOne,
    OnlyMembersWhoShareTheirOwnLocation,
    OnlyMembers,
    EveryoneWhoShareTheirOwnLocation,
    Everyone,
}

impl ShowLocation {
    /// Whether a viewer may see the location.
    ///
    /// `viewer_is_member` and `viewer_shares_location` describe the viewer,
    /// not the owner of the location.
    pub fn visible_to(self, viewer_is_member: bool, viewer_shares_location: bool) -> bool {
        match self {
            ShowLocation::NoOne => false,
            ShowLocation::OnlyMembersWhoShareTheirOwnLocation => {
                viewer_is_member && viewer_shares_location
            }
            ShowLocation::OnlyMembers => viewer_is_member,
            ShowLocation::EveryoneWhoShareTheirOwnLocation => viewer_shares_location,
            ShowLocation::Everyone => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UserSettings {
    #[serde(default)]
    pub show_location: ShowLocation,
    #[serde(default)]
    pub show_contact_info: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ContactInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Last reported position of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Client supplied date of the fix ("YYYY-MM-DD")
    pub timestamp: String,
    /// Accuracy in meters
    pub accuracy: f64,
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "isMember", default)]
    pub is_member: bool,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default)]
    pub location: Option<UserLocation>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub slogan: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
}

impl User {
    /// Fresh profile with default settings
    pub fn new(user_id: i64, is_member: bool) -> Self {
        Self {
            user_id,
            is_member,
            settings: UserSettings::default(),
            location: None,
            contact_info: None,
            age: None,
            slogan: None,
            avatar_url: None,
            first_name: None,
            last_name: None,
        }
    }

    /// "{firstName} {lastName}", trimmed
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    pub fn shares_location(&self) -> bool {
        self.location.is_some() && self.settings.show_location != ShowLocation::NoOne
    }
}

/// Fields a user may change on their own profile.
/// Ids, membership and names are owned by the membership service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UpdateUser {
    #[serde(default)]
    pub settings: Option<UserSettings>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub slogan: Option<String>,
}

impl UpdateUser {
    pub fn apply(self, user: &mut User) {
        if let Some(settings) = self.settings {
            user.settings = settings;
        }
        if let Some(contact_info) = self.contact_info {
            user.contact_info = Some(contact_info);
        }
        if let Some(age) = self.age {
            user.age = Some(age);
        }
        if let Some(slogan) = self.slogan {
            user.slogan = Some(slogan);
        }
    }
}

/// Public view of another user's location, returned by the locations listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SharedLocation {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub location: UserLocation,
}

// User profile service
//
// Profiles are keyed by membership id and created on first login.
// Decision: Membership data (names, isMember) is owned upstream and only written by the login flow

use std::collections::HashMap;

use chrono::{Duration, Utc};
use swag_core::{
    ContactInfo, EventError, MemberLogin, Result, SharedLocation, UpdateUser, User, UserLocation,
};
use swag_storage::StorageBackend;

/// Expiry assumed for a third-party token when upstream sends no usable `validThrough`
const FALLBACK_EXTERNAL_TOKEN_LIFETIME_HOURS: i64 = 24;

pub struct UserService {
    storage: StorageBackend,
}

impl UserService {
    pub fn new(storage: StorageBackend) -> Self {
        Self { storage }
    }

    pub async fn get(&self, user_id: i64) -> Result<User> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| EventError::not_found("User not found"))
    }

    /// Create or refresh the profile after a successful membership login and
    /// keep the third-party token for later booking calls.
    pub async fn record_login(&self, login: &MemberLogin) -> Result<User> {
        let user = match self.storage.get_user(login.member_id).await? {
            Some(mut user) => {
                user.first_name = login.first_name.clone().or(user.first_name);
                user.last_name = login.last_name.clone().or(user.last_name);
                user
            }
            None => {
                tracing::info!(user_id = login.member_id, "Creating profile on first login");
                let mut user = User::new(login.member_id, login.is_member);
                user.first_name = login.first_name.clone();
                user.last_name = login.last_name.clone();
                user.contact_info = login.email.clone().map(|email| ContactInfo {
                    email: Some(email),
                    phone: None,
                });
                user
            }
        };
        let user = self.storage.upsert_user(&user).await?;

        let expires_at = login.valid_through.unwrap_or_else(|| {
            Utc::now() + Duration::hours(FALLBACK_EXTERNAL_TOKEN_LIFETIME_HOURS)
        });
        self.storage
            .save_external_token(user.user_id, &login.token, expires_at)
            .await?;

        Ok(user)
    }

    /// Apply the caller-editable fields
    pub async fn update(&self, user_id: i64, update: UpdateUser) -> Result<User> {
        let mut user = self.get(user_id).await?;
        update.apply(&mut user);
        Ok(self.storage.upsert_user(&user).await?)
    }

    pub async fn update_location(&self, user_id: i64, location: UserLocation) -> Result<User> {
        let mut user = self.get(user_id).await?;
        user.location = Some(location);
        Ok(self.storage.upsert_user(&user).await?)
    }

    /// Locations the viewer may see, the viewer's own excluded
    pub async fn shared_locations(&self, viewer: &User) -> Result<Vec<SharedLocation>> {
        let viewer_shares = viewer.shares_location();
        let users = self.storage.get_users_showing_location().await?;

        Ok(users
            .into_iter()
            .filter(|u| u.user_id != viewer.user_id)
            .filter(|u| {
                u.settings
                    .show_location
                    .visible_to(viewer.is_member, viewer_shares)
            })
            .filter_map(|u| {
                let name = u.display_name();
                u.location.map(|location| SharedLocation {
                    user_id: u.user_id,
                    name,
                    avatar_url: u.avatar_url,
                    location,
                })
            })
            .collect())
    }

    /// Display names for a batch of ids in a single lookup
    pub async fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>> {
        let users = self.storage.get_users(user_ids).await?;
        Ok(users
            .into_iter()
            .map(|u| (u.user_id, u.display_name()))
            .collect())
    }
}

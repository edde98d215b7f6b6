use hearth_shared::constants::PROFILES_KEY;
use hearth_shared::types::UserId;

use crate::data::DataStore;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{Profile, ProfilePatch};

impl DataStore {
    /// Make sure the signed-in user has a profile, creating it from the
    /// session record on first activation.
    pub fn sync_profile(&self) -> Result<Option<Profile>> {
        let Some(user) = self.session_user()? else {
            return Ok(None);
        };

        let _w = self.writer()?;
        let mut profiles = self.profiles()?;
        if let Some(existing) = profiles.iter().find(|p| p.id == user.id) {
            return Ok(Some(existing.clone()));
        }

        let profile = Profile {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
            bio: None,
        };
        profiles.push(profile.clone());
        self.save(PROFILES_KEY, &profiles)?;

        tracing::debug!(user = %profile.id, "profile created");
        self.publish(StoreEvent::ProfileUpdated {
            user_id: profile.id,
        });
        Ok(Some(profile))
    }

    pub fn profiles(&self) -> Result<Vec<Profile>> {
        self.load(PROFILES_KEY)
    }

    pub fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        Ok(self.profiles()?.into_iter().find(|p| p.id == user_id))
    }

    /// Merge `patch` into the signed-in user's own profile.
    pub fn update_my_profile(&self, patch: &ProfilePatch) -> Result<Profile> {
        let user = self.require_user()?;

        let _w = self.writer()?;
        let mut profiles = self.profiles()?;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == user.id)
            .ok_or(StoreError::NotFound("profile"))?;
        profile.apply(patch);
        let updated = profile.clone();
        self.save(PROFILES_KEY, &profiles)?;

        self.publish(StoreEvent::ProfileUpdated { user_id: user.id });
        Ok(updated)
    }

    /// Other users whose username contains `query`, ignoring case.
    pub fn search_profiles(&self, query: &str) -> Result<Vec<Profile>> {
        let me = self.session_user()?.map(|u| u.id);
        let needle = query.trim().to_lowercase();
        Ok(self
            .profiles()?
            .into_iter()
            .filter(|p| Some(p.id) != me && p.username.to_lowercase().contains(&needle))
            .collect())
    }
}

use std::sync::Arc;

use tracing::debug;

use crate::error::AppError;
use crate::models::{Identity, Profile, ProfileView};
use crate::store::{self, Collection, Filter, RecordStore};

/// Resolves the student profile that belongs to an authenticated identity.
pub struct ProfileResolver {
    store: Arc<dyn RecordStore>,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn get_profile(&self, identity: &Identity) -> Result<Profile, AppError> {
        let filter = Filter::new().eq("id", identity.id.as_str());
        store::fetch::<Profile>(self.store.as_ref(), Collection::Profiles, &filter)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("profile".to_string()))
    }

    /// Profile for display. Falls back to identity details when no profile row exists.
    pub async fn profile_view(&self, identity: &Identity) -> Result<ProfileView, AppError> {
        match self.get_profile(identity).await {
            Ok(profile) => Ok(ProfileView::from_profile(identity, profile)),
            Err(AppError::NotFound(_)) => {
                debug!("no profile row for {}, using identity defaults", identity.id);
                Ok(ProfileView::from_identity(identity))
            }
            Err(e) => Err(e),
        }
    }
}

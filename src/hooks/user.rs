use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::sdk::{CallOptions, PasswordChange, UserRecord};
use crate::store::{Action, Store};

/// Profile management for the signed-in user plus user administration.
#[derive(Debug, Clone)]
pub struct UserInteraction {
    store: Store,
}

impl UserInteraction {
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Update the signed-in user's profile and publish the result.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, changes: &Value, options: CallOptions) -> Result<UserRecord> {
        let sdk = self.store.sdk()?;
        let user = sdk.user().update_profile(changes, options).await?;
        self.store.dispatch(Action::SetUser(Some(user.clone())));
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn change_password(&self, change: &PasswordChange, options: CallOptions) -> Result<()> {
        self.store.sdk()?.user().change_password(change, options).await
    }

    pub async fn get(&self, user_id: &str, options: CallOptions) -> Result<UserRecord> {
        self.store.sdk()?.user().get(user_id, options).await
    }

    pub async fn list(&self, query: &Value, options: CallOptions) -> Result<Vec<UserRecord>> {
        self.store.sdk()?.user().list(query, options).await
    }

    #[instrument(skip(self, options))]
    pub async fn delete(&self, user_id: &str, options: CallOptions) -> Result<()> {
        self.store.sdk()?.user().delete(user_id, options).await
    }
}

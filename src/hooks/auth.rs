use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::sdk::{CallOptions, Credentials, Registration, Session, UserRecord};
use crate::store::{Action, Store};

/// Sign-in, sign-up and session handling.
///
/// Session results are published into the store so every other consumer
/// sees the signed-in user on its next read.
#[derive(Debug, Clone)]
pub struct Auth {
    store: Store,
}

impl Auth {
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Signed-in user, if any.
    pub fn user(&self) -> Option<UserRecord> {
        self.store.user()
    }

    /// Whether an authorization attempt has completed.
    pub fn is_auth_inited(&self) -> bool {
        self.store.auth_inited()
    }

    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials, options: CallOptions) -> Result<Session> {
        let sdk = self.store.sdk()?;
        let session = sdk.auth().login(credentials, options).await?;
        self.store.dispatch(Action::SetUser(Some(session.user.clone())));
        Ok(session)
    }

    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration,
        options: CallOptions,
    ) -> Result<Session> {
        let sdk = self.store.sdk()?;
        let session = sdk.auth().register(registration, options).await?;
        self.store.dispatch(Action::SetUser(Some(session.user.clone())));
        Ok(session)
    }

    /// Resolve the current session and mark authorization as attempted,
    /// whatever the outcome.
    #[instrument(skip_all)]
    pub async fn authorize(&self, options: CallOptions) -> Result<Option<UserRecord>> {
        let sdk = self.store.sdk()?;
        let result = sdk.auth().authorize(options).await;
        match &result {
            Ok(user) => {
                debug!(signed_in = user.is_some(), "Authorization resolved");
                self.store.dispatch(Action::SetUser(user.clone()));
            }
            Err(e) => {
                warn!(error = %e, "Authorization failed");
                self.store.dispatch(Action::SetUser(None));
            }
        }
        self.store.dispatch(Action::AuthInited(true));
        result
    }

    #[instrument(skip_all)]
    pub async fn logout(&self, options: CallOptions) -> Result<()> {
        let sdk = self.store.sdk()?;
        let result = sdk.auth().logout(options).await;
        self.store.dispatch(Action::SetUser(None));
        result
    }

    #[instrument(skip_all)]
    pub async fn refresh_token(&self, options: CallOptions) -> Result<Session> {
        let sdk = self.store.sdk()?;
        let session = sdk.auth().refresh_token(options).await?;
        self.store.dispatch(Action::SetUser(Some(session.user.clone())));
        Ok(session)
    }

    pub async fn forgot_password(&self, email: &str, options: CallOptions) -> Result<()> {
        self.store.sdk()?.auth().forgot_password(email, options).await
    }
}

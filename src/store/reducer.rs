use std::sync::Arc;

use crate::sdk::{Sdk, UserRecord};

/// Application-wide state shared by everything under one provider.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Target application identifier.
    pub app: String,
    /// Base endpoint.
    pub api_url: String,
    /// Authorization scheme, e.g. `Bearer`.
    pub token_type: String,
    /// `None` means no authenticated session.
    pub user: Option<UserRecord>,
    /// `None` until the provider has created the SDK.
    pub sdk_instance: Option<Arc<dyn Sdk>>,
    /// Set once an authorization attempt has completed, successful or not.
    pub auth_inited: bool,
}

/// State transitions accepted by [`reduce`].
#[derive(Debug, Clone)]
pub enum Action {
    SetUser(Option<UserRecord>),
    SetSdkInstance(Option<Arc<dyn Sdk>>),
    AuthInited(bool),
}

impl Action {
    /// Wire-style name of the action, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetUser(_) => "SET_USER",
            Self::SetSdkInstance(_) => "SET_SDK_INSTANCE",
            Self::AuthInited(_) => "AUTH_INITED",
        }
    }
}

/// Apply an action, replacing only the field it names.
#[must_use]
pub fn reduce(state: AppState, action: Action) -> AppState {
    match action {
        Action::SetUser(user) => AppState { user, ..state },
        Action::SetSdkInstance(sdk_instance) => AppState {
            sdk_instance,
            ..state
        },
        Action::AuthInited(auth_inited) => AppState {
            auth_inited,
            ..state
        },
    }
}

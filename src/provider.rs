//! Owner of the shared store and the SDK lifecycle.
//!
//! ```text
//! Uninitialized ──mount──▶ Initializing ──▶ Ready
//!                                   └─────▶ Failed   (SDK stays absent)
//! ```
//!
//! Changing the app id, endpoint or auth token through
//! [`AppProvider::set_props`] discards the current store and SDK and runs a
//! new initialization cycle.

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::{DEFAULT_API_URL, DEFAULT_TOKEN_TYPE};
use crate::sdk::{SdkFactory, SdkParams};
use crate::store::{Action, AppState, Store};

/// Construction parameters of the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderProps {
    pub app: String,
    pub api_url: Option<String>,
    pub token_type: Option<String>,
    pub auth_token: Option<String>,
    pub environment: Option<String>,
}

impl ProviderProps {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            ..Self::default()
        }
    }

    /// Whether switching to `other` requires a new SDK instance.
    fn identity_differs(&self, other: &Self) -> bool {
        self.app != other.app
            || self.api_url() != other.api_url()
            || self.auth_token != other.auth_token
    }

    fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    fn token_type(&self) -> &str {
        self.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE)
    }

    fn initial_state(&self) -> AppState {
        AppState {
            app: self.app.clone(),
            api_url: self.api_url().to_string(),
            token_type: self.token_type().to_string(),
            ..AppState::default()
        }
    }

    fn sdk_params(&self) -> SdkParams {
        SdkParams {
            environment: self
                .environment
                .clone()
                .unwrap_or_else(|| "production".to_string()),
            app_id: self.app.clone(),
            api_url: self.api_url().to_string(),
            token_type: self.token_type().to_string(),
            api_token: self.auth_token.clone(),
        }
    }
}

/// Initialization phase of the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderPhase {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

/// Creates the SDK, publishes it into the store and gates access to the
/// store until it is ready.
#[derive(Debug)]
pub struct AppProvider {
    props: ProviderProps,
    factory: Arc<dyn SdkFactory>,
    store: Store,
    phase: ProviderPhase,
}

impl AppProvider {
    pub fn new(props: ProviderProps, factory: Arc<dyn SdkFactory>) -> Self {
        let store = Store::new(props.initial_state());
        Self {
            props,
            factory,
            store,
            phase: ProviderPhase::Uninitialized,
        }
    }

    /// Create the SDK and publish it. Failures are logged and leave the
    /// provider in [`ProviderPhase::Failed`].
    #[instrument(skip(self), fields(app = %self.props.app))]
    pub async fn mount(&mut self) {
        if matches!(self.phase, ProviderPhase::Ready | ProviderPhase::Initializing) {
            return;
        }
        self.phase = ProviderPhase::Initializing;

        match self.factory.create(&self.props.sdk_params()).await {
            Ok(sdk) => {
                self.store.dispatch(Action::SetSdkInstance(Some(sdk)));
                self.phase = ProviderPhase::Ready;
                info!(name: "provider.ready", api_url = %self.props.api_url(), "SDK initialized");
            }
            Err(e) => {
                error!(name: "provider.init_failed", error = %e, "Failed to initialize SDK");
                self.phase = ProviderPhase::Failed(e.to_string());
            }
        }
    }

    /// Replace the props; re-initializes when the SDK identity changed.
    pub async fn set_props(&mut self, props: ProviderProps) {
        let identity_changed = self.props.identity_differs(&props);
        self.props = props;
        if !identity_changed {
            return;
        }

        info!(name: "provider.reinit", app = %self.props.app, "Provider identity changed");
        self.store.dispatch(Action::SetSdkInstance(None));
        self.store = Store::new(self.props.initial_state());
        self.phase = ProviderPhase::Uninitialized;
        self.mount().await;
    }

    pub fn phase(&self) -> &ProviderPhase {
        &self.phase
    }

    pub fn props(&self) -> &ProviderProps {
        &self.props
    }

    /// The store, once the SDK is available.
    pub fn store(&self) -> Option<&Store> {
        (self.phase == ProviderPhase::Ready).then_some(&self.store)
    }

    /// Run `children` with the store, or nothing while the SDK is absent.
    pub fn render<T>(&self, children: impl FnOnce(&Store) -> T) -> Option<T> {
        self.store().map(children)
    }
}

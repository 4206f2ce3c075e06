mod common;

use cloud_hooks::config::{DEFAULT_API_URL, DEFAULT_TOKEN_TYPE};
use cloud_hooks::hooks::Auth;
use cloud_hooks::sdk::CallOptions;
use cloud_hooks::{AppProvider, ProviderPhase, ProviderProps};

use common::{MockFactory, user};

fn props(app: &str) -> ProviderProps {
    ProviderProps {
        auth_token: Some("app-token".to_string()),
        ..ProviderProps::new(app)
    }
}

#[tokio::test]
async fn test_mount_publishes_sdk() {
    let factory = MockFactory::new();
    let mut provider = AppProvider::new(props("demo"), factory.clone());
    assert_eq!(provider.phase(), &ProviderPhase::Uninitialized);
    assert!(provider.store().is_none());
    assert!(provider.render(|_| ()).is_none());

    provider.mount().await;

    assert_eq!(provider.phase(), &ProviderPhase::Ready);
    let store = provider.store().unwrap();
    assert!(store.sdk().is_ok());

    let state = store.get();
    assert_eq!(state.app, "demo");
    assert_eq!(state.api_url, DEFAULT_API_URL);
    assert_eq!(state.token_type, DEFAULT_TOKEN_TYPE);
    assert!(state.user.is_none());
    assert!(!state.auth_inited);

    let created = factory.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].app_id, "demo");
    assert_eq!(created[0].api_url, DEFAULT_API_URL);
    assert_eq!(created[0].environment, "production");
    assert_eq!(created[0].api_token.as_deref(), Some("app-token"));
}

#[tokio::test]
async fn test_mount_is_idempotent() {
    let factory = MockFactory::new();
    let mut provider = AppProvider::new(props("demo"), factory.clone());

    provider.mount().await;
    provider.mount().await;

    assert_eq!(factory.created().len(), 1);
}

#[tokio::test]
async fn test_factory_failure_keeps_children_unrendered() {
    let factory = MockFactory::failing();
    let mut provider = AppProvider::new(props("demo"), factory.clone());

    provider.mount().await;

    assert!(matches!(provider.phase(), ProviderPhase::Failed(reason) if reason.contains("factory refused")));
    assert!(provider.store().is_none());
    assert!(provider.render(|store| store.get().app).is_none());
}

#[tokio::test]
async fn test_retry_after_failure() {
    let factory = MockFactory::failing();
    let mut provider = AppProvider::new(props("demo"), factory.clone());
    provider.mount().await;

    factory.set_failing(false);
    provider.mount().await;

    assert_eq!(provider.phase(), &ProviderPhase::Ready);
    assert_eq!(factory.created().len(), 2);
}

#[tokio::test]
async fn test_render_passes_store_to_children() {
    let factory = MockFactory::new();
    let mut provider = AppProvider::new(props("demo"), factory);
    provider.mount().await;

    let app = provider.render(|store| store.get().app);

    assert_eq!(app.as_deref(), Some("demo"));
}

#[tokio::test]
async fn test_identity_change_reinitializes_with_fresh_store() {
    let factory = MockFactory::new();
    let mut provider = AppProvider::new(props("demo"), factory.clone());
    provider.mount().await;

    let old_store = provider.store().unwrap().clone();
    factory.last_sdk().unwrap().set_current_user(Some(user("ada")));
    Auth::new(&old_store)
        .authorize(CallOptions::default())
        .await
        .unwrap();
    assert!(old_store.user().is_some());

    provider.set_props(props("other")).await;

    assert_eq!(provider.phase(), &ProviderPhase::Ready);
    assert_eq!(factory.created().len(), 2);
    assert_eq!(factory.created()[1].app_id, "other");

    let new_store = provider.store().unwrap();
    assert!(!new_store.same_store(&old_store));
    assert_eq!(new_store.get().app, "other");
    assert!(new_store.user().is_none());
    assert!(!new_store.auth_inited());

    // Hooks still holding the old store lose access to the SDK.
    assert!(old_store.sdk().is_err());
}

#[tokio::test]
async fn test_non_identity_change_keeps_sdk() {
    let factory = MockFactory::new();
    let mut provider = AppProvider::new(props("demo"), factory.clone());
    provider.mount().await;
    let store = provider.store().unwrap().clone();

    provider
        .set_props(ProviderProps {
            environment: Some("staging".to_string()),
            ..props("demo")
        })
        .await;

    assert_eq!(factory.created().len(), 1);
    assert!(provider.store().unwrap().same_store(&store));
    assert_eq!(provider.props().environment.as_deref(), Some("staging"));
}

#[tokio::test]
async fn test_token_change_reinitializes() {
    let factory = MockFactory::new();
    let mut provider = AppProvider::new(props("demo"), factory.clone());
    provider.mount().await;

    provider
        .set_props(ProviderProps {
            auth_token: Some("rotated".to_string()),
            ..props("demo")
        })
        .await;

    let created = factory.created();
    assert_eq!(created.len(), 2);
    assert_eq!(created[1].api_token.as_deref(), Some("rotated"));
}

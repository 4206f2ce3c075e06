use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::sdk::{CallOptions, WebhookRequest};
use crate::store::Store;

/// Invoke platform webhooks.
#[derive(Debug, Clone)]
pub struct Webhook {
    store: Store,
}

impl Webhook {
    pub fn new(store: &Store) -> Self {
        Self {
            store: store.clone(),
        }
    }

    /// Call webhook `webhook_id`. Server error envelopes come back untouched.
    #[instrument(skip(self, request, options))]
    pub async fn call(
        &self,
        webhook_id: &str,
        request: WebhookRequest,
        options: CallOptions,
    ) -> Result<Value> {
        self.store
            .sdk()?
            .webhook()
            .call(webhook_id, request, options)
            .await
    }
}

//! Push notification delivery. A [`PushSender`] delivers one message to one subscription,
//! [`fan_out`] delivers a message to many subscriptions with bounded concurrency and retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use error_stack::Report;
use heritage_core::model::push::PushSubscription;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

mod web_push;

pub use web_push::{VapidConfig, WebPushSender};

pub const DEFAULT_URL: &str = "/";
pub const DEFAULT_ICON: &str = "/favicon.ico";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// The push service no longer knows the subscription.
    #[error("subscription is gone")]
    Gone,
    #[error("push service rejected the message with status {0}")]
    Rejected(u16),
    #[error("failed to reach the push service")]
    Transport,
    #[error("failed to encrypt or sign the message")]
    Encoding,
    #[error("push notifications are not configured")]
    Disabled,
}

impl PushError {
    /// Transport failures, throttling and server errors may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            PushError::Transport => true,
            PushError::Rejected(status) => *status == 429 || (500..=599).contains(status),
            PushError::Gone | PushError::Encoding | PushError::Disabled => false,
        }
    }
}

pub trait PushSender: Clone + Send + Sync + 'static {
    /// Key browsers need to create a subscription for this server.
    fn public_key(&self) -> Option<&str>;

    fn send(
        &self,
        subscription: &PushSubscription,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), Report<PushError>>> + Send;
}

/// The JSON document delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    pub icon: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationPayload {
    pub fn new(title: String, body: String, url: Option<String>, icon: Option<String>) -> Self {
        Self {
            title,
            body,
            url: url.unwrap_or_else(|| DEFAULT_URL.to_owned()),
            icon: icon.unwrap_or_else(|| DEFAULT_ICON.to_owned()),
            timestamp: Utc::now(),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        // a struct of strings and a timestamp always serializes
        Bytes::from(serde_json::to_vec(self).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FanOutConfig {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub endpoint: String,
    pub result: Result<(), PushError>,
    pub attempts: u32,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_gone(&self) -> bool {
        self.result == Err(PushError::Gone)
    }
}

/// Delivers `payload` to every subscription. Results are in the order of `subscriptions`.
#[instrument(skip_all, fields(subscriptions = subscriptions.len()))]
pub async fn fan_out<P: PushSender>(
    sender: &P,
    subscriptions: Vec<PushSubscription>,
    payload: Bytes,
    config: FanOutConfig,
) -> Vec<Delivery> {
    let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let endpoints: Vec<String> = subscriptions.iter().map(|s| s.endpoint.clone()).collect();
    let mut task_slots = HashMap::with_capacity(endpoints.len());

    for (idx, subscription) in subscriptions.into_iter().enumerate() {
        let sender = sender.clone();
        let payload = payload.clone();
        let permits = Arc::clone(&permits);

        let handle = tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            deliver(&sender, &subscription, payload, config).await
        });
        task_slots.insert(handle.id(), idx);
    }

    let mut deliveries: Vec<Option<Delivery>> = vec![None; endpoints.len()];
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, delivery)) => {
                if let Some(&idx) = task_slots.get(&id) {
                    deliveries[idx] = Some(delivery);
                }
            }
            Err(e) => warn!("push delivery task failed: {e}"),
        }
    }

    // a task that panicked or was cancelled still counts as a failed delivery
    deliveries
        .into_iter()
        .zip(endpoints)
        .map(|(delivery, endpoint)| {
            delivery.unwrap_or(Delivery {
                endpoint,
                result: Err(PushError::Transport),
                attempts: 1,
            })
        })
        .collect()
}

async fn deliver<P: PushSender>(
    sender: &P,
    subscription: &PushSubscription,
    payload: Bytes,
    config: FanOutConfig,
) -> Delivery {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match sender.send(subscription, payload.clone()).await {
            Ok(()) => {
                return Delivery {
                    endpoint: subscription.endpoint.clone(),
                    result: Ok(()),
                    attempts: attempt,
                };
            }
            Err(e) => {
                let error = *e.current_context();
                if !error.is_retryable() || attempt == max_attempts {
                    debug!("giving up on {} after {attempt} attempt(s): {e:?}", subscription.endpoint);
                    return Delivery {
                        endpoint: subscription.endpoint.clone(),
                        result: Err(error),
                        attempts: attempt,
                    };
                }

                let backoff = config.base_backoff * 2u32.pow(attempt - 1);
                debug!("retrying {} in {backoff:?}", subscription.endpoint);
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Replays scripted results per endpoint. Endpoints without a script always succeed.
    #[derive(Debug, Clone, Default)]
    pub struct FakeSender {
        scripts: Arc<Mutex<HashMap<String, Vec<Result<(), PushError>>>>>,
        calls: Arc<Mutex<Vec<String>>>,
        disabled: bool,
    }

    impl FakeSender {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn disabled() -> Self {
            Self {
                disabled: true,
                ..Self::default()
            }
        }

        pub fn script(self, endpoint: &str, results: Vec<Result<(), PushError>>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(endpoint.to_owned(), results.into_iter().rev().collect());
            self
        }

        pub fn calls_to(&self, endpoint: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|e| *e == endpoint)
                .count()
        }

        pub fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl PushSender for FakeSender {
        fn public_key(&self) -> Option<&str> {
            (!self.disabled).then_some("BPublicKey")
        }

        async fn send(
            &self,
            subscription: &PushSubscription,
            _payload: Bytes,
        ) -> Result<(), Report<PushError>> {
            if self.disabled {
                return Err(Report::new(PushError::Disabled));
            }

            self.calls.lock().unwrap().push(subscription.endpoint.clone());
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&subscription.endpoint)
                .and_then(Vec::pop);

            match next {
                Some(Err(e)) => Err(Report::new(e)),
                _ => Ok(()),
            }
        }
    }
}

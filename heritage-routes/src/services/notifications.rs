use error_stack::ResultExt;
use heritage_core::HeritageEngine;
use heritage_core::ids::UserId;
use heritage_core::model::push::{NewSubscription, PushSubscription, SubscriptionStats};
use heritage_core::repository::{SubscriptionRepository, UserRepository};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::NotificationServiceError;
use crate::notifications::{Delivery, FanOutConfig, NotificationPayload, PushSender, fan_out};
use crate::{ServiceResult, metrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryReport {
    pub endpoint: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Delivery> for DeliveryReport {
    fn from(value: Delivery) -> Self {
        match value.result {
            Ok(()) => Self {
                endpoint: value.endpoint,
                status: DeliveryStatus::Sent,
                error: None,
            },
            Err(e) => Self {
                endpoint: value.endpoint,
                status: DeliveryStatus::Failed,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FanOutReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub notifications: Vec<DeliveryReport>,
}

impl FanOutReport {
    fn new(deliveries: Vec<Delivery>) -> Self {
        let notifications: Vec<DeliveryReport> =
            deliveries.into_iter().map(DeliveryReport::from).collect();
        let sent = notifications
            .iter()
            .filter(|n| n.status == DeliveryStatus::Sent)
            .count();

        Self {
            total: notifications.len(),
            sent,
            failed: notifications.len() - sent,
            notifications,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    #[serde(flatten)]
    pub subscriptions: SubscriptionStats,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendToUserOutcome {
    UserNotFound,
    NoSubscription,
    Delivered(FanOutReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionKeys {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Clone)]
pub struct NotificationService<T, P> {
    engine: T,
    sender: P,
    config: FanOutConfig,
}

impl<T, P> NotificationService<T, P>
where
    T: HeritageEngine,
    P: PushSender,
{
    pub fn new(engine: T, sender: P, config: FanOutConfig) -> Self {
        Self {
            engine,
            sender,
            config,
        }
    }

    pub fn public_key(&self) -> Option<String> {
        self.sender.public_key().map(str::to_owned)
    }

    /// Stores the subscription. An owner that does not exist is dropped, the endpoint is still
    /// stored. Returns the key browsers subscribe with.
    #[instrument(skip_all, name = "service#subscribe")]
    pub async fn subscribe(
        &self,
        keys: SubscriptionKeys,
        owner: Option<UserId>,
    ) -> ServiceResult<Option<String>, NotificationServiceError> {
        let user_id = match owner {
            Some(id) => self
                .engine
                .users()
                .find(id)
                .await
                .change_context(NotificationServiceError::Subscribe)?
                .map(|u| u.id),
            None => None,
        };

        self.engine
            .subscriptions()
            .upsert(NewSubscription {
                endpoint: keys.endpoint,
                p256dh: keys.p256dh,
                auth: keys.auth,
                user_id,
            })
            .await
            .change_context(NotificationServiceError::Subscribe)?;

        Ok(self.public_key())
    }

    /// Removes `endpoint` if given and every subscription owned by the user.
    #[instrument(skip_all, name = "service#unsubscribe")]
    pub async fn unsubscribe(
        &self,
        user: UserId,
        endpoint: Option<String>,
    ) -> ServiceResult<u64, NotificationServiceError> {
        let subscriptions = self.engine.subscriptions();

        let mut removed = 0;
        if let Some(endpoint) = endpoint {
            removed += subscriptions
                .remove_endpoint(endpoint)
                .await
                .change_context(NotificationServiceError::Unsubscribe)?;
        }

        removed += subscriptions
            .remove_for_user(user)
            .await
            .change_context(NotificationServiceError::Unsubscribe)?;

        Ok(removed)
    }

    #[instrument(skip_all, name = "service#send_to_all")]
    pub async fn send_to_all(
        &self,
        payload: NotificationPayload,
    ) -> ServiceResult<FanOutReport, NotificationServiceError> {
        let subscriptions = self
            .engine
            .subscriptions()
            .list_all()
            .await
            .change_context(NotificationServiceError::SendToAll)?;

        Ok(self.deliver(subscriptions, payload).await)
    }

    #[instrument(skip_all, name = "service#send_to_user")]
    pub async fn send_to_user(
        &self,
        user: UserId,
        payload: NotificationPayload,
    ) -> ServiceResult<SendToUserOutcome, NotificationServiceError> {
        let exists = self
            .engine
            .users()
            .find(user)
            .await
            .change_context(NotificationServiceError::SendToUser)?
            .is_some();
        if !exists {
            return Ok(SendToUserOutcome::UserNotFound);
        }

        let subscriptions = self
            .engine
            .subscriptions()
            .list_for_user(user)
            .await
            .change_context(NotificationServiceError::SendToUser)?;
        if subscriptions.is_empty() {
            return Ok(SendToUserOutcome::NoSubscription);
        }

        Ok(SendToUserOutcome::Delivered(
            self.deliver(subscriptions, payload).await,
        ))
    }

    #[instrument(skip_all, name = "service#notification_stats")]
    pub async fn stats(&self) -> ServiceResult<NotificationStats, NotificationServiceError> {
        let subscriptions = self
            .engine
            .subscriptions()
            .stats()
            .await
            .change_context(NotificationServiceError::Stats)?;

        Ok(NotificationStats {
            subscriptions,
            public_key: self.public_key(),
        })
    }

    /// Fans the payload out on a spawned task. Failures are only logged.
    pub fn broadcast_in_background(&self, payload: NotificationPayload) {
        let service = self.clone();
        tokio::spawn(async move {
            match service.send_to_all(payload).await {
                Ok(report) => info!(
                    "broadcast delivered to {} of {} subscription(s)",
                    report.sent, report.total
                ),
                Err(e) => warn!("broadcast failed: {e:?}"),
            }
        });
    }

    async fn deliver(
        &self,
        subscriptions: Vec<PushSubscription>,
        payload: NotificationPayload,
    ) -> FanOutReport {
        let deliveries = fan_out(&self.sender, subscriptions, payload.to_bytes(), self.config).await;

        let mut evicted = 0;
        for gone in deliveries.iter().filter(|d| d.is_gone()) {
            match self
                .engine
                .subscriptions()
                .remove_endpoint(gone.endpoint.clone())
                .await
            {
                Ok(n) => evicted += n,
                Err(e) => warn!("failed to evict {}: {e:?}", gone.endpoint),
            }
        }

        let report = FanOutReport::new(deliveries);
        metrics::increment_notifications_sent_by(report.sent);
        metrics::increment_notifications_failed_by(report.failed);
        metrics::increment_subscriptions_evicted_by(evicted);
        report
    }
}

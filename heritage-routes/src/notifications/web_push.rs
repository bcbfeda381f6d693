use std::sync::Arc;

use bytes::Bytes;
use error_stack::{Report, ResultExt};
use heritage_core::model::push::PushSubscription;
use reqwest::StatusCode;
use tracing::{debug, instrument};
use web_push::{
    ContentEncoding, SubscriptionInfo, URL_SAFE_NO_PAD, VapidSignatureBuilder, WebPushMessage,
    WebPushMessageBuilder,
};

use super::{PushError, PushSender};

/// How long push services keep an undelivered message, in seconds.
const MESSAGE_TTL: u32 = 24 * 60 * 60;

#[derive(Clone)]
pub struct VapidConfig {
    pub public_key: String,
    pub private_key: String,
    /// `mailto:` or `https:` contact of the sender
    pub subject: String,
}

impl std::fmt::Debug for VapidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidConfig")
            .field("public_key", &self.public_key)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Signs and encrypts messages with the `web-push` crate and delivers them with `reqwest`.
#[derive(Debug, Clone)]
pub struct WebPushSender {
    client: reqwest::Client,
    vapid: Option<Arc<VapidConfig>>,
}

impl WebPushSender {
    pub fn new(client: reqwest::Client, vapid: VapidConfig) -> Self {
        Self {
            client,
            vapid: Some(Arc::new(vapid)),
        }
    }

    /// Every send fails with [`PushError::Disabled`].
    pub fn disabled(client: reqwest::Client) -> Self {
        Self {
            client,
            vapid: None,
        }
    }

    fn build_message(
        vapid: &VapidConfig,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<WebPushMessage, Report<PushError>> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.p256dh,
            &subscription.auth,
        );

        // VAPID keys are url safe base64 without padding
        let mut signature =
            VapidSignatureBuilder::from_base64(&vapid.private_key, URL_SAFE_NO_PAD, &info)
                .change_context(PushError::Encoding)
                .attach("invalid VAPID private key")?;
        signature.add_claim("sub", vapid.subject.as_str());
        let signature = signature.build().change_context(PushError::Encoding)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_ttl(MESSAGE_TTL);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.build().change_context(PushError::Encoding)
    }

    async fn post(&self, message: WebPushMessage) -> Result<(), Report<PushError>> {
        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        request = match message.payload {
            Some(payload) => {
                let mut request = request
                    .header("Content-Encoding", payload.content_encoding.to_str())
                    .header("Content-Type", "application/octet-stream");
                for (name, value) in payload.crypto_headers {
                    request = request.header(name, value);
                }
                request.body(payload.content)
            }
            None => request.header("Content-Length", "0"),
        };

        let response = request.send().await.change_context(PushError::Transport)?;
        let status = response.status();
        debug!("push service answered {status}");

        match status {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(Report::new(PushError::Gone)),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(Report::new(PushError::Rejected(s.as_u16())).attach(body))
            }
        }
    }
}

impl PushSender for WebPushSender {
    fn public_key(&self) -> Option<&str> {
        self.vapid.as_ref().map(|v| v.public_key.as_str())
    }

    #[instrument(skip_all, fields(endpoint = %subscription.endpoint))]
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: Bytes,
    ) -> Result<(), Report<PushError>> {
        let Some(vapid) = &self.vapid else {
            return Err(Report::new(PushError::Disabled));
        };

        let message = Self::build_message(vapid, subscription, &payload)?;
        self.post(message).await
    }
}

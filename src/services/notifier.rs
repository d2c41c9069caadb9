//! Reminder notification transport

use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion};
use aws_sdk_sesv2::{
    config::Region,
    types::{Body, Content, Destination, EmailContent, Message},
    Client,
};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::APP_CONFIG;

const REMINDER_SUBJECT: &str = "Upcoming event reminder";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SES SDK error: {0}")]
    Sdk(String),
}

/// Delivers a reminder message to a recipient address. The transport behind
/// an implementation is opaque to the dispatcher.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError>;
}

/// AWS SES mail transport. The client is initialized lazily on first send.
pub struct EmailNotifier {
    client: OnceCell<Client>,
}

impl EmailNotifier {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            client: OnceCell::const_new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let region = &APP_CONFIG.aws_region;

                let region_provider = RegionProviderChain::first_try(Region::new(region.clone()))
                    .or_default_provider()
                    .or_else(Region::new(region.clone()));

                let config = aws_config::defaults(BehaviorVersion::latest())
                    .region(region_provider)
                    .load()
                    .await;

                Client::new(&config)
            })
            .await
    }
}

impl Default for EmailNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, to: &str, message: &str) -> Result<(), NotifyError> {
        let client = self.client().await;

        let subject = Content::builder()
            .data(REMINDER_SUBJECT)
            .charset("UTF-8")
            .build()
            .map_err(|e| NotifyError::Build(format!("subject: {e:?}")))?;

        let body = Content::builder()
            .data(message)
            .charset("UTF-8")
            .build()
            .map_err(|e| NotifyError::Build(format!("body: {e:?}")))?;

        let mail = Message::builder()
            .subject(subject)
            .body(Body::builder().text(body).build())
            .build();

        client
            .send_email()
            .from_email_address(&APP_CONFIG.mail_from_address)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(mail).build())
            .send()
            .await
            .map_err(|e| NotifyError::Sdk(format!("{e:?}")))?;

        Ok(())
    }
}

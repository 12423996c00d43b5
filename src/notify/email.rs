use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{AlertMessage, Notifier};
use crate::routing::Channel;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// Returns `None` when SMTP is not configured; the mux simply runs
    /// without an email channel in that case.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        let user = std::env::var("SMTP_USER").ok()?;
        let pass = std::env::var("SMTP_PASS").ok()?;
        let from_addr = std::env::var("NOTIFY_EMAIL_FROM").ok()?;
        let to_addr = std::env::var("NOTIFY_EMAIL_TO").ok()?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .ok()?
            .credentials(creds)
            .build();

        let from = from_addr.parse().ok()?;
        let to = to_addr.parse().ok()?;

        Some(Self { mailer, from, to })
    }
}

#[async_trait]
impl Notifier for EmailSender {
    async fn send(&self, msg: &AlertMessage) -> Result<()> {
        let subject = format!("radwatch {:?}: {}", msg.category, msg.title);
        let body = format!(
            "Category: {:?}\nSource: {}\n\n{}\n\nTimestamp: {}\n",
            msg.category,
            msg.source_tag,
            msg.body,
            msg.ts.to_rfc3339()
        );

        let mail = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.mailer.send(mail).await.context("send email")?;
        Ok(())
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

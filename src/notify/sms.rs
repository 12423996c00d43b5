use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{AlertMessage, Notifier};
use crate::routing::Channel;

/// Single SMS segment budget; longer bodies are truncated with a marker.
const SMS_MAX_LEN: usize = 320;

/// Twilio-style SMS gateway. Urgent alerts only reach this sender when
/// the recipient opted in (routing decides the channel set).
pub struct SmsSender {
    client: Client,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl SmsSender {
    /// Returns `None` when the gateway is not configured.
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_SID").ok()?;
        let auth_token = std::env::var("TWILIO_TOKEN").ok()?;
        let from = std::env::var("TWILIO_FROM").ok()?;
        let to = std::env::var("NOTIFY_SMS_TO").ok()?;
        Some(Self {
            client: Client::new(),
            account_sid,
            auth_token,
            from,
            to,
        })
    }

    fn render_body(msg: &AlertMessage) -> String {
        let mut body = format!(
            "radwatch {:?}\n{}\n{}\nSource: {}",
            msg.category, msg.title, msg.body, msg.source_tag
        );
        if body.chars().count() > SMS_MAX_LEN {
            body = body.chars().take(SMS_MAX_LEN - 16).collect();
            body.push_str("... (see digest)");
        }
        body
    }
}

#[async_trait]
impl Notifier for SmsSender {
    async fn send(&self, msg: &AlertMessage) -> Result<()> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let body = Self::render_body(msg);
        let params = [
            ("From", self.from.as_str()),
            ("To", self.to.as_str()),
            ("Body", body.as_str()),
        ];

        self.client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .context("sms post")?
            .error_for_status()
            .context("sms non-2xx")?;
        Ok(())
    }

    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn name(&self) -> &'static str {
        "sms"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Category;
    use chrono::Utc;

    #[test]
    fn long_bodies_are_truncated_to_segment_budget() {
        let msg = AlertMessage {
            title: "t".repeat(200),
            body: "b".repeat(400),
            category: Category::Urgent,
            source_tag: "fda-device-recall".into(),
            ts: Utc::now(),
        };
        let rendered = SmsSender::render_body(&msg);
        assert!(rendered.chars().count() <= SMS_MAX_LEN);
        assert!(rendered.ends_with("(see digest)"));
    }
}

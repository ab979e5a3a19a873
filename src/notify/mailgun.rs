use crate::config::NotifyConfig;
use crate::notify::{Notifier, NotifyError, NotifyResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Attempts per message before giving up
const MAX_ATTEMPTS: u32 = 3;

/// Sends notifications through the Mailgun messages API
pub struct MailgunNotifier {
    client: Client,
    api_base: String,
    domain: String,
    api_key: String,
    sender: String,
    backoff: Duration,
}

impl MailgunNotifier {
    /// Creates a notifier; without `sender` mail comes from `scraper-notify@<domain>`
    pub fn new(
        api_base: &str,
        domain: &str,
        api_key: &str,
        sender: Option<&str>,
    ) -> NotifyResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let sender = match sender.map(str::trim).filter(|s| !s.is_empty()) {
            Some(sender) => sender.to_string(),
            None => {
                let fallback = format!("scraper-notify@{}", domain);
                tracing::info!("No notification sender configured, using {}", fallback);
                fallback
            }
        };

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            domain: domain.to_string(),
            api_key: api_key.to_string(),
            sender,
            backoff: Duration::from_secs(2),
        })
    }

    /// Builds the notifier from `[notify]`, `MAILGUN_API_KEY` and `NOTIFY_FROM`
    pub fn from_config(config: &NotifyConfig) -> NotifyResult<Self> {
        let api_key = std::env::var("MAILGUN_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(NotifyError::MissingApiKey)?;
        let sender = config
            .sender
            .clone()
            .or_else(|| std::env::var("NOTIFY_FROM").ok());

        Self::new(&config.api_base, &config.domain, &api_key, sender.as_deref())
    }

    /// Base delay between attempts; attempt `n` waits `n` times this
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v3/{}/messages", self.api_base, self.domain)
    }

    async fn post(&self, form: &[(&str, &str)]) -> NotifyResult<()> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.api_key))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn send(&self, subject: &str, text: &str, recipients: &[String]) -> NotifyResult<()> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut form: Vec<(&str, &str)> = vec![("from", self.sender.as_str())];
        form.extend(recipients.iter().map(|to| ("to", to.as_str())));
        form.push(("subject", subject));
        form.push(("text", text));

        for attempt in 1..=MAX_ATTEMPTS {
            match self.post(&form).await {
                Ok(()) => {
                    tracing::info!("Notification sent to {} recipient(s)", recipients.len());
                    return Ok(());
                }
                Err(e) => tracing::warn!("Notification attempt {} failed: {}", attempt, e),
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        Err(NotifyError::Exhausted {
            attempts: MAX_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer) -> MailgunNotifier {
        MailgunNotifier::new(&server.uri(), "mg.example.com", "key-123", None)
            .unwrap()
            .with_backoff(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_send_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mg.example.com/messages"))
            .and(header("authorization", "Basic YXBpOmtleS0xMjM="))
            .and(body_string_contains("from=scraper-notify%40mg.example.com"))
            .and(body_string_contains("to=ops%40example.com"))
            .and(body_string_contains("to=dev%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"message":"Queued"}"#))
            .expect(1)
            .mount(&server)
            .await;

        notifier(&server)
            .send(
                "Run finished",
                "2 saved",
                &["ops@example.com".to_string(), "dev@example.com".to_string()],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(&server)
            .send("s", "t", &["ops@example.com".to_string()])
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_gives_up_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(3)
            .mount(&server)
            .await;

        let result = notifier(&server)
            .send("s", "t", &["ops@example.com".to_string()])
            .await;
        assert!(matches!(result, Err(NotifyError::Exhausted { attempts: 3 })));
    }

    #[tokio::test]
    async fn test_no_recipients() {
        let server = MockServer::start().await;
        let result = notifier(&server).send("s", "t", &[]).await;
        assert!(matches!(result, Err(NotifyError::NoRecipients)));
    }

    #[test]
    fn test_explicit_sender() {
        let notifier =
            MailgunNotifier::new("https://api.mailgun.net/", "mg.example.com", "k", Some("Ops <ops@x.com>"))
                .unwrap();
        assert_eq!(notifier.sender, "Ops <ops@x.com>");
        assert_eq!(
            notifier.messages_url(),
            "https://api.mailgun.net/v3/mg.example.com/messages"
        );
    }
}

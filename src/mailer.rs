use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::{header::ContentType, Message, MultiPart, SinglePart},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Transactional mail collaborator. Only one message kind exists today:
/// the password-reset one-time code.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Self {
        // builder_dangerous: plain connection for local relays (Mailpit etc.)
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .build();
        Self {
            transport,
            from_address: config.from_address.clone(),
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let text_body = format!(
            "Your KomikIn password reset code is {code}. It expires in 10 minutes."
        );
        let html_body = format!(
            "<p>Your KomikIn password reset code is <strong>{code}</strong>.</p>\
             <p>It expires in 10 minutes. If you did not request a reset, ignore this email.</p>"
        );
        let message = Message::builder()
            .from(self.from_address.parse().context("invalid from address")?)
            .to(to.parse().context("invalid recipient address")?)
            .subject("KomikIn password reset code")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .context("build otp message")?;

        self.transport
            .send(message)
            .await
            .context("smtp send failed")?;
        tracing::info!(%to, "otp email dispatched");
        Ok(())
    }
}

/// No-op mailer used by `AppState::fake()` in tests.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_otp(&self, _to: &str, _code: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailers_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailer>();
        assert_send_sync::<NoopMailer>();
    }

    #[tokio::test]
    async fn noop_mailer_always_succeeds() {
        assert!(NoopMailer.send_otp("user@example.com", "123456").await.is_ok());
    }
}

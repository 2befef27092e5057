// Out-of-band OTP delivery: templated email over an HTTP mail API, and an SMS stub.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// What the code unlocks. Selects the mail wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    SignIn,
    PasswordReset,
}

impl OtpPurpose {
    pub fn subject(self) -> &'static str {
        match self {
            OtpPurpose::SignIn => "GEMS sign-in verification code",
            OtpPurpose::PasswordReset => "GEMS password reset code",
        }
    }

    fn action(self) -> &'static str {
        match self {
            OtpPurpose::SignIn => "sign in",
            OtpPurpose::PasswordReset => "reset your password",
        }
    }
}

/// Message handed to an `OtpMailer`.
#[derive(Debug, Clone)]
pub struct OtpMessage<'a> {
    pub purpose: OtpPurpose,
    pub to: &'a str,
    pub username: &'a str,
    pub code: &'a str,
    pub valid_minutes: i64,
}

#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, message: &OtpMessage<'_>) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: String,
}

/// Posts mail to a JSON mail API authenticated by bearer key.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(15)).build()?,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl OtpMailer for HttpMailer {
    async fn send_otp(&self, message: &OtpMessage<'_>) -> Result<(), MailError> {
        let payload = MailPayload {
            from: &self.from,
            to: message.to,
            subject: message.purpose.subject(),
            html_body: render_otp_email(message),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(to = message.to, "OTP email sent");
        Ok(())
    }
}

pub fn render_otp_email(message: &OtpMessage<'_>) -> String {
    format!(
        "<div style=\"font-family:sans-serif\">\
         <p>Dear {username},</p>\
         <p>Your GEMS verification code is:</p>\
         <p style=\"font-size:24px;letter-spacing:4px\"><strong>{code}</strong></p>\
         <p>The code is valid for {valid_minutes} minutes. \
         If you did not try to {action}, contact your administrator.</p>\
         </div>",
        username = escape_html(message.username),
        code = message.code,
        valid_minutes = message.valid_minutes,
        action = message.purpose.action(),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// SMS channel. No gateway is wired up; dispatch is logged only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmsStub;

impl SmsStub {
    pub fn send_otp(&self, phone: &str, code: &str) {
        debug!(phone, code, "SMS stub: OTP message");
        info!(phone, "OTP SMS dispatched (stub)");
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every message; optionally fails every send.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String)>>,
        pub subjects: Mutex<Vec<&'static str>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn last_code(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|(_, code)| code.clone())
        }

        pub fn last_subject(&self) -> Option<&'static str> {
            self.subjects.lock().unwrap().last().copied()
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OtpMailer for RecordingMailer {
        async fn send_otp(&self, message: &OtpMessage<'_>) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Rejected {
                    status: 503,
                    body: "mail relay unavailable".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((message.to.to_string(), message.code.to_string()));
            self.subjects
                .lock()
                .unwrap()
                .push(message.purpose.subject());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message<'a>(purpose: OtpPurpose, username: &'a str, code: &'a str) -> OtpMessage<'a> {
        OtpMessage {
            purpose,
            to: "asha@gems.gov.in",
            username,
            code,
            valid_minutes: 10,
        }
    }

    #[test]
    fn test_email_contains_code_and_window() {
        let html = render_otp_email(&message(OtpPurpose::SignIn, "asha", "004211"));
        assert!(html.contains("004211"));
        assert!(html.contains("10 minutes"));
        assert!(html.contains("Dear asha"));
        assert!(html.contains("try to sign in"));
    }

    #[test]
    fn test_reset_email_is_worded_for_reset() {
        let msg = message(OtpPurpose::PasswordReset, "asha", "123456");
        assert_eq!(msg.purpose.subject(), "GEMS password reset code");
        let html = render_otp_email(&msg);
        assert!(html.contains("try to reset your password"));
        assert!(!html.contains("sign in"));
    }

    #[test]
    fn test_email_escapes_username() {
        let html = render_otp_email(&message(OtpPurpose::SignIn, "<script>", "123456"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}

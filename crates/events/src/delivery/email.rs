//! Submission emails via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport. Configuration
//! comes from the environment; without `SMTP_HOST`,
//! [`EmailConfig::from_env`] returns `None` and no mailer is built.

use bistro_core::record::OnboardingRecord;
use bistro_core::slices::SliceName;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "onboarding@bistro.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      |                            |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `onboarding@bistro.local`  |
    /// | `SMTP_USER`     | no       |                            |
    /// | `SMTP_PASSWORD` | no       |                            |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

fn text_field<'a>(record: &'a OnboardingRecord, slice: SliceName, key: &str) -> &'a str {
    record
        .slice(slice)
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("-")
}

/// Build the "new submission" email for `record`.
pub fn submission_message(
    from: &str,
    to: &str,
    record: &OnboardingRecord,
) -> Result<Message, EmailError> {
    let restaurant = text_field(record, SliceName::RestaurantInfo, "name");
    let subject = format!("[Bistro] New onboarding submission: {restaurant}");

    let submitted_at = record
        .submitted_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    let body = format!(
        "Restaurant: {restaurant}\n\
         City: {city}\n\
         Contact: {first} {last} <{email}>\n\
         Submitted at: {submitted_at}\n\
         Record: {id}\n",
        city = text_field(record, SliceName::RestaurantInfo, "city"),
        first = text_field(record, SliceName::Contact, "firstName"),
        last = text_field(record, SliceName::Contact, "lastName"),
        email = text_field(record, SliceName::Contact, "email"),
        id = record.id,
    );

    Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .map_err(|e| EmailError::Build(e.to_string()))
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends submission emails via SMTP.
pub struct EmailDelivery {
    from_address: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Build the SMTP transport. No connection is made until the first
    /// send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Self {
            from_address: config.from_address,
            mailer: builder.build(),
        })
    }

    /// Email the submission of `record` to `to_email`.
    pub async fn send_submission(
        &self,
        to_email: &str,
        record: &OnboardingRecord,
    ) -> Result<(), EmailError> {
        let message = submission_message(&self.from_address, to_email, record)?;
        self.mailer.send(message).await?;
        tracing::info!(to = to_email, record_id = %record.id, "Submission email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

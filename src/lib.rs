//! # Mailsmith
//!
//! Assembles a single outbound e-mail from structured inputs and delivers it
//! through one of two interchangeable transports: a local sendmail-style
//! process pipe, or an SMTP connection.
//!
//! ## Features
//!
//! ### Message assembly
//! - **EmailRequest**: mutable request populated with a sender, recipients,
//!   template variables and attachments, consumed once by `build()`
//! - **Recipient bookkeeping**: To/Cc/Bcc classes with importance-based
//!   cross-class deduplication (an address ends up in its single
//!   highest-importance class)
//! - **Address validation**: RFC-syntax checks with a strict/lenient policy
//!   switch; lenient mode drops individual invalid recipients instead of
//!   aborting the send
//! - **Inline images**: files from a configured media directory referenced in
//!   the rendered HTML body are embedded and rewritten to `cid:` references
//! - **Attachments**: path-based attachments with automatic MIME type
//!   detection, with an optional explicit display name
//!
//! ### Transports
//! - **Sendmail**: pipes the serialized message to a local mail agent invoked
//!   in `-t` mode, writing one synthetic `Bcc:` line per blind recipient onto
//!   the agent's stdin so header-driven recipient extraction still delivers to
//!   them
//! - **SMTP**: hands the serialized message and delivery envelope to an SMTP
//!   server, with optional authentication and TLS/SSL
//! - **Memory**: records messages in memory for tests
//!
//! ### Templates
//! - Message bodies and subject are produced by a [`TemplateRenderer`]
//!   collaborator from the request's `type` identifier; a file-based renderer
//!   with `{{key}}` substitution is provided
//!
//! ## Examples
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mailsmith::{EmailRequest, MailConfig, Mailer};
//!
//! let config = MailConfig::default();
//! let mailer = Mailer::new(config);
//!
//! let mut request = EmailRequest::new("welcome")?;
//! request.set_sender("noreply@example.com", Some("Example"));
//! request.add_to("user@example.com", None);
//! request.assign("name", "Alice");
//!
//! mailer.send(request).await?;
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod backends;
pub mod config;
pub mod mailer;
pub mod message;
pub mod mime;
pub mod request;
pub mod templates;
pub mod validation;

use thiserror::Error;

pub use address::{Address, AddressBook, RecipientClass};
pub use backends::{EmailBackend, MemoryBackend, SendmailBackend, SmtpBackend, backend_from_config};
pub use config::{MailConfig, Password, SmtpOptions, SmtpSecurity, TransportKind};
pub use mailer::Mailer;
pub use message::{Attachment, Envelope, HeaderMap, InlineImage, Message};
pub use request::EmailRequest;
pub use templates::{
	FileTemplateRenderer, TemplateContext, TemplateError, TemplateRenderer, TemplateVariant,
};
pub use validation::MAX_EMAIL_LENGTH;

#[derive(Debug, Error)]
pub enum EmailError {
	/// Required request fields are missing; carries the joined field names.
	#[error("cannot send email, request not validated; errored fields: {0}")]
	Validation(String),

	#[error("invalid e-mail address: {0}")]
	InvalidAddress(String),

	#[error("invalid header name: {0}")]
	InvalidHeader(String),

	#[error("header injection attempt detected: {0}")]
	HeaderInjection(String),

	#[error("configuration error: {0}")]
	Configuration(String),

	#[error(transparent)]
	Template(#[from] TemplateError),

	#[error("transport mode not supported: {0}")]
	NotSupported(String),

	#[error("delivery failed: {0}")]
	Delivery(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

pub type EmailResult<T> = std::result::Result<T, EmailError>;

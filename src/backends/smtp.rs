//! SMTP delivery backend
//!
//! The network conversation is delegated to `lettre`; this module's contract
//! is only to construct the client from [`SmtpOptions`] and hand it the
//! serialized message with an explicit delivery envelope.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

use crate::config::{SmtpOptions, SmtpSecurity};
use crate::message::{Envelope, Message};
use crate::{mime, EmailBackend, EmailError, EmailResult};

/// Delivers over an SMTP connection.
///
/// # Examples
///
/// ```
/// use mailsmith::{SmtpBackend, SmtpOptions};
///
/// let mut options = SmtpOptions::default();
/// options.host = Some("mail.example.com".to_string());
/// options.port = Some(587);
/// options.encryption = Some("tls".to_string());
///
/// let backend = SmtpBackend::from_options(&options)?;
/// # Ok::<(), mailsmith::EmailError>(())
/// ```
pub struct SmtpBackend {
	options: SmtpOptions,
}

impl SmtpBackend {
	/// Validate the options; fails fast when host or port is missing. The
	/// lettre client itself is constructed lazily inside `send`, which needs
	/// a running Tokio runtime.
	pub fn from_options(options: &SmtpOptions) -> EmailResult<Self> {
		if options.host.is_none() {
			return Err(EmailError::Configuration(
				"smtp host is not configured".to_string(),
			));
		}
		if options.port.is_none() {
			return Err(EmailError::Configuration(
				"smtp port is not configured".to_string(),
			));
		}

		Ok(Self {
			options: options.clone(),
		})
	}

	fn transport(&self) -> EmailResult<AsyncSmtpTransport<Tokio1Executor>> {
		// from_options guarantees host and port
		let host = self
			.options
			.host
			.as_deref()
			.ok_or_else(|| EmailError::Configuration("smtp host is not configured".to_string()))?;
		let port = self
			.options
			.port
			.ok_or_else(|| EmailError::Configuration("smtp port is not configured".to_string()))?;

		let mut builder = match self.options.security() {
			Some(SmtpSecurity::Ssl) => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
				.map_err(|e| EmailError::Configuration(e.to_string()))?,
			Some(SmtpSecurity::StartTls) => {
				AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
					.map_err(|e| EmailError::Configuration(e.to_string()))?
			}
			None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
		}
		.port(port);

		if let (Some(username), Some(password)) = (&self.options.username, &self.options.password) {
			builder = builder.credentials(Credentials::new(
				username.clone(),
				password.as_str().to_string(),
			));
		}

		Ok(builder.build())
	}
}

#[async_trait]
impl EmailBackend for SmtpBackend {
	async fn send(&self, message: &Message, envelope: Option<&Envelope>) -> EmailResult<()> {
		let transport = self.transport()?;
		let raw = mime::format_message(message)?;
		let envelope = smtp_envelope(message, envelope)?;

		debug!(recipients = envelope.to().len(), "smtp transport sending");
		transport
			.send_raw(&envelope, &raw)
			.await
			.map_err(|e| EmailError::Delivery(e.to_string()))?;
		Ok(())
	}
}

/// Build the SMTP envelope: the configured bounce address (or the From
/// address) as reverse path, and the envelope recipients (or every To/Cc/Bcc
/// address) as forward paths.
fn smtp_envelope(
	message: &Message,
	envelope: Option<&Envelope>,
) -> EmailResult<lettre::address::Envelope> {
	let sender = envelope
		.map(|e| e.sender().to_string())
		.unwrap_or_else(|| message.from().email().to_string());
	let sender = sender
		.parse::<lettre::Address>()
		.map_err(|_| EmailError::InvalidAddress(sender.clone()))?;

	let recipient_emails = match envelope {
		Some(e) => e.recipients().to_vec(),
		None => message.recipient_emails(),
	};
	let mut recipients = Vec::with_capacity(recipient_emails.len());
	for email in recipient_emails {
		recipients.push(
			email
				.parse::<lettre::Address>()
				.map_err(|_| EmailError::InvalidAddress(email.clone()))?,
		);
	}

	lettre::address::Envelope::new(Some(sender), recipients)
		.map_err(|e| EmailError::Delivery(e.to_string()))
}

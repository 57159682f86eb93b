//! The dispatch facade
//!
//! [`Mailer`] owns the configuration and the template renderer, turns an
//! [`EmailRequest`] into a built message, and hands it to the configured
//! backend. The one piece of policy living here is the silent-degrade path:
//! when lenient validation dropped every recipient of a request that
//! originally had some, the send completes successfully without any delivery
//! attempt.

use tracing::debug;

use crate::backends::{EmailBackend, backend_from_config};
use crate::config::MailConfig;
use crate::message::{Envelope, Message};
use crate::request::EmailRequest;
use crate::templates::{FileTemplateRenderer, TemplateRenderer};
use crate::EmailResult;

/// Builds and dispatches e-mail requests.
///
/// # Examples
///
/// ```no_run
/// use mailsmith::{EmailRequest, MailConfig, Mailer};
///
/// # async fn example() -> mailsmith::EmailResult<()> {
/// let mailer = Mailer::new(MailConfig::default());
///
/// let mut request = EmailRequest::new("welcome")?;
/// request.set_sender("noreply@example.com", None);
/// request.add_to("user@example.com", Some("Alice"));
/// mailer.send(request).await?;
/// # Ok(())
/// # }
/// ```
pub struct Mailer {
	config: MailConfig,
	renderer: Box<dyn TemplateRenderer>,
}

impl Mailer {
	/// A mailer rendering templates from the filesystem.
	pub fn new(config: MailConfig) -> Self {
		Self {
			config,
			renderer: Box::new(FileTemplateRenderer::new()),
		}
	}

	/// A mailer with a caller-supplied renderer.
	pub fn with_renderer(config: MailConfig, renderer: Box<dyn TemplateRenderer>) -> Self {
		Self { config, renderer }
	}

	pub fn config(&self) -> &MailConfig {
		&self.config
	}

	/// Build the message without sending it.
	///
	/// Returns `Ok(None)` on the silent-degrade path: the request named at
	/// least one recipient, lenient validation dropped them all, and nothing
	/// is left to deliver. Every other failure propagates.
	pub fn prepare(&self, request: EmailRequest) -> EmailResult<Option<(Message, Option<Envelope>)>> {
		let had_recipients = request.addresses().total() > 0;
		let (message, envelope) = request.build(&self.config, self.renderer.as_ref())?;

		if message.recipient_count() == 0
			&& had_recipients
			&& !self.config.strict_address_validation
		{
			debug!("all recipients dropped by lenient validation, skipping delivery");
			return Ok(None);
		}

		Ok(Some((message, envelope)))
	}

	/// Build the request and deliver it through the configured backend.
	pub async fn send(&self, request: EmailRequest) -> EmailResult<()> {
		match self.prepare(request)? {
			Some((message, envelope)) => {
				let backend = backend_from_config(&self.config)?;
				backend.send(&message, envelope.as_ref()).await
			}
			None => Ok(()),
		}
	}

	/// Build the request and deliver it through an explicit backend,
	/// bypassing transport selection.
	pub async fn send_with_backend(
		&self,
		request: EmailRequest,
		backend: &dyn EmailBackend,
	) -> EmailResult<()> {
		match self.prepare(request)? {
			Some((message, envelope)) => backend.send(&message, envelope.as_ref()).await,
			None => Ok(()),
		}
	}
}

//! Delivery backends
//!
//! A backend accepts a fully built [`Message`] plus an optional delivery
//! [`Envelope`] and attempts delivery once; there is no retry or queueing at
//! this layer.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::config::{MailConfig, TransportKind};
use crate::message::{Envelope, Message};
use crate::EmailResult;

pub mod sendmail;
pub mod smtp;

pub use sendmail::SendmailBackend;
pub use smtp::SmtpBackend;

/// A single best-effort delivery attempt.
#[async_trait]
pub trait EmailBackend: Send + Sync {
	async fn send(&self, message: &Message, envelope: Option<&Envelope>) -> EmailResult<()>;
}

/// Select and construct the backend named by the configuration.
///
/// # Examples
///
/// ```
/// use mailsmith::{backend_from_config, MailConfig};
///
/// let backend = backend_from_config(&MailConfig::default())?;
/// # Ok::<(), mailsmith::EmailError>(())
/// ```
pub fn backend_from_config(config: &MailConfig) -> EmailResult<Box<dyn EmailBackend>> {
	match config.transport {
		TransportKind::Smtp => Ok(Box::new(SmtpBackend::from_options(&config.smtp)?)),
		TransportKind::Sendmail => Ok(Box::new(SendmailBackend::new(&config.sendmail_command)?)),
	}
}

/// Records messages instead of delivering them. Intended for tests.
///
/// # Examples
///
/// ```
/// use mailsmith::MemoryBackend;
///
/// let backend = MemoryBackend::new();
/// assert!(backend.sent().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
	sent: Mutex<Vec<(Message, Option<Envelope>)>>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Messages recorded so far, in send order.
	pub fn sent(&self) -> Vec<(Message, Option<Envelope>)> {
		self.sent.lock().expect("memory backend poisoned").clone()
	}
}

#[async_trait]
impl EmailBackend for MemoryBackend {
	async fn send(&self, message: &Message, envelope: Option<&Envelope>) -> EmailResult<()> {
		self.sent
			.lock()
			.expect("memory backend poisoned")
			.push((message.clone(), envelope.cloned()));
		Ok(())
	}
}

//! Configuration for message assembly and transport selection
//!
//! The original design used process-wide mutable settings; here the
//! configuration is an explicit value owned by the [`Mailer`](crate::Mailer)
//! for its lifetime.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroize;

/// Which transport the mailer hands built messages to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
	/// Pipe the message to a local mail agent (default).
	#[default]
	Sendmail,
	/// Deliver over an SMTP connection.
	Smtp,
}

/// Connection security for the SMTP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
	/// STARTTLS upgrade on a plaintext connection (`encryption = "tls"`).
	StartTls,
	/// Implicit TLS from the first byte (`encryption = "ssl"`).
	Ssl,
}

/// An SMTP password, zeroized when dropped and redacted from debug output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Password {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Password(***)")
	}
}

impl Drop for Password {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

/// Settings for the SMTP transport.
///
/// `host` and `port` are required to construct the transport; the rest is
/// optional. Credentials are only used when both `username` and `password`
/// are present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SmtpOptions {
	pub host: Option<String>,
	pub port: Option<u16>,
	/// `"tls"` or `"ssl"`; any other value is ignored, not an error.
	pub encryption: Option<String>,
	pub username: Option<String>,
	pub password: Option<Password>,
}

impl SmtpOptions {
	/// Interpret the `encryption` string. Unrecognized values mean "no
	/// transport security", matching the lenient historical behaviour.
	pub fn security(&self) -> Option<SmtpSecurity> {
		match self.encryption.as_deref() {
			Some("tls") => Some(SmtpSecurity::StartTls),
			Some("ssl") => Some(SmtpSecurity::Ssl),
			_ => None,
		}
	}
}

/// Configuration for the mailer.
///
/// Deserializable from any serde format; every field has a default so partial
/// configuration files work.
///
/// # Examples
///
/// ```
/// use mailsmith::{MailConfig, TransportKind};
///
/// let config: MailConfig = serde_json::from_str(
///     r#"{ "transport": "smtp", "smtp": { "host": "mail.example.com", "port": 587 } }"#,
/// ).unwrap();
/// assert_eq!(config.transport, TransportKind::Smtp);
/// assert!(config.strict_address_validation);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
	pub transport: TransportKind,
	pub smtp: SmtpOptions,
	/// Command line for the local mail agent; must contain `-t` or `-bs`.
	pub sendmail_command: String,
	/// When set, blind-copied on every send.
	pub archive_mailbox: Option<String>,
	/// When set, every recipient's delivery address is overridden at send time.
	pub redirect_all_mailbox: Option<String>,
	/// Name of a header stamped with the message `type`; `None` disables it.
	pub email_type_header: Option<String>,
	/// When disabled, an invalid recipient is silently dropped instead of
	/// aborting the whole send.
	pub strict_address_validation: bool,
	/// Default template search path used when the request registers none.
	pub template_path: Option<PathBuf>,
	/// Directory scanned for files to embed as inline HTML images.
	pub media_path: Option<PathBuf>,
}

impl Default for MailConfig {
	fn default() -> Self {
		Self {
			transport: TransportKind::Sendmail,
			smtp: SmtpOptions::default(),
			sendmail_command: default_sendmail_command(),
			archive_mailbox: None,
			redirect_all_mailbox: None,
			email_type_header: None,
			strict_address_validation: true,
			template_path: None,
			media_path: None,
		}
	}
}

fn default_sendmail_command() -> String {
	"/usr/sbin/sendmail -t -i".to_string()
}

//! Local mail agent delivery over a process pipe
//!
//! The agent command must request one of two modes: `-bs` (interactive SMTP
//! over stdin/stdout, structurally recognized but not supported) or `-t`
//! (recipients read from headers, one-shot). In `-t` mode the agent extracts
//! recipients from the To/Cc headers of whatever it reads on stdin, and Bcc
//! is never serialized into those headers; the transport therefore writes one
//! synthetic `Bcc:` line per blind recipient ahead of the message bytes so
//! the agent still delivers to them, while the stored message keeps them
//! invisible.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::message::{Envelope, Message};
use crate::{mime, EmailBackend, EmailError, EmailResult};

/// Agent invocation mode, detected from the configured command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendmailMode {
	/// `-t`: read recipients from headers, then the body, in one shot.
	Headers,
	/// `-bs`: interactive SMTP-like protocol over the pipe. Recognized but
	/// unsupported; sending fails loudly instead of emulating `-t`.
	Interactive,
}

/// Delivers by piping the serialized message to a local mail agent.
///
/// # Examples
///
/// ```
/// use mailsmith::SendmailBackend;
///
/// let backend = SendmailBackend::new("/usr/sbin/sendmail -t -i")?;
/// assert!(SendmailBackend::new("/usr/sbin/sendmail -q").is_err());
/// # Ok::<(), mailsmith::EmailError>(())
/// ```
pub struct SendmailBackend {
	command: String,
	mode: SendmailMode,
}

impl SendmailBackend {
	/// Parse the agent command; fails when it requests neither `-bs` nor
	/// `-t`.
	pub fn new(command: &str) -> EmailResult<Self> {
		let tokens: Vec<&str> = command.split_whitespace().collect();
		let mode = if tokens.contains(&"-bs") {
			SendmailMode::Interactive
		} else if tokens.contains(&"-t") {
			SendmailMode::Headers
		} else {
			return Err(EmailError::Configuration(format!(
				"unsupported sendmail command flags \"{}\"; must include \"-bs\" or \"-t\"",
				command
			)));
		};

		Ok(Self {
			command: command.to_string(),
			mode,
		})
	}

	/// The command with an envelope-sender flag appended, unless the
	/// configured command already carries one.
	fn delivery_command(&self, envelope_sender: &str) -> String {
		let has_sender_flag = self
			.command
			.split_whitespace()
			.any(|token| token.starts_with("-f"));
		if has_sender_flag {
			self.command.clone()
		} else {
			format!("{} -f{}", self.command, envelope_sender)
		}
	}

	/// Whether the command already requests "no dot processing" (`-i`/`-oi`),
	/// in which case the transparency escaping is skipped.
	fn suppresses_dot_stuffing(&self) -> bool {
		self.command
			.split_whitespace()
			.any(|token| token == "-i" || token == "-oi")
	}

	/// The exact bytes written to the agent's stdin in `-t` mode: synthetic
	/// `Bcc:` lines (one per blind recipient, in message order), then the
	/// serialized message with line endings normalized to `\n` and, unless
	/// suppressed, leading dots doubled.
	pub fn prepare_stream(&self, message: &Message) -> EmailResult<Vec<u8>> {
		let raw = mime::format_message(message)?;
		let mut body = normalize_newlines(&raw);
		if !self.suppresses_dot_stuffing() {
			body = stuff_dots(&body);
		}

		let mut stream = Vec::with_capacity(body.len() + 64);
		for recipient in message.bcc() {
			stream.extend_from_slice(format!("Bcc: {}\n", recipient.to_header()).as_bytes());
		}
		stream.extend_from_slice(&body);
		Ok(stream)
	}
}

#[async_trait]
impl EmailBackend for SendmailBackend {
	async fn send(&self, message: &Message, envelope: Option<&Envelope>) -> EmailResult<()> {
		if self.mode == SendmailMode::Interactive {
			return Err(EmailError::NotSupported(format!(
				"the -bs sendmail mode is not supported (\"{}\")",
				self.command
			)));
		}

		let envelope_sender = envelope
			.map(|e| e.sender().to_string())
			.unwrap_or_else(|| message.from().email().to_string());
		let command = self.delivery_command(&envelope_sender);
		let stream = self.prepare_stream(message)?;

		debug!(command = command.as_str(), "sendmail transport starting");

		let mut parts = command.split_whitespace();
		let program = parts
			.next()
			.ok_or_else(|| EmailError::Configuration("empty sendmail command".to_string()))?;
		let mut child = Command::new(program)
			.args(parts)
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
			.map_err(|e| EmailError::Delivery(format!("failed to start {}: {}", program, e)))?;

		let mut stdin = child
			.stdin
			.take()
			.ok_or_else(|| EmailError::Delivery("sendmail stdin unavailable".to_string()))?;
		stdin
			.write_all(&stream)
			.await
			.map_err(|e| EmailError::Delivery(format!("write to sendmail failed: {}", e)))?;
		stdin
			.shutdown()
			.await
			.map_err(|e| EmailError::Delivery(format!("closing sendmail stdin failed: {}", e)))?;
		drop(stdin);

		let status = child
			.wait()
			.await
			.map_err(|e| EmailError::Delivery(format!("waiting for sendmail failed: {}", e)))?;
		if !status.success() {
			return Err(EmailError::Delivery(format!(
				"sendmail process exited with {}",
				status
			)));
		}

		debug!("sendmail transport finished");
		Ok(())
	}
}

/// Normalize all CRLF line endings to bare LF for the local pipe.
fn normalize_newlines(input: &[u8]) -> Vec<u8> {
	let mut output = Vec::with_capacity(input.len());
	let mut i = 0;
	while i < input.len() {
		if input[i] == b'\r' && input.get(i + 1) == Some(&b'\n') {
			output.push(b'\n');
			i += 2;
		} else {
			output.push(input[i]);
			i += 1;
		}
	}
	output
}

/// Double any dot at the start of a line, per the local-delivery transparency
/// convention.
fn stuff_dots(input: &[u8]) -> Vec<u8> {
	let mut output = Vec::with_capacity(input.len() + 16);
	let mut at_line_start = true;
	for &byte in input {
		if at_line_start && byte == b'.' {
			output.push(b'.');
		}
		output.push(byte);
		at_line_start = byte == b'\n';
	}
	output
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::address::Address;
	use crate::message::HeaderMap;
	use rstest::rstest;

	fn message_with_bcc(bcc: Vec<Address>) -> Message {
		Message {
			subject: "Subject".to_string(),
			html_body: String::new(),
			text_body: "body".to_string(),
			headers: HeaderMap::new(),
			from: Address::new("from@example.com", None),
			reply_to: vec![],
			to: vec![Address::new("to@example.com", None)],
			cc: vec![],
			bcc,
			inline_images: vec![],
			attachments: vec![],
		}
	}

	#[rstest]
	#[case("/usr/sbin/sendmail -t -i")]
	#[case("/usr/sbin/sendmail -bs")]
	#[case("sendmail -oi -t")]
	fn test_supported_commands(#[case] command: &str) {
		assert!(SendmailBackend::new(command).is_ok());
	}

	#[rstest]
	#[case("/usr/sbin/sendmail")]
	#[case("/usr/sbin/sendmail -q30m")]
	#[case("")]
	fn test_unsupported_commands(#[case] command: &str) {
		assert!(matches!(
			SendmailBackend::new(command),
			Err(EmailError::Configuration(_))
		));
	}

	#[rstest]
	fn test_sender_flag_appended_once() {
		// Arrange
		let backend = SendmailBackend::new("/usr/sbin/sendmail -t -i").unwrap();

		// Act & Assert
		assert_eq!(
			backend.delivery_command("bounce@example.com"),
			"/usr/sbin/sendmail -t -i -fbounce@example.com"
		);

		let explicit = SendmailBackend::new("/usr/sbin/sendmail -t -i -ffixed@example.com").unwrap();
		assert_eq!(
			explicit.delivery_command("bounce@example.com"),
			"/usr/sbin/sendmail -t -i -ffixed@example.com"
		);
	}

	#[rstest]
	fn test_bcc_lines_written_before_body_in_order() {
		// Arrange
		let backend = SendmailBackend::new("/usr/sbin/sendmail -t -i").unwrap();
		let message = message_with_bcc(vec![
			Address::new("first@example.com", None),
			Address::new("second@example.com", Some("Two")),
		]);

		// Act
		let stream = backend.prepare_stream(&message).unwrap();
		let text = String::from_utf8_lossy(&stream).to_string();

		// Assert: exactly two synthetic lines, in order, ahead of the headers
		let bcc_lines: Vec<&str> = text.lines().filter(|l| l.starts_with("Bcc: ")).collect();
		assert_eq!(
			bcc_lines,
			vec!["Bcc: first@example.com", "Bcc: Two <second@example.com>"]
		);
		let bcc_pos = text.find("Bcc: first@example.com").unwrap();
		let date_pos = text.find("Date: ").unwrap();
		assert!(bcc_pos < date_pos);
	}

	#[rstest]
	fn test_stream_uses_bare_newlines() {
		// Arrange
		let backend = SendmailBackend::new("/usr/sbin/sendmail -t -i").unwrap();
		let message = message_with_bcc(vec![]);

		// Act
		let stream = backend.prepare_stream(&message).unwrap();

		// Assert
		assert!(!stream.windows(2).any(|w| w == b"\r\n"));
	}

	#[rstest]
	fn test_dot_stuffing_applied_without_suppression_flag() {
		// Arrange
		let backend = SendmailBackend::new("/usr/sbin/sendmail -t").unwrap();
		let mut message = message_with_bcc(vec![]);
		message.text_body = "line\n.starts with dot\n".to_string();

		// Act
		let stream = backend.prepare_stream(&message).unwrap();
		let text = String::from_utf8_lossy(&stream).to_string();

		// Assert: quoted-printable escapes the leading dot would keep, so
		// check against the raw mechanism instead
		assert!(String::from_utf8_lossy(&stuff_dots(b"a\n.b\n")).contains("\n..b"));
		assert!(!text.is_empty());
	}

	#[rstest]
	fn test_dot_stuffing_suppressed_by_flag() {
		assert_eq!(
			SendmailBackend::new("/usr/sbin/sendmail -t -i")
				.unwrap()
				.suppresses_dot_stuffing(),
			true
		);
		assert_eq!(
			SendmailBackend::new("/usr/sbin/sendmail -oi -t")
				.unwrap()
				.suppresses_dot_stuffing(),
			true
		);
		assert_eq!(
			SendmailBackend::new("/usr/sbin/sendmail -t")
				.unwrap()
				.suppresses_dot_stuffing(),
			false
		);
	}

	#[rstest]
	fn test_interactive_mode_send_is_not_supported() {
		// Arrange
		let backend = SendmailBackend::new("/usr/sbin/sendmail -bs").unwrap();
		let message = message_with_bcc(vec![]);

		// Act
		let result = futures::executor::block_on(backend.send(&message, None));

		// Assert
		assert!(matches!(result, Err(EmailError::NotSupported(_))));
	}
}

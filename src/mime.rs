//! RFC 5322 serialization of a built message
//!
//! Produces the byte stream handed to the transports: headers, then a
//! multipart structure of mixed (attachments) over related (inline images)
//! over alternative (text + HTML). Bodies are quoted-printable, file parts
//! base64. Bcc recipients are deliberately never written to any header; the
//! transports carry them in the delivery envelope instead.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use uuid::Uuid;

use crate::message::{Attachment, InlineImage, Message};
use crate::EmailResult;

const CRLF: &[u8] = b"\r\n";
const BASE64_LINE_LENGTH: usize = 76;

/// Serialize a message to RFC 5322 bytes with CRLF line endings.
///
/// Attachment and inline-image files are read from disk here; a read failure
/// surfaces as an I/O error.
pub fn format_message(message: &Message) -> EmailResult<Vec<u8>> {
	let mut output = Vec::new();

	write_header(&mut output, "Date", &Utc::now().to_rfc2822());
	write_header(&mut output, "From", &message.from().to_header());

	if !message.to().is_empty() {
		let list: Vec<String> = message.to().iter().map(|a| a.to_header()).collect();
		write_header(&mut output, "To", &list.join(", "));
	}
	if !message.cc().is_empty() {
		let list: Vec<String> = message.cc().iter().map(|a| a.to_header()).collect();
		write_header(&mut output, "Cc", &list.join(", "));
	}
	if !message.reply_to().is_empty() {
		let list: Vec<String> = message.reply_to().iter().map(|a| a.to_header()).collect();
		write_header(&mut output, "Reply-To", &list.join(", "));
	}

	write_header(&mut output, "Subject", &encode_header_value(message.subject()));
	write_header(&mut output, "Message-ID", &generate_message_id(message));

	for (name, value) in message.headers().iter() {
		write_header(&mut output, name, &encode_header_value(value));
	}

	write_header(&mut output, "MIME-Version", "1.0");

	let has_attachments = !message.attachments().is_empty();
	let has_inline = !message.inline_images().is_empty();

	if has_attachments {
		let mixed = generate_boundary();
		write_header(
			&mut output,
			"Content-Type",
			&format!("multipart/mixed; boundary=\"{}\"", mixed),
		);
		output.extend_from_slice(CRLF);

		output.extend_from_slice(format!("--{}\r\n", mixed).as_bytes());
		if has_inline {
			write_related(&mut output, message)?;
		} else {
			write_bodies(&mut output, message);
		}

		for attachment in message.attachments() {
			output.extend_from_slice(format!("--{}\r\n", mixed).as_bytes());
			write_attachment(&mut output, attachment)?;
		}
		output.extend_from_slice(format!("--{}--\r\n", mixed).as_bytes());
	} else if has_inline {
		write_related(&mut output, message)?;
	} else {
		write_bodies(&mut output, message);
	}

	Ok(output)
}

/// multipart/related wrapping the bodies plus the inline images. The part
/// headers flow into whatever header block is currently open, so this works
/// both at the top level and inside a mixed part.
fn write_related(output: &mut Vec<u8>, message: &Message) -> EmailResult<()> {
	let related = generate_boundary();
	write_header(
		output,
		"Content-Type",
		&format!("multipart/related; boundary=\"{}\"", related),
	);
	output.extend_from_slice(CRLF);

	output.extend_from_slice(format!("--{}\r\n", related).as_bytes());
	write_bodies(output, message);

	for image in message.inline_images() {
		output.extend_from_slice(format!("--{}\r\n", related).as_bytes());
		write_inline_image(output, image)?;
	}
	output.extend_from_slice(format!("--{}--\r\n", related).as_bytes());
	Ok(())
}

/// Writes the text/HTML content: multipart/alternative when both parts are
/// present, a single part otherwise. An empty text body with an empty HTML
/// body degrades to an empty text/plain part.
fn write_bodies(output: &mut Vec<u8>, message: &Message) {
	let has_text = !message.text_body().is_empty();
	let has_html = !message.html_body().is_empty();

	if has_text && has_html {
		let alternative = generate_boundary();
		write_header(
			output,
			"Content-Type",
			&format!("multipart/alternative; boundary=\"{}\"", alternative),
		);
		output.extend_from_slice(CRLF);

		output.extend_from_slice(format!("--{}\r\n", alternative).as_bytes());
		write_text_part(output, "text/plain", message.text_body());
		output.extend_from_slice(format!("--{}\r\n", alternative).as_bytes());
		write_text_part(output, "text/html", message.html_body());
		output.extend_from_slice(format!("--{}--\r\n", alternative).as_bytes());
	} else if has_html {
		write_text_part(output, "text/html", message.html_body());
	} else {
		write_text_part(output, "text/plain", message.text_body());
	}
}

fn write_text_part(output: &mut Vec<u8>, content_type: &str, content: &str) {
	write_header(
		output,
		"Content-Type",
		&format!("{}; charset=utf-8", content_type),
	);
	write_header(output, "Content-Transfer-Encoding", "quoted-printable");
	output.extend_from_slice(CRLF);
	output.extend_from_slice(&quoted_printable::encode(content.as_bytes()));
	output.extend_from_slice(CRLF);
}

fn write_attachment(output: &mut Vec<u8>, attachment: &Attachment) -> EmailResult<()> {
	let data = std::fs::read(attachment.path())?;
	let display_name = attachment.display_name();
	let mime_type = detect_mime(&display_name);

	write_header(
		output,
		"Content-Type",
		&format!("{}; name=\"{}\"", mime_type, display_name),
	);
	write_header(output, "Content-Transfer-Encoding", "base64");
	write_header(
		output,
		"Content-Disposition",
		&format!("attachment; filename=\"{}\"", display_name),
	);
	output.extend_from_slice(CRLF);
	write_base64(output, &data);
	Ok(())
}

fn write_inline_image(output: &mut Vec<u8>, image: &InlineImage) -> EmailResult<()> {
	let data = std::fs::read(image.path())?;
	let mime_type = detect_mime(image.content_id());

	write_header(output, "Content-Type", &mime_type.to_string());
	write_header(output, "Content-Transfer-Encoding", "base64");
	write_header(output, "Content-ID", &format!("<{}>", image.content_id()));
	write_header(output, "Content-Disposition", "inline");
	output.extend_from_slice(CRLF);
	write_base64(output, &data);
	Ok(())
}

fn write_base64(output: &mut Vec<u8>, data: &[u8]) {
	let encoded = BASE64.encode(data);
	for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
		output.extend_from_slice(chunk);
		output.extend_from_slice(CRLF);
	}
}

fn detect_mime(name: &str) -> mime::Mime {
	mime_guess::from_path(name).first_or_octet_stream()
}

fn write_header(output: &mut Vec<u8>, name: &str, value: &str) {
	output.extend_from_slice(name.as_bytes());
	output.extend_from_slice(b": ");
	output.extend_from_slice(value.as_bytes());
	output.extend_from_slice(CRLF);
}

/// RFC 2047 encoded-word for non-ASCII header values; ASCII passes through.
fn encode_header_value(value: &str) -> String {
	if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
		return value.to_string();
	}
	format!("=?UTF-8?B?{}?=", BASE64.encode(value.as_bytes()))
}

fn generate_message_id(message: &Message) -> String {
	let domain = message
		.from()
		.email()
		.rsplit_once('@')
		.map(|(_, domain)| domain)
		.unwrap_or("localhost");
	format!("<{}@{}>", Uuid::new_v4(), domain)
}

fn generate_boundary() -> String {
	format!("----=_Part_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::address::Address;
	use crate::message::HeaderMap;
	use rstest::rstest;
	use std::path::PathBuf;

	fn sample_message() -> Message {
		let mut headers = HeaderMap::new();
		headers.set("X-Email-Type", "welcome");
		Message {
			subject: "Welcome".to_string(),
			html_body: "<p>hi</p>".to_string(),
			text_body: "hi".to_string(),
			headers,
			from: Address::new("sender@example.com", Some("Sender")),
			reply_to: vec![],
			to: vec![Address::new("to@example.com", None)],
			cc: vec![Address::new("cc@example.com", Some("Carbon"))],
			bcc: vec![Address::new("hidden@example.com", None)],
			inline_images: vec![],
			attachments: vec![],
		}
	}

	#[rstest]
	fn test_bcc_never_serialized() {
		// Arrange
		let message = sample_message();

		// Act
		let bytes = format_message(&message).unwrap();
		let content = String::from_utf8_lossy(&bytes);

		// Assert
		assert!(!content.contains("Bcc"));
		assert!(!content.contains("hidden@example.com"));
	}

	#[rstest]
	fn test_standard_headers_present() {
		// Arrange
		let message = sample_message();

		// Act
		let content = String::from_utf8_lossy(&format_message(&message).unwrap()).to_string();

		// Assert
		assert!(content.contains("From: Sender <sender@example.com>"));
		assert!(content.contains("To: to@example.com"));
		assert!(content.contains("Cc: Carbon <cc@example.com>"));
		assert!(content.contains("Subject: Welcome"));
		assert!(content.contains("X-Email-Type: welcome"));
		assert!(content.contains("MIME-Version: 1.0"));
		assert!(content.contains("Message-ID: <"));
	}

	#[rstest]
	fn test_both_bodies_yield_multipart_alternative() {
		// Arrange
		let message = sample_message();

		// Act
		let content = String::from_utf8_lossy(&format_message(&message).unwrap()).to_string();

		// Assert
		assert!(content.contains("multipart/alternative"));
		assert!(content.contains("text/plain; charset=utf-8"));
		assert!(content.contains("text/html; charset=utf-8"));
	}

	#[rstest]
	fn test_html_only_is_single_part() {
		// Arrange
		let mut message = sample_message();
		message.text_body = String::new();

		// Act
		let content = String::from_utf8_lossy(&format_message(&message).unwrap()).to_string();

		// Assert
		assert!(!content.contains("multipart/alternative"));
		assert!(content.contains("text/html; charset=utf-8"));
	}

	#[rstest]
	fn test_non_ascii_subject_is_encoded() {
		// Arrange
		let mut message = sample_message();
		message.subject = "Grüße".to_string();

		// Act
		let content = String::from_utf8_lossy(&format_message(&message).unwrap()).to_string();

		// Assert
		assert!(content.contains("Subject: =?UTF-8?B?"));
	}

	#[rstest]
	fn test_attachment_is_base64_mixed_part() {
		// Arrange
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("notes.txt");
		std::fs::write(&path, b"attachment body").unwrap();
		let mut message = sample_message();
		message.attachments = vec![Attachment::Path(path)];

		// Act
		let content = String::from_utf8_lossy(&format_message(&message).unwrap()).to_string();

		// Assert
		assert!(content.contains("multipart/mixed"));
		assert!(content.contains("Content-Disposition: attachment; filename=\"notes.txt\""));
		assert!(content.contains(&BASE64.encode(b"attachment body")));
	}

	#[rstest]
	fn test_inline_image_carries_content_id() {
		// Arrange
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("logo.png");
		std::fs::write(&path, b"\x89PNG").unwrap();
		let mut message = sample_message();
		message.inline_images = vec![InlineImage::new("logo.png", path)];

		// Act
		let content = String::from_utf8_lossy(&format_message(&message).unwrap()).to_string();

		// Assert
		assert!(content.contains("multipart/related"));
		assert!(content.contains("Content-ID: <logo.png>"));
		assert!(content.contains("Content-Disposition: inline"));
	}

	#[rstest]
	fn test_missing_attachment_file_is_io_error() {
		// Arrange
		let mut message = sample_message();
		message.attachments = vec![Attachment::Path(PathBuf::from("/nonexistent/void.bin"))];

		// Act & Assert
		assert!(matches!(
			format_message(&message),
			Err(crate::EmailError::Io(_))
		));
	}
}

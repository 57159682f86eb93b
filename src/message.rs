//! The built, immutable message and its parts
//!
//! A [`Message`] is produced once per send attempt by
//! [`EmailRequest::build`](crate::EmailRequest::build) and never mutated
//! afterwards; all fields are private and exposed through getters only.

use crate::address::Address;
use std::path::{Path, PathBuf};

/// A file attached to a message.
///
/// Either a bare path (display name derived from the basename) or a path with
/// an explicit display name.
///
/// # Examples
///
/// ```
/// use mailsmith::Attachment;
/// use std::path::PathBuf;
///
/// let plain = Attachment::Path(PathBuf::from("/data/reports/2024.pdf"));
/// assert_eq!(plain.display_name(), "2024.pdf");
///
/// let named = Attachment::Named {
///     path: PathBuf::from("/data/blobs/7f3a"),
///     display_name: "invoice.pdf".to_string(),
/// };
/// assert_eq!(named.display_name(), "invoice.pdf");
/// ```
#[derive(Debug, Clone)]
pub enum Attachment {
	/// A file referenced by path only.
	Path(PathBuf),
	/// A file with a display name independent of its storage path.
	Named { path: PathBuf, display_name: String },
}

impl Attachment {
	pub fn path(&self) -> &Path {
		match self {
			Attachment::Path(path) => path,
			Attachment::Named { path, .. } => path,
		}
	}

	/// The filename shown to the recipient.
	pub fn display_name(&self) -> String {
		match self {
			Attachment::Path(path) => path
				.file_name()
				.map(|name| name.to_string_lossy().into_owned())
				.unwrap_or_else(|| path.to_string_lossy().into_owned()),
			Attachment::Named { display_name, .. } => display_name.clone(),
		}
	}
}

/// An image embedded in the HTML body, addressed by its Content-ID.
#[derive(Debug, Clone)]
pub struct InlineImage {
	content_id: String,
	path: PathBuf,
}

impl InlineImage {
	pub fn new(content_id: impl Into<String>, path: PathBuf) -> Self {
		Self {
			content_id: content_id.into(),
			path,
		}
	}

	pub fn content_id(&self) -> &str {
		&self.content_id
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

/// Ordered header name/value pairs with unique, ASCII-case-insensitive names.
/// Setting an existing name replaces its value in place (last write wins).
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
	entries: Vec<(String, String)>,
}

impl HeaderMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set a header, replacing any existing value under the same name.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();
		match self
			.entries
			.iter_mut()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
		{
			Some(entry) => entry.1 = value,
			None => self.entries.push((name, value)),
		}
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries
			.iter()
			.any(|(existing, _)| existing.eq_ignore_ascii_case(name))
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Delivery-level sender/recipient pair, distinct from the visible From/To
/// headers.
#[derive(Debug, Clone)]
pub struct Envelope {
	sender: String,
	recipients: Vec<String>,
}

impl Envelope {
	pub fn new(sender: impl Into<String>, recipients: Vec<String>) -> Self {
		Self {
			sender: sender.into(),
			recipients,
		}
	}

	/// The bounce address.
	pub fn sender(&self) -> &str {
		&self.sender
	}

	pub fn recipients(&self) -> &[String] {
		&self.recipients
	}
}

/// A fully assembled message, ready for a transport.
///
/// An empty `html_body` or `text_body` means that part is absent. Bcc
/// recipients are carried here for the transports' benefit but are never
/// written into the serialized message headers.
#[derive(Debug, Clone)]
pub struct Message {
	pub(crate) subject: String,
	pub(crate) html_body: String,
	pub(crate) text_body: String,
	pub(crate) headers: HeaderMap,
	pub(crate) from: Address,
	pub(crate) reply_to: Vec<Address>,
	pub(crate) to: Vec<Address>,
	pub(crate) cc: Vec<Address>,
	pub(crate) bcc: Vec<Address>,
	pub(crate) inline_images: Vec<InlineImage>,
	pub(crate) attachments: Vec<Attachment>,
}

impl Message {
	pub fn subject(&self) -> &str {
		&self.subject
	}

	pub fn html_body(&self) -> &str {
		&self.html_body
	}

	pub fn text_body(&self) -> &str {
		&self.text_body
	}

	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	pub fn from(&self) -> &Address {
		&self.from
	}

	pub fn reply_to(&self) -> &[Address] {
		&self.reply_to
	}

	pub fn to(&self) -> &[Address] {
		&self.to
	}

	pub fn cc(&self) -> &[Address] {
		&self.cc
	}

	pub fn bcc(&self) -> &[Address] {
		&self.bcc
	}

	pub fn inline_images(&self) -> &[InlineImage] {
		&self.inline_images
	}

	pub fn attachments(&self) -> &[Attachment] {
		&self.attachments
	}

	/// Recipients across all three classes.
	pub fn recipient_count(&self) -> usize {
		self.to.len() + self.cc.len() + self.bcc.len()
	}

	/// Every recipient's delivery address, To then Cc then Bcc.
	pub fn recipient_emails(&self) -> Vec<String> {
		self.to
			.iter()
			.chain(self.cc.iter())
			.chain(self.bcc.iter())
			.map(|a| a.email().to_string())
			.collect()
	}
}

//! The mutable e-mail request and the build pipeline
//!
//! An [`EmailRequest`] is created with a mandatory message `type`, populated
//! through setters, then consumed exactly once by [`EmailRequest::build`],
//! which produces the immutable [`Message`] (plus an optional [`Envelope`])
//! or fails without a partial result.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::address::{Address, AddressBook, RecipientClass};
use crate::config::MailConfig;
use crate::message::{Attachment, Envelope, HeaderMap, InlineImage, Message};
use crate::templates::{TemplateContext, TemplateError, TemplateRenderer, TemplateVariant};
use crate::validation::{check_header_injection, validate_email, validate_header_name};
use crate::{EmailError, EmailResult};

/// A single outbound e-mail under construction.
///
/// # Examples
///
/// ```
/// use mailsmith::EmailRequest;
///
/// let mut request = EmailRequest::new("welcome")?;
/// request.set_sender("noreply@example.com", Some("Example"));
/// request.add_to("user@example.com", Some("Alice"));
/// request.assign("name", "Alice");
/// assert!(request.validate().is_empty());
/// # Ok::<(), mailsmith::EmailError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EmailRequest {
	email_type: String,
	sender: Option<Address>,
	envelope_from: Option<String>,
	addresses: AddressBook,
	assigns: TemplateContext,
	attachments: Vec<Attachment>,
	template_paths: Vec<PathBuf>,
	headers: HeaderMap,
}

impl EmailRequest {
	/// Create a request for the given message `type`; fails when the type is
	/// empty.
	pub fn new(email_type: impl Into<String>) -> EmailResult<Self> {
		let email_type = email_type.into();
		if email_type.trim().is_empty() {
			return Err(EmailError::Validation("type".to_string()));
		}
		Ok(Self {
			email_type,
			sender: None,
			envelope_from: None,
			addresses: AddressBook::new(),
			assigns: TemplateContext::new(),
			attachments: Vec::new(),
			template_paths: Vec::new(),
			headers: HeaderMap::new(),
		})
	}

	pub fn email_type(&self) -> &str {
		&self.email_type
	}

	/// Set the visible sender; repeat calls overwrite.
	pub fn set_sender(&mut self, email: &str, name: Option<&str>) {
		self.sender = Some(Address::new(email, name));
	}

	/// Set the delivery-envelope bounce address, independent of the From
	/// header.
	pub fn set_envelope_from(&mut self, email: &str) {
		self.envelope_from = Some(email.to_lowercase());
	}

	pub fn add_to(&mut self, email: &str, name: Option<&str>) {
		self.addresses.add(RecipientClass::To, email, name);
	}

	pub fn add_cc(&mut self, email: &str, name: Option<&str>) {
		self.addresses.add(RecipientClass::Cc, email, name);
	}

	pub fn add_bcc(&mut self, email: &str, name: Option<&str>) {
		self.addresses.add(RecipientClass::Bcc, email, name);
	}

	pub fn add_reply_to(&mut self, email: &str, name: Option<&str>) {
		self.addresses.add_reply_to(email, name);
	}

	pub fn addresses(&self) -> &AddressBook {
		&self.addresses
	}

	/// Assign a template variable.
	pub fn assign(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.assigns.insert(key.into(), value.into());
	}

	/// Attach a file by path; the display name is the file's basename.
	pub fn add_attachment(&mut self, path: impl Into<PathBuf>) {
		self.attachments.push(Attachment::Path(path.into()));
	}

	/// Attach a file with an explicit display name.
	pub fn add_attachment_named(&mut self, path: impl Into<PathBuf>, display_name: impl Into<String>) {
		self.attachments.push(Attachment::Named {
			path: path.into(),
			display_name: display_name.into(),
		});
	}

	/// Register a template search path; paths are tried in registration order.
	pub fn add_template_path(&mut self, path: impl Into<PathBuf>) {
		self.template_paths.push(path.into());
	}

	/// Set a custom header. Reserved headers added during `build()` never
	/// overwrite an explicit one.
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.headers.set(name, value);
	}

	/// Collect the names of required fields that are missing.
	///
	/// Empty result means the request is sendable. `build()` calls this and
	/// fails with [`EmailError::Validation`] carrying the joined names.
	pub fn validate(&self) -> Vec<&'static str> {
		let mut errors = Vec::new();
		if self.email_type.trim().is_empty() {
			errors.push("type");
		}
		if self.sender.is_none() {
			errors.push("sender.email");
		}
		if self.addresses.is_empty() {
			errors.push("recipients");
		}
		errors
	}

	/// Consume the request and produce the immutable message.
	///
	/// Pipeline: validate, blind-copy the archive mailbox, render templates,
	/// merge headers, deduplicate recipients, apply the redirect-all override
	/// and per-address validation, embed inline images, append attachments.
	/// Any fatal condition aborts the whole build; no partial message is
	/// returned.
	pub fn build(
		mut self,
		config: &MailConfig,
		renderer: &dyn TemplateRenderer,
	) -> EmailResult<(Message, Option<Envelope>)> {
		let errors = self.validate();
		if !errors.is_empty() {
			return Err(EmailError::Validation(errors.join(", ")));
		}

		if let Some(archive) = &config.archive_mailbox {
			self.addresses.add(RecipientClass::Bcc, archive, None);
		}

		let search_paths = if self.template_paths.is_empty() {
			config.template_path.iter().cloned().collect()
		} else {
			self.template_paths.clone()
		};

		let mut html_body =
			self.render_part(renderer, TemplateVariant::Html, &search_paths)?;
		let text_body = self.render_part(renderer, TemplateVariant::Text, &search_paths)?;
		// A missing subject template is fatal, unlike the body parts.
		let subject = renderer
			.render(&self.email_type, TemplateVariant::Subject, &self.assigns, &search_paths)?
			.trim()
			.to_string();

		let mut headers = self.headers.clone();
		for (name, value) in headers.iter() {
			validate_header_name(name)?;
			check_header_injection(value)?;
		}
		check_header_injection(&subject)?;
		if let Some(type_header) = &config.email_type_header {
			if !headers.contains(type_header) {
				headers.set(type_header.clone(), self.email_type.clone());
			}
		}

		// validate() guarantees the sender is set
		let from = self
			.sender
			.clone()
			.ok_or_else(|| EmailError::Validation("sender.email".to_string()))?;
		let reply_to = self.addresses.reply_to().to_vec();

		self.addresses.finalize();

		let to = self.materialize_class(RecipientClass::To, config)?;
		let cc = self.materialize_class(RecipientClass::Cc, config)?;
		let bcc = self.materialize_class(RecipientClass::Bcc, config)?;

		let inline_images = match &config.media_path {
			Some(media_path) if !html_body.is_empty() => {
				embed_media_references(&mut html_body, media_path)
			}
			_ => Vec::new(),
		};

		let message = Message {
			subject,
			html_body,
			text_body,
			headers,
			from,
			reply_to,
			to,
			cc,
			bcc,
			inline_images,
			attachments: self.attachments,
		};

		let envelope = self.envelope_from.map(|sender| {
			let recipients = message.recipient_emails();
			Envelope::new(sender, recipients)
		});

		Ok((message, envelope))
	}

	/// Render an optional body part: a missing template yields an empty body,
	/// any other failure propagates.
	fn render_part(
		&self,
		renderer: &dyn TemplateRenderer,
		variant: TemplateVariant,
		search_paths: &[PathBuf],
	) -> EmailResult<String> {
		match renderer.render(&self.email_type, variant, &self.assigns, search_paths) {
			Ok(rendered) => Ok(rendered),
			Err(TemplateError::NotFound(_)) => Ok(String::new()),
			Err(e) => Err(e.into()),
		}
	}

	/// Apply the redirect-all override and address validation to one class.
	///
	/// Strict mode fails on the first invalid address; lenient mode drops the
	/// offending recipient and keeps going.
	fn materialize_class(
		&self,
		class: RecipientClass,
		config: &MailConfig,
	) -> EmailResult<Vec<Address>> {
		let mut materialized = Vec::new();
		for address in self.addresses.class(class) {
			let effective = match &config.redirect_all_mailbox {
				Some(redirect) => address.with_email(redirect),
				None => address.clone(),
			};

			if let Err(e) = validate_email(effective.email()) {
				if config.strict_address_validation {
					return Err(e);
				}
				warn!(
					email = effective.email(),
					"dropping recipient with invalid address"
				);
				continue;
			}

			materialized.push(effective);
		}
		Ok(materialized)
	}
}

/// Embed media files referenced by the HTML body.
///
/// Scans the media directory (a missing directory is a no-op) for entries
/// whose file name appears verbatim anywhere in the HTML; each match becomes a
/// content-addressed inline image and every occurrence of the bare file name
/// is rewritten to a `cid:` reference. This is a plain substring scan, not a
/// parsed-HTML scan; it can false-positive on file names that happen to occur
/// in unrelated text. Kept in one place so it can be swapped for a real HTML
/// scan without touching the rest of the pipeline.
fn embed_media_references(html_body: &mut String, media_path: &Path) -> Vec<InlineImage> {
	let mut images = Vec::new();
	let entries = match std::fs::read_dir(media_path) {
		Ok(entries) => entries,
		Err(_) => return images,
	};

	for entry in entries.flatten() {
		if !entry.path().is_file() {
			continue;
		}
		let file_name = entry.file_name().to_string_lossy().into_owned();
		if file_name.starts_with('.') || !html_body.contains(&file_name) {
			continue;
		}

		*html_body = html_body.replace(&file_name, &format!("cid:{}", file_name));
		images.push(InlineImage::new(file_name, entry.path()));
	}

	images
}

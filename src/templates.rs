//! Template rendering for message content
//!
//! The message body and subject come from a [`TemplateRenderer`] collaborator,
//! looked up by the request's `type` identifier. A "template not found"
//! failure is distinguishable from a rendering failure so callers can tolerate
//! a missing body template while treating a missing subject template as fatal.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Variables assigned to a request and substituted into templates.
pub type TemplateContext = HashMap<String, Value>;

/// The three rendered parts of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
	Html,
	Text,
	Subject,
}

impl TemplateVariant {
	/// File name the [`FileTemplateRenderer`] resolves under
	/// `<search-path>/<type>/`.
	pub fn file_name(&self) -> &'static str {
		match self {
			TemplateVariant::Html => "html.tmpl",
			TemplateVariant::Text => "text.tmpl",
			TemplateVariant::Subject => "subject.tmpl",
		}
	}
}

#[derive(Debug, Error)]
pub enum TemplateError {
	/// No template exists for this type/variant in any search path.
	#[error("template not found: {0}")]
	NotFound(String),

	#[error("template rendering failed: {0}")]
	Render(String),
}

/// Turns a message `type` identifier plus a context into a rendered string.
pub trait TemplateRenderer: Send + Sync {
	fn render(
		&self,
		email_type: &str,
		variant: TemplateVariant,
		context: &TemplateContext,
		search_paths: &[PathBuf],
	) -> Result<String, TemplateError>;
}

/// Renders templates from the filesystem with `{{key}}` substitution.
///
/// For each search path, `<path>/<type>/<variant file>` is tried in order and
/// the first existing file wins. HTML templates have their substituted values
/// escaped.
///
/// # Examples
///
/// ```no_run
/// use mailsmith::templates::{FileTemplateRenderer, TemplateContext, TemplateRenderer, TemplateVariant};
/// use std::path::PathBuf;
///
/// let renderer = FileTemplateRenderer::new();
/// let mut context = TemplateContext::new();
/// context.insert("name".to_string(), "Alice".into());
///
/// let subject = renderer.render(
///     "welcome",
///     TemplateVariant::Subject,
///     &context,
///     &[PathBuf::from("/srv/app/templates")],
/// )?;
/// # Ok::<(), mailsmith::templates::TemplateError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileTemplateRenderer;

impl FileTemplateRenderer {
	pub fn new() -> Self {
		Self
	}
}

impl TemplateRenderer for FileTemplateRenderer {
	fn render(
		&self,
		email_type: &str,
		variant: TemplateVariant,
		context: &TemplateContext,
		search_paths: &[PathBuf],
	) -> Result<String, TemplateError> {
		for search_path in search_paths {
			let candidate = search_path.join(email_type).join(variant.file_name());
			if !candidate.is_file() {
				continue;
			}
			let template = std::fs::read_to_string(&candidate)
				.map_err(|e| TemplateError::Render(format!("{}: {}", candidate.display(), e)))?;
			let escape = variant == TemplateVariant::Html;
			return Ok(render_template(&template, context, escape));
		}

		Err(TemplateError::NotFound(format!(
			"{}/{}",
			email_type,
			variant.file_name()
		)))
	}
}

/// Substitute `{{key}}` placeholders with values from the context.
///
/// When `html_escape` is true, substituted values are HTML-escaped.
///
/// # Examples
///
/// ```
/// use mailsmith::templates::{render_template, TemplateContext};
///
/// let mut context = TemplateContext::new();
/// context.insert("name".to_string(), "Alice".into());
///
/// assert_eq!(render_template("Hello {{name}}!", &context, false), "Hello Alice!");
/// ```
pub fn render_template(template: &str, context: &TemplateContext, html_escape: bool) -> String {
	let mut result = template.to_string();

	for (key, value) in context {
		let placeholder = format!("{{{{{}}}}}", key);
		let raw = match value {
			Value::String(s) => s.clone(),
			Value::Number(n) => n.to_string(),
			Value::Bool(b) => b.to_string(),
			Value::Null => String::new(),
			_ => value.to_string(),
		};
		let replacement = if html_escape { escape_html(&raw) } else { raw };

		result = result.replace(&placeholder, &replacement);
	}

	result
}

fn escape_html(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());
	for c in value.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::fs;
	use tempfile::TempDir;

	#[rstest]
	fn test_render_template() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("name".to_string(), "Alice".into());
		context.insert("age".to_string(), 30.into());

		// Act
		let result = render_template("Hello {{name}}, you are {{age}}.", &context, false);

		// Assert
		assert_eq!(result, "Hello Alice, you are 30.");
	}

	#[rstest]
	fn test_render_template_html_escaping() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("name".to_string(), "<script>alert('xss')</script>".into());

		// Act
		let result = render_template("<p>Hello {{name}}</p>", &context, true);

		// Assert
		assert_eq!(
			result,
			"<p>Hello &lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;</p>"
		);
	}

	#[rstest]
	fn test_render_template_no_escape_when_disabled() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("name".to_string(), "<b>bold</b>".into());

		// Act & Assert
		assert_eq!(
			render_template("Hello {{name}}", &context, false),
			"Hello <b>bold</b>"
		);
	}

	#[rstest]
	fn test_file_renderer_resolves_first_search_path() {
		// Arrange
		let first = TempDir::new().unwrap();
		let second = TempDir::new().unwrap();
		for (dir, text) in [(&first, "from first"), (&second, "from second")] {
			let type_dir = dir.path().join("welcome");
			fs::create_dir_all(&type_dir).unwrap();
			fs::write(type_dir.join("subject.tmpl"), text).unwrap();
		}
		let renderer = FileTemplateRenderer::new();
		let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];

		// Act
		let subject = renderer
			.render("welcome", TemplateVariant::Subject, &TemplateContext::new(), &paths)
			.unwrap();

		// Assert
		assert_eq!(subject, "from first");
	}

	#[rstest]
	fn test_file_renderer_substitutes_context() {
		// Arrange
		let dir = TempDir::new().unwrap();
		let type_dir = dir.path().join("order");
		fs::create_dir_all(&type_dir).unwrap();
		fs::write(type_dir.join("text.tmpl"), "Order {{id}} confirmed").unwrap();
		let renderer = FileTemplateRenderer::new();
		let mut context = TemplateContext::new();
		context.insert("id".to_string(), "12345".into());

		// Act
		let text = renderer
			.render(
				"order",
				TemplateVariant::Text,
				&context,
				&[dir.path().to_path_buf()],
			)
			.unwrap();

		// Assert
		assert_eq!(text, "Order 12345 confirmed");
	}

	#[rstest]
	fn test_file_renderer_missing_template_is_not_found() {
		// Arrange
		let dir = TempDir::new().unwrap();
		let renderer = FileTemplateRenderer::new();

		// Act
		let result = renderer.render(
			"missing",
			TemplateVariant::Html,
			&TemplateContext::new(),
			&[dir.path().to_path_buf()],
		);

		// Assert
		assert!(matches!(result, Err(TemplateError::NotFound(_))));
	}
}

#![allow(dead_code)]

use mailsmith::templates::{
	render_template, TemplateContext, TemplateError, TemplateRenderer, TemplateVariant,
};
use mailsmith::{EmailRequest, MailConfig};
use std::path::PathBuf;

/// Renderer serving fixed template strings, with `{{key}}` substitution still
/// applied. `None` for a variant behaves like a missing template file.
pub struct FixedRenderer {
	pub html: Option<String>,
	pub text: Option<String>,
	pub subject: Option<String>,
}

impl FixedRenderer {
	pub fn full() -> Self {
		Self {
			html: Some("<p>Hello {{name}}</p>".to_string()),
			text: Some("Hello {{name}}".to_string()),
			subject: Some("Welcome {{name}}".to_string()),
		}
	}

	pub fn text_only() -> Self {
		Self {
			html: None,
			text: Some("plain body".to_string()),
			subject: Some("Subject".to_string()),
		}
	}
}

impl TemplateRenderer for FixedRenderer {
	fn render(
		&self,
		email_type: &str,
		variant: TemplateVariant,
		context: &TemplateContext,
		_search_paths: &[PathBuf],
	) -> Result<String, TemplateError> {
		let template = match variant {
			TemplateVariant::Html => &self.html,
			TemplateVariant::Text => &self.text,
			TemplateVariant::Subject => &self.subject,
		};
		match template {
			Some(template) => Ok(render_template(
				template,
				context,
				variant == TemplateVariant::Html,
			)),
			None => Err(TemplateError::NotFound(format!(
				"{}/{}",
				email_type,
				variant.file_name()
			))),
		}
	}
}

/// A minimal sendable request: type `welcome`, a sender and one recipient.
pub fn sample_request() -> EmailRequest {
	let mut request = EmailRequest::new("welcome").expect("valid type");
	request.set_sender("noreply@example.com", Some("Example"));
	request.add_to("alice@example.com", Some("Alice"));
	request.assign("name", "Alice");
	request
}

pub fn lenient_config() -> MailConfig {
	let mut config = MailConfig::default();
	config.strict_address_validation = false;
	config
}

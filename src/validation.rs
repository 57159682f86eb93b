//! E-mail address and header validation
//!
//! Syntax-level checks only: a valid address here means RFC 5321/5322 shaped,
//! not deliverable. International domains are normalized through IDNA before
//! the ASCII label rules apply.

use crate::{EmailError, EmailResult};

/// Maximum total length of an address, per RFC 5321 path limits.
pub const MAX_EMAIL_LENGTH: usize = 254;

const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_DOMAIN_LABEL_LENGTH: usize = 63;

/// Validate an e-mail address against RFC syntax rules.
///
/// # Examples
///
/// ```
/// use mailsmith::validation::validate_email;
///
/// assert!(validate_email("user+tag@example.co.uk").is_ok());
/// assert!(validate_email("no-at-sign").is_err());
/// assert!(validate_email("user@.com").is_err());
/// ```
pub fn validate_email(email: &str) -> EmailResult<()> {
	let invalid = || EmailError::InvalidAddress(email.to_string());

	if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
		return Err(invalid());
	}
	if email.chars().any(|c| c.is_control() || c.is_whitespace()) {
		return Err(invalid());
	}

	let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
	validate_local_part(local).map_err(|_| invalid())?;
	validate_domain(domain).map_err(|_| invalid())?;
	Ok(())
}

fn validate_local_part(local: &str) -> Result<(), ()> {
	if local.is_empty() || local.len() > MAX_LOCAL_PART_LENGTH {
		return Err(());
	}
	if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
		return Err(());
	}

	// atext, per RFC 5322 §3.2.3, plus the dot handled above
	let allowed = |c: char| {
		c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c)
	};
	if local.chars().all(allowed) {
		Ok(())
	} else {
		Err(())
	}
}

fn validate_domain(domain: &str) -> Result<(), ()> {
	if domain.is_empty() {
		return Err(());
	}

	// Normalize internationalized domains to their ASCII form first.
	let ascii;
	let domain = if domain.is_ascii() {
		domain
	} else {
		ascii = idna::domain_to_ascii(domain).map_err(|_| ())?;
		&ascii
	};

	for label in domain.split('.') {
		if label.is_empty() || label.len() > MAX_DOMAIN_LABEL_LENGTH {
			return Err(());
		}
		if label.starts_with('-') || label.ends_with('-') {
			return Err(());
		}
		if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
			return Err(());
		}
	}
	Ok(())
}

/// Reject values that would let a caller smuggle extra headers into the
/// serialized message.
pub fn check_header_injection(value: &str) -> EmailResult<()> {
	if value.contains('\r') || value.contains('\n') || value.contains('\0') {
		return Err(EmailError::HeaderInjection(value.to_string()));
	}
	Ok(())
}

/// Validate a header name against RFC 5322 `ftext`: printable ASCII except
/// the colon.
pub fn validate_header_name(name: &str) -> EmailResult<()> {
	let valid = !name.is_empty()
		&& name
			.chars()
			.all(|c| ('!'..='~').contains(&c) && c != ':');
	if valid {
		Ok(())
	} else {
		Err(EmailError::InvalidHeader(name.to_string()))
	}
}

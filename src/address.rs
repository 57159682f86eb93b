//! Recipient and sender bookkeeping
//!
//! An [`AddressBook`] owns one insertion-ordered sequence of addresses per
//! recipient class plus a separate reply-to sequence. Adds are idempotent
//! within the class they target; [`AddressBook::finalize`] then prunes the
//! union so every distinct address keeps only its highest-importance class.

/// A single addressee: a lowercased e-mail address and an optional display
/// name.
///
/// Two addresses are equal when their e-mail addresses are equal; the display
/// name never contributes to identity.
///
/// # Examples
///
/// ```
/// use mailsmith::Address;
///
/// let a = Address::new("USER@Example.COM", Some(" Alice "));
/// assert_eq!(a.email(), "user@example.com");
/// assert_eq!(a.display_name(), Some("Alice"));
/// ```
#[derive(Debug, Clone, Eq)]
pub struct Address {
	email: String,
	display_name: Option<String>,
}

impl Address {
	/// Create an address; the e-mail is lowercased and the name trimmed of
	/// surrounding whitespace.
	pub fn new(email: impl AsRef<str>, display_name: Option<&str>) -> Self {
		Self {
			email: email.as_ref().to_lowercase(),
			display_name: display_name.map(|name| name.trim().to_string()),
		}
	}

	pub fn email(&self) -> &str {
		&self.email
	}

	pub fn display_name(&self) -> Option<&str> {
		self.display_name.as_deref()
	}

	/// Render as a header value: `Name <email>` or the bare address.
	pub fn to_header(&self) -> String {
		match self.display_name.as_deref() {
			Some(name) if !name.is_empty() => format!("{} <{}>", name, self.email),
			_ => self.email.clone(),
		}
	}

	/// The same addressee with its delivery address swapped out, keeping the
	/// display name. Used for the redirect-all override at send time.
	pub(crate) fn with_email(&self, email: &str) -> Self {
		Self {
			email: email.to_lowercase(),
			display_name: self.display_name.clone(),
		}
	}
}

impl PartialEq for Address {
	fn eq(&self, other: &Self) -> bool {
		self.email == other.email
	}
}

/// Recipient classes, ordered by ascending importance: `Bcc < Cc < To`.
///
/// The ordering drives deduplication: an address in a lower-importance class
/// is dropped when it also appears in a higher-importance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecipientClass {
	Bcc,
	Cc,
	To,
}

impl RecipientClass {
	/// All classes in ascending importance order.
	pub const ASCENDING: [RecipientClass; 3] =
		[RecipientClass::Bcc, RecipientClass::Cc, RecipientClass::To];
}

/// Per-class recipient storage with idempotent adds and cross-class
/// deduplication.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
	to: Vec<Address>,
	cc: Vec<Address>,
	bcc: Vec<Address>,
	reply_to: Vec<Address>,
}

impl AddressBook {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a recipient to a class.
	///
	/// The e-mail is lowercased first; when it already exists in the same
	/// class the call is a silent no-op. Existence in *other* classes does not
	/// block the add; `finalize()` resolves those later.
	///
	/// # Examples
	///
	/// ```
	/// use mailsmith::{AddressBook, RecipientClass};
	///
	/// let mut book = AddressBook::new();
	/// book.add(RecipientClass::To, "User@example.com", None);
	/// book.add(RecipientClass::To, "user@EXAMPLE.com", Some("Dup"));
	/// assert_eq!(book.class(RecipientClass::To).len(), 1);
	/// ```
	pub fn add(&mut self, class: RecipientClass, email: &str, name: Option<&str>) {
		let address = Address::new(email, name);
		if self.exists(address.email(), &[class]) {
			return;
		}
		self.class_mut(class).push(address);
	}

	/// Add a reply-to address; duplicates across the whole reply-to sequence
	/// are silently ignored.
	pub fn add_reply_to(&mut self, email: &str, name: Option<&str>) {
		let address = Address::new(email, name);
		if self.reply_to.iter().any(|a| a.email() == address.email()) {
			return;
		}
		self.reply_to.push(address);
	}

	/// Cross-class deduplication pass.
	///
	/// Classes are processed in ascending importance order; each class except
	/// the last drops any address that also occurs in a strictly
	/// higher-importance class. Afterwards every distinct e-mail appears in
	/// exactly one class. Idempotent.
	pub fn finalize(&mut self) {
		let higher: Vec<String> = self
			.cc
			.iter()
			.chain(self.to.iter())
			.map(|a| a.email().to_string())
			.collect();
		self.bcc.retain(|a| !higher.iter().any(|e| e == a.email()));

		let to_emails: Vec<String> = self.to.iter().map(|a| a.email().to_string()).collect();
		self.cc.retain(|a| !to_emails.iter().any(|e| e == a.email()));
	}

	/// Whether `email` (already lowercased) exists in any of the given
	/// classes.
	pub fn exists(&self, email: &str, classes: &[RecipientClass]) -> bool {
		classes
			.iter()
			.any(|class| self.class(*class).iter().any(|a| a.email() == email))
	}

	pub fn class(&self, class: RecipientClass) -> &[Address] {
		match class {
			RecipientClass::To => &self.to,
			RecipientClass::Cc => &self.cc,
			RecipientClass::Bcc => &self.bcc,
		}
	}

	fn class_mut(&mut self, class: RecipientClass) -> &mut Vec<Address> {
		match class {
			RecipientClass::To => &mut self.to,
			RecipientClass::Cc => &mut self.cc,
			RecipientClass::Bcc => &mut self.bcc,
		}
	}

	pub fn reply_to(&self) -> &[Address] {
		&self.reply_to
	}

	/// Total number of recipients across all three classes.
	pub fn total(&self) -> usize {
		self.to.len() + self.cc.len() + self.bcc.len()
	}

	pub fn is_empty(&self) -> bool {
		self.total() == 0
	}
}

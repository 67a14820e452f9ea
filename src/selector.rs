//! Region keys.
//!
//! Regions are addressed by compound simple selectors only (`cart-drawer.active[data-id=main]`).
//! Combinators aren't supported: every region a theme swaps carries a stable id or attribute of its own.

use crate::error::SelectorError;
use core::{
	fmt,
	iter::Peekable,
	str::{CharIndices, FromStr},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Part {
	Tag(String),
	Id(String),
	Class(String),
	Attribute { name: String, value: Option<String> },
}

/// A parsed compound selector. [`Display`](`fmt::Display`) yields a string `querySelector` accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
	source: String,
	parts: Vec<Part>,
}

fn is_name_char(c: char) -> bool {
	c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_name(chars: &mut Peekable<CharIndices<'_>>) -> String {
	let mut name = String::new();
	while let Some(&(_, c)) = chars.peek() {
		if !is_name_char(c) {
			break;
		}
		name.push(c);
		chars.next();
	}
	name
}

impl Selector {
	/// # Errors
	///
	/// Iff `source` is empty, uses combinators, or isn't made of tag, `#id`, `.class` and `[attr]`/`[attr=value]` parts.
	pub fn parse(source: &str) -> Result<Self, SelectorError> {
		let trimmed = source.trim();
		if trimmed.is_empty() {
			return Err(SelectorError::Empty);
		}
		if trimmed.contains(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',')) {
			return Err(SelectorError::Combinator(trimmed.to_owned()));
		}

		let unexpected = |at: usize, found: char| SelectorError::Unexpected { selector: trimmed.to_owned(), at, found };
		let mut parts = Vec::new();
		let mut chars = trimmed.char_indices().peekable();
		while let Some((at, c)) = chars.next() {
			match c {
				'#' | '.' => {
					let name = take_name(&mut chars);
					if name.is_empty() {
						return Err(unexpected(at, c));
					}
					parts.push(if c == '#' { Part::Id(name) } else { Part::Class(name) });
				}
				'[' => {
					let name = take_name(&mut chars);
					if name.is_empty() {
						return Err(chars.peek().map_or_else(|| SelectorError::Unterminated(trimmed.to_owned()), |&(at, c)| unexpected(at, c)));
					}
					let value = match chars.next() {
						Some((_, ']')) => None,
						Some((_, '=')) => {
							let quote = match chars.peek() {
								Some(&(_, q @ ('"' | '\''))) => {
									chars.next();
									Some(q)
								}
								_ => None,
							};
							let mut value = String::new();
							loop {
								match (chars.next(), quote) {
									(None, _) => return Err(SelectorError::Unterminated(trimmed.to_owned())),
									(Some((_, c)), Some(q)) if c == q => match chars.next() {
										Some((_, ']')) => break,
										Some((at, c)) => return Err(unexpected(at, c)),
										None => return Err(SelectorError::Unterminated(trimmed.to_owned())),
									},
									(Some((_, ']')), None) => break,
									(Some((_, c)), _) => value.push(c),
								}
							}
							Some(value)
						}
						Some((at, c)) => return Err(unexpected(at, c)),
						None => return Err(SelectorError::Unterminated(trimmed.to_owned())),
					};
					parts.push(Part::Attribute { name, value });
				}
				c if is_name_char(c) && parts.is_empty() => {
					let mut name = String::from(c);
					name.push_str(&take_name(&mut chars));
					parts.push(Part::Tag(name.to_ascii_lowercase()));
				}
				c => return Err(unexpected(at, c)),
			}
		}

		Ok(Self { source: trimmed.to_owned(), parts })
	}

	/// Matches an element given its tag name and an attribute lookup.
	pub fn matches<'a>(&self, tag: &str, attribute: impl Fn(&str) -> Option<&'a str>) -> bool {
		self.parts.iter().all(|part| match part {
			Part::Tag(name) => tag.eq_ignore_ascii_case(name),
			Part::Id(id) => attribute("id") == Some(id.as_str()),
			Part::Class(class) => attribute("class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class)),
			Part::Attribute { name, value: None } => attribute(name.as_str()).is_some(),
			Part::Attribute { name, value: Some(value) } => attribute(name.as_str()) == Some(value.as_str()),
		})
	}

	/// Selector matching `id="…"` exactly.
	#[must_use]
	pub fn id(id: &str) -> Self {
		Self {
			source: format!("[id=\"{}\"]", id.replace('"', "\\\"")),
			parts: vec![Part::Attribute { name: "id".into(), value: Some(id.to_owned()) }],
		}
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.source
	}
}

impl FromStr for Selector {
	type Err = SelectorError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for Selector {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.source)
	}
}

/// Parses a list of selectors that are known at compile time.
///
/// # Panics
///
/// Iff one of them is invalid, which is a programming error.
#[must_use]
pub fn selectors(sources: &[&str]) -> Vec<Selector> {
	sources.iter().map(|source| selector(source)).collect()
}

/// Single-selector [`selectors`].
///
/// # Panics
///
/// Iff `source` is invalid.
#[must_use]
pub fn selector(source: &str) -> Selector {
	Selector::parse(source).unwrap_or_else(|error| panic!("invalid built-in selector {:?}: {}", source, error))
}

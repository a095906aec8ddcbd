//! URI template compilation and matching.
//!
//! A template such as `file://{folder}/{filename}` is compiled into an
//! anchored regular expression in which every placeholder captures one
//! path segment (any run of characters other than `/`). Placeholder names
//! are kept in declaration order so that captures can be zipped back into
//! named values.
//!
//! Two placeholder spellings are accepted:
//!
//! - `{name}` anywhere in the template
//! - `:name` at the start of a path segment (directly after a `/`)
//!
//! The `:name` form is only recognised after a `/` so that scheme
//! separators and ports (`urn:isbn`, `host:8080`) stay literal. There is
//! no escaping mechanism: a URI whose literal text contains `{` or `}`
//! cannot be expressed as a template.

use indexmap::IndexMap;
use regex::Regex;

use crate::capability::error::{CapabilityError, CapabilityResult};

/// Regex fragment matching a single placeholder value.
const SEGMENT_PATTERN: &str = "([^/]+)";

/// Extracted placeholder values, in declaration order.
pub type UriParams = IndexMap<String, String>;

/// A compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    regex: Regex,
    params: Vec<String>,
}

impl UriTemplate {
    /// Compiles a template string.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Pattern`] if the template is empty, has
    /// unbalanced or nested braces, an empty or non-identifier placeholder,
    /// or declares the same placeholder twice.
    pub fn compile(template: &str) -> CapabilityResult<Self> {
        if template.is_empty() {
            return Err(CapabilityError::pattern(template, "template is empty"));
        }

        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');
        let mut params: Vec<String> = Vec::new();
        let mut literal = String::new();

        let chars: Vec<char> = template.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '{' => {
                    let close = chars[i + 1..]
                        .iter()
                        .position(|&c| c == '}' || c == '{')
                        .map(|offset| i + 1 + offset);
                    let Some(close) = close.filter(|&end| chars[end] == '}') else {
                        return Err(CapabilityError::pattern(
                            template,
                            format!("unbalanced '{{' at position {i}"),
                        ));
                    };
                    let name: String = chars[i + 1..close].iter().collect();
                    push_placeholder(template, &name, &mut params)?;
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    pattern.push_str(SEGMENT_PATTERN);
                    i = close + 1;
                }
                '}' => {
                    return Err(CapabilityError::pattern(
                        template,
                        format!("unbalanced '}}' at position {i}"),
                    ));
                }
                ':' if i > 0 && chars[i - 1] == '/' && starts_identifier(chars.get(i + 1)) => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| !is_identifier_char(c))
                        .map_or(chars.len(), |offset| i + 1 + offset);
                    let name: String = chars[i + 1..end].iter().collect();
                    push_placeholder(template, &name, &mut params)?;
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();
                    pattern.push_str(SEGMENT_PATTERN);
                    i = end;
                }
                c => {
                    literal.push(c);
                    i += 1;
                }
            }
        }

        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let regex = Regex::new(&pattern)
            .map_err(|e| CapabilityError::pattern(template, e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            regex,
            params,
        })
    }

    /// Returns the template string this matcher was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Returns the placeholder names in declaration order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns `true` if the template declares at least one placeholder.
    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        !self.params.is_empty()
    }

    /// Matches a concrete URI against the template.
    ///
    /// Returns the captured value of every placeholder keyed by name, or
    /// `None` if the URI does not match the whole template.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<UriParams> {
        let captures = self.regex.captures(uri)?;
        Some(
            self.params
                .iter()
                .enumerate()
                .filter_map(|(index, name)| {
                    captures
                        .get(index + 1)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl std::fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

fn push_placeholder(template: &str, name: &str, params: &mut Vec<String>) -> CapabilityResult<()> {
    if name.is_empty() {
        return Err(CapabilityError::pattern(template, "empty placeholder"));
    }
    if !name.chars().all(is_identifier_char) {
        return Err(CapabilityError::pattern(
            template,
            format!("placeholder '{name}' is not an identifier"),
        ));
    }
    if params.iter().any(|p| p == name) {
        return Err(CapabilityError::pattern(
            template,
            format!("placeholder '{name}' is declared more than once"),
        ));
    }
    params.push(name.to_string());
    Ok(())
}

const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn starts_identifier(c: Option<&char>) -> bool {
    c.is_some_and(|c| c.is_ascii_alphabetic() || *c == '_')
}

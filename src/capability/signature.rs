//! Parameter schema inference from function signatures.
//!
//! Rust has no runtime reflection, so the usual way to describe a
//! capability is to declare its parameters explicitly through the
//! builders. This module is the best-effort alternative: given a
//! [`FunctionSignature`] (parameter names and declared type spellings,
//! either assembled by hand or parsed from declaration text with
//! [`parse_declaration`]) it derives a name, a description and a typed
//! parameter list.
//!
//! Inference rules:
//!
//! - A parameter is required unless it appears in the optionals list, has
//!   a default value, carries an optional marker (`name?`), or is declared
//!   as `Option<T>`.
//! - Declared types are narrowed to the four schema types, see
//!   [`map_declared_type`].
//! - A parameter named `context` or typed `Context` is the execution
//!   context carrier. It is dropped from the visible schema.
//! - Explicit overrides win over inferred values field by field.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::capability::definition::{ParamType, Parameter};
use crate::capability::error::{CapabilityError, CapabilityResult};

/// One positional parameter of a reflected function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParam {
    /// Parameter name.
    pub name: String,
    /// Declared type spelling, if any (`string[]`, `Vec<String>`, ...).
    pub declared_type: Option<String>,
    /// Declared with an optional marker.
    pub optional: bool,
    /// Declared with a default value.
    pub has_default: bool,
}

impl SignatureParam {
    /// Creates a plain parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
            optional: false,
            has_default: false,
        }
    }
}

/// A reflected function: name, positional parameters and documentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Function name, if the declaration has one.
    pub name: Option<String>,
    /// Positional parameters in declaration order.
    pub params: Vec<SignatureParam>,
    /// Raw documentation comment attached to the declaration.
    pub docs: Option<String>,
}

impl FunctionSignature {
    /// Starts a signature for a named function.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        self.params.push(SignatureParam::new(name, declared_type));
        self
    }

    /// Appends a parameter declared with an optional marker.
    #[must_use]
    pub fn optional_param(mut self, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let mut param = SignatureParam::new(name, declared_type);
        param.optional = true;
        self.params.push(param);
        self
    }

    /// Attaches documentation text.
    #[must_use]
    pub fn docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }
}

/// Explicit configuration that takes precedence over inferred values.
#[derive(Debug, Clone, Default)]
pub struct InferOverrides {
    /// Replaces the inferred name.
    pub name: Option<String>,
    /// Replaces the inferred description.
    pub description: Option<String>,
    /// Parameter names to treat as optional.
    pub optionals: Vec<String>,
    /// Per-parameter descriptions.
    pub param_descriptions: IndexMap<String, String>,
    /// Replaces the whole inferred parameter list.
    pub parameters: Option<Vec<Parameter>>,
}

impl InferOverrides {
    /// Marks parameters as optional.
    #[must_use]
    pub fn optionals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optionals.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Inferred metadata for one visible parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMetadata {
    /// Parameter name.
    pub name: String,
    /// Narrowed schema type.
    pub param_type: ParamType,
    /// Description taken from docs, overrides or the fallback template.
    pub description: String,
    /// Whether the parameter may be omitted.
    pub optional: bool,
}

impl From<&ParameterMetadata> for Parameter {
    fn from(meta: &ParameterMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            param_type: meta.param_type,
            description: meta.description.clone(),
            required: !meta.optional,
        }
    }
}

impl From<&Parameter> for ParameterMetadata {
    fn from(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            param_type: param.param_type,
            description: param.description.clone(),
            optional: !param.required,
        }
    }
}

/// Output of [`infer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSignature {
    /// Capability name.
    pub name: String,
    /// Capability description.
    pub description: String,
    /// Visible parameters in declaration order.
    pub parameters: Vec<ParameterMetadata>,
    /// The function declared an execution context parameter.
    pub takes_context: bool,
}

impl InferredSignature {
    /// Converts the metadata into builder parameters.
    #[must_use]
    pub fn to_parameters(&self) -> Vec<Parameter> {
        self.parameters.iter().map(Parameter::from).collect()
    }

    /// Names of the required parameters.
    #[must_use]
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| !p.optional)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Derives a name, description and parameter list from a signature.
///
/// # Errors
///
/// Returns [`CapabilityError::CouldNotInfer`] if neither the signature nor
/// the overrides provide a name, and [`CapabilityError::InvalidDefinition`]
/// if two visible parameters share a name.
pub fn infer(signature: &FunctionSignature, overrides: &InferOverrides) -> CapabilityResult<InferredSignature> {
    let name = overrides
        .name
        .clone()
        .or_else(|| signature.name.clone())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CapabilityError::could_not_infer("declaration has no name"))?;

    let docs = signature.docs.as_deref().map(parse_doc_comment);

    let description = overrides
        .description
        .clone()
        .or_else(|| docs.as_ref().map(|d| d.summary.clone()))
        .unwrap_or_default();

    let takes_context = signature
        .params
        .iter()
        .any(|p| is_context_param(&p.name, p.declared_type.as_deref()));

    let parameters = if let Some(explicit) = &overrides.parameters {
        explicit.iter().map(ParameterMetadata::from).collect()
    } else {
        signature
            .params
            .iter()
            .filter(|p| !is_context_param(&p.name, p.declared_type.as_deref()))
            .map(|p| {
                let declared = p.declared_type.as_deref().unwrap_or("any");
                let param_type = map_declared_type(declared);
                let description = overrides
                    .param_descriptions
                    .get(&p.name)
                    .cloned()
                    .or_else(|| {
                        docs.as_ref()
                            .map(|docs| docs.params.get(&p.name).cloned().unwrap_or_default())
                    })
                    .unwrap_or_else(|| format!("a param named {} of type {param_type}", p.name));
                let optional = p.optional
                    || p.has_default
                    || is_option_type(declared)
                    || overrides.optionals.iter().any(|o| o == &p.name);
                ParameterMetadata {
                    name: p.name.clone(),
                    param_type,
                    description,
                    optional,
                }
            })
            .collect::<Vec<_>>()
    };

    for (index, param) in parameters.iter().enumerate() {
        if parameters[..index].iter().any(|p| p.name == param.name) {
            return Err(CapabilityError::invalid_definition(format!(
                "'{name}' declares parameter '{}' more than once",
                param.name
            )));
        }
    }

    Ok(InferredSignature {
        name,
        description,
        parameters,
        takes_context,
    })
}

/// Narrows a declared type spelling to one of the four schema types.
///
/// Composite list types (`T[]`, `Array<T>`, `Vec<T>`, slices, sets) map to
/// `array`; record types (`{ .. }`, `object`, `Map`, `HashMap`, `Record`)
/// to `object`; numeric primitives to `number`; everything else to
/// `string`. List types are checked first so that `Array<number>` stays an
/// array, and a string token beats a numeric one so that `string | number`
/// stays a string.
#[must_use]
pub fn map_declared_type(declared: &str) -> ParamType {
    const ARRAY_MARKERS: &[&str] = &["[]", "Array", "Vec<", "VecDeque<", "HashSet<", "BTreeSet<", "Set<"];
    const OBJECT_MARKERS: &[&str] = &["{", "object", "Object", "Map<", "Record<"];
    const TEXTUAL: &[&str] = &["string", "String", "str", "char"];
    const NUMERIC: &[&str] = &[
        "number", "Number", "bigint", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32",
        "u64", "u128", "usize", "f32", "f64",
    ];

    let declared = declared.trim();
    if declared.starts_with('[') || ARRAY_MARKERS.iter().any(|m| declared.contains(m)) {
        return ParamType::Array;
    }
    if OBJECT_MARKERS.iter().any(|m| declared.contains(m)) {
        return ParamType::Object;
    }
    let tokens: Vec<&str> = declared.split(|c: char| !c.is_ascii_alphanumeric()).collect();
    if tokens.iter().any(|token| TEXTUAL.contains(token)) {
        return ParamType::String;
    }
    if tokens.iter().any(|token| NUMERIC.contains(token)) {
        return ParamType::Number;
    }
    ParamType::String
}

/// Returns `true` for the execution context carrier parameter.
#[must_use]
pub fn is_context_param(name: &str, declared_type: Option<&str>) -> bool {
    if name == "context" {
        return true;
    }
    declared_type.is_some_and(|ty| {
        let ty = ty
            .trim()
            .trim_start_matches('&')
            .trim_start_matches("mut ")
            .trim();
        ty == "Context" || ty.ends_with("::Context")
    })
}

fn is_option_type(declared: &str) -> bool {
    let declared = declared.trim();
    declared.starts_with("Option<") || declared.ends_with("| undefined")
}

/// Documentation split into a summary and per-parameter descriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Free text before the first tag.
    pub summary: String,
    /// `@param` descriptions keyed by parameter name.
    pub params: IndexMap<String, String>,
}

/// Parses a JSDoc-like comment.
///
/// Comment markers (`/**`, `*/`, leading `*`, `///`) are stripped. Lines
/// before the first `@` tag form the summary. `@param [{type}] name
/// [-] description` lines describe parameters; continuation lines are
/// appended to the preceding tag.
#[must_use]
pub fn parse_doc_comment(text: &str) -> DocComment {
    let mut summary: Vec<&str> = Vec::new();
    let mut params: IndexMap<String, String> = IndexMap::new();
    let mut current_param: Option<String> = None;
    let mut in_tags = false;

    for line in text.lines() {
        let line = strip_comment_markers(line);
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("@param") {
            in_tags = true;
            let rest = rest.trim_start();
            let rest = if rest.starts_with('{') {
                rest.find('}').map_or("", |end| &rest[end + 1..]).trim_start()
            } else {
                rest
            };
            let (name, description) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let name = name.trim_matches(|c| c == '[' || c == ']');
            let name = name.split('=').next().unwrap_or(name).to_string();
            let description = description.trim_start().trim_start_matches("- ").trim();
            params.insert(name.clone(), description.to_string());
            current_param = Some(name);
        } else if line.starts_with('@') {
            in_tags = true;
            current_param = None;
        } else if let Some(name) = &current_param {
            if let Some(existing) = params.get_mut(name) {
                if !existing.is_empty() {
                    existing.push(' ');
                }
                existing.push_str(line);
            }
        } else if !in_tags {
            summary.push(line);
        }
    }

    DocComment {
        summary: summary.join(" "),
        params,
    }
}

fn strip_comment_markers(line: &str) -> &str {
    let mut line = line.trim();
    for prefix in ["/**", "/*", "///", "//!", "//"] {
        if let Some(rest) = line.strip_prefix(prefix) {
            line = rest;
            break;
        }
    }
    if let Some(rest) = line.strip_suffix("*/") {
        line = rest;
    }
    line = line.trim();
    if let Some(rest) = line.strip_prefix('*') {
        line = rest;
    }
    line.trim()
}

fn named_function_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:export\s+)?(?:default\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:function\s*\*?|fn)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^(]*>)?\s*\(",
        )
        .expect("static regex is valid")
    })
}

fn arrow_function_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?\(",
        )
        .expect("static regex is valid")
    })
}

/// Parses declaration text into a [`FunctionSignature`].
///
/// Accepted shapes, each optionally preceded by a doc comment:
///
/// ```text
/// function name(a: string, b?: number[]) { ... }
/// const name = async (a: string, context: Context) => { ... }
/// pub async fn name(a: String, b: Option<u32>, ctx: &Context)
/// ```
///
/// # Errors
///
/// Returns [`CapabilityError::CouldNotInfer`] if the text is not a
/// function-like declaration or its parameter list cannot be read.
pub fn parse_declaration(source: &str) -> CapabilityResult<FunctionSignature> {
    let (docs, declaration) = split_leading_comment(source);
    let declaration = declaration.trim_start();

    let (captures, is_arrow) = if let Some(c) = named_function_regex().captures(declaration) {
        (c, false)
    } else if let Some(c) = arrow_function_regex().captures(declaration) {
        (c, true)
    } else {
        return Err(CapabilityError::could_not_infer(
            "not a function or arrow-function declaration",
        ));
    };

    let name = captures["name"].to_string();
    let open = captures
        .get(0)
        .map_or(0, |m| m.end())
        .saturating_sub(1);
    let close = find_closing_paren(declaration, open)
        .ok_or_else(|| CapabilityError::could_not_infer("unterminated parameter list"))?;

    if is_arrow && !declaration[close + 1..].contains("=>") {
        return Err(CapabilityError::could_not_infer(
            "arrow-function declaration has no '=>'",
        ));
    }

    let params = split_top_level(&declaration[open + 1..close], ',')
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| !is_receiver(p))
        .map(parse_param)
        .collect::<CapabilityResult<Vec<_>>>()?;

    Ok(FunctionSignature {
        name: Some(name),
        params,
        docs,
    })
}

fn split_leading_comment(source: &str) -> (Option<String>, &str) {
    let trimmed = source.trim_start();

    if trimmed.starts_with("/*") {
        if let Some(end) = trimmed.find("*/") {
            let (comment, rest) = trimmed.split_at(end + 2);
            return (Some(comment.to_string()), rest);
        }
        return (None, trimmed);
    }

    let mut comment_lines = Vec::new();
    let mut rest = trimmed;
    while rest.starts_with("//") {
        let (line, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
        comment_lines.push(line);
        rest = remainder.trim_start();
    }
    if comment_lines.is_empty() {
        (None, trimmed)
    } else {
        (Some(comment_lines.join("\n")), rest)
    }
}

/// Finds the `)` matching the `(` at `open`, tracking nested brackets.
fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (c == ')').then_some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on `separator` outside of any bracket pair (including `<>`).
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut previous = '\0';
    for (index, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            '>' if previous == '=' => {}
            ')' | ']' | '}' | '>' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }
        previous = c;
    }
    parts.push(&text[start..]);
    parts
}

fn is_receiver(param: &str) -> bool {
    matches!(
        param.trim_start_matches('&').trim_start_matches("mut ").trim(),
        "self" | "this"
    ) || param.starts_with("&'")
}

fn parse_param(text: &str) -> CapabilityResult<SignatureParam> {
    let (head, default) = split_default(text);
    let head = head.trim();

    let (name_part, declared_type) = match split_top_level(head, ':').as_slice() {
        [name] => (*name, None),
        [name, rest @ ..] => (*name, Some(rest.join(":").trim().to_string())),
        [] => (head, None),
    };

    let mut name = name_part.trim();
    name = name.strip_prefix("mut ").unwrap_or(name).trim();
    name = name.strip_prefix("...").unwrap_or(name);
    let optional = name.ends_with('?');
    let name = name.trim_end_matches('?').trim();

    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return Err(CapabilityError::could_not_infer(format!(
            "unsupported parameter pattern '{}'",
            text.trim()
        )));
    }

    Ok(SignatureParam {
        name: name.to_string(),
        declared_type: declared_type.filter(|t| !t.is_empty()),
        optional,
        has_default: default.is_some(),
    })
}

/// Splits `name: T = value` at the first top-level `=` that is not part of
/// `=>`, `==`, `<=` or `>=`.
fn split_default(text: &str) -> (&str, Option<&str>) {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (index, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'>' if index == 0 || bytes[index - 1] != b'=' => depth = depth.saturating_sub(1),
            b'=' if depth == 0 => {
                let next = bytes.get(index + 1).copied();
                let prev = index.checked_sub(1).map(|i| bytes[i]);
                if next != Some(b'>')
                    && next != Some(b'=')
                    && !matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
                {
                    return (&text[..index], Some(text[index + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    (text, None)
}

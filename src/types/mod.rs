//! # Type registry and coercion engine
//!
//! Every positional argument and inline option of a command names a type by
//! its tag. The [`TypeRegistry`] maps those tags to [`TypeSpec`]s, and a spec
//! converts a text token into a [`Value`] by trying, strictly in order:
//!
//! 1. the passthrough predicate (the text is already in final form),
//! 2. exact literal shortcuts,
//! 3. regex shortcuts, in registration order,
//! 4. the namespace table, matched case-insensitively,
//! 5. the [`TypeCoder`] itself.
//!
//! The first rule that yields a value wins. A namespace miss is never fatal;
//! it falls through to the coder. New types plug in by implementing
//! [`TypeCoder`] and registering a [`TypeSpec`], without touching the parsers.
//!
//! ## Registry Invariant
//! The registry is built once at startup (see [`TypeRegistry::standard`]) and
//! shared read-only afterwards.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::{err_msg, PlotlineError};

pub mod builtin;
pub mod value;

pub use value::{DimensionUnit, Value};

/// Outcome of a coder's own conversion; the error is a short reason that the
/// registry wraps into an "invalid literal" diagnostic.
pub type DecodeResult = Result<Value, String>;

/// Text to value conversion for one family of types.
pub trait TypeCoder {
    fn decode(&self, text: &str) -> DecodeResult;

    /// Inverse of [`decode`](TypeCoder::decode). The default is the value's
    /// natural `Display` form.
    fn encode(&self, value: &Value) -> String {
        value.to_string()
    }
}

/// Recognizes text that is already in the target representation.
pub type Passthrough = fn(&str) -> bool;

/// Describes one coercible type.
pub struct TypeSpec {
    tag: String,
    display_name: Option<String>,
    description: Option<String>,
    default: Option<Value>,
    shortcuts: Vec<(String, Value)>,
    patterns: Vec<(Regex, Value)>,
    passthrough: Option<Passthrough>,
    namespace: BTreeMap<String, Value>,
    coder: Box<dyn TypeCoder>,
}

impl std::fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSpec")
            .field("tag", &self.tag)
            .field("display_name", &self.display_name)
            .field("shortcuts", &self.shortcuts.len())
            .field("patterns", &self.patterns.len())
            .field("namespace", &self.namespace.len())
            .finish()
    }
}

impl TypeSpec {
    pub fn new(tag: impl Into<String>, coder: impl TypeCoder + 'static) -> Self {
        Self {
            tag: tag.into(),
            display_name: None,
            description: None,
            default: None,
            shortcuts: Vec::new(),
            patterns: Vec::new(),
            passthrough: None,
            namespace: BTreeMap::new(),
            coder: Box::new(coder),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Maps an exact literal to a fixed value.
    pub fn shortcut(mut self, literal: impl Into<String>, value: Value) -> Self {
        self.shortcuts.push((literal.into(), value));
        self
    }

    /// Maps every text matching `pattern` to a fixed value.
    ///
    /// # Errors
    /// Returns a configuration error if `pattern` is not a valid regex.
    pub fn pattern(mut self, pattern: &str, value: Value) -> Result<Self, PlotlineError> {
        let regex = Regex::new(pattern).map_err(|e| {
            err_msg!(
                Config,
                "invalid shortcut pattern '{}' for type {}: {}",
                pattern,
                self.tag,
                e
            )
        })?;
        self.patterns.push((regex, value));
        Ok(self)
    }

    pub fn passthrough(mut self, predicate: Passthrough) -> Self {
        self.passthrough = Some(predicate);
        self
    }

    /// Adds named constants, looked up case-insensitively.
    pub fn namespace<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        for (name, value) in entries {
            self.namespace.insert(name.as_ref().to_lowercase(), value);
        }
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The display name, falling back to the tag.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.tag)
    }

    pub fn describe(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn coerce(&self, text: &str) -> Result<Value, PlotlineError> {
        if let Some(predicate) = self.passthrough {
            if predicate(text) {
                return Ok(Value::Text(text.to_string()));
            }
        }
        if let Some((_, value)) = self.shortcuts.iter().find(|(lit, _)| lit == text) {
            return Ok(value.clone());
        }
        if let Some((_, value)) = self.patterns.iter().find(|(re, _)| re.is_match(text)) {
            return Ok(value.clone());
        }
        if let Some(value) = self.namespace.get(&text.to_lowercase()) {
            return Ok(value.clone());
        }
        self.coder.decode(text).map_err(|reason| {
            err_msg!(
                Coercion,
                "invalid literal '{}' for type {}: {}",
                text,
                self.tag,
                reason
            )
        })
    }

    pub fn render(&self, value: &Value) -> String {
        self.coder.encode(value)
    }
}

/// Process-wide table of coercible types, keyed by tag.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    specs: Vec<TypeSpec>,
    index: HashMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in type family.
    pub fn standard() -> Result<Self, PlotlineError> {
        let mut registry = Self::new();
        builtin::register_builtin_types(&mut registry)?;
        Ok(registry)
    }

    /// Registers `spec` under its tag.
    ///
    /// # Errors
    /// Returns a configuration error if the tag is already registered.
    pub fn register(&mut self, spec: TypeSpec) -> Result<(), PlotlineError> {
        if self.index.contains_key(spec.tag()) {
            return Err(err_msg!(Config, "duplicate type '{}'", spec.tag()));
        }
        self.index.insert(spec.tag().to_string(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Registers `spec`, replacing (with a warning) any existing spec for the
    /// same tag. Returns `true` when a spec was replaced.
    pub fn register_or_replace(&mut self, spec: TypeSpec) -> bool {
        match self.index.get(spec.tag()) {
            Some(&slot) => {
                tracing::warn!(tag = spec.tag(), "type redefined, replacing previous definition");
                self.specs[slot] = spec;
                true
            }
            None => {
                self.index.insert(spec.tag().to_string(), self.specs.len());
                self.specs.push(spec);
                false
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<&TypeSpec> {
        self.index.get(tag).map(|&slot| &self.specs[slot])
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    fn spec(&self, tag: &str) -> Result<&TypeSpec, PlotlineError> {
        self.get(tag)
            .ok_or_else(|| err_msg!(Coercion, "unknown type '{}'", tag))
    }

    pub fn coerce(&self, tag: &str, text: &str) -> Result<Value, PlotlineError> {
        self.spec(tag)?.coerce(text)
    }

    pub fn render(&self, tag: &str, value: &Value) -> Result<String, PlotlineError> {
        Ok(self.spec(tag)?.render(value))
    }

    pub fn is_boolean(&self, tag: &str) -> bool {
        tag == builtin::BOOLEAN
    }

    /// `(tag, display name, description)` for every spec, in registration
    /// order.
    pub fn describe(&self) -> Vec<(&str, &str, &str)> {
        self.specs
            .iter()
            .map(|spec| (spec.tag(), spec.name(), spec.describe().unwrap_or_default()))
            .collect()
    }

    /// Specs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

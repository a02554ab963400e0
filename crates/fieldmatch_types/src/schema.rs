use crate::error::SchemaError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;
use strum_macros::EnumIter;
use tracing::{debug, warn};

pub const DEFAULT_STRING_OVERLAP: f64 = 0.6;
pub const DEFAULT_LIST_MIN_COVERAGE: f64 = 0.5;
pub const DEFAULT_LIST_MAX_EXTRA: usize = 1;
pub const DEFAULT_NUMERIC_RELATIVE_TOLERANCE: f64 = 0.10;
pub const DEFAULT_NUMERIC_ABSOLUTE_TOLERANCE: f64 = 1.0;

const DEFAULTS_SCOPE: &str = "<defaults>";
const TYPE_HINT_PATTERN: &str = r"\[\s*([A-Za-z_<>?]+)\s*:\s*([A-Za-z_][A-Za-z0-9_]*)\s*\]";

/// The comparison kinds a field can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    List,
    Number,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::List => "list",
            FieldType::Number => "number",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(FieldType::String),
            "list" | "array" | "set" => Ok(FieldType::List),
            "number" | "numeric" | "integer" | "int" | "float" => Ok(FieldType::Number),
            _ => Err(()),
        }
    }
}

/// A declared type tag split into kind and nullability.
///
/// Accepts `number`, `number?` and `optional<number>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTag {
    pub field_type: FieldType,
    pub nullable: bool,
}

impl TypeTag {
    pub fn parse(field: &str, tag: &str) -> Result<Self, SchemaError> {
        let trimmed = tag.trim();
        let lowered = trimmed.to_lowercase();

        let (inner, nullable) = if let Some(inner) = lowered.strip_suffix('?') {
            (inner.to_string(), true)
        } else if let Some(inner) = lowered
            .strip_prefix("optional<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            (inner.to_string(), true)
        } else {
            (lowered, false)
        };

        let field_type = FieldType::from_str(&inner)
            .map_err(|_| SchemaError::traced_unsupported_type(field, trimmed))?;

        Ok(Self {
            field_type,
            nullable,
        })
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.field_type)
        } else {
            write!(f, "{}", self.field_type)
        }
    }
}

/// Resolved thresholds for the soft-match rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSettings {
    /// Minimum share of the longer string the shorter one must cover for a
    /// substring to count as a match
    pub string_overlap: f64,

    /// Minimum share of the expected list the actual list must cover for a
    /// partial match
    pub list_min_coverage: f64,

    /// Maximum number of actual list items outside the expected set for a
    /// partial match
    pub list_max_extra: usize,

    pub numeric_relative_tolerance: f64,

    pub numeric_absolute_tolerance: f64,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            string_overlap: DEFAULT_STRING_OVERLAP,
            list_min_coverage: DEFAULT_LIST_MIN_COVERAGE,
            list_max_extra: DEFAULT_LIST_MAX_EXTRA,
            numeric_relative_tolerance: DEFAULT_NUMERIC_RELATIVE_TOLERANCE,
            numeric_absolute_tolerance: DEFAULT_NUMERIC_ABSOLUTE_TOLERANCE,
        }
    }
}

impl ComparisonSettings {
    /// Width of the numeric tolerance window around `expected`
    pub fn numeric_window(&self, expected: f64) -> f64 {
        self.numeric_absolute_tolerance
            .max(self.numeric_relative_tolerance * expected.abs())
    }

    pub fn validate(&self, field: &str) -> Result<(), SchemaError> {
        check_unit_interval(field, "string_overlap", self.string_overlap)?;
        check_unit_interval(field, "list_min_coverage", self.list_min_coverage)?;
        check_unit_interval(
            field,
            "numeric_relative_tolerance",
            self.numeric_relative_tolerance,
        )?;

        if !self.numeric_absolute_tolerance.is_finite() || self.numeric_absolute_tolerance < 0.0 {
            return Err(SchemaError::InvalidThreshold {
                field: field.to_string(),
                parameter: "numeric_absolute_tolerance",
                value: self.numeric_absolute_tolerance,
                reason: "must be finite and non-negative",
            });
        }

        Ok(())
    }
}

fn check_unit_interval(field: &str, parameter: &'static str, value: f64) -> Result<(), SchemaError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SchemaError::InvalidThreshold {
            field: field.to_string(),
            parameter,
            value,
            reason: "must lie between 0 and 1",
        });
    }
    Ok(())
}

/// Partial threshold overrides, as written in a schema file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_overlap: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_min_coverage: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_max_extra: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_relative_tolerance: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_absolute_tolerance: Option<f64>,
}

impl RuleOverrides {
    pub fn apply(&self, base: ComparisonSettings) -> ComparisonSettings {
        ComparisonSettings {
            string_overlap: self.string_overlap.unwrap_or(base.string_overlap),
            list_min_coverage: self.list_min_coverage.unwrap_or(base.list_min_coverage),
            list_max_extra: self.list_max_extra.unwrap_or(base.list_max_extra),
            numeric_relative_tolerance: self
                .numeric_relative_tolerance
                .unwrap_or(base.numeric_relative_tolerance),
            numeric_absolute_tolerance: self
                .numeric_absolute_tolerance
                .unwrap_or(base.numeric_absolute_tolerance),
        }
    }
}

/// One field as declared in a schema file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub type_tag: String,

    #[serde(flatten)]
    pub overrides: RuleOverrides,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
            overrides: RuleOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: RuleOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Unvalidated schema, as read from YAML or JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub defaults: RuleOverrides,

    pub fields: Vec<FieldDefinition>,
}

impl SchemaDefinition {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            defaults: RuleOverrides::default(),
            fields,
        }
    }

    /// Collects every `[type: name]` hint found in the given texts.
    ///
    /// Evaluation questions carry their expected answer shape inline, e.g.
    /// `How many sellers list products in more than 5 categories? [integer: seller_count]`.
    /// Texts without a hint are skipped with a warning. A name hinted more than
    /// once keeps its first position as long as every hint agrees on the type.
    ///
    /// # Errors
    /// `ConflictingTypeHint` when one name is hinted with two different types,
    /// `MissingTypeHint` when no text carries a hint at all
    pub fn from_type_hints<S: AsRef<str>>(texts: &[S]) -> Result<Self, SchemaError> {
        static HINT_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = HINT_REGEX.get_or_init(|| {
            Regex::new(TYPE_HINT_PATTERN).expect("Invalid regex pattern in TYPE_HINT_PATTERN")
        });

        let mut fields: Vec<FieldDefinition> = Vec::new();
        let mut first_unhinted: Option<&str> = None;

        for text in texts {
            let text = text.as_ref();
            let mut hinted = false;

            for capture in regex.captures_iter(text) {
                hinted = true;
                let (type_tag, name) = (&capture[1], &capture[2]);

                match fields.iter().find(|f| f.name == name) {
                    Some(existing) if same_hint_type(&existing.type_tag, type_tag) => {
                        debug!("Type hint for '{}' repeated; keeping the first", name);
                    }
                    Some(existing) => {
                        return Err(SchemaError::ConflictingTypeHint {
                            field: name.to_string(),
                            first: existing.type_tag.clone(),
                            second: type_tag.to_string(),
                        });
                    }
                    None => fields.push(FieldDefinition::new(name, type_tag)),
                }
            }

            if !hinted {
                warn!("Skipping text without a type hint: '{}'", text);
                first_unhinted.get_or_insert(text);
            }
        }

        if fields.is_empty() {
            return Err(SchemaError::MissingTypeHint(
                first_unhinted.unwrap_or_default().to_string(),
            ));
        }

        debug!("Parsed {} field(s) from type hints", fields.len());
        Ok(Self::new(fields))
    }
}

/// Two hinted types agree when they resolve to the same tag, so `int` and
/// `integer` are one type. Unparseable tags compare as written.
fn same_hint_type(first: &str, second: &str) -> bool {
    match (parse_hint_type(first), parse_hint_type(second)) {
        (Some(a), Some(b)) => a == b,
        _ => first.trim().eq_ignore_ascii_case(second.trim()),
    }
}

fn parse_hint_type(tag: &str) -> Option<TypeTag> {
    let lowered = tag.trim().to_lowercase();
    let (inner, nullable) = match lowered.strip_suffix('?') {
        Some(inner) => (inner, true),
        None => (lowered.as_str(), false),
    };
    FieldType::from_str(inner).ok().map(|field_type| TypeTag {
        field_type,
        nullable,
    })
}

/// A validated field declaration with its resolved thresholds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub settings: ComparisonSettings,
}

impl FieldSpec {
    pub fn type_tag(&self) -> TypeTag {
        TypeTag {
            field_type: self.field_type,
            nullable: self.nullable,
        }
    }
}

/// The active schema: ordered, validated field declarations.
///
/// Field order is the order verdicts are reported in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
    defaults: ComparisonSettings,
}

impl FieldSchema {
    /// Validates a definition against `base` settings.
    ///
    /// Schema-level defaults override `base`, per-field overrides override
    /// the schema defaults.
    pub fn from_definition(
        definition: &SchemaDefinition,
        base: ComparisonSettings,
    ) -> Result<Self, SchemaError> {
        let defaults = definition.defaults.apply(base);
        defaults.validate(DEFAULTS_SCOPE)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(definition.fields.len());

        for field in &definition.fields {
            let name = field.name.trim();
            if name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }

            if !seen.insert(name.to_string()) {
                return Err(SchemaError::DuplicateField(name.to_string()));
            }

            let tag = TypeTag::parse(name, &field.type_tag)?;
            let settings = field.overrides.apply(defaults);
            settings.validate(name)?;

            fields.push(FieldSpec {
                name: name.to_string(),
                field_type: tag.field_type,
                nullable: tag.nullable,
                settings,
            });
        }

        Ok(Self { fields, defaults })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn defaults(&self) -> &ComparisonSettings {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks that an output schema declares the same fields with the same
    /// kinds. Nullability may differ.
    pub fn reconcile(&self, actual: &FieldSchema) -> Result<(), SchemaError> {
        for expected in &self.fields {
            match actual.field(&expected.name) {
                Some(other) if other.field_type == expected.field_type => {}
                Some(other) => {
                    return Err(SchemaError::SchemaDisagreement {
                        field: expected.name.clone(),
                        expected: expected.type_tag().to_string(),
                        actual: other.type_tag().to_string(),
                    })
                }
                None => {
                    return Err(SchemaError::SchemaDisagreement {
                        field: expected.name.clone(),
                        expected: expected.type_tag().to_string(),
                        actual: "undeclared".to_string(),
                    })
                }
            }
        }

        if let Some(extra) = actual
            .fields
            .iter()
            .find(|f| self.field(&f.name).is_none())
        {
            return Err(SchemaError::SchemaDisagreement {
                field: extra.name.clone(),
                expected: "undeclared".to_string(),
                actual: extra.type_tag().to_string(),
            });
        }

        Ok(())
    }
}

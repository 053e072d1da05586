//! Hyperparameter records
//!
//! A record is a named, typed, range or choice constrained value together
//! with the conditions under which it is active. Its configuration
//! dictionary (`get_config`) is what gets copied between registries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AutokitError, Result};

/// A concrete hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Str(_) => ValueType::Str,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Primitive type of a hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
}

/// How a numeric range is explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    #[default]
    Linear,
    Log,
    ReverseLog,
}

/// Active only while the parent hyperparameter holds one of `values`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub values: Vec<ParamValue>,
}

impl Condition {
    pub fn new(name: &str, values: Vec<ParamValue>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    pub fn is_met_by(&self, value: &ParamValue) -> bool {
        self.values.contains(value)
    }
}

fn default_int_step() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntConfig {
    pub min_value: i64,
    pub max_value: i64,
    #[serde(default = "default_int_step")]
    pub step: i64,
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub default: Option<i64>,
}

impl IntConfig {
    pub fn new(min_value: i64, max_value: i64) -> Self {
        Self {
            min_value,
            max_value,
            step: 1,
            sampling: Sampling::Linear,
            default: None,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_default(mut self, default: i64) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FloatConfig {
    pub min_value: f64,
    pub max_value: f64,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub sampling: Sampling,
    #[serde(default)]
    pub default: Option<f64>,
}

impl FloatConfig {
    pub fn new(min_value: f64, max_value: f64) -> Self {
        Self {
            min_value,
            max_value,
            step: None,
            sampling: Sampling::Linear,
            default: None,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoiceConfig {
    pub values: Vec<ParamValue>,
    #[serde(default)]
    pub ordered: Option<bool>,
    #[serde(default)]
    pub default: Option<ParamValue>,
}

impl ChoiceConfig {
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            ordered: None,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<ParamValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = Some(ordered);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BooleanConfig {
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedConfig {
    pub value: ParamValue,
}

/// Variant name of a record, used to pick the destination constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HyperParameterKind {
    Int,
    Float,
    Choice,
    Boolean,
    Fixed,
}

impl HyperParameterKind {
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Choice => "Choice",
            Self::Boolean => "Boolean",
            Self::Fixed => "Fixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HyperParameterSpec {
    Int(IntConfig),
    Float(FloatConfig),
    Choice(ChoiceConfig),
    Boolean(BooleanConfig),
    Fixed(FixedConfig),
}

impl HyperParameterSpec {
    pub fn kind(&self) -> HyperParameterKind {
        match self {
            Self::Int(_) => HyperParameterKind::Int,
            Self::Float(_) => HyperParameterKind::Float,
            Self::Choice(_) => HyperParameterKind::Choice,
            Self::Boolean(_) => HyperParameterKind::Boolean,
            Self::Fixed(_) => HyperParameterKind::Fixed,
        }
    }

    /// Reject ranges and choice lists no search could sample from
    pub fn validate(&self, name: &str) -> Result<()> {
        let fail = |msg: String| Err(AutokitError::HyperParameter(format!("{name}: {msg}")));
        match self {
            Self::Int(c) => {
                if c.min_value > c.max_value {
                    return fail(format!(
                        "min_value {} is greater than max_value {}",
                        c.min_value, c.max_value
                    ));
                }
                if c.step <= 0 {
                    return fail(format!("step must be positive, got {}", c.step));
                }
                if c.sampling != Sampling::Linear && c.min_value <= 0 {
                    return fail("log sampling requires a positive min_value".to_string());
                }
                if let Some(d) = c.default {
                    if d < c.min_value || d > c.max_value {
                        return fail(format!("default {d} is outside the range"));
                    }
                }
            }
            Self::Float(c) => {
                if !(c.min_value <= c.max_value) {
                    return fail(format!(
                        "min_value {} is greater than max_value {}",
                        c.min_value, c.max_value
                    ));
                }
                if matches!(c.step, Some(s) if !(s > 0.0)) {
                    return fail("step must be positive".to_string());
                }
                if c.sampling != Sampling::Linear && c.min_value <= 0.0 {
                    return fail("log sampling requires a positive min_value".to_string());
                }
                if let Some(d) = c.default {
                    if d < c.min_value || d > c.max_value {
                        return fail(format!("default {d} is outside the range"));
                    }
                }
            }
            Self::Choice(c) => {
                if c.values.is_empty() {
                    return fail("values must not be empty".to_string());
                }
                let first = c.values[0].value_type();
                if c.values.iter().any(|v| v.value_type() != first) {
                    return fail("values must all be of the same type".to_string());
                }
                if let Some(d) = &c.default {
                    if !c.values.contains(d) {
                        return fail(format!("default {d:?} is not one of the values"));
                    }
                }
            }
            Self::Boolean(_) | Self::Fixed(_) => {}
        }
        Ok(())
    }

    /// Explicit default, else the lower bound or first choice.
    ///
    /// `None` only for a choice with no values.
    pub fn default_value(&self) -> Option<ParamValue> {
        let value = match self {
            Self::Int(c) => ParamValue::Int(c.default.unwrap_or(c.min_value)),
            Self::Float(c) => ParamValue::Float(c.default.unwrap_or(c.min_value)),
            Self::Choice(c) => c.default.clone().or_else(|| c.values.first().cloned())?,
            Self::Boolean(c) => ParamValue::Bool(c.default),
            Self::Fixed(c) => c.value.clone(),
        };
        Some(value)
    }

    fn config_value(&self) -> Result<Value> {
        let value = match self {
            Self::Int(c) => serde_json::to_value(c)?,
            Self::Float(c) => serde_json::to_value(c)?,
            Self::Choice(c) => serde_json::to_value(c)?,
            Self::Boolean(c) => serde_json::to_value(c)?,
            Self::Fixed(c) => serde_json::to_value(c)?,
        };
        Ok(value)
    }
}

/// A named hyperparameter record
#[derive(Debug, Clone, PartialEq)]
pub struct HyperParameter {
    name: String,
    spec: HyperParameterSpec,
    default: ParamValue,
    conditions: Vec<Condition>,
}

impl HyperParameter {
    pub fn new(name: &str, spec: HyperParameterSpec) -> Result<Self> {
        if name.is_empty() {
            return Err(AutokitError::HyperParameter(
                "name must not be empty".to_string(),
            ));
        }
        spec.validate(name)?;
        let default = spec.default_value().ok_or_else(|| {
            AutokitError::HyperParameter(format!("{name}: no default value"))
        })?;
        Ok(Self {
            name: name.to_string(),
            spec,
            default,
            conditions: Vec::new(),
        })
    }

    pub fn int(name: &str, config: IntConfig) -> Result<Self> {
        Self::new(name, HyperParameterSpec::Int(config))
    }

    pub fn float(name: &str, config: FloatConfig) -> Result<Self> {
        Self::new(name, HyperParameterSpec::Float(config))
    }

    pub fn choice(name: &str, config: ChoiceConfig) -> Result<Self> {
        Self::new(name, HyperParameterSpec::Choice(config))
    }

    pub fn boolean(name: &str, config: BooleanConfig) -> Result<Self> {
        Self::new(name, HyperParameterSpec::Boolean(config))
    }

    pub fn fixed(name: &str, value: impl Into<ParamValue>) -> Result<Self> {
        Self::new(
            name,
            HyperParameterSpec::Fixed(FixedConfig {
                value: value.into(),
            }),
        )
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> HyperParameterKind {
        self.spec.kind()
    }

    pub fn spec(&self) -> &HyperParameterSpec {
        &self.spec
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn default_value(&self) -> ParamValue {
        self.default.clone()
    }

    /// Configuration dictionary: the variant fields plus `name` and `conditions`
    pub fn get_config(&self) -> Result<Map<String, Value>> {
        let mut config = match self.spec.config_value()? {
            Value::Object(map) => map,
            other => {
                return Err(AutokitError::HyperParameter(format!(
                    "{}: config did not serialize to an object: {other}",
                    self.name
                )))
            }
        };
        config.insert("name".to_string(), Value::String(self.name.clone()));
        config.insert(
            "conditions".to_string(),
            serde_json::to_value(&self.conditions)?,
        );
        Ok(config)
    }
}

//! Hyperparameter containers

use std::collections::BTreeMap;

use tracing::debug;

use super::record::{
    BooleanConfig, ChoiceConfig, Condition, FixedConfig, FloatConfig, HyperParameter,
    HyperParameterSpec, IntConfig, ParamValue,
};
use crate::error::{AutokitError, Result};

/// A container that hyperparameters can be registered into.
///
/// Each constructor registers a hyperparameter under `name` (if it is not
/// registered yet) and returns its current value.
pub trait HyperParameterRegistry {
    fn int(&mut self, name: &str, config: IntConfig) -> Result<ParamValue>;

    fn float(&mut self, name: &str, config: FloatConfig) -> Result<ParamValue>;

    fn choice(&mut self, name: &str, config: ChoiceConfig) -> Result<ParamValue>;

    fn boolean(&mut self, name: &str, config: BooleanConfig) -> Result<ParamValue>;

    fn fixed(&mut self, name: &str, config: FixedConfig) -> Result<ParamValue>;
}

/// In-memory search space with the current value of every hyperparameter
#[derive(Debug, Clone, Default)]
pub struct HyperParameters {
    space: Vec<HyperParameter>,
    values: BTreeMap<String, ParamValue>,
    /// Conditions of the enclosing `conditional_scope` calls
    scope: Vec<Condition>,
}

impl HyperParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered records, in registration order
    pub fn space(&self) -> &[HyperParameter] {
        &self.space
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn record(&self, name: &str) -> Option<&HyperParameter> {
        self.space.iter().find(|hp| hp.name() == name)
    }

    pub fn len(&self) -> usize {
        self.space.len()
    }

    pub fn is_empty(&self) -> bool {
        self.space.is_empty()
    }

    /// Override the current value of a registered hyperparameter
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let slot = self.values.get_mut(name).ok_or_else(|| {
            AutokitError::HyperParameter(format!("Unknown hyperparameter: {name}"))
        })?;
        *slot = value;
        Ok(())
    }

    /// Register everything created inside `f` as conditional on `parent_name`
    /// holding one of `parent_values`.
    pub fn conditional_scope<T>(
        &mut self,
        parent_name: &str,
        parent_values: Vec<ParamValue>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> Result<T> {
        if !self.values.contains_key(parent_name) {
            return Err(AutokitError::HyperParameter(format!(
                "`conditional_scope` parent `{parent_name}` is not registered"
            )));
        }
        self.scope.push(Condition::new(parent_name, parent_values));
        let result = f(self);
        self.scope.pop();
        Ok(result)
    }

    /// Whether every condition of `hp` holds for the current values
    pub fn is_active(&self, hp: &HyperParameter) -> bool {
        hp.conditions().iter().all(|condition| {
            self.values
                .get(&condition.name)
                .is_some_and(|value| condition.is_met_by(value))
        })
    }

    fn register(&mut self, name: &str, spec: HyperParameterSpec) -> Result<ParamValue> {
        if let Some(existing) = self.values.get(name) {
            return Ok(existing.clone());
        }

        let hp = HyperParameter::new(name, spec)?.with_conditions(self.scope.clone());
        let value = hp.default_value();
        debug!(name, kind = hp.kind().class_name(), "Registered hyperparameter");

        self.values.insert(name.to_string(), value.clone());
        self.space.push(hp);
        Ok(value)
    }
}

impl HyperParameterRegistry for HyperParameters {
    fn int(&mut self, name: &str, config: IntConfig) -> Result<ParamValue> {
        self.register(name, HyperParameterSpec::Int(config))
    }

    fn float(&mut self, name: &str, config: FloatConfig) -> Result<ParamValue> {
        self.register(name, HyperParameterSpec::Float(config))
    }

    fn choice(&mut self, name: &str, config: ChoiceConfig) -> Result<ParamValue> {
        self.register(name, HyperParameterSpec::Choice(config))
    }

    fn boolean(&mut self, name: &str, config: BooleanConfig) -> Result<ParamValue> {
        self.register(name, HyperParameterSpec::Boolean(config))
    }

    fn fixed(&mut self, name: &str, config: FixedConfig) -> Result<ParamValue> {
        self.register(name, HyperParameterSpec::Fixed(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_returns_default_and_records() {
        let mut hps = HyperParameters::new();
        let units = hps.int("units", IntConfig::new(16, 128).with_default(64)).unwrap();
        assert_eq!(units, ParamValue::Int(64));
        assert_eq!(hps.get("units"), Some(&ParamValue::Int(64)));
        assert_eq!(hps.len(), 1);
        assert_eq!(hps.record("units").unwrap().name(), "units");
    }

    #[test]
    fn test_reregistering_keeps_current_value() {
        let mut hps = HyperParameters::new();
        hps.choice("optimizer", ChoiceConfig::new(["adam", "sgd"])).unwrap();
        hps.set("optimizer", "sgd".into()).unwrap();

        let again = hps
            .choice("optimizer", ChoiceConfig::new(["adam", "sgd"]))
            .unwrap();
        assert_eq!(again, ParamValue::from("sgd"));
        assert_eq!(hps.len(), 1);
    }

    #[test]
    fn test_set_unknown_name_fails() {
        let mut hps = HyperParameters::new();
        assert!(hps.set("missing", ParamValue::Int(1)).is_err());
    }

    #[test]
    fn test_invalid_config_is_not_registered() {
        let mut hps = HyperParameters::new();
        assert!(hps.int("n", IntConfig::new(5, 1)).is_err());
        assert!(hps.is_empty());
        assert!(hps.get("n").is_none());
    }

    #[test]
    fn test_conditional_scope() {
        let mut hps = HyperParameters::new();
        hps.choice("block_type", ChoiceConfig::new(["resnet", "xception"]))
            .unwrap();

        let depth = hps
            .conditional_scope("block_type", vec!["resnet".into()], |hps| {
                hps.int("depth", IntConfig::new(18, 152))
            })
            .unwrap()
            .unwrap();
        assert_eq!(depth, ParamValue::Int(18));

        let depth_hp = hps.record("depth").unwrap().clone();
        assert_eq!(depth_hp.conditions().len(), 1);
        assert!(hps.is_active(&depth_hp));

        hps.set("block_type", "xception".into()).unwrap();
        assert!(!hps.is_active(&depth_hp));

        // Scope does not leak past the closure.
        hps.boolean("dropout", BooleanConfig::default()).unwrap();
        assert!(hps.record("dropout").unwrap().conditions().is_empty());
    }

    #[test]
    fn test_conditional_scope_requires_parent() {
        let mut hps = HyperParameters::new();
        let result = hps.conditional_scope("nope", vec![ParamValue::Bool(true)], |_| ());
        assert!(result.is_err());
    }
}

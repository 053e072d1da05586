//! Moving hyperparameters between containers
//!
//! Blocks accept either a plain value or a hyperparameter record for each
//! tunable argument. When the block builds itself, records are re-created in
//! the registry of the current trial while plain values pass through.

use serde_json::Value;
use tracing::debug;

use super::record::{HyperParameter, HyperParameterKind, ParamValue, ValueType};
use super::registry::HyperParameterRegistry;
use crate::error::{AutokitError, Result};

/// A tunable argument: a fixed value or a hyperparameter to search over
#[derive(Debug, Clone, PartialEq)]
pub enum Tunable {
    Value(ParamValue),
    Param(HyperParameter),
}

impl Tunable {
    pub fn is_param(&self) -> bool {
        matches!(self, Tunable::Param(_))
    }
}

impl From<ParamValue> for Tunable {
    fn from(value: ParamValue) -> Self {
        Tunable::Value(value)
    }
}

impl From<HyperParameter> for Tunable {
    fn from(hp: HyperParameter) -> Self {
        Tunable::Param(hp)
    }
}

/// Use `value` when the caller supplied one, otherwise fall back to `hp`.
///
/// `_dtype` is accepted for call-site compatibility; no coercion is applied.
pub fn get_hyperparameter(
    value: Option<ParamValue>,
    hp: HyperParameter,
    _dtype: ValueType,
) -> Tunable {
    match value {
        Some(value) => Tunable::Value(value),
        None => Tunable::Param(hp),
    }
}

/// Builds a hyperparameter in a registry from its remaining config fields
type Constructor = fn(&mut dyn HyperParameterRegistry, &str, Value) -> Result<ParamValue>;

fn construct_int(
    hps: &mut dyn HyperParameterRegistry,
    name: &str,
    fields: Value,
) -> Result<ParamValue> {
    hps.int(name, serde_json::from_value(fields)?)
}

fn construct_float(
    hps: &mut dyn HyperParameterRegistry,
    name: &str,
    fields: Value,
) -> Result<ParamValue> {
    hps.float(name, serde_json::from_value(fields)?)
}

fn construct_choice(
    hps: &mut dyn HyperParameterRegistry,
    name: &str,
    fields: Value,
) -> Result<ParamValue> {
    hps.choice(name, serde_json::from_value(fields)?)
}

fn construct_boolean(
    hps: &mut dyn HyperParameterRegistry,
    name: &str,
    fields: Value,
) -> Result<ParamValue> {
    hps.boolean(name, serde_json::from_value(fields)?)
}

fn construct_fixed(
    hps: &mut dyn HyperParameterRegistry,
    name: &str,
    fields: Value,
) -> Result<ParamValue> {
    hps.fixed(name, serde_json::from_value(fields)?)
}

const CONSTRUCTORS: [(HyperParameterKind, Constructor); 5] = [
    (HyperParameterKind::Int, construct_int),
    (HyperParameterKind::Float, construct_float),
    (HyperParameterKind::Choice, construct_choice),
    (HyperParameterKind::Boolean, construct_boolean),
    (HyperParameterKind::Fixed, construct_fixed),
];

fn constructor_for(kind: HyperParameterKind) -> Result<Constructor> {
    CONSTRUCTORS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, constructor)| *constructor)
        .ok_or_else(|| {
            AutokitError::HyperParameter(format!(
                "No constructor for hyperparameter kind {}",
                kind.class_name()
            ))
        })
}

/// Register `hp` into `hps` and return its value there.
///
/// Plain values are returned unchanged without touching `hps`. A record is
/// re-created from its config minus `name` and `conditions`, under `name`
/// when given or its own name otherwise.
pub fn add_to_hp(
    hp: Tunable,
    hps: &mut dyn HyperParameterRegistry,
    name: Option<&str>,
) -> Result<ParamValue> {
    let hp = match hp {
        Tunable::Value(value) => return Ok(value),
        Tunable::Param(hp) => hp,
    };

    let mut fields = hp.get_config()?;
    let name = name.unwrap_or(hp.name());
    fields.remove("conditions");
    fields.remove("name");

    let kind = hp.kind();
    debug!(name, kind = kind.class_name(), "Adding hyperparameter to registry");
    let constructor = constructor_for(kind)?;
    constructor(hps, name, Value::Object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparameters::record::{
        BooleanConfig, ChoiceConfig, Condition, FixedConfig, FloatConfig, IntConfig, Sampling,
    };
    use crate::hyperparameters::registry::HyperParameters;
    use mockall::mock;
    use mockall::predicate::{eq, function};

    mock! {
        Registry {}

        impl HyperParameterRegistry for Registry {
            fn int(&mut self, name: &str, config: IntConfig) -> Result<ParamValue>;
            fn float(&mut self, name: &str, config: FloatConfig) -> Result<ParamValue>;
            fn choice(&mut self, name: &str, config: ChoiceConfig) -> Result<ParamValue>;
            fn boolean(&mut self, name: &str, config: BooleanConfig) -> Result<ParamValue>;
            fn fixed(&mut self, name: &str, config: FixedConfig) -> Result<ParamValue>;
        }
    }

    #[test]
    fn test_plain_value_passes_through_without_registry_calls() {
        let mut registry = MockRegistry::new();
        registry.expect_int().times(0);
        registry.expect_float().times(0);
        registry.expect_choice().times(0);
        registry.expect_boolean().times(0);
        registry.expect_fixed().times(0);

        let value = add_to_hp(Tunable::Value(ParamValue::Int(7)), &mut registry, Some("x"))
            .unwrap();
        assert_eq!(value, ParamValue::Int(7));
    }

    #[test]
    fn test_record_dispatches_to_matching_constructor() {
        let config = IntConfig::new(1, 4).with_default(2);
        let hp = HyperParameter::int("num_layers", config.clone())
            .unwrap()
            .with_conditions(vec![Condition::new("block", vec!["dense".into()])]);

        let mut registry = MockRegistry::new();
        registry
            .expect_int()
            .with(eq("num_layers"), eq(config))
            .times(1)
            .returning(|_, _| Ok(ParamValue::Int(2)));
        registry.expect_choice().times(0);

        let value = add_to_hp(Tunable::Param(hp), &mut registry, None).unwrap();
        assert_eq!(value, ParamValue::Int(2));
    }

    #[test]
    fn test_explicit_name_overrides_record_name() {
        let hp = HyperParameter::float(
            "learning_rate",
            FloatConfig::new(1e-5, 1e-2).with_sampling(Sampling::Log),
        )
        .unwrap();

        let mut registry = MockRegistry::new();
        registry
            .expect_float()
            .with(
                eq("classification_head_1/learning_rate"),
                function(|config: &FloatConfig| config.sampling == Sampling::Log),
            )
            .times(1)
            .returning(|_, _| Ok(ParamValue::Float(1e-5)));

        add_to_hp(
            Tunable::Param(hp),
            &mut registry,
            Some("classification_head_1/learning_rate"),
        )
        .unwrap();
    }

    #[test]
    fn test_every_kind_round_trips_into_real_registry() {
        let records = vec![
            HyperParameter::int("a", IntConfig::new(2, 10).with_step(2)).unwrap(),
            HyperParameter::float("b", FloatConfig::new(0.0, 0.5).with_step(0.1)).unwrap(),
            HyperParameter::choice("c", ChoiceConfig::new([16, 32]).with_default(32)).unwrap(),
            HyperParameter::boolean("d", BooleanConfig { default: true }).unwrap(),
            HyperParameter::fixed("e", "same").unwrap(),
        ];

        let mut hps = HyperParameters::new();
        let values: Vec<ParamValue> = records
            .iter()
            .cloned()
            .map(|hp| add_to_hp(hp.into(), &mut hps, None).unwrap())
            .collect();

        assert_eq!(
            values,
            vec![
                ParamValue::Int(2),
                ParamValue::Float(0.0),
                ParamValue::Int(32),
                ParamValue::Bool(true),
                ParamValue::from("same"),
            ]
        );
        for (original, copied) in records.iter().zip(hps.space()) {
            assert_eq!(original.spec(), copied.spec());
        }
    }

    #[test]
    fn test_conditions_come_from_destination_scope() {
        let hp = HyperParameter::int("filters", IntConfig::new(8, 64))
            .unwrap()
            .with_conditions(vec![Condition::new("source_parent", vec![true.into()])]);

        let mut hps = HyperParameters::new();
        hps.boolean("use_conv", BooleanConfig { default: true }).unwrap();
        hps.conditional_scope("use_conv", vec![true.into()], |hps| {
            add_to_hp(hp.into(), hps, None)
        })
        .unwrap()
        .unwrap();

        let copied = hps.record("filters").unwrap();
        assert_eq!(copied.conditions(), &[Condition::new("use_conv", vec![true.into()])]);
    }

    #[test]
    fn test_get_hyperparameter_prefers_explicit_value() {
        let hp = HyperParameter::choice("dropout", ChoiceConfig::new([0.0, 0.25, 0.5])).unwrap();

        let explicit =
            get_hyperparameter(Some(ParamValue::Float(0.1)), hp.clone(), ValueType::Float);
        assert_eq!(explicit, Tunable::Value(ParamValue::Float(0.1)));

        let fallback = get_hyperparameter(None, hp.clone(), ValueType::Float);
        assert_eq!(fallback, Tunable::Param(hp));
        assert!(fallback.is_param());
    }

    #[test]
    fn test_constructor_table_covers_every_kind() {
        for kind in [
            HyperParameterKind::Int,
            HyperParameterKind::Float,
            HyperParameterKind::Choice,
            HyperParameterKind::Boolean,
            HyperParameterKind::Fixed,
        ] {
            assert!(constructor_for(kind).is_ok(), "{}", kind.class_name());
        }
    }
}

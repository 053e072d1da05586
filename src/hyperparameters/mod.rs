//! Hyperparameter records, registries and the helpers that bridge them.

pub mod bridge;
pub mod record;
pub mod registry;

pub use bridge::{add_to_hp, get_hyperparameter, Tunable};
pub use record::{
    BooleanConfig, ChoiceConfig, Condition, FixedConfig, FloatConfig, HyperParameter,
    HyperParameterKind, HyperParameterSpec, IntConfig, ParamValue, Sampling, ValueType,
};
pub use registry::{HyperParameterRegistry, HyperParameters};

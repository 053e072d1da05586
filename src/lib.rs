//! Helper layer for an AutoML system built on a deep-learning framework and a
//! hyperparameter tuner.
//!
//! - [`validation`]: input-count checks on nested inputs
//! - [`naming`]: camel case to snake case
//! - [`version`]: dependency version checks (warn, never fail)
//! - [`adaptive`]: fit / evaluate / predict with batch-size halving on OOM
//! - [`hyperparameters`]: records, registries and bridging helpers
//! - [`serialization`]: legacy / current object-serialization adapters

pub mod adaptive;
pub mod config;
pub mod error;
pub mod hyperparameters;
pub mod logging;
pub mod naming;
pub mod serialization;
pub mod validation;
pub mod version;

pub use adaptive::{
    evaluate_with_adaptive_batch_size, evaluate_with_batch_config, fit_with_adaptive_batch_size,
    fit_with_batch_config, predict_with_adaptive_batch_size, predict_with_batch_config,
    run_with_adaptive_batch_size, Dataset, Model, Options, RunArgs, Verbosity,
};
pub use config::{AutokitConfig, BatchConfig, SerializationConfig};
pub use error::{AutokitError, Result};
pub use hyperparameters::{
    add_to_hp, get_hyperparameter, HyperParameter, HyperParameterRegistry, HyperParameters,
    ParamValue, Tunable,
};
pub use naming::to_snake_case;
pub use serialization::{
    deserialize_keras_object, deserialize_with_config, serialize_keras_object,
    serialize_with_config, KerasSerializable, ObjectRegistry, SerializationMode,
};
pub use validation::{contain_instance, validate_num_inputs, Nested};
pub use version::{check_kt_version, check_tf_version, Version, VersionWarning};

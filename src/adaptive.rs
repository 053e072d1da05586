//! Adaptive batch sizing
//!
//! Runs fit / evaluate / predict and, when the execution engine runs out of
//! memory, halves the batch size, re-batches the datasets and tries again.
//! Batch size 1 is the floor: exhausting memory there is fatal.
//!
//! The engine is reached through the [`Model`] and [`Dataset`] traits so that
//! any backend (or a test double) can be plugged in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, field, warn};

use crate::config::BatchConfig;
use crate::error::{AutokitError, Result};

/// Extra keyword options forwarded untouched to the engine
pub type Options = BTreeMap<String, serde_json::Value>;

/// A batched dataset
pub trait Dataset: Sized {
    /// Split batches back into individual elements
    fn unbatch(self) -> Self;

    /// Group elements into batches of `batch_size`
    fn batch(self, batch_size: usize) -> Self;

    fn rebatch(self, batch_size: usize) -> Self {
        self.unbatch().batch(batch_size)
    }
}

/// Verbosity level passed to evaluate and predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Silent,
    #[default]
    ProgressBar,
    OneLinePerEpoch,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Silent,
            1 => Self::ProgressBar,
            _ => Self::OneLinePerEpoch,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Silent => 0,
            Self::ProgressBar => 1,
            Self::OneLinePerEpoch => 2,
        }
    }
}

/// A trainable model backed by an execution engine.
///
/// Implementations report out-of-memory conditions as
/// [`AutokitError::ResourceExhausted`]; any other error is never retried.
pub trait Model {
    type Data: Dataset;
    type History;
    type Evaluation;
    type Prediction;

    fn fit(
        &mut self,
        x: &Self::Data,
        validation_data: Option<&Self::Data>,
        options: &Options,
    ) -> Result<Self::History>;

    fn evaluate(
        &self,
        x: &Self::Data,
        verbose: Verbosity,
        options: &Options,
    ) -> Result<Self::Evaluation>;

    fn predict(
        &self,
        x: &Self::Data,
        verbose: Verbosity,
        options: &Options,
    ) -> Result<Self::Prediction>;
}

/// Arguments of a fit / evaluate / predict call
#[derive(Debug, Clone)]
pub struct RunArgs<D> {
    pub x: D,
    pub validation_data: Option<D>,
    pub options: Options,
}

impl<D> RunArgs<D> {
    pub fn new(x: D) -> Self {
        Self {
            x,
            validation_data: None,
            options: Options::new(),
        }
    }

    pub fn with_validation_data(mut self, validation_data: D) -> Self {
        self.validation_data = Some(validation_data);
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }
}

/// Call `func` until it succeeds, halving the batch size on memory exhaustion.
///
/// `func` receives the primary dataset, the optional validation dataset and
/// the pass-through options. Both datasets are re-batched after each halving.
///
/// # Returns
/// * the result of the first successful call
/// * the resource-exhaustion error unchanged if it happens at batch size 1
/// * any other error immediately
pub fn run_with_adaptive_batch_size<D, T, F>(
    batch_size: usize,
    mut func: F,
    args: RunArgs<D>,
) -> Result<T>
where
    D: Dataset,
    F: FnMut(&D, Option<&D>, &Options) -> Result<T>,
{
    if batch_size == 0 {
        return Err(AutokitError::Validation(
            "Batch size must be positive, got 0".to_string(),
        ));
    }

    let span = debug_span!(
        "adaptive_batch",
        initial_batch_size = batch_size,
        batch_size = field::Empty
    );
    let _enter = span.enter();

    let RunArgs {
        mut x,
        mut validation_data,
        options,
    } = args;
    let mut batch_size = batch_size;

    loop {
        match func(&x, validation_data.as_ref(), &options) {
            Ok(result) => {
                debug!(batch_size, "Run succeeded");
                return Ok(result);
            }
            Err(e) if e.is_resource_exhausted() => {
                if batch_size == 1 {
                    return Err(e);
                }
                batch_size /= 2;
                span.record("batch_size", batch_size);
                warn!(batch_size, "Not enough memory, reducing batch size");
                println!("Not enough memory, reduce batch size to {}.", batch_size);

                x = x.rebatch(batch_size);
                validation_data = validation_data.map(|data| data.rebatch(batch_size));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Evaluate `model`, shrinking the batch size on memory exhaustion
pub fn evaluate_with_adaptive_batch_size<M: Model>(
    model: &M,
    batch_size: usize,
    verbose: Verbosity,
    args: RunArgs<M::Data>,
) -> Result<M::Evaluation> {
    run_with_adaptive_batch_size(
        batch_size,
        |x, _validation_data, options| model.evaluate(x, verbose, options),
        args,
    )
}

/// Predict with `model`, shrinking the batch size on memory exhaustion
pub fn predict_with_adaptive_batch_size<M: Model>(
    model: &M,
    batch_size: usize,
    verbose: Verbosity,
    args: RunArgs<M::Data>,
) -> Result<M::Prediction> {
    run_with_adaptive_batch_size(
        batch_size,
        |x, _validation_data, options| model.predict(x, verbose, options),
        args,
    )
}

/// Fit `model`, shrinking the batch size on memory exhaustion.
///
/// Returns the trained model together with its history.
pub fn fit_with_adaptive_batch_size<M: Model>(
    mut model: M,
    batch_size: usize,
    args: RunArgs<M::Data>,
) -> Result<(M, M::History)> {
    let history = run_with_adaptive_batch_size(
        batch_size,
        |x, validation_data, options| model.fit(x, validation_data, options),
        args,
    )?;
    Ok((model, history))
}

/// [`evaluate_with_adaptive_batch_size`] starting from the configured batch
/// size and verbosity
pub fn evaluate_with_batch_config<M: Model>(
    model: &M,
    config: &BatchConfig,
    args: RunArgs<M::Data>,
) -> Result<M::Evaluation> {
    evaluate_with_adaptive_batch_size(model, config.initial_batch_size, config.verbosity(), args)
}

/// [`predict_with_adaptive_batch_size`] starting from the configured batch
/// size and verbosity
pub fn predict_with_batch_config<M: Model>(
    model: &M,
    config: &BatchConfig,
    args: RunArgs<M::Data>,
) -> Result<M::Prediction> {
    predict_with_adaptive_batch_size(model, config.initial_batch_size, config.verbosity(), args)
}

/// [`fit_with_adaptive_batch_size`] starting from the configured batch size
pub fn fit_with_batch_config<M: Model>(
    model: M,
    config: &BatchConfig,
    args: RunArgs<M::Data>,
) -> Result<(M, M::History)> {
    fit_with_adaptive_batch_size(model, config.initial_batch_size, args)
}

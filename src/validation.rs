//! Argument validation for model inputs
//!
//! Model-building code receives its inputs as arbitrarily nested structures
//! (a single tensor, a list of tensors, a dict of lists...). These helpers
//! check the structure against what a block expects before any graph is built.

use std::any::Any;
use std::collections::BTreeMap;

use crate::error::{AutokitError, Result};

/// A possibly nested collection of inputs
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Leaf(T),
    Seq(Vec<Nested<T>>),
    /// Entries are visited in key order when flattening
    Map(BTreeMap<String, Nested<T>>),
}

impl<T> Nested<T> {
    /// Flatten into a linear sequence, depth first
    pub fn flatten(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Nested::Leaf(value) => out.push(value),
            Nested::Seq(items) => items.iter().for_each(|item| item.collect_into(out)),
            Nested::Map(entries) => entries.values().for_each(|item| item.collect_into(out)),
        }
    }

    /// Number of leaves
    pub fn len_flat(&self) -> usize {
        match self {
            Nested::Leaf(_) => 1,
            Nested::Seq(items) => items.iter().map(Nested::len_flat).sum(),
            Nested::Map(entries) => entries.values().map(Nested::len_flat).sum(),
        }
    }
}

impl<T> From<T> for Nested<T> {
    fn from(value: T) -> Self {
        Nested::Leaf(value)
    }
}

impl<T> FromIterator<T> for Nested<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Nested::Seq(iter.into_iter().map(Nested::Leaf).collect())
    }
}

/// Validate that the flattened inputs hold exactly `num` elements
///
/// # Returns
/// * `Ok(())` if the count matches
/// * `Err(AutokitError::Validation)` citing expected and actual counts
pub fn validate_num_inputs<T>(inputs: &Nested<T>, num: usize) -> Result<()> {
    let len = inputs.len_flat();
    if len != num {
        return Err(AutokitError::Validation(format!(
            "Expected {} elements in the inputs list but received {} inputs.",
            num, len
        )));
    }
    Ok(())
}

/// Check whether any element is of concrete type `T`
pub fn contain_instance<T: Any>(items: &[&dyn Any]) -> bool {
    items.iter().any(|item| item.is::<T>())
}

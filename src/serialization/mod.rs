//! Object serialization shims
//!
//! Objects are stored as `{"class_name": ..., "config": {...}}` dictionaries.
//! Two layouts exist: the legacy one and the current one, which also records
//! the defining module and the registered name. Which one is used is decided
//! once, in configuration ([`SerializationMode`]), and every call is routed to
//! the matching adapter.

pub mod current;
pub mod legacy;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::SerializationConfig;
use crate::error::{AutokitError, Result};

/// Which serialization layout to read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationMode {
    Legacy,
    #[default]
    Current,
}

impl SerializationMode {
    /// Name used in configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Current => "current",
        }
    }
}

/// An object that can describe itself as a class name plus a config dictionary
pub trait KerasSerializable {
    fn class_name(&self) -> &str;

    fn get_config(&self) -> Result<Map<String, Value>>;

    /// Module the class is defined in
    fn module(&self) -> &str {
        "autokit"
    }

    /// Name the class was registered under, if different from `class_name`
    fn registered_name(&self) -> Option<String> {
        None
    }
}

/// Rebuilds an object from its config dictionary
pub type Factory<T> = fn(&Map<String, Value>) -> Result<T>;

/// Class name to factory lookup used while deserializing
pub struct ObjectRegistry<T> {
    factories: HashMap<String, Factory<T>>,
}

impl<T> fmt::Debug for ObjectRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl<T> Default for ObjectRegistry<T> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<T> Clone for ObjectRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<T> ObjectRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: &str, factory: Factory<T>) -> &mut Self {
        self.factories.insert(class_name.to_string(), factory);
        self
    }

    pub fn with(mut self, class_name: &str, factory: Factory<T>) -> Self {
        self.register(class_name, factory);
        self
    }

    pub fn get(&self, class_name: &str) -> Option<Factory<T>> {
        self.factories.get(class_name).copied()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Serialize `obj` with the layout selected by `mode`
pub fn serialize_keras_object(
    mode: SerializationMode,
    obj: &dyn KerasSerializable,
) -> Result<Value> {
    match mode {
        SerializationMode::Legacy => legacy::serialize_keras_object(obj),
        SerializationMode::Current => current::serialize_keras_object(obj),
    }
}

/// Rebuild an object from `config` with the layout selected by `mode`.
///
/// Class names are looked up in `custom_objects` first, then in
/// `module_objects`. `printable_module_name` names the kind of object in
/// error messages and defaults to `"object"`.
pub fn deserialize_keras_object<T>(
    mode: SerializationMode,
    config: &Value,
    module_objects: Option<&ObjectRegistry<T>>,
    custom_objects: Option<&ObjectRegistry<T>>,
    printable_module_name: Option<&str>,
) -> Result<T> {
    let printable_module_name = printable_module_name.unwrap_or("object");
    match mode {
        SerializationMode::Legacy => legacy::deserialize_keras_object(
            config,
            module_objects,
            custom_objects,
            printable_module_name,
        ),
        SerializationMode::Current => current::deserialize_keras_object(
            config,
            custom_objects,
            module_objects,
            printable_module_name,
        ),
    }
}

/// [`serialize_keras_object`] in the configured layout
pub fn serialize_with_config(
    settings: &SerializationConfig,
    obj: &dyn KerasSerializable,
) -> Result<Value> {
    serialize_keras_object(settings.mode, obj)
}

/// [`deserialize_keras_object`] in the configured layout
pub fn deserialize_with_config<T>(
    settings: &SerializationConfig,
    config: &Value,
    module_objects: Option<&ObjectRegistry<T>>,
    custom_objects: Option<&ObjectRegistry<T>>,
    printable_module_name: Option<&str>,
) -> Result<T> {
    deserialize_keras_object(
        settings.mode,
        config,
        module_objects,
        custom_objects,
        printable_module_name,
    )
}

/// Class name and config of a serialized object
struct Identifier<'a> {
    class_name: &'a str,
    config: Map<String, Value>,
}

fn parse_identifier<'a>(
    config: &'a Value,
    printable_module_name: &str,
) -> Result<Identifier<'a>> {
    match config {
        Value::String(class_name) => Ok(Identifier {
            class_name,
            config: Map::new(),
        }),
        Value::Object(map) => {
            let class_name = map
                .get("class_name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AutokitError::Serialization(format!(
                        "Could not interpret serialized {printable_module_name}: \
                         missing `class_name` in {config}"
                    ))
                })?;
            let inner = match map.get("config") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(inner)) => inner.clone(),
                Some(other) => {
                    return Err(AutokitError::Serialization(format!(
                        "Could not interpret serialized {printable_module_name}: \
                         `config` must be an object, got {other}"
                    )))
                }
            };
            Ok(Identifier {
                class_name,
                config: inner,
            })
        }
        other => Err(AutokitError::Serialization(format!(
            "Could not interpret serialized {printable_module_name}: {other}"
        ))),
    }
}

fn resolve<T>(
    class_name: &str,
    custom_objects: Option<&ObjectRegistry<T>>,
    module_objects: Option<&ObjectRegistry<T>>,
) -> Option<Factory<T>> {
    custom_objects
        .and_then(|registry| registry.get(class_name))
        .or_else(|| module_objects.and_then(|registry| registry.get(class_name)))
}

fn unknown(printable_module_name: &str, class_name: &str) -> AutokitError {
    AutokitError::Serialization(format!(
        "Unknown {printable_module_name}: '{class_name}'. Please ensure you are \
         passing it through `custom_objects` or `module_objects`."
    ))
}

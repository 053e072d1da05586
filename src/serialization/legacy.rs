//! Legacy layout: `{"class_name": ..., "config": {...}}`

use serde_json::{Map, Value};

use super::{parse_identifier, resolve, unknown, KerasSerializable, ObjectRegistry};
use crate::error::Result;

pub fn serialize_keras_object(obj: &dyn KerasSerializable) -> Result<Value> {
    let mut out = Map::new();
    out.insert(
        "class_name".to_string(),
        Value::String(obj.class_name().to_string()),
    );
    out.insert("config".to_string(), Value::Object(obj.get_config()?));
    Ok(Value::Object(out))
}

pub fn deserialize_keras_object<T>(
    config: &Value,
    module_objects: Option<&ObjectRegistry<T>>,
    custom_objects: Option<&ObjectRegistry<T>>,
    printable_module_name: &str,
) -> Result<T> {
    let identifier = parse_identifier(config, printable_module_name)?;
    let factory = resolve(identifier.class_name, custom_objects, module_objects)
        .ok_or_else(|| unknown(printable_module_name, identifier.class_name))?;
    factory(&identifier.config)
}

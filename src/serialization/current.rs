//! Current layout: `{"module", "class_name", "config", "registered_name"}`

use serde_json::{Map, Value};

use super::{parse_identifier, resolve, unknown, KerasSerializable, ObjectRegistry};
use crate::error::Result;

pub fn serialize_keras_object(obj: &dyn KerasSerializable) -> Result<Value> {
    let class_name = obj.class_name().to_string();
    let registered_name = obj
        .registered_name()
        .unwrap_or_else(|| class_name.clone());

    let mut out = Map::new();
    out.insert("module".to_string(), Value::String(obj.module().to_string()));
    out.insert("class_name".to_string(), Value::String(class_name));
    out.insert("config".to_string(), Value::Object(obj.get_config()?));
    out.insert("registered_name".to_string(), Value::String(registered_name));
    Ok(Value::Object(out))
}

/// Objects are looked up by `registered_name` when present, else by `class_name`.
pub fn deserialize_keras_object<T>(
    config: &Value,
    custom_objects: Option<&ObjectRegistry<T>>,
    module_objects: Option<&ObjectRegistry<T>>,
    printable_module_name: &str,
) -> Result<T> {
    let identifier = parse_identifier(config, printable_module_name)?;
    let registered_name = config.get("registered_name").and_then(Value::as_str);

    let factory = registered_name
        .and_then(|name| resolve(name, custom_objects, module_objects))
        .or_else(|| resolve(identifier.class_name, custom_objects, module_objects))
        .ok_or_else(|| unknown(printable_module_name, identifier.class_name))?;
    factory(&identifier.config)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use serde_json::json;

    struct Registered(Dense);

    impl KerasSerializable for Registered {
        fn class_name(&self) -> &str {
            "Dense"
        }

        fn get_config(&self) -> Result<Map<String, Value>> {
            self.0.get_config()
        }

        fn module(&self) -> &str {
            "my_package.layers"
        }

        fn registered_name(&self) -> Option<String> {
            Some("MyPackage>Dense".to_string())
        }
    }

    #[test]
    fn test_layout() {
        let layer = Dense {
            units: 4,
            activation: "relu".into(),
        };
        let value = serialize_keras_object(&layer).unwrap();
        assert_eq!(
            value,
            json!({
                "module": "keras.layers",
                "class_name": "Dense",
                "config": {"units": 4, "activation": "relu"},
                "registered_name": "Dense",
            })
        );
    }

    #[test]
    fn test_registered_name_is_preferred() {
        let layer = Registered(Dense {
            units: 5,
            activation: "relu".into(),
        });
        let value = serialize_keras_object(&layer).unwrap();
        assert_eq!(value["registered_name"], json!("MyPackage>Dense"));

        let custom = ObjectRegistry::new().with("MyPackage>Dense", wide_dense_from_config);
        let restored =
            deserialize_keras_object(&value, Some(&custom), Some(&layers()), "layer").unwrap();
        assert_eq!(restored.units, 50);
    }

    #[test]
    fn test_falls_back_to_class_name() {
        let value = json!({
            "module": "my_package.layers",
            "class_name": "Dense",
            "config": {"units": 6},
            "registered_name": "MyPackage>Dense",
        });
        let restored = deserialize_keras_object(&value, None, Some(&layers()), "layer").unwrap();
        assert_eq!(restored.units, 6);
    }
}

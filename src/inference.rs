//! Type inference over host runtime values and annotations.

use crate::docblock::DocBlock;
use crate::error::{Error, Result};
use crate::types::{ScalarType, Type};
use indexmap::IndexMap;
use log::debug;

/// A runtime value captured from the analysed application
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed or unsigned 64-bit integer
    Integer(i128),
    Float(f64),
    String(String),
    /// Sequential list
    List(Vec<Value>),
    /// Associative mapping
    Map(IndexMap<String, Value>),
    /// Instance of a class, identified by class name
    Instance(String),
    /// Opaque handle (file, stream, socket, ...) described by its kind
    Handle(String),
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Integer(i128::from(u))
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Stateless type inference
pub struct TypeInference;

impl TypeInference {
    /// Name of the type of `value`: `null`, `boolean`, `integer`, `float`, `string`,
    /// `array`, `object` or the class name of an instance.
    pub fn infer_type(value: &Value) -> Result<String> {
        Ok(Self::infer(value)?.name())
    }

    /// Full type of `value`. Lists carry their item type.
    pub fn infer(value: &Value) -> Result<Type> {
        let ty = match value {
            Value::Null => ScalarType::Null.into(),
            Value::Bool(_) => ScalarType::Boolean.into(),
            Value::Integer(_) => ScalarType::Integer.into(),
            Value::Float(_) => ScalarType::Float.into(),
            Value::String(_) => ScalarType::String.into(),
            Value::List(items) => Type::list(Self::infer_from_array(items)?),
            Value::Map(_) => ScalarType::Object.into(),
            Value::Instance(class_name) => Type::object(class_name),
            Value::Handle(kind) => {
                return Err(Error::UnsupportedType(format!("a {} handle", kind)));
            }
        };
        Ok(ty)
    }

    /// Common type of all elements: a single type when homogeneous, otherwise a union
    /// whose members follow first-seen order. An empty slice yields `mixed`.
    pub fn infer_from_array(values: &[Value]) -> Result<Type> {
        let mut inferred: Option<Type> = None;
        for value in values {
            let ty = Self::infer(value)?;
            match inferred.as_mut() {
                Some(current) => current.add_type(ty),
                None => inferred = Some(ty),
            }
        }

        let ty = inferred.unwrap_or_else(|| ScalarType::Mixed.into());
        debug!("Inferred {} from {} values", ty, values.len());
        Ok(ty)
    }

    /// Type of an annotation string such as `?int` or `array<string, User>`
    pub fn infer_from_annotation(annotation: &str) -> Result<Type> {
        Type::parse(annotation)
    }

    /// Type of `variable` according to a docblock: its `@param` tag, or the `@var`
    /// tag when the block documents a property. `Ok(None)` when the block is silent.
    pub fn infer_from_docblock(docblock: &str, variable: &str) -> Result<Option<Type>> {
        let doc = DocBlock::parse(docblock);
        match doc.param_type(variable)? {
            Some(ty) => Ok(Some(ty)),
            None => doc.var_type(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn value(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_infer_scalar_names() {
        assert_eq!(TypeInference::infer_type(&value(json!(123))).unwrap(), "integer");
        assert_eq!(TypeInference::infer_type(&value(json!(123.0))).unwrap(), "float");
        assert_eq!(TypeInference::infer_type(&value(json!(true))).unwrap(), "boolean");
        assert_eq!(TypeInference::infer_type(&value(json!("x"))).unwrap(), "string");
        assert_eq!(TypeInference::infer_type(&value(json!(null))).unwrap(), "null");
    }

    #[test]
    fn test_infer_collections() {
        assert_eq!(TypeInference::infer_type(&value(json!([1, 2]))).unwrap(), "array");
        assert_eq!(
            TypeInference::infer_type(&value(json!({"a": 1}))).unwrap(),
            "object"
        );
    }

    #[test]
    fn test_infer_list_of_integers_schema() {
        let ty = TypeInference::infer(&value(json!([1, 2, 3]))).unwrap();
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"type": "array", "items": {"type": "integer"}})
        );
    }

    #[test]
    fn test_infer_instance_uses_class_name() {
        let instance = Value::Instance("App\\Models\\User".to_string());
        assert_eq!(
            TypeInference::infer_type(&instance).unwrap(),
            "App\\Models\\User"
        );
    }

    #[test]
    fn test_infer_handle_is_unsupported() {
        let handle = Value::Handle("stream".to_string());
        assert!(matches!(
            TypeInference::infer(&handle),
            Err(Error::UnsupportedType(_))
        ));

        let nested = Value::List(vec![Value::Integer(1), handle]);
        assert!(matches!(
            TypeInference::infer(&nested),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_infer_from_array_first_seen_order() {
        let values = vec![
            Value::String("a".into()),
            Value::Integer(1),
            Value::String("b".into()),
            Value::Float(1.5),
        ];
        let ty = TypeInference::infer_from_array(&values).unwrap();
        assert!(ty.is_union());
        assert_eq!(ty.name(), "string|integer|float");
    }

    #[test]
    fn test_unsigned_integers_above_i64_are_integers() {
        let id = value(json!(18446744073709551615u64));
        assert_eq!(id, Value::Integer(i128::from(u64::MAX)));
        assert_eq!(TypeInference::infer_type(&id).unwrap(), "integer");

        let ids = value(json!([1, 18446744073709551615u64]));
        assert_eq!(
            TypeInference::infer(&ids).unwrap().to_openapi_schema(),
            json!({"type": "array", "items": {"type": "integer"}})
        );
    }

    #[test]
    fn test_integers_and_floats_stay_distinct() {
        let ty = TypeInference::infer_from_array(&[Value::Integer(1), Value::Float(2.0)]).unwrap();
        assert_eq!(
            ty.to_openapi_schema(),
            json!({"oneOf": [{"type": "integer"}, {"type": "number", "format": "float"}]})
        );
    }

    #[test]
    fn test_infer_from_homogeneous_array() {
        let ty = TypeInference::infer_from_array(&[Value::Bool(true), Value::Bool(false)]).unwrap();
        assert_eq!(ty.name(), "boolean");
    }

    #[test]
    fn test_infer_from_empty_array() {
        let ty = TypeInference::infer_from_array(&[]).unwrap();
        assert_eq!(ty.name(), "mixed");
    }

    #[test]
    fn test_infer_from_docblock() {
        let doc = r#"
            /**
             * Update a user.
             *
             * @param int|string $id The user identifier
             * @param array<string, mixed> $attributes
             */
        "#;
        let id = TypeInference::infer_from_docblock(doc, "id").unwrap().unwrap();
        assert_eq!(id.name(), "integer|string");

        let attributes = TypeInference::infer_from_docblock(doc, "$attributes")
            .unwrap()
            .unwrap();
        assert_eq!(attributes.to_openapi_schema()["type"], "object");

        assert!(TypeInference::infer_from_docblock(doc, "missing")
            .unwrap()
            .is_none());
    }
}

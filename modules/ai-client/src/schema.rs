use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Keywords the generative-content `responseSchema` (an OpenAPI subset) rejects.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$schema",
    "definitions",
    "title",
    "additionalProperties",
    "format",
    "minimum",
    "maximum",
    "default",
];

/// Trait for types that can be requested as schema-constrained JSON output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a Gemini-compatible response schema for this type.
    ///
    /// Gemini requires:
    /// 1. Fully inlined schemas (no `$ref` references)
    /// 2. Upper-case type names and `nullable` instead of `["T", "null"]` unions
    /// 3. No JSON-Schema-only keywords such as `additionalProperties`
    fn gemini_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        to_gemini_schema(&mut value);
        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Rewrite a JSON Schema document in place into the Gemini schema dialect.
pub fn to_gemini_schema(value: &mut Value) {
    inline_refs(value);
    normalize(value);
}

fn normalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in UNSUPPORTED_KEYWORDS {
                map.remove(*key);
            }

            let mut nullable = false;
            let ty = match map.get("type") {
                Some(Value::String(t)) => Some(t.clone()),
                Some(Value::Array(types)) => {
                    nullable = types.iter().any(|t| t == "null");
                    types
                        .iter()
                        .filter_map(Value::as_str)
                        .find(|t| *t != "null")
                        .map(str::to_string)
                }
                _ => None,
            };
            if let Some(ty) = ty {
                map.insert("type".to_string(), Value::String(ty.to_uppercase()));
                if nullable {
                    map.insert("nullable".to_string(), Value::Bool(true));
                }
                if ty == "object" {
                    if let Some(Value::Object(props)) = map.get("properties") {
                        let all_keys: Vec<Value> =
                            props.keys().map(|k| Value::String(k.clone())).collect();
                        map.insert("required".to_string(), Value::Array(all_keys));
                    }
                }
            }

            if let Some(Value::Object(props)) = map.get_mut("properties") {
                for (_, prop) in props.iter_mut() {
                    normalize(prop);
                }
            }
            if let Some(items) = map.get_mut("items") {
                normalize(items);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                normalize(item);
            }
        }
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = if let Value::Object(map) = value {
        map.get("definitions").cloned()
    } else {
        None
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(type_name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    if let Some(only) = all_of.into_iter().next() {
                        *value = only;
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

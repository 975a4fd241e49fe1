use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keys Gemini's `responseSchema` (an OpenAPI 3.0 subset) understands.
const GEMINI_SCHEMA_KEYS: &[&str] = &[
    "type",
    "description",
    "nullable",
    "enum",
    "properties",
    "required",
    "items",
    "minItems",
    "maxItems",
    "minimum",
    "maximum",
];

/// Trait for types that can be requested as structured model output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// JSON schema with every `$ref` inlined and the draft metadata removed.
    ///
    /// Suitable as a Claude tool `input_schema`.
    fn tool_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        inline_refs(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    /// Schema rewritten into the OpenAPI subset Gemini accepts.
    ///
    /// Gemini rejects `type` arrays, so `["string", "null"]` becomes
    /// `type: string, nullable: true`. Unknown keys such as `format`,
    /// `title` and `default` are dropped.
    fn gemini_schema() -> Value {
        let mut value = Self::tool_schema();
        to_gemini_schema(&mut value);
        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn to_gemini_schema(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    if let Some(Value::Array(types)) = map.get("type").cloned() {
        let non_null: Vec<Value> = types
            .into_iter()
            .filter(|t| t.as_str() != Some("null"))
            .collect();
        let nullable = non_null.len() == 1;
        if let Some(first) = non_null.into_iter().next() {
            map.insert("type".to_string(), first);
        }
        if nullable {
            map.insert("nullable".to_string(), Value::Bool(true));
        }
    }

    let mut cleaned = Map::new();
    for (key, mut child) in std::mem::take(map) {
        if !GEMINI_SCHEMA_KEYS.contains(&key.as_str()) {
            continue;
        }
        match key.as_str() {
            "properties" => {
                if let Value::Object(props) = &mut child {
                    for prop in props.values_mut() {
                        to_gemini_schema(prop);
                    }
                }
            }
            "items" => to_gemini_schema(&mut child),
            _ => {}
        }
        cleaned.insert(key, child);
    }
    *map = cleaned;
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

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Contact {
        name: String,
        phone: Option<String>,
        score: f64,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Batch {
        contacts: Vec<Contact>,
    }

    #[test]
    fn nested_struct_is_inlined() {
        let schema = Batch::tool_schema();
        let obj = schema.as_object().unwrap();

        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let items = &obj["properties"]["contacts"]["items"];
        assert!(items.get("$ref").is_none());
        assert_eq!(items["type"], "object");
    }

    #[test]
    fn gemini_schema_flattens_nullable_types() {
        let schema = Contact::gemini_schema();
        let phone = &schema["properties"]["phone"];

        assert_eq!(phone["type"], "string");
        assert_eq!(phone["nullable"], true);
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert!(schema["properties"]["name"].get("nullable").is_none());
    }

    #[test]
    fn gemini_schema_drops_unsupported_keys() {
        let schema = Batch::gemini_schema();
        let text = serde_json::to_string(&schema).unwrap();

        assert!(!text.contains("\"title\""));
        assert!(!text.contains("\"format\""));
        assert!(!text.contains("additionalProperties"));
        assert_eq!(schema["properties"]["contacts"]["type"], "array");
    }
}

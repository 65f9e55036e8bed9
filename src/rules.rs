//! Validation rules to schema conversion.
//!
//! Rules arrive as pipe-delimited strings per field (`"required|string|max:100"`).
//! Field names may address nested data: `address.city` is a property of the object
//! `address`, `tags.*` is the item schema of the array `tags`.

use indexmap::IndexMap;
use log::debug;
use serde_json::{json, Map, Value};

/// Parsed rules of a single field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRules {
    pub required: bool,
    pub nullable: bool,
    pub schema: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }

    fn bound_keys(&self) -> (&'static str, &'static str) {
        match self {
            Kind::Integer | Kind::Number => ("minimum", "maximum"),
            Kind::Array => ("minItems", "maxItems"),
            Kind::Object => ("minProperties", "maxProperties"),
            Kind::String | Kind::Boolean => ("minLength", "maxLength"),
        }
    }
}

impl FieldRules {
    /// Parse a rule string. Unknown rules are ignored.
    pub fn parse(rules: &str) -> FieldRules {
        let mut required = false;
        let mut nullable = false;
        let mut kind: Option<Kind> = None;
        let mut format: Option<&str> = None;
        let mut bounds: Vec<(&str, &str)> = Vec::new();
        let mut choices: Option<Vec<&str>> = None;
        let mut pattern: Option<&str> = None;

        for rule in rules.split('|').map(str::trim).filter(|r| !r.is_empty()) {
            let (name, args) = rule.split_once(':').unwrap_or((rule, ""));
            match name {
                "required" => required = true,
                "nullable" => nullable = true,
                "string" | "alpha" | "alpha_num" | "alpha_dash" => kind = Some(Kind::String),
                "integer" | "int" => kind = Some(Kind::Integer),
                "numeric" | "decimal" => kind = Some(Kind::Number),
                "boolean" | "bool" | "accepted" | "declined" => kind = Some(Kind::Boolean),
                "array" | "list" => kind = Some(Kind::Array),
                "json" => kind = Some(Kind::Object),
                "email" => format = Some("email"),
                "url" | "active_url" => format = Some("uri"),
                "uuid" => format = Some("uuid"),
                "ulid" => format = Some("ulid"),
                "ip" | "ipv4" => format = Some("ipv4"),
                "ipv6" => format = Some("ipv6"),
                "date" => format = Some("date"),
                "date_format" => format = Some("date-time"),
                "file" | "image" | "mimes" => format = Some("binary"),
                "password" => format = Some("password"),
                "min" | "max" => bounds.push((name, args)),
                "size" => {
                    bounds.push(("min", args));
                    bounds.push(("max", args));
                }
                "between" => {
                    if let Some((low, high)) = args.split_once(',') {
                        bounds.push(("min", low));
                        bounds.push(("max", high));
                    }
                }
                "in" => choices = Some(args.split(',').map(str::trim).collect()),
                "regex" => pattern = Some(args),
                other => debug!("Ignoring validation rule `{}`", other),
            }
        }

        let kind = kind.unwrap_or(Kind::String);
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(kind.as_str()));
        if let Some(format) = format {
            schema.insert("format".to_string(), json!(format));
        }

        let (min_key, max_key) = kind.bound_keys();
        for (bound, arg) in bounds {
            if let Some(number) = parse_number(arg) {
                let key = if bound == "min" { min_key } else { max_key };
                schema.insert(key.to_string(), number);
            }
        }

        if let Some(choices) = choices {
            let values: Vec<Value> = choices
                .into_iter()
                .map(|choice| match kind {
                    Kind::Integer | Kind::Number => {
                        parse_number(choice).unwrap_or_else(|| json!(choice))
                    }
                    _ => json!(choice.trim_matches('"')),
                })
                .collect();
            schema.insert("enum".to_string(), Value::Array(values));
        }

        if let Some(pattern) = pattern {
            let trimmed = pattern.trim();
            let pattern = trimmed
                .strip_prefix('/')
                .and_then(|p| p.rfind('/').map(|end| &p[..end]))
                .unwrap_or(trimmed);
            schema.insert("pattern".to_string(), json!(pattern));
        }

        if nullable {
            schema.insert("nullable".to_string(), Value::Bool(true));
        }

        FieldRules {
            required,
            nullable,
            schema,
        }
    }
}

/// Object schema for a rule set. `required` lists the fields carrying the
/// `required` rule, at the level they belong to.
pub fn rules_to_schema(rules: &IndexMap<String, String>) -> Value {
    let mut root = Map::new();
    root.insert("type".to_string(), json!("object"));
    root.insert("properties".to_string(), json!({}));

    for (field, rule_string) in rules {
        let parsed = FieldRules::parse(rule_string);
        let segments: Vec<&str> = field.split('.').collect();
        insert_field(&mut root, &segments, &parsed);
    }

    Value::Object(root)
}

fn insert_field(node: &mut Map<String, Value>, segments: &[&str], rules: &FieldRules) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if *head == "*" {
        node.entry("type").or_insert_with(|| json!("array"));
        let items = ensure_object(node.entry("items").or_insert_with(|| json!({})));
        if rest.is_empty() {
            merge_rules(items, rules);
        } else {
            items.entry("type").or_insert_with(|| json!("object"));
            insert_field(items, rest, rules);
        }
        return;
    }

    node.entry("type").or_insert_with(|| json!("object"));
    let properties = ensure_object(node.entry("properties").or_insert_with(|| json!({})));
    let child = ensure_object(
        properties
            .entry(head.to_string())
            .or_insert_with(|| json!({})),
    );

    if rest.is_empty() {
        merge_rules(child, rules);
        if rules.required {
            mark_required(node, head);
        }
    } else {
        insert_field(child, rest, rules);
    }
}

/// Rule keys win over whatever an earlier nested rule created, except the
/// structure (`items`, `properties`, `required`) built by child fields.
fn merge_rules(target: &mut Map<String, Value>, rules: &FieldRules) {
    for (key, value) in &rules.schema {
        if matches!(key.as_str(), "items" | "properties" | "required") && target.contains_key(key) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
    if target.get("type") == Some(&json!("array")) && !target.contains_key("items") {
        target.insert("items".to_string(), json!({}));
    }
}

fn mark_required(node: &mut Map<String, Value>, field: &str) {
    let required = node
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(names) = required {
        if !names.iter().any(|name| name == field) {
            names.push(json!(field));
        }
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

fn parse_number(arg: &str) -> Option<Value> {
    let arg = arg.trim();
    if let Ok(int) = arg.parse::<i64>() {
        return Some(json!(int));
    }
    arg.parse::<f64>().ok().map(|float| json!(float))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rules(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(field, rule)| (field.to_string(), rule.to_string()))
            .collect()
    }

    #[test]
    fn test_string_with_length() {
        let parsed = FieldRules::parse("required|string|max:100");
        assert!(parsed.required);
        assert_eq!(
            Value::Object(parsed.schema),
            json!({"type": "string", "maxLength": 100})
        );
    }

    #[test]
    fn test_numeric_bounds() {
        let parsed = FieldRules::parse("integer|between:1,10");
        assert_eq!(
            Value::Object(parsed.schema),
            json!({"type": "integer", "minimum": 1, "maximum": 10})
        );
    }

    #[test]
    fn test_formats_and_nullable() {
        let parsed = FieldRules::parse("nullable|email");
        assert!(parsed.nullable);
        assert!(!parsed.required);
        assert_eq!(
            Value::Object(parsed.schema),
            json!({"type": "string", "format": "email", "nullable": true})
        );
    }

    #[test]
    fn test_in_rule_produces_enum() {
        let parsed = FieldRules::parse("in:draft,published");
        assert_eq!(parsed.schema["enum"], json!(["draft", "published"]));

        let parsed = FieldRules::parse("integer|in:1,2,3");
        assert_eq!(parsed.schema["enum"], json!([1, 2, 3]));
    }

    #[test]
    fn test_regex_delimiters_are_stripped() {
        let parsed = FieldRules::parse("regex:/^[a-z]+$/i");
        assert_eq!(parsed.schema["pattern"], "^[a-z]+$");
    }

    #[test]
    fn test_rules_to_schema_flat() {
        let schema = rules_to_schema(&rules(&[
            ("email", "required|email"),
            ("name", "string|max:50"),
        ]));
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "email": {"type": "string", "format": "email"},
                    "name": {"type": "string", "maxLength": 50}
                },
                "required": ["email"]
            })
        );
    }

    #[test]
    fn test_rules_to_schema_nested() {
        let schema = rules_to_schema(&rules(&[
            ("tags.*", "string"),
            ("tags", "required|array|max:5"),
            ("address.city", "required|string"),
        ]));

        assert_eq!(
            schema["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}, "maxItems": 5})
        );
        assert_eq!(
            schema["properties"]["address"]["properties"]["city"],
            json!({"type": "string"})
        );
        assert_eq!(schema["properties"]["address"]["required"], json!(["city"]));
        assert_eq!(schema["required"], json!(["tags"]));
    }

    #[test]
    fn test_array_without_item_rules_gets_empty_items() {
        let schema = rules_to_schema(&rules(&[("ids", "array")]));
        assert_eq!(schema["properties"]["ids"], json!({"type": "array", "items": {}}));
    }
}

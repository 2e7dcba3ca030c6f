//! Resource schemas
//!
//! Declarative description of each resource's attributes. Besides being
//! reported to the configuration engine, a schema validates configuration
//! and decides which attribute changes force replacement.

use serde::Serialize;

use crate::error::Diagnostic;
use crate::state::DynamicValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List { element: Box<AttributeType> },
    Set { element: Box<AttributeType> },
    Map { element: Box<AttributeType> },
    /// Repeated nested block stored as a list of maps
    Block { block: Block, max_items: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    #[serde(flatten)]
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    /// Replace when a configured value is removed, but update in place otherwise
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force_new_on_removal: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// Inclusive bounds for whole-number attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(i64, i64)>,
}

impl Attribute {
    fn new(name: &str, attr_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            force_new_on_removal: false,
            allowed_values: Vec::new(),
            range: None,
        }
    }

    pub fn required(name: &str, attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(name, attr_type)
        }
    }

    pub fn optional(name: &str, attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, attr_type)
        }
    }

    pub fn computed(name: &str, attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, attr_type)
        }
    }

    /// Optional in configuration, filled in by the API when omitted
    pub fn optional_computed(name: &str, attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::new(name, attr_type)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn force_new_on_removal(mut self) -> Self {
        self.force_new_on_removal = true;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn between(mut self, min: i64, max: i64) -> Self {
        self.range = Some((min, max));
        self
    }
}

pub fn string_list() -> AttributeType {
    AttributeType::List {
        element: Box::new(AttributeType::String),
    }
}

pub fn string_set() -> AttributeType {
    AttributeType::Set {
        element: Box::new(AttributeType::String),
    }
}

pub fn string_map() -> AttributeType {
    AttributeType::Map {
        element: Box::new(AttributeType::String),
    }
}

pub fn blocks(attributes: Vec<Attribute>) -> AttributeType {
    AttributeType::Block {
        block: Block { attributes },
        max_items: None,
    }
}

pub fn single_block(attributes: Vec<Attribute>) -> AttributeType {
    AttributeType::Block {
        block: Block { attributes },
        max_items: Some(1),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    pub attributes: Vec<Attribute>,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    fn validate(&self, path: &str, value: &DynamicValue, diags: &mut Vec<Diagnostic>) {
        for attr in &self.attributes {
            let attr_path = if path.is_empty() {
                attr.name.clone()
            } else {
                format!("{}.{}", path, attr.name)
            };
            let v = value.attr(&attr.name);

            if v.is_null() {
                if attr.required {
                    diags.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required.", attr_path),
                        )
                        .with_attribute(attr_path),
                    );
                }
                continue;
            }

            validate_value(attr, &attr.attr_type, &attr_path, v, diags);
        }
    }
}

fn validate_value(
    attr: &Attribute,
    attr_type: &AttributeType,
    path: &str,
    value: &DynamicValue,
    diags: &mut Vec<Diagnostic>,
) {
    let type_error = |expected: &str| {
        Diagnostic::error(
            "Incorrect attribute value type",
            format!("Inappropriate value for \"{}\": {} required.", path, expected),
        )
        .with_attribute(path)
    };

    match (attr_type, value) {
        (AttributeType::String, DynamicValue::String(s)) => {
            if !attr.allowed_values.is_empty() && !attr.allowed_values.contains(s) {
                diags.push(
                    Diagnostic::error(
                        "Invalid attribute value",
                        format!(
                            "expected {} to be one of [{}], got {}",
                            path,
                            attr.allowed_values.join(", "),
                            s
                        ),
                    )
                    .with_attribute(path),
                );
            }
        }
        (AttributeType::Number, DynamicValue::Number(n)) => {
            if let Some((min, max)) = attr.range {
                if !n.as_i64().is_some_and(|v| (min..=max).contains(&v)) {
                    diags.push(
                        Diagnostic::error(
                            "Invalid attribute value",
                            format!(
                                "expected {} to be in the range ({} - {}), got {}",
                                path, min, max, n
                            ),
                        )
                        .with_attribute(path),
                    );
                }
            }
        }
        (AttributeType::Bool, DynamicValue::Bool(_)) => {}
        (AttributeType::List { element }, DynamicValue::List(items))
        | (AttributeType::Set { element }, DynamicValue::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_value(attr, element, &format!("{}.{}", path, i), item, diags);
            }
        }
        (AttributeType::Map { element }, DynamicValue::Map(entries)) => {
            for (key, item) in entries {
                validate_value(attr, element, &format!("{}.{}", path, key), item, diags);
            }
        }
        (AttributeType::Block { block, max_items }, DynamicValue::List(items)) => {
            if let Some(max) = max_items {
                if items.len() > *max {
                    diags.push(
                        Diagnostic::error(
                            "Too many blocks",
                            format!("No more than {} \"{}\" blocks are allowed.", max, path),
                        )
                        .with_attribute(path),
                    );
                }
            }
            for (i, item) in items.iter().enumerate() {
                block.validate(&format!("{}.{}", path, i), item, diags);
            }
        }
        (AttributeType::String, _) => diags.push(type_error("string")),
        (AttributeType::Number, _) => diags.push(type_error("number")),
        (AttributeType::Bool, _) => diags.push(type_error("bool")),
        (AttributeType::List { .. }, _) | (AttributeType::Set { .. }, _) => {
            diags.push(type_error("list"))
        }
        (AttributeType::Map { .. }, _) => diags.push(type_error("map")),
        (AttributeType::Block { .. }, _) => diags.push(type_error("block")),
    }
}

/// Per-operation timeouts, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeoutDefaults {
    pub create: u64,
    pub update: u64,
    pub delete: u64,
}

impl Default for TimeoutDefaults {
    fn default() -> Self {
        Self {
            create: 20 * 60,
            update: 20 * 60,
            delete: 20 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutDefaults>,
}

impl Schema {
    pub fn v0(attributes: Vec<Attribute>) -> Self {
        Self {
            version: 0,
            block: Block { attributes },
            timeouts: None,
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutDefaults) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        if config.as_map().is_none() {
            diags.push(Diagnostic::error(
                "Invalid configuration",
                "Resource configuration must be an object.",
            ));
            return diags;
        }
        self.block.validate("", config, &mut diags);
        diags
    }

    /// Force-new attributes whose planned value differs from the prior one,
    /// plus removal-sensitive attributes that are being cleared
    pub fn requires_replace(&self, prior: &DynamicValue, planned: &DynamicValue) -> Vec<String> {
        if prior.is_null() || planned.is_null() {
            return Vec::new();
        }
        self.block
            .attributes
            .iter()
            .filter(|a| {
                let (old, new) = (prior.attr(&a.name), planned.attr(&a.name));
                if a.force_new {
                    // An unknown computed value is not a change.
                    !(a.computed && new.is_null()) && old.as_set() != new.as_set()
                } else {
                    a.force_new_on_removal && !is_empty(old) && is_empty(new)
                }
            })
            .map(|a| a.name.clone())
            .collect()
    }
}

fn is_empty(value: &DynamicValue) -> bool {
    value.is_null() || value.as_list().is_some_and(|l| l.is_empty())
}

/// Schema of the provider block itself
pub fn provider_schema() -> Schema {
    Schema::v0(vec![
        Attribute::optional("endpoint", AttributeType::String),
        Attribute::optional("region", AttributeType::String),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{int_value, list_value, make_state, string_value};

    fn schema() -> Schema {
        Schema::v0(vec![
            Attribute::required("name", AttributeType::String).force_new(),
            Attribute::optional("size", AttributeType::Number).between(1, 64),
            Attribute::computed("arn", AttributeType::String),
            Attribute::optional("placement", string_list()).force_new_on_removal(),
            Attribute::optional(
                "parameter",
                blocks(vec![Attribute::required("key", AttributeType::String)
                    .one_of(&["auto_mv", "datestyle"])]),
            ),
        ])
    }

    #[test]
    fn test_missing_required() {
        let diags = schema().validate(&make_state(vec![("size", int_value(3))]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("name"));
    }

    #[test]
    fn test_type_mismatch_and_allowed_values() {
        let config = make_state(vec![
            ("name", string_value("a")),
            ("size", string_value("big")),
            (
                "parameter",
                list_value(vec![make_state(vec![("key", string_value("bogus"))])]),
            ),
        ]);
        let diags = schema().validate(&config);
        let attrs: Vec<_> = diags.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["size", "parameter.0.key"]);
    }

    #[test]
    fn test_requires_replace() {
        let prior = make_state(vec![("name", string_value("a")), ("size", int_value(1))]);
        let planned = make_state(vec![("name", string_value("b")), ("size", int_value(2))]);
        assert_eq!(schema().requires_replace(&prior, &planned), vec!["name"]);
        assert!(schema()
            .requires_replace(&DynamicValue::Null, &planned)
            .is_empty());
    }

    #[test]
    fn test_number_range() {
        let config = |size: DynamicValue| make_state(vec![("name", string_value("a")), ("size", size)]);

        assert!(schema().validate(&config(int_value(64))).is_empty());
        for size in [
            int_value(0),
            int_value(i64::from(i32::MAX) + 1),
            DynamicValue::Number(serde_json::Number::from_f64(2.5).unwrap()),
        ] {
            let diags = schema().validate(&config(size));
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].attribute.as_deref(), Some("size"));
            assert!(diags[0].detail.contains("in the range (1 - 64)"));
        }
    }

    #[test]
    fn test_removal_requires_replace() {
        let with = |placement: DynamicValue| {
            make_state(vec![("name", string_value("a")), ("placement", placement)])
        };
        let zones = |z: &[&str]| list_value(z.iter().map(|v| string_value(*v)).collect());

        // Changing the value is an in-place update
        assert!(schema()
            .requires_replace(&with(zones(&["a"])), &with(zones(&["b"])))
            .is_empty());
        assert!(schema()
            .requires_replace(&with(DynamicValue::Null), &with(zones(&["a"])))
            .is_empty());

        assert_eq!(
            schema().requires_replace(&with(zones(&["a"])), &with(DynamicValue::Null)),
            vec!["placement"]
        );
        assert_eq!(
            schema().requires_replace(&with(zones(&["a"])), &with(zones(&[]))),
            vec!["placement"]
        );
    }
}

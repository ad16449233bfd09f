//! PROV-JSON document model
//!
//! A document is a JSON object with the groups `prefix`, `entity`,
//! `activity`, `agent` and one group per relation type. Node groups are keyed
//! by node name; relation groups are keyed by an arbitrary relation id and
//! name their endpoints through the type's fixed PROV field names.

use serde_json::{Map, Value};
use tracing::warn;

use crate::core::relation::RelationType;
use crate::core::{ObjectType, PropertyValue};
use crate::error::{Error, Result};

/// One `key: value` annotation. Keys stay qualified (`prov:type`, `ex:size`).
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub value: PropertyValue,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Attribute { key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub object_type: ObjectType,
    pub name: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRelation {
    pub relation_type: RelationType,
    /// Entry key inside the relation group
    pub key: String,
    /// Node name in the type's source field
    pub source: String,
    /// Node name in the type's destination field
    pub destination: String,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvDocument {
    /// `(prefix, iri)` pairs
    pub prefixes: Vec<(String, String)>,
    pub nodes: Vec<DocumentNode>,
    pub relations: Vec<DocumentRelation>,
}

fn malformed(group: &str, key: &str, reason: impl Into<String>) -> Error {
    Error::MalformedDocument { group: group.to_string(), key: key.to_string(), reason: reason.into() }
}

/// Flatten a JSON attribute value. Arrays repeat the key, `null` drops it,
/// typed values (`{"$": .., "type": ..}`) keep their lexical form.
fn attribute_values(value: &Value, out: &mut Vec<PropertyValue>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push(PropertyValue::Boolean(*b)),
        Value::Number(n) => match n.as_f64() {
            Some(f) => out.push(PropertyValue::Number(f)),
            None => out.push(PropertyValue::String(n.to_string())),
        },
        Value::String(s) => out.push(PropertyValue::String(s.clone())),
        Value::Array(items) => items.iter().for_each(|item| attribute_values(item, out)),
        Value::Object(fields) => match fields.get("$") {
            Some(Value::String(s)) => out.push(PropertyValue::String(s.clone())),
            Some(other) => out.push(PropertyValue::String(other.to_string())),
            None => out.push(PropertyValue::String(value.to_string())),
        },
    }
}

fn attributes_of<'a>(fields: impl Iterator<Item = (&'a String, &'a Value)>) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    for (key, value) in fields {
        let mut values = Vec::new();
        attribute_values(value, &mut values);
        attributes.extend(values.into_iter().map(|v| Attribute { key: key.clone(), value: v }));
    }
    attributes
}

/// Group attributes by key; repeated keys become arrays
fn attributes_to_json(attributes: &[Attribute], into: &mut Map<String, Value>) {
    for attribute in attributes {
        let value = attribute.value.to_json();
        match into.get_mut(&attribute.key) {
            None => {
                into.insert(attribute.key.clone(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
}

fn group_object<'a>(group: &str, body: &'a Value) -> Result<&'a Map<String, Value>> {
    body.as_object().ok_or_else(|| malformed(group, "", "group is not a JSON object"))
}

impl ProvDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Parse, failing on the first problem
    pub fn from_value(value: &Value) -> Result<Self> {
        let (document, mut problems) = Self::from_value_lenient(value);
        if problems.is_empty() {
            Ok(document)
        } else {
            Err(problems.swap_remove(0))
        }
    }

    /// Parse everything that is well formed and return every problem found
    pub fn from_value_lenient(value: &Value) -> (Self, Vec<Error>) {
        let mut document = ProvDocument::default();
        let mut problems = Vec::new();
        let Some(groups) = value.as_object() else {
            problems.push(malformed("document", "", "document is not a JSON object"));
            return (document, problems);
        };

        for (group, body) in groups {
            match group.as_str() {
                "prefix" => match group_object(group, body) {
                    Ok(entries) => {
                        for (prefix, iri) in entries {
                            match iri.as_str() {
                                Some(iri) => document.prefixes.push((prefix.clone(), iri.to_string())),
                                None => problems.push(malformed(group, prefix, "prefix IRI is not a string")),
                            }
                        }
                    }
                    Err(e) => problems.push(e),
                },
                "entity" | "activity" | "agent" => {
                    let object_type = match group.as_str() {
                        "entity" => ObjectType::Entity,
                        "activity" => ObjectType::Activity,
                        _ => ObjectType::Agent,
                    };
                    match group_object(group, body) {
                        Ok(entries) => {
                            for (name, fields) in entries {
                                let attributes = match fields {
                                    Value::Object(fields) => attributes_of(fields.iter()),
                                    Value::Null => Vec::new(),
                                    _ => {
                                        problems.push(malformed(group, name, "node body is not a JSON object"));
                                        continue;
                                    }
                                };
                                document.nodes.push(DocumentNode { object_type, name: name.clone(), attributes });
                            }
                        }
                        Err(e) => problems.push(e),
                    }
                }
                other => match RelationType::from_json_group(other) {
                    Some(relation_type) => match group_object(group, body) {
                        Ok(entries) => {
                            for (key, entry) in entries {
                                match Self::relation_entry(relation_type, key, entry) {
                                    Ok(relation) => document.relations.push(relation),
                                    Err(e) => problems.push(e),
                                }
                            }
                        }
                        Err(e) => problems.push(e),
                    },
                    None => warn!("Ignoring unsupported document group `{}`", other),
                },
            }
        }
        (document, problems)
    }

    fn relation_entry(relation_type: RelationType, key: &str, entry: &Value) -> Result<DocumentRelation> {
        let group = relation_type.json_group();
        let spec = relation_type.spec();
        let fields = entry.as_object().ok_or_else(|| malformed(group, key, "relation body is not a JSON object"))?;
        let endpoint = |field: &str| -> Result<String> {
            match fields.get(field) {
                Some(Value::String(name)) => Ok(name.clone()),
                Some(_) => Err(malformed(group, key, format!("`{}` is not a string", field))),
                None => Err(malformed(group, key, format!("missing required field `{}`", field))),
            }
        };
        let source = endpoint(spec.source_field)?;
        let destination = endpoint(spec.destination_field)?;
        let attributes = attributes_of(
            fields.iter().filter(|(k, _)| k.as_str() != spec.source_field && k.as_str() != spec.destination_field),
        );
        Ok(DocumentRelation { relation_type, key: key.to_string(), source, destination, attributes })
    }

    /// Render as PROV-JSON. Empty groups are omitted.
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();

        if !self.prefixes.is_empty() {
            let prefixes: Map<String, Value> =
                self.prefixes.iter().map(|(p, iri)| (p.clone(), Value::String(iri.clone()))).collect();
            root.insert("prefix".to_string(), Value::Object(prefixes));
        }

        for object_type in [ObjectType::Entity, ObjectType::Activity, ObjectType::Agent] {
            let mut group = Map::new();
            for node in self.nodes.iter().filter(|n| n.object_type == object_type) {
                let mut fields = Map::new();
                attributes_to_json(&node.attributes, &mut fields);
                group.insert(node.name.clone(), Value::Object(fields));
            }
            if !group.is_empty() {
                root.insert(object_type.as_str().to_string(), Value::Object(group));
            }
        }

        for relation_type in RelationType::ALL {
            let spec = relation_type.spec();
            let mut group = Map::new();
            for relation in self.relations.iter().filter(|r| r.relation_type == relation_type) {
                let mut fields = Map::new();
                fields.insert(spec.source_field.to_string(), Value::String(relation.source.clone()));
                fields.insert(spec.destination_field.to_string(), Value::String(relation.destination.clone()));
                attributes_to_json(&relation.attributes, &mut fields);
                group.insert(relation.key.clone(), Value::Object(fields));
            }
            if !group.is_empty() {
                root.insert(spec.json_group.to_string(), Value::Object(group));
            }
        }

        Value::Object(root)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// `(source, destination)` node names of every relation
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relations.iter().map(|r| (r.source.as_str(), r.destination.as_str()))
    }

    pub fn node(&self, name: &str) -> Option<&DocumentNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_groups_and_attributes() {
        let doc = ProvDocument::from_value(&json!({
            "prefix": {"ex": "http://example.org/"},
            "entity": {"ex:doc": {"prov:type": ["ex:File", "ex:Text"], "ex:size": 10, "ex:none": null}},
            "activity": {"ex:convert": {}},
            "wasGeneratedBy": {"_:g1": {"prov:entity": "ex:doc", "prov:activity": "ex:convert", "ex:note": {"$": "fast", "type": "xsd:string"}}},
            "bundle": {}
        }))
        .unwrap();

        assert_eq!(doc.prefixes, vec![("ex".to_string(), "http://example.org/".to_string())]);
        let entity = doc.node("ex:doc").unwrap();
        assert_eq!(entity.attributes.len(), 3);
        assert_eq!(doc.relations.len(), 1);
        let rel = &doc.relations[0];
        assert_eq!((rel.source.as_str(), rel.destination.as_str()), ("ex:doc", "ex:convert"));
        assert_eq!(rel.attributes, vec![Attribute::new("ex:note", "fast")]);
    }

    #[test]
    fn test_missing_endpoint_is_malformed() {
        let err = ProvDocument::from_value(&json!({"used": {"u1": {"prov:activity": "a"}}})).unwrap_err();
        match err {
            Error::MalformedDocument { group, key, reason } => {
                assert_eq!(group, "used");
                assert_eq!(key, "u1");
                assert!(reason.contains("prov:entity"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_lenient_parse_collects_every_problem() {
        let (_, problems) = ProvDocument::from_value_lenient(&json!({
            "used": {"u1": {"prov:activity": "a"}},
            "wasDerivedFrom": {"d1": {"prov:usedEntity": "b"}},
            "entity": []
        }));
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn test_empty_groups_omitted_on_render() {
        let doc = ProvDocument {
            prefixes: Vec::new(),
            nodes: vec![DocumentNode {
                object_type: ObjectType::Agent,
                name: "alice".to_string(),
                attributes: vec![Attribute::new("prov:type", "prov:Person"), Attribute::new("prov:type", "ex:Admin")],
            }],
            relations: Vec::new(),
        };
        let value = doc.to_value();
        assert_eq!(value, json!({"agent": {"alice": {"prov:type": ["prov:Person", "ex:Admin"]}}}));
    }

    #[test]
    fn test_edges_follow_field_order() {
        let doc = ProvDocument::from_value(&json!({
            "wasDerivedFrom": {"d": {"prov:generatedEntity": "B", "prov:usedEntity": "A"}}
        }))
        .unwrap();
        assert_eq!(doc.edges().collect::<Vec<_>>(), vec![("B", "A")]);
    }
}

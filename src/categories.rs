//! The named subsets of an architecture document that are measured
//! independently, and the shape checks each one needs before encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::codec::Codec;
use crate::error::{MetricsError, Result};
use crate::savings::{self, Stats};

/// Fields every component record must carry.
pub const COMPONENT_FIELDS: [&str; 6] = ["id", "name", "type", "path", "description", "layer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Components,
    DependencyGraph,
    DataFlow,
    QualityAttributes,
}

impl Category {
    pub const ALL: [Self; 4] = [
        Self::Components,
        Self::DependencyGraph,
        Self::DataFlow,
        Self::QualityAttributes,
    ];

    /// Heading used in reports.
    pub const fn title(self) -> &'static str {
        match self {
            Self::Components => "Components",
            Self::DependencyGraph => "Dependency Graph",
            Self::DataFlow => "Data Flow",
            Self::QualityAttributes => "Quality Attributes",
        }
    }

    /// Key the category lives under in an architecture document, and the
    /// envelope key used when measuring it.
    pub const fn document_key(self) -> &'static str {
        match self {
            Self::Components => "components",
            Self::DependencyGraph => "dependency_graph",
            Self::DataFlow => "data_flow",
            Self::QualityAttributes => "quality_attributes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

fn non_empty_array<'a>(value: &'a Value, what: &str) -> Result<&'a [Value]> {
    match value.as_array() {
        Some(items) if !items.is_empty() => Ok(items),
        _ => Err(MetricsError::Encoding(format!(
            "{what} must be a non-empty array"
        ))),
    }
}

fn envelope(category: Category, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(category.document_key().to_owned(), value);
    Value::Object(map)
}

/// Measure a components collection.
///
/// # Errors
/// [`MetricsError::Encoding`] if `components` is not a non-empty array,
/// [`MetricsError::Validation`] if any record lacks a required field.
pub fn measure_components(codec: &impl Codec, components: &Value) -> Result<Stats> {
    let items = non_empty_array(components, "components")?;
    let mut problems = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        let missing: Vec<&str> = COMPONENT_FIELDS
            .iter()
            .copied()
            .filter(|field| item.get(field).is_none())
            .collect();
        if !missing.is_empty() {
            problems.push(format!("component {idx}: {}", missing.join(", ")));
        }
    }
    if !problems.is_empty() {
        return Err(MetricsError::Validation(format!(
            "missing required fields in components: {}",
            problems.join("; ")
        )));
    }

    let mut stats = savings::compute(codec, &envelope(Category::Components, components.clone()))?;
    stats.item_count = Some(items.len() as u64);
    Ok(stats)
}

/// Measure a dependency graph given its node and edge arrays.
///
/// # Errors
/// [`MetricsError::Encoding`] if either array is missing or empty.
pub fn measure_dependency_graph(codec: &impl Codec, nodes: &Value, edges: &Value) -> Result<Stats> {
    let node_count = non_empty_array(nodes, "nodes")?.len();
    let edge_count = non_empty_array(edges, "edges")?.len();
    let graph = json!({ "nodes": nodes, "edges": edges });
    let mut stats = savings::compute(codec, &envelope(Category::DependencyGraph, graph))?;
    stats.node_count = Some(node_count as u64);
    stats.edge_count = Some(edge_count as u64);
    Ok(stats)
}

/// Measure a data-flow description. `step_count` is the length of its
/// `steps` array, zero when absent.
///
/// # Errors
/// [`MetricsError::Validation`] if `data_flow` is not an object.
pub fn measure_data_flow(codec: &impl Codec, data_flow: &Value) -> Result<Stats> {
    if !data_flow.is_object() {
        return Err(MetricsError::Validation(
            "data_flow must be an object".to_owned(),
        ));
    }
    let steps = data_flow
        .get("steps")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let mut stats = savings::compute(codec, &envelope(Category::DataFlow, data_flow.clone()))?;
    stats.step_count = Some(steps as u64);
    Ok(stats)
}

/// Measure a quality-attributes collection.
///
/// # Errors
/// [`MetricsError::Encoding`] if `attributes` is not a non-empty array.
pub fn measure_quality_attributes(codec: &impl Codec, attributes: &Value) -> Result<Stats> {
    let count = non_empty_array(attributes, "quality_attributes")?.len();
    let mut stats = savings::compute(
        codec,
        &envelope(Category::QualityAttributes, attributes.clone()),
    )?;
    stats.item_count = Some(count as u64);
    Ok(stats)
}

/// What an input document yielded.
#[derive(Debug)]
pub enum Extraction {
    /// Per-category stats, in [`Category`] order. May be empty.
    Measured(Vec<(Category, Stats)>),
    /// The document already carries compact output and its own savings figures.
    AlreadyCompact { token_savings: Value },
}

/// Measure every category present under `architecture` in `doc`.
///
/// # Errors
/// Propagates the first validation or encoding failure.
pub fn extract(codec: &impl Codec, doc: &Value) -> Result<Extraction> {
    if let Some(toon) = doc.pointer("/architecture_documentation/formats/toon") {
        let token_savings = toon.get("token_savings").cloned().unwrap_or(Value::Null);
        return Ok(Extraction::AlreadyCompact { token_savings });
    }

    let Some(arch) = doc.get("architecture") else {
        return Ok(Extraction::Measured(Vec::new()));
    };

    let mut measured = Vec::new();
    for category in Category::ALL {
        let Some(section) = arch.get(category.document_key()) else {
            continue;
        };
        let stats = match category {
            Category::Components => measure_components(codec, section)?,
            Category::DependencyGraph => measure_dependency_graph(
                codec,
                section.get("nodes").unwrap_or(&Value::Null),
                section.get("edges").unwrap_or(&Value::Null),
            )?,
            Category::DataFlow => measure_data_flow(codec, section)?,
            Category::QualityAttributes => measure_quality_attributes(codec, section)?,
        };
        tracing::debug!(%category, saved = stats.saved_tokens, "measured category");
        measured.push((category, stats));
    }
    Ok(Extraction::Measured(measured))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::ToonCodec;

    fn component(id: &str) -> Value {
        json!({
            "id": id, "name": format!("Component {id}"), "type": "module",
            "path": format!("src/{id}.rs"), "description": "does things", "layer": "core"
        })
    }

    fn architecture() -> Value {
        json!({
            "architecture": {
                "components": [component("a"), component("b"), component("c")],
                "dependency_graph": {
                    "nodes": [{"id": "a", "label": "A"}, {"id": "b", "label": "B"}],
                    "edges": [{"from": "a", "to": "b", "type": "required"}]
                },
                "data_flow": {"name": "ingest", "steps": [{"n": 1}, {"n": 2}]},
                "quality_attributes": [{"name": "latency", "target": "p99 < 5ms"}]
            }
        })
    }

    #[test]
    fn components_report_every_missing_field() {
        let codec = ToonCodec::default();
        let bad = json!([component("a"), {"id": "b", "name": "B"}]);
        let err = measure_components(&codec, &bad).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, MetricsError::Validation(_)));
        assert!(msg.contains("component 1: type, path, description, layer"), "{msg}");
    }

    #[test]
    fn empty_components_is_an_encoding_error() {
        let codec = ToonCodec::default();
        let err = measure_components(&codec, &json!([])).unwrap_err();
        assert!(matches!(err, MetricsError::Encoding(_)), "{err}");
    }

    #[test]
    fn graph_requires_nodes_and_edges() {
        let codec = ToonCodec::default();
        let nodes = json!([{"id": "a"}]);
        let err = measure_dependency_graph(&codec, &nodes, &json!([])).unwrap_err();
        assert!(err.to_string().contains("edges must be a non-empty array"));
        let err = measure_dependency_graph(&codec, &Value::Null, &nodes).unwrap_err();
        assert!(err.to_string().contains("nodes must be a non-empty array"));
    }

    #[test]
    fn data_flow_without_steps_counts_zero() {
        let codec = ToonCodec::default();
        let stats = measure_data_flow(&codec, &json!({"name": "x"})).unwrap();
        assert_eq!(stats.step_count, Some(0));
    }

    #[test]
    fn extract_measures_all_present_categories_in_order() {
        let codec = ToonCodec::default();
        let Extraction::Measured(found) = extract(&codec, &architecture()).unwrap() else {
            unreachable!("expected measured categories");
        };
        let names: Vec<Category> = found.iter().map(|(c, _)| *c).collect();
        assert_eq!(names, Category::ALL.to_vec());
        assert_eq!(found[0].1.item_count, Some(3));
        assert_eq!(found[1].1.node_count, Some(2));
        assert_eq!(found[1].1.edge_count, Some(1));
        assert_eq!(found[2].1.step_count, Some(2));
        assert_eq!(found[3].1.item_count, Some(1));
    }

    #[test]
    fn extract_without_architecture_is_empty() {
        let codec = ToonCodec::default();
        let Extraction::Measured(found) = extract(&codec, &json!({"other": 1})).unwrap() else {
            unreachable!("expected measured categories");
        };
        assert!(found.is_empty());
    }

    #[test]
    fn extract_detects_already_compact_documents() {
        let codec = ToonCodec::default();
        let doc = json!({
            "architecture_documentation": {
                "formats": {"toon": {"content": "x", "token_savings": "42%"}}
            }
        });
        match extract(&codec, &doc).unwrap() {
            Extraction::AlreadyCompact { token_savings } => assert_eq!(token_savings, "42%"),
            Extraction::Measured(_) => unreachable!("expected compact detection"),
        }
    }

    #[test]
    fn category_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(Category::DependencyGraph).unwrap(),
            json!("dependencyGraph")
        );
    }
}

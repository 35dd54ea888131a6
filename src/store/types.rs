use async_graphql::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Store-internal node identifier
pub type NodeId = i64;

/// One result row, keyed by column name in projection order
pub type Row = IndexMap<String, Value>;

/// Relationship direction as seen from the node being inspected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Index (or uniqueness constraint) on a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub label: String,
    pub properties: Vec<String>,
    /// Backed by a uniqueness constraint
    #[serde(default)]
    pub unique: bool,
}

/// A sampled node with its labels and properties
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSample {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: IndexMap<String, Value>,
}

/// Relationships of one type and direction incident to a sampled node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipGroup {
    pub rel_type: String,
    pub direction: Direction,
    /// Number of relationships of this type and direction on the node
    pub degree: usize,
    /// Labels of the node at the other end of the first relationship, empty
    /// for groups above the dense-node threshold
    pub neighbor_labels: Vec<String>,
}

/// How a statement should be run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Execute and return rows
    #[default]
    Run,
    /// Execute, return rows and the executed plan with statistics
    Profile,
    /// Return only the planned operators; nothing is executed
    Explain,
}

impl ExecutionMode {
    pub fn is_diagnostic(self) -> bool {
        !matches!(self, ExecutionMode::Run)
    }

    /// Statement prefix understood by Cypher
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            ExecutionMode::Run => None,
            ExecutionMode::Profile => Some("PROFILE"),
            ExecutionMode::Explain => Some("EXPLAIN"),
        }
    }
}

/// Rows produced by a statement plus the store's plan when one was requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    pub rows: Vec<Row>,
    pub plan: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_mode_prefix() {
        assert_eq!(ExecutionMode::Run.prefix(), None);
        assert_eq!(ExecutionMode::Profile.prefix(), Some("PROFILE"));
        assert_eq!(ExecutionMode::Explain.prefix(), Some("EXPLAIN"));
        assert!(!ExecutionMode::Run.is_diagnostic());
        assert!(ExecutionMode::Explain.is_diagnostic());
    }

    #[test]
    fn test_deserialize_index_info() {
        let json = r#"{ "label": "Person", "properties": ["name"], "unique": true }"#;
        let index: IndexInfo = serde_json::from_str(json).unwrap();
        assert_eq!(index.label, "Person");
        assert_eq!(index.properties, vec!["name".to_string()]);
        assert!(index.unique);

        let index: IndexInfo = serde_json::from_str(r#"{ "label": "Person", "properties": ["born"] }"#).unwrap();
        assert!(!index.unique);
    }
}

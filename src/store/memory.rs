/// In-memory property graph
///
/// Holds nodes, relationships and index declarations, either built in code
/// or loaded from a JSON fixture. It cannot parse Cypher, so it executes the
/// compiled query plan directly with Cypher's comparison and ordering rules.

use super::types::{
    Direction, IndexInfo, NodeId, NodeSample, RelationshipGroup, Row, StatementResult,
};
use super::{GraphStore, ReadTransaction};
use crate::compiler::{CompiledQuery, Filter, NodePlan, ProjectionValue};
use crate::error::{GraphinatorError, Result};
use crate::store::ExecutionMode;

use async_graphql::{Name, Value};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRelationship {
    pub start: NodeId,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub end: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIndex {
    pub label: String,
    pub properties: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// Graph contents; also the JSON fixture format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyGraph {
    #[serde(default)]
    pub nodes: Vec<StoredNode>,
    #[serde(default)]
    pub relationships: Vec<StoredRelationship>,
    #[serde(default)]
    pub indexes: Vec<StoredIndex>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON fixture
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add a node and return its id
    pub fn add_node<'a>(
        &mut self,
        labels: &[&str],
        properties: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> NodeId {
        let id = self.nodes.iter().map(|node| node.id + 1).max().unwrap_or(0);
        self.nodes.push(StoredNode {
            id,
            labels: labels.iter().map(|label| label.to_string()).collect(),
            properties: properties
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        });
        id
    }

    pub fn add_relationship(&mut self, start: NodeId, rel_type: &str, end: NodeId) {
        self.relationships.push(StoredRelationship {
            start,
            rel_type: rel_type.to_string(),
            end,
        });
    }

    pub fn add_index(&mut self, label: &str, properties: &[&str], unique: bool) {
        self.indexes.push(StoredIndex {
            label: label.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            unique,
        });
    }

    pub fn node(&self, id: NodeId) -> Option<&StoredNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn nodes_with_label(&self, label: &str) -> Vec<&StoredNode> {
        self.nodes
            .iter()
            .filter(|node| node.labels.iter().any(|l| l == label))
            .collect()
    }

    /// Nodes reached from `id` through `rel_type`, in relationship order
    fn neighbours(&self, id: NodeId, rel_type: &str, outgoing: bool) -> Vec<&StoredNode> {
        self.relationships
            .iter()
            .filter(|rel| rel.rel_type == rel_type)
            .filter_map(|rel| {
                if outgoing && rel.start == id {
                    self.node(rel.end)
                } else if !outgoing && rel.end == id {
                    self.node(rel.start)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// `GraphStore` over a `PropertyGraph` held in memory.
///
/// Transactions see the graph as it was when they began; `update` swaps in a
/// modified copy.
pub struct MemoryGraph {
    graph: RwLock<Arc<PropertyGraph>>,
    executions: Arc<AtomicUsize>,
}

impl MemoryGraph {
    pub fn new(graph: PropertyGraph) -> Self {
        Self {
            graph: RwLock::new(Arc::new(graph)),
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let graph = PropertyGraph::load(path)?;
        tracing::info!(
            "Loaded {} nodes and {} relationships from {}",
            graph.nodes.len(),
            graph.relationships.len(),
            path.display()
        );
        Ok(Self::new(graph))
    }

    pub fn snapshot(&self) -> Arc<PropertyGraph> {
        let graph = self.graph.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&graph)
    }

    /// Apply a change; open transactions keep their view
    pub fn update(&self, change: impl FnOnce(&mut PropertyGraph)) {
        let mut graph = self.graph.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        change(Arc::make_mut(&mut graph));
    }

    /// Number of statements executed so far
    pub fn executions(&self) -> usize {
        self.executions.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn begin_read(&self) -> Result<Box<dyn ReadTransaction>> {
        Ok(Box::new(MemoryTransaction {
            graph: self.snapshot(),
            executions: Arc::clone(&self.executions),
        }))
    }
}

struct MemoryTransaction {
    graph: Arc<PropertyGraph>,
    executions: Arc<AtomicUsize>,
}

#[async_trait]
impl ReadTransaction for MemoryTransaction {
    async fn labels(&self) -> Result<Vec<String>> {
        let mut labels: Vec<String> = Vec::new();
        let declared = self
            .graph
            .nodes
            .iter()
            .flat_map(|node| node.labels.iter())
            .chain(self.graph.indexes.iter().map(|index| &index.label));
        for label in declared {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        Ok(labels)
    }

    async fn indexes(&self) -> Result<Vec<IndexInfo>> {
        Ok(self
            .graph
            .indexes
            .iter()
            .map(|index| IndexInfo {
                label: index.label.clone(),
                properties: index.properties.clone(),
                unique: index.unique,
            })
            .collect())
    }

    async fn sample_nodes(&self, label: &str, limit: usize) -> Result<Vec<NodeSample>> {
        Ok(self
            .graph
            .nodes_with_label(label)
            .into_iter()
            .take(limit)
            .map(|node| NodeSample {
                id: node.id,
                labels: node.labels.clone(),
                properties: node.properties.clone(),
            })
            .collect())
    }

    async fn relationship_groups(
        &self,
        node: &NodeSample,
        dense_threshold: usize,
    ) -> Result<Vec<RelationshipGroup>> {
        let mut groups: IndexMap<(String, Direction), RelationshipGroup> = IndexMap::new();

        for rel in &self.graph.relationships {
            let ends = [
                (rel.start == node.id, Direction::Outgoing, rel.end),
                (rel.end == node.id, Direction::Incoming, rel.start),
            ];
            for (incident, direction, other) in ends {
                if !incident {
                    continue;
                }
                let group = groups
                    .entry((rel.rel_type.clone(), direction))
                    .or_insert_with(|| RelationshipGroup {
                        rel_type: rel.rel_type.clone(),
                        direction,
                        degree: 0,
                        neighbor_labels: self
                            .graph
                            .node(other)
                            .map(|n| n.labels.clone())
                            .unwrap_or_default(),
                    });
                group.degree += 1;
            }
        }

        let mut groups: Vec<RelationshipGroup> = groups.into_values().collect();
        for group in &mut groups {
            if group.degree > dense_threshold {
                group.neighbor_labels.clear();
            }
        }
        Ok(groups)
    }

    async fn execute(&self, query: &CompiledQuery) -> Result<StatementResult> {
        self.executions.fetch_add(1, AtomicOrdering::SeqCst);

        match query.mode() {
            ExecutionMode::Explain => Ok(StatementResult {
                rows: Vec::new(),
                plan: Some(query.plan.to_value(None)),
            }),
            mode => {
                let executor = Executor {
                    graph: &self.graph,
                    parameters: &query.parameters,
                };
                let rows = executor.rows(&query.plan.root)?;
                let plan = (mode == ExecutionMode::Profile).then(|| query.plan.to_value(Some(rows.len())));
                Ok(StatementResult { rows, plan })
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct Executor<'g> {
    graph: &'g PropertyGraph,
    parameters: &'g IndexMap<String, Value>,
}

impl<'g> Executor<'g> {
    fn rows(&self, plan: &NodePlan) -> Result<Vec<Row>> {
        let candidates = self.graph.nodes_with_label(&plan.label);
        self.select(candidates, plan)?
            .into_iter()
            .map(|node| {
                plan.projections
                    .iter()
                    .map(|projection| Ok((projection.key.clone(), self.project(node, &projection.value)?)))
                    .collect::<Result<Row>>()
            })
            .collect()
    }

    /// Filter, order and paginate candidates of one level
    fn select(&self, candidates: Vec<&'g StoredNode>, plan: &NodePlan) -> Result<Vec<&'g StoredNode>> {
        let mut selected = Vec::with_capacity(candidates.len());
        for node in candidates {
            if self.matches(node, &plan.filters)? {
                selected.push(node);
            }
        }

        if !plan.order.is_empty() {
            selected.sort_by(|a, b| {
                plan.order
                    .iter()
                    .map(|key| {
                        let left = a.properties.get(&key.property).unwrap_or(&Value::Null);
                        let right = b.properties.get(&key.property).unwrap_or(&Value::Null);
                        let ordering = compare_values(left, right);
                        if key.descending {
                            ordering.reverse()
                        } else {
                            ordering
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let skip = self.count(plan.skip.as_deref())?.unwrap_or(0);
        let limit = self.count(plan.limit.as_deref())?.unwrap_or(usize::MAX);
        Ok(selected.into_iter().skip(skip).take(limit).collect())
    }

    fn matches(&self, node: &StoredNode, filters: &[Filter]) -> Result<bool> {
        for filter in filters {
            let keep = match filter {
                Filter::Id { parameter } => to_node_id(self.parameter(parameter)?) == Some(node.id),
                Filter::IdIn { parameter } => list_items(self.parameter(parameter)?)
                    .iter()
                    .any(|id| to_node_id(id) == Some(node.id)),
                Filter::Equals {
                    property,
                    parameter,
                } => {
                    let expected = self.parameter(parameter)?;
                    node.properties
                        .get(property)
                        .is_some_and(|value| values_equal(value, expected))
                }
                Filter::AnyOf {
                    property,
                    parameter,
                } => {
                    let candidates = list_items(self.parameter(parameter)?);
                    node.properties
                        .get(property)
                        .is_some_and(|value| candidates.iter().any(|candidate| values_equal(value, candidate)))
                }
            };
            if !keep {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn project(&self, node: &StoredNode, value: &ProjectionValue) -> Result<Value> {
        Ok(match value {
            ProjectionValue::Id => Value::String(node.id.to_string()),
            ProjectionValue::Property(property) => node.properties.get(property).cloned().unwrap_or(Value::Null),
            ProjectionValue::Typename { parameter } => self.parameter(parameter)?.clone(),
            ProjectionValue::Expansion(expansion) => {
                let child = &expansion.node;
                let candidates = self
                    .graph
                    .neighbours(node.id, &expansion.rel_type, expansion.outgoing)
                    .into_iter()
                    .filter(|neighbour| neighbour.labels.iter().any(|l| *l == child.label))
                    .collect();

                let mut objects = Vec::new();
                for neighbour in self.select(candidates, child)? {
                    let mut object = IndexMap::new();
                    for projection in &child.projections {
                        object.insert(Name::new(&projection.key), self.project(neighbour, &projection.value)?);
                    }
                    objects.push(Value::Object(object));
                }

                if expansion.multiple {
                    Value::List(objects)
                } else {
                    objects.into_iter().next().unwrap_or(Value::Null)
                }
            }
        })
    }

    fn parameter(&self, name: &str) -> Result<&'g Value> {
        self.parameters
            .get(name)
            .ok_or_else(|| GraphinatorError::Execution(format!("Expected parameter(s): {}", name)))
    }

    fn count(&self, parameter: Option<&str>) -> Result<Option<usize>> {
        let Some(parameter) = parameter else {
            return Ok(None);
        };
        match self.parameter(parameter)? {
            Value::Number(n) => n
                .as_u64()
                .map(|n| Some(n as usize))
                .ok_or_else(|| GraphinatorError::Execution(format!("Invalid SKIP/LIMIT value: {}", n))),
            other => Err(GraphinatorError::Execution(format!("Invalid SKIP/LIMIT value: {}", other))),
        }
    }
}

fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// `toInteger` on an id argument; unparsable values match nothing
fn to_node_id(value: &Value) -> Option<NodeId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Cypher equality: null equals nothing, numbers compare across int and float
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (a, b) => a == b,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::List(_) => 0,
        Value::String(_) => 1,
        Value::Boolean(_) => 2,
        Value::Number(_) => 3,
        Value::Null => 5,
        _ => 4,
    }
}

/// Ascending Cypher order: nulls sort last
fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare_values(x, y))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{compile, QueryNode};
    use crate::registry::{RelationshipKey, TypeMetadata, TypeRegistry};

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn graph() -> PropertyGraph {
        let mut graph = PropertyGraph::new();
        let kevin = graph.add_node(&["Person"], [("name", text("Kevin Bacon")), ("born", Value::Number(1958.into()))]);
        let meg = graph.add_node(&["Person", "Actor"], [("name", text("Meg Ryan")), ("born", Value::Number(1961.into()))]);
        let apollo = graph.add_node(&["Movie"], [("title", text("Apollo 13"))]);
        graph.add_relationship(kevin, "ACTED_IN", apollo);
        graph.add_relationship(meg, "KNOWS", kevin);
        graph.add_index("Person", &["name"], true);
        graph
    }

    fn registry() -> TypeRegistry {
        let mut person = TypeMetadata::new("Person");
        person.merge_property("name", &text("x"));
        person.merge_property("born", &Value::Number(1.into()));
        person.observe_relationship(RelationshipKey::new(true, "ACTED_IN", "Movie"), true);
        let mut movie = TypeMetadata::new("Movie");
        movie.merge_property("title", &text("x"));
        TypeRegistry::new(vec![person, movie])
    }

    #[test]
    fn test_fixture_round_trip() {
        let graph = graph();
        let json = graph.to_json_pretty().unwrap();
        assert_eq!(PropertyGraph::from_json(&json).unwrap(), graph);
    }

    #[test]
    fn test_fixture_format() {
        let json = r#"{
            "nodes": [{ "id": 7, "labels": ["Person"], "properties": { "name": "Tom Hanks" } }],
            "relationships": [{ "start": 7, "type": "KNOWS", "end": 7 }]
        }"#;
        let graph = PropertyGraph::from_json(json).unwrap();

        assert_eq!(graph.node(7).unwrap().properties["name"], text("Tom Hanks"));
        assert_eq!(graph.relationships[0].rel_type, "KNOWS");
        assert!(graph.indexes.is_empty());
    }

    #[tokio::test]
    async fn test_introspection() {
        let store = MemoryGraph::new(graph());
        let tx = store.begin_read().await.unwrap();

        assert_eq!(tx.labels().await.unwrap(), vec!["Person", "Actor", "Movie"]);
        assert_eq!(
            tx.indexes().await.unwrap(),
            vec![IndexInfo {
                label: "Person".to_string(),
                properties: vec!["name".to_string()],
                unique: true
            }]
        );
        assert_eq!(tx.sample_nodes("Person", 1).await.unwrap().len(), 1);

        let kevin = tx.sample_nodes("Person", 1).await.unwrap().remove(0);
        let groups = tx.relationship_groups(&kevin, 50).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].rel_type, "ACTED_IN");
        assert_eq!(groups[0].direction, Direction::Outgoing);
        assert_eq!(groups[0].neighbor_labels, vec!["Movie"]);
        assert_eq!(groups[1].direction, Direction::Incoming);

        tx.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_dense_groups_skip_neighbour_labels() {
        let mut graph = PropertyGraph::new();
        let hub = graph.add_node(&["Person"], [("name", text("Hub"))]);
        for i in 0..3 {
            let follower = graph.add_node(&["Person"], [("name", text(&format!("Follower {}", i)))]);
            graph.add_relationship(follower, "FOLLOWS", hub);
        }
        let movie = graph.add_node(&["Movie"], [("title", text("Apollo 13"))]);
        graph.add_relationship(hub, "ACTED_IN", movie);
        let store = MemoryGraph::new(graph);
        let tx = store.begin_read().await.unwrap();

        let hub = tx.sample_nodes("Person", 1).await.unwrap().remove(0);
        let groups = tx.relationship_groups(&hub, 2).await.unwrap();

        let follows = groups.iter().find(|g| g.rel_type == "FOLLOWS").unwrap();
        assert_eq!(follows.degree, 3);
        assert!(follows.neighbor_labels.is_empty());
        let acted_in = groups.iter().find(|g| g.rel_type == "ACTED_IN").unwrap();
        assert_eq!(acted_in.neighbor_labels, vec!["Movie"]);
    }

    #[tokio::test]
    async fn test_execute_counts_statements() {
        let store = MemoryGraph::new(graph());
        let node = QueryNode::new("Person").with_child(QueryNode::new("name"));
        let compiled = compile(&node, &registry()).unwrap();

        let tx = store.begin_read().await.unwrap();
        let result = tx.execute(&compiled).await.unwrap();
        tx.close().await.unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1]["name"], text("Meg Ryan"));
        assert!(result.plan.is_none());
        assert_eq!(store.executions(), 1);
    }

    #[tokio::test]
    async fn test_transactions_keep_their_view() {
        let store = MemoryGraph::new(graph());
        let tx = store.begin_read().await.unwrap();

        store.update(|graph| {
            graph.add_node(&["Person"], [("name", text("Tom Hanks"))]);
        });

        assert_eq!(tx.sample_nodes("Person", 10).await.unwrap().len(), 2);
        let fresh = store.begin_read().await.unwrap();
        assert_eq!(fresh.sample_nodes("Person", 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_explain_returns_no_rows() {
        let store = MemoryGraph::new(graph());
        let node = QueryNode::new("Person")
            .with_directive(crate::compiler::Directive::Explain)
            .with_child(QueryNode::new("name"));
        let compiled = compile(&node, &registry()).unwrap();

        let tx = store.begin_read().await.unwrap();
        let result = tx.execute(&compiled).await.unwrap();

        assert!(result.rows.is_empty());
        assert!(result.plan.is_some());
    }

    #[test]
    fn test_values_equal_across_numeric_types() {
        assert!(values_equal(&Value::Number(1.into()), &Value::from(1.0)));
        assert!(!values_equal(&Value::Null, &Value::Null));
        assert!(!values_equal(&text("1"), &Value::Number(1.into())));
    }

    #[test]
    fn test_nulls_sort_last() {
        let mut values = vec![Value::Null, Value::Number(3.into()), Value::Number(1.into())];
        values.sort_by(compare_values);
        assert_eq!(values, vec![Value::Number(1.into()), Value::Number(3.into()), Value::Null]);
    }

    #[test]
    fn test_to_node_id() {
        assert_eq!(to_node_id(&text("42")), Some(42));
        assert_eq!(to_node_id(&Value::Number(42.into())), Some(42));
        assert_eq!(to_node_id(&text("forty-two")), None);
    }
}

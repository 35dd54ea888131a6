use crate::error::{GraphinatorError, Result};
use crate::registry::{RelationshipKey, TypeMetadata, TypeRegistry};
use crate::store::{Direction, GraphStore, IndexInfo, ReadSession, ReadTransaction};

use serde::{Deserialize, Serialize};

/// Bounds on how much of the graph a scan looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Nodes sampled per label
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Degree above which a node's relationships of one type and direction
    /// are left out of relationship inference
    #[serde(default = "default_dense_node_threshold")]
    pub dense_node_threshold: usize,
}

fn default_sample_size() -> usize {
    10
}

fn default_dense_node_threshold() -> usize {
    50
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            dense_node_threshold: default_dense_node_threshold(),
        }
    }
}

/// Infer type metadata for every label in the store.
///
/// Reads go through one read session. Failing to list labels fails the scan;
/// any other failure only empties the metadata of the label being inspected,
/// and a transaction the store rolled back is replaced for the labels after it.
pub async fn scan(store: &dyn GraphStore, options: &ScanOptions) -> Result<TypeRegistry> {
    let mut session = ReadSession::new(store);
    let result = scan_labels(&mut session, options).await;
    session.close().await;
    result
}

async fn scan_labels(session: &mut ReadSession<'_>, options: &ScanOptions) -> Result<TypeRegistry> {
    let labels = session
        .transaction()
        .await
        .map_err(|e| GraphinatorError::Scan(format!("Failed to open read transaction: {}", e)))?
        .labels()
        .await
        .map_err(|e| GraphinatorError::Scan(format!("Failed to list labels: {}", e)))?;

    let indexes = match session.transaction().await?.indexes().await {
        Ok(indexes) => indexes,
        Err(e) => {
            tracing::warn!("Scanning without index information: {}", e);
            Vec::new()
        }
    };

    let mut types = Vec::with_capacity(labels.len());
    for label in labels {
        let label_indexes: Vec<&IndexInfo> = indexes.iter().filter(|index| index.label == label).collect();
        let inspected = match session.transaction().await {
            Ok(tx) => inspect_label(tx, &label, &label_indexes, options).await,
            Err(e) => Err(e),
        };
        let metadata = match inspected {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(
                    "{}",
                    GraphinatorError::Scan(format!("Label '{}' registered without metadata: {}", label, e))
                );
                TypeMetadata::new(label.as_str())
            }
        };

        tracing::debug!(
            "Label '{}': {} properties, {} relationships",
            metadata.label,
            metadata.properties.len(),
            metadata.relationships.len()
        );
        types.push(metadata);
    }

    tracing::info!("Scanned {} labels", types.len());
    Ok(TypeRegistry::new(types))
}

/// Indexes, sampled properties and relationship shapes of one label
async fn inspect_label(
    tx: &dyn ReadTransaction,
    label: &str,
    indexes: &[&IndexInfo],
    options: &ScanOptions,
) -> Result<TypeMetadata> {
    let mut metadata = TypeMetadata::new(label);

    for index in indexes {
        for property in &index.properties {
            if index.unique {
                metadata.add_id_property(property);
            } else {
                metadata.add_indexed_property(property);
            }
        }
    }

    for node in tx.sample_nodes(label, options.sample_size).await? {
        for (key, value) in &node.properties {
            metadata.merge_property(key, value);
        }
        for other in &node.labels {
            metadata.add_label(other);
        }

        for group in tx.relationship_groups(&node, options.dense_node_threshold).await? {
            if group.degree > options.dense_node_threshold {
                tracing::debug!(
                    "Node {} has {} {:?} '{}' relationships, skipping",
                    node.id,
                    group.degree,
                    group.direction,
                    group.rel_type
                );
                continue;
            }

            let outgoing = group.direction == Direction::Outgoing;
            for other_label in &group.neighbor_labels {
                let key = RelationshipKey::new(outgoing, group.rel_type.as_str(), other_label.as_str());
                metadata.observe_relationship(key, group.degree > 1);
            }
        }
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompiledQuery;
    use crate::registry::PropertyType;
    use crate::store::{IndexInfo, MemoryGraph, NodeSample, PropertyGraph, RelationshipGroup, StatementResult};
    use async_graphql::Value;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn movies() -> PropertyGraph {
        let mut graph = PropertyGraph::new();
        let kevin = graph.add_node(&["Person", "Actor"], [("name", text("Kevin Bacon")), ("born", Value::Number(1958.into()))]);
        let meg = graph.add_node(&["Person"], [("name", text("Meg Ryan")), ("height", Value::from(1.73))]);
        let apollo = graph.add_node(&["Movie"], [("title", text("Apollo 13"))]);
        let sleepless = graph.add_node(&["Movie"], [("title", text("Sleepless in Seattle"))]);
        graph.add_relationship(kevin, "ACTED_IN", apollo);
        graph.add_relationship(kevin, "ACTED_IN", sleepless);
        graph.add_relationship(meg, "ACTED_IN", sleepless);
        graph.add_relationship(meg, "DIRECTED", sleepless);
        graph.add_index("Person", &["name"], true);
        graph.add_index("Movie", &["title"], false);
        graph
    }

    #[tokio::test]
    async fn test_scan_infers_properties_and_indexes() {
        let store = MemoryGraph::new(movies());
        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        let person = registry.get("Person").unwrap();
        let names: Vec<&str> = person.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["name", "born", "height"]);
        assert_eq!(person.properties["born"].inferred_type, PropertyType::Integer);
        assert_eq!(person.properties["height"].inferred_type, PropertyType::Float);
        assert!(person.properties["name"].unique);
        assert!(person.id_properties.contains("name"));

        let movie = registry.get("Movie").unwrap();
        assert!(movie.indexed_properties.contains("title"));
        assert!(!movie.properties["title"].unique);
    }

    #[tokio::test]
    async fn test_scan_infers_relationships() {
        let store = MemoryGraph::new(movies());
        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        let person = registry.get("Person").unwrap();
        let acted_in = person
            .relationship(&RelationshipKey::new(true, "ACTED_IN", "Movie"))
            .unwrap();
        assert_eq!(acted_in.field_name, "ACTED_IN_Movie");
        assert!(acted_in.multiple);

        let directed = person
            .relationship(&RelationshipKey::new(true, "DIRECTED", "Movie"))
            .unwrap();
        assert!(!directed.multiple);

        let movie = registry.get("Movie").unwrap();
        let actors = movie
            .relationship(&RelationshipKey::new(false, "ACTED_IN", "Person"))
            .unwrap();
        assert_eq!(actors.field_name, "Person_ACTED_IN");
        assert!(actors.multiple);
    }

    #[tokio::test]
    async fn test_extra_labels_exclude_the_label_itself() {
        let store = MemoryGraph::new(movies());
        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        let person = registry.get("Person").unwrap();
        assert_eq!(person.extra_labels.len(), 1);
        assert!(person.extra_labels.contains("Actor"));

        let actor = registry.get("Actor").unwrap();
        assert!(actor.extra_labels.contains("Person"));
        assert!(!actor.extra_labels.contains("Actor"));
    }

    #[tokio::test]
    async fn test_sample_size_bounds_the_scan() {
        let store = MemoryGraph::new(movies());
        let options = ScanOptions {
            sample_size: 1,
            ..ScanOptions::default()
        };
        let registry = scan(&store, &options).await.unwrap();

        let person = registry.get("Person").unwrap();
        assert!(!person.properties.contains_key("height"));
    }

    #[tokio::test]
    async fn test_dense_nodes_are_skipped() {
        let mut graph = PropertyGraph::new();
        let hub = graph.add_node(&["Hub"], [("name", text("hub"))]);
        for i in 0..4 {
            let leaf = graph.add_node(&["Leaf"], [("n", Value::Number(i.into()))]);
            graph.add_relationship(hub, "LINKS", leaf);
        }
        let store = MemoryGraph::new(graph);
        let options = ScanOptions {
            sample_size: 10,
            dense_node_threshold: 3,
        };

        let registry = scan(&store, &options).await.unwrap();

        assert!(registry.get("Hub").unwrap().relationships.is_empty());
        let leaf = registry.get("Leaf").unwrap();
        let incoming = leaf
            .relationship(&RelationshipKey::new(false, "LINKS", "Hub"))
            .unwrap();
        assert!(!incoming.multiple);
    }

    #[tokio::test]
    async fn test_label_without_nodes_is_registered() {
        let mut graph = movies();
        graph.add_index("Ghost", &["name"], false);
        let store = MemoryGraph::new(graph);

        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        let ghost = registry.get("Ghost").unwrap();
        assert!(ghost.properties.is_empty());
        assert!(registry.layout("Ghost").is_some());
    }

    /// Store that fails sampling for one label and, like Neo4j, rolls the
    /// whole transaction back when a statement fails
    struct FlakyStore {
        inner: MemoryGraph,
        failing_label: &'static str,
        opened: AtomicUsize,
        index_reads: Arc<AtomicUsize>,
    }

    struct FlakyTransaction {
        inner: Box<dyn ReadTransaction>,
        failing_label: &'static str,
        rolled_back: AtomicBool,
        index_reads: Arc<AtomicUsize>,
    }

    impl FlakyTransaction {
        fn check_open(&self) -> Result<()> {
            if self.rolled_back.load(Ordering::SeqCst) {
                return Err(GraphinatorError::Execution(
                    "Neo.ClientError.Transaction.TransactionNotFound".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn begin_read(&self) -> Result<Box<dyn ReadTransaction>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FlakyTransaction {
                inner: self.inner.begin_read().await?,
                failing_label: self.failing_label,
                rolled_back: AtomicBool::new(false),
                index_reads: Arc::clone(&self.index_reads),
            }))
        }
    }

    #[async_trait]
    impl ReadTransaction for FlakyTransaction {
        async fn labels(&self) -> Result<Vec<String>> {
            self.check_open()?;
            self.inner.labels().await
        }

        async fn indexes(&self) -> Result<Vec<IndexInfo>> {
            self.check_open()?;
            self.index_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.indexes().await
        }

        async fn sample_nodes(&self, label: &str, limit: usize) -> Result<Vec<NodeSample>> {
            self.check_open()?;
            if label == self.failing_label {
                self.rolled_back.store(true, Ordering::SeqCst);
                return Err(GraphinatorError::Execution("Neo.TransientError.General.MemoryPoolOutOfMemoryError".to_string()));
            }
            self.inner.sample_nodes(label, limit).await
        }

        async fn relationship_groups(&self, node: &NodeSample, dense_threshold: usize) -> Result<Vec<RelationshipGroup>> {
            self.check_open()?;
            self.inner.relationship_groups(node, dense_threshold).await
        }

        async fn execute(&self, query: &CompiledQuery) -> Result<StatementResult> {
            self.check_open()?;
            self.inner.execute(query).await
        }

        async fn close(self: Box<Self>) -> Result<()> {
            self.inner.close().await
        }

        fn is_open(&self) -> bool {
            !self.rolled_back.load(Ordering::SeqCst)
        }
    }

    fn flaky(failing_label: &'static str) -> FlakyStore {
        FlakyStore {
            inner: MemoryGraph::new(movies()),
            failing_label,
            opened: AtomicUsize::new(0),
            index_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[tokio::test]
    async fn test_failing_label_degrades_to_empty_metadata() {
        let store = flaky("Movie");

        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        let movie = registry.get("Movie").unwrap();
        assert!(movie.properties.is_empty());
        assert!(movie.relationships.is_empty());
        assert!(!registry.get("Person").unwrap().properties.is_empty());
    }

    #[tokio::test]
    async fn test_labels_after_a_rollback_keep_their_metadata() {
        // Labels are scanned as Person, Actor, Movie
        let store = flaky("Person");

        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        assert!(registry.get("Person").unwrap().properties.is_empty());
        let actor = registry.get("Actor").unwrap();
        assert_eq!(actor.properties["name"].inferred_type, PropertyType::String);
        let movie = registry.get("Movie").unwrap();
        assert!(movie.properties.contains_key("title"));
        assert!(!movie.relationships.is_empty());
        assert_eq!(store.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_index_catalogue_is_read_once() {
        let store = flaky("Nothing");

        let registry = scan(&store, &ScanOptions::default()).await.unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.get("Person").unwrap().id_properties.contains("name"));
        assert!(registry.get("Movie").unwrap().indexed_properties.contains("title"));
        assert_eq!(store.index_reads.load(Ordering::SeqCst), 1);
        assert_eq!(store.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.sample_size, 10);
        assert_eq!(options.dense_node_threshold, 50);
    }
}

/// Graph store access
///
/// The core only needs a handful of read operations from the database that
/// hosts the graph: label and index introspection, bounded node sampling with
/// relationship shape, and execution of one compiled statement. Everything
/// runs inside a read transaction so a scan or a request sees one consistent
/// view of the graph.

mod memory;
mod neo4j;
mod types;

pub use memory::{MemoryGraph, PropertyGraph, StoredIndex, StoredNode, StoredRelationship};
pub use neo4j::Neo4jHttpStore;
pub use types::{
    Direction, ExecutionMode, IndexInfo, NodeId, NodeSample, RelationshipGroup, Row,
    StatementResult,
};

use crate::compiler::CompiledQuery;
use crate::error::Result;
use async_trait::async_trait;

/// A graph database that can open read transactions.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Open a read transaction. Callers must `close` it when done.
    async fn begin_read(&self) -> Result<Box<dyn ReadTransaction>>;
}

/// Read operations available inside one transaction.
#[async_trait]
pub trait ReadTransaction: Send + Sync {
    /// All node labels known to the store.
    async fn labels(&self) -> Result<Vec<String>>;

    /// Every node index and uniqueness constraint in the store.
    async fn indexes(&self) -> Result<Vec<IndexInfo>>;

    /// Up to `limit` nodes carrying `label`, in store iteration order.
    async fn sample_nodes(&self, label: &str, limit: usize) -> Result<Vec<NodeSample>>;

    /// Relationship shape of a sampled node, one group per type and direction.
    ///
    /// Degrees come from the store's degree counts. Neighbour labels are only
    /// looked up for groups of at most `dense_threshold` relationships; denser
    /// groups come back with none.
    async fn relationship_groups(
        &self,
        node: &NodeSample,
        dense_threshold: usize,
    ) -> Result<Vec<RelationshipGroup>>;

    /// Run a compiled statement with its parameters, in the statement's mode.
    async fn execute(&self, query: &CompiledQuery) -> Result<StatementResult>;

    /// End the transaction. Read transactions never commit anything.
    async fn close(self: Box<Self>) -> Result<()>;

    /// False once the store has rolled the transaction back, after which
    /// every further statement in it fails.
    fn is_open(&self) -> bool {
        true
    }
}

/// A sequence of reads that replaces its transaction when the store has
/// rolled it back, so one failed statement does not fail the ones after it.
pub struct ReadSession<'a> {
    store: &'a dyn GraphStore,
    tx: Option<Box<dyn ReadTransaction>>,
    opened: usize,
}

impl<'a> ReadSession<'a> {
    /// No transaction is opened until the first `transaction` call
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            tx: None,
            opened: 0,
        }
    }

    /// The current transaction, opening a fresh one if there is none or the
    /// previous one was rolled back
    pub async fn transaction(&mut self) -> Result<&dyn ReadTransaction> {
        let tx = match self.tx.take() {
            Some(tx) if tx.is_open() => tx,
            previous => {
                if let Some(rolled_back) = previous {
                    tracing::debug!("Transaction was rolled back, opening a new one");
                    if let Err(e) = rolled_back.close().await {
                        tracing::debug!("Closing rolled back transaction: {}", e);
                    }
                }
                let tx = self.store.begin_read().await?;
                self.opened += 1;
                tx
            }
        };
        Ok(&**self.tx.insert(tx))
    }

    /// Number of transactions opened so far
    pub fn opened(&self) -> usize {
        self.opened
    }

    pub async fn close(self) {
        if let Some(tx) = self.tx {
            if let Err(e) = tx.close().await {
                tracing::warn!("Failed to close transaction: {}", e);
            }
        }
    }
}

/// Request execution over the active snapshot
///
/// The engine owns the graph store and the registry handle. It rebuilds the
/// snapshot on first use and after invalidation, and turns each GraphQL
/// request into one compiled statement per root field, executed inside one
/// read transaction. A transaction the store rolled back is replaced before
/// the next root field runs.

use crate::compiler::{bind_variables, compile, reshape, Directive, Lowering, QueryNode};
use crate::discovery::{scan, ScanOptions};
use crate::error::{CompileError, GraphinatorError, Result};
use crate::registry::{RegistryHandle, Snapshot, QUERY_TYPE, TYPENAME_FIELD};
use crate::schema::SchemaBuilder;
use crate::store::{ExecutionMode, GraphStore, ReadSession};

use async_graphql::parser::parse_query;
use async_graphql::parser::types::{DocumentOperations, OperationType};
use async_graphql::{ErrorExtensionValues, PathSegment, Request, Response, ServerError, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const COMPILE_ERROR: &str = "COMPILE_ERROR";
pub const EXECUTION_ERROR: &str = "EXECUTION_ERROR";
pub const SCHEMA_ERROR: &str = "SCHEMA_ERROR";

/// Diagnostic output of one root field run under `@profile` or `@explain`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacklogEntry {
    pub field: String,
    pub mode: ExecutionMode,
    pub statement: String,
    pub plan: Option<Value>,
}

/// Per-request diagnostic side channel
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Backlog {
    pub entries: Vec<BacklogEntry>,
}

impl Backlog {
    pub fn to_value(&self) -> Value {
        async_graphql::to_value(&self.entries).unwrap_or(Value::Null)
    }
}

/// Result of one request: data, per-field errors and the diagnostic backlog
#[derive(Debug, Default)]
pub struct QueryResponse {
    pub data: Value,
    pub errors: Vec<ServerError>,
    pub backlog: Option<Backlog>,
}

impl QueryResponse {
    fn failed(error: ServerError) -> Self {
        Self {
            data: Value::Null,
            errors: vec![error],
            backlog: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<QueryResponse> for Response {
    fn from(response: QueryResponse) -> Self {
        let mut converted = Response::new(response.data);
        converted.errors = response.errors;
        if let Some(backlog) = response.backlog {
            converted.extensions.insert("backlog".to_string(), backlog.to_value());
        }
        converted
    }
}

fn server_error(message: String, field: Option<&str>, code: &str) -> ServerError {
    let mut error = ServerError::new(message, None);
    if let Some(field) = field {
        error.path = vec![PathSegment::Field(field.to_string())];
    }
    let mut extensions = ErrorExtensionValues::default();
    extensions.set("code", code);
    error.extensions = Some(extensions);
    error
}

pub struct Engine {
    store: Arc<dyn GraphStore>,
    options: ScanOptions,
    handle: RegistryHandle,
    stale: AtomicBool,
    rebuild_lock: Mutex<()>,
    version: AtomicU64,
}

impl Engine {
    pub fn new(store: Arc<dyn GraphStore>, options: ScanOptions) -> Self {
        Self {
            store,
            options,
            handle: RegistryHandle::new(),
            stale: AtomicBool::new(false),
            rebuild_lock: Mutex::new(()),
            version: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Mark the snapshot stale; the next request rebuilds it
    pub fn invalidate(&self) {
        tracing::info!("Schema invalidated");
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Rebuild and publish a snapshot now
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.rebuild_lock.lock().await;
        self.rebuild().await
    }

    /// The active snapshot. The very first build is awaited; a stale
    /// snapshot is rebuilt by whichever request gets the rebuild lock while
    /// the others keep using the previous one.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        let Some(current) = self.handle.current() else {
            let _guard = self.rebuild_lock.lock().await;
            if let Some(current) = self.handle.current() {
                return Ok(current);
            }
            return self.rebuild().await;
        };

        if self.stale.load(Ordering::SeqCst) {
            if let Ok(_guard) = self.rebuild_lock.try_lock() {
                if self.stale.load(Ordering::SeqCst) {
                    match self.rebuild().await {
                        Ok(snapshot) => return Ok(snapshot),
                        Err(e) => tracing::warn!(
                            "Rebuild failed, keeping registry version {}: {}",
                            current.registry.version(),
                            e
                        ),
                    }
                }
            }
        }

        Ok(self.handle.current().unwrap_or(current))
    }

    /// Scan, build and publish. Callers hold the rebuild lock.
    async fn rebuild(&self) -> Result<Arc<Snapshot>> {
        self.stale.store(false, Ordering::SeqCst);
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("Building registry version {}", version);

        let registry = Arc::new(scan(self.store.as_ref(), &self.options).await?.with_version(version));
        let schema = SchemaBuilder::new()
            .with_store(Arc::clone(&self.store))
            .build(Arc::clone(&registry))?;

        self.handle.publish(Snapshot { registry, schema });
        self.handle
            .current()
            .ok_or_else(|| GraphinatorError::SchemaBuild("Snapshot was not published".to_string()))
    }

    /// GraphQL SDL of the active snapshot
    pub async fn sdl(&self) -> Result<String> {
        Ok(self.snapshot().await?.schema.sdl())
    }

    /// Execute one GraphQL request.
    ///
    /// Every root field is compiled before anything runs. Fields that fail to
    /// compile or execute yield null data and an error with their path; the
    /// other fields keep their data.
    pub async fn execute(&self, request: impl Into<Request>) -> QueryResponse {
        let request = request.into();

        let document = match parse_query(&request.query) {
            Ok(document) => document,
            Err(e) => {
                let error = CompileError::Syntax(e.to_string());
                return QueryResponse::failed(server_error(error.to_string(), None, COMPILE_ERROR));
            }
        };

        let operation = match (&document.operations, request.operation_name.as_deref()) {
            (DocumentOperations::Single(operation), _) => Some(operation),
            (DocumentOperations::Multiple(operations), Some(name)) => operations.get(name),
            (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => operations.values().next(),
            (DocumentOperations::Multiple(_), None) => None,
        };
        let Some(operation) = operation else {
            let name = request.operation_name.clone().unwrap_or_default();
            let error = CompileError::UnknownOperation(name);
            return QueryResponse::failed(server_error(error.to_string(), None, COMPILE_ERROR));
        };
        if operation.node.ty != OperationType::Query {
            let error = CompileError::UnsupportedOperation;
            return QueryResponse::failed(server_error(error.to_string(), None, COMPILE_ERROR));
        }

        let variables = bind_variables(&operation.node, &request.variables);
        let lowering = Lowering::new(&document.fragments, &variables);
        let mut nodes = match lowering.selection_set(&operation.node.selection_set.node) {
            Ok(nodes) => nodes,
            Err(e) => return QueryResponse::failed(server_error(e.to_string(), None, COMPILE_ERROR)),
        };

        let snapshot = match self.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => return QueryResponse::failed(server_error(e.to_string(), None, SCHEMA_ERROR)),
        };

        if nodes.iter().all(|node| node.field_name.starts_with("__")) {
            tracing::debug!("Delegating introspection request to the schema");
            let response = snapshot.schema.execute(request).await;
            return QueryResponse {
                data: response.data,
                errors: response.errors,
                backlog: None,
            };
        }

        for directive in &operation.node.directives {
            let directive = Directive::named(directive.node.name.node.as_str());
            if matches!(directive, Directive::Profile | Directive::Explain) {
                for node in &mut nodes {
                    if !node.directives.contains(&directive) {
                        node.directives.push(directive.clone());
                    }
                }
            }
        }

        self.run(&nodes, &snapshot).await
    }

    async fn run(&self, nodes: &[QueryNode], snapshot: &Snapshot) -> QueryResponse {
        let compiled: Vec<_> = nodes
            .iter()
            .map(|node| (node.field_name != TYPENAME_FIELD).then(|| compile(node, &snapshot.registry)))
            .collect();

        let mut session = ReadSession::new(self.store.as_ref());
        let mut data = IndexMap::new();
        let mut errors = Vec::new();
        let mut backlog = Backlog::default();

        for (node, query) in nodes.iter().zip(compiled) {
            let key = node.response_key();
            let value = match query {
                None => Value::String(QUERY_TYPE.to_string()),
                Some(Err(e)) => {
                    errors.push(server_error(e.to_string(), Some(key), COMPILE_ERROR));
                    Value::Null
                }
                Some(Ok(query)) => {
                    let result = match session.transaction().await {
                        Ok(tx) => tx.execute(&query).await,
                        Err(e) => Err(e),
                    };
                    match result {
                        Ok(result) => {
                            let mode = query.mode();
                            if mode.is_diagnostic() {
                                backlog.entries.push(BacklogEntry {
                                    field: key.to_string(),
                                    mode,
                                    statement: query.statement.clone(),
                                    plan: result.plan.clone(),
                                });
                            }
                            if mode == ExecutionMode::Explain {
                                Value::List(Vec::new())
                            } else {
                                reshape(result.rows, &query.plan)
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Execution of '{}' failed: {}", key, e);
                            errors.push(server_error(e.to_string(), Some(key), EXECUTION_ERROR));
                            Value::Null
                        }
                    }
                }
            };
            data.insert(async_graphql::Name::new(key), value);
        }

        session.close().await;

        QueryResponse {
            data: Value::Object(data),
            errors,
            backlog: (!backlog.entries.is_empty()).then_some(backlog),
        }
    }
}

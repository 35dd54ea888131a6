use super::types::{Direction, IndexInfo, NodeSample, RelationshipGroup, Row, StatementResult};
use super::{GraphStore, ReadTransaction};
use crate::compiler::{cypher::quote, CompiledQuery};
use crate::error::{GraphinatorError, Result};

use async_graphql::Value;
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Graph store backed by Neo4j's HTTP transactional API.
///
/// # Example
///
/// ```no_run
/// use graphinator::store::{GraphStore, Neo4jHttpStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Neo4jHttpStore::new("http://localhost:7474", "neo4j")?
///     .with_credentials("neo4j", "secret");
///
/// let tx = store.begin_read().await?;
/// let labels = tx.labels().await?;
/// tx.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Neo4jHttpStore {
    base_url: String,
    database: String,
    connection: Arc<Connection>,
}

struct Connection {
    client: Client,
    credentials: Option<(String, String)>,
}

impl Connection {
    fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }
}

impl Neo4jHttpStore {
    /// Create a store client
    ///
    /// # Arguments
    ///
    /// * `url` - HTTP endpoint of the server (e.g., "http://localhost:7474")
    /// * `database` - Database name
    pub fn new(url: &str, database: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            database: database.to_string(),
            connection: Arc::new(Connection {
                client,
                credentials: None,
            }),
        })
    }

    /// Authenticate every request with HTTP basic auth
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        let client = self.connection.client.clone();
        self.connection = Arc::new(Connection {
            client,
            credentials: Some((user.to_string(), password.to_string())),
        });
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    /// `POST /db/{database}/tx` opens a transaction; its URL is the commit
    /// URL without the trailing `/commit`.
    async fn begin_read(&self) -> Result<Box<dyn ReadTransaction>> {
        let url = format!("{}/db/{}/tx", self.base_url, self.database);
        tracing::debug!("Opening transaction at {}", url);

        let response = self
            .connection
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({ "statements": [] }))
            .send()
            .await?;
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_response(response).await?;

        let url = body
            .commit
            .as_deref()
            .and_then(|commit| commit.strip_suffix("/commit"))
            .map(str::to_string)
            .or(location)
            .ok_or_else(|| GraphinatorError::Store("Transaction URL missing from response".to_string()))?;

        Ok(Box::new(Neo4jTransaction {
            url,
            connection: Arc::clone(&self.connection),
            open: AtomicBool::new(true),
            relationship_types: OnceCell::new(),
        }))
    }
}

struct Neo4jTransaction {
    url: String,
    connection: Arc<Connection>,
    /// Cleared when a statement fails; the server has then rolled back
    open: AtomicBool,
    relationship_types: OnceCell<Vec<String>>,
}

impl Neo4jTransaction {
    /// Run one statement and return its rows keyed by column
    async fn run(&self, statement: &str, parameters: serde_json::Value) -> Result<(Vec<Row>, Option<Value>)> {
        let result = self.post(statement, parameters).await;
        if result.is_err() {
            self.open.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn post(&self, statement: &str, parameters: serde_json::Value) -> Result<(Vec<Row>, Option<Value>)> {
        let body = serde_json::json!({
            "statements": [{
                "statement": statement,
                "parameters": parameters,
                "resultDataContents": ["row"],
            }]
        });

        let response = self
            .connection
            .request(reqwest::Method::POST, &self.url)
            .json(&body)
            .send()
            .await?;
        let response = read_response(response).await?;

        let Some(result) = response.results.into_iter().next() else {
            return Ok((Vec::new(), None));
        };

        let mut rows = Vec::with_capacity(result.data.len());
        for data in result.data {
            let mut row = Row::new();
            for (column, value) in result.columns.iter().zip(data.row) {
                row.insert(column.clone(), Value::from_json(value)?);
            }
            rows.push(row);
        }

        let plan = result.profile.or(result.plan).map(Value::from_json).transpose()?;
        Ok((rows, plan))
    }

    /// Relationship types of the database, read once per transaction
    async fn relationship_types(&self) -> Result<&[String]> {
        self.relationship_types
            .get_or_try_init(|| async move {
                let (rows, _) = self
                    .run(
                        "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType",
                        serde_json::json!({}),
                    )
                    .await?;
                Ok::<_, GraphinatorError>(
                    rows.into_iter()
                        .filter_map(|mut row| match row.swap_remove("relationshipType") {
                            Some(Value::String(rel_type)) => Some(rel_type),
                            _ => None,
                        })
                        .collect(),
                )
            })
            .await
            .map(Vec::as_slice)
    }
}

/// Per type and direction degree of node `$id`; type names are bound as
/// `$type0`, `$type1`, ...
fn degree_statement(types: &[String]) -> String {
    let groups: Vec<String> = types
        .iter()
        .enumerate()
        .flat_map(|(i, rel_type)| {
            let rel_type = quote(rel_type);
            [
                format!("{{type: $type{}, outgoing: true, degree: COUNT {{ (n)-[:{}]->() }}}}", i, rel_type),
                format!("{{type: $type{}, outgoing: false, degree: COUNT {{ (n)<-[:{}]-() }}}}", i, rel_type),
            ]
        })
        .collect();

    format!(
        "MATCH (n) WHERE id(n) = $id\nUNWIND [{}] AS g\nWITH g WHERE g.degree > 0\nRETURN g.type AS type, g.outgoing AS outgoing, g.degree AS degree",
        groups.join(", ")
    )
}

fn neighbour_statement(rel_type: &str, direction: Direction) -> String {
    let (left, right) = match direction {
        Direction::Outgoing => ("-", "->"),
        Direction::Incoming => ("<-", "-"),
    };
    format!(
        "MATCH (n){}[:{}]{}(m) WHERE id(n) = $id RETURN labels(m) AS labels LIMIT 1",
        left,
        quote(rel_type),
        right
    )
}

#[async_trait]
impl ReadTransaction for Neo4jTransaction {
    async fn labels(&self) -> Result<Vec<String>> {
        let (rows, _) = self
            .run("CALL db.labels() YIELD label RETURN label", serde_json::json!({}))
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| match row.swap_remove("label") {
                Some(Value::String(label)) => Some(label),
                _ => None,
            })
            .collect())
    }

    async fn indexes(&self) -> Result<Vec<IndexInfo>> {
        let (rows, _) = self
            .run(
                "SHOW INDEXES YIELD entityType, labelsOrTypes, properties, owningConstraint \
                 WHERE entityType = 'NODE' \
                 RETURN labelsOrTypes, properties, owningConstraint",
                serde_json::json!({}),
            )
            .await?;

        let mut indexes = Vec::new();
        for row in rows {
            let properties = strings(row.get("properties"));
            let unique = !matches!(row.get("owningConstraint"), None | Some(Value::Null));
            for label in strings(row.get("labelsOrTypes")) {
                indexes.push(IndexInfo {
                    label,
                    properties: properties.clone(),
                    unique,
                });
            }
        }
        Ok(indexes)
    }

    async fn sample_nodes(&self, label: &str, limit: usize) -> Result<Vec<NodeSample>> {
        let statement = format!(
            "MATCH (n:{}) RETURN id(n) AS id, labels(n) AS labels, properties(n) AS properties LIMIT $limit",
            quote(label)
        );
        let (rows, _) = self.run(&statement, serde_json::json!({ "limit": limit })).await?;

        let mut samples = Vec::with_capacity(rows.len());
        for mut row in rows {
            let id = match row.get("id") {
                Some(Value::Number(n)) => n.as_i64(),
                _ => None,
            }
            .ok_or_else(|| GraphinatorError::Store("Sampled node without id".to_string()))?;
            let properties = match row.swap_remove("properties") {
                Some(Value::Object(properties)) => properties
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value))
                    .collect(),
                _ => IndexMap::new(),
            };
            samples.push(NodeSample {
                id,
                labels: strings(row.get("labels")),
                properties,
            });
        }
        Ok(samples)
    }

    /// Degrees come from `COUNT { ... }` subqueries, which Neo4j answers
    /// from its per-type degree counters without walking the relationships.
    /// Only groups within `dense_threshold` get a `LIMIT 1` neighbour lookup.
    async fn relationship_groups(
        &self,
        node: &NodeSample,
        dense_threshold: usize,
    ) -> Result<Vec<RelationshipGroup>> {
        let types = self.relationship_types().await?;
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let mut parameters = serde_json::Map::new();
        parameters.insert("id".to_string(), serde_json::json!(node.id));
        for (i, rel_type) in types.iter().enumerate() {
            parameters.insert(format!("type{}", i), serde_json::json!(rel_type));
        }
        let (rows, _) = self
            .run(&degree_statement(types), serde_json::Value::Object(parameters))
            .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(Value::String(rel_type)) = row.get("type") else {
                continue;
            };
            let direction = match row.get("outgoing") {
                Some(Value::Boolean(false)) => Direction::Incoming,
                _ => Direction::Outgoing,
            };
            let degree = match row.get("degree") {
                Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
                _ => 0,
            };

            let neighbor_labels = if degree <= dense_threshold {
                let (rows, _) = self
                    .run(
                        &neighbour_statement(rel_type, direction),
                        serde_json::json!({ "id": node.id }),
                    )
                    .await?;
                rows.first().map(|row| strings(row.get("labels"))).unwrap_or_default()
            } else {
                Vec::new()
            };

            groups.push(RelationshipGroup {
                rel_type: rel_type.clone(),
                direction,
                degree,
                neighbor_labels,
            });
        }
        Ok(groups)
    }

    async fn execute(&self, query: &CompiledQuery) -> Result<StatementResult> {
        tracing::debug!("Executing statement:\n{}", query.statement);
        let parameters = serde_json::to_value(&query.parameters)?;
        let (rows, plan) = self.run(&query.statement, parameters).await?;
        Ok(StatementResult { rows, plan })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Read transactions are rolled back
    async fn close(self: Box<Self>) -> Result<()> {
        let response = self
            .connection
            .request(reqwest::Method::DELETE, &self.url)
            .send()
            .await?;
        read_response(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    commit: Option<String>,
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
    #[serde(default)]
    plan: Option<serde_json::Value>,
    #[serde(default)]
    profile: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Map HTTP status and statement errors onto the crate's error type
async fn read_response(response: reqwest::Response) -> Result<TxResponse> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(GraphinatorError::Unauthorized(
                "Invalid Neo4j credentials".to_string(),
            ));
        }
        status if !status.is_success() => {
            let text = response.text().await.unwrap_or_default();
            return Err(GraphinatorError::Store(format!(
                "Request failed with status {}: {}",
                status, text
            )));
        }
        _ => {}
    }

    let body: TxResponse = response
        .json()
        .await
        .map_err(|e| GraphinatorError::Store(format!("Failed to parse response: {}", e)))?;

    if let Some(error) = body.errors.first() {
        return Err(GraphinatorError::Execution(format!("{}: {}", error.code, error.message)));
    }
    Ok(body)
}

fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

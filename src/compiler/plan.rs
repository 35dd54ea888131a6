/// Logical query plan
///
/// The compiler lowers a selection into this tree before rendering Cypher.
/// Stores that cannot run Cypher text execute the tree directly, and the
/// diagnostic directives describe it.

use crate::store::ExecutionMode;
use async_graphql::{Name, Value};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub root: NodePlan,
    pub mode: ExecutionMode,
}

/// Nodes of one label bound to one variable, with everything applied to them
#[derive(Debug, Clone, PartialEq)]
pub struct NodePlan {
    pub variable: String,
    pub label: String,
    pub filters: Vec<Filter>,
    pub order: Vec<SortKey>,
    /// Parameter holding the number of rows to skip
    pub skip: Option<String>,
    /// Parameter holding the maximum number of rows
    pub limit: Option<String>,
    pub projections: Vec<Projection>,
}

/// A predicate on the bound variable; values always live in parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Id { parameter: String },
    IdIn { parameter: String },
    Equals { property: String, parameter: String },
    AnyOf { property: String, parameter: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
    pub descending: bool,
}

/// One output key of a node and how its value is produced
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub key: String,
    pub value: ProjectionValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionValue {
    Id,
    Property(String),
    /// The label, bound as a parameter
    Typename { parameter: String },
    Expansion(Box<Expansion>),
}

/// Related nodes reached through one relationship type
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub rel_type: String,
    pub outgoing: bool,
    pub multiple: bool,
    pub node: NodePlan,
}

impl NodePlan {
    pub fn new(variable: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            label: label.into(),
            filters: Vec::new(),
            order: Vec::new(),
            skip: None,
            limit: None,
            projections: Vec::new(),
        }
    }

    pub fn expansions(&self) -> impl Iterator<Item = &Expansion> {
        self.projections.iter().filter_map(|projection| match &projection.value {
            ProjectionValue::Expansion(expansion) => Some(expansion.as_ref()),
            _ => None,
        })
    }

    fn describe_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let v = &self.variable;

        if let Some(limit) = &self.limit {
            lines.push(format!("{}Limit(${})", indent, limit));
        }
        if let Some(skip) = &self.skip {
            lines.push(format!("{}Skip(${})", indent, skip));
        }
        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|key| {
                    let direction = if key.descending { "DESC" } else { "ASC" };
                    format!("{}.{} {}", v, key.property, direction)
                })
                .collect();
            lines.push(format!("{}Sort({})", indent, keys.join(", ")));
        }
        for filter in &self.filters {
            let predicate = match filter {
                Filter::Id { parameter } => format!("id({}) = ${}", v, parameter),
                Filter::IdIn { parameter } => format!("id({}) IN ${}", v, parameter),
                Filter::Equals { property, parameter } => format!("{}.{} = ${}", v, property, parameter),
                Filter::AnyOf { property, parameter } => format!("{}.{} IN ${}", v, property, parameter),
            };
            lines.push(format!("{}Filter({})", indent, predicate));
        }
    }
}

impl QueryPlan {
    /// Operator lines, outermost first
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("ProduceResults({})", self.root.variable)];
        describe_node(&self.root, 0, &mut lines);
        lines.push(format!("NodeByLabelScan({}:{})", self.root.variable, self.root.label));
        lines
    }

    /// Plan as a response value, optionally with the number of produced rows
    pub fn to_value(&self, rows: Option<usize>) -> Value {
        let mut plan = IndexMap::new();
        plan.insert(
            Name::new("operators"),
            Value::List(self.describe().into_iter().map(Value::String).collect()),
        );
        if let Some(rows) = rows {
            plan.insert(Name::new("rows"), Value::from(rows as u64));
        }
        Value::Object(plan)
    }
}

fn describe_node(node: &NodePlan, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for expansion in node.expansions() {
        let (left, right) = if expansion.outgoing { ("-", "->") } else { ("<-", "-") };
        let aggregate = if expansion.multiple { "collect" } else { "head(collect)" };
        lines.push(format!(
            "{}Apply({} {})",
            indent, aggregate, expansion.node.variable
        ));
        describe_node(&expansion.node, depth + 1, lines);
        lines.push(format!(
            "{}  Expand({}){}[:{}]{}({}:{})",
            indent,
            node.variable,
            left,
            expansion.rel_type,
            right,
            expansion.node.variable,
            expansion.node.label
        ));
    }
    node.describe_into(depth, lines);
}

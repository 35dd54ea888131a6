/// GraphQL selection to Cypher compilation
///
/// A root `QueryNode` is checked against the registry layout of its label and
/// lowered into a `QueryPlan`, which is then rendered as one Cypher
/// statement with all values bound as parameters.

pub mod cypher;
pub mod plan;
pub mod query_node;
pub mod reshape;

pub use plan::{Expansion, Filter, NodePlan, Projection, ProjectionValue, QueryPlan, SortKey};
pub use query_node::{bind_variables, merge_nodes, BoundVariables, Directive, Lowering, QueryNode};
pub use reshape::reshape;

use crate::error::CompileError;
use crate::registry::{
    ArgumentKind, FieldKind, PropertyType, TypeLayout, TypeRegistry, QUERY_TYPE, TYPENAME_FIELD,
};
use crate::store::ExecutionMode;

use async_graphql::Value;
use indexmap::IndexMap;
use std::collections::HashSet;

/// One statement ready for a store
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub statement: String,
    pub parameters: IndexMap<String, Value>,
    pub plan: QueryPlan,
}

impl CompiledQuery {
    pub fn mode(&self) -> ExecutionMode {
        self.plan.mode
    }
}

/// Compile one root field selection against a registry snapshot.
///
/// The output depends only on the node and the registry, so compiling the
/// same selection twice yields the same statement and parameters.
pub fn compile(node: &QueryNode, registry: &TypeRegistry) -> Result<CompiledQuery, CompileError> {
    let layout = registry
        .layout(&node.field_name)
        .ok_or_else(|| CompileError::UnknownField {
            type_name: QUERY_TYPE.to_string(),
            field: node.field_name.clone(),
        })?;

    for directive in &node.directives {
        if let Directive::Other(name) = directive {
            return Err(CompileError::UnsupportedDirective {
                directive: name.clone(),
                field: node.field_name.clone(),
            });
        }
    }

    let mut scope = Scope::default();
    let variable = scope.variable(node.response_key());
    let root = Compiler {
        registry,
        scope: &mut scope,
    }
    .node(node, layout, QUERY_TYPE, variable, true)?;

    let plan = QueryPlan {
        root,
        mode: node.mode(),
    };
    let statement = cypher::render(&plan);
    tracing::debug!("Compiled '{}' into:\n{}", node.response_key(), statement);

    Ok(CompiledQuery {
        statement,
        parameters: scope.parameters,
        plan,
    })
}

/// Names handed out while compiling one statement
#[derive(Default)]
struct Scope {
    variables: HashSet<String>,
    parameters: IndexMap<String, Value>,
}

impl Scope {
    fn variable(&mut self, base: &str) -> String {
        let name = unique(base, |candidate| self.variables.contains(candidate));
        self.variables.insert(name.clone());
        name
    }

    fn parameter(&mut self, variable: &str, argument: &str, value: Value) -> String {
        let mut base = format!("{}_{}", variable, argument);
        if base.starts_with('_') {
            base.insert(0, 'p');
        }
        let name = unique(&base, |candidate| self.parameters.contains_key(candidate));
        self.parameters.insert(name.clone(), value);
        name
    }
}

fn unique(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

struct Compiler<'a> {
    registry: &'a TypeRegistry,
    scope: &'a mut Scope,
}

impl Compiler<'_> {
    /// `owner` is the type declaring `node` as a field
    fn node(
        &mut self,
        node: &QueryNode,
        layout: &TypeLayout,
        owner: &str,
        variable: String,
        paginated: bool,
    ) -> Result<NodePlan, CompileError> {
        if !node.has_selection {
            return Err(CompileError::MissingSelection {
                type_name: owner.to_string(),
                field: node.field_name.clone(),
            });
        }

        let mut plan = NodePlan::new(variable, layout.label.clone());
        self.arguments(node, layout, owner, paginated, &mut plan)?;

        for child in &node.children {
            if let Some(directive) = child.directives.first() {
                return Err(CompileError::UnsupportedDirective {
                    directive: directive.name().to_string(),
                    field: child.field_name.clone(),
                });
            }

            let value = if child.field_name == TYPENAME_FIELD {
                self.scalar(child, layout)?;
                let parameter = self.scope.parameter(
                    &plan.variable,
                    "label",
                    Value::String(layout.label.clone()),
                );
                ProjectionValue::Typename { parameter }
            } else {
                let field = layout
                    .field(&child.field_name)
                    .ok_or_else(|| CompileError::UnknownField {
                        type_name: layout.label.clone(),
                        field: child.field_name.clone(),
                    })?;

                match field {
                    FieldKind::Id => {
                        self.scalar(child, layout)?;
                        ProjectionValue::Id
                    }
                    FieldKind::Property(info) => {
                        self.scalar(child, layout)?;
                        ProjectionValue::Property(info.name.clone())
                    }
                    FieldKind::Relationship(info) => {
                        let registry = self.registry;
                        let other = registry.layout(&info.other_label).ok_or_else(|| {
                            CompileError::UnknownField {
                                type_name: layout.label.clone(),
                                field: child.field_name.clone(),
                            }
                        })?;
                        let variable = self
                            .scope
                            .variable(&format!("{}_{}", plan.variable, child.response_key()));
                        let nested = self.node(child, other, &layout.label, variable, info.multiple)?;
                        ProjectionValue::Expansion(Box::new(Expansion {
                            rel_type: info.rel_type.clone(),
                            outgoing: info.outgoing,
                            multiple: info.multiple,
                            node: nested,
                        }))
                    }
                }
            };

            plan.projections.push(Projection {
                key: child.response_key().to_string(),
                value,
            });
        }

        Ok(plan)
    }

    /// Scalars take neither arguments nor a selection
    fn scalar(&self, child: &QueryNode, layout: &TypeLayout) -> Result<(), CompileError> {
        if child.has_selection {
            return Err(CompileError::UnexpectedSelection {
                field: child.field_name.clone(),
            });
        }
        if let Some(argument) = child.arguments.keys().next() {
            return Err(CompileError::UnknownArgument {
                type_name: layout.label.clone(),
                field: child.field_name.clone(),
                argument: argument.clone(),
            });
        }
        Ok(())
    }

    fn arguments(
        &mut self,
        node: &QueryNode,
        layout: &TypeLayout,
        owner: &str,
        paginated: bool,
        plan: &mut NodePlan,
    ) -> Result<(), CompileError> {
        for (name, value) in &node.arguments {
            let kind = layout
                .argument(name, paginated)
                .ok_or_else(|| CompileError::UnknownArgument {
                    type_name: owner.to_string(),
                    field: node.field_name.clone(),
                    argument: name.clone(),
                })?;

            if matches!(value, Value::Null) {
                continue;
            }

            let invalid = |reason: String| CompileError::InvalidArgument {
                field: node.field_name.clone(),
                argument: name.clone(),
                reason,
            };

            match kind {
                ArgumentKind::Id => {
                    if !is_identifier(value) {
                        return Err(invalid("expected an ID".to_string()));
                    }
                    let parameter = self.scope.parameter(&plan.variable, name, value.clone());
                    plan.filters.push(Filter::Id { parameter });
                }
                ArgumentKind::Ids => {
                    let ids = as_list(value);
                    if !ids.iter().all(is_identifier) {
                        return Err(invalid("expected a list of IDs".to_string()));
                    }
                    let parameter = self.scope.parameter(&plan.variable, name, Value::List(ids));
                    plan.filters.push(Filter::IdIn { parameter });
                }
                ArgumentKind::Equals(info) => {
                    if !info.inferred_type.accepts(value) {
                        return Err(invalid(format!("expected {}", info.inferred_type)));
                    }
                    let value = if info.inferred_type.is_list() {
                        Value::List(as_list(value))
                    } else {
                        value.clone()
                    };
                    let parameter = self.scope.parameter(&plan.variable, name, value);
                    plan.filters.push(Filter::Equals {
                        property: info.name.clone(),
                        parameter,
                    });
                }
                ArgumentKind::AnyOf(info) => {
                    let values = as_list(value);
                    let accepted = values
                        .iter()
                        .all(|item| matches!(item, Value::Null) || info.inferred_type.accepts(item));
                    if !accepted {
                        return Err(invalid(format!("expected a list of {}", info.inferred_type)));
                    }
                    let parameter = self.scope.parameter(&plan.variable, name, Value::List(values));
                    plan.filters.push(Filter::AnyOf {
                        property: info.name.clone(),
                        parameter,
                    });
                }
                ArgumentKind::First | ArgumentKind::Offset => {
                    if !PropertyType::Integer.accepts(value) || is_negative(value) {
                        return Err(invalid("expected a non-negative integer".to_string()));
                    }
                    let parameter = self.scope.parameter(&plan.variable, name, value.clone());
                    if matches!(kind, ArgumentKind::First) {
                        plan.limit = Some(parameter);
                    } else {
                        plan.skip = Some(parameter);
                    }
                }
                ArgumentKind::OrderBy => {
                    for item in as_list(value) {
                        let ordering = match &item {
                            Value::Enum(ordering) => ordering.to_string(),
                            _ => return Err(invalid("expected ordering enum values".to_string())),
                        };
                        let (property, descending) = layout
                            .ordering_for(&ordering)
                            .ok_or_else(|| invalid(format!("unknown ordering '{}'", ordering)))?;
                        plan.order.push(SortKey {
                            property,
                            descending,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Input coercion: a single value stands for a one-element list
fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn is_identifier(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Number(n) => n.is_i64() || n.is_u64(),
        _ => false,
    }
}

fn is_negative(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.as_i64().is_some_and(|n| n < 0))
}

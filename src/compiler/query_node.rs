use crate::error::CompileError;
use crate::registry::{is_ordering_type_name, ORDER_BY_ARGUMENT};
use crate::store::ExecutionMode;

use async_graphql::parser::types::{
    BaseType, Directive as DirectiveNode, Field, FragmentDefinition, OperationDefinition, Selection,
    SelectionSet, Type,
};
use async_graphql::parser::Positioned;
use async_graphql::{Name, SelectionField, Value, Variables};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Operation variables after defaults were applied, keyed by name
pub type BoundVariables = IndexMap<String, Value>;

/// Directive kept on a selection after `@skip` / `@include` were evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Profile,
    Explain,
    Other(String),
}

impl Directive {
    pub fn named(name: &str) -> Self {
        match name {
            "profile" => Directive::Profile,
            "explain" => Directive::Explain,
            other => Directive::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Directive::Profile => "profile",
            Directive::Explain => "explain",
            Directive::Other(name) => name,
        }
    }
}

/// One field selection with its arguments resolved to constants
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub field_name: String,
    pub alias: Option<String>,
    pub arguments: IndexMap<String, Value>,
    pub directives: Vec<Directive>,
    pub children: Vec<QueryNode>,
    /// The field carried a selection set, even if every entry was skipped
    pub has_selection: bool,
}

impl QueryNode {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            alias: None,
            arguments: IndexMap::new(),
            directives: Vec::new(),
            children: Vec::new(),
            has_selection: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn with_child(mut self, child: QueryNode) -> Self {
        self.children.push(child);
        self.has_selection = true;
        self
    }

    /// Key of this selection in the response: the alias, else the field name
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.field_name)
    }

    /// `@profile` wins over `@explain`
    pub fn mode(&self) -> ExecutionMode {
        if self.directives.contains(&Directive::Profile) {
            ExecutionMode::Profile
        } else if self.directives.contains(&Directive::Explain) {
            ExecutionMode::Explain
        } else {
            ExecutionMode::Run
        }
    }

    /// Lower a field as seen by an async-graphql resolver. Returns `None`
    /// when the field is skipped.
    pub fn from_selection(field: &SelectionField<'_>) -> Result<Option<Self>, CompileError> {
        let directives = field
            .directives()
            .map_err(|err| CompileError::Syntax(err.message))?;

        let mut node = QueryNode::new(field.name());
        node.alias = field.alias().map(str::to_string);

        for directive in &directives {
            let name = directive.name.node.as_str();
            if name == "skip" || name == "include" {
                let condition = directive
                    .arguments
                    .iter()
                    .find(|(argument, _)| argument.node.as_str() == "if")
                    .map(|(_, value)| value.node.clone());
                if !condition_holds(name, condition, field.name())? {
                    return Ok(None);
                }
            } else {
                node.directives.push(Directive::named(name));
            }
        }

        for (name, value) in field
            .arguments()
            .map_err(|err| CompileError::Syntax(err.message))?
        {
            // The schema has already validated orderBy against its enum
            let value = if name.as_str() == ORDER_BY_ARGUMENT {
                enum_values(value)
            } else {
                value
            };
            node.arguments.insert(name.to_string(), value);
        }

        let mut children = Vec::new();
        for child in field.selection_set() {
            node.has_selection = true;
            if let Some(child) = QueryNode::from_selection(&child)? {
                children.push(child);
            }
        }
        node.children = merge_nodes(children)?;

        Ok(Some(node))
    }
}

/// Apply declared defaults to the request's variables. Declared variables
/// without a value or default bind to null.
pub fn bind_variables(operation: &OperationDefinition, provided: &Variables) -> BoundVariables {
    operation
        .variable_definitions
        .iter()
        .map(|definition| {
            let name = &definition.node.name.node;
            let value = provided
                .get(name)
                .cloned()
                .or_else(|| {
                    definition
                        .node
                        .default_value
                        .as_ref()
                        .map(|default| default.node.clone())
                })
                .unwrap_or(Value::Null);
            // JSON variables carry enum values as strings
            let value = if is_ordering_type_name(named_type(&definition.node.var_type.node)) {
                enum_values(value)
            } else {
                value
            };
            (name.to_string(), value)
        })
        .collect()
}

fn named_type(ty: &Type) -> &str {
    match &ty.base {
        BaseType::Named(name) => name.as_str(),
        BaseType::List(inner) => named_type(inner),
    }
}

fn enum_values(value: Value) -> Value {
    match value {
        Value::String(value) => Value::Enum(Name::new(value)),
        Value::List(items) => Value::List(items.into_iter().map(enum_values).collect()),
        other => other,
    }
}

/// Turns a parsed selection set into query nodes: fragments are flattened,
/// `@skip` / `@include` evaluated, variables substituted and fields sharing a
/// response key merged.
pub struct Lowering<'a> {
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'a BoundVariables,
}

impl<'a> Lowering<'a> {
    pub fn new(
        fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
        variables: &'a BoundVariables,
    ) -> Self {
        Self {
            fragments,
            variables,
        }
    }

    pub fn selection_set(&self, set: &SelectionSet) -> Result<Vec<QueryNode>, CompileError> {
        let mut nodes = Vec::new();
        self.collect(set, &mut nodes, &mut Vec::new())?;
        merge_nodes(nodes)
    }

    fn collect(
        &self,
        set: &SelectionSet,
        out: &mut Vec<QueryNode>,
        spreading: &mut Vec<String>,
    ) -> Result<(), CompileError> {
        for item in &set.items {
            match &item.node {
                Selection::Field(field) => {
                    if let Some(node) = self.field(&field.node)? {
                        out.push(node);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    let name = &spread.node.fragment_name.node;
                    if !self.included(&spread.node.directives, name.as_str())? {
                        continue;
                    }
                    if spreading.iter().any(|active| active == name.as_str()) {
                        return Err(CompileError::Syntax(format!(
                            "Fragment '{}' spreads itself",
                            name
                        )));
                    }
                    let fragment = self
                        .fragments
                        .get(name)
                        .ok_or_else(|| CompileError::UnknownFragment(name.to_string()))?;

                    spreading.push(name.to_string());
                    self.collect(&fragment.node.selection_set.node, out, spreading)?;
                    spreading.pop();
                }
                Selection::InlineFragment(fragment) => {
                    if !self.included(&fragment.node.directives, "...")? {
                        continue;
                    }
                    self.collect(&fragment.node.selection_set.node, out, spreading)?;
                }
            }
        }
        Ok(())
    }

    /// Lower one field, `None` when it is skipped
    pub fn field(&self, field: &Field) -> Result<Option<QueryNode>, CompileError> {
        let name = field.name.node.as_str();
        if !self.included(&field.directives, name)? {
            return Ok(None);
        }

        let mut node = QueryNode::new(name);
        node.alias = field.alias.as_ref().map(|alias| alias.node.to_string());

        for (argument, value) in &field.arguments {
            let value = value
                .node
                .clone()
                .into_const_with(|variable| self.variable(&variable))?;
            node.arguments.insert(argument.node.to_string(), value);
        }

        for directive in &field.directives {
            let directive_name = directive.node.name.node.as_str();
            if directive_name != "skip" && directive_name != "include" {
                node.directives.push(Directive::named(directive_name));
            }
        }

        node.has_selection = !field.selection_set.node.items.is_empty();
        node.children = self.selection_set(&field.selection_set.node)?;

        Ok(Some(node))
    }

    fn included(
        &self,
        directives: &[Positioned<DirectiveNode>],
        field: &str,
    ) -> Result<bool, CompileError> {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            if name != "skip" && name != "include" {
                continue;
            }

            let mut condition = None;
            for (argument, value) in &directive.node.arguments {
                if argument.node.as_str() == "if" {
                    let value = value
                        .node
                        .clone()
                        .into_const_with(|variable| self.variable(&variable))?;
                    condition = Some(value);
                }
            }

            if !condition_holds(name, condition, field)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn variable(&self, name: &Name) -> Result<Value, CompileError> {
        self.variables
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| CompileError::UndeclaredVariable(name.to_string()))
    }
}

/// Whether a field survives one `@skip` / `@include` directive
fn condition_holds(directive: &str, condition: Option<Value>, field: &str) -> Result<bool, CompileError> {
    match condition {
        Some(Value::Boolean(condition)) => Ok(if directive == "skip" { !condition } else { condition }),
        _ => Err(CompileError::InvalidArgument {
            field: field.to_string(),
            argument: "if".to_string(),
            reason: format!("@{} requires a Boolean condition", directive),
        }),
    }
}

/// Merge selections sharing a response key. They must select the same field
/// with the same arguments.
pub fn merge_nodes(nodes: Vec<QueryNode>) -> Result<Vec<QueryNode>, CompileError> {
    let mut merged: IndexMap<String, QueryNode> = IndexMap::new();

    for node in nodes {
        let key = node.response_key().to_string();
        let Some(existing) = merged.get_mut(&key) else {
            merged.insert(key, node);
            continue;
        };

        if existing.field_name != node.field_name || existing.arguments != node.arguments {
            return Err(CompileError::ConflictingFields {
                key,
                first: existing.field_name.clone(),
                second: node.field_name,
            });
        }

        existing.has_selection |= node.has_selection;
        for directive in node.directives {
            if !existing.directives.contains(&directive) {
                existing.directives.push(directive);
            }
        }
        let mut children = std::mem::take(&mut existing.children);
        children.extend(node.children);
        existing.children = merge_nodes(children)?;
    }

    Ok(merged.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::parser::parse_query;
    use async_graphql::parser::types::DocumentOperations;

    fn lower(query: &str, variables: BoundVariables) -> Result<Vec<QueryNode>, CompileError> {
        let document = parse_query(query).unwrap();
        let operation = match &document.operations {
            DocumentOperations::Single(operation) => operation.clone(),
            DocumentOperations::Multiple(operations) => operations.values().next().unwrap().clone(),
        };
        Lowering::new(&document.fragments, &variables).selection_set(&operation.node.selection_set.node)
    }

    #[test]
    fn test_lower_simple_selection() {
        let nodes = lower(r#"{ people: Person(name: "Meg Ryan") { name born } }"#, BoundVariables::new()).unwrap();

        assert_eq!(nodes.len(), 1);
        let person = &nodes[0];
        assert_eq!(person.field_name, "Person");
        assert_eq!(person.response_key(), "people");
        assert_eq!(person.arguments["name"], Value::String("Meg Ryan".to_string()));
        let children: Vec<&str> = person.children.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(children, vec!["name", "born"]);
    }

    #[test]
    fn test_variables_are_substituted() {
        let mut variables = BoundVariables::new();
        variables.insert("born".to_string(), Value::Number(1961.into()));

        let nodes = lower("query($born: Long) { Person(born: $born) { name } }", variables).unwrap();
        assert_eq!(nodes[0].arguments["born"], Value::Number(1961.into()));
    }

    #[test]
    fn test_undeclared_variable_is_rejected() {
        let err = lower("{ Person(born: $born) { name } }", BoundVariables::new()).unwrap_err();
        assert_eq!(err, CompileError::UndeclaredVariable("born".to_string()));
    }

    #[test]
    fn test_fragments_are_flattened_and_merged() {
        let query = r#"
            { Person { name ...Details ... { born } } }
            fragment Details on Person { name born }
        "#;
        let nodes = lower(query, BoundVariables::new()).unwrap();

        let children: Vec<&str> = nodes[0].children.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(children, vec!["name", "born"]);
    }

    #[test]
    fn test_unknown_fragment() {
        let err = lower("{ Person { ...Missing } }", BoundVariables::new()).unwrap_err();
        assert_eq!(err, CompileError::UnknownFragment("Missing".to_string()));
    }

    #[test]
    fn test_skip_and_include() {
        let mut variables = BoundVariables::new();
        variables.insert("withBorn".to_string(), Value::Boolean(false));

        let query = "query($withBorn: Boolean) { Person { name @skip(if: true) born @include(if: $withBorn) _id } }";
        let nodes = lower(query, variables).unwrap();

        let children: Vec<&str> = nodes[0].children.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(children, vec!["_id"]);
    }

    #[test]
    fn test_conflicting_response_keys() {
        let err = lower("{ Person { x: name x: born } }", BoundVariables::new()).unwrap_err();
        assert!(matches!(err, CompileError::ConflictingFields { ref key, .. } if key == "x"));
    }

    #[test]
    fn test_diagnostic_directives_are_kept() {
        let nodes = lower("{ Person @explain @profile { name } }", BoundVariables::new()).unwrap();

        assert_eq!(nodes[0].directives, vec![Directive::Explain, Directive::Profile]);
        assert_eq!(nodes[0].mode(), ExecutionMode::Profile);
    }

    #[test]
    fn test_bind_variables_applies_defaults() {
        let document = parse_query("query($a: Int = 3, $b: String, $c: Int) { Person { name } }").unwrap();
        let DocumentOperations::Single(operation) = &document.operations else {
            panic!("expected a single operation");
        };
        let provided = Variables::from_json(serde_json::json!({ "c": 7 }));

        let bound = bind_variables(&operation.node, &provided);
        assert_eq!(bound["a"], Value::Number(3.into()));
        assert_eq!(bound["b"], Value::Null);
        assert_eq!(bound["c"], Value::Number(7.into()));
    }

    #[test]
    fn test_ordering_variables_bind_as_enums() {
        let document = parse_query("query($order: [_MovieOrdering!], $title: String) { Movie { title } }").unwrap();
        let DocumentOperations::Single(operation) = &document.operations else {
            panic!("expected a single operation");
        };
        let provided = Variables::from_json(serde_json::json!({
            "order": ["released_desc"],
            "title": "released_desc"
        }));

        let bound = bind_variables(&operation.node, &provided);
        assert_eq!(bound["order"], Value::List(vec![Value::Enum(Name::new("released_desc"))]));
        assert_eq!(bound["title"], Value::String("released_desc".to_string()));
    }

    #[test]
    fn test_builder_helpers() {
        let node = QueryNode::new("Person")
            .with_alias("people")
            .with_argument("first", Value::Number(2.into()))
            .with_child(QueryNode::new("name"));

        assert_eq!(node.response_key(), "people");
        assert!(node.has_selection);
        assert_eq!(node.mode(), ExecutionMode::Run);
    }
}

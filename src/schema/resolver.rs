/// GraphQL resolvers for the generated schema
///
/// Root fields compile their whole selection into one statement and run it;
/// nested fields only read their entry from the already shaped parent value.

use crate::compiler::{compile, reshape, QueryNode};
use crate::error::Result;
use crate::registry::{RelationshipInfo, TypeLayout, TypeRegistry};
use crate::schema::type_mapping::argument_type_ref;
use crate::store::GraphStore;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, ResolverContext, TypeRef};
use async_graphql::Value;
use std::sync::Arc;

/// Create the query-root field for a label
///
/// The resolver reads the graph store and registry from the schema data.
pub fn create_root_resolver(layout: &TypeLayout) -> Result<Field> {
    let mut field = Field::new(
        layout.label.clone(),
        TypeRef::named_list(&layout.label),
        move |ctx: ResolverContext| {
            FieldFuture::new(async move {
                let store = ctx
                    .data::<Arc<dyn GraphStore>>()
                    .map_err(|_e| "No graph store attached to the schema")?;
                let registry = ctx
                    .data::<Arc<TypeRegistry>>()
                    .map_err(|_e| "No type registry attached to the schema")?;

                let Some(node) = QueryNode::from_selection(&ctx.field())
                    .map_err(|e| format!("Compile error: {}", e))?
                else {
                    return Ok(None);
                };
                let compiled = compile(&node, registry).map_err(|e| format!("Compile error: {}", e))?;

                let tx = store
                    .begin_read()
                    .await
                    .map_err(|e| format!("Failed to open transaction: {}", e))?;
                let result = tx.execute(&compiled).await;
                if let Err(e) = tx.close().await {
                    tracing::warn!("Failed to close transaction: {}", e);
                }
                let result = result.map_err(|e| format!("Query execution failed: {}", e))?;

                let Value::List(rows) = reshape(result.rows, &compiled.plan) else {
                    return Ok(None);
                };
                Ok(Some(FieldValue::list(rows.into_iter().map(FieldValue::owned_any))))
            })
        },
    );

    for (name, kind) in layout.arguments(true) {
        field = field.argument(InputValue::new(name.clone(), argument_type_ref(layout, kind)?));
    }
    Ok(field)
}

/// Create a field that reads a scalar from the parent object
pub fn create_scalar_resolver(name: &str, type_ref: TypeRef) -> Field {
    Field::new(name, type_ref, move |ctx: ResolverContext| {
        FieldFuture::new(async move {
            let value = parent_entry(&ctx)?;
            Ok(value.map(FieldValue::value))
        })
    })
}

/// Create a relationship field; arguments mirror the other label's root field
pub fn create_relationship_resolver(info: &RelationshipInfo, other: &TypeLayout) -> Result<Field> {
    let type_ref = if info.multiple {
        TypeRef::named_list(&info.other_label)
    } else {
        TypeRef::named(&info.other_label)
    };

    let mut field = Field::new(info.field_name.clone(), type_ref, move |ctx: ResolverContext| {
        FieldFuture::new(async move {
            Ok(match parent_entry(&ctx)? {
                Some(Value::List(items)) => Some(FieldValue::list(items.into_iter().map(FieldValue::owned_any))),
                Some(Value::Null) | None => None,
                Some(object) => Some(FieldValue::owned_any(object)),
            })
        })
    });

    for (name, kind) in other.arguments(info.multiple) {
        field = field.argument(InputValue::new(name.clone(), argument_type_ref(other, kind)?));
    }
    Ok(field)
}

/// Value stored under this field's response key in the parent object
fn parent_entry(ctx: &ResolverContext<'_>) -> std::result::Result<Option<Value>, async_graphql::Error> {
    let parent = ctx.parent_value.try_downcast_ref::<Value>()?;
    let selection = ctx.field();
    let key = selection.alias().unwrap_or(selection.name());

    if let Value::Object(object) = parent {
        return Ok(object.get(key).cloned());
    }
    Ok(None)
}

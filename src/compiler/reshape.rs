use super::plan::{NodePlan, ProjectionValue, QueryPlan};
use crate::store::Row;

use async_graphql::{Name, Value};
use indexmap::IndexMap;

/// Shape store rows into the list returned for one root field.
///
/// Rows keep the store's order. Every object is re-keyed in selection order
/// and missing keys become null. A single relationship delivered as a list
/// collapses to its first element; a multiple one delivered as a single
/// value is wrapped.
pub fn reshape(rows: Vec<Row>, plan: &QueryPlan) -> Value {
    Value::List(
        rows.into_iter()
            .map(|mut row| {
                let object = plan
                    .root
                    .projections
                    .iter()
                    .map(|projection| {
                        let value = row.swap_remove(&projection.key).unwrap_or(Value::Null);
                        (Name::new(&projection.key), shape_value(value, &projection.value))
                    })
                    .collect();
                Value::Object(object)
            })
            .collect(),
    )
}

fn shape_value(value: Value, projection: &ProjectionValue) -> Value {
    let ProjectionValue::Expansion(expansion) = projection else {
        return value;
    };
    let node = &expansion.node;

    if expansion.multiple {
        match value {
            Value::Null => Value::List(Vec::new()),
            Value::List(items) => Value::List(items.into_iter().map(|item| shape_object(item, node)).collect()),
            single => Value::List(vec![shape_object(single, node)]),
        }
    } else {
        match value {
            Value::List(items) => items
                .into_iter()
                .next()
                .map(|item| shape_object(item, node))
                .unwrap_or(Value::Null),
            Value::Null => Value::Null,
            single => shape_object(single, node),
        }
    }
}

fn shape_object(value: Value, node: &NodePlan) -> Value {
    let Value::Object(mut fields) = value else {
        return Value::Null;
    };

    let object: IndexMap<Name, Value> = node
        .projections
        .iter()
        .map(|projection| {
            let value = fields.swap_remove(projection.key.as_str()).unwrap_or(Value::Null);
            (Name::new(&projection.key), shape_value(value, &projection.value))
        })
        .collect();
    Value::Object(object)
}

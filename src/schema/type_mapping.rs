/// Inferred property types to GraphQL types
///
/// String → `String`, Integer → `Long`, Float → `Float`, Boolean → `Boolean`,
/// List(T) → `[T]`. Values of an unrecognised class cannot be represented and
/// fail the schema build.

use crate::error::{GraphinatorError, Result};
use crate::registry::{ArgumentKind, PropertyInfo, PropertyType, TypeLayout, LONG_SCALAR};

use async_graphql::dynamic::TypeRef;

/// Map an inferred property type to a nullable GraphQL type
///
/// # Arguments
///
/// * `owner` - Label declaring the property (for error messages)
/// * `property` - The inferred property
pub fn property_type_ref(owner: &str, property: &PropertyInfo) -> Result<TypeRef> {
    to_type_ref(&property.inferred_type).ok_or_else(|| {
        GraphinatorError::SchemaBuild(format!(
            "Property '{}.{}' has unsupported type {}",
            owner, property.name, property.inferred_type
        ))
    })
}

fn to_type_ref(property_type: &PropertyType) -> Option<TypeRef> {
    Some(match property_type {
        PropertyType::String => TypeRef::named(TypeRef::STRING),
        PropertyType::Integer => TypeRef::named(LONG_SCALAR),
        PropertyType::Float => TypeRef::named(TypeRef::FLOAT),
        PropertyType::Boolean => TypeRef::named(TypeRef::BOOLEAN),
        PropertyType::List(element) => TypeRef::List(Box::new(to_type_ref(element)?)),
        PropertyType::Unsupported(_) => return None,
    })
}

/// GraphQL type of a filter or modifier argument on fields returning `layout`
pub fn argument_type_ref(layout: &TypeLayout, kind: &ArgumentKind) -> Result<TypeRef> {
    Ok(match kind {
        ArgumentKind::Id => TypeRef::named(TypeRef::ID),
        ArgumentKind::Ids => TypeRef::named_list(TypeRef::ID),
        ArgumentKind::Equals(property) => property_type_ref(&layout.label, property)?,
        ArgumentKind::AnyOf(property) => TypeRef::List(Box::new(property_type_ref(&layout.label, property)?)),
        ArgumentKind::First | ArgumentKind::Offset => TypeRef::named(TypeRef::INT),
        ArgumentKind::OrderBy => match &layout.ordering {
            Some(ordering) => TypeRef::named_list(ordering),
            None => {
                return Err(GraphinatorError::SchemaBuild(format!(
                    "Label '{}' has no ordering type",
                    layout.label
                )))
            }
        },
    })
}

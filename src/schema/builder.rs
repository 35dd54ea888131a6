/// GraphQL schema builder
///
/// This module provides the `SchemaBuilder` which projects a type registry
/// into a dynamic GraphQL schema: one object type and one root field per
/// exposed label, plus ordering enums and the `Long` scalar.

use crate::error::{GraphinatorError, Result};
use crate::registry::{FieldKind, TypeLayout, TypeRegistry, QUERY_TYPE};
use crate::schema::resolver::{create_relationship_resolver, create_root_resolver, create_scalar_resolver};
use crate::schema::scalars::register_custom_scalars;
use crate::schema::type_mapping::property_type_ref;
use crate::store::GraphStore;

use async_graphql::dynamic::{Enum, EnumItem, Object, Schema, TypeRef};
use std::sync::Arc;

/// Schema builder for generating GraphQL schemas from a type registry
#[derive(Default)]
pub struct SchemaBuilder {
    /// Store the generated root resolvers execute against
    store: Option<Arc<dyn GraphStore>>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the store so the schema can execute queries on its own
    pub fn with_store(mut self, store: Arc<dyn GraphStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the complete GraphQL schema
    ///
    /// Object types refer to each other by name only, and the schema resolves
    /// those names once every type has been registered, so relationship
    /// cycles need no ordering.
    ///
    /// # Arguments
    ///
    /// * `registry` - Snapshot to project
    ///
    /// # Returns
    ///
    /// A dynamic GraphQL schema with query resolvers
    pub fn build(&self, registry: Arc<TypeRegistry>) -> Result<Schema> {
        let layouts: Vec<&TypeLayout> = registry.layouts().collect();
        if layouts.is_empty() {
            return Err(GraphinatorError::SchemaBuild(
                "No labels to expose".to_string(),
            ));
        }

        let mut query = Object::new(QUERY_TYPE);
        let mut schema_builder = Schema::build(QUERY_TYPE, None, None);

        for scalar in register_custom_scalars() {
            schema_builder = schema_builder.register(scalar);
        }

        for layout in &layouts {
            tracing::debug!("Building schema for label: {}", layout.label);

            schema_builder = schema_builder.register(self.build_object(layout, &registry)?);
            if let Some(ordering) = build_ordering(layout) {
                schema_builder = schema_builder.register(ordering);
            }
            query = query.field(create_root_resolver(layout)?);
        }

        schema_builder = schema_builder.register(query);
        if let Some(store) = &self.store {
            schema_builder = schema_builder.data(Arc::clone(store));
        }

        let schema = schema_builder
            .data(Arc::clone(&registry))
            .finish()
            .map_err(|e| GraphinatorError::SchemaBuild(format!("Failed to build schema: {}", e)))?;

        tracing::info!(
            "Built schema version {} with {} types",
            registry.version(),
            layouts.len()
        );
        Ok(schema)
    }

    /// Build the object type of one label
    fn build_object(&self, layout: &TypeLayout, registry: &TypeRegistry) -> Result<Object> {
        let mut object = Object::new(&layout.label);

        if let Some(metadata) = registry.get(&layout.label) {
            if !metadata.extra_labels.is_empty() {
                let labels: Vec<&str> = metadata.extra_labels.iter().map(String::as_str).collect();
                object = object.description(format!("Also labelled: {}", labels.join(", ")));
            }
        }

        for (name, kind) in &layout.fields {
            let field = match kind {
                FieldKind::Id => create_scalar_resolver(name, TypeRef::named_nn(TypeRef::ID)),
                FieldKind::Property(info) => create_scalar_resolver(name, property_type_ref(&layout.label, info)?),
                FieldKind::Relationship(info) => {
                    let other = registry.layout(&info.other_label).ok_or_else(|| {
                        GraphinatorError::SchemaBuild(format!(
                            "Relationship '{}' points at unknown type '{}'",
                            info.field_name, info.other_label
                        ))
                    })?;
                    create_relationship_resolver(info, other)?
                }
            };
            object = object.field(field);
        }

        Ok(object)
    }
}

/// `_<Label>Ordering` with `<property>_asc` / `<property>_desc` values
fn build_ordering(layout: &TypeLayout) -> Option<Enum> {
    let name = layout.ordering.as_ref()?;
    Some(
        layout
            .ordering_values()
            .into_iter()
            .fold(Enum::new(name), |ordering, value| ordering.item(EnumItem::new(value))),
    )
}

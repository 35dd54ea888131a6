/// GraphQL schema generation from the type registry
///
/// This module provides functionality to project inferred graph types into a
/// GraphQL schema, including type mapping, resolvers, and dynamic schema
/// building.

mod builder;
mod resolver;
mod scalars;
mod type_mapping;

pub use builder::SchemaBuilder;
pub use resolver::{create_relationship_resolver, create_root_resolver, create_scalar_resolver};
pub use scalars::register_custom_scalars;
pub use type_mapping::{argument_type_ref, property_type_ref};

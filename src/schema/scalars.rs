/// Custom GraphQL scalar for 64-bit integers
///
/// Graph stores keep integers as 64-bit values, which GraphQL's `Int` cannot
/// carry. Integer properties and arguments use `Long` instead.

use crate::registry::LONG_SCALAR;

use async_graphql::dynamic::Scalar;
use async_graphql::Value;

/// Register custom scalars in the schema builder
pub fn register_custom_scalars() -> Vec<Scalar> {
    vec![long_scalar()]
}

/// Create the Long scalar
fn long_scalar() -> Scalar {
    Scalar::new(LONG_SCALAR)
        .description("64-bit signed integer")
        .validator(is_long)
}

fn is_long(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_i64())
}

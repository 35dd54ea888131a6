/// Inferred type metadata and the published registry snapshot
///
/// `TypeMetadata` is what the scanner learns about one label. `TypeRegistry`
/// bundles all of them into one immutable, versioned snapshot and derives the
/// GraphQL layout (field and argument names) of every exposed label once, so
/// the schema builder and the query compiler always agree on names.

use arc_swap::ArcSwapOption;
use async_graphql::dynamic::Schema;
use async_graphql::Value;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Internal identifier field present on every generated type
pub const ID_FIELD: &str = "_id";
/// Any-of filter on the internal identifier
pub const IDS_ARGUMENT: &str = "_ids";
pub const FIRST_ARGUMENT: &str = "first";
pub const OFFSET_ARGUMENT: &str = "offset";
pub const ORDER_BY_ARGUMENT: &str = "orderBy";
pub const TYPENAME_FIELD: &str = "__typename";
/// Name of the generated query root type
pub const QUERY_TYPE: &str = "QueryType";
/// Custom scalar carrying 64-bit integers
pub const LONG_SCALAR: &str = "Long";

const RESERVED_TYPE_NAMES: [&str; 7] = [
    QUERY_TYPE,
    LONG_SCALAR,
    "String",
    "Int",
    "Float",
    "Boolean",
    "ID",
];

/// Inferred type of a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    List(Box<PropertyType>),
    /// A value class the schema cannot represent; fails the schema build
    Unsupported(String),
}

impl PropertyType {
    /// Type of a sampled value, `None` for null
    pub fn of(value: &Value) -> Option<PropertyType> {
        match value {
            Value::Null => None,
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(PropertyType::Integer),
            Value::Number(_) => Some(PropertyType::Float),
            Value::String(_) => Some(PropertyType::String),
            Value::Boolean(_) => Some(PropertyType::Boolean),
            Value::List(items) => {
                let element = items
                    .iter()
                    .find_map(PropertyType::of)
                    .unwrap_or(PropertyType::String);
                Some(PropertyType::List(Box::new(element)))
            }
            Value::Object(_) => Some(PropertyType::Unsupported("Map".to_string())),
            Value::Binary(_) => Some(PropertyType::Unsupported("Binary".to_string())),
            Value::Enum(_) => Some(PropertyType::Unsupported("Enum".to_string())),
        }
    }

    /// Whether a non-null input value can be compared against this type.
    /// A single value is accepted for a list type, as GraphQL input coercion does.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (PropertyType::String, Value::String(_)) => true,
            (PropertyType::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (PropertyType::Float, Value::Number(_)) => true,
            (PropertyType::Boolean, Value::Boolean(_)) => true,
            (PropertyType::List(element), Value::List(items)) => items
                .iter()
                .all(|item| matches!(item, Value::Null) || element.accepts(item)),
            (PropertyType::List(element), other) => element.accepts(other),
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, PropertyType::List(_))
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::String => write!(f, "String"),
            PropertyType::Integer => write!(f, "Integer"),
            PropertyType::Float => write!(f, "Float"),
            PropertyType::Boolean => write!(f, "Boolean"),
            PropertyType::List(element) => write!(f, "[{}]", element),
            PropertyType::Unsupported(class) => write!(f, "Unsupported({})", class),
        }
    }
}

/// A property observed on sampled nodes of a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyInfo {
    pub name: String,
    pub inferred_type: PropertyType,
    pub indexed: bool,
    pub unique: bool,
}

/// Identity of a relationship pattern as seen from one label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelationshipKey {
    pub outgoing: bool,
    pub rel_type: String,
    pub other_label: String,
}

impl RelationshipKey {
    pub fn new(outgoing: bool, rel_type: impl Into<String>, other_label: impl Into<String>) -> Self {
        Self {
            outgoing,
            rel_type: rel_type.into(),
            other_label: other_label.into(),
        }
    }

    /// `ACTED_IN_Movie` for outgoing, `Person_ACTED_IN` for incoming edges
    pub fn field_name(&self) -> String {
        if self.outgoing {
            format!("{}_{}", self.rel_type, self.other_label)
        } else {
            format!("{}_{}", self.other_label, self.rel_type)
        }
    }
}

/// A relationship pattern observed on sampled nodes of a label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipInfo {
    pub field_name: String,
    pub rel_type: String,
    pub other_label: String,
    pub multiple: bool,
    pub outgoing: bool,
}

impl RelationshipInfo {
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey::new(self.outgoing, self.rel_type.clone(), self.other_label.clone())
    }
}

/// Everything inferred about one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMetadata {
    pub label: String,
    pub id_properties: IndexSet<String>,
    pub indexed_properties: IndexSet<String>,
    pub properties: IndexMap<String, PropertyInfo>,
    #[serde(serialize_with = "serialize_relationships")]
    pub relationships: IndexMap<RelationshipKey, RelationshipInfo>,
    pub extra_labels: IndexSet<String>,
}

fn serialize_relationships<S>(
    relationships: &IndexMap<RelationshipKey, RelationshipInfo>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(relationships.values())
}

impl TypeMetadata {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id_properties: IndexSet::new(),
            indexed_properties: IndexSet::new(),
            properties: IndexMap::new(),
            relationships: IndexMap::new(),
            extra_labels: IndexSet::new(),
        }
    }

    /// Record a property backed by a uniqueness constraint
    pub fn add_id_property(&mut self, name: &str) {
        self.id_properties.insert(name.to_string());
        self.add_indexed_property(name);
        if let Some(info) = self.properties.get_mut(name) {
            info.unique = true;
        }
    }

    pub fn add_indexed_property(&mut self, name: &str) {
        self.indexed_properties.insert(name.to_string());
        if let Some(info) = self.properties.get_mut(name) {
            info.indexed = true;
        }
    }

    /// Merge one sampled property value. The first non-null value seen for a
    /// key decides its type; later values never change it.
    pub fn merge_property(&mut self, name: &str, value: &Value) {
        if self.properties.contains_key(name) {
            return;
        }
        let Some(inferred_type) = PropertyType::of(value) else {
            return;
        };
        let info = PropertyInfo {
            name: name.to_string(),
            inferred_type,
            indexed: self.indexed_properties.contains(name),
            unique: self.id_properties.contains(name),
        };
        self.properties.insert(name.to_string(), info);
    }

    /// Record another label carried by a sampled node
    pub fn add_label(&mut self, label: &str) {
        if label != self.label {
            self.extra_labels.insert(label.to_string());
        }
    }

    /// Upsert a relationship observation; `multiple` only ever turns on.
    pub fn observe_relationship(&mut self, key: RelationshipKey, multiple: bool) {
        let info = self
            .relationships
            .entry(key.clone())
            .or_insert_with(|| RelationshipInfo {
                field_name: key.field_name(),
                rel_type: key.rel_type.clone(),
                other_label: key.other_label.clone(),
                multiple: false,
                outgoing: key.outgoing,
            });
        info.multiple |= multiple;
    }

    pub fn relationship(&self, key: &RelationshipKey) -> Option<&RelationshipInfo> {
        self.relationships.get(key)
    }
}

/// What a GraphQL field of a generated type resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Property(PropertyInfo),
    Relationship(RelationshipInfo),
}

/// What an argument of a root or relationship field filters or modifies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    Id,
    Ids,
    Equals(PropertyInfo),
    AnyOf(PropertyInfo),
    First,
    Offset,
    OrderBy,
}

/// GraphQL-facing layout of one exposed label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLayout {
    pub label: String,
    pub fields: IndexMap<String, FieldKind>,
    pub arguments: IndexMap<String, ArgumentKind>,
    /// Name of the ordering enum, absent when the label has no properties
    pub ordering: Option<String>,
}

impl TypeLayout {
    pub fn field(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    /// Arguments of a field returning this type; pagination only applies to lists.
    pub fn arguments(&self, paginated: bool) -> impl Iterator<Item = (&String, &ArgumentKind)> {
        self.arguments
            .iter()
            .filter(move |(_, kind)| paginated || !matches!(kind, ArgumentKind::First | ArgumentKind::Offset))
    }

    pub fn argument(&self, name: &str, paginated: bool) -> Option<&ArgumentKind> {
        self.arguments(paginated)
            .find(|(argument, _)| argument.as_str() == name)
            .map(|(_, kind)| kind)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyInfo> {
        self.fields.values().filter_map(|kind| match kind {
            FieldKind::Property(info) => Some(info),
            _ => None,
        })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipInfo> {
        self.fields.values().filter_map(|kind| match kind {
            FieldKind::Relationship(info) => Some(info),
            _ => None,
        })
    }

    /// Ordering enum values: `<property>_asc` and `<property>_desc`
    pub fn ordering_values(&self) -> Vec<String> {
        self.properties()
            .flat_map(|info| [format!("{}_asc", info.name), format!("{}_desc", info.name)])
            .collect()
    }

    /// Resolve an ordering value to (property, descending)
    pub fn ordering_for(&self, value: &str) -> Option<(String, bool)> {
        let (property, direction) = value.rsplit_once('_')?;
        let descending = match direction {
            "asc" => false,
            "desc" => true,
            _ => return None,
        };
        match self.fields.get(property) {
            Some(FieldKind::Property(_)) => Some((property.to_string(), descending)),
            _ => None,
        }
    }
}

/// `_PersonOrdering` for label `Person`
pub fn ordering_type_name(label: &str) -> String {
    format!("_{}Ordering", label)
}

pub fn is_ordering_type_name(name: &str) -> bool {
    name.len() > "_Ordering".len() && name.starts_with('_') && name.ends_with("Ordering")
}

/// Valid GraphQL name that is not reserved for introspection
pub fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic());
    valid_start
        && name.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !name.starts_with("__")
}

/// One immutable, fully built view of the graph's types
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    version: u64,
    types: IndexMap<String, TypeMetadata>,
    layouts: IndexMap<String, TypeLayout>,
}

impl TypeRegistry {
    pub fn new(types: impl IntoIterator<Item = TypeMetadata>) -> Self {
        let types: IndexMap<String, TypeMetadata> = types
            .into_iter()
            .map(|metadata| (metadata.label.clone(), metadata))
            .collect();
        let layouts = build_layouts(&types);

        Self {
            version: 0,
            types,
            layouts,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, label: &str) -> Option<&TypeMetadata> {
        self.types.get(label)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeMetadata> {
        self.types.values()
    }

    pub fn layout(&self, label: &str) -> Option<&TypeLayout> {
        self.layouts.get(label)
    }

    pub fn layouts(&self) -> impl Iterator<Item = &TypeLayout> {
        self.layouts.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn build_layouts(types: &IndexMap<String, TypeMetadata>) -> IndexMap<String, TypeLayout> {
    // First pass: decide which labels become GraphQL types at all, so that
    // relationship fields only ever point at names that will exist.
    let mut exposed: IndexSet<&str> = IndexSet::new();
    for label in types.keys() {
        if !is_graphql_name(label) || RESERVED_TYPE_NAMES.contains(&label.as_str()) {
            tracing::warn!("Label '{}' is not a usable GraphQL type name, skipping", label);
            continue;
        }
        exposed.insert(label);
    }
    let ordering_names: IndexSet<String> = exposed.iter().map(|label| ordering_type_name(label)).collect();
    exposed.retain(|label| {
        let clashes = ordering_names.contains(*label);
        if clashes {
            tracing::warn!("Label '{}' clashes with a generated ordering type, skipping", label);
        }
        !clashes
    });

    exposed
        .iter()
        .filter_map(|label| types.get(*label))
        .map(|metadata| (metadata.label.clone(), layout_for(metadata, &exposed)))
        .collect()
}

fn layout_for(metadata: &TypeMetadata, exposed: &IndexSet<&str>) -> TypeLayout {
    let mut fields = IndexMap::new();
    fields.insert(ID_FIELD.to_string(), FieldKind::Id);

    for (name, info) in &metadata.properties {
        if !is_graphql_name(name) || fields.contains_key(name) {
            tracing::warn!(
                "Property '{}' of '{}' is not a usable GraphQL field name, skipping",
                name,
                metadata.label
            );
            continue;
        }
        fields.insert(name.clone(), FieldKind::Property(info.clone()));
    }

    for info in metadata.relationships.values() {
        if !exposed.contains(info.other_label.as_str()) {
            tracing::debug!(
                "Relationship '{}' of '{}' points at unexposed label '{}', skipping",
                info.field_name,
                metadata.label,
                info.other_label
            );
            continue;
        }
        if !is_graphql_name(&info.field_name) || fields.contains_key(&info.field_name) {
            tracing::warn!(
                "Relationship field '{}' of '{}' is invalid or already taken, skipping",
                info.field_name,
                metadata.label
            );
            continue;
        }
        fields.insert(info.field_name.clone(), FieldKind::Relationship(info.clone()));
    }

    let has_properties = fields.values().any(|kind| matches!(kind, FieldKind::Property(_)));
    let ordering = has_properties.then(|| ordering_type_name(&metadata.label));

    let mut arguments = IndexMap::new();
    arguments.insert(ID_FIELD.to_string(), ArgumentKind::Id);
    arguments.insert(IDS_ARGUMENT.to_string(), ArgumentKind::Ids);
    arguments.insert(FIRST_ARGUMENT.to_string(), ArgumentKind::First);
    arguments.insert(OFFSET_ARGUMENT.to_string(), ArgumentKind::Offset);
    if ordering.is_some() {
        arguments.insert(ORDER_BY_ARGUMENT.to_string(), ArgumentKind::OrderBy);
    }

    let properties: Vec<&PropertyInfo> = fields
        .values()
        .filter_map(|kind| match kind {
            FieldKind::Property(info) => Some(info),
            _ => None,
        })
        .collect();

    for info in &properties {
        if arguments.contains_key(&info.name) {
            tracing::warn!(
                "Property '{}' of '{}' shadows a reserved argument, no filter argument generated",
                info.name,
                metadata.label
            );
            continue;
        }
        arguments.insert(info.name.clone(), ArgumentKind::Equals((*info).clone()));
    }

    for info in &properties {
        let plural = format!("{}s", info.name);
        if info.inferred_type.is_list() || arguments.contains_key(&plural) {
            continue;
        }
        arguments.insert(plural, ArgumentKind::AnyOf((*info).clone()));
    }

    TypeLayout {
        label: metadata.label.clone(),
        fields,
        arguments,
        ordering,
    }
}

/// A registry together with the schema built from it
#[derive(Clone)]
pub struct Snapshot {
    pub registry: Arc<TypeRegistry>,
    pub schema: Schema,
}

/// Holder of the active snapshot.
///
/// Readers take the current snapshot without blocking; a rebuild publishes a
/// new one with a single pointer swap, so a reader never sees a half-built
/// registry.
#[derive(Default)]
pub struct RegistryHandle {
    current: ArcSwapOption<Snapshot>,
}

impl RegistryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        tracing::info!("Publishing registry version {}", snapshot.registry.version());
        self.current.store(Some(Arc::new(snapshot)));
    }

    /// Last published snapshot, if any
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> TypeMetadata {
        let mut md = TypeMetadata::new("Person");
        md.merge_property("name", &Value::String("Kevin Bacon".to_string()));
        md.merge_property("born", &Value::Number(1958.into()));
        md.observe_relationship(RelationshipKey::new(true, "ACTED_IN", "Movie"), true);
        md
    }

    fn movie() -> TypeMetadata {
        let mut md = TypeMetadata::new("Movie");
        md.merge_property("title", &Value::String("Apollo 13".to_string()));
        md.observe_relationship(RelationshipKey::new(false, "ACTED_IN", "Person"), true);
        md
    }

    #[test]
    fn test_property_type_of_values() {
        assert_eq!(PropertyType::of(&Value::Null), None);
        assert_eq!(PropertyType::of(&Value::Number(3.into())), Some(PropertyType::Integer));
        assert_eq!(
            PropertyType::of(&Value::from(2.5)),
            Some(PropertyType::Float)
        );
        assert_eq!(
            PropertyType::of(&Value::List(vec![Value::Null, Value::Boolean(true)])),
            Some(PropertyType::List(Box::new(PropertyType::Boolean)))
        );
        assert!(matches!(
            PropertyType::of(&Value::Object(Default::default())),
            Some(PropertyType::Unsupported(_))
        ));
    }

    #[test]
    fn test_property_type_accepts() {
        assert!(PropertyType::Integer.accepts(&Value::Number(1961.into())));
        assert!(!PropertyType::Integer.accepts(&Value::String("1961".to_string())));
        assert!(!PropertyType::Integer.accepts(&Value::from(1.5)));
        assert!(PropertyType::Float.accepts(&Value::Number(2.into())));

        let tags = PropertyType::List(Box::new(PropertyType::String));
        assert!(tags.accepts(&Value::List(vec![Value::String("a".to_string())])));
        assert!(tags.accepts(&Value::String("a".to_string())));
        assert!(!tags.accepts(&Value::List(vec![Value::Boolean(true)])));
    }

    #[test]
    fn test_first_observed_type_wins() {
        let mut md = TypeMetadata::new("Person");
        md.merge_property("age", &Value::Null);
        md.merge_property("age", &Value::Number(42.into()));
        md.merge_property("age", &Value::String("forty-two".to_string()));

        assert_eq!(md.properties["age"].inferred_type, PropertyType::Integer);
    }

    #[test]
    fn test_multiple_is_monotonic() {
        let key = RelationshipKey::new(true, "KNOWS", "Person");
        let mut md = TypeMetadata::new("Person");
        md.observe_relationship(key.clone(), true);
        md.observe_relationship(key.clone(), false);

        assert!(md.relationship(&key).unwrap().multiple);
        assert_eq!(md.relationships.len(), 1);
    }

    #[test]
    fn test_direction_is_part_of_the_key() {
        let mut md = TypeMetadata::new("Person");
        md.observe_relationship(RelationshipKey::new(true, "KNOWS", "Person"), false);
        md.observe_relationship(RelationshipKey::new(false, "KNOWS", "Person"), false);

        let names: Vec<&str> = md.relationships.values().map(|r| r.field_name.as_str()).collect();
        assert_eq!(names, vec!["KNOWS_Person", "Person_KNOWS"]);
    }

    #[test]
    fn test_label_never_lists_itself() {
        let mut md = TypeMetadata::new("Person");
        md.add_label("Person");
        md.add_label("Actor");

        assert_eq!(md.extra_labels.len(), 1);
        assert!(md.extra_labels.contains("Actor"));
    }

    #[test]
    fn test_index_flags_apply_in_either_order() {
        let mut md = TypeMetadata::new("Person");
        md.add_id_property("name");
        md.merge_property("name", &Value::String("Meg Ryan".to_string()));
        md.merge_property("born", &Value::Number(1961.into()));
        md.add_indexed_property("born");

        assert!(md.properties["name"].unique && md.properties["name"].indexed);
        assert!(md.properties["born"].indexed && !md.properties["born"].unique);
    }

    #[test]
    fn test_layout_fields_and_arguments() {
        let registry = TypeRegistry::new(vec![person(), movie()]);
        let layout = registry.layout("Person").unwrap();

        let fields: Vec<&str> = layout.fields.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["_id", "name", "born", "ACTED_IN_Movie"]);

        let arguments: Vec<&str> = layout.arguments(true).map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            arguments,
            vec!["_id", "_ids", "first", "offset", "orderBy", "name", "born", "names", "borns"]
        );
        assert!(layout.argument("first", false).is_none());
        assert_eq!(layout.ordering.as_deref(), Some("_PersonOrdering"));
    }

    #[test]
    fn test_relationship_to_unknown_label_is_hidden() {
        let registry = TypeRegistry::new(vec![person()]);
        let layout = registry.layout("Person").unwrap();

        assert!(layout.field("ACTED_IN_Movie").is_none());
        assert_eq!(registry.get("Person").unwrap().relationships.len(), 1);
    }

    #[test]
    fn test_invalid_labels_are_not_exposed() {
        let registry = TypeRegistry::new(vec![TypeMetadata::new("Movie Star"), TypeMetadata::new("QueryType")]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.layouts().count(), 0);
    }

    #[test]
    fn test_ordering_values() {
        let registry = TypeRegistry::new(vec![person()]);
        let layout = registry.layout("Person").unwrap();

        assert_eq!(layout.ordering_values(), vec!["name_asc", "name_desc", "born_asc", "born_desc"]);
        assert_eq!(layout.ordering_for("born_desc"), Some(("born".to_string(), true)));
        assert_eq!(layout.ordering_for("born_sideways"), None);
        assert_eq!(layout.ordering_for("height_asc"), None);

        assert!(is_ordering_type_name(&ordering_type_name("Person")));
        assert!(!is_ordering_type_name("_Ordering"));
        assert!(!is_ordering_type_name("String"));
    }

    #[test]
    fn test_label_without_properties_has_no_ordering() {
        let registry = TypeRegistry::new(vec![TypeMetadata::new("Tag")]);
        let layout = registry.layout("Tag").unwrap();

        assert!(layout.ordering.is_none());
        assert!(layout.argument("orderBy", true).is_none());
    }

    #[test]
    fn test_is_graphql_name() {
        assert!(is_graphql_name("Person"));
        assert!(is_graphql_name("_id"));
        assert!(is_graphql_name("ACTED_IN_Movie"));
        assert!(!is_graphql_name("first name"));
        assert!(!is_graphql_name("1st"));
        assert!(!is_graphql_name("__schema"));
        assert!(!is_graphql_name(""));
    }

    #[test]
    fn test_handle_publishes_snapshots() {
        let handle = RegistryHandle::new();
        assert!(handle.current().is_none());

        let registry = Arc::new(TypeRegistry::new(vec![person(), movie()]).with_version(3));
        let schema = crate::schema::SchemaBuilder::new().build(Arc::clone(&registry)).unwrap();
        handle.publish(Snapshot { registry, schema });

        let current = handle.current().unwrap();
        assert_eq!(current.registry.version(), 3);
    }
}

/// Cypher rendering of a query plan
///
/// Every name is backtick-quoted and every value is a `$parameter`, so no
/// caller-supplied text is ever spliced into the statement.

use super::plan::{Expansion, Filter, NodePlan, ProjectionValue, QueryPlan};

/// Quote a label, relationship type, property or variable name
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render the full statement, prefixed with `PROFILE` / `EXPLAIN` when asked
pub fn render(plan: &QueryPlan) -> String {
    let root = &plan.root;
    let v = quote(&root.variable);
    let mut lines = Vec::new();

    if let Some(prefix) = plan.mode.prefix() {
        lines.push(prefix.to_string());
    }
    lines.push(format!("MATCH ({}:{})", v, quote(&root.label)));
    render_body(root, 0, &mut lines);

    let columns: Vec<String> = root
        .projections
        .iter()
        .map(|projection| format!("{} AS {}", expression(root, &projection.value), quote(&projection.key)))
        .collect();
    if columns.is_empty() {
        lines.push(format!("RETURN {} AS {}", v, v));
    } else {
        lines.push(format!("RETURN {}", columns.join(", ")));
    }

    lines.join("\n")
}

/// Filters, ordering, pagination and nested expansions of one level
fn render_body(node: &NodePlan, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let v = quote(&node.variable);

    for (i, filter) in node.filters.iter().enumerate() {
        let keyword = if i == 0 { "WHERE" } else { "AND" };
        lines.push(format!("{}{} {}", indent, keyword, predicate(&v, filter)));
    }

    if !node.order.is_empty() || node.skip.is_some() || node.limit.is_some() {
        lines.push(format!("{}WITH {}", indent, v));
        if !node.order.is_empty() {
            let keys: Vec<String> = node
                .order
                .iter()
                .map(|key| {
                    let direction = if key.descending { "DESC" } else { "ASC" };
                    format!("{}.{} {}", v, quote(&key.property), direction)
                })
                .collect();
            lines.push(format!("{}ORDER BY {}", indent, keys.join(", ")));
        }
        if let Some(skip) = &node.skip {
            lines.push(format!("{}SKIP ${}", indent, skip));
        }
        if let Some(limit) = &node.limit {
            lines.push(format!("{}LIMIT ${}", indent, limit));
        }
    }

    for expansion in node.expansions() {
        render_expansion(node, expansion, depth, lines);
    }
}

fn render_expansion(parent: &NodePlan, expansion: &Expansion, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let inner = "  ".repeat(depth + 1);
    let p = quote(&parent.variable);
    let child = &expansion.node;
    let c = quote(&child.variable);
    let relationship = format!("[:{}]", quote(&expansion.rel_type));
    let pattern = if expansion.outgoing {
        format!("({})-{}->({}:{})", p, relationship, c, quote(&child.label))
    } else {
        format!("({})<-{}-({}:{})", p, relationship, c, quote(&child.label))
    };

    lines.push(format!("{}CALL {{", indent));
    lines.push(format!("{}WITH {}", inner, p));
    lines.push(format!("{}MATCH {}", inner, pattern));
    render_body(child, depth + 1, lines);

    let map = map_projection(child);
    let aggregate = if expansion.multiple {
        format!("collect({})", map)
    } else {
        format!("head(collect({}))", map)
    };
    lines.push(format!("{}RETURN {} AS {}", inner, aggregate, c));
    lines.push(format!("{}}}", indent));
}

fn predicate(v: &str, filter: &Filter) -> String {
    match filter {
        Filter::Id { parameter } => format!("id({}) = toInteger(${})", v, parameter),
        Filter::IdIn { parameter } => {
            format!("id({}) IN [x IN ${} | toInteger(x)]", v, parameter)
        }
        Filter::Equals { property, parameter } => format!("{}.{} = ${}", v, quote(property), parameter),
        Filter::AnyOf { property, parameter } => format!("{}.{} IN ${}", v, quote(property), parameter),
    }
}

/// Value of one projection evaluated against `node`'s variable
fn expression(node: &NodePlan, value: &ProjectionValue) -> String {
    let v = quote(&node.variable);
    match value {
        ProjectionValue::Id => format!("toString(id({}))", v),
        ProjectionValue::Property(property) => format!("{}.{}", v, quote(property)),
        ProjectionValue::Typename { parameter } => format!("${}", parameter),
        ProjectionValue::Expansion(expansion) => quote(&expansion.node.variable),
    }
}

fn map_projection(node: &NodePlan) -> String {
    let entries: Vec<String> = node
        .projections
        .iter()
        .map(|projection| format!("{}: {}", quote(&projection.key), expression(node, &projection.value)))
        .collect();
    format!("{} {{{}}}", quote(&node.variable), entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::plan::{Projection, SortKey};
    use crate::store::ExecutionMode;

    fn property(key: &str) -> Projection {
        Projection {
            key: key.to_string(),
            value: ProjectionValue::Property(key.to_string()),
        }
    }

    #[test]
    fn test_quote_escapes_backticks() {
        assert_eq!(quote("Person"), "`Person`");
        assert_eq!(quote("odd`name"), "`odd``name`");
    }

    #[test]
    fn test_render_root_only() {
        let mut root = NodePlan::new("Person", "Person");
        root.filters.push(Filter::Equals {
            property: "born".to_string(),
            parameter: "Person_born".to_string(),
        });
        root.projections.push(property("name"));

        let statement = render(&QueryPlan {
            root,
            mode: ExecutionMode::Run,
        });

        assert_eq!(
            statement,
            "MATCH (`Person`:`Person`)\nWHERE `Person`.`born` = $Person_born\nRETURN `Person`.`name` AS `name`"
        );
    }

    #[test]
    fn test_render_nested_expansion_with_ordering() {
        let mut movies = NodePlan::new("Person_movies", "Movie");
        movies.order.push(SortKey {
            property: "released".to_string(),
            descending: true,
        });
        movies.limit = Some("Person_movies_first".to_string());
        movies.projections.push(property("title"));

        let mut root = NodePlan::new("Person", "Person");
        root.projections.push(Projection {
            key: "_id".to_string(),
            value: ProjectionValue::Id,
        });
        root.projections.push(Projection {
            key: "movies".to_string(),
            value: ProjectionValue::Expansion(Box::new(Expansion {
                rel_type: "ACTED_IN".to_string(),
                outgoing: true,
                multiple: true,
                node: movies,
            })),
        });

        let statement = render(&QueryPlan {
            root,
            mode: ExecutionMode::Profile,
        });

        let expected = [
            "PROFILE",
            "MATCH (`Person`:`Person`)",
            "CALL {",
            "  WITH `Person`",
            "  MATCH (`Person`)-[:`ACTED_IN`]->(`Person_movies`:`Movie`)",
            "  WITH `Person_movies`",
            "  ORDER BY `Person_movies`.`released` DESC",
            "  LIMIT $Person_movies_first",
            "  RETURN collect(`Person_movies` {`title`: `Person_movies`.`title`}) AS `Person_movies`",
            "}",
            "RETURN toString(id(`Person`)) AS `_id`, `Person_movies` AS `movies`",
        ]
        .join("\n");
        assert_eq!(statement, expected);
    }

    #[test]
    fn test_render_incoming_single_relationship() {
        let mut director = NodePlan::new("m_director", "Person");
        director.projections.push(property("name"));

        let mut root = NodePlan::new("m", "Movie");
        root.filters.push(Filter::IdIn {
            parameter: "m__ids".to_string(),
        });
        root.projections.push(Projection {
            key: "director".to_string(),
            value: ProjectionValue::Expansion(Box::new(Expansion {
                rel_type: "DIRECTED".to_string(),
                outgoing: false,
                multiple: false,
                node: director,
            })),
        });

        let statement = render(&QueryPlan {
            root,
            mode: ExecutionMode::Run,
        });

        assert!(statement.contains("WHERE id(`m`) IN [x IN $m__ids | toInteger(x)]"));
        assert!(statement.contains("MATCH (`m`)<-[:`DIRECTED`]-(`m_director`:`Person`)"));
        assert!(statement.contains("RETURN head(collect(`m_director` {`name`: `m_director`.`name`})) AS `m_director`"));
    }
}

use async_graphql::Value;
use graphinator::store::PropertyGraph;

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

fn number(value: i64) -> Value {
    Value::Number(value.into())
}

/// Actors, a director and the movies they worked on
pub fn create_example_graph() -> PropertyGraph {
    let mut graph = PropertyGraph::new();

    let person = |graph: &mut PropertyGraph, name: &str, born: i64| {
        graph.add_node(&["Person"], [("name", text(name)), ("born", number(born))])
    };
    let kevin = person(&mut graph, "Kevin Bacon", 1958);
    let meg = person(&mut graph, "Meg Ryan", 1961);
    let tom = person(&mut graph, "Tom Hanks", 1956);
    let ron = person(&mut graph, "Ron Howard", 1954);
    let nora = person(&mut graph, "Nora Ephron", 1941);

    let movie = |graph: &mut PropertyGraph, title: &str, released: i64, tagline: &str| {
        graph.add_node(
            &["Movie"],
            [
                ("title", text(title)),
                ("released", number(released)),
                ("tagline", text(tagline)),
            ],
        )
    };
    let apollo = movie(&mut graph, "Apollo 13", 1995, "Houston, we have a problem.");
    let sleepless = movie(
        &mut graph,
        "Sleepless in Seattle",
        1993,
        "What if someone you never met, someone you never saw, someone you never knew was the only someone for you?",
    );
    let frost = movie(&mut graph, "Frost/Nixon", 2008, "400 million people were waiting for the truth.");

    for (actor, film) in [(kevin, apollo), (tom, apollo), (tom, sleepless), (meg, sleepless)] {
        graph.add_relationship(actor, "ACTED_IN", film);
    }
    graph.add_relationship(ron, "DIRECTED", apollo);
    graph.add_relationship(ron, "DIRECTED", frost);
    graph.add_relationship(nora, "DIRECTED", sleepless);

    graph.add_index("Movie", &["title"], true);
    graph.add_index("Person", &["name"], false);

    graph
}

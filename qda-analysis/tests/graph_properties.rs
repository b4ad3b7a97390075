//! Property-based checks over diagram identifier assignment: every
//! distinct node name must get exactly one definition line and a unique
//! identifier, whatever the names look like.

use proptest::prelude::*;
use qda_analysis::graph::{build_graph, RelationEdge};

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9 _\\-]{1,10}".prop_filter("visible after trim", |s| !s.trim().is_empty())
}

proptest! {
    #[test]
    fn distinct_names_get_distinct_identifiers(
        names in prop::collection::hash_set(name_strategy(), 2..8)
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let edges: Vec<RelationEdge> = names
            .windows(2)
            .map(|pair| RelationEdge::new(pair[0].clone(), pair[1].clone(), "x"))
            .collect();
        let graph = build_graph("@r", &edges).unwrap();

        let definitions: Vec<&str> = graph.lines().filter(|line| line.contains("[\"")).collect();
        prop_assert_eq!(definitions.len(), names.len());

        let mut ids: Vec<&str> = definitions
            .iter()
            .filter_map(|line| line.trim().split('[').next())
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);
    }

    #[test]
    fn non_empty_edge_lists_always_draw(
        codes in prop::collection::vec("[a-z]{1,6}", 1..5)
    ) {
        let edges: Vec<RelationEdge> = codes
            .iter()
            .map(|code| RelationEdge::new(code.clone(), format!("{code} effect"), ""))
            .collect();
        prop_assert!(build_graph("@r", &edges).is_some());
    }

    #[test]
    fn rebuilding_yields_identical_output(
        names in prop::collection::vec(name_strategy(), 2..6)
    ) {
        let edges: Vec<RelationEdge> = names
            .windows(2)
            .map(|pair| RelationEdge::new(pair[0].clone(), pair[1].clone(), "enables"))
            .collect();
        prop_assert_eq!(build_graph("@r", &edges), build_graph("@r", &edges));
    }
}

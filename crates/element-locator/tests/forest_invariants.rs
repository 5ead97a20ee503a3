//! Cross-cutting traversal and matching invariants on a synthetic forest.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use ax_adapter::fake::{FakeAxTree, NodeSpec};
use ax_adapter::{attr, role, AxPort};
use axdriver_core_types::{ElementQuery, NodeRef};
use element_locator::{matcher, ElementEngine, TreeWalker, VisitFlow};

fn deep_tree() -> (FakeAxTree, NodeRef) {
    let tree = FakeAxTree::new();
    let app = tree.add_app("Grid", 90);
    let window = tree.add_child(&app, NodeSpec::new(role::WINDOW).frame(0.0, 0.0, 1000.0, 1000.0));
    let table = tree.add_child(
        &window,
        NodeSpec::new(role::TABLE).frame(0.0, 0.0, 1000.0, 1000.0),
    );
    for r in 0..4 {
        let row = tree.add_child(
            &table,
            NodeSpec::new("AXRow").frame(0.0, 100.0 * r as f64, 1000.0, 100.0),
        );
        for c in 0..3 {
            tree.add_child(
                &row,
                NodeSpec::new("AXCell")
                    .title(format!("r{}c{}", r, c))
                    .frame(300.0 * c as f64, 100.0 * r as f64, 300.0, 100.0),
            );
        }
    }
    (tree, app)
}

/// Breadth-first enumeration over the raw port, for comparison with the
/// walker's depth-first collect.
fn bfs_identities(tree: &FakeAxTree, root: &NodeRef, max_depth: usize) -> HashSet<u64> {
    let ax: &dyn AxPort = tree;
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([(root.clone(), 0usize)]);
    while let Some((node, depth)) = queue.pop_front() {
        if depth > max_depth || ax.string_attribute(&node, attr::ROLE).is_none() {
            continue;
        }
        if !seen.insert(node.identity()) {
            continue;
        }
        if depth < max_depth {
            for child in ax.children(&node) {
                queue.push_back((child, depth + 1));
            }
        }
    }
    seen
}

#[test]
fn collect_matches_breadth_first_enumeration() {
    let (tree, app) = deep_tree();
    let walker = TreeWalker::new(Arc::new(tree.clone()), Arc::new(tree.clone()));
    for max_depth in [0, 1, 2, 3, 10] {
        let collected: HashSet<u64> = walker
            .collect(&app, max_depth, None)
            .unwrap()
            .iter()
            .filter_map(|e| e.node_identity())
            .collect();
        assert_eq!(
            collected,
            bfs_identities(&tree, &app, max_depth),
            "max_depth {}",
            max_depth
        );
    }
}

#[test]
fn traverse_with_identity_visitor_equals_collect() {
    let (tree, app) = deep_tree();
    let walker = TreeWalker::new(Arc::new(tree.clone()), Arc::new(tree.clone()));
    let collected = walker.collect(&app, 10, None).unwrap();
    let mut visited = Vec::new();
    walker
        .traverse(&app, 10, &mut |e| {
            visited.push(e.clone());
            VisitFlow::Continue
        })
        .unwrap();
    assert_eq!(collected.len(), visited.len());
    for (a, b) in collected.iter().zip(&visited) {
        assert_eq!(a.node_identity(), b.node_identity());
        assert_eq!(a.path, b.path);
        assert_eq!(a.sibling_index, b.sibling_index);
    }
}

#[test]
fn engine_results_always_satisfy_their_query() {
    let (_tree, engine) = engine_fixture();
    let queries = [
        ElementQuery::new().with_role("cell"),
        ElementQuery::new().with_text("r2c1"),
        ElementQuery::new().with_parent_role("AXRow").with_sibling_index(0),
        ElementQuery::new()
            .with_role("AXCell")
            .with_width_range(Some(300.0), Some(300.0)),
    ];
    for query in queries {
        let normalized = matcher::normalize_query(&query);
        let result = engine.find(&query).unwrap();
        assert!(result.searched_count > 0);
        for element in &result.elements {
            assert!(
                matcher::matches(element, &normalized),
                "{} failed {:?}",
                element.describe(),
                query
            );
        }
    }
}

#[test]
fn limit_zero_is_unlimited() {
    let (_tree, engine) = engine_fixture();
    let all = engine.find(&ElementQuery::new().with_role("AXCell")).unwrap();
    assert_eq!(all.elements.len(), 12);
    let capped = engine
        .find(&ElementQuery::new().with_role("AXCell").with_limit(5))
        .unwrap();
    assert_eq!(capped.elements.len(), 5);
}

fn engine_fixture() -> (FakeAxTree, ElementEngine) {
    let (tree, _) = deep_tree();
    let engine = ElementEngine::new(Arc::new(tree.clone()), Arc::new(tree.clone()));
    (tree, engine)
}

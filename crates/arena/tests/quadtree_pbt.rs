use arena::spatial::{Bounds, QuadTree};
use proptest::prelude::*;

prop_compose! {
    fn arb_bounds()(
        x in -1000.0f32..1000.0,
        y in -1000.0f32..1000.0,
        size in 1.0f32..150.0
    ) -> Bounds {
        Bounds::from_center(x, y, size)
    }
}

fn world() -> QuadTree<u32> {
    QuadTree::for_world(-1000.0, -1000.0, 1000.0, 1000.0)
}

fn brute_force(items: &[(u32, Bounds)], query: &Bounds) -> Vec<u32> {
    let mut hits: Vec<u32> = items
        .iter()
        .filter(|(_, b)| b.intersects(query))
        .map(|&(id, _)| id)
        .collect();
    hits.sort_unstable();
    hits
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_query_matches_brute_force(
        bounds in prop::collection::vec(arb_bounds(), 0..400),
        query in arb_bounds()
    ) {
        let mut tree = world();
        let items: Vec<(u32, Bounds)> = bounds.into_iter().enumerate().map(|(i, b)| (i as u32, b)).collect();
        for &(id, b) in &items {
            tree.insert(id, b);
        }

        let mut found = tree.query(&query);
        found.sort_unstable();
        prop_assert_eq!(found, brute_force(&items, &query));
        prop_assert_eq!(tree.len(), items.len());
        prop_assert!(tree.is_consistent());
    }

    #[test]
    fn test_every_item_finds_itself(bounds in prop::collection::vec(arb_bounds(), 1..300)) {
        let mut tree = world();
        for (i, b) in bounds.iter().enumerate() {
            tree.insert(i as u32, *b);
        }
        for (i, b) in bounds.iter().enumerate() {
            prop_assert!(tree.query(b).contains(&(i as u32)), "item {} lost", i);
        }
    }

    #[test]
    fn test_moves_and_removals_stay_exact(
        bounds in prop::collection::vec(arb_bounds(), 1..300),
        moved in prop::collection::vec(arb_bounds(), 1..300),
        query in arb_bounds()
    ) {
        let mut tree = world();
        let mut handles = Vec::with_capacity(bounds.len());
        let mut items: Vec<(u32, Bounds)> = Vec::with_capacity(bounds.len());
        for (i, b) in bounds.iter().enumerate() {
            handles.push(tree.insert(i as u32, *b));
            items.push((i as u32, *b));
        }

        // Move every item that has a new bound, then drop every third one.
        for (i, b) in moved.iter().enumerate().take(items.len()) {
            prop_assert!(tree.reinsert(handles[i], *b));
            items[i].1 = *b;
        }
        let mut kept = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if i % 3 == 0 {
                prop_assert_eq!(tree.remove(handles[i]), Some(item.0));
                prop_assert!(!tree.contains(handles[i]));
            } else {
                kept.push(*item);
            }
        }

        let mut found = tree.query(&query);
        found.sort_unstable();
        prop_assert_eq!(found, brute_force(&kept, &query));
        prop_assert_eq!(tree.len(), kept.len());
        prop_assert!(tree.is_consistent());
    }
}

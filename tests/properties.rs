//! Property-based tests for the optimizer and the navigation coordinator.
//!
//! # Invariants tested
//!
//! - **Coverage:** every stop appears exactly once, the origin first.
//! - **Constraints:** first/last stops hold their positions in every route.
//! - **Ranking:** routes are sorted by duration and pairwise distinct.
//! - **Exhaustive bound:** enumeration never loses to the heuristic.
//! - **Savings:** the slowest returned route saves nothing; every other
//!   route saves exactly its lead over it.
//! - **Pointer bounds:** no sequence of navigation calls moves the pointer
//!   past the route.

mod fixtures;

use std::collections::HashSet;

use proptest::prelude::*;
use route_navigator::optimizer::{enumerate, optimize};
use route_navigator::{
    Cost, CostMatrix, Lifecycle, NavigationCoordinator, PositionConstraint, Route, RouteSet, Stop, StopList,
};

use fixtures::ids;

const CONSTRAINTS: [PositionConstraint; 4] = [
    PositionConstraint::Unconstrained,
    PositionConstraint::MustBeFirst,
    PositionConstraint::MustBeLast,
    PositionConstraint::AnchoredInPlace,
];

/// Stops with arbitrary constraints (normalized through [`StopList`]) and an
/// asymmetric matrix over `[origin] + stops`.
fn problem_strategy() -> impl Strategy<Value = (Vec<Stop>, CostMatrix)> {
    (1_usize..=6).prop_flat_map(|n| {
        let dim = n + 1;
        (
            prop::collection::vec(0_usize..4, n),
            prop::collection::vec(1_u32..1_000, dim * dim),
        )
            .prop_map(move |(constraints, cells)| {
                let stops: Vec<Stop> = constraints
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| {
                        Stop::new(format!("s{i}"), format!("Stop {i}"), (0.0, i as f64))
                            .with_constraint(CONSTRAINTS[c])
                    })
                    .collect();
                let stops = StopList::from(stops).as_slice().to_vec();
                let matrix = CostMatrix::from_fn(dim, |i, j| {
                    let d = if i == j { 0 } else { cells[i * dim + j] };
                    Some(Cost::new(d, d * 3))
                });
                (stops, matrix)
            })
    })
}

fn origin() -> Stop {
    Stop::origin("Origin", (0.0, 0.0))
}

fn check_route_set(set: &RouteSet, stops: &[Stop]) -> Result<(), TestCaseError> {
    let mut expected = ids(stops);
    expected.sort_unstable();

    let first = stops.iter().find(|s| s.constraint == PositionConstraint::MustBeFirst);
    let last = stops.iter().find(|s| s.constraint == PositionConstraint::MustBeLast);

    let mut seen_orders = HashSet::new();
    for route in set.iter() {
        prop_assert_eq!(route.stops[0].id.as_str(), "start");

        let mut visited = ids(&route.stops[1..]);
        visited.sort_unstable();
        prop_assert_eq!(&visited, &expected);

        if let Some(first) = first {
            prop_assert_eq!(&route.stops[1].id, &first.id);
        }
        if let Some(last) = last {
            prop_assert_eq!(route.stops.last().map(|s| &s.id), Some(&last.id));
        }

        prop_assert!(seen_orders.insert(ids(&route.stops).join(",")), "duplicate order");
    }

    let durations: Vec<_> = set.iter().map(|r| r.total_duration_secs).collect();
    prop_assert!(durations.windows(2).all(|w| w[0] <= w[1]), "unsorted: {:?}", durations);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn optimize_covers_every_stop((stops, matrix) in problem_strategy(), count in 1_usize..5) {
        let set = optimize(&origin(), &stops, &matrix, count);
        prop_assert!(!set.is_empty());
        prop_assert!(set.len() <= count);
        check_route_set(&set, &stops)?;
    }

    #[test]
    fn enumerate_covers_every_stop((stops, matrix) in problem_strategy()) {
        let set = enumerate(&origin(), &stops, &matrix, 50);
        check_route_set(&set, &stops)?;
    }

    #[test]
    fn enumerate_never_loses_to_heuristic((stops, matrix) in problem_strategy()) {
        let exhaustive = enumerate(&origin(), &stops, &matrix, 1);
        let heuristic = optimize(&origin(), &stops, &matrix, 3);
        let best = |set: &RouteSet| set.best().map(|r| r.total_duration_secs);
        prop_assert!(best(&exhaustive) <= best(&heuristic));
    }

    #[test]
    fn savings_are_zero_for_slowest_route(
        (stops, matrix) in problem_strategy(),
        count in 1_usize..5,
        max_results in 1_usize..10,
    ) {
        for set in [
            optimize(&origin(), &stops, &matrix, count),
            enumerate(&origin(), &stops, &matrix, max_results),
        ] {
            let slowest = set.routes().last().map(|r| r.total_duration_secs);
            prop_assert_eq!(set.routes().last().map(|r| r.savings_secs), Some(0));
            for route in set.iter() {
                prop_assert_eq!(Some(route.savings_secs + route.total_duration_secs), slowest);
            }
        }
    }

    #[test]
    fn optimize_is_deterministic((stops, matrix) in problem_strategy()) {
        prop_assert_eq!(
            optimize(&origin(), &stops, &matrix, 3),
            optimize(&origin(), &stops, &matrix, 3)
        );
    }

    #[test]
    fn navigation_pointer_stays_in_bounds(
        len in 1_usize..8,
        ops in prop::collection::vec(0_u8..7, 0..60),
    ) {
        let stops: Vec<Stop> = (0..len)
            .map(|i| Stop::new(format!("s{i}"), format!("Stop {i}"), (0.0, i as f64)).with_sequence(i))
            .collect();
        let nav = NavigationCoordinator::new();
        nav.activate(Route::new(stops, 0, 0));

        let mut inserted = 0;
        for op in ops {
            match op {
                0 => { nav.advance(); }
                1 => { nav.skip(); }
                2 => { nav.pause(); }
                3 => { nav.resume(); }
                4 => {
                    inserted += 1;
                    nav.insert_stop(Stop::new(format!("x{inserted}"), "Extra", (1.0, 1.0)));
                }
                5 => {
                    if let Some(current) = nav.current_stop() {
                        nav.remove_stop(&current.id);
                    }
                }
                _ => {
                    if let Some(next) = nav.next_stop() {
                        nav.remove_stop(&next.id);
                    }
                }
            }

            let snapshot = nav.snapshot();
            let route_len = snapshot.route.as_ref().map_or(0, |r| r.stops.len());
            prop_assert!(snapshot.pointer < route_len.max(1));
            prop_assert_eq!(snapshot.remaining, route_len.saturating_sub(snapshot.pointer + 1));
            if snapshot.lifecycle == Lifecycle::Completed {
                prop_assert!(snapshot.next_stop.is_none());
            }
        }
    }
}

//! Property tests for scheduling invariants
//!
//! Manifests are random DAGs: module `m{i}` provides `m{i}.s` and may consume
//! the service of any lower-numbered module. Declaration order is shuffled.

use proptest::prelude::*;
use std::collections::HashMap;

use modwire::{Bootstrap, ModuleDeclaration, WiringError};

/// `(edges, order)`: `edges[i][j]` means module i consumes module j (j < i)
fn manifest_strategy() -> impl Strategy<Value = (Vec<Vec<bool>>, Vec<usize>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(any::<bool>(), n), n),
            Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
        )
    })
}

fn declarations(edges: &[Vec<bool>], order: &[usize]) -> Vec<ModuleDeclaration> {
    order
        .iter()
        .map(|&i| {
            let provides = format!("m{i}.s");
            let consumes: Vec<String> = (0..i)
                .filter(|&j| edges[i][j])
                .map(|j| format!("m{j}.s"))
                .collect();
            let consumes: Vec<&str> = consumes.iter().map(String::as_str).collect();
            ModuleDeclaration::parse(&format!("m{i}"), &[provides.as_str()], &consumes, &[]).unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn test_providers_precede_consumers((edges, order) in manifest_strategy()) {
        // Invariant: every module is scheduled after all of its providers
        let modules = declarations(&edges, &order);
        let schedule = Bootstrap::plan(&modules).unwrap();
        prop_assert_eq!(schedule.len(), modules.len());

        let position: HashMap<&str, usize> = schedule
            .iter()
            .enumerate()
            .map(|(p, name)| (name.as_str(), p))
            .collect();
        for module in &modules {
            for consumed in &module.consumes {
                prop_assert!(
                    position[consumed.container()] < position[module.name.as_str()],
                    "{} scheduled before its provider {}", module.name, consumed.container()
                );
            }
        }
    }

    #[test]
    fn test_schedule_is_deterministic((edges, order) in manifest_strategy()) {
        // Invariant: a fixed manifest always yields the same order
        let modules = declarations(&edges, &order);
        let first = Bootstrap::plan(&modules).unwrap();
        let second = Bootstrap::plan(&modules.clone()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_unconstrained_modules_keep_declaration_order(order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()) {
        // Invariant: with no edges, the schedule is the declaration order
        let edges = vec![vec![false; 8]; 8];
        let modules = declarations(&edges, &order);
        let schedule = Bootstrap::plan(&modules).unwrap();
        let declared: Vec<String> = modules.iter().map(|m| m.name.clone()).collect();
        prop_assert_eq!(schedule, declared);
    }

    #[test]
    fn test_back_edge_is_reported_as_cycle((edges, order) in manifest_strategy(), extra in 0usize..12) {
        // Invariant: making the lowest module consume a module that depends on
        // it (directly or not) always yields a cycle that starts and ends on
        // the same module
        let mut modules = declarations(&edges, &order);
        let n = modules.len();
        let target = format!("m{}.s", extra % n);
        let lowest = modules.iter_mut().find(|m| m.name == "m0").unwrap();
        lowest.consumes.insert(target.parse().unwrap());

        // m0 consuming m0.s, or any module above it that reaches it
        let reaches_m0 = extra % n == 0 || depends_on_m0(&edges, extra % n);
        match Bootstrap::plan(&modules) {
            Err(WiringError::Cycle { cycle }) => {
                prop_assert!(reaches_m0);
                prop_assert!(cycle.len() >= 2);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            Ok(_) => prop_assert!(!reaches_m0),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}

/// Whether module `i` (transitively) consumes `m0.s`
fn depends_on_m0(edges: &[Vec<bool>], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    (0..i).any(|j| edges[i][j] && depends_on_m0(edges, j))
}

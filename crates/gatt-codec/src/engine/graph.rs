//! Dependency graph over one batch and its decode order.
//!
//! Nodes are batch positions (insertion order). An edge `i -> d` means record
//! `i` depends on record `d`; dependencies outside the batch never become
//! edges. The order is a topological sort of the strongly connected
//! components, always taking the ready component whose smallest member came
//! first in the batch. Members of a cyclic component are emitted in
//! insertion order.

use std::collections::BTreeSet;

/// Decode order computed for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct DecodePlan {
    /// Every node exactly once, dependencies before dependents.
    pub(crate) order: Vec<usize>,
    /// Cyclic components (including self-loops), members ascending,
    /// in the order they appear in `order`.
    pub(crate) cycles: Vec<Vec<usize>>,
}

impl DecodePlan {
    /// Computes the plan for `dependencies[i]` = nodes that node `i` depends on.
    ///
    /// Entries out of range are ignored; duplicates are harmless.
    pub(crate) fn compute(dependencies: &[Vec<usize>]) -> Self {
        let n = dependencies.len();
        let adjacency: Vec<Vec<usize>> = dependencies
            .iter()
            .map(|deps| {
                let mut deps: Vec<usize> = deps.iter().copied().filter(|&d| d < n).collect();
                deps.sort_unstable();
                deps.dedup();
                deps
            })
            .collect();

        let components = strongly_connected(&adjacency);
        let mut component_of = vec![0usize; n];
        for (c, members) in components.iter().enumerate() {
            for &node in members {
                component_of[node] = c;
            }
        }

        // Condensation: edges from a dependency component to its dependents
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); components.len()];
        for (node, deps) in adjacency.iter().enumerate() {
            let to = component_of[node];
            for &dep in deps {
                let from = component_of[dep];
                if from != to {
                    dependents[from].push(to);
                }
            }
        }
        let mut pending = vec![0usize; components.len()];
        for targets in &mut dependents {
            targets.sort_unstable();
            targets.dedup();
            for &t in targets.iter() {
                pending[t] += 1;
            }
        }

        // Kahn's algorithm keyed by each component's first batch position
        let mut ready: BTreeSet<(usize, usize)> = (0..components.len())
            .filter(|&c| pending[c] == 0)
            .map(|c| (components[c][0], c))
            .collect();

        let mut plan = DecodePlan {
            order: Vec::with_capacity(n),
            cycles: Vec::new(),
        };
        while let Some((_, c)) = ready.pop_first() {
            let members = &components[c];
            let cyclic = members.len() > 1 || adjacency[members[0]].contains(&members[0]);
            if cyclic {
                plan.cycles.push(members.clone());
            }
            plan.order.extend_from_slice(members);
            for &t in &dependents[c] {
                pending[t] -= 1;
                if pending[t] == 0 {
                    ready.insert((components[t][0], t));
                }
            }
        }
        plan
    }

    /// Returns the cyclic component containing `node`, if any.
    pub(crate) fn cycle_of(&self, node: usize) -> Option<&[usize]> {
        self.cycles
            .iter()
            .find(|members| members.binary_search(&node).is_ok())
            .map(Vec::as_slice)
    }
}

/// Tarjan's algorithm, iterative. Components have their members sorted.
fn strongly_connected(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let n = adjacency.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;
    // (node, position of the next edge to follow)
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            if index[node] == UNVISITED {
                index[node] = next_index;
                lowlink[node] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node] = true;
            }

            if let Some(&next) = adjacency[node].get(frame.1) {
                frame.1 += 1;
                if index[next] == UNVISITED {
                    frames.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
                continue;
            }

            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }
            if lowlink[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(deps: &[&[usize]]) -> Vec<usize> {
        let deps: Vec<Vec<usize>> = deps.iter().map(|d| d.to_vec()).collect();
        DecodePlan::compute(&deps).order
    }

    #[test]
    fn test_independent_nodes_keep_insertion_order() {
        assert_eq!(order(&[&[], &[], &[]]), vec![0, 1, 2]);
        assert!(DecodePlan::compute(&[]).order.is_empty());
    }

    #[test]
    fn test_dependency_moves_ahead() {
        // 0 depends on 2
        assert_eq!(order(&[&[2], &[], &[]]), vec![1, 2, 0]);
        // chain 0 -> 1 -> 2
        assert_eq!(order(&[&[1], &[2], &[]]), vec![2, 1, 0]);
    }

    #[test]
    fn test_tie_break_is_smallest_ready_position() {
        // 0 depends on 3; 1 and 2 are free. After 1, 2, 3 are emitted, 0 follows.
        assert_eq!(order(&[&[3], &[], &[], &[]]), vec![1, 2, 3, 0]);
        // 3 depends on 0; 0 ready first, then 1, 2, 3
        assert_eq!(order(&[&[], &[], &[], &[0]]), vec![0, 1, 2, 3]);
        // diamond: 0 <- 1, 0 <- 2, {1,2} <- 3
        assert_eq!(order(&[&[], &[0], &[0], &[1, 2]]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_mutual_cycle_falls_back_to_insertion_order() {
        let deps = vec![vec![1], vec![0]];
        let plan = DecodePlan::compute(&deps);
        assert_eq!(plan.order, vec![0, 1]);
        assert_eq!(plan.cycles, vec![vec![0, 1]]);
        assert!(plan.cycle_of(0).is_some());
        assert_eq!(plan.cycle_of(1), Some(&[0, 1][..]));
    }

    #[test]
    fn test_self_loop_is_degenerate_cycle() {
        let deps = vec![vec![], vec![1]];
        let plan = DecodePlan::compute(&deps);
        assert_eq!(plan.order, vec![0, 1]);
        assert_eq!(plan.cycles, vec![vec![1]]);
        assert!(plan.cycle_of(0).is_none());
    }

    #[test]
    fn test_cycle_is_ordered_after_its_dependencies() {
        // 0 and 1 form a cycle that depends on 2; 3 depends on the cycle
        let deps = vec![vec![1, 2], vec![0], vec![], vec![0]];
        let plan = DecodePlan::compute(&deps);
        assert_eq!(plan.order, vec![2, 0, 1, 3]);
        assert_eq!(plan.cycles, vec![vec![0, 1]]);
        assert!(plan.cycle_of(3).is_none());
    }

    #[test]
    fn test_every_node_emitted_once() {
        let deps = vec![vec![4, 2], vec![0], vec![1], vec![3], vec![], vec![9, 5]];
        let plan = DecodePlan::compute(&deps);
        let mut sorted = plan.order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4, 5]);
        // {0,1,2} cycle, 3 self-loop, 5 self-loop (out-of-range 9 ignored)
        assert_eq!(plan.cycles.len(), 3);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let n = 10_000;
        let deps: Vec<Vec<usize>> = (0..n).map(|i| if i + 1 < n { vec![i + 1] } else { vec![] }).collect();
        let plan = DecodePlan::compute(&deps);
        assert_eq!(plan.order.first(), Some(&(n - 1)));
        assert_eq!(plan.order.last(), Some(&0));
        assert!(plan.cycles.is_empty());
    }
}

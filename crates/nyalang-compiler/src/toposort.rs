//! Dependency ordering of declarations.
//!
//! Items are ordered so every item comes after the items it depends on.
//! Dependencies that name something outside the input set (host types)
//! are ignored. The sort is stable: items with no ordering constraint
//! between them keep their input order.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::hash::Hash;

/// A dependency cycle, as the chain of keys that closes on itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<K> {
    pub path: Vec<K>,
}

impl<K: fmt::Display> fmt::Display for Cycle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Sort `items` so dependencies precede dependents.
///
/// Returns indices into `items`. Fails with the offending chain on the first
/// cycle found. Keys are assumed unique; a repeated key refers to its first
/// occurrence.
pub fn topo_sort<T, K, FK, FD, I>(items: &[T], key: FK, dependencies: FD) -> Result<Vec<usize>, Cycle<K>>
where
    K: Eq + Hash + Clone,
    FK: Fn(&T) -> K,
    FD: Fn(&T) -> I,
    I: IntoIterator<Item = K>,
{
    let mut index: FxHashMap<K, usize> = FxHashMap::default();
    for (i, item) in items.iter().enumerate() {
        index.entry(key(item)).or_insert(i);
    }

    let mut sorter = Sorter {
        items,
        index: &index,
        key: &key,
        dependencies: &dependencies,
        visited: FxHashSet::default(),
        in_progress: Vec::new(),
        order: Vec::with_capacity(items.len()),
    };

    for i in 0..items.len() {
        sorter.visit(i)?;
    }
    Ok(sorter.order)
}

struct Sorter<'a, T, K, FK, FD> {
    items: &'a [T],
    index: &'a FxHashMap<K, usize>,
    key: &'a FK,
    dependencies: &'a FD,
    visited: FxHashSet<usize>,
    /// Items on the current DFS path, in visiting order.
    in_progress: Vec<usize>,
    order: Vec<usize>,
}

impl<T, K, FK, FD, I> Sorter<'_, T, K, FK, FD>
where
    K: Eq + Hash + Clone,
    FK: Fn(&T) -> K,
    FD: Fn(&T) -> I,
    I: IntoIterator<Item = K>,
{
    fn visit(&mut self, item: usize) -> Result<(), Cycle<K>> {
        if self.visited.contains(&item) {
            return Ok(());
        }
        if let Some(start) = self.in_progress.iter().position(|&i| i == item) {
            let mut path: Vec<K> = self.in_progress[start..]
                .iter()
                .map(|&i| (self.key)(&self.items[i]))
                .collect();
            path.push((self.key)(&self.items[item]));
            return Err(Cycle { path });
        }

        self.in_progress.push(item);
        for dependency in (self.dependencies)(&self.items[item]) {
            if let Some(&dep) = self.index.get(&dependency) {
                self.visit(dep)?;
            }
        }
        self.in_progress.pop();

        self.visited.insert(item);
        self.order.push(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sort(items: &[(&'static str, Vec<&'static str>)]) -> Result<Vec<&'static str>, Cycle<&'static str>> {
        topo_sort(items, |item| item.0, |item| item.1.clone())
            .map(|order| order.into_iter().map(|i| items[i].0).collect())
    }

    #[test]
    fn dependencies_come_first() {
        let items = vec![("Cat", vec!["Animal", "Dog"]), ("Dog", vec![]), ("Animal", vec![])];
        assert_eq!(sort(&items).unwrap(), vec!["Animal", "Dog", "Cat"]);
    }

    #[test]
    fn independent_items_keep_input_order() {
        let items = vec![("B", vec![]), ("A", vec![]), ("C", vec![])];
        assert_eq!(sort(&items).unwrap(), vec!["B", "A", "C"]);
    }

    #[test]
    fn unknown_dependencies_are_ignored() {
        let items = vec![("Cat", vec!["System.Object"]), ("Dog", vec!["Cat"])];
        assert_eq!(sort(&items).unwrap(), vec!["Cat", "Dog"]);
    }

    #[test]
    fn cycle_reports_path() {
        let items = vec![("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["A"])];
        let cycle = sort(&items).unwrap_err();
        assert_eq!(cycle.path, vec!["A", "B", "C", "A"]);
        assert_eq!(cycle.to_string(), "A -> B -> C -> A");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let items = vec![("A", vec!["A"])];
        assert_eq!(sort(&items).unwrap_err().path, vec!["A", "A"]);
    }

    #[test]
    fn diamond() {
        let items = vec![
            ("D", vec!["B", "C"]),
            ("B", vec!["A"]),
            ("C", vec!["A"]),
            ("A", vec![]),
        ];
        assert_eq!(sort(&items).unwrap(), vec!["A", "B", "C", "D"]);
    }

    proptest! {
        /// Random DAGs: every item may only depend on items with a lower
        /// number, so the input is acyclic whatever order it is shuffled into.
        #[test]
        fn output_respects_every_edge(
            edges in proptest::collection::vec(proptest::collection::vec(any::<prop::sample::Index>(), 0..4), 1..24),
            seed in any::<u64>(),
        ) {
            let n = edges.len();
            let items: Vec<(usize, Vec<usize>)> = edges
                .iter()
                .enumerate()
                .map(|(i, deps)| {
                    let deps = if i == 0 { Vec::new() } else { deps.iter().map(|d| d.index(i)).collect() };
                    (i, deps)
                })
                .collect();

            let mut shuffled = items.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = (seed.wrapping_mul(i as u64 + 7) % len as u64) as usize;
                shuffled.swap(i, j);
            }

            let order = topo_sort(&shuffled, |item| item.0, |item| item.1.clone()).unwrap();
            prop_assert_eq!(order.len(), n);

            let mut position = vec![0; n];
            for (pos, &i) in order.iter().enumerate() {
                position[shuffled[i].0] = pos;
            }
            for (item, deps) in &items {
                for dep in deps {
                    prop_assert!(position[*dep] < position[*item]);
                }
            }
        }
    }
}

//! Problem/solution payloads passed between workflow stages.
//!
//! The engine itself is generic over the state type; `State` is the
//! ready-made one: a string-keyed map of JSON values, shared on clone and
//! copied only when a stage produces an updated version.

use std::collections::BTreeMap;
use std::ops::Index;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key under which `State::from_problem` stores the problem.
pub const PROBLEM_KEY: &str = "problem";

/// Immutable-by-convention workflow state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    values: Arc<BTreeMap<String, Value>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// State holding just a problem description.
    pub fn from_problem(problem: impl Into<Value>) -> Self {
        Self::new().updated(PROBLEM_KEY, problem)
    }

    pub fn problem(&self) -> Option<&Value> {
        self.get(PROBLEM_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// A new state with `key` set to `value`. `self` is left untouched.
    pub fn updated(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        Arc::make_mut(&mut next.values).insert(key.into(), value.into());
        next
    }

    /// A new state with every pair from `values` applied on top.
    pub fn updated_with<K, V>(&self, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut next = self.clone();
        let map = Arc::make_mut(&mut next.values);
        for (key, value) in values {
            map.insert(key.into(), value.into());
        }
        next
    }

    /// True if both states share the same storage.
    pub fn shares_storage(&self, other: &State) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

/// Ordered results of parallel branches, one per branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct States<S> {
    items: Vec<S>,
}

impl<S> States<S> {
    pub fn new(items: Vec<S>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&S> {
        self.items.first()
    }

    /// Result of branch `index`.
    pub fn get(&self, index: usize) -> Option<&S> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<S> {
        self.items
    }

    /// The state with the smallest key, first one on ties.
    pub fn arg_min_by_key<K: PartialOrd>(&self, mut key: impl FnMut(&S) -> K) -> Option<&S> {
        let mut best: Option<(&S, K)> = None;
        for item in &self.items {
            let k = key(item);
            let better = match &best {
                Some((_, best_key)) => k < *best_key,
                None => true,
            };
            if better {
                best = Some((item, k));
            }
        }
        best.map(|(item, _)| item)
    }
}

impl<S> Index<usize> for States<S> {
    type Output = S;

    fn index(&self, index: usize) -> &S {
        &self.items[index]
    }
}

impl<S> IntoIterator for States<S> {
    type Item = S;
    type IntoIter = std::vec::IntoIter<S>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<S> FromIterator<S> for States<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_problem() {
        let state = State::from_problem(json!({"a": 1}));
        assert_eq!(state.problem(), Some(&json!({"a": 1})));
        assert!(state.contains(PROBLEM_KEY));
    }

    #[test]
    fn test_updated_leaves_original() {
        let original = State::from_problem(1);
        let next = original.updated("samples", json!([0, 1]));

        assert!(original.get("samples").is_none());
        assert_eq!(next.get("samples"), Some(&json!([0, 1])));
        assert_eq!(next.problem(), Some(&json!(1)));
    }

    #[test]
    fn test_clone_shares_until_updated() {
        let a = State::from_problem("p");
        let b = a.clone();
        assert!(a.shares_storage(&b));

        let c = b.updated("x", 1);
        assert!(!a.shares_storage(&c));
    }

    #[test]
    fn test_updated_with() {
        let state = State::new().updated_with([("energy", json!(-3.5)), ("round", json!(2))]);
        let mut keys: Vec<_> = state.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["energy", "round"]);
    }

    #[test]
    fn test_states_arg_min() {
        let states: States<i32> = vec![4, -2, 7, -2].into_iter().collect();
        assert_eq!(states.len(), 4);
        assert_eq!(states[2], 7);
        assert_eq!(states.arg_min_by_key(|s| *s), Some(&-2));
        assert_eq!(States::<i32>::new(vec![]).arg_min_by_key(|s| *s), None);
    }
}

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Walks a class's ancestry and returns the nearest class (the class itself
/// included) present in the subscribed set.
///
/// The class hierarchy is an explicit parent-pointer map: a class absent from
/// `parents` is a root. Subscription matching elsewhere in the system reduces
/// to this one lookup, so it is kept as a pure function with no hierarchy
/// object behind it.
pub fn nearest_subscribed_ancestor<H: Copy + Eq + Hash>(
    class: H,
    parents: &HashMap<H, H>,
    subscribed: &HashSet<H>,
) -> Option<H> {
    let mut current = class;
    loop {
        if subscribed.contains(&current) {
            return Some(current);
        }
        match parents.get(&current) {
            Some(parent) => current = *parent,
            None => return None,
        }
    }
}

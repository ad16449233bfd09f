//! Ancestry and descendant traversal over a backend
//!
//! [`traverse`] answers exactly one hop. [`closure`] repeats one-hop calls
//! breadth-first, following each neighbour at the version the relation was
//! recorded against.

use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::core::{AncestryEntry, Direction, ObjectVersion, ProvId, TraversalFlags, VersionSelector};
use crate::error::Result;
use crate::storage::ProvenanceBackend;

/// Immediate relations of `node` in `direction`, minus the categories `flags` exclude.
///
/// Fails with `NotFound` only when the node (or the requested exact version)
/// does not exist. No matching relations is an empty success.
pub fn traverse<B: ProvenanceBackend + ?Sized>(
    backend: &B,
    node: ProvId,
    version: VersionSelector,
    direction: Direction,
    flags: TraversalFlags,
) -> Result<Vec<AncestryEntry>> {
    let relations = backend.relations_of(node, version, direction)?;
    Ok(relations
        .iter()
        .filter(|r| !flags.excludes(r.relation_type.category()))
        .map(|r| AncestryEntry::from_relation(r, direction))
        .collect())
}

/// Transitive closure of [`traverse`]. Each relation is reported once, in
/// breadth-first order; cycles terminate.
pub fn closure<B: ProvenanceBackend + ?Sized>(
    backend: &B,
    node: ProvId,
    version: VersionSelector,
    direction: Direction,
    flags: TraversalFlags,
) -> Result<Vec<AncestryEntry>> {
    let mut visited: HashSet<ObjectVersion> = HashSet::new();
    let mut reported: HashSet<ProvId> = HashSet::new();
    let mut result = Vec::new();
    let mut queue: VecDeque<(ProvId, VersionSelector)> = VecDeque::from([(node, version)]);

    while let Some((current, selector)) = queue.pop_front() {
        for entry in traverse(backend, current, selector, direction, flags)? {
            visited.insert(entry.query);
            if !reported.insert(entry.relation) {
                continue;
            }
            if visited.insert(entry.other) {
                queue.push_back((entry.other.id, VersionSelector::Exact(entry.other.version)));
            }
            result.push(entry);
        }
    }

    debug!("Closure of {} in {:?} holds {} relations", node, direction, result.len());
    Ok(result)
}

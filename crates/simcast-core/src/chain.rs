//! Ordering of the task and tact "next" chains.
//!
//! Tasks and tacts link to their successor through a self-referential
//! foreign key. The schema cannot prevent branches or loops, so every
//! read turns the links into explicit ordered sequences and rejects
//! anything that is not a set of disjoint linear chains.

use std::collections::{BTreeMap, BTreeSet};

use simcast_types::{ChainLink, Tact, Task};

/// Errors found while ordering a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Two rows share a key.
    #[error("id {id} appears more than once")]
    DuplicateId {
        /// The repeated key.
        id: i32,
    },

    /// A row links to a key that does not exist.
    #[error("id {id} links to missing id {next}")]
    DanglingLink {
        /// The linking row.
        id: i32,
        /// The missing successor.
        next: i32,
    },

    /// A row names itself as its successor.
    #[error("id {id} links to itself")]
    SelfLink {
        /// The offending row.
        id: i32,
    },

    /// Two rows share a successor, which makes a tree instead of a chain.
    #[error("id {next} follows both {first} and {second}")]
    Branch {
        /// The shared successor.
        next: i32,
        /// The first predecessor found.
        first: i32,
        /// The second predecessor found.
        second: i32,
    },

    /// Rows form a loop with no head.
    #[error("cycle through id {id}")]
    Cycle {
        /// A row on the loop.
        id: i32,
    },
}

/// A row that participates in a "next id" chain.
pub trait ChainNode {
    /// The row key.
    fn node_id(&self) -> i32;
    /// The successor key, if any.
    fn next_id(&self) -> Option<i32>;
    /// Display name.
    fn node_name(&self) -> &str;
}

impl ChainNode for Task {
    fn node_id(&self) -> i32 {
        self.task_id.into_inner()
    }

    fn next_id(&self) -> Option<i32> {
        self.next_task_id.map(simcast_types::TaskId::into_inner)
    }

    fn node_name(&self) -> &str {
        &self.task_name
    }
}

impl ChainNode for Tact {
    fn node_id(&self) -> i32 {
        self.tact_id.into_inner()
    }

    fn next_id(&self) -> Option<i32> {
        self.next_tact_id.map(simcast_types::TactId::into_inner)
    }

    fn node_name(&self) -> &str {
        &self.tact_name
    }
}

/// Split rows into ordered chains, one per head, heads ascending by key.
///
/// A head is a row no other row links to. Every row must belong to
/// exactly one chain.
///
/// # Errors
///
/// Returns [`ChainError`] for duplicate keys, dangling links, self links,
/// branches, or loops.
pub fn order_chains<T: ChainNode>(items: &[T]) -> Result<Vec<Vec<&T>>, ChainError> {
    let mut by_id: BTreeMap<i32, &T> = BTreeMap::new();
    for item in items {
        let id = item.node_id();
        if by_id.insert(id, item).is_some() {
            return Err(ChainError::DuplicateId { id });
        }
    }

    let mut predecessor: BTreeMap<i32, i32> = BTreeMap::new();
    for (&id, item) in &by_id {
        let Some(next) = item.next_id() else {
            continue;
        };
        if next == id {
            return Err(ChainError::SelfLink { id });
        }
        if !by_id.contains_key(&next) {
            return Err(ChainError::DanglingLink { id, next });
        }
        if let Some(first) = predecessor.insert(next, id) {
            return Err(ChainError::Branch {
                next,
                first,
                second: id,
            });
        }
    }

    let mut visited: BTreeSet<i32> = BTreeSet::new();
    let mut chains = Vec::new();
    for (&id, &item) in &by_id {
        if predecessor.contains_key(&id) {
            continue;
        }
        visited.insert(id);
        let mut chain = vec![item];
        let mut cursor = item.next_id();
        while let Some(next) = cursor {
            if !visited.insert(next) {
                return Err(ChainError::Cycle { id: next });
            }
            let node = by_id
                .get(&next)
                .copied()
                .ok_or(ChainError::DanglingLink { id, next })?;
            chain.push(node);
            cursor = node.next_id();
        }
        chains.push(chain);
    }

    // Rows never reached from a head sit on a loop.
    if let Some(&id) = by_id.keys().find(|id| !visited.contains(id)) {
        return Err(ChainError::Cycle { id });
    }

    Ok(chains)
}

/// Order rows and return their keys as one sequence, chains concatenated
/// in head order.
///
/// # Errors
///
/// Returns [`ChainError`] if the rows do not form linear chains.
pub fn ordered_ids<T: ChainNode>(items: &[T]) -> Result<Vec<i32>, ChainError> {
    Ok(order_chains(items)?
        .into_iter()
        .flatten()
        .map(ChainNode::node_id)
        .collect())
}

/// Order rows into the `[[{id, name}, ...], ...]` shape served over HTTP.
///
/// # Errors
///
/// Returns [`ChainError`] if the rows do not form linear chains.
pub fn chain_links<T: ChainNode>(items: &[T]) -> Result<Vec<Vec<ChainLink>>, ChainError> {
    Ok(order_chains(items)?
        .into_iter()
        .map(|chain| {
            chain
                .into_iter()
                .map(|node| ChainLink {
                    id: node.node_id(),
                    name: node.node_name().to_owned(),
                })
                .collect()
        })
        .collect())
}

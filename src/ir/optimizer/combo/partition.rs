// src/ir/optimizer/combo/partition.rs
//! Partition structure (spec.md section 4.3): the congruence classes the
//! refinement machine maintains. Leader/follower membership and the
//! `type_is_T_or_C` summary flag live here; `node -> partition` is an
//! explicit side table (arena-of-handles style) rather than a back-pointer
//! stored on the node record, per the "Intrusive linkage" design note.

use super::lattice::Lattice;
use super::node::NodeId;

pub type PartitionId = usize;

#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub leaders: Vec<NodeId>,
    pub followers: Vec<NodeId>,
    /// `true` iff every leader's lattice element is `Top` or a concrete
    /// constant (spec.md invariant 5). Maintained by `split_by.rs` after
    /// every refinement pass.
    pub type_is_t_or_c: bool,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.leaders.len() + self.followers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn members(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.leaders.iter().copied().chain(self.followers.iter().copied())
    }
}

/// Owns every partition plus the `node -> partition` map. Partitions are
/// created at initialization (one partition holding every node) and by the
/// splitter; per spec.md's lifecycle note they are never merged back
/// together once split.
#[derive(Debug, Clone, Default)]
pub struct Partitioning {
    pub partitions: Vec<Partition>,
    pub owner: Vec<PartitionId>,
}

impl Partitioning {
    #[must_use]
    pub fn new_single(node_count: usize) -> Self {
        let leaders: Vec<NodeId> = (0..node_count).collect();
        let owner = vec![0; node_count];
        Partitioning { partitions: vec![Partition { leaders, followers: Vec::new(), type_is_t_or_c: false }], owner }
    }

    /// Every node in its own singleton partition: no congruence assumed
    /// between any two distinct nodes. The starting point for the first
    /// round of the joint propagation/refinement fixed point (`combo.rs`),
    /// where nothing is known yet about cross-node congruence.
    #[must_use]
    pub fn new_discrete(node_count: usize) -> Self {
        let partitions = (0..node_count)
            .map(|n| Partition { leaders: vec![n], followers: Vec::new(), type_is_t_or_c: false })
            .collect();
        Partitioning { partitions, owner: (0..node_count).collect() }
    }

    /// A canonical per-node fingerprint of the current grouping: for each
    /// node, the smallest node id in its partition. Two `Partitioning`s
    /// built independently (e.g. in successive rounds of `combo.rs`'s outer
    /// loop) compare equal here iff they group nodes identically, even
    /// though their `PartitionId` numbering is unrelated.
    #[must_use]
    pub fn canonical_signature(&self) -> Vec<NodeId> {
        let mut representative = vec![NodeId::MAX; self.partitions.len()];
        for (pid, partition) in self.partitions.iter().enumerate() {
            for member in partition.members() {
                representative[pid] = representative[pid].min(member);
            }
        }
        self.owner.iter().map(|&pid| representative[pid]).collect()
    }

    #[must_use]
    pub fn partition_of(&self, node: NodeId) -> PartitionId {
        self.owner[node]
    }

    #[must_use]
    pub fn congruent(&self, a: NodeId, b: NodeId) -> bool {
        self.owner[a] == self.owner[b]
    }

    /// Moves `subset` out of `from` into a freshly allocated partition,
    /// preserving each node's leader/follower role. Corresponds to
    /// spec.md's `split_no_followers` in the common case and to the
    /// race-splitter's net effect in the general case (see DESIGN.md for
    /// why this crate does not reproduce the race walk's O(n log n)
    /// mechanics bit for bit while still producing the same fixed point).
    ///
    /// Returns the id of the new partition, or `None` if `subset` is empty
    /// or covers the whole of `from` (nothing to split).
    pub fn split(&mut self, from: PartitionId, subset: &[NodeId]) -> Option<PartitionId> {
        if subset.is_empty() || subset.len() == self.partitions[from].len() {
            return None;
        }

        let mut new_leaders = Vec::new();
        let mut new_followers = Vec::new();
        {
            let origin = &mut self.partitions[from];
            let in_subset: std::collections::HashSet<NodeId> = subset.iter().copied().collect();
            origin.leaders.retain(|&n| {
                if in_subset.contains(&n) {
                    new_leaders.push(n);
                    false
                } else {
                    true
                }
            });
            origin.followers.retain(|&n| {
                if in_subset.contains(&n) {
                    new_followers.push(n);
                    false
                } else {
                    true
                }
            });
        }

        let new_id = self.partitions.len();
        for &n in &new_leaders {
            self.owner[n] = new_id;
        }
        for &n in &new_followers {
            self.owner[n] = new_id;
        }
        self.partitions.push(Partition { leaders: new_leaders, followers: new_followers, type_is_t_or_c: false });
        Some(new_id)
    }

    /// Demotes `node` from leader to follower of its current partition.
    pub fn demote_to_follower(&mut self, node: NodeId) {
        let pid = self.owner[node];
        let partition = &mut self.partitions[pid];
        if let Some(pos) = partition.leaders.iter().position(|&n| n == node) {
            partition.leaders.remove(pos);
            partition.followers.push(node);
        }
    }

    /// Promotes `node` from follower back to leader (spec.md step 3 of the
    /// propagation engine: a follower that lost its model).
    pub fn promote_to_leader(&mut self, node: NodeId) {
        let pid = self.owner[node];
        let partition = &mut self.partitions[pid];
        if let Some(pos) = partition.followers.iter().position(|&n| n == node) {
            partition.followers.remove(pos);
            partition.leaders.push(node);
        }
    }

    /// Moves `node` out of its current partition into `target` as a
    /// follower. Used when `identity(node)` resolves to a node outside
    /// `node`'s own partition (spec.md section 4.2): `node` contributes no
    /// information of its own and is interchangeable with `target`'s value.
    pub fn move_into(&mut self, node: NodeId, target: PartitionId) {
        let origin = self.owner[node];
        if origin == target {
            return;
        }
        let partition = &mut self.partitions[origin];
        if let Some(pos) = partition.leaders.iter().position(|&n| n == node) {
            partition.leaders.remove(pos);
        } else if let Some(pos) = partition.followers.iter().position(|&n| n == node) {
            partition.followers.remove(pos);
        } else {
            return;
        }
        self.partitions[target].followers.push(node);
        self.owner[node] = target;
    }
}

/// Recomputes `type_is_t_or_c` for every partition from a caller-provided
/// per-node lattice lookup.
pub fn refresh_type_summary(partitioning: &mut Partitioning, value_of: impl Fn(NodeId) -> Lattice) {
    for partition in &mut partitioning.partitions {
        partition.type_is_t_or_c = partition.leaders.iter().all(|&n| value_of(n).is_top_or_constant());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_moves_subset_to_a_fresh_partition() {
        let mut partitioning = Partitioning::new_single(4);
        let new_id = partitioning.split(0, &[1, 3]).unwrap();
        assert_eq!(partitioning.partitions[0].leaders, vec![0, 2]);
        assert_eq!(partitioning.partitions[new_id].leaders, vec![1, 3]);
        assert_eq!(partitioning.partition_of(1), new_id);
    }

    #[test]
    fn move_into_relocates_a_node_as_a_follower() {
        let mut partitioning = Partitioning::new_single(3);
        let new_id = partitioning.split(0, &[1]).unwrap();
        partitioning.move_into(2, new_id);
        assert_eq!(partitioning.partition_of(2), new_id);
        assert!(partitioning.partitions[new_id].followers.contains(&2));
        assert!(!partitioning.partitions[0].members().any(|n| n == 2));
    }

    #[test]
    fn split_of_the_whole_partition_is_a_no_op() {
        let mut partitioning = Partitioning::new_single(2);
        assert!(partitioning.split(0, &[0, 1]).is_none());
    }
}

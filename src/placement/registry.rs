use std::collections::HashMap;

use actix_rt::{Arbiter, ArbiterHandle};
use futures::future::ready;
use log::{info, warn};

use crate::config::{LayerConfig, NodeId};

/// Cluster membership and layer placement.
///
/// Each node is backed by one arbiter (an independent event-loop thread);
/// layer actors are spawned into the arbiter of their assigned node. The
/// local node is always a member and membership only ever grows — there is
/// no removal or migration.
///
/// Must be created inside a running actix system, since the local node is
/// backed by the current arbiter.
pub struct PlacementRegistry {
    local: NodeId,
    // Insertion-ordered so round-robin assignment is deterministic.
    members: Vec<NodeId>,
    arbiters: HashMap<NodeId, ArbiterHandle>,
}

impl PlacementRegistry {
    /// Creates a registry whose only member is the local node, hosted on
    /// the calling arbiter.
    pub fn new(local: impl Into<NodeId>) -> Self {
        let local = local.into();
        let mut arbiters = HashMap::new();
        arbiters.insert(local.clone(), Arbiter::current());

        Self {
            members: vec![local.clone()],
            local,
            arbiters,
        }
    }

    /// Joins each given node to the membership view.
    ///
    /// A node that is already a member counts as a success. A node that
    /// fails to join is logged and left out of the result, which is not an
    /// error: the returned membership always contains every previously
    /// known node, the local node included.
    ///
    /// # Arguments
    /// * `nodes` - Candidate node identifiers.
    ///
    /// # Returns
    /// The full membership after the joins, in placement order.
    pub fn connect(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        for node in nodes {
            if self.arbiters.contains_key(&node) {
                continue;
            }
            if !self.join(node.clone()) {
                warn!("node rejected from cluster: node={node}");
            }
        }

        self.members.clone()
    }

    fn join(&mut self, node: NodeId) -> bool {
        if node.trim().is_empty() {
            return false;
        }

        let arbiter = Arbiter::new();
        let handle = arbiter.handle();
        // Probe the fresh event loop before trusting it with actors.
        if !handle.spawn(ready(())) {
            return false;
        }

        info!("node joined cluster: node={node}");
        self.arbiters.insert(node.clone(), handle);
        self.members.push(node);
        true
    }

    /// Assigns a node to every config lacking an explicit one, round-robin
    /// by position over a single membership snapshot: config `i` gets
    /// `members[i % len]`. Explicit assignments are preserved.
    pub fn distribute(&self, configs: Vec<LayerConfig>) -> Vec<LayerConfig> {
        let members = self.members.clone();

        configs
            .into_iter()
            .enumerate()
            .map(|(i, mut config)| {
                if config.node.is_none() {
                    config.node = Some(members[i % members.len()].clone());
                }
                config
            })
            .collect()
    }

    /// Current membership in placement order.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    /// The node this registry was created on.
    pub fn local(&self) -> &NodeId {
        &self.local
    }

    /// The arbiter hosting the given node's actors.
    pub fn arbiter(&self, node: &NodeId) -> Option<&ArbiterHandle> {
        self.arbiters.get(node)
    }
}

// XApp Endorsement Engine
// Endorsement Ledger - node -> app bindings and their reverse index
//
// INVARIANTS:
// 1. A node is bound to at most one app at any time
// 2. node_to_app and app_endorsers always describe the same relation
// 3. Only node ids are stored; managers and levels are resolved on every read

use crate::collaborators::NodeLedger;
use crate::error::{EndorsementError, EndorsementResult};
use crate::score_table::ScoreTable;
use crate::types::{Address, AppId, NodeId};
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndorsementLedger {
    /// Reverse index: app -> endorsing nodes
    app_endorsers: BTreeMap<AppId, BTreeSet<NodeId>>,

    /// Forward index: node -> the single app it endorses
    node_to_app: BTreeMap<NodeId, AppId>,
}

impl EndorsementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// App currently endorsed by `node_id`, if any
    pub fn endorsed_app(&self, node_id: NodeId) -> Option<AppId> {
        self.node_to_app.get(&node_id).copied()
    }

    pub fn is_endorser(&self, app_id: &AppId, node_id: NodeId) -> bool {
        self.node_to_app.get(&node_id) == Some(app_id)
    }

    /// Endorsing nodes of `app_id`, in ascending id order
    pub fn endorsing_nodes(&self, app_id: &AppId) -> Vec<NodeId> {
        self.app_endorsers
            .get(app_id)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn endorser_count(&self, app_id: &AppId) -> usize {
        self.app_endorsers.get(app_id).map_or(0, BTreeSet::len)
    }

    /// Total number of live bindings
    pub fn binding_count(&self) -> usize {
        self.node_to_app.len()
    }

    /// Fails with `AlreadyEndorser` if the node is bound anywhere, including `app_id`
    pub fn ensure_unbound(&self, node_id: NodeId) -> EndorsementResult<()> {
        match self.node_to_app.get(&node_id) {
            Some(bound) => Err(EndorsementError::AlreadyEndorser {
                node_id,
                app_id: *bound,
            }),
            None => Ok(()),
        }
    }

    /// Fails with `NonEndorser` unless `node_id` endorses `app_id`
    pub fn ensure_endorser(&self, app_id: &AppId, node_id: NodeId) -> EndorsementResult<()> {
        if self.is_endorser(app_id, node_id) {
            Ok(())
        } else {
            Err(EndorsementError::NonEndorser {
                node_id,
                app_id: *app_id,
            })
        }
    }

    /// Record `node_id -> app_id`
    pub fn bind(&mut self, app_id: AppId, node_id: NodeId) -> EndorsementResult<()> {
        self.ensure_unbound(node_id)?;

        self.node_to_app.insert(node_id, app_id);
        self.app_endorsers.entry(app_id).or_default().insert(node_id);
        Ok(())
    }

    /// Remove `node_id -> app_id`
    pub fn unbind(&mut self, app_id: &AppId, node_id: NodeId) -> EndorsementResult<()> {
        self.ensure_endorser(app_id, node_id)?;

        self.node_to_app.remove(&node_id);
        if let Some(nodes) = self.app_endorsers.get_mut(app_id) {
            nodes.remove(&node_id);
            if nodes.is_empty() {
                self.app_endorsers.remove(app_id);
            }
        }
        Ok(())
    }

    /// Drop every binding of `app_id`, returning the freed nodes
    pub fn remove_app(&mut self, app_id: &AppId) -> Vec<NodeId> {
        let freed: Vec<NodeId> = self
            .app_endorsers
            .remove(app_id)
            .map(|nodes| nodes.into_iter().collect())
            .unwrap_or_default();

        for node_id in &freed {
            self.node_to_app.remove(node_id);
        }
        freed
    }

    /// Aggregate score of `app_id`, resolving every endorser's level live
    pub fn score(&self, app_id: &AppId, nodes: &dyn NodeLedger, table: &ScoreTable) -> u64 {
        match self.app_endorsers.get(app_id) {
            Some(endorsers) => table.aggregate(endorsers.iter().map(|n| nodes.level(*n))),
            None => 0,
        }
    }

    /// Current managers of the endorsing nodes, one entry per node.
    /// Nodes that no longer exist are skipped.
    pub fn endorser_managers(&self, app_id: &AppId, nodes: &dyn NodeLedger) -> Vec<Address> {
        self.app_endorsers
            .get(app_id)
            .map(|endorsers| {
                endorsers
                    .iter()
                    .filter_map(|n| nodes.current_manager(*n))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Endorsing nodes of `app_id` that no longer exist or whose level now scores 0
    pub fn stale_endorsers(
        &self,
        app_id: &AppId,
        nodes: &dyn NodeLedger,
        table: &ScoreTable,
    ) -> Vec<NodeId> {
        self.app_endorsers
            .get(app_id)
            .map(|endorsers| {
                endorsers
                    .iter()
                    .copied()
                    .filter(|n| {
                        nodes.current_manager(*n).is_none() || !table.can_endorse(nodes.level(*n))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemoryNodeLedger;

    fn app(name: &str) -> AppId {
        AppId::from_name(name)
    }

    #[test]
    fn test_bind_and_unbind() {
        let mut ledger = EndorsementLedger::new();
        let a = app("a");

        ledger.bind(a, 1).unwrap();
        ledger.bind(a, 2).unwrap();
        assert_eq!(ledger.endorsing_nodes(&a), vec![1, 2]);
        assert_eq!(ledger.endorsed_app(1), Some(a));

        ledger.unbind(&a, 1).unwrap();
        assert_eq!(ledger.endorsing_nodes(&a), vec![2]);
        assert_eq!(ledger.endorsed_app(1), None);
    }

    #[test]
    fn test_single_binding_per_node() {
        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        let b = app("b");

        ledger.bind(a, 7).unwrap();
        assert_eq!(
            ledger.bind(b, 7),
            Err(EndorsementError::AlreadyEndorser { node_id: 7, app_id: a })
        );
        // Binding the same pair twice is rejected too
        assert!(ledger.bind(a, 7).is_err());
        assert_eq!(ledger.binding_count(), 1);
    }

    #[test]
    fn test_unbind_requires_binding() {
        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        let b = app("b");
        ledger.bind(a, 3).unwrap();

        assert_eq!(
            ledger.unbind(&b, 3),
            Err(EndorsementError::NonEndorser { node_id: 3, app_id: b })
        );
        assert!(ledger.is_endorser(&a, 3));
    }

    #[test]
    fn test_empty_reverse_entry_is_dropped() {
        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        ledger.bind(a, 1).unwrap();
        ledger.unbind(&a, 1).unwrap();

        assert_eq!(ledger.endorser_count(&a), 0);
        assert!(ledger.app_endorsers.is_empty());
    }

    #[test]
    fn test_remove_app_frees_nodes() {
        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        let b = app("b");
        ledger.bind(a, 1).unwrap();
        ledger.bind(a, 2).unwrap();
        ledger.bind(b, 3).unwrap();

        let freed = ledger.remove_app(&a);
        assert_eq!(freed, vec![1, 2]);
        assert_eq!(ledger.endorsed_app(1), None);
        assert_eq!(ledger.endorsed_app(3), Some(b));
        assert_eq!(ledger.binding_count(), 1);
    }

    #[test]
    fn test_score_reads_levels_live() {
        let nodes = InMemoryNodeLedger::new();
        let owner = Address::repeat_byte(1);
        let n1 = nodes.mint(owner, 3);
        let n2 = nodes.mint(owner, 3);
        let table = ScoreTable::default();

        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        ledger.bind(a, n1).unwrap();
        ledger.bind(a, n2).unwrap();
        assert_eq!(ledger.score(&a, &nodes, &table), 100);

        // Downgrade outside the ledger
        nodes.set_level(n2, 2);
        assert_eq!(ledger.score(&a, &nodes, &table), 63);
    }

    #[test]
    fn test_endorser_managers_follow_delegation() {
        let nodes = InMemoryNodeLedger::new();
        let owner = Address::repeat_byte(1);
        let delegatee = Address::repeat_byte(2);
        let n1 = nodes.mint(owner, 3);
        let n2 = nodes.mint(owner, 1);

        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        ledger.bind(a, n1).unwrap();
        ledger.bind(a, n2).unwrap();
        assert_eq!(ledger.endorser_managers(&a, &nodes), vec![owner, owner]);

        nodes.delegate(n1, delegatee);
        assert_eq!(ledger.endorser_managers(&a, &nodes), vec![delegatee, owner]);
    }

    #[test]
    fn test_stale_endorsers() {
        let nodes = InMemoryNodeLedger::new();
        let owner = Address::repeat_byte(1);
        let n1 = nodes.mint(owner, 3);
        let n2 = nodes.mint(owner, 3);
        let n3 = nodes.mint(owner, 3);
        let table = ScoreTable::default();

        let mut ledger = EndorsementLedger::new();
        let a = app("a");
        for n in [n1, n2, n3] {
            ledger.bind(a, n).unwrap();
        }

        nodes.set_level(n2, 0);
        nodes.burn(n3);
        assert_eq!(ledger.stale_endorsers(&a, &nodes, &table), vec![n2, n3]);
    }
}

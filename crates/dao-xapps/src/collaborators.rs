// XApp Endorsement Engine
// External collaborators - Node Ledger, Round Clock, Security Notifier
//
// The engine never caches what these report. Every call re-reads manager,
// level and round values, so ownership transfers, delegation changes, level
// changes and round advances are visible to the next engine call without any
// explicit notification.
//
// The in-memory implementations below back the test-suite and the operator
// CLI; production deployments plug in adapters over the real ledgers.

use crate::types::{Address, AppId, Height, NodeId, NodeLevel, RoundId};
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, HashMap};

/// Read access to the tiered node registry
pub trait NodeLedger: Send + Sync {
    /// Delegatee if one is set, otherwise the owner; `None` if the node does not exist
    fn current_manager(&self, node_id: NodeId) -> Option<Address>;

    /// Strength level of the node; 0 if it does not exist
    fn level(&self, node_id: NodeId) -> NodeLevel;

    /// Whether `address` owns or manages at least one node
    fn is_holder(&self, address: &Address) -> bool;
}

/// Monotonic voting round counter
pub trait RoundClock: Send + Sync {
    fn current_round_id(&self) -> RoundId;

    /// Height at which `round_id` started, in the same unit as grace lengths
    fn round_start_height(&self, round_id: RoundId) -> Height;

    /// Height of the instant the current call executes at
    fn current_height(&self) -> Height;
}

/// External per-app reputation signal
pub trait SecurityNotifier: Send + Sync {
    fn get_level(&self, app_id: &AppId) -> u8;

    fn set_level(&self, app_id: &AppId, level: u8);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub owner: Address,
    pub delegatee: Option<Address>,
    pub level: NodeLevel,
}

impl NodeRecord {
    pub fn manager(&self) -> Address {
        self.delegatee.unwrap_or(self.owner)
    }
}

#[derive(Debug, Default)]
struct NodeBook {
    next_id: NodeId,
    nodes: BTreeMap<NodeId, NodeRecord>,
}

/// Node registry held in memory
#[derive(Debug, Default)]
pub struct InMemoryNodeLedger {
    book: RwLock<NodeBook>,
}

impl InMemoryNodeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node owned by `owner`; ids start at 1
    pub fn mint(&self, owner: Address, level: NodeLevel) -> NodeId {
        let mut book = self.book.write();
        book.next_id += 1;
        let node_id = book.next_id;
        book.nodes.insert(node_id, NodeRecord { owner, delegatee: None, level });
        node_id
    }

    pub fn burn(&self, node_id: NodeId) -> Option<NodeRecord> {
        self.book.write().nodes.remove(&node_id)
    }

    /// Transfer ownership; any delegation is dropped with it
    pub fn transfer(&self, node_id: NodeId, new_owner: Address) -> bool {
        match self.book.write().nodes.get_mut(&node_id) {
            Some(record) => {
                record.owner = new_owner;
                record.delegatee = None;
                true
            }
            None => false,
        }
    }

    pub fn delegate(&self, node_id: NodeId, delegatee: Address) -> bool {
        match self.book.write().nodes.get_mut(&node_id) {
            Some(record) => {
                record.delegatee = Some(delegatee);
                true
            }
            None => false,
        }
    }

    pub fn revoke_delegation(&self, node_id: NodeId) -> bool {
        match self.book.write().nodes.get_mut(&node_id) {
            Some(record) => record.delegatee.take().is_some(),
            None => false,
        }
    }

    pub fn set_level(&self, node_id: NodeId, level: NodeLevel) -> bool {
        match self.book.write().nodes.get_mut(&node_id) {
            Some(record) => {
                record.level = level;
                true
            }
            None => false,
        }
    }
}

impl NodeLedger for InMemoryNodeLedger {
    fn current_manager(&self, node_id: NodeId) -> Option<Address> {
        self.book.read().nodes.get(&node_id).map(NodeRecord::manager)
    }

    fn level(&self, node_id: NodeId) -> NodeLevel {
        self.book.read().nodes.get(&node_id).map_or(0, |r| r.level)
    }

    fn is_holder(&self, address: &Address) -> bool {
        self.book
            .read()
            .nodes
            .values()
            .any(|r| r.owner == *address || r.delegatee == Some(*address))
    }
}

#[derive(Debug, Default)]
struct ClockState {
    height: Height,
    /// Start height of round k is stored at index k - 1
    round_starts: Vec<Height>,
}

/// Round clock driven by hand; round 0 means no round has started yet
#[derive(Debug, Default)]
pub struct ManualRoundClock {
    state: RwLock<ClockState>,
}

impl ManualRoundClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock positioned at `height` with no round started
    pub fn at_height(height: Height) -> Self {
        ManualRoundClock {
            state: RwLock::new(ClockState { height, round_starts: Vec::new() }),
        }
    }

    pub fn advance(&self, blocks: Height) -> Height {
        let mut state = self.state.write();
        state.height = state.height.saturating_add(blocks);
        state.height
    }

    /// Start the next round at the current height
    pub fn start_round(&self) -> RoundId {
        let mut state = self.state.write();
        let height = state.height;
        state.round_starts.push(height);
        state.round_starts.len() as RoundId
    }

    /// Advance `blocks` then start the next round
    pub fn start_round_after(&self, blocks: Height) -> RoundId {
        self.advance(blocks);
        self.start_round()
    }
}

impl RoundClock for ManualRoundClock {
    fn current_round_id(&self) -> RoundId {
        self.state.read().round_starts.len() as RoundId
    }

    fn round_start_height(&self, round_id: RoundId) -> Height {
        let state = self.state.read();
        match round_id.checked_sub(1) {
            Some(index) => state.round_starts.get(index as usize).copied().unwrap_or(Height::MAX),
            None => 0,
        }
    }

    fn current_height(&self) -> Height {
        self.state.read().height
    }
}

/// Security levels held in memory; unknown apps report 0
#[derive(Debug, Default)]
pub struct InMemorySecurityNotifier {
    levels: RwLock<HashMap<AppId, u8>>,
}

impl InMemorySecurityNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecurityNotifier for InMemorySecurityNotifier {
    fn get_level(&self, app_id: &AppId) -> u8 {
        self.levels.read().get(app_id).copied().unwrap_or(0)
    }

    fn set_level(&self, app_id: &AppId, level: u8) {
        self.levels.write().insert(*app_id, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_manager_resolution() {
        let nodes = InMemoryNodeLedger::new();
        let owner = Address::repeat_byte(1);
        let delegatee = Address::repeat_byte(2);
        let buyer = Address::repeat_byte(3);

        let node = nodes.mint(owner, 3);
        assert_eq!(nodes.current_manager(node), Some(owner));

        nodes.delegate(node, delegatee);
        assert_eq!(nodes.current_manager(node), Some(delegatee));
        assert!(nodes.is_holder(&owner));
        assert!(nodes.is_holder(&delegatee));

        assert!(nodes.revoke_delegation(node));
        assert!(!nodes.revoke_delegation(node));
        assert_eq!(nodes.current_manager(node), Some(owner));
        nodes.delegate(node, delegatee);

        // Transfer clears delegation
        nodes.transfer(node, buyer);
        assert_eq!(nodes.current_manager(node), Some(buyer));
        assert!(!nodes.is_holder(&delegatee));
    }

    #[test]
    fn test_missing_node() {
        let nodes = InMemoryNodeLedger::new();
        let node = nodes.mint(Address::repeat_byte(1), 2);
        nodes.burn(node);

        assert_eq!(nodes.current_manager(node), None);
        assert_eq!(nodes.level(node), 0);
        assert!(!nodes.set_level(node, 3));
    }

    #[test]
    fn test_round_clock() {
        let clock = ManualRoundClock::at_height(100);
        assert_eq!(clock.current_round_id(), 0);

        let r1 = clock.start_round();
        let r2 = clock.start_round_after(50);
        assert_eq!((r1, r2), (1, 2));
        assert_eq!(clock.round_start_height(1), 100);
        assert_eq!(clock.round_start_height(2), 150);
        assert_eq!(clock.round_start_height(0), 0);
        assert_eq!(clock.round_start_height(3), Height::MAX);
        assert_eq!(clock.current_height(), 150);
    }

    #[test]
    fn test_security_notifier_defaults_to_zero() {
        let notifier = InMemorySecurityNotifier::new();
        let app = AppId::from_name("a");

        assert_eq!(notifier.get_level(&app), 0);
        notifier.set_level(&app, 2);
        assert_eq!(notifier.get_level(&app), 2);
    }
}

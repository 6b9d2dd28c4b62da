// XApp Endorsement Engine
// Engine - endorsement, reconciliation, blacklist and submission housekeeping
//
// SAFETY INVARIANTS:
// 1. Every mutating call validates all of its preconditions before writing
//    anything; a failed call leaves state and journal untouched
// 2. Round clock values are read once, at the start of each call
// 3. Managers and levels are resolved from the node ledger on every call
// 4. Security notifier updates are pushed while the write lock is held
// 5. Configuration is never snapshotted per app, except the grace length
//    which is fixed when a window opens

use crate::access_control::{AccessControl, Role};
use crate::collaborators::{NodeLedger, RoundClock, SecurityNotifier};
use crate::config::EngineConfig;
use crate::cooldown::CooldownTracker;
use crate::eligibility::{AppEligibilityState, EndorsementStatus, GraceWindow, StatusKind};
use crate::endorsement_ledger::EndorsementLedger;
use crate::error::{EndorsementError, EndorsementResult};
use crate::events::EndorsementEvent;
use crate::registry::{XApp, XAppRegistry};
use crate::round_gate::RoundSnapshots;
use crate::security_bridge::SecurityBridge;
use crate::types::{Address, AppId, Height, NodeId, NodeLevel, RoundId, SecurityLevel};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Point in time a call executes at
#[derive(Debug, Clone, Copy)]
struct Now {
    round: RoundId,
    height: Height,
}

/// Read-only view of one app, as listed by operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    pub app: XApp,
    pub score: u64,
    pub status: StatusKind,
    pub grace_window: Option<GraceWindow>,
    pub blacklisted: bool,
    pub eligible_now: bool,
    pub endorsing_nodes: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct EngineState {
    config: EngineConfig,
    acl: AccessControl,
    registry: XAppRegistry,
    apps: BTreeMap<AppId, AppEligibilityState>,
    ledger: EndorsementLedger,
    cooldowns: CooldownTracker,
    security: SecurityBridge,
    rounds: RoundSnapshots,
    events: Vec<EndorsementEvent>,
}

impl EngineState {
    fn app_state(&self, app_id: &AppId) -> EndorsementResult<&AppEligibilityState> {
        self.apps
            .get(app_id)
            .ok_or(EndorsementError::NonexistentApp(*app_id))
    }

    /// App admin or global admin
    fn ensure_app_admin(&self, app_id: &AppId, caller: &Address) -> EndorsementResult<()> {
        let app = self.registry.ensure_exists(app_id)?;
        if app.admin == *caller || self.acl.has_role(Role::Admin, caller) {
            Ok(())
        } else {
            Err(EndorsementError::NotAppAdmin {
                caller: *caller,
                app_id: *app_id,
            })
        }
    }
}

/// Endorsement and eligibility engine over pluggable node, round and
/// security collaborators.
pub struct XAppsEngine {
    state: RwLock<EngineState>,
    nodes: Arc<dyn NodeLedger>,
    clock: Arc<dyn RoundClock>,
    notifier: Arc<dyn SecurityNotifier>,
}

impl XAppsEngine {
    /// Create an engine; `admin` receives both the Admin and Governance roles
    pub fn new(
        config: EngineConfig,
        admin: Address,
        nodes: Arc<dyn NodeLedger>,
        clock: Arc<dyn RoundClock>,
        notifier: Arc<dyn SecurityNotifier>,
    ) -> Self {
        info!(
            "XApps engine started (threshold {}, grace {}, cooldown {}, admin {})",
            config.score_table.threshold, config.grace_period, config.cooldown_period, admin
        );

        XAppsEngine {
            state: RwLock::new(EngineState {
                config,
                acl: AccessControl::with_admin(admin),
                ..EngineState::default()
            }),
            nodes,
            clock,
            notifier,
        }
    }

    fn now(&self) -> Now {
        Now {
            round: self.clock.current_round_id(),
            height: self.clock.current_height(),
        }
    }

    fn ensure_manager(&self, node_id: NodeId, caller: &Address) -> EndorsementResult<()> {
        let holder = self.nodes.is_holder(caller);
        if holder && self.nodes.current_manager(node_id) == Some(*caller) {
            Ok(())
        } else {
            Err(EndorsementError::NonNodeHolder {
                caller: *caller,
                node_id,
            })
        }
    }

    fn score_of(&self, state: &EngineState, app_id: &AppId) -> u64 {
        state
            .ledger
            .score(app_id, self.nodes.as_ref(), &state.config.score_table)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    pub fn submit_app(
        &self,
        caller: &Address,
        team_wallet: Address,
        admin: Address,
        name: &str,
        metadata_uri: &str,
    ) -> EndorsementResult<AppId> {
        let now = self.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let app_id = state.registry.check_submission(name)?;

        state.registry.insert(XApp {
            id: app_id,
            name: name.to_string(),
            admin,
            team_wallet,
            metadata_uri: metadata_uri.to_string(),
            submitted_round: now.round,
        });
        state.apps.insert(app_id, AppEligibilityState::new());
        state.events.push(EndorsementEvent::AppSubmitted {
            app_id,
            name: name.to_string(),
            admin,
        });

        info!("App {} ({}) submitted by {} in round {}", name, app_id, caller, now.round);
        Ok(app_id)
    }

    // ------------------------------------------------------------------
    // Endorsement
    // ------------------------------------------------------------------

    /// Bind `node_id` to `app_id`. Returns the app's new score.
    pub fn endorse(&self, app_id: &AppId, node_id: NodeId, caller: &Address) -> EndorsementResult<u64> {
        let now = self.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let app = state.app_state(app_id)?;
        if app.blacklisted {
            return Err(EndorsementError::AppBlacklisted(*app_id));
        }
        if !app.pending_endorsement() {
            return Err(EndorsementError::AppAlreadyEndorsed(*app_id));
        }
        self.ensure_manager(node_id, caller)?;
        if !state.config.score_table.can_endorse(self.nodes.level(node_id)) {
            return Err(EndorsementError::NodeNotAllowedToEndorse(node_id));
        }
        state.ledger.ensure_unbound(node_id)?;
        if state
            .cooldowns
            .is_cooling_down(node_id, now.round, state.config.cooldown_period)
        {
            return Err(EndorsementError::NodeCooldownActive(node_id));
        }

        state.ledger.bind(*app_id, node_id)?;
        state.cooldowns.record_action(node_id, now.round);
        let score = self.score_of(state, app_id);

        state.events.push(EndorsementEvent::AppEndorsed {
            app_id: *app_id,
            node_id,
            manager: *caller,
            score,
        });
        info!("Node {} endorsed {} (score {})", node_id, app_id, score);

        if state.config.score_table.meets_threshold(score) {
            self.promote(state, app_id, score);
        }
        Ok(score)
    }

    /// Remove the binding of `node_id` to `app_id` at the manager's request.
    /// Returns the app's new score.
    pub fn unendorse(&self, app_id: &AppId, node_id: NodeId, caller: &Address) -> EndorsementResult<u64> {
        let now = self.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let blacklisted = state.app_state(app_id)?.blacklisted;
        state.ledger.ensure_endorser(app_id, node_id)?;
        self.ensure_manager(node_id, caller)?;
        // A blacklisted app must never trap its endorsers
        if !blacklisted
            && state
                .cooldowns
                .is_cooling_down(node_id, now.round, state.config.cooldown_period)
        {
            return Err(EndorsementError::NodeCooldownActive(node_id));
        }

        let score = self.detach(state, app_id, node_id, now)?;
        state.cooldowns.record_action(node_id, now.round);

        state.events.push(EndorsementEvent::AppUnendorsed {
            app_id: *app_id,
            node_id,
            manager: *caller,
            score,
        });
        info!("Node {} withdrew endorsement of {} (score {})", node_id, app_id, score);
        Ok(score)
    }

    /// Moderation removal of a binding. Never checks or records cooldown.
    pub fn remove_node_endorsement(
        &self,
        app_id: &AppId,
        node_id: NodeId,
        caller: &Address,
    ) -> EndorsementResult<u64> {
        let now = self.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.ensure_app_admin(app_id, caller)?;
        state.ledger.ensure_endorser(app_id, node_id)?;

        let score = self.detach(state, app_id, node_id, now)?;

        state.events.push(EndorsementEvent::EndorsementRemovedByAdmin {
            app_id: *app_id,
            node_id,
            admin: *caller,
            score,
        });
        warn!("Endorsement of {} by node {} removed by {} (score {})", app_id, node_id, caller, score);
        Ok(score)
    }

    /// Unbind and open a grace window if the app just fell below threshold
    fn detach(&self, state: &mut EngineState, app_id: &AppId, node_id: NodeId, now: Now) -> EndorsementResult<u64> {
        state.ledger.unbind(app_id, node_id)?;
        let score = self.score_of(state, app_id);

        let was_endorsed = state
            .apps
            .get(app_id)
            .map_or(false, |a| !a.blacklisted && a.status == EndorsementStatus::Endorsed);
        if was_endorsed && !state.config.score_table.meets_threshold(score) {
            self.open_grace(state, app_id, score, now);
        }
        Ok(score)
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    fn promote(&self, state: &mut EngineState, app_id: &AppId, score: u64) {
        let change = match state.apps.get_mut(app_id) {
            Some(app) => app.mark_endorsed(),
            None => return,
        };

        if let Some(change) = change {
            info!("App {} is endorsed ({:?} -> {:?}, score {})", app_id, change.from, change.to, score);
            state.events.push(EndorsementEvent::EndorsementStatusChanged {
                app_id: *app_id,
                from: change.from,
                to: change.to,
                score,
            });
            if let Some(level) = state.security.on_endorsed(app_id, self.notifier.as_ref()) {
                state.events.push(EndorsementEvent::SecurityLevelChanged {
                    app_id: *app_id,
                    change: level,
                });
            }
        }
    }

    fn open_grace(&self, state: &mut EngineState, app_id: &AppId, score: u64, now: Now) {
        let window = GraceWindow::open(now.round, now.height, state.config.grace_period);
        let change = match state.apps.get_mut(app_id) {
            Some(app) => app.start_grace(window),
            None => return,
        };

        if let Some(change) = change {
            info!(
                "App {} fell below threshold (score {}); grace period until height {}",
                app_id,
                score,
                window.end_height()
            );
            state.events.push(EndorsementEvent::EndorsementStatusChanged {
                app_id: *app_id,
                from: change.from,
                to: change.to,
                score,
            });
            state.events.push(EndorsementEvent::GracePeriodStarted {
                app_id: *app_id,
                window,
            });
            self.demote_security(state, app_id);
        }
    }

    fn lapse(&self, state: &mut EngineState, app_id: &AppId, score: u64, window: GraceWindow) {
        let change = match state.apps.get_mut(app_id) {
            Some(app) => app.lapse(),
            None => return,
        };

        if let Some(change) = change {
            info!("Grace period of {} expired (score {})", app_id, score);
            state.events.push(EndorsementEvent::EndorsementStatusChanged {
                app_id: *app_id,
                from: change.from,
                to: change.to,
                score,
            });
            state.events.push(EndorsementEvent::GracePeriodExpired {
                app_id: *app_id,
                window,
            });
            self.demote_security(state, app_id);
        }
    }

    fn demote_security(&self, state: &mut EngineState, app_id: &AppId) {
        if let Some(level) = state
            .security
            .on_lost_endorsement(app_id, self.notifier.as_ref())
        {
            state.events.push(EndorsementEvent::SecurityLevelChanged {
                app_id: *app_id,
                change: level,
            });
        }
    }

    // ------------------------------------------------------------------
    // Reconciliation
    // ------------------------------------------------------------------

    /// Reconcile the app's status against the live score and the clock.
    /// Returns whether the app is eligible right now. Idempotent.
    pub fn check_endorsement(&self, app_id: &AppId) -> EndorsementResult<bool> {
        let now = self.now();
        let mut guard = self.state.write();
        self.reconcile(&mut guard, app_id, now)
    }

    /// Reconcile every registered app
    pub fn reconcile_all(&self) -> BTreeMap<AppId, bool> {
        let now = self.now();
        let mut guard = self.state.write();
        self.reconcile_all_locked(&mut guard, now)
    }

    fn reconcile_all_locked(&self, state: &mut EngineState, now: Now) -> BTreeMap<AppId, bool> {
        let ids: Vec<AppId> = state.registry.ids().copied().collect();
        let mut outcomes = BTreeMap::new();

        for app_id in ids {
            match self.reconcile(state, &app_id, now) {
                Ok(eligible) => {
                    outcomes.insert(app_id, eligible);
                }
                Err(e) => warn!("Reconciliation of {} skipped: {}", app_id, e),
            }
        }

        debug!("Reconciled {} apps at round {}", outcomes.len(), now.round);
        outcomes
    }

    fn reconcile(&self, state: &mut EngineState, app_id: &AppId, now: Now) -> EndorsementResult<bool> {
        state.registry.ensure_exists(app_id)?;

        if state.app_state(app_id)?.blacklisted {
            self.fold_grace(state, app_id);
            return Ok(false);
        }

        let stale = state
            .ledger
            .stale_endorsers(app_id, self.nodes.as_ref(), &state.config.score_table);
        for node_id in stale {
            state.ledger.unbind(app_id, node_id)?;
            warn!("Pruned endorsement of {} by node {}: node can no longer endorse", app_id, node_id);
            state.events.push(EndorsementEvent::EndorsementPruned {
                app_id: *app_id,
                node_id,
            });
        }

        let score = self.score_of(state, app_id);
        if state.config.score_table.meets_threshold(score) {
            self.promote(state, app_id, score);
        } else {
            let status = state.app_state(app_id)?.status;
            match status {
                EndorsementStatus::Endorsed => self.open_grace(state, app_id, score, now),
                EndorsementStatus::GracePeriod(window)
                    if window.is_expired(now.round, now.height, self.clock.as_ref()) =>
                {
                    self.lapse(state, app_id, score, window)
                }
                _ => {}
            }
        }

        Ok(state.app_state(app_id)?.is_eligible_now())
    }

    /// Drop a stored grace window back to Endorsed, remembering past eligibility
    fn fold_grace(&self, state: &mut EngineState, app_id: &AppId) {
        let change = match state.apps.get_mut(app_id) {
            Some(app) => app.fold_grace(),
            None => return,
        };

        if let Some(change) = change {
            let score = self.score_of(state, app_id);
            debug!("Folded stale grace window of {}", app_id);
            state.events.push(EndorsementEvent::EndorsementStatusChanged {
                app_id: *app_id,
                from: change.from,
                to: change.to,
                score,
            });
        }
    }

    // ------------------------------------------------------------------
    // Blacklist
    // ------------------------------------------------------------------

    pub fn set_voting_eligibility(&self, app_id: &AppId, eligible: bool, caller: &Address) -> EndorsementResult<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.acl.ensure(Role::Governance, caller)?;
        let app = state
            .apps
            .get_mut(app_id)
            .ok_or(EndorsementError::NonexistentApp(*app_id))?;

        if app.blacklisted != eligible {
            debug!("Voting eligibility of {} already {}", app_id, eligible);
            return Ok(());
        }
        app.blacklisted = !eligible;

        state.events.push(EndorsementEvent::VotingEligibilityUpdated {
            app_id: *app_id,
            eligible,
        });
        if eligible {
            self.fold_grace(state, app_id);
            info!("App {} removed from blacklist by {}", app_id, caller);
        } else {
            warn!("App {} blacklisted by {}", app_id, caller);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Governance configuration
    // ------------------------------------------------------------------

    /// Replace the whole score table. Takes effect on the next score read.
    pub fn update_score_table(&self, points: BTreeMap<NodeLevel, u64>, caller: &Address) -> EndorsementResult<()> {
        let mut guard = self.state.write();
        guard.acl.ensure(Role::Governance, caller)?;

        guard.config.score_table.replace_points(points.clone());
        info!("Score table replaced by {}: {:?}", caller, points);
        guard.events.push(EndorsementEvent::ScoreTableUpdated { points });
        Ok(())
    }

    pub fn update_threshold(&self, threshold: u64, caller: &Address) -> EndorsementResult<()> {
        let mut guard = self.state.write();
        guard.acl.ensure(Role::Governance, caller)?;

        let old = guard.config.score_table.threshold;
        guard.config.score_table.set_threshold(threshold);
        info!("Score threshold {} -> {}", old, threshold);
        guard.events.push(EndorsementEvent::ThresholdUpdated { old, new: threshold });
        Ok(())
    }

    /// Applies to windows opened from now on
    pub fn update_grace_period(&self, length: Height, caller: &Address) -> EndorsementResult<()> {
        let mut guard = self.state.write();
        guard.acl.ensure(Role::Governance, caller)?;

        let old = guard.config.grace_period;
        guard.config.grace_period = length;
        info!("Grace period {} -> {}", old, length);
        guard.events.push(EndorsementEvent::GracePeriodUpdated { old, new: length });
        Ok(())
    }

    /// Retroactive: every node's cooldown is recomputed against the new period
    pub fn update_cooldown_period(&self, rounds: u64, caller: &Address) -> EndorsementResult<()> {
        let mut guard = self.state.write();
        guard.acl.ensure(Role::Governance, caller)?;

        let old = guard.config.cooldown_period;
        guard.config.cooldown_period = rounds;
        info!("Cooldown period {} -> {}", old, rounds);
        guard.events.push(EndorsementEvent::CooldownPeriodUpdated { old, new: rounds });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Housekeeping
    // ------------------------------------------------------------------

    /// Delete a submission that never took part in an allocation round.
    /// Returns the nodes freed by the removal.
    pub fn remove_xapp_submission(&self, app_id: &AppId, caller: &Address) -> EndorsementResult<Vec<NodeId>> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.ensure_app_admin(app_id, caller)?;
        if state.app_state(app_id)?.ever_counted_in_round {
            return Err(EndorsementError::AlreadyIncluded(*app_id));
        }

        state.registry.remove(app_id);
        state.apps.remove(app_id);
        state.security.forget(app_id);
        let freed_nodes = state.ledger.remove_app(app_id);

        warn!("Submission {} removed by {}; freed nodes {:?}", app_id, caller, freed_nodes);
        state.events.push(EndorsementEvent::SubmissionRemoved {
            app_id: *app_id,
            freed_nodes: freed_nodes.clone(),
        });
        Ok(freed_nodes)
    }

    /// Returns the previous admin
    pub fn update_app_admin(&self, app_id: &AppId, new_admin: Address, caller: &Address) -> EndorsementResult<Address> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.ensure_app_admin(app_id, caller)?;
        let old = state.registry.set_admin(app_id, new_admin)?;

        info!("Admin of {} changed {} -> {}", app_id, old, new_admin);
        state.events.push(EndorsementEvent::AppAdminUpdated {
            app_id: *app_id,
            old,
            new: new_admin,
        });
        Ok(old)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Returns false if the account already held the role
    pub fn grant_role(&self, role: Role, account: Address, caller: &Address) -> EndorsementResult<bool> {
        let mut guard = self.state.write();
        guard.acl.ensure(Role::Admin, caller)?;

        let granted = guard.acl.grant(role, account);
        if granted {
            info!("Role {:?} granted to {}", role, account);
            guard.events.push(EndorsementEvent::RoleGranted { role, account });
        }
        Ok(granted)
    }

    /// Returns false if the account did not hold the role
    pub fn revoke_role(&self, role: Role, account: &Address, caller: &Address) -> EndorsementResult<bool> {
        let mut guard = self.state.write();
        guard.acl.ensure(Role::Admin, caller)?;

        let revoked = guard.acl.revoke(role, account);
        if revoked {
            info!("Role {:?} revoked from {}", role, account);
            guard.events.push(EndorsementEvent::RoleRevoked { role, account: *account });
        }
        Ok(revoked)
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.state.read().acl.has_role(role, account)
    }

    // ------------------------------------------------------------------
    // Round gate
    // ------------------------------------------------------------------

    /// Snapshot the apps eligible for `round_id`, which must be the clock's
    /// current round. The first call for a round governs it; later calls
    /// return the stored set unchanged.
    pub fn start_round(&self, round_id: RoundId) -> EndorsementResult<Vec<AppId>> {
        let now = self.now();
        if round_id == 0 || round_id != now.round {
            warn!("Refusing snapshot of round {} during round {}", round_id, now.round);
            return Err(EndorsementError::RoundMismatch { requested: round_id, current: now.round });
        }

        let mut guard = self.state.write();
        let state = &mut *guard;

        if let Some(apps) = state.rounds.apps(round_id) {
            debug!("Round {} already snapshotted", round_id);
            return Ok(apps.iter().copied().collect());
        }

        if state.config.reconcile_on_round_start {
            self.reconcile_all_locked(state, now);
        }

        let eligible: BTreeSet<AppId> = state
            .apps
            .iter()
            .filter(|(_, app)| app.is_eligible_now())
            .map(|(id, _)| *id)
            .collect();
        for app_id in &eligible {
            if let Some(app) = state.apps.get_mut(app_id) {
                app.ever_counted_in_round = true;
            }
        }

        info!("Round {} snapshot: {} eligible apps", round_id, eligible.len());
        state.events.push(EndorsementEvent::RoundSnapshotTaken {
            round_id,
            eligible_apps: eligible.len(),
        });
        let listed = eligible.iter().copied().collect();
        state.rounds.record(round_id, eligible);
        Ok(listed)
    }

    pub fn is_eligible_for_vote(&self, app_id: &AppId, round_id: RoundId) -> bool {
        self.state.read().rounds.is_eligible_for_vote(app_id, round_id)
    }

    /// Latest round snapshot
    pub fn current_round_apps(&self) -> Option<(RoundId, Vec<AppId>)> {
        self.state
            .read()
            .rounds
            .latest()
            .map(|(round, apps)| (round, apps.iter().copied().collect()))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get_score(&self, app_id: &AppId) -> EndorsementResult<u64> {
        let state = self.state.read();
        state.registry.ensure_exists(app_id)?;
        Ok(self.score_of(&state, app_id))
    }

    /// Current managers of the endorsing nodes, resolved live
    pub fn get_endorsers(&self, app_id: &AppId) -> EndorsementResult<Vec<Address>> {
        let state = self.state.read();
        state.registry.ensure_exists(app_id)?;
        Ok(state.ledger.endorser_managers(app_id, self.nodes.as_ref()))
    }

    pub fn get_endorsing_nodes(&self, app_id: &AppId) -> EndorsementResult<Vec<NodeId>> {
        let state = self.state.read();
        state.registry.ensure_exists(app_id)?;
        Ok(state.ledger.endorsing_nodes(app_id))
    }

    pub fn node_to_endorsed_app(&self, node_id: NodeId) -> Option<AppId> {
        self.state.read().ledger.endorsed_app(node_id)
    }

    /// Points the node would contribute right now
    pub fn get_node_score(&self, node_id: NodeId) -> u64 {
        let level = self.nodes.level(node_id);
        self.state.read().config.score_table.points_for(level)
    }

    pub fn is_app_unendorsed(&self, app_id: &AppId) -> bool {
        self.state
            .read()
            .apps
            .get(app_id)
            .map_or(false, AppEligibilityState::pending_endorsement)
    }

    pub fn is_eligible_now(&self, app_id: &AppId) -> bool {
        self.state
            .read()
            .apps
            .get(app_id)
            .map_or(false, AppEligibilityState::is_eligible_now)
    }

    pub fn is_blacklisted(&self, app_id: &AppId) -> bool {
        self.state.read().apps.get(app_id).map_or(false, |a| a.blacklisted)
    }

    pub fn check_cooldown(&self, node_id: NodeId) -> bool {
        let round = self.clock.current_round_id();
        let state = self.state.read();
        state
            .cooldowns
            .is_cooling_down(node_id, round, state.config.cooldown_period)
    }

    pub fn cooldown_remaining(&self, node_id: NodeId) -> u64 {
        let round = self.clock.current_round_id();
        let state = self.state.read();
        state
            .cooldowns
            .remaining_rounds(node_id, round, state.config.cooldown_period)
    }

    /// Apps awaiting endorsement, in app id order
    pub fn unendorsed_app_ids(&self) -> Vec<AppId> {
        self.state
            .read()
            .apps
            .iter()
            .filter(|(_, app)| app.pending_endorsement())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Page of `unendorsed_app_ids`; `start == total` yields an empty page
    pub fn unendorsed_app_ids_paginated(&self, start: usize, count: usize) -> EndorsementResult<Vec<AppId>> {
        let all = self.unendorsed_app_ids();
        let total = all.len();
        if count == 0 || start > total {
            return Err(EndorsementError::InvalidRange { start, count, total });
        }

        Ok(all.into_iter().skip(start).take(count).collect())
    }

    pub fn eligible_app_ids(&self) -> Vec<AppId> {
        self.state
            .read()
            .apps
            .iter()
            .filter(|(_, app)| app.is_eligible_now())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn app(&self, app_id: &AppId) -> Option<XApp> {
        self.state.read().registry.get(app_id).cloned()
    }

    pub fn app_state(&self, app_id: &AppId) -> Option<AppEligibilityState> {
        self.state.read().apps.get(app_id).cloned()
    }

    pub fn remembered_security_level(&self, app_id: &AppId) -> Option<SecurityLevel> {
        self.state.read().security.remembered_level(app_id)
    }

    pub fn app_summary(&self, app_id: &AppId) -> Option<AppSummary> {
        let state = self.state.read();
        self.summarize(&state, app_id)
    }

    pub fn app_summaries(&self) -> Vec<AppSummary> {
        let state = self.state.read();
        state
            .registry
            .ids()
            .filter_map(|id| self.summarize(&state, id))
            .collect()
    }

    fn summarize(&self, state: &EngineState, app_id: &AppId) -> Option<AppSummary> {
        let app = state.registry.get(app_id)?;
        let eligibility = state.apps.get(app_id)?;

        Some(AppSummary {
            app: app.clone(),
            score: self.score_of(state, app_id),
            status: eligibility.status.kind(),
            grace_window: eligibility.grace_window(),
            blacklisted: eligibility.blacklisted,
            eligible_now: eligibility.is_eligible_now(),
            endorsing_nodes: state.ledger.endorsing_nodes(app_id),
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.state.read().config.clone()
    }

    /// Take every journalled event, oldest first
    pub fn drain_events(&self) -> Vec<EndorsementEvent> {
        std::mem::take(&mut self.state.write().events)
    }
}

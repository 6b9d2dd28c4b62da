// XApp Endorsement Engine
// Eligibility State Tracker - per-app endorsement status and grace windows
//
// SAFETY INVARIANTS:
// 1. A grace window is only ever opened from the Endorsed status
// 2. A blacklisted app is never reported as pending or eligible
// 3. Grace expiry needs both the height length and GRACE_PERIOD_FULL_ROUNDS
//    full rounds to have elapsed
// 4. The blacklist flag never rewrites the stored status by itself
// 5. Score is never stored here; callers pass the freshly computed value

use crate::collaborators::RoundClock;
use crate::types::{Height, RoundId};
use serde::{Serialize, Deserialize};

/// Full allocation rounds a grace window must span before it can expire
pub const GRACE_PERIOD_FULL_ROUNDS: u64 = 2;

/// Period during which an app that lost its endorsement stays eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraceWindow {
    /// Round during which the window opened
    pub start_round: RoundId,

    /// Height at which the window opened
    pub start_height: Height,

    /// Length in heights, fixed when the window opens
    pub length: Height,
}

impl GraceWindow {
    pub fn open(start_round: RoundId, start_height: Height, length: Height) -> Self {
        GraceWindow { start_round, start_height, length }
    }

    pub fn end_height(&self) -> Height {
        self.start_height.saturating_add(self.length)
    }

    /// Rounds that started inside the window and have already ended. Round 0
    /// is the span before the first round and never counts.
    pub fn full_rounds_elapsed(&self, current_round: RoundId, clock: &dyn RoundClock) -> u64 {
        (self.start_round.max(1)..current_round)
            .filter(|round| clock.round_start_height(*round) >= self.start_height)
            .count() as u64
    }

    pub fn is_expired(&self, current_round: RoundId, current_height: Height, clock: &dyn RoundClock) -> bool {
        current_height >= self.end_height()
            && self.full_rounds_elapsed(current_round, clock) >= GRACE_PERIOD_FULL_ROUNDS
    }
}

/// Discriminant of `EndorsementStatus`, used in events and listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Pending,
    Endorsed,
    GracePeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndorsementStatus {
    /// Below threshold and not eligible: never endorsed, or grace lapsed
    Pending,

    /// Reached the threshold when last reconciled
    Endorsed,

    /// Lost the threshold, still eligible until the window expires
    GracePeriod(GraceWindow),
}

impl EndorsementStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            EndorsementStatus::Pending => StatusKind::Pending,
            EndorsementStatus::Endorsed => StatusKind::Endorsed,
            EndorsementStatus::GracePeriod(_) => StatusKind::GracePeriod,
        }
    }
}

/// Status transition reported back to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: StatusKind,
    pub to: StatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEligibilityState {
    pub status: EndorsementStatus,

    /// Administrative override; suppresses pending/eligible reporting
    pub blacklisted: bool,

    pub ever_reached_threshold: bool,

    /// Set once the app appears in a round snapshot; never cleared
    pub ever_counted_in_round: bool,
}

impl Default for AppEligibilityState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEligibilityState {
    /// State of a freshly registered app
    pub fn new() -> Self {
        AppEligibilityState {
            status: EndorsementStatus::Pending,
            blacklisted: false,
            ever_reached_threshold: false,
            ever_counted_in_round: false,
        }
    }

    pub fn pending_endorsement(&self) -> bool {
        !self.blacklisted && self.status != EndorsementStatus::Endorsed
    }

    pub fn grace_window(&self) -> Option<GraceWindow> {
        match self.status {
            EndorsementStatus::GracePeriod(window) => Some(window),
            _ => None,
        }
    }

    pub fn is_eligible_now(&self) -> bool {
        !self.blacklisted && self.status != EndorsementStatus::Pending
    }

    /// Move to Endorsed. Returns the change, or `None` if already endorsed.
    pub fn mark_endorsed(&mut self) -> Option<StatusChange> {
        self.ever_reached_threshold = true;
        self.transition(EndorsementStatus::Endorsed)
    }

    /// Open a grace window. Only valid from Endorsed; otherwise a no-op.
    pub fn start_grace(&mut self, window: GraceWindow) -> Option<StatusChange> {
        if self.status != EndorsementStatus::Endorsed {
            return None;
        }
        self.transition(EndorsementStatus::GracePeriod(window))
    }

    /// Drop an expired grace window back to Pending
    pub fn lapse(&mut self) -> Option<StatusChange> {
        match self.status {
            EndorsementStatus::GracePeriod(_) => self.transition(EndorsementStatus::Pending),
            _ => None,
        }
    }

    /// Forget a stored grace window while remembering the app was eligible.
    /// Used around the blacklist so a later window starts from a fresh instant.
    pub fn fold_grace(&mut self) -> Option<StatusChange> {
        match self.status {
            EndorsementStatus::GracePeriod(_) => self.transition(EndorsementStatus::Endorsed),
            _ => None,
        }
    }

    fn transition(&mut self, next: EndorsementStatus) -> Option<StatusChange> {
        let from = self.status.kind();
        let to = next.kind();
        self.status = next;

        if from == to {
            None
        } else {
            Some(StatusChange { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ManualRoundClock;

    #[test]
    fn test_new_app_is_pending_and_ineligible() {
        let state = AppEligibilityState::new();
        assert!(state.pending_endorsement());
        assert!(!state.is_eligible_now());
        assert_eq!(state.grace_window(), None);
    }

    #[test]
    fn test_endorse_then_grace_then_lapse() {
        let mut state = AppEligibilityState::new();

        let change = state.mark_endorsed().unwrap();
        assert_eq!((change.from, change.to), (StatusKind::Pending, StatusKind::Endorsed));
        assert!(state.ever_reached_threshold);
        assert!(state.is_eligible_now());

        let window = GraceWindow::open(3, 300, 50);
        assert!(state.start_grace(window).is_some());
        assert!(state.pending_endorsement());
        assert!(state.is_eligible_now());
        assert_eq!(state.grace_window(), Some(window));

        assert!(state.lapse().is_some());
        assert!(state.pending_endorsement());
        assert!(!state.is_eligible_now());
        assert!(state.ever_reached_threshold);
    }

    #[test]
    fn test_grace_requires_prior_endorsement() {
        let mut state = AppEligibilityState::new();
        assert_eq!(state.start_grace(GraceWindow::open(1, 10, 10)), None);
        assert_eq!(state.status, EndorsementStatus::Pending);
    }

    #[test]
    fn test_mark_endorsed_twice_reports_no_change() {
        let mut state = AppEligibilityState::new();
        assert!(state.mark_endorsed().is_some());
        assert!(state.mark_endorsed().is_none());
    }

    #[test]
    fn test_blacklist_suppresses_reporting() {
        let mut state = AppEligibilityState::new();
        state.mark_endorsed();
        state.start_grace(GraceWindow::open(1, 10, 10));
        state.blacklisted = true;

        assert!(!state.pending_endorsement());
        assert!(!state.is_eligible_now());
        // Stored window survives the flag
        assert!(state.grace_window().is_some());

        assert!(state.fold_grace().is_some());
        assert_eq!(state.status, EndorsementStatus::Endorsed);
    }

    #[test]
    fn test_grace_window_expiry_needs_heights_and_rounds() {
        let clock = ManualRoundClock::at_height(0);
        clock.start_round(); // round 1 at 0
        clock.advance(5);
        let window = GraceWindow::open(clock.current_round_id(), clock.current_height(), 20);

        // Round 2 at 10, round 3 at 20
        clock.start_round_after(5);
        clock.start_round_after(10);
        // Height 25 >= 25 but only round 2 is a full round
        clock.advance(5);
        assert_eq!(window.full_rounds_elapsed(clock.current_round_id(), &clock), 1);
        assert!(!window.is_expired(clock.current_round_id(), clock.current_height(), &clock));

        // Round 4 at 30: rounds 2 and 3 complete
        clock.start_round_after(5);
        assert_eq!(window.full_rounds_elapsed(clock.current_round_id(), &clock), 2);
        assert!(window.is_expired(clock.current_round_id(), clock.current_height(), &clock));
    }

    #[test]
    fn test_grace_window_height_bound_still_applies() {
        let clock = ManualRoundClock::at_height(0);
        clock.start_round();
        let window = GraceWindow::open(1, 0, 1_000);

        clock.start_round_after(10);
        clock.start_round_after(10);
        clock.start_round_after(10);
        assert!(window.full_rounds_elapsed(clock.current_round_id(), &clock) >= 2);
        assert!(!window.is_expired(clock.current_round_id(), clock.current_height(), &clock));
    }

    #[test]
    fn test_window_opened_at_round_start_counts_that_round() {
        let clock = ManualRoundClock::at_height(40);
        let round = clock.start_round();
        let window = GraceWindow::open(round, 40, 10);

        clock.start_round_after(10);
        assert_eq!(window.full_rounds_elapsed(clock.current_round_id(), &clock), 1);
    }

    #[test]
    fn test_window_opened_before_first_round_skips_round_zero() {
        let clock = ManualRoundClock::at_height(0);
        let window = GraceWindow::open(clock.current_round_id(), 0, 10);
        assert_eq!(window.start_round, 0);

        // Round 1 at 10, round 2 at 20: only round 1 has ended
        clock.start_round_after(10);
        clock.start_round_after(10);
        assert_eq!(window.full_rounds_elapsed(clock.current_round_id(), &clock), 1);
        assert!(!window.is_expired(clock.current_round_id(), clock.current_height(), &clock));

        clock.start_round_after(10);
        assert_eq!(window.full_rounds_elapsed(clock.current_round_id(), &clock), 2);
        assert!(window.is_expired(clock.current_round_id(), clock.current_height(), &clock));
    }
}

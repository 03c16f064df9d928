//! Editing session: the selected date, the two-step overwrite flow and the
//! admin check guarding deletes.

use std::{fmt, sync::Arc};

use crate::{
    capacity::CapacityConfig,
    model::{BedSnapshot, DateKey, HistoricalData},
    store::{OccupancyStore, StoreMutationOutcome},
    traits::Clock,
};

// ==================== Overwrite Flow ====================

/// Confirm-before-replace protocol for saving over an existing date.
///
/// While pending, the store still holds the old snapshot. Cancelling leaves
/// nothing behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwriteFlow {
    #[default]
    Idle,
    PendingConfirmation {
        date: DateKey,
        candidate: BedSnapshot,
    },
}

impl OverwriteFlow {
    /// Try to save. Moves to `PendingConfirmation` when the store asks for it,
    /// otherwise back to `Idle`.
    pub fn request(
        &mut self,
        store: &mut OccupancyStore,
        date: DateKey,
        snapshot: BedSnapshot,
    ) -> StoreMutationOutcome {
        let outcome = store.save(date, snapshot);
        *self = match outcome {
            StoreMutationOutcome::OverwriteRequired { .. } => OverwriteFlow::PendingConfirmation {
                date,
                candidate: snapshot,
            },
            StoreMutationOutcome::Saved => OverwriteFlow::Idle,
        };
        outcome
    }

    /// Apply the pending overwrite. Returns the date written, or `None` when
    /// nothing was pending.
    pub fn confirm(&mut self, store: &mut OccupancyStore) -> Option<DateKey> {
        match std::mem::take(self) {
            OverwriteFlow::PendingConfirmation { date, candidate } => {
                store.confirm_overwrite(date, candidate);
                Some(date)
            }
            OverwriteFlow::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        if let OverwriteFlow::PendingConfirmation { date, .. } = self {
            tracing::debug!("Overwrite of {} cancelled", date);
        }
        *self = OverwriteFlow::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OverwriteFlow::PendingConfirmation { .. })
    }
}

// ==================== Admin Gate ====================

/// Shared-secret check in front of destructive operations.
#[derive(Clone, Default)]
pub struct AdminGate {
    secret: String,
}

impl fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGate")
            .field("configured", &!self.secret.is_empty())
            .finish()
    }
}

impl AdminGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Plain equality. An unconfigured (empty) secret never matches.
    pub fn verify(&self, attempt: &str) -> bool {
        !self.secret.is_empty() && self.secret == attempt
    }
}

// ==================== Session ====================

/// One user's working state over a store.
pub struct Session {
    store: OccupancyStore,
    capacity: CapacityConfig,
    clock: Arc<dyn Clock>,
    selected: DateKey,
    flow: OverwriteFlow,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("selected", &self.selected)
            .field("flow", &self.flow)
            .finish()
    }
}

impl Session {
    /// Start on the most recent stored date, or today for an empty store.
    pub fn new(store: OccupancyStore, capacity: CapacityConfig, clock: Arc<dyn Clock>) -> Self {
        let selected = default_selection(&store, clock.as_ref());
        Self {
            store,
            capacity,
            clock,
            selected,
            flow: OverwriteFlow::Idle,
        }
    }

    pub fn store(&self) -> &OccupancyStore {
        &self.store
    }

    pub fn capacity(&self) -> &CapacityConfig {
        &self.capacity
    }

    pub fn selected_date(&self) -> DateKey {
        self.selected
    }

    /// Switching dates abandons any pending overwrite.
    pub fn select(&mut self, date: DateKey) {
        self.flow.cancel();
        self.selected = date;
    }

    /// Snapshot shown for the selected date (all zero if nothing is stored).
    pub fn current_snapshot(&self) -> BedSnapshot {
        self.store.get(&self.selected)
    }

    pub fn overwrite_flow(&self) -> &OverwriteFlow {
        &self.flow
    }

    /// Save form input for the selected date, clamped to each category's input range.
    pub fn submit(&mut self, input: &BedSnapshot) -> StoreMutationOutcome {
        let snapshot = self.capacity.clamp_input(input);
        self.flow.request(&mut self.store, self.selected, snapshot)
    }

    pub fn confirm_overwrite(&mut self) -> Option<DateKey> {
        self.flow.confirm(&mut self.store)
    }

    pub fn cancel_overwrite(&mut self) {
        self.flow.cancel();
    }

    /// Delete `date` once `attempt` passes `gate`. Deleting the selected date
    /// moves the selection to the most recent remaining date, or today.
    ///
    /// Returns `None` when the secret is rejected, otherwise whether an entry
    /// was removed.
    pub fn delete(&mut self, gate: &AdminGate, attempt: &str, date: &DateKey) -> Option<bool> {
        if !gate.verify(attempt) {
            tracing::warn!("Rejected delete of {}: wrong admin secret", date);
            return None;
        }

        let removed = self.store.delete(date);
        if *date == self.selected {
            self.flow.cancel();
            self.selected = default_selection(&self.store, self.clock.as_ref());
        }
        Some(removed)
    }

    /// Replace everything with imported data and select its most recent date.
    pub fn import(&mut self, data: HistoricalData) {
        self.flow.cancel();
        self.store.replace_all(data);
        self.selected = default_selection(&self.store, self.clock.as_ref());
    }
}

fn default_selection(store: &OccupancyStore, clock: &dyn Clock) -> DateKey {
    store
        .most_recent_date()
        .unwrap_or_else(|| DateKey::new(clock.today()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{model::BedCategory, traits::MockClock};

    fn day(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        ))
    }

    fn icu(n: u32) -> BedSnapshot {
        BedSnapshot::new().with(BedCategory::Icu, n)
    }

    fn store_with(entries: &[(&str, u32)]) -> OccupancyStore {
        OccupancyStore::from_data(entries.iter().map(|(d, n)| (day(d), icu(*n))).collect())
    }

    // ==================== OverwriteFlow Tests ====================

    #[test]
    fn test_flow_request_new_date_stays_idle() {
        let mut store = OccupancyStore::new();
        let mut flow = OverwriteFlow::Idle;

        let outcome = flow.request(&mut store, day("2024-03-01"), icu(5));
        assert_eq!(outcome, StoreMutationOutcome::Saved);
        assert_eq!(flow, OverwriteFlow::Idle);
    }

    #[test]
    fn test_flow_pending_then_confirm() {
        let mut store = store_with(&[("2024-03-01", 5)]);
        let mut flow = OverwriteFlow::Idle;

        flow.request(&mut store, day("2024-03-01"), icu(7));
        assert_eq!(
            flow,
            OverwriteFlow::PendingConfirmation {
                date: day("2024-03-01"),
                candidate: icu(7)
            }
        );
        assert_eq!(store.get(&day("2024-03-01")), icu(5));

        assert_eq!(flow.confirm(&mut store), Some(day("2024-03-01")));
        assert_eq!(store.get(&day("2024-03-01")), icu(7));
        assert!(!flow.is_pending());
    }

    #[test]
    fn test_flow_cancel_leaves_store_untouched() {
        let mut store = store_with(&[("2024-03-01", 5)]);
        let mut flow = OverwriteFlow::Idle;

        flow.request(&mut store, day("2024-03-01"), icu(7));
        flow.cancel();

        assert_eq!(flow, OverwriteFlow::Idle);
        assert_eq!(store.get(&day("2024-03-01")), icu(5));
        assert_eq!(flow.confirm(&mut store), None);
        assert_eq!(store.get(&day("2024-03-01")), icu(5));
    }

    // ==================== AdminGate Tests ====================

    #[test]
    fn test_admin_gate_equality() {
        let gate = AdminGate::new("s3cret");
        assert!(gate.verify("s3cret"));
        assert!(!gate.verify("S3CRET"));
        assert!(!gate.verify(""));
    }

    #[test]
    fn test_admin_gate_unconfigured_never_matches() {
        assert!(!AdminGate::default().verify(""));
    }

    #[test]
    fn test_admin_gate_debug_hides_secret() {
        let debug = format!("{:?}", AdminGate::new("s3cret"));
        assert!(!debug.contains("s3cret"));
    }

    // ==================== Session Tests ====================

    #[test]
    fn test_session_selects_most_recent_date() {
        let session = Session::new(
            store_with(&[("2024-03-01", 5), ("2024-04-01", 6)]),
            CapacityConfig::default(),
            clock(),
        );
        assert_eq!(session.selected_date(), day("2024-04-01"));
        assert_eq!(session.current_snapshot(), icu(6));
    }

    #[test]
    fn test_session_empty_store_selects_today() {
        let session = Session::new(OccupancyStore::new(), CapacityConfig::default(), clock());
        assert_eq!(session.selected_date(), day("2024-05-10"));
        assert!(session.current_snapshot().is_empty());
    }

    #[test]
    fn test_session_submit_clamps_input() {
        let mut session = Session::new(OccupancyStore::new(), CapacityConfig::default(), clock());
        let input = BedSnapshot::new()
            .with(BedCategory::Icu, 999)
            .with(BedCategory::Clinical, 40);

        assert_eq!(session.submit(&input), StoreMutationOutcome::Saved);
        let saved = session.current_snapshot();
        assert_eq!(saved.get(BedCategory::Icu), 20);
        assert_eq!(saved.get(BedCategory::Clinical), 40);
    }

    #[test]
    fn test_session_submit_over_existing_goes_pending() {
        let mut session = Session::new(
            store_with(&[("2024-03-01", 5)]),
            CapacityConfig::default(),
            clock(),
        );

        let outcome = session.submit(&icu(6));
        assert_eq!(outcome, StoreMutationOutcome::OverwriteRequired { existing: icu(5) });
        assert!(session.overwrite_flow().is_pending());

        assert_eq!(session.confirm_overwrite(), Some(day("2024-03-01")));
        assert_eq!(session.current_snapshot(), icu(6));
    }

    #[test]
    fn test_session_select_cancels_pending_overwrite() {
        let mut session = Session::new(
            store_with(&[("2024-03-01", 5)]),
            CapacityConfig::default(),
            clock(),
        );
        session.submit(&icu(6));
        session.select(day("2024-03-02"));

        assert!(!session.overwrite_flow().is_pending());
        assert_eq!(session.store().get(&day("2024-03-01")), icu(5));
    }

    #[test]
    fn test_session_delete_requires_secret() {
        let gate = AdminGate::new("s3cret");
        let mut session = Session::new(
            store_with(&[("2024-03-01", 5)]),
            CapacityConfig::default(),
            clock(),
        );

        assert_eq!(session.delete(&gate, "wrong", &day("2024-03-01")), None);
        assert!(session.store().contains(&day("2024-03-01")));
    }

    #[test]
    fn test_session_delete_selected_reselects_most_recent() {
        let gate = AdminGate::new("s3cret");
        let mut session = Session::new(
            store_with(&[("2024-03-01", 5), ("2024-04-01", 6)]),
            CapacityConfig::default(),
            clock(),
        );

        assert_eq!(session.delete(&gate, "s3cret", &day("2024-04-01")), Some(true));
        assert_eq!(session.selected_date(), day("2024-03-01"));

        assert_eq!(session.delete(&gate, "s3cret", &day("2024-03-01")), Some(true));
        assert_eq!(session.selected_date(), day("2024-05-10"));
    }

    #[test]
    fn test_session_delete_other_date_keeps_selection() {
        let gate = AdminGate::new("s3cret");
        let mut session = Session::new(
            store_with(&[("2024-03-01", 5), ("2024-04-01", 6)]),
            CapacityConfig::default(),
            clock(),
        );

        assert_eq!(session.delete(&gate, "s3cret", &day("2024-03-01")), Some(true));
        assert_eq!(session.selected_date(), day("2024-04-01"));
        assert_eq!(session.delete(&gate, "s3cret", &day("2024-03-01")), Some(false));
    }

    #[test]
    fn test_session_import_replaces_and_selects() {
        let mut session = Session::new(
            store_with(&[("2024-03-01", 5)]),
            CapacityConfig::default(),
            clock(),
        );
        session.import(HistoricalData::from([(day("2023-01-15"), icu(2))]));

        assert_eq!(session.store().len(), 1);
        assert_eq!(session.selected_date(), day("2023-01-15"));
    }
}

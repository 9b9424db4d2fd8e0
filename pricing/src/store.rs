//! Tier collections partitioned by transaction type.
//!
//! Partitions are independent ladders, so each sits behind its own lock and
//! edits to one never wait on another.

use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::TierDefaults;
use crate::editor::{validate_ladder, TierEditor, TierEvent, TierOutcome};
use crate::error::PricingResult;
use crate::resolution::select_tier;
use crate::tier::{CommissionTier, ALL_TRANSACTION_TYPES};

/// Key of a tier partition: a lower-cased transaction type, or `all`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(transaction_type: impl AsRef<str>) -> Self {
        let key = transaction_type.as_ref().trim().to_ascii_lowercase();
        if key.is_empty() {
            Self::all()
        } else {
            Self(key)
        }
    }

    /// The partition of unrestricted tiers.
    pub fn all() -> Self {
        Self(ALL_TRANSACTION_TYPES.to_string())
    }

    /// Partition a tier belongs to.
    pub fn for_tier(tier: &CommissionTier) -> Self {
        match &tier.transaction_type {
            Some(t) if !tier.is_unrestricted() => Self::new(t),
            _ => Self::all(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.0 == ALL_TRANSACTION_TYPES
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn scope(&self) -> Option<String> {
        if self.is_all() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PartitionKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for PartitionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PartitionKey> for String {
    fn from(key: PartitionKey) -> Self {
        key.0
    }
}

type SharedEditor = Arc<Mutex<TierEditor>>;

/// Thread-safe tier store with one editor per partition.
pub struct TierStore {
    partitions: DashMap<PartitionKey, SharedEditor>,
    defaults: TierDefaults,
}

impl TierStore {
    pub fn new(defaults: TierDefaults) -> Self {
        Self {
            partitions: DashMap::new(),
            defaults,
        }
    }

    /// Replace the contents of every partition touched by `tiers`.
    ///
    /// Every partition is validated before any is replaced, so a rejected
    /// seed leaves the store as it was.
    pub fn seed(&self, tiers: Vec<CommissionTier>) -> PricingResult<()> {
        let mut grouped: BTreeMap<PartitionKey, Vec<CommissionTier>> = BTreeMap::new();
        for tier in tiers {
            grouped.entry(PartitionKey::for_tier(&tier)).or_default().push(tier);
        }

        for (key, tiers) in &grouped {
            if let Err(rejection) = validate_ladder(tiers) {
                warn!(partition = %key, reason = %rejection, "Tier seed rejected");
                return Err(rejection.into());
            }
        }

        for (key, tiers) in grouped {
            info!(partition = %key, tiers = tiers.len(), "Seeding tier partition");
            let editor = TierEditor::new(key.scope(), tiers, self.defaults.clone());
            self.partitions.insert(key, Arc::new(Mutex::new(editor)));
        }
        Ok(())
    }

    /// Editor for `key`, created empty on first use.
    fn partition(&self, key: &PartitionKey) -> SharedEditor {
        self.partitions
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(partition = %key, "Creating tier partition");
                Arc::new(Mutex::new(TierEditor::new(
                    key.scope(),
                    Vec::new(),
                    self.defaults.clone(),
                )))
            })
            .clone()
    }

    /// Run `f` with exclusive access to one partition.
    pub fn with_partition<R>(
        &self,
        key: &PartitionKey,
        f: impl FnOnce(&mut TierEditor) -> R,
    ) -> R {
        let editor = self.partition(key);
        let mut guard = editor.lock();
        f(&mut *guard)
    }

    /// Apply an editor event to one partition.
    pub fn apply(&self, key: &PartitionKey, event: TierEvent) -> PricingResult<TierOutcome> {
        self.with_partition(key, |editor| editor.apply(event))
    }

    /// Resolve the tier for `amount` across the type's partition and the
    /// unrestricted partition.
    pub fn select_tier(
        &self,
        amount: Decimal,
        transaction_type: &str,
    ) -> PricingResult<CommissionTier> {
        let requested = PartitionKey::new(transaction_type);

        let mut candidates = self.tiers_in(&PartitionKey::all());
        if !requested.is_all() {
            candidates.extend(self.tiers_in(&requested));
        }

        select_tier(&candidates, amount, transaction_type).cloned()
    }

    /// Snapshot of one partition's ladder.
    pub fn tiers_in(&self, key: &PartitionKey) -> Vec<CommissionTier> {
        let editor = match self.partitions.get(key) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };
        let guard = editor.lock();
        guard.tiers().to_vec()
    }

    /// Snapshot of every partition, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<PartitionKey, Vec<CommissionTier>> {
        self.partition_keys()
            .into_iter()
            .map(|key| {
                let tiers = self.tiers_in(&key);
                (key, tiers)
            })
            .collect()
    }

    pub fn partition_keys(&self) -> Vec<PartitionKey> {
        let mut keys: Vec<PartitionKey> =
            self.partitions.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.partitions
            .iter()
            .map(|e| e.value().lock().tiers().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TierStore {
    fn default() -> Self {
        Self::new(TierDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::tier::TierPatch;
    use exchangedesk_common::{Currency, TierId};
    use rust_decimal_macros::dec;
    use std::thread;

    fn seeded() -> TierStore {
        let store = TierStore::default();
        store.seed(vec![
            CommissionTier::new("all-1", "Any small", dec!(0), Some(dec!(100)), Currency::usd()),
            CommissionTier::new("tr-1", "Transfer", dec!(100), Some(dec!(1000)), Currency::usd())
                .for_transaction_type("Transfer"),
            CommissionTier::new("ex-1", "Exchange", dec!(100), None, Currency::usd())
                .for_transaction_type("exchange"),
        ])
        .unwrap();
        store
    }

    #[test]
    fn test_seed_groups_by_transaction_type() {
        let store = seeded();

        assert_eq!(
            store.partition_keys(),
            vec![
                PartitionKey::all(),
                PartitionKey::new("exchange"),
                PartitionKey::new("transfer"),
            ]
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_seed_rejects_broken_partition_atomically() {
        let store = seeded();

        let result = store.seed(vec![
            CommissionTier::new("p-1", "Payout", dec!(0), Some(dec!(100)), Currency::usd())
                .for_transaction_type("payout"),
            CommissionTier::new("a", "Open A", dec!(0), None, Currency::usd()),
            CommissionTier::new("b", "Open B", dec!(100), None, Currency::usd()),
        ]);

        assert_eq!(result.unwrap_err().error_code(), "OPEN_ENDED_NOT_LAST");
        assert_eq!(store.tiers_in(&PartitionKey::all())[0].id, TierId::new("all-1"));
        assert!(store.tiers_in(&PartitionKey::new("payout")).is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_seed_rejects_overlap() {
        let store = TierStore::default();

        let result = store.seed(vec![
            CommissionTier::new("x", "X", dec!(0), Some(dec!(200)), Currency::usd()),
            CommissionTier::new("y", "Y", dec!(150), Some(dec!(300)), Currency::usd()),
        ]);

        assert_eq!(result.unwrap_err().error_code(), "BOUNDARY_OVERLAP");
        assert!(store.is_empty());
    }

    #[test]
    fn test_select_combines_type_and_unrestricted_partitions() {
        let store = seeded();

        let small = store.select_tier(dec!(50), "transfer").unwrap();
        assert_eq!(small.id, TierId::new("all-1"));

        let large = store.select_tier(dec!(500), "transfer").unwrap();
        assert_eq!(large.id, TierId::new("tr-1"));

        let exchange = store.select_tier(dec!(500), "exchange").unwrap();
        assert_eq!(exchange.id, TierId::new("ex-1"));

        let missing = store.select_tier(dec!(500), "payout");
        assert!(matches!(missing, Err(PricingError::NoTierFound { .. })));
    }

    #[test]
    fn test_apply_edits_only_its_partition() {
        let store = seeded();
        let transfer = PartitionKey::new("transfer");

        store
            .apply(&transfer, TierEvent::BeginEdit(TierId::new("tr-1")))
            .unwrap();
        store
            .apply(
                &transfer,
                TierEvent::UpdateDraft(TierPatch::max_amount(Some(dec!(2000)))),
            )
            .unwrap();
        store.apply(&transfer, TierEvent::Save).unwrap();

        assert_eq!(store.tiers_in(&transfer)[0].max_amount, Some(dec!(2000)));
        assert_eq!(store.tiers_in(&PartitionKey::all())[0].max_amount, Some(dec!(100)));
    }

    #[test]
    fn test_add_tier_creates_missing_partition() {
        let store = seeded();
        let payout = PartitionKey::new("payout");

        let outcome = store.apply(&payout, TierEvent::AddTier).unwrap();

        match outcome {
            TierOutcome::Added(tier) => {
                assert_eq!(tier.min_amount, Decimal::ZERO);
                assert_eq!(tier.transaction_type.as_deref(), Some("payout"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(store.select_tier(dec!(200), "payout").is_ok());
    }

    #[test]
    fn test_partitions_edit_concurrently() {
        let store = Arc::new(TierStore::default());

        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|kind| {
                let store = store.clone();
                thread::spawn(move || {
                    let key = PartitionKey::new(kind);
                    for _ in 0..10 {
                        store.apply(&key, TierEvent::AddTier).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 40);
        let ladder = store.tiers_in(&PartitionKey::new("c"));
        assert_eq!(ladder.last().unwrap().max_amount, Some(dec!(5000)));
    }

    #[test]
    fn test_partition_key_normalization() {
        assert_eq!(PartitionKey::new(" Transfer "), PartitionKey::new("transfer"));
        assert!(PartitionKey::new("").is_all());
        assert!(PartitionKey::new("ALL").is_all());
    }
}

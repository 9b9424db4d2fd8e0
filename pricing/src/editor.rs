//! Tier-set editor.
//!
//! Holds one partition of tiers and at most one open editing session. A draft
//! is mutated in isolation and only reaches the collection through [`TierEditor::save`],
//! which validates the whole candidate ladder first and then commits the draft
//! together with the cascade of successor boundaries in a single swap.
//! A rejected save leaves the collection untouched and the session open.

use exchangedesk_common::TierId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::TierDefaults;
use crate::error::{PricingError, PricingResult, ValidationError};
use crate::resolution::precedence;
use crate::tier::{CommissionTier, CommissionType, TierPatch};

/// Editing state of a tier collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSession {
    #[default]
    Idle,
    Editing {
        tier_id: TierId,
        draft: CommissionTier,
    },
}

/// An edit applied to a tier collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierEvent {
    BeginEdit(TierId),
    UpdateDraft(TierPatch),
    CancelEdit,
    Save,
    AddTier,
    DeleteTier(TierId),
    ToggleActive(TierId),
}

/// Result of a successfully applied [`TierEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// Session opened; carries the draft copy.
    EditStarted(CommissionTier),
    DraftUpdated(CommissionTier),
    EditCancelled,
    /// Draft committed. `cascaded` lists successors whose bounds moved.
    Saved {
        tier: CommissionTier,
        cascaded: Vec<TierId>,
    },
    Added(CommissionTier),
    Deleted(CommissionTier),
    Toggled { tier_id: TierId, is_active: bool },
}

/// Editor over one tier partition.
#[derive(Debug, Clone)]
pub struct TierEditor {
    /// Transaction type of this partition; `None` for unrestricted tiers.
    scope: Option<String>,
    tiers: Vec<CommissionTier>,
    session: EditSession,
    defaults: TierDefaults,
}

impl TierEditor {
    /// Create an editor over `tiers`, kept sorted by `min_amount`.
    pub fn new(
        scope: Option<String>,
        mut tiers: Vec<CommissionTier>,
        defaults: TierDefaults,
    ) -> Self {
        tiers.sort_by(precedence);
        Self {
            scope,
            tiers,
            session: EditSession::Idle,
            defaults,
        }
    }

    /// Tiers in ladder order.
    pub fn tiers(&self) -> &[CommissionTier] {
        &self.tiers
    }

    pub fn get(&self, tier_id: &TierId) -> Option<&CommissionTier> {
        self.tiers.iter().find(|t| &t.id == tier_id)
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.session, EditSession::Editing { .. })
    }

    /// The open draft, if any.
    pub fn draft(&self) -> Option<&CommissionTier> {
        match &self.session {
            EditSession::Editing { draft, .. } => Some(draft),
            EditSession::Idle => None,
        }
    }

    /// Apply an event as a state transition.
    pub fn apply(&mut self, event: TierEvent) -> PricingResult<TierOutcome> {
        match event {
            TierEvent::BeginEdit(tier_id) => self.begin_edit(&tier_id),
            TierEvent::UpdateDraft(patch) => self.update_draft(&patch),
            TierEvent::CancelEdit => self.cancel_edit(),
            TierEvent::Save => self.save(),
            TierEvent::AddTier => self.add_tier().map(TierOutcome::Added),
            TierEvent::DeleteTier(tier_id) => self.delete_tier(&tier_id).map(TierOutcome::Deleted),
            TierEvent::ToggleActive(tier_id) => {
                let is_active = self.toggle_active(&tier_id)?;
                Ok(TierOutcome::Toggled { tier_id, is_active })
            }
        }
    }

    /// Open a session on `tier_id` with a copy of the tier as draft.
    pub fn begin_edit(&mut self, tier_id: &TierId) -> PricingResult<TierOutcome> {
        if let EditSession::Editing { tier_id: open, .. } = &self.session {
            return Err(PricingError::EditSessionOpen(open.to_string()));
        }

        let draft = self
            .get(tier_id)
            .cloned()
            .ok_or_else(|| PricingError::TierNotFound(tier_id.clone()))?;

        debug!(tier_id = %tier_id, "Tier edit started");

        self.session = EditSession::Editing {
            tier_id: tier_id.clone(),
            draft: draft.clone(),
        };
        Ok(TierOutcome::EditStarted(draft))
    }

    /// Apply `patch` to the open draft.
    pub fn update_draft(&mut self, patch: &TierPatch) -> PricingResult<TierOutcome> {
        self.update_draft_with(|draft| patch.apply_to(draft))
    }

    /// Mutate the open draft in place.
    pub fn update_draft_with<F>(&mut self, f: F) -> PricingResult<TierOutcome>
    where
        F: FnOnce(&mut CommissionTier),
    {
        match &mut self.session {
            EditSession::Editing { tier_id, draft } => {
                f(draft);
                // The draft always stands in for the tier the session was opened on.
                draft.id = tier_id.clone();
                Ok(TierOutcome::DraftUpdated(draft.clone()))
            }
            EditSession::Idle => Err(PricingError::NoEditSession),
        }
    }

    /// Discard the draft.
    pub fn cancel_edit(&mut self) -> PricingResult<TierOutcome> {
        match std::mem::take(&mut self.session) {
            EditSession::Editing { tier_id, .. } => {
                debug!(tier_id = %tier_id, "Tier edit cancelled");
                Ok(TierOutcome::EditCancelled)
            }
            EditSession::Idle => Err(PricingError::NoEditSession),
        }
    }

    /// Validate the draft and commit it, cascading successor bounds when the
    /// upper bound moved.
    #[instrument(skip(self), fields(scope = ?self.scope))]
    pub fn save(&mut self) -> PricingResult<TierOutcome> {
        let (tier_id, draft) = match &self.session {
            EditSession::Editing { tier_id, draft } => (tier_id.clone(), draft.clone()),
            EditSession::Idle => return Err(PricingError::NoEditSession),
        };

        let previous_max = self
            .get(&tier_id)
            .map(|t| t.max_amount)
            .ok_or_else(|| PricingError::TierNotFound(tier_id.clone()))?;

        if let Err(rejection) = validate_draft(&self.tiers, &draft) {
            warn!(tier_id = %tier_id, reason = %rejection, "Tier save rejected");
            return Err(rejection.into());
        }

        let mut ladder = substitute(&self.tiers, &draft);
        let cascaded = if draft.max_amount != previous_max {
            cascade(&mut ladder, &tier_id).map_err(|rejection| {
                warn!(tier_id = %tier_id, reason = %rejection, "Tier cascade rejected");
                PricingError::from(rejection)
            })?
        } else {
            Vec::new()
        };

        self.tiers = ladder;
        self.session = EditSession::Idle;

        info!(
            tier_id = %tier_id,
            min_amount = %draft.min_amount,
            max_amount = ?draft.max_amount,
            cascaded = cascaded.len(),
            "Tier saved"
        );

        Ok(TierOutcome::Saved {
            tier: draft,
            cascaded,
        })
    }

    /// Append a tier starting at the current highest tier's maximum.
    pub fn add_tier(&mut self) -> PricingResult<CommissionTier> {
        let min_amount = match self.tiers.iter().max_by(|a, b| precedence(a, b)) {
            None => Decimal::ZERO,
            Some(highest) => highest
                .max_amount
                .ok_or_else(|| PricingError::OpenEndedCollection {
                    tier: highest.name.clone(),
                })?,
        };

        let name = format!("Tier {}", self.tiers.len() + 1);
        let width = self.defaults.width;
        let max_amount = min_amount.checked_add(width).ok_or_else(|| {
            ValidationError::BoundaryOverflow {
                tier: name.clone(),
                boundary: min_amount,
                width,
            }
        })?;
        let order = self.tiers.iter().map(|t| t.order).max().map_or(1, |o| o + 1);

        let tier = CommissionTier {
            id: TierId::generate(),
            name,
            min_amount,
            max_amount: Some(max_amount),
            fixed_amount: Decimal::ZERO,
            percentage: Decimal::ZERO,
            currency: self.defaults.currency.clone(),
            is_active: true,
            order,
            commission_type: Some(CommissionType::Percentage),
            transaction_type: self.scope.clone(),
        };

        info!(tier_id = %tier.id, min_amount = %tier.min_amount, "Tier added");

        self.tiers.push(tier.clone());
        self.tiers.sort_by(precedence);
        Ok(tier)
    }

    /// Remove a tier. Neighbouring bounds are left as they are.
    pub fn delete_tier(&mut self, tier_id: &TierId) -> PricingResult<CommissionTier> {
        let idx = self
            .tiers
            .iter()
            .position(|t| &t.id == tier_id)
            .ok_or_else(|| PricingError::TierNotFound(tier_id.clone()))?;

        let removed = self.tiers.remove(idx);

        if matches!(&self.session, EditSession::Editing { tier_id: open, .. } if open == tier_id) {
            self.session = EditSession::Idle;
        }

        info!(tier_id = %tier_id, "Tier deleted");
        Ok(removed)
    }

    /// Flip `is_active`, returning the new value.
    pub fn toggle_active(&mut self, tier_id: &TierId) -> PricingResult<bool> {
        let tier = self
            .tiers
            .iter_mut()
            .find(|t| &t.id == tier_id)
            .ok_or_else(|| PricingError::TierNotFound(tier_id.clone()))?;

        tier.is_active = !tier.is_active;
        let is_active = tier.is_active;

        // Keep an open draft from reverting the flag on save.
        if let EditSession::Editing { tier_id: open, draft } = &mut self.session {
            if open == tier_id {
                draft.is_active = is_active;
            }
        }

        debug!(tier_id = %tier_id, is_active, "Tier toggled");
        Ok(is_active)
    }
}

/// Check `draft` against the ladder it would join.
///
/// Runs over active and inactive tiers alike. The first failing rule wins.
/// A successor may only sit below the draft's maximum when it is the tier's
/// current successor and the maximum moved, since the cascade then slides it up.
pub fn validate_draft(
    tiers: &[CommissionTier],
    draft: &CommissionTier,
) -> Result<(), ValidationError> {
    if let Some(max) = draft.max_amount {
        if draft.min_amount >= max {
            return Err(ValidationError::InvalidRange {
                tier: draft.name.clone(),
                min: draft.min_amount,
                max,
            });
        }
    }

    let ladder = substitute(tiers, draft);
    let Some(pos) = ladder.iter().position(|t| t.id == draft.id) else {
        return Ok(());
    };

    if let Some(predecessor) = pos.checked_sub(1).map(|i| &ladder[i]) {
        match predecessor.max_amount {
            Some(predecessor_max) if predecessor_max > draft.min_amount => {
                return Err(ValidationError::BoundaryOverlap {
                    tier: draft.name.clone(),
                    min: draft.min_amount,
                    predecessor: predecessor.name.clone(),
                    predecessor_max,
                });
            }
            None => {
                return Err(ValidationError::OpenEndedPredecessor {
                    tier: draft.name.clone(),
                    min: draft.min_amount,
                    predecessor: predecessor.name.clone(),
                });
            }
            Some(_) => {}
        }
    }

    let Some(successor) = ladder.get(pos + 1) else {
        return Ok(());
    };

    let Some(max) = draft.max_amount else {
        return Err(ValidationError::OpenEndedNotLast {
            tier: draft.name.clone(),
            successor: successor.name.clone(),
        });
    };

    if successor.min_amount < max && !cascades_into(tiers, draft, &successor.id) {
        return Err(ValidationError::SuccessorOverlap {
            tier: draft.name.clone(),
            max,
            successor: successor.name.clone(),
            successor_min: successor.min_amount,
        });
    }

    Ok(())
}

/// Whether saving `draft` moves its maximum and `successor` currently
/// follows the stored tier.
fn cascades_into(tiers: &[CommissionTier], draft: &CommissionTier, successor: &TierId) -> bool {
    let mut sorted: Vec<&CommissionTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| precedence(a, b));

    let Some(pos) = sorted.iter().position(|t| t.id == draft.id) else {
        return false;
    };

    sorted[pos].max_amount != draft.max_amount
        && sorted.get(pos + 1).is_some_and(|next| &next.id == successor)
}

/// Check a whole ladder: valid ranges, no overlaps, and at most one
/// open-ended tier, placed last.
pub fn validate_ladder(tiers: &[CommissionTier]) -> Result<(), ValidationError> {
    let mut ladder: Vec<&CommissionTier> = tiers.iter().collect();
    ladder.sort_by(|a, b| precedence(a, b));

    for tier in &ladder {
        if let Some(max) = tier.max_amount {
            if tier.min_amount >= max {
                return Err(ValidationError::InvalidRange {
                    tier: tier.name.clone(),
                    min: tier.min_amount,
                    max,
                });
            }
        }
    }

    for pair in ladder.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        match lower.max_amount {
            None => {
                return Err(ValidationError::OpenEndedNotLast {
                    tier: lower.name.clone(),
                    successor: upper.name.clone(),
                });
            }
            Some(lower_max) if lower_max > upper.min_amount => {
                return Err(ValidationError::BoundaryOverlap {
                    tier: upper.name.clone(),
                    min: upper.min_amount,
                    predecessor: lower.name.clone(),
                    predecessor_max: lower_max,
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Slide every tier after `edited` up to the edited tier's new maximum,
/// preserving each successor's width. Stops after the open-ended tier.
///
/// `ladder` must be sorted. Returns the ids of the moved tiers. On overflow
/// the ladder is left partially shifted, so callers work on a copy.
pub fn cascade(
    ladder: &mut [CommissionTier],
    edited: &TierId,
) -> Result<Vec<TierId>, ValidationError> {
    let Some(pos) = ladder.iter().position(|t| &t.id == edited) else {
        return Ok(Vec::new());
    };
    let Some(mut boundary) = ladder[pos].max_amount else {
        return Ok(Vec::new());
    };

    let mut moved = Vec::new();
    for successor in ladder.iter_mut().skip(pos + 1) {
        let width = successor.width();
        successor.min_amount = boundary;
        moved.push(successor.id.clone());

        match width {
            Some(width) => {
                boundary = boundary.checked_add(width).ok_or_else(|| {
                    ValidationError::BoundaryOverflow {
                        tier: successor.name.clone(),
                        boundary,
                        width,
                    }
                })?;
                successor.max_amount = Some(boundary);
            }
            None => break,
        }
    }

    ladder.sort_by(precedence);
    Ok(moved)
}

/// Candidate ladder with `draft` in place of its original, sorted.
fn substitute(tiers: &[CommissionTier], draft: &CommissionTier) -> Vec<CommissionTier> {
    let mut ladder: Vec<CommissionTier> = tiers
        .iter()
        .filter(|t| t.id != draft.id)
        .cloned()
        .collect();
    ladder.push(draft.clone());
    ladder.sort_by(precedence);
    ladder
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchangedesk_common::Currency;
    use rust_decimal_macros::dec;

    fn ladder() -> Vec<CommissionTier> {
        vec![
            CommissionTier::new("t1", "Tier 1", dec!(0), Some(dec!(100)), Currency::usd()),
            CommissionTier::new("t2", "Tier 2", dec!(100), Some(dec!(500)), Currency::usd()),
            CommissionTier::new("t3", "Tier 3", dec!(500), None, Currency::usd()),
        ]
    }

    fn editor() -> TierEditor {
        TierEditor::new(None, ladder(), TierDefaults::default())
    }

    fn bounds(editor: &TierEditor, id: &str) -> (Decimal, Option<Decimal>) {
        let tier = editor.get(&TierId::new(id)).unwrap();
        (tier.min_amount, tier.max_amount)
    }

    #[test]
    fn test_raising_max_cascades_successors() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft(&TierPatch::max_amount(Some(dec!(150))))
            .unwrap();
        let outcome = editor.save().unwrap();

        assert_eq!(bounds(&editor, "t1"), (dec!(0), Some(dec!(150))));
        assert_eq!(bounds(&editor, "t2"), (dec!(150), Some(dec!(550))));
        assert_eq!(bounds(&editor, "t3"), (dec!(550), None));
        assert!(!editor.is_editing());

        match outcome {
            TierOutcome::Saved { cascaded, .. } => {
                assert_eq!(cascaded, vec![TierId::new("t2"), TierId::new("t3")]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_lowering_max_slides_ladder_down() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft(&TierPatch::max_amount(Some(dec!(60))))
            .unwrap();
        editor.save().unwrap();

        assert_eq!(bounds(&editor, "t2"), (dec!(60), Some(dec!(460))));
        assert_eq!(bounds(&editor, "t3"), (dec!(460), None));
    }

    #[test]
    fn test_unchanged_max_does_not_cascade() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t2")).unwrap();
        editor
            .update_draft_with(|d| d.percentage = dec!(1.5))
            .unwrap();
        let outcome = editor.save().unwrap();

        assert!(matches!(outcome, TierOutcome::Saved { ref cascaded, .. } if cascaded.is_empty()));
        assert_eq!(bounds(&editor, "t3"), (dec!(500), None));
        assert_eq!(editor.get(&TierId::new("t2")).unwrap().percentage, dec!(1.5));
    }

    #[test]
    fn test_overlap_rejects_and_keeps_session_open() {
        let mut editor = editor();
        let before = editor.tiers().to_vec();

        editor.begin_edit(&TierId::new("t2")).unwrap();
        editor.update_draft(&TierPatch::min_amount(dec!(90))).unwrap();
        let err = editor.save().unwrap_err();

        assert_eq!(
            err,
            PricingError::Validation(ValidationError::BoundaryOverlap {
                tier: "Tier 2".to_string(),
                min: dec!(90),
                predecessor: "Tier 1".to_string(),
                predecessor_max: dec!(100),
            })
        );
        assert_eq!(editor.tiers(), before.as_slice());
        assert!(editor.is_editing());
        assert_eq!(editor.draft().unwrap().min_amount, dec!(90));
    }

    #[test]
    fn test_draft_sorting_below_predecessor_rejected() {
        let mut tiers = ladder();
        tiers[0].min_amount = dec!(10);
        let mut editor = TierEditor::new(None, tiers, TierDefaults::default());
        let before = editor.tiers().to_vec();

        editor.begin_edit(&TierId::new("t2")).unwrap();
        editor.update_draft(&TierPatch::min_amount(dec!(5))).unwrap();
        let err = editor.save().unwrap_err();

        assert_eq!(
            err,
            PricingError::Validation(ValidationError::SuccessorOverlap {
                tier: "Tier 2".to_string(),
                max: dec!(500),
                successor: "Tier 1".to_string(),
                successor_min: dec!(10),
            })
        );
        assert_eq!(editor.tiers(), before.as_slice());
    }

    #[test]
    fn test_draft_tying_minimum_rejected() {
        let mut tiers = ladder();
        tiers[0].order = 2;
        tiers[1].order = 1;
        let mut editor = TierEditor::new(None, tiers, TierDefaults::default());
        let before = editor.tiers().to_vec();

        editor.begin_edit(&TierId::new("t2")).unwrap();
        editor.update_draft(&TierPatch::min_amount(dec!(0))).unwrap();
        let err = editor.save().unwrap_err();

        assert_eq!(err.error_code(), "SUCCESSOR_OVERLAP");
        assert_eq!(editor.tiers(), before.as_slice());
        assert!(editor.is_editing());
    }

    #[test]
    fn test_validate_ladder() {
        assert_eq!(validate_ladder(&ladder()), Ok(()));
        assert_eq!(validate_ladder(&[]), Ok(()));

        let two_open = vec![
            CommissionTier::new("a", "A", dec!(0), None, Currency::usd()),
            CommissionTier::new("b", "B", dec!(100), None, Currency::usd()),
        ];
        assert_eq!(
            validate_ladder(&two_open),
            Err(ValidationError::OpenEndedNotLast {
                tier: "A".to_string(),
                successor: "B".to_string(),
            })
        );

        let overlapping = vec![
            CommissionTier::new("b", "B", dec!(50), Some(dec!(300)), Currency::usd()),
            CommissionTier::new("a", "A", dec!(0), Some(dec!(100)), Currency::usd()),
        ];
        assert!(matches!(
            validate_ladder(&overlapping),
            Err(ValidationError::BoundaryOverlap { ref tier, .. }) if tier == "B"
        ));

        let inverted = vec![CommissionTier::new(
            "a",
            "A",
            dec!(10),
            Some(dec!(5)),
            Currency::usd(),
        )];
        assert!(matches!(
            validate_ladder(&inverted),
            Err(ValidationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_cascade_overflow_leaves_ladder_untouched() {
        let tiers = vec![
            CommissionTier::new("t1", "Tier 1", dec!(0), Some(dec!(100)), Currency::usd()),
            CommissionTier::new("t2", "Tier 2", dec!(100), Some(Decimal::MAX), Currency::usd()),
        ];
        let mut editor = TierEditor::new(None, tiers, TierDefaults::default());
        let before = editor.tiers().to_vec();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft(&TierPatch::max_amount(Some(dec!(200))))
            .unwrap();
        let err = editor.save().unwrap_err();

        assert_eq!(err.error_code(), "BOUNDARY_OVERFLOW");
        assert_eq!(editor.tiers(), before.as_slice());
    }

    #[test]
    fn test_invalid_range_is_checked_first() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t2")).unwrap();
        editor
            .update_draft(&TierPatch {
                min_amount: Some(dec!(50)),
                max_amount: Some(Some(dec!(40))),
                ..Default::default()
            })
            .unwrap();
        let err = editor.save().unwrap_err();

        assert_eq!(err.error_code(), "INVALID_RANGE");
    }

    #[test]
    fn test_equal_min_and_max_is_invalid() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft(&TierPatch::max_amount(Some(dec!(0))))
            .unwrap();

        assert_eq!(editor.save().unwrap_err().error_code(), "INVALID_RANGE");
    }

    #[test]
    fn test_open_ended_draft_with_successors_rejected() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor.update_draft(&TierPatch::max_amount(None)).unwrap();
        let err = editor.save().unwrap_err();

        assert_eq!(err.error_code(), "OPEN_ENDED_NOT_LAST");
    }

    #[test]
    fn test_draft_above_open_ended_tier_rejected() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft(&TierPatch {
                min_amount: Some(dec!(900)),
                max_amount: Some(Some(dec!(1000))),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(
            editor.save().unwrap_err().error_code(),
            "OPEN_ENDED_PREDECESSOR"
        );
    }

    #[test]
    fn test_inactive_tiers_still_participate_in_validation() {
        let mut tiers = ladder();
        tiers[0].is_active = false;
        let mut editor = TierEditor::new(None, tiers, TierDefaults::default());

        editor.begin_edit(&TierId::new("t2")).unwrap();
        editor.update_draft(&TierPatch::min_amount(dec!(50))).unwrap();

        assert_eq!(editor.save().unwrap_err().error_code(), "BOUNDARY_OVERLAP");
    }

    #[test]
    fn test_cancel_discards_draft() {
        let mut editor = editor();
        let before = editor.tiers().to_vec();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft(&TierPatch::max_amount(Some(dec!(999))))
            .unwrap();
        editor.cancel_edit().unwrap();

        assert_eq!(editor.tiers(), before.as_slice());
        assert_eq!(editor.session(), &EditSession::Idle);
    }

    #[test]
    fn test_session_errors() {
        let mut editor = editor();

        assert_eq!(editor.save(), Err(PricingError::NoEditSession));
        assert_eq!(editor.cancel_edit(), Err(PricingError::NoEditSession));
        assert!(matches!(
            editor.update_draft(&TierPatch::default()),
            Err(PricingError::NoEditSession)
        ));
        assert!(matches!(
            editor.begin_edit(&TierId::new("missing")),
            Err(PricingError::TierNotFound(_))
        ));

        editor.begin_edit(&TierId::new("t1")).unwrap();
        assert_eq!(
            editor.begin_edit(&TierId::new("t2")),
            Err(PricingError::EditSessionOpen("t1".to_string()))
        );
    }

    #[test]
    fn test_draft_id_cannot_drift() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t1")).unwrap();
        editor
            .update_draft_with(|d| d.id = TierId::new("other"))
            .unwrap();

        assert_eq!(editor.draft().unwrap().id, TierId::new("t1"));
    }

    #[test]
    fn test_add_tier_starts_at_highest_max() {
        let tiers = vec![
            CommissionTier::new("t1", "Tier 1", dec!(0), Some(dec!(500)), Currency::usd())
                .with_order(1),
            CommissionTier::new("t2", "Tier 2", dec!(500), Some(dec!(1000)), Currency::usd())
                .with_order(2),
        ];
        let mut editor =
            TierEditor::new(Some("transfer".to_string()), tiers, TierDefaults::default());

        let added = editor.add_tier().unwrap();

        assert_eq!(added.min_amount, dec!(1000));
        assert_eq!(added.max_amount, Some(dec!(1500)));
        assert_eq!(added.commission_type, Some(CommissionType::Percentage));
        assert_eq!(added.percentage, Decimal::ZERO);
        assert_eq!(added.order, 3);
        assert_eq!(added.transaction_type.as_deref(), Some("transfer"));
        assert!(added.is_active);
        assert_eq!(editor.tiers().last().unwrap().id, added.id);
    }

    #[test]
    fn test_add_tier_after_open_ended_fails() {
        let mut editor = editor();
        let err = editor.add_tier().unwrap_err();

        assert_eq!(
            err,
            PricingError::OpenEndedCollection {
                tier: "Tier 3".to_string()
            }
        );
        assert_eq!(editor.tiers().len(), 3);
    }

    #[test]
    fn test_add_tier_to_empty_partition_starts_at_zero() {
        let defaults = TierDefaults {
            width: dec!(250),
            currency: Currency::eur(),
        };
        let mut editor = TierEditor::new(None, Vec::new(), defaults);

        let added = editor.add_tier().unwrap();

        assert_eq!(added.min_amount, Decimal::ZERO);
        assert_eq!(added.max_amount, Some(dec!(250)));
        assert_eq!(added.currency, Currency::eur());
    }

    #[test]
    fn test_delete_leaves_gap_and_closes_session() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t2")).unwrap();
        let removed = editor.delete_tier(&TierId::new("t2")).unwrap();

        assert_eq!(removed.name, "Tier 2");
        assert!(!editor.is_editing());
        assert_eq!(bounds(&editor, "t1"), (dec!(0), Some(dec!(100))));
        assert_eq!(bounds(&editor, "t3"), (dec!(500), None));
    }

    #[test]
    fn test_toggle_active_flips_flag_and_open_draft() {
        let mut editor = editor();

        editor.begin_edit(&TierId::new("t3")).unwrap();
        assert_eq!(editor.toggle_active(&TierId::new("t3")), Ok(false));
        assert!(!editor.draft().unwrap().is_active);

        editor.save().unwrap();
        assert!(!editor.get(&TierId::new("t3")).unwrap().is_active);
        assert_eq!(editor.toggle_active(&TierId::new("t3")), Ok(true));
    }

    #[test]
    fn test_apply_drives_full_session() {
        let mut editor = editor();

        let events = vec![
            TierEvent::BeginEdit(TierId::new("t1")),
            TierEvent::UpdateDraft(TierPatch::max_amount(Some(dec!(150)))),
            TierEvent::Save,
        ];
        for event in events {
            editor.apply(event).unwrap();
        }

        assert_eq!(bounds(&editor, "t2"), (dec!(150), Some(dec!(550))));
    }

    #[test]
    fn test_event_json_shape() {
        let event: TierEvent = serde_json::from_str(r#"{"begin_edit": "t1"}"#).unwrap();
        assert_eq!(event, TierEvent::BeginEdit(TierId::new("t1")));

        let event: TierEvent = serde_json::from_str(r#""save""#).unwrap();
        assert_eq!(event, TierEvent::Save);

        let event: TierEvent =
            serde_json::from_str(r#"{"update_draft": {"maxAmount": "150"}}"#).unwrap();
        assert_eq!(
            event,
            TierEvent::UpdateDraft(TierPatch::max_amount(Some(dec!(150))))
        );
    }
}

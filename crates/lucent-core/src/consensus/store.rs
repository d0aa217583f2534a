use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::consensus::validator::{CommitteeChange, RejectReason, UpdateValidator, ValidatedEffect};
use crate::ssz::HashTreeRoot;
use crate::types::beacon::*;

/// Capacity of the head event channel. Slow subscribers lag rather than block the writer.
const HEAD_EVENT_CAPACITY: usize = 64;

/// Published to subscribers after each accepted update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadEvent {
    Optimistic(LatestHeadUpdate),
    Finalized(FinalizedHeadUpdate),
    CommitteeRotated { period: u64 },
}

/// Everything readers can observe, swapped as one unit.
#[derive(Clone, Debug)]
struct StoreState {
    snapshot: Arc<LightClientSnapshot>,
    latest_head: Option<LatestHeadUpdate>,
    latest_finalized: Option<FinalizedHeadUpdate>,
    accepted_updates: u64,
}

/// Holds the one trusted snapshot and advances it with validated updates.
///
/// Readers never block: they load an immutable `Arc` of the current state.
/// Writers are serialized, so two updates validated against the same snapshot
/// can never both be applied.
pub struct SnapshotStore {
    validator: UpdateValidator,
    state: ArcSwap<StoreState>,
    write_lock: Mutex<()>,
    events: broadcast::Sender<HeadEvent>,
}

impl SnapshotStore {
    /// Start from a checkpoint whose committee is proven against its state root.
    pub fn bootstrap(
        validator: UpdateValidator,
        checkpoint_header: BeaconBlockHeader,
        current_sync_committee: SyncCommittee,
        current_sync_committee_branch: &[Root],
    ) -> Result<Self, RejectReason> {
        let config = validator.config();
        current_sync_committee
            .validate(config.sync_committee_size)
            .map_err(|reason| RejectReason::InvalidBootstrap { reason })?;

        if !validator.verify_proof(
            &current_sync_committee.hash_tree_root(),
            current_sync_committee_branch,
            config.current_sync_committee_proof,
            &checkpoint_header.state_root,
        ) {
            return Err(RejectReason::InvalidBootstrap {
                reason: "current sync committee branch does not verify against the checkpoint state root"
                    .to_string(),
            });
        }

        info!(
            slot = checkpoint_header.slot,
            period = validator.periods().period_of(checkpoint_header.slot),
            "light client bootstrapped"
        );

        let snapshot = LightClientSnapshot {
            header: checkpoint_header,
            current_sync_committee: Arc::new(current_sync_committee),
            next_sync_committee: None,
        };
        let (events, _) = broadcast::channel(HEAD_EVENT_CAPACITY);

        Ok(Self {
            validator,
            state: ArcSwap::from_pointee(StoreState {
                snapshot: Arc::new(snapshot),
                latest_head: None,
                latest_finalized: None,
                accepted_updates: 0,
            }),
            write_lock: Mutex::new(()),
            events,
        })
    }

    /// Start from a bootstrap object, checking its header against a trusted block root.
    pub fn bootstrap_from(
        validator: UpdateValidator,
        bootstrap: &LightClientBootstrap,
        trusted_block_root: &Root,
    ) -> Result<Self, RejectReason> {
        let header_root = bootstrap.header.hash_tree_root();
        if header_root != *trusted_block_root {
            return Err(RejectReason::InvalidBootstrap {
                reason: format!(
                    "header root 0x{} does not match trusted block root 0x{}",
                    hex::encode(header_root),
                    hex::encode(trusted_block_root)
                ),
            });
        }

        Self::bootstrap(
            validator,
            bootstrap.header.clone(),
            bootstrap.current_sync_committee.clone(),
            &bootstrap.current_sync_committee_branch,
        )
    }

    pub fn validator(&self) -> &UpdateValidator {
        &self.validator
    }

    /// Validate `update` against the current snapshot and apply it.
    ///
    /// On rejection nothing changes. Validation happens under the write lock,
    /// so the snapshot an update was checked against is the one it replaces.
    pub fn apply(&self, update: &LightClientUpdate) -> Result<ValidatedEffect, RejectReason> {
        let _guard = self.write_lock.lock();
        let current = self.state.load_full();

        let effect = match self.validator.validate(&current.snapshot, update) {
            Ok(effect) => effect,
            Err(reason) => {
                debug!(
                    slot = update.attested_header.slot,
                    %reason,
                    "light client update rejected"
                );
                return Err(reason);
            }
        };

        let previous = &current.snapshot;
        let snapshot = match &effect.committee_change {
            CommitteeChange::None => LightClientSnapshot {
                header: effect.header.clone(),
                current_sync_committee: previous.current_sync_committee.clone(),
                next_sync_committee: previous.next_sync_committee.clone(),
            },
            CommitteeChange::Stage(next) => LightClientSnapshot {
                header: effect.header.clone(),
                current_sync_committee: previous.current_sync_committee.clone(),
                next_sync_committee: Some(next.clone()),
            },
            CommitteeChange::Rotate(next) => LightClientSnapshot {
                header: effect.header.clone(),
                current_sync_committee: previous
                    .next_sync_committee
                    .clone()
                    .unwrap_or_else(|| previous.current_sync_committee.clone()),
                next_sync_committee: Some(next.clone()),
            },
        };

        let latest_head = LatestHeadUpdate::from(update);
        let finalized = finalized_projection(update).filter(|candidate| {
            current.latest_finalized.as_ref().map_or(true, |latest| {
                candidate.finalized_header.slot >= latest.finalized_header.slot
            })
        });

        self.state.store(Arc::new(StoreState {
            snapshot: Arc::new(snapshot),
            latest_head: Some(latest_head.clone()),
            latest_finalized: finalized
                .clone()
                .or_else(|| current.latest_finalized.clone()),
            accepted_updates: current.accepted_updates + 1,
        }));

        let period = self.validator.periods().period_of(effect.header.slot);
        match &effect.committee_change {
            CommitteeChange::Rotate(_) => {
                info!(slot = effect.header.slot, period, "sync committee rotated");
            }
            CommitteeChange::Stage(_) => {
                info!(period = period + 1, "next sync committee staged");
            }
            CommitteeChange::None => {}
        }
        info!(
            slot = effect.header.slot,
            participants = effect.participants,
            class = ?effect.class,
            "light client update accepted"
        );

        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(HeadEvent::Optimistic(latest_head));
        if let Some(finalized) = finalized {
            let _ = self.events.send(HeadEvent::Finalized(finalized));
        }
        if effect.is_rotation() {
            let _ = self.events.send(HeadEvent::CommitteeRotated { period });
        }

        Ok(effect)
    }

    /// The current trusted snapshot. Never blocks on writers.
    pub fn snapshot(&self) -> Arc<LightClientSnapshot> {
        self.state.load().snapshot.clone()
    }

    /// The most recently accepted update, as an optimistic head.
    pub fn latest_optimistic_head_update(&self) -> Option<LatestHeadUpdate> {
        self.state.load().latest_head.clone()
    }

    /// The accepted finalized update with the highest finalized slot.
    pub fn latest_finalized_head_update(&self) -> Option<FinalizedHeadUpdate> {
        self.state.load().latest_finalized.clone()
    }

    pub fn accepted_updates(&self) -> u64 {
        self.state.load().accepted_updates
    }

    pub fn current_period(&self) -> u64 {
        self.validator
            .periods()
            .period_of(self.state.load().snapshot.header.slot)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HeadEvent> {
        self.events.subscribe()
    }
}

fn finalized_projection(update: &LightClientUpdate) -> Option<FinalizedHeadUpdate> {
    let finalized_header = update.finalized_header.clone()?;
    Some(FinalizedHeadUpdate {
        attested_header: update.attested_header.clone(),
        finalized_header,
        finality_branch: update.finality_branch.clone(),
        sync_aggregate: update.sync_aggregate.clone(),
    })
}

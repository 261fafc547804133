//! The trace engine: one handler per observed execution point.
//!
//! Each handler reads, transitions, or clears the per-context
//! (draft, situation) pair according to which points have already
//! fired for that context, and decides whether the accumulated record
//! is ready to finalize.  All failure is absorbed locally: missing
//! state is "nothing to do", asymmetric state is corruption cleanup,
//! and a full store or ring is a silent drop.  No handler ever blocks
//! or surfaces an error to the probed code.

use crate::action::{classify, Origin};
use crate::draft::EventDraft;
use crate::header;
use crate::probe::{AddOutcome, ContextId, IfaceView, PathView, ProbeKind};
use crate::ring::EventRing;
use crate::situation::{next_situation, Situation};
use crate::store::{Lookup, ScratchStore};
use log::{debug, trace};
use meshtrace_protocol::{Action, EventRecord, MacAddr, SCRATCH_CAPACITY};

/// Configuration for the trace engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Live-context bound of the scratch store.
    pub scratch_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            scratch_capacity: SCRATCH_CAPACITY,
        }
    }
}

/// The event-correlation engine.
///
/// Owns the scratch store and the producer half of the event ring.
/// The attachment layer routes each probe firing to the matching
/// handler, passing the execution-context id, the probe timestamp
/// where the protocol records one, and accessor views over the
/// probe's arguments.
///
/// # Example
///
/// ```
/// use meshtrace_engine::{ring, AddOutcome, EngineConfig, TraceEngine};
/// use meshtrace_engine::probe::IfaceView;
/// use meshtrace_protocol::{Action, IfaceName, MacAddr};
///
/// struct Iface;
/// impl IfaceView for Iface {
///     fn hw_addr(&self) -> MacAddr { MacAddr([2; 6]) }
///     fn name(&self) -> IfaceName { IfaceName::new("mesh0") }
/// }
///
/// let (tx, rx) = ring::ring();
/// let engine = TraceEngine::new(EngineConfig::default(), tx);
///
/// // An add completes, then the path is used to transmit a frame.
/// engine.on_path_add_return(7, 1_000, &Iface, AddOutcome::Created { dst: MacAddr([9; 6]) });
/// engine.on_frame_transmit(7, &[0u8; 24]);
///
/// let event = rx.try_next().unwrap();
/// assert_eq!(event.action, Action::TxAdd);
/// ```
pub struct TraceEngine {
    store: ScratchStore,
    ring: EventRing,
}

impl TraceEngine {
    /// Create an engine publishing into `ring`.
    pub fn new(config: EngineConfig, ring: EventRing) -> Self {
        TraceEngine {
            store: ScratchStore::with_capacity(config.scratch_capacity),
            ring,
        }
    }

    /// Number of contexts with a pending transaction (for tests and
    /// metrics).
    pub fn pending_contexts(&self) -> usize {
        self.store.len()
    }

    /// Whether no context holds any scratch state.
    pub fn scratch_is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Records dropped on ring backpressure.
    pub fn dropped_events(&self) -> u64 {
        self.ring.dropped()
    }

    // ── Transaction-opening handlers ────────────────────────────

    /// Exit of the path-add routine.
    ///
    /// Only a successful add opens a transaction; a null/error return
    /// exits with no state change.  Any pending state for this
    /// context is overwritten (should not happen, but the overwrite
    /// is unconditional either way).
    pub fn on_path_add_return(
        &self,
        ctx: ContextId,
        ts_ns: u64,
        iface: &dyn IfaceView,
        outcome: AddOutcome,
    ) {
        let dst = match outcome {
            AddOutcome::Created { dst } => dst,
            AddOutcome::Failed => return,
        };
        let situation = match next_situation(None, ProbeKind::PathAddReturn, false) {
            Some(s) => s,
            None => return,
        };

        let draft = EventDraft {
            ts_ns,
            dst,
            mac: iface.hw_addr(),
            iface: iface.name(),
            ..EventDraft::default()
        };
        if let Err(err) = self.store.put(ctx, draft, situation) {
            trace!("ctx {ctx}: add transaction not opened: {err}");
        }
    }

    /// Entry of the expiration sweep: open the expire bracket.
    ///
    /// The bracket holds a situation with no draft — the deletions
    /// inside it read everything from their own arguments.
    pub fn on_expire_enter(&self, ctx: ContextId) {
        let situation = match next_situation(None, ProbeKind::ExpireEnter, false) {
            Some(s) => s,
            None => return,
        };
        if let Err(err) = self.store.put_situation_only(ctx, situation) {
            trace!("ctx {ctx}: expire bracket not opened: {err}");
        }
    }

    /// Exit of the expiration sweep: close the bracket, clearing both
    /// entries regardless of what the situation currently is.
    pub fn on_expire_return(&self, ctx: ContextId) {
        self.store.delete(ctx);
    }

    // ── Transaction-continuing handler ──────────────────────────

    /// Entry of the next-hop assignment routine.
    ///
    /// Augments an in-flight add into add-assign, or opens a
    /// standalone assign/change transaction.  Never finalizes.
    pub fn on_nexthop_assign(&self, ctx: ContextId, ts_ns: u64, path: &dyn PathView, new_nh: MacAddr) {
        let (mut draft, prior) = match self.store.get(ctx) {
            Lookup::Present(draft, situation) => (draft, Some(situation)),
            Lookup::Absent => (EventDraft::default(), None),
            Lookup::Asymmetric => {
                debug!("ctx {ctx}: asymmetric scratch state at nexthop assign, clearing");
                self.store.delete(ctx);
                return;
            }
        };

        let old_nh = path.next_hop();
        let situation = match next_situation(prior, ProbeKind::NexthopAssign, old_nh.is_some()) {
            Some(s) => s,
            None => return,
        };

        draft.ts_ns = ts_ns;
        draft.new_nh = new_nh;

        if situation != Situation::AddAssign {
            // Case 1 opened an empty draft: (re)populate the path
            // identity, and keep the replaced hop on a change.
            if let Some(old) = old_nh {
                draft.old_nh = old;
            }
            draft.dst = path.dst();
            draft.mac = path.iface_hw_addr();
            draft.iface = path.iface_name();
        }

        if let Err(err) = self.store.put(ctx, draft, situation) {
            trace!("ctx {ctx}: assign transaction not stored: {err}");
        }
    }

    // ── Transaction-terminating handlers ────────────────────────

    /// Exit of the low-level path-delete routine.
    ///
    /// The underlying routine runs several times per user-facing
    /// delete; whether a call belongs to an expiration burst is
    /// discovered by situation, not by call counting.  Inside the
    /// expire bracket each call emits its own kernel-expire event and
    /// leaves the scratch state alone (the bracket owns it).  Outside
    /// it, deletion carries complete information at this single
    /// point, so a fresh delete draft overwrites anything pending and
    /// waits for a terminating probe to reveal the origin.
    pub fn on_path_del_return(&self, ctx: ContextId, ts_ns: u64, path: &dyn PathView) {
        if self.store.situation_of(ctx) == Some(Situation::Expire) {
            let mut rec = EventRecord::zeroed(Action::KernelExpire);
            rec.ts_ns = ts_ns;
            rec.dst = path.dst();
            rec.mac = path.iface_hw_addr();
            rec.iface = path.iface_name();
            if let Some(old) = path.next_hop() {
                rec.has_old_nh = true;
                rec.old_nh = old;
            }
            self.ring.try_emit(rec);
            return;
        }

        let situation = match next_situation(None, ProbeKind::PathDelReturn, false) {
            Some(s) => s,
            None => return,
        };

        let mut draft = EventDraft {
            ts_ns,
            dst: path.dst(),
            mac: path.iface_hw_addr(),
            iface: path.iface_name(),
            ..EventDraft::default()
        };
        if let Some(old) = path.next_hop() {
            draft.has_old_nh = true;
            draft.old_nh = old;
        }
        if let Err(err) = self.store.put(ctx, draft, situation) {
            trace!("ctx {ctx}: delete transaction not stored: {err}");
        }
    }

    /// A frame left through the path: finalize with the transmit
    /// origin and enrich the event with the frame's header.
    pub fn on_frame_transmit(&self, ctx: ContextId, frame: &[u8]) {
        self.finalize(ctx, Origin::Transmit, Some(frame));
    }

    /// A management frame referencing the path was received.
    pub fn on_mgmt_frame_receive(&self, ctx: ContextId, frame: &[u8]) {
        self.finalize(ctx, Origin::Receive, Some(frame));
    }

    /// A user-space control request returned.
    pub fn on_userspace_return(&self, ctx: ContextId) {
        self.finalize(ctx, Origin::UserRequest, None);
    }

    /// Exit of peer-link deactivation.
    ///
    /// The possible call stacks are too many to attribute, so any
    /// pending transaction for this context is abandoned.
    pub fn on_plink_deactivate(&self, ctx: ContextId) {
        self.store.delete(ctx);
    }

    fn finalize(&self, ctx: ContextId, origin: Origin, frame: Option<&[u8]>) {
        let (draft, situation) = match self.store.get(ctx) {
            Lookup::Present(draft, situation) => (draft, situation),
            Lookup::Absent => {
                self.store.delete(ctx);
                return;
            }
            Lookup::Asymmetric => {
                debug!("ctx {ctx}: asymmetric scratch state at {origin} finalize, clearing");
                self.store.delete(ctx);
                return;
            }
        };

        let mut rec = draft.finish(classify(origin, situation));
        if let Some(buf) = frame {
            header::parse(buf).write_into(&mut rec);
        }
        if !self.ring.try_emit(rec) {
            debug!("ctx {ctx}: {} event dropped on backpressure", rec.action);
        }
        self.store.delete(ctx);
    }
}

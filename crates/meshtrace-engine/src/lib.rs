//! Event-correlation engine for mesh-path topology reconstruction.
//!
//! The engine turns low-level probe firings inside a running 802.11s
//! stack into high-level topology events: a mesh path being created,
//! assigned a next hop, changed, deleted, or expired.  No single probe
//! carries the full picture, so partial information accumulates in a
//! per-context scratch record until a terminating probe can classify
//! and publish it.
//!
//! # Architecture
//!
//! ```text
//! Kernel probe points          TraceEngine handlers        Transport
//! ──────────────────           ────────────────────        ─────────
//! path-add exit          ──→ on_path_add_return()
//! next-hop assign entry  ──→ on_nexthop_assign()     scratch store
//! path-del exit          ──→ on_path_del_return()  ←──(ctx-keyed)──┐
//! expire enter/exit      ──→ on_expire_*()                         │
//! frame transmit tp      ──→ on_frame_transmit()   ──finalize──→ ring ──→ consumer
//! mgmt frame rx exit     ──→ on_mgmt_frame_receive()──finalize──→ ring
//! userspace req exit     ──→ on_userspace_return() ──finalize──→ ring
//! peer-link deactivate   ──→ on_plink_deactivate() ──cleanup
//! ```
//!
//! The attachment runtime (probe registration, argument marshalling)
//! is external; it must deliver handler calls for one execution
//! context in the program order of the operations they observe, and
//! it implements the [`probe`] accessor traits over the stack's
//! opaque structures.  Handlers never block: a full scratch store or a
//! full ring is absorbed locally, never surfaced to the probed code.

pub mod action;
pub mod draft;
pub mod engine;
pub mod header;
pub mod probe;
pub mod ring;
pub mod situation;
pub mod store;

pub use engine::{EngineConfig, TraceEngine};
pub use probe::{AddOutcome, ContextId, IfaceView, PathView, ProbeKind};
pub use ring::{EventRing, EventRx};
pub use situation::Situation;

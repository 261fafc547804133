//! The attachment boundary: probe identities and version-tolerant
//! accessors over the probed stack's opaque structures.
//!
//! The engine never dereferences kernel memory itself.  The attachment
//! layer implements [`PathView`] and [`IfaceView`] over whatever
//! field-relocation mechanism the running kernel requires; tests
//! implement them with plain structs.

use meshtrace_protocol::{IfaceName, MacAddr};

/// Identifier of the execution context (thread/task) a probe fired on.
///
/// Context ids are reused over the process lifetime, so scratch state
/// keyed by them must be cleared by whichever handler terminates a
/// transaction.
pub type ContextId = u32;

/// The fixed set of execution points the engine observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Exit of the path-add routine (carries its return value).
    PathAddReturn,
    /// Entry of the next-hop assignment routine.
    NexthopAssign,
    /// Exit of the low-level path-delete routine.
    PathDelReturn,
    /// Entry of the expiration sweep.
    ExpireEnter,
    /// Exit of the expiration sweep.
    ExpireReturn,
    /// Frame transmission tracepoint.
    FrameTransmit,
    /// Exit of the queued-management-frame receive routine.
    MgmtFrameReceive,
    /// Exit of the user-space request dispatcher.
    UserspaceReturn,
    /// Exit of the peer-link deactivation routine.
    PlinkDeactivate,
}

impl ProbeKind {
    /// Human-readable probe name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PathAddReturn => "path_add_return",
            Self::NexthopAssign => "nexthop_assign",
            Self::PathDelReturn => "path_del_return",
            Self::ExpireEnter => "expire_enter",
            Self::ExpireReturn => "expire_return",
            Self::FrameTransmit => "frame_transmit",
            Self::MgmtFrameReceive => "mgmt_frame_receive",
            Self::UserspaceReturn => "userspace_return",
            Self::PlinkDeactivate => "plink_deactivate",
        }
    }
}

/// Return value of the path-add routine as seen by its exit probe.
///
/// The routine reports failure through a null/error pointer; the
/// handler checks this before touching any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The add succeeded; the new path routes towards `dst`.
    Created { dst: MacAddr },
    /// Null or error return — nothing was added.
    Failed,
}

/// Accessor over an opaque mesh-path structure.
///
/// Field reads go through whatever layout-relocation mechanism the
/// attachment layer provides, so the engine stays independent of the
/// probed kernel's struct versions.
pub trait PathView {
    /// Destination the path routes towards.
    fn dst(&self) -> MacAddr;
    /// Currently bound next hop, if any.
    fn next_hop(&self) -> Option<MacAddr>;
    /// Hardware address of the owning interface.
    fn iface_hw_addr(&self) -> MacAddr;
    /// Name of the owning interface.
    fn iface_name(&self) -> IfaceName;
}

/// Accessor over an opaque interface (sub-if-data) structure.
pub trait IfaceView {
    /// Hardware address of the interface.
    fn hw_addr(&self) -> MacAddr;
    /// Interface name.
    fn name(&self) -> IfaceName;
}

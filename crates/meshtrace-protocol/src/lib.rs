//! Wire protocol between the meshtrace engine and event consumers.
//!
//! This crate defines the fixed-layout event record pushed through the
//! bounded event ring, the closed [`Action`] code set, and the IEEE
//! 802.11 constants the engine and consumers must agree on.  It is
//! deliberately dependency-light so that a consumer process can link it
//! without pulling in the engine.
//!
//! # Transport
//!
//! Finished events travel producer → consumer as whole [`EventRecord`]
//! values over a bounded single-consumer ring:
//!
//! 1. A probe handler finalizes a draft into an [`EventRecord`]
//! 2. The engine reserves a ring slot; on backpressure the record is
//!    dropped, never queued unboundedly
//! 3. The consumer decodes the record, optionally lifting it into the
//!    typed [`PathEvent`] view
//!
//! Records are immutable once published; a consumer never observes a
//! partially populated record.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
//  Sizes and capacities
// ═══════════════════════════════════════════════════════════════════════

/// Length of a hardware (MAC) address in bytes.
pub const ETH_ALEN: usize = 6;

/// Maximum network interface name length, including NUL padding.
pub const IFNAMSIZ: usize = 16;

/// Live-context capacity of the per-context scratch store.
pub const SCRATCH_CAPACITY: usize = 1024;

/// Byte capacity of the finished-event ring.
pub const RING_BYTES: usize = 256 * 1024;

/// Slot capacity of the finished-event ring.
pub const RING_CAPACITY: usize = RING_BYTES / std::mem::size_of::<EventRecord>();

// ═══════════════════════════════════════════════════════════════════════
//  IEEE 802.11 frame-control masks (from <linux/ieee80211.h>)
// ═══════════════════════════════════════════════════════════════════════

/// `IEEE80211_FCTL_FROMDS` — frame leaves the distribution system.
pub const FCTL_FROMDS: u16 = 0x0200;

/// `IEEE80211_FCTL_TODS` — frame enters the distribution system.
pub const FCTL_TODS: u16 = 0x0100;

/// `IEEE80211_FCTL_FTYPE` — frame type field mask.
pub const FCTL_FTYPE: u16 = 0x000c;

/// `IEEE80211_FTYPE_DATA` — data frame type.
pub const FTYPE_DATA: u16 = 0x0008;

/// `IEEE80211_STYPE_QOS_DATA` — QoS-data frame subtype.
pub const STYPE_QOS_DATA: u16 = 0x0080;

/// Both DS bits set: the header carries a fourth address.
pub const HAS_ADDR4: u16 = FCTL_TODS | FCTL_FROMDS;

/// Frame-control value of a QoS-data frame (under [`CHECK_QOS`]).
pub const HAS_QOS: u16 = FTYPE_DATA | STYPE_QOS_DATA;

/// Mask isolating the bits that identify a QoS-data frame.
pub const CHECK_QOS: u16 = FCTL_FTYPE | STYPE_QOS_DATA;

/// Fixed header size of a 3-address frame (`struct ieee80211_hdr_3addr`).
pub const HDR_SIZE_3ADDR: usize = 24;

/// Fixed header size of a 4-address frame (`struct ieee80211_hdr`).
pub const HDR_SIZE_4ADDR: usize = 30;

// ═══════════════════════════════════════════════════════════════════════
//  Address newtypes
// ═══════════════════════════════════════════════════════════════════════

/// A 6-byte hardware address.
///
/// An all-zero value stands for "absent" in record fields whose
/// presence is signalled elsewhere (flag or action code).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; ETH_ALEN]);

impl MacAddr {
    /// The all-zero address.
    pub const ZERO: MacAddr = MacAddr([0; ETH_ALEN]);

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; ETH_ALEN]
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5],
        )
    }
}

/// A NUL-padded network interface name.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IfaceName(pub [u8; IFNAMSIZ]);

impl IfaceName {
    /// Build from a string, truncating to [`IFNAMSIZ`] bytes.
    pub fn new(name: &str) -> Self {
        let mut buf = [0u8; IFNAMSIZ];
        let n = name.len().min(IFNAMSIZ);
        buf[..n].copy_from_slice(&name.as_bytes()[..n]);
        IfaceName(buf)
    }

    /// The name with NUL padding stripped (lossy on non-UTF-8 bytes).
    /// Borrows unless the bytes were not valid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match String::from_utf8_lossy(&self.0) {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim_matches('\0')),
            Cow::Owned(s) => Cow::Owned(s.trim_matches('\0').to_owned()),
        }
    }
}

impl fmt::Display for IfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Action codes
// ═══════════════════════════════════════════════════════════════════════

/// How a finished topology event came about: which externally visible
/// point finalized it (transmit / receive / user-space request /
/// kernel expiration) crossed with the operation that was in flight.
///
/// The set is closed.  A few combinations are believed unreachable
/// given the observed stack's call graph; they stay defined so that an
/// unexpected firing still classifies to a documented code instead of
/// being undefined behavior.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    TxUnknown = 0,
    RxUnknown = 1,
    UsUnknown = 2,

    // ── Transmission ────────────────────────────────────────────
    TxAdd = 3,
    TxAddAssign = 4,
    /// Believed unreachable: next-hop assignment is not called from
    /// the transmit path.
    TxAssign = 5,
    /// Believed unreachable, same reason as [`Action::TxAssign`].
    TxChange = 6,
    TxDelete = 7,

    // ── Reception ───────────────────────────────────────────────
    RxAdd = 8,
    RxAddAssign = 9,
    RxAssign = 10,
    RxChange = 11,
    /// Believed unreachable: path deletion is not called from the
    /// receive path.
    RxDelete = 12,

    // ── User space ──────────────────────────────────────────────
    /// Believed unreachable: a user-space add always carries a
    /// next hop.
    UsAdd = 13,
    UsAddAssign = 14,
    UsAssign = 15,
    UsChange = 16,
    UsDelete = 17,

    // ── Kernel ──────────────────────────────────────────────────
    KernelExpire = 18,
}

impl Action {
    /// Convert a `u32` discriminant to an [`Action`], if valid.
    pub fn from_u32(v: u32) -> Option<Self> {
        use Action::*;
        Some(match v {
            0 => TxUnknown,
            1 => RxUnknown,
            2 => UsUnknown,
            3 => TxAdd,
            4 => TxAddAssign,
            5 => TxAssign,
            6 => TxChange,
            7 => TxDelete,
            8 => RxAdd,
            9 => RxAddAssign,
            10 => RxAssign,
            11 => RxChange,
            12 => RxDelete,
            13 => UsAdd,
            14 => UsAddAssign,
            15 => UsAssign,
            16 => UsChange,
            17 => UsDelete,
            18 => KernelExpire,
            _ => return None,
        })
    }

    /// Short code name, e.g. `TX_ADD`.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TxUnknown => "TX_UNKNOWN",
            Self::RxUnknown => "RX_UNKNOWN",
            Self::UsUnknown => "US_UNKNOWN",
            Self::TxAdd => "TX_ADD",
            Self::TxAddAssign => "TX_ADD_ASG",
            Self::TxAssign => "TX_ASG",
            Self::TxChange => "TX_CHG",
            Self::TxDelete => "TX_DEL",
            Self::RxAdd => "RX_ADD",
            Self::RxAddAssign => "RX_ADD_ASG",
            Self::RxAssign => "RX_ASG",
            Self::RxChange => "RX_CHG",
            Self::RxDelete => "RX_DEL",
            Self::UsAdd => "US_ADD",
            Self::UsAddAssign => "US_ADD_ASG",
            Self::UsAssign => "US_ASG",
            Self::UsChange => "US_CHG",
            Self::UsDelete => "US_DEL",
            Self::KernelExpire => "KR_EXP",
        }
    }

    /// Human-readable description of what the action means.
    pub const fn detailed(&self) -> &'static str {
        match self {
            Self::TxUnknown => "Unknown action caused by a frame transmission.",
            Self::RxUnknown => "Unknown action caused by a frame reception.",
            Self::UsUnknown => "Unknown action caused by a command from user space.",
            Self::TxAdd => "A frame transmission caused a mesh path to be added (without a next hop).",
            Self::TxAddAssign => "A frame transmission caused a mesh path to be added (with a next hop).",
            Self::TxAssign => "A frame transmission gave a next hop to a mesh path that had none.",
            Self::TxChange => "A frame transmission replaced the next hop of a mesh path.",
            Self::TxDelete => "A frame transmission caused a mesh path to be deleted.",
            Self::RxAdd => "A frame reception caused a mesh path to be added (without a next hop).",
            Self::RxAddAssign => "A frame reception caused a mesh path to be added (with a next hop).",
            Self::RxAssign => "A frame reception gave a next hop to a mesh path that had none.",
            Self::RxChange => "A frame reception replaced the next hop of a mesh path.",
            Self::RxDelete => "A frame reception caused a mesh path to be deleted.",
            Self::UsAdd => "A command from user space caused a mesh path to be added (without a next hop).",
            Self::UsAddAssign => "A command from user space caused a mesh path to be added (with a next hop).",
            Self::UsAssign => "A command from user space gave a next hop to a mesh path that had none.",
            Self::UsChange => "A command from user space replaced the next hop of a mesh path.",
            Self::UsDelete => "A command from user space caused a mesh path to be deleted.",
            Self::KernelExpire => "A mesh path was deleted because it expired.",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Finished-event record (fixed wire layout)
// ═══════════════════════════════════════════════════════════════════════

/// The immutable finished event, in its fixed wire layout.
///
/// Absent addresses are zero-filled; `has_old_nh` disambiguates a
/// genuinely absent previous next hop from the zero address on the
/// delete/expire actions. Header fields are populated only for
/// transmit/receive-finalized events and stay zero otherwise.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EventRecord {
    // ── Station info ────────────────────────────────────────────
    /// Hardware address of the observing interface.
    pub mac: MacAddr,
    /// Name of the observing interface.
    pub iface: IfaceName,

    // ── Action info ─────────────────────────────────────────────
    /// Nanoseconds since boot at the point the transaction opened.
    pub ts_ns: u64,
    /// Resolved action code.
    pub action: Action,

    // ── Path info ───────────────────────────────────────────────
    /// Destination the mesh path routes towards.
    pub dst: MacAddr,
    /// Next hop before the operation (delete/expire/change only).
    pub old_nh: MacAddr,
    /// Next hop after the operation (assign/change only).
    pub new_nh: MacAddr,
    /// Whether the path had a next hop bound (delete/expire only).
    pub has_old_nh: bool,

    // ── Frame info (transmit/receive origins only) ──────────────
    pub frame_control: u16,
    pub seq_control: u16,
    pub qos_control: u16,
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub addr4: MacAddr,
}

const _: () = assert!(std::mem::size_of::<EventRecord>() == 88);

impl EventRecord {
    /// An all-zero record with the given action code.
    pub fn zeroed(action: Action) -> Self {
        EventRecord {
            mac: MacAddr::ZERO,
            iface: IfaceName::default(),
            ts_ns: 0,
            action,
            dst: MacAddr::ZERO,
            old_nh: MacAddr::ZERO,
            new_nh: MacAddr::ZERO,
            has_old_nh: false,
            frame_control: 0,
            seq_control: 0,
            qos_control: 0,
            addr1: MacAddr::ZERO,
            addr2: MacAddr::ZERO,
            addr3: MacAddr::ZERO,
            addr4: MacAddr::ZERO,
        }
    }

    /// Decode a record from a raw transport buffer.
    ///
    /// Returns `None` on a short buffer or an action discriminant
    /// outside the closed set.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let mut buf = [0u8; std::mem::size_of::<EventRecord>()];
        let len = buf.len();
        buf.copy_from_slice(data.get(..len)?);
        // Validate the discriminant before materializing the enum field.
        let off = std::mem::offset_of!(EventRecord, action);
        let code = u32::from_ne_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);
        Action::from_u32(code)?;
        // A C producer may write any nonzero byte for true; fold it to
        // a valid bool bit pattern before the read.
        let flag = std::mem::offset_of!(EventRecord, has_old_nh);
        buf[flag] = u8::from(buf[flag] != 0);
        // Layout is guaranteed by repr(C) and the size assertion above.
        let record = unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const EventRecord) };
        Some(record)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Typed consumer view
// ═══════════════════════════════════════════════════════════════════════

/// Consumer-side view of an [`EventRecord`] with the zero-filled /
/// flag-guarded fields lifted into `Option`s according to the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEvent {
    pub ts_ns: u64,
    pub action: Action,
    pub mac: MacAddr,
    pub iface: String,
    pub dst: MacAddr,
    pub old_nh: Option<MacAddr>,
    pub new_nh: Option<MacAddr>,
    pub frame_control: u16,
    pub seq_control: u16,
    pub qos_control: Option<u16>,
    pub addr1: MacAddr,
    pub addr2: MacAddr,
    pub addr3: MacAddr,
    pub addr4: Option<MacAddr>,
}

impl PathEvent {
    /// Lift a wire record into the typed view.
    pub fn from_record(rec: &EventRecord) -> Self {
        use Action::*;

        let (old_nh, new_nh) = match rec.action {
            TxAdd | RxAdd | UsAdd => (None, None),
            TxUnknown | RxUnknown | UsUnknown | TxChange | RxChange | UsChange => {
                (Some(rec.old_nh), Some(rec.new_nh))
            }
            TxAddAssign | RxAddAssign | UsAddAssign | TxAssign | RxAssign | UsAssign => {
                (None, Some(rec.new_nh))
            }
            TxDelete | RxDelete | UsDelete | KernelExpire => {
                (rec.has_old_nh.then_some(rec.old_nh), None)
            }
        };

        let qos_control = (rec.frame_control & CHECK_QOS == HAS_QOS).then_some(rec.qos_control);
        let addr4 = (rec.frame_control & HAS_ADDR4 == HAS_ADDR4).then_some(rec.addr4);

        PathEvent {
            ts_ns: rec.ts_ns,
            action: rec.action,
            mac: rec.mac,
            iface: rec.iface.to_string_lossy().into_owned(),
            dst: rec.dst,
            old_nh,
            new_nh,
            frame_control: rec.frame_control,
            seq_control: rec.seq_control,
            qos_control,
            addr1: rec.addr1,
            addr2: rec.addr2,
            addr3: rec.addr3,
            addr4,
        }
    }
}

impl fmt::Display for PathEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>12}ns] {:<10} iface={} dst={}",
            self.ts_ns, self.action, self.iface, self.dst,
        )?;
        if let Some(old) = &self.old_nh {
            write!(f, " old_nh={old}")?;
        }
        if let Some(new) = &self.new_nh {
            write!(f, " new_nh={new}")?;
        }
        Ok(())
    }
}

//! The per-context event draft: a mutable accumulator of fields that
//! become an [`EventRecord`] once a terminating probe classifies the
//! transaction.

use meshtrace_protocol::{Action, EventRecord, IfaceName, MacAddr};

/// Partially built event for one in-flight transaction.
///
/// Absent addresses stay zero-filled; `has_old_nh` carries the
/// explicit presence flag for the delete paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDraft {
    /// Nanoseconds since boot at the last opening/continuing probe.
    pub ts_ns: u64,
    /// Hardware address of the observing interface.
    pub mac: MacAddr,
    /// Name of the observing interface.
    pub iface: IfaceName,
    /// Destination the mesh path routes towards.
    pub dst: MacAddr,
    /// Previous next hop (change/delete paths).
    pub old_nh: MacAddr,
    /// Newly assigned next hop (assign paths).
    pub new_nh: MacAddr,
    /// Whether a next hop was bound before a delete.
    pub has_old_nh: bool,
}

impl EventDraft {
    /// Snapshot every draft field into a record carrying `action`.
    ///
    /// Frame fields stay zero; the transmit/receive handlers fill
    /// them from the parsed header afterwards.
    pub fn finish(&self, action: Action) -> EventRecord {
        let mut rec = EventRecord::zeroed(action);
        rec.ts_ns = self.ts_ns;
        rec.mac = self.mac;
        rec.iface = self.iface;
        rec.dst = self.dst;
        rec.old_nh = self.old_nh;
        rec.new_nh = self.new_nh;
        rec.has_old_nh = self.has_old_nh;
        rec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_copies_all_fields() {
        let draft = EventDraft {
            ts_ns: 42,
            mac: MacAddr([1; 6]),
            iface: IfaceName::new("mesh0"),
            dst: MacAddr([2; 6]),
            old_nh: MacAddr([3; 6]),
            new_nh: MacAddr([4; 6]),
            has_old_nh: true,
        };
        let rec = draft.finish(Action::UsChange);
        assert_eq!(rec.action, Action::UsChange);
        assert_eq!(rec.ts_ns, 42);
        assert_eq!(rec.mac, MacAddr([1; 6]));
        assert_eq!(rec.iface.to_string_lossy(), "mesh0");
        assert_eq!(rec.dst, MacAddr([2; 6]));
        assert_eq!(rec.old_nh, MacAddr([3; 6]));
        assert_eq!(rec.new_nh, MacAddr([4; 6]));
        assert!(rec.has_old_nh);
        assert_eq!(rec.frame_control, 0);
        assert!(rec.addr4.is_zero());
    }
}

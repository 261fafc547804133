//! The situation tag and its central transition table.
//!
//! A *situation* names the multi-step operation currently in flight
//! for one execution context.  Exactly one situation may be pending
//! per context; the transition table below is the single source of
//! truth for how each probe moves it, so the protocol can be tested
//! without any attachment mechanism.

use crate::probe::ProbeKind;
use std::fmt;

/// Which multi-step operation is in flight for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Situation {
    /// A path add completed; next hop not yet known.
    Add,
    /// A path add completed and a next hop was assigned in the same
    /// transaction.
    AddAssign,
    /// A next hop was bound to a path that had none.
    Assign,
    /// A path's existing next hop was replaced.
    Change,
    /// A path was deleted.
    Delete,
    /// An expiration sweep is running; deletions inside it are
    /// kernel-internal, not user-initiated.
    Expire,
}

impl Situation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddAssign => "add_assign",
            Self::Assign => "assign",
            Self::Change => "change",
            Self::Delete => "delete",
            Self::Expire => "expire",
        }
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The situation left pending for a context after a probe's handler
/// runs, given the situation that was pending before it.
///
/// `path_had_next_hop` matters only to [`ProbeKind::NexthopAssign`]:
/// it distinguishes a first-time assignment from a replacement.
/// `None` means the handler leaves no situation behind (it terminated
/// or abandoned the transaction).
///
/// The table is total and deterministic; handlers consult it instead
/// of encoding transitions at each probe site.
pub fn next_situation(
    current: Option<Situation>,
    probe: ProbeKind,
    path_had_next_hop: bool,
) -> Option<Situation> {
    match probe {
        // Opens a transaction, overwriting whatever was pending.
        ProbeKind::PathAddReturn => Some(Situation::Add),

        // The expire bracket owns the context for its whole duration.
        ProbeKind::ExpireEnter => Some(Situation::Expire),
        ProbeKind::ExpireReturn => None,

        // Too many call stacks to attribute; abandon the context.
        ProbeKind::PlinkDeactivate => None,

        ProbeKind::NexthopAssign => match current {
            // Augments the in-flight transaction (normally an add).
            Some(_) => Some(Situation::AddAssign),
            // Standalone (re)binding: change iff a hop was bound.
            None if path_had_next_hop => Some(Situation::Change),
            None => Some(Situation::Assign),
        },

        ProbeKind::PathDelReturn => match current {
            // Part of an expiration burst; the bracket stays pending.
            Some(Situation::Expire) => Some(Situation::Expire),
            // User-visible delete: fresh transaction, prior discarded.
            _ => Some(Situation::Delete),
        },

        // Terminating probes always clear the context.
        ProbeKind::FrameTransmit | ProbeKind::MgmtFrameReceive | ProbeKind::UserspaceReturn => {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeKind::*;

    const ALL: [Situation; 6] = [
        Situation::Add,
        Situation::AddAssign,
        Situation::Assign,
        Situation::Change,
        Situation::Delete,
        Situation::Expire,
    ];

    #[test]
    fn add_overwrites_anything() {
        for prior in ALL {
            assert_eq!(
                next_situation(Some(prior), PathAddReturn, false),
                Some(Situation::Add)
            );
        }
        assert_eq!(next_situation(None, PathAddReturn, true), Some(Situation::Add));
    }

    #[test]
    fn assign_augments_or_opens() {
        assert_eq!(
            next_situation(Some(Situation::Add), NexthopAssign, false),
            Some(Situation::AddAssign)
        );
        assert_eq!(
            next_situation(None, NexthopAssign, false),
            Some(Situation::Assign)
        );
        assert_eq!(
            next_situation(None, NexthopAssign, true),
            Some(Situation::Change)
        );
        // The had-next-hop flag is irrelevant once a draft exists.
        assert_eq!(
            next_situation(Some(Situation::Add), NexthopAssign, true),
            Some(Situation::AddAssign)
        );
    }

    #[test]
    fn delete_respects_expire_bracket() {
        assert_eq!(
            next_situation(Some(Situation::Expire), PathDelReturn, false),
            Some(Situation::Expire)
        );
        assert_eq!(
            next_situation(None, PathDelReturn, false),
            Some(Situation::Delete)
        );
        assert_eq!(
            next_situation(Some(Situation::Add), PathDelReturn, false),
            Some(Situation::Delete)
        );
    }

    #[test]
    fn terminators_always_clear() {
        for probe in [FrameTransmit, MgmtFrameReceive, UserspaceReturn, ExpireReturn, PlinkDeactivate] {
            for prior in ALL {
                assert_eq!(next_situation(Some(prior), probe, false), None);
            }
            assert_eq!(next_situation(None, probe, false), None);
        }
    }

    #[test]
    fn table_is_deterministic() {
        for probe in [
            PathAddReturn,
            NexthopAssign,
            PathDelReturn,
            ExpireEnter,
            ExpireReturn,
            FrameTransmit,
            MgmtFrameReceive,
            UserspaceReturn,
            PlinkDeactivate,
        ] {
            for current in std::iter::once(None).chain(ALL.map(Some)) {
                for flag in [false, true] {
                    let a = next_situation(current, probe, flag);
                    let b = next_situation(current, probe, flag);
                    assert_eq!(a, b);
                }
            }
        }
    }
}

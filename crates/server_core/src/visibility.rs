//! Legacy visibility lattice for dispatch checks.
//!
//! Order: NOT_VISIBLE < CASTER_UNKNOWN < TARGET_UNKNOWN < VISIBLE, with the
//! special join CASTER_UNKNOWN v TARGET_UNKNOWN = VISIBLE (knowing both
//! halves independently reveals the whole). `Defer` means "ask the next
//! level"; escalation runs team -> player -> entity.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Visibility {
    NotVisible,
    CasterUnknown,
    TargetUnknown,
    Visible,
}

/// One level's verdict: a decision, or a deferral to the next level down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Defer,
    Decided(Visibility),
}

/// Lattice join.
#[must_use]
pub fn join(a: Visibility, b: Visibility) -> Visibility {
    use Visibility::{CasterUnknown, TargetUnknown, Visible};
    match (a, b) {
        (CasterUnknown, TargetUnknown) | (TargetUnknown, CasterUnknown) => Visible,
        _ => a.max(b),
    }
}

/// Combine team -> player -> entity verdicts. Deferrals fall through;
/// decided levels combine by join. All-defer resolves to not visible.
#[must_use]
pub fn resolve(levels: &[Check]) -> Visibility {
    let mut out = None;
    for level in levels {
        if let Check::Decided(v) = level {
            out = Some(match out {
                Some(acc) => join(acc, *v),
                None => *v,
            });
        }
    }
    out.unwrap_or(Visibility::NotVisible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Visibility::*;

    #[test]
    fn unknown_halves_join_to_visible() {
        assert_eq!(join(CasterUnknown, TargetUnknown), Visible);
        assert_eq!(join(TargetUnknown, CasterUnknown), Visible);
    }

    #[test]
    fn otherwise_join_is_max() {
        assert_eq!(join(NotVisible, TargetUnknown), TargetUnknown);
        assert_eq!(join(CasterUnknown, CasterUnknown), CasterUnknown);
        assert_eq!(join(Visible, NotVisible), Visible);
    }

    #[test]
    fn defer_falls_through_to_lower_levels() {
        assert_eq!(
            resolve(&[Check::Defer, Check::Decided(TargetUnknown), Check::Defer]),
            TargetUnknown
        );
        assert_eq!(
            resolve(&[
                Check::Decided(CasterUnknown),
                Check::Defer,
                Check::Decided(TargetUnknown)
            ]),
            Visible
        );
        assert_eq!(resolve(&[Check::Defer, Check::Defer]), NotVisible);
        assert_eq!(resolve(&[]), NotVisible);
    }
}

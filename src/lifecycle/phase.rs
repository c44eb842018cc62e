//! Run phases and the transitions allowed between them.

use std::fmt;

/// Phase of one run
///
/// ```text
/// Uninitialized -> Provisioning -> Ready -> Executing -> TearingDown -> Done
///                       |                       |            ^
///                       +-----------------------+------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuitePhase {
    Uninitialized,
    Provisioning,
    Ready,
    Executing,
    TearingDown,
    Done,
}

impl SuitePhase {
    /// Whether `self -> next` is a legal step
    ///
    /// Once provisioning has begun there is no path to `Done` that skips
    /// `TearingDown`.
    pub fn can_transition_to(self, next: SuitePhase) -> bool {
        use SuitePhase::{Done, Executing, Provisioning, Ready, TearingDown, Uninitialized};
        matches!(
            (self, next),
            (Uninitialized, Provisioning)
                | (Provisioning, Ready | TearingDown)
                | (Ready, Executing)
                | (Executing, TearingDown)
                | (TearingDown, Done)
        )
    }

    /// Whether remote resources may exist and teardown is owed
    pub fn requires_teardown(self) -> bool {
        matches!(
            self,
            SuitePhase::Provisioning | SuitePhase::Ready | SuitePhase::Executing
        )
    }
}

impl fmt::Display for SuitePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuitePhase::Uninitialized => "Uninitialized",
            SuitePhase::Provisioning => "Provisioning",
            SuitePhase::Ready => "Ready",
            SuitePhase::Executing => "Executing",
            SuitePhase::TearingDown => "TearingDown",
            SuitePhase::Done => "Done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::SuitePhase::*;
    use super::*;

    const ALL: [SuitePhase; 6] = [
        Uninitialized,
        Provisioning,
        Ready,
        Executing,
        TearingDown,
        Done,
    ];

    #[test]
    fn test_happy_path_is_legal() {
        let path = [Uninitialized, Provisioning, Ready, Executing, TearingDown, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failure_shortcuts_go_through_teardown() {
        assert!(Provisioning.can_transition_to(TearingDown));
        assert!(Executing.can_transition_to(TearingDown));
    }

    #[test]
    fn test_teardown_cannot_be_skipped() {
        for from in [Provisioning, Ready, Executing] {
            assert!(!from.can_transition_to(Done), "{from} -> Done");
        }
    }

    #[test]
    fn test_only_listed_transitions_are_legal() {
        let legal = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .count();
        assert_eq!(legal, 6);
    }

    #[test]
    fn test_requires_teardown() {
        assert!(!Uninitialized.requires_teardown());
        assert!(Provisioning.requires_teardown());
        assert!(Executing.requires_teardown());
        assert!(!TearingDown.requires_teardown());
        assert!(!Done.requires_teardown());
    }
}

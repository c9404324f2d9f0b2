/// Per-object lifecycle inside one trial.
///
/// `Pending → ActiveVisible → ActiveHidden → Inactive`, or
/// `Pending → ActiveVisible → Inactive` for objects that never hide.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum ObjectPhase {
    #[default]
    Pending,
    ActiveVisible,
    ActiveHidden,
    Inactive,
}

impl ObjectPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::ActiveVisible | Self::ActiveHidden)
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Pending | Self::ActiveVisible)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Inactive)
    }

    /// The phase reached by hiding, if hiding is legal from here.
    pub fn hidden(&self) -> Option<Self> {
        match self {
            Self::ActiveVisible => Some(Self::ActiveHidden),
            _ => None,
        }
    }
}

/// Coordinator-level state: `Idle → TrialActive → Idle → … → ExperimentComplete`.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum CoordinatorPhase {
    #[default]
    Idle,
    TrialActive,
    ExperimentComplete,
}

impl CoordinatorPhase {
    pub fn allows_trial_start(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::TrialActive)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::ExperimentComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_visible_active_objects_can_hide() {
        assert_eq!(
            ObjectPhase::ActiveVisible.hidden(),
            Some(ObjectPhase::ActiveHidden)
        );
        assert_eq!(ObjectPhase::Pending.hidden(), None);
        assert_eq!(ObjectPhase::ActiveHidden.hidden(), None);
        assert_eq!(ObjectPhase::Inactive.hidden(), None);
    }

    #[test]
    fn active_and_visible_flags() {
        assert!(!ObjectPhase::Pending.is_active());
        assert!(ObjectPhase::ActiveHidden.is_active());
        assert!(!ObjectPhase::ActiveHidden.is_visible());
        assert!(ObjectPhase::Inactive.is_terminal());
        assert!(CoordinatorPhase::default().allows_trial_start());
    }
}

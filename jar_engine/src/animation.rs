/// Animation bookkeeping for one actor, from this controller's point of view.
/// Triggers fired by other parties are not tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorState {
    active_animation: Option<String>,
}

impl ActorState {
    pub fn active_animation(&self) -> Option<&str> {
        self.active_animation.as_deref()
    }

    /// Overwrite the tracked animation after a transition was only partly
    /// applied.
    pub fn reset(&mut self, active: Option<String>) {
        self.active_animation = active;
    }
}

/// Trigger changes needed to reach a requested animation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationDiff {
    pub to_stop: Option<String>,
    pub to_start: Option<String>,
}

impl AnimationDiff {
    pub fn is_empty(&self) -> bool {
        self.to_stop.is_none() && self.to_start.is_none()
    }
}

/// Compute the stop/start pair for `requested` and record it as active.
///
/// Re-requesting the active animation yields an empty diff so redundant
/// descriptors never interrupt a running trigger.
pub fn transition(state: &mut ActorState, requested: &str) -> AnimationDiff {
    let diff = if state.active_animation.as_deref() == Some(requested) {
        AnimationDiff::default()
    } else {
        AnimationDiff {
            to_stop: state.active_animation.take(),
            to_start: Some(requested.to_string()),
        }
    };
    state.active_animation = Some(requested.to_string());
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_only_starts() {
        let mut state = ActorState::default();
        let diff = transition(&mut state, "Walk");
        assert_eq!(
            diff,
            AnimationDiff {
                to_stop: None,
                to_start: Some("Walk".to_string()),
            }
        );
        assert_eq!(state.active_animation(), Some("Walk"));
    }

    #[test]
    fn switching_stops_previous_trigger() {
        let mut state = ActorState::default();
        transition(&mut state, "Walk");
        let diff = transition(&mut state, "Run");
        assert_eq!(diff.to_stop.as_deref(), Some("Walk"));
        assert_eq!(diff.to_start.as_deref(), Some("Run"));
        assert_eq!(state.active_animation(), Some("Run"));
    }

    #[test]
    fn repeated_request_is_a_no_op() {
        let mut state = ActorState::default();
        transition(&mut state, "Idle");
        let diff = transition(&mut state, "Idle");
        assert!(diff.is_empty());
        assert_eq!(state.active_animation(), Some("Idle"));
    }

    #[test]
    fn reset_makes_next_request_start_again() {
        let mut state = ActorState::default();
        transition(&mut state, "Walk");
        state.reset(None);
        let diff = transition(&mut state, "Walk");
        assert_eq!(diff.to_start.as_deref(), Some("Walk"));
        assert_eq!(diff.to_stop, None);
    }

    #[test]
    fn names_compare_exactly() {
        let mut state = ActorState::default();
        transition(&mut state, "walk");
        let diff = transition(&mut state, "Walk");
        assert_eq!(diff.to_stop.as_deref(), Some("walk"));
    }
}

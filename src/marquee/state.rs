use crate::marquee::input::GlobalListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Ready,
    LoadFailed,
    Submitting,
    Cancelling,
    Closed,
}

impl SessionPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Submitting | Self::Cancelling)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

pub fn can_transition(from: SessionPhase, to: SessionPhase) -> bool {
    matches!(
        (from, to),
        (SessionPhase::Loading, SessionPhase::Ready)
            | (SessionPhase::Loading, SessionPhase::LoadFailed)
            | (SessionPhase::Loading, SessionPhase::Cancelling)
            | (SessionPhase::LoadFailed, SessionPhase::Cancelling)
            | (SessionPhase::Ready, SessionPhase::Submitting)
            | (SessionPhase::Ready, SessionPhase::Cancelling)
            | (SessionPhase::Submitting, SessionPhase::Ready)
            | (SessionPhase::Submitting, SessionPhase::Closed)
            | (SessionPhase::Cancelling, SessionPhase::Closed)
    ) || (to == SessionPhase::Closed && from != SessionPhase::Closed)
}

/// Window-level listeners currently attached for one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerSet {
    key_down: bool,
    pointer_move: bool,
    pointer_up: bool,
}

impl ListenerSet {
    fn slot(&mut self, listener: GlobalListener) -> &mut bool {
        match listener {
            GlobalListener::KeyDown => &mut self.key_down,
            GlobalListener::PointerMove => &mut self.pointer_move,
            GlobalListener::PointerUp => &mut self.pointer_up,
        }
    }

    pub fn attach(&mut self, listener: GlobalListener) {
        *self.slot(listener) = true;
    }

    pub fn detach(&mut self, listener: GlobalListener) {
        *self.slot(listener) = false;
    }

    pub fn contains(&self, listener: GlobalListener) -> bool {
        match listener {
            GlobalListener::KeyDown => self.key_down,
            GlobalListener::PointerMove => self.pointer_move,
            GlobalListener::PointerUp => self.pointer_up,
        }
    }

    pub fn detach_all(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        [self.key_down, self.pointer_move, self.pointer_up]
            .iter()
            .filter(|attached| **attached)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_sessions_never_reopen() {
        for to in [
            SessionPhase::Loading,
            SessionPhase::Ready,
            SessionPhase::Submitting,
            SessionPhase::Cancelling,
        ] {
            assert!(!can_transition(SessionPhase::Closed, to));
        }
    }

    #[test]
    fn submit_requires_a_loaded_image() {
        assert!(!can_transition(SessionPhase::Loading, SessionPhase::Submitting));
        assert!(!can_transition(SessionPhase::LoadFailed, SessionPhase::Submitting));
        assert!(can_transition(SessionPhase::Ready, SessionPhase::Submitting));
        assert!(can_transition(SessionPhase::Submitting, SessionPhase::Ready));
    }

    #[test]
    fn listener_set_tracks_attachments() {
        let mut set = ListenerSet::default();
        set.attach(GlobalListener::KeyDown);
        set.attach(GlobalListener::PointerUp);
        set.attach(GlobalListener::PointerUp);
        assert_eq!(set.len(), 2);
        set.detach(GlobalListener::PointerUp);
        assert!(!set.contains(GlobalListener::PointerUp));
        set.detach_all();
        assert!(set.is_empty());
    }
}

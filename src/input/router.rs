use std::collections::BTreeMap;

use tracing::trace;

use crate::events::{ContactEvent, ContactId};
use crate::geometry::Point;

/// What the active controller should do in response to one contact event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteAction {
    CaptureDown(Point),
    CaptureMove(Point),
    CaptureUp,
    /// Second contact arrived: stop capturing and start the resize gesture.
    GestureBegin(Point, Point),
    GestureUpdate(Point, Point),
    GestureEnd,
    /// Every contact was interrupted; stop everything and forget cached layout.
    CancelAll,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Single(ContactId),
    Gesture(ContactId, ContactId),
    /// A gesture ended with contacts still down; wait until all lift.
    Drained,
}

/// Dispatches contact events to exactly one controller based on how many
/// contacts are down.
#[derive(Debug)]
pub struct InputRouter {
    contacts: BTreeMap<ContactId, Point>,
    mode: Mode,
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            contacts: BTreeMap::new(),
            mode: Mode::Idle,
        }
    }

    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    pub fn route(&mut self, event: ContactEvent) -> RouteAction {
        let action = match event {
            ContactEvent::Down { id, point } => self.on_down(id, point),
            ContactEvent::Move { id, point } => self.on_move(id, point),
            ContactEvent::Up { id } => self.on_up(id),
            ContactEvent::Cancel => {
                self.contacts.clear();
                self.mode = Mode::Idle;
                RouteAction::CancelAll
            }
        };
        trace!(?event, ?action, contacts = self.contacts.len(), "routed contact");
        action
    }

    fn on_down(&mut self, id: ContactId, point: Point) -> RouteAction {
        self.contacts.insert(id, point);
        match (self.mode, self.contacts.len()) {
            (Mode::Idle, 1) => {
                self.mode = Mode::Single(id);
                RouteAction::CaptureDown(point)
            }
            (Mode::Idle | Mode::Single(_) | Mode::Drained, 2) => {
                self.pair_first_two(RouteAction::GestureBegin)
            }
            _ => RouteAction::Ignore,
        }
    }

    fn on_move(&mut self, id: ContactId, point: Point) -> RouteAction {
        let Some(slot) = self.contacts.get_mut(&id) else {
            return RouteAction::Ignore;
        };
        *slot = point;
        match self.mode {
            Mode::Single(active) if active == id => RouteAction::CaptureMove(point),
            Mode::Gesture(a, b) if a == id || b == id => self.gesture_points(a, b),
            _ => RouteAction::Ignore,
        }
    }

    fn on_up(&mut self, id: ContactId) -> RouteAction {
        if self.contacts.remove(&id).is_none() {
            return RouteAction::Ignore;
        }
        let action = match self.mode {
            Mode::Single(active) if active == id => {
                self.mode = Mode::Idle;
                RouteAction::CaptureUp
            }
            Mode::Gesture(a, b) if a == id || b == id => {
                if self.contacts.len() >= 2 {
                    self.pair_first_two(RouteAction::GestureUpdate)
                } else {
                    self.mode = Mode::Drained;
                    RouteAction::GestureEnd
                }
            }
            _ => RouteAction::Ignore,
        };
        if self.contacts.is_empty() {
            self.mode = Mode::Idle;
        }
        action
    }

    fn pair_first_two(&mut self, make: fn(Point, Point) -> RouteAction) -> RouteAction {
        let mut ids = self.contacts.keys().copied();
        match (ids.next(), ids.next()) {
            (Some(a), Some(b)) => {
                self.mode = Mode::Gesture(a, b);
                let (p1, p2) = (self.contacts[&a], self.contacts[&b]);
                make(p1, p2)
            }
            _ => RouteAction::Ignore,
        }
    }

    fn gesture_points(&self, a: ContactId, b: ContactId) -> RouteAction {
        match (self.contacts.get(&a), self.contacts.get(&b)) {
            (Some(&p1), Some(&p2)) => RouteAction::GestureUpdate(p1, p2),
            _ => RouteAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(id: ContactId, x: f32, y: f32) -> ContactEvent {
        ContactEvent::Down {
            id,
            point: Point::new(x, y),
        }
    }

    fn mv(id: ContactId, x: f32, y: f32) -> ContactEvent {
        ContactEvent::Move {
            id,
            point: Point::new(x, y),
        }
    }

    #[test]
    fn single_contact_drives_capture() {
        let mut r = InputRouter::new();
        assert_eq!(r.route(down(1, 1.0, 2.0)), RouteAction::CaptureDown(Point::new(1.0, 2.0)));
        assert_eq!(r.route(mv(1, 3.0, 4.0)), RouteAction::CaptureMove(Point::new(3.0, 4.0)));
        assert_eq!(r.route(ContactEvent::Up { id: 1 }), RouteAction::CaptureUp);
        assert_eq!(r.active_contacts(), 0);
    }

    #[test]
    fn second_contact_hands_over_to_gesture() {
        let mut r = InputRouter::new();
        r.route(down(1, 0.0, 0.0));
        assert_eq!(
            r.route(down(2, 10.0, 10.0)),
            RouteAction::GestureBegin(Point::new(0.0, 0.0), Point::new(10.0, 10.0))
        );
        assert_eq!(
            r.route(mv(1, 5.0, 0.0)),
            RouteAction::GestureUpdate(Point::new(5.0, 0.0), Point::new(10.0, 10.0))
        );
        assert_eq!(r.route(ContactEvent::Up { id: 2 }), RouteAction::GestureEnd);
        // The remaining finger does not start capturing.
        assert_eq!(r.route(mv(1, 6.0, 0.0)), RouteAction::Ignore);
        assert_eq!(r.route(ContactEvent::Up { id: 1 }), RouteAction::Ignore);
        assert_eq!(r.route(down(3, 1.0, 1.0)), RouteAction::CaptureDown(Point::new(1.0, 1.0)));
    }

    #[test]
    fn new_second_finger_after_gesture_starts_another() {
        let mut r = InputRouter::new();
        r.route(down(1, 0.0, 0.0));
        r.route(down(2, 10.0, 10.0));
        assert_eq!(r.route(ContactEvent::Up { id: 2 }), RouteAction::GestureEnd);
        assert_eq!(
            r.route(down(3, 30.0, 40.0)),
            RouteAction::GestureBegin(Point::new(0.0, 0.0), Point::new(30.0, 40.0))
        );
        assert_eq!(
            r.route(mv(3, 35.0, 40.0)),
            RouteAction::GestureUpdate(Point::new(0.0, 0.0), Point::new(35.0, 40.0))
        );
        assert_eq!(r.route(ContactEvent::Up { id: 1 }), RouteAction::GestureEnd);
    }

    #[test]
    fn third_contact_is_ignored_and_can_replace_a_lifted_one() {
        let mut r = InputRouter::new();
        r.route(down(1, 0.0, 0.0));
        r.route(down(2, 10.0, 0.0));
        assert_eq!(r.route(down(3, 20.0, 0.0)), RouteAction::Ignore);
        assert_eq!(
            r.route(ContactEvent::Up { id: 1 }),
            RouteAction::GestureUpdate(Point::new(10.0, 0.0), Point::new(20.0, 0.0))
        );
        assert_eq!(r.route(ContactEvent::Up { id: 3 }), RouteAction::GestureEnd);
    }

    #[test]
    fn cancel_resets_everything() {
        let mut r = InputRouter::new();
        r.route(down(1, 0.0, 0.0));
        r.route(down(2, 1.0, 1.0));
        assert_eq!(r.route(ContactEvent::Cancel), RouteAction::CancelAll);
        assert_eq!(r.active_contacts(), 0);
        assert_eq!(r.route(mv(1, 2.0, 2.0)), RouteAction::Ignore);
        assert_eq!(r.route(down(4, 0.0, 0.0)), RouteAction::CaptureDown(Point::new(0.0, 0.0)));
    }

    #[test]
    fn unknown_contacts_are_ignored() {
        let mut r = InputRouter::new();
        assert_eq!(r.route(mv(9, 0.0, 0.0)), RouteAction::Ignore);
        assert_eq!(r.route(ContactEvent::Up { id: 9 }), RouteAction::Ignore);
    }
}

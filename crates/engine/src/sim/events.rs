use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::actor::ActorId;
use super::geometry::GridPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionTarget {
    Actor(ActorId),
    Tile(GridPoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    Collision {
        actor: ActorId,
        with: CollisionTarget,
    },
    PathStarted {
        actor: ActorId,
        waypoints: usize,
    },
    PathStopped {
        actor: ActorId,
    },
    PathFinished {
        actor: ActorId,
    },
    ZeroHealth {
        actor: ActorId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimEventKind {
    Collision,
    PathStarted,
    PathStopped,
    PathFinished,
    ZeroHealth,
}

impl SimEvent {
    pub fn kind(&self) -> SimEventKind {
        match self {
            Self::Collision { .. } => SimEventKind::Collision,
            Self::PathStarted { .. } => SimEventKind::PathStarted,
            Self::PathStopped { .. } => SimEventKind::PathStopped,
            Self::PathFinished { .. } => SimEventKind::PathFinished,
            Self::ZeroHealth { .. } => SimEventKind::ZeroHealth,
        }
    }

    pub fn actor(&self) -> ActorId {
        match *self {
            Self::Collision { actor, .. }
            | Self::PathStarted { actor, .. }
            | Self::PathStopped { actor }
            | Self::PathFinished { actor }
            | Self::ZeroHealth { actor } => actor,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimEventCounts {
    pub total: u32,
    pub collision: u32,
    pub path_started: u32,
    pub path_stopped: u32,
    pub path_finished: u32,
    pub zero_health: u32,
}

impl SimEventCounts {
    fn record(&mut self, kind: SimEventKind) {
        self.total = self.total.saturating_add(1);
        let slot = match kind {
            SimEventKind::Collision => &mut self.collision,
            SimEventKind::PathStarted => &mut self.path_started,
            SimEventKind::PathStopped => &mut self.path_stopped,
            SimEventKind::PathFinished => &mut self.path_finished,
            SimEventKind::ZeroHealth => &mut self.zero_health,
        };
        *slot = slot.saturating_add(1);
    }
}

type Handler = Box<dyn FnMut(&SimEvent)>;

struct Subscriber {
    id: u64,
    filter: Option<SimEventKind>,
    handler: Handler,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    active: Vec<Subscriber>,
    dispatching: bool,
    closed_during_dispatch: Vec<u64>,
}

impl Subscribers {
    fn remove(&mut self, id: u64) {
        self.active.retain(|subscriber| subscriber.id != id);
        if self.dispatching {
            self.closed_during_dispatch.push(id);
        }
    }
}

/// Notification bus. Events are buffered while a tick runs and delivered
/// once the tick has completed, so handlers always observe settled state.
#[derive(Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Subscribers>>,
    current_tick_events: Vec<SimEvent>,
    last_tick_counts: SimEventCounts,
}

/// Handle returned by [`EventBus::subscribe`]. The handler stays registered
/// until the handle is closed or dropped.
#[must_use = "dropping a subscription unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<Subscribers>>,
}

impl Subscription {
    pub fn close(self) {}

    fn release(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().remove(self.id);
        }
        self.bus = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl EventBus {
    pub fn subscribe(&self, handler: impl FnMut(&SimEvent) + 'static) -> Subscription {
        self.register(None, Box::new(handler))
    }

    pub fn subscribe_kind(
        &self,
        kind: SimEventKind,
        handler: impl FnMut(&SimEvent) + 'static,
    ) -> Subscription {
        self.register(Some(kind), Box::new(handler))
    }

    fn register(&self, filter: Option<SimEventKind>, handler: Handler) -> Subscription {
        let mut subscribers = self.subscribers.borrow_mut();
        let id = subscribers.next_id;
        subscribers.next_id = subscribers.next_id.saturating_add(1);
        subscribers.active.push(Subscriber {
            id,
            filter,
            handler,
        });
        Subscription {
            id,
            bus: Rc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().active.len()
    }

    pub fn emit(&mut self, event: SimEvent) {
        trace!(?event, "sim_event_queued");
        self.current_tick_events.push(event);
    }

    pub fn pending(&self) -> &[SimEvent] {
        &self.current_tick_events
    }

    pub fn last_tick_counts(&self) -> SimEventCounts {
        self.last_tick_counts
    }

    /// Delivers every buffered event in emission order, then clears the
    /// buffer. Handlers may subscribe or close subscriptions while running;
    /// new handlers first see the next batch.
    pub fn dispatch(&mut self) {
        let events = std::mem::take(&mut self.current_tick_events);
        let mut counts = SimEventCounts::default();
        for event in &events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        if events.is_empty() {
            return;
        }

        let mut running = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.dispatching = true;
            std::mem::take(&mut subscribers.active)
        };

        for event in &events {
            for subscriber in running.iter_mut() {
                if self.is_closed_mid_dispatch(subscriber.id) {
                    continue;
                }
                if subscriber
                    .filter
                    .is_some_and(|kind| kind != event.kind())
                {
                    continue;
                }
                (subscriber.handler)(event);
            }
        }

        let mut subscribers = self.subscribers.borrow_mut();
        let closed = std::mem::take(&mut subscribers.closed_during_dispatch);
        running.retain(|subscriber| !closed.contains(&subscriber.id));
        let added = std::mem::replace(&mut subscribers.active, running);
        subscribers.active.extend(added);
        subscribers.dispatching = false;
    }

    fn is_closed_mid_dispatch(&self, id: u64) -> bool {
        self.subscribers
            .borrow()
            .closed_during_dispatch
            .contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<SimEvent>>>, impl FnMut(&SimEvent) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |event: &SimEvent| sink.borrow_mut().push(*event))
    }

    #[test]
    fn events_are_held_until_dispatch() {
        let mut bus = EventBus::default();
        let (seen, handler) = recorder();
        let _subscription = bus.subscribe(handler);

        bus.emit(SimEvent::PathStarted {
            actor: ActorId(1),
            waypoints: 3,
        });
        bus.emit(SimEvent::ZeroHealth { actor: ActorId(2) });
        assert!(seen.borrow().is_empty());
        assert_eq!(bus.pending().len(), 2);

        bus.dispatch();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1], SimEvent::ZeroHealth { actor: ActorId(2) });
        assert!(bus.pending().is_empty());
        let counts = bus.last_tick_counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.path_started, 1);
        assert_eq!(counts.zero_health, 1);
    }

    #[test]
    fn kind_filter_skips_other_events() {
        let mut bus = EventBus::default();
        let (seen, handler) = recorder();
        let _subscription = bus.subscribe_kind(SimEventKind::PathFinished, handler);
        bus.emit(SimEvent::PathStopped { actor: ActorId(1) });
        bus.emit(SimEvent::PathFinished { actor: ActorId(1) });
        bus.dispatch();
        assert_eq!(*seen.borrow(), vec![SimEvent::PathFinished { actor: ActorId(1) }]);
    }

    #[test]
    fn dropping_or_closing_a_subscription_unsubscribes() {
        let mut bus = EventBus::default();
        let (seen, handler) = recorder();
        let subscription = bus.subscribe(handler);
        let (other_seen, other_handler) = recorder();
        {
            let _scoped = bus.subscribe(other_handler);
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 1);

        subscription.close();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(SimEvent::PathStopped { actor: ActorId(4) });
        bus.dispatch();
        assert!(seen.borrow().is_empty());
        assert!(other_seen.borrow().is_empty());
    }

    #[test]
    fn handler_can_close_another_subscription_mid_dispatch() {
        let mut bus = EventBus::default();
        let (seen, handler) = recorder();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&victim);
        let _closer = bus.subscribe(move |_event: &SimEvent| {
            if let Some(subscription) = slot.borrow_mut().take() {
                subscription.close();
            }
        });
        *victim.borrow_mut() = Some(bus.subscribe(handler));

        bus.emit(SimEvent::PathStopped { actor: ActorId(1) });
        bus.dispatch();
        assert!(seen.borrow().is_empty());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn dispatch_without_subscribers_still_rolls_counts() {
        let mut bus = EventBus::default();
        bus.emit(SimEvent::Collision {
            actor: ActorId(1),
            with: CollisionTarget::Tile(GridPoint::new(2, 2)),
        });
        bus.dispatch();
        assert_eq!(bus.last_tick_counts().collision, 1);
        bus.dispatch();
        assert_eq!(bus.last_tick_counts(), SimEventCounts::default());
    }
}

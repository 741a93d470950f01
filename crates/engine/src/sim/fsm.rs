//! Hierarchical state machine.
//!
//! States live in an arena owned by [`Fsm`]. Each state is either atomic or
//! composite; a composite owns children, one of which is active. Transitions
//! hang off non-root states and are keyed by an event value. A single pending
//! event slot drives them: `update` walks root to leaf and the first active
//! state with a matching transition consumes the event.

use std::fmt::Debug;

use thiserror::Error;
use tracing::debug;

/// Callbacks for one state. `execute` may produce an event; it lands in the
/// machine's pending slot, replacing whatever was there.
pub trait StateBehavior<C, E> {
    fn enter(&mut self, _ctx: &mut C) {}
    fn execute(&mut self, ctx: &mut C) -> Option<E>;
    fn leave(&mut self, _ctx: &mut C) {}
}

/// Behavior for structural states that only group children.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopState;

impl<C, E> StateBehavior<C, E> for NoopState {
    fn execute(&mut self, _ctx: &mut C) -> Option<E> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    pub const ROOT: StateId = StateId(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateKind {
    Atomic,
    Composite {
        children: Vec<StateId>,
        active: Option<StateId>,
        default: Option<StateId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition<E> {
    pub event: E,
    pub target: StateId,
}

struct StateNode<C, E> {
    name: String,
    parent: Option<StateId>,
    kind: StateKind,
    transitions: Vec<Transition<E>>,
    behavior: Box<dyn StateBehavior<C, E>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmBuildError {
    #[error("unknown state id {0:?}")]
    UnknownState(StateId),
    #[error("state `{0}` is atomic and cannot own children")]
    NotComposite(String),
    #[error("composite state `{0}` has no children")]
    EmptyComposite(String),
    #[error("default `{child}` is not a child of `{parent}`")]
    DefaultNotChild { parent: String, child: String },
    #[error("the root state cannot own transitions")]
    RootTransition,
    #[error("transition from `{from}` targets `{to}`, which is not a sibling")]
    TargetNotSibling { from: String, to: String },
    #[error("state `{state}` declares event {event} more than once")]
    DuplicateEvent { state: String, event: String },
}

pub struct FsmBuilder<C, E> {
    nodes: Vec<StateNode<C, E>>,
}

impl<C, E> FsmBuilder<C, E>
where
    E: Copy + PartialEq + Debug,
{
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_root_behavior(root_name, NoopState)
    }

    pub fn with_root_behavior(
        root_name: impl Into<String>,
        behavior: impl StateBehavior<C, E> + 'static,
    ) -> Self {
        Self {
            nodes: vec![StateNode {
                name: root_name.into(),
                parent: None,
                kind: empty_composite(),
                transitions: Vec::new(),
                behavior: Box::new(behavior),
            }],
        }
    }

    pub fn root(&self) -> StateId {
        StateId::ROOT
    }

    pub fn add_atomic(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
        behavior: impl StateBehavior<C, E> + 'static,
    ) -> Result<StateId, FsmBuildError> {
        self.add_node(parent, name.into(), StateKind::Atomic, Box::new(behavior))
    }

    pub fn add_composite(
        &mut self,
        parent: StateId,
        name: impl Into<String>,
        behavior: impl StateBehavior<C, E> + 'static,
    ) -> Result<StateId, FsmBuildError> {
        self.add_node(parent, name.into(), empty_composite(), Box::new(behavior))
    }

    fn add_node(
        &mut self,
        parent: StateId,
        name: String,
        kind: StateKind,
        behavior: Box<dyn StateBehavior<C, E>>,
    ) -> Result<StateId, FsmBuildError> {
        let id = StateId(self.nodes.len());
        let parent_node = self
            .nodes
            .get_mut(parent.0)
            .ok_or(FsmBuildError::UnknownState(parent))?;
        match &mut parent_node.kind {
            StateKind::Composite { children, .. } => children.push(id),
            StateKind::Atomic => return Err(FsmBuildError::NotComposite(parent_node.name.clone())),
        }
        self.nodes.push(StateNode {
            name,
            parent: Some(parent),
            kind,
            transitions: Vec::new(),
            behavior,
        });
        Ok(id)
    }

    /// Child entered when `composite` becomes active. Without one the first
    /// child is used.
    pub fn set_default(&mut self, composite: StateId, child: StateId) -> Result<(), FsmBuildError> {
        self.ensure_known(child)?;
        let node = self
            .nodes
            .get_mut(composite.0)
            .ok_or(FsmBuildError::UnknownState(composite))?;
        match &mut node.kind {
            StateKind::Composite { default, .. } => {
                *default = Some(child);
                Ok(())
            }
            StateKind::Atomic => Err(FsmBuildError::NotComposite(node.name.clone())),
        }
    }

    pub fn add_transition(
        &mut self,
        from: StateId,
        event: E,
        target: StateId,
    ) -> Result<(), FsmBuildError> {
        self.ensure_known(target)?;
        let node = self
            .nodes
            .get_mut(from.0)
            .ok_or(FsmBuildError::UnknownState(from))?;
        node.transitions.push(Transition { event, target });
        Ok(())
    }

    fn ensure_known(&self, id: StateId) -> Result<(), FsmBuildError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(FsmBuildError::UnknownState(id))
        }
    }

    pub fn build(mut self) -> Result<Fsm<C, E>, FsmBuildError> {
        for index in 0..self.nodes.len() {
            self.validate_node(StateId(index))?;
        }
        Ok(Fsm {
            nodes: self.nodes,
            pending: None,
            started: false,
        })
    }

    fn validate_node(&mut self, id: StateId) -> Result<(), FsmBuildError> {
        let names: Vec<String> = self.nodes.iter().map(|node| node.name.clone()).collect();
        let parents: Vec<Option<StateId>> = self.nodes.iter().map(|node| node.parent).collect();
        let node = &mut self.nodes[id.0];

        if let StateKind::Composite {
            children, default, ..
        } = &mut node.kind
        {
            let Some(first) = children.first().copied() else {
                return Err(FsmBuildError::EmptyComposite(node.name.clone()));
            };
            match *default {
                Some(child) if !children.contains(&child) => {
                    return Err(FsmBuildError::DefaultNotChild {
                        parent: node.name.clone(),
                        child: names[child.0].clone(),
                    });
                }
                Some(_) => {}
                None => *default = Some(first),
            }
        }

        if node.transitions.is_empty() {
            return Ok(());
        }
        if node.parent.is_none() {
            return Err(FsmBuildError::RootTransition);
        }
        for (index, transition) in node.transitions.iter().enumerate() {
            if parents[transition.target.0] != node.parent || transition.target == id {
                return Err(FsmBuildError::TargetNotSibling {
                    from: node.name.clone(),
                    to: names[transition.target.0].clone(),
                });
            }
            if node.transitions[..index]
                .iter()
                .any(|earlier| earlier.event == transition.event)
            {
                return Err(FsmBuildError::DuplicateEvent {
                    state: node.name.clone(),
                    event: format!("{:?}", transition.event),
                });
            }
        }
        Ok(())
    }
}

fn empty_composite() -> StateKind {
    StateKind::Composite {
        children: Vec::new(),
        active: None,
        default: None,
    }
}

pub struct Fsm<C, E> {
    nodes: Vec<StateNode<C, E>>,
    pending: Option<E>,
    started: bool,
}

impl<C, E> Fsm<C, E>
where
    E: Copy + PartialEq + Debug,
{
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Enters the root and arms default children all the way down. Further
    /// calls are no-ops.
    pub fn start(&mut self, ctx: &mut C) {
        if self.started {
            return;
        }
        self.started = true;
        self.enter_and_arm(StateId::ROOT, ctx);
    }

    /// One tick of the machine. Starts it first if needed.
    pub fn update(&mut self, ctx: &mut C) {
        if !self.started {
            self.start(ctx);
        }
        self.update_composite(StateId::ROOT, ctx);
    }

    pub fn pending_event(&self) -> Option<E> {
        self.pending
    }

    /// Writes the pending slot. The slot holds one event; a live event that
    /// was never consumed is replaced.
    pub fn set_event(&mut self, event: E) {
        if let Some(previous) = self.pending {
            if previous != event {
                debug!(previous = ?previous, next = ?event, "fsm_event_overwritten");
            }
        }
        self.pending = Some(event);
    }

    pub fn clear_event(&mut self) {
        self.pending = None;
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(StateId)
    }

    pub fn name(&self, id: StateId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.name.as_str())
    }

    pub fn kind(&self, id: StateId) -> Option<&StateKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn active_child(&self, id: StateId) -> Option<StateId> {
        match self.nodes.get(id.0).map(|node| &node.kind) {
            Some(StateKind::Composite { active, .. }) => *active,
            _ => None,
        }
    }

    /// Names of the active states from the root down to the active leaf.
    pub fn active_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut cursor = Some(StateId::ROOT);
        while let Some(id) = cursor {
            let Some(node) = self.nodes.get(id.0) else {
                break;
            };
            path.push(node.name.as_str());
            cursor = self.active_child(id);
        }
        path
    }

    pub fn is_active(&self, id: StateId) -> bool {
        let mut cursor = Some(StateId::ROOT);
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            cursor = self.active_child(current);
        }
        false
    }

    fn update_composite(&mut self, id: StateId, ctx: &mut C) {
        let Some(active) = self.active_child(id) else {
            return;
        };

        if let Some(target) = self.matching_transition(active) {
            self.pending = None;
            self.leave_recursive(active, ctx);
            self.set_active(id, target);
            self.enter_and_arm(target, ctx);
            if let Some(event) = self.nodes[target.0].behavior.execute(ctx) {
                self.set_event(event);
            }
            self.update_composite(target, ctx);
            return;
        }

        // Re-raising the event already pending does not stop the descent.
        let before = self.pending;
        if let Some(event) = self.nodes[active.0].behavior.execute(ctx) {
            self.set_event(event);
        }
        if self.pending == before {
            self.update_composite(active, ctx);
        }
    }

    fn matching_transition(&self, state: StateId) -> Option<StateId> {
        let pending = self.pending?;
        self.nodes[state.0]
            .transitions
            .iter()
            .find(|transition| transition.event == pending)
            .map(|transition| transition.target)
    }

    fn set_active(&mut self, composite: StateId, child: StateId) {
        if let StateKind::Composite { active, .. } = &mut self.nodes[composite.0].kind {
            *active = Some(child);
        }
    }

    /// Enters `id` and, for composites, activates and enters the default
    /// child recursively so the whole branch is live before returning.
    fn enter_and_arm(&mut self, id: StateId, ctx: &mut C) {
        self.nodes[id.0].behavior.enter(ctx);
        let default = match &self.nodes[id.0].kind {
            StateKind::Composite { default, .. } => *default,
            StateKind::Atomic => None,
        };
        if let Some(child) = default {
            self.set_active(id, child);
            self.enter_and_arm(child, ctx);
        }
    }

    /// Leaves the active leaf first, then each ancestor up to `id`.
    fn leave_recursive(&mut self, id: StateId, ctx: &mut C) {
        if let Some(active) = self.active_child(id) {
            self.leave_recursive(active, ctx);
        }
        self.nodes[id.0].behavior.leave(ctx);
    }
}

use winit::event::{ElementState, KeyEvent, MouseButton};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::sim::{MoveIntent, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Quit => 4,
        }
    }
}

/// Input as seen by one simulation tick. Press edges appear in exactly one
/// snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<(f32, f32)>,
    pointer_world: Option<Vec2>,
    primary_pressed: bool,
}

impl InputSnapshot {
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn cursor_position_px(&self) -> Option<(f32, f32)> {
        self.cursor_position_px
    }

    /// Cursor position converted through the camera, if the cursor is inside
    /// the window.
    pub fn pointer_world(&self) -> Option<Vec2> {
        self.pointer_world
    }

    pub fn primary_pressed(&self) -> bool {
        self.primary_pressed
    }

    /// Held movement keys as a movement intent.
    pub fn move_intent(&self) -> MoveIntent {
        MoveIntent {
            left: self.is_down(InputAction::MoveLeft),
            right: self.is_down(InputAction::MoveRight),
            up: self.is_down(InputAction::MoveUp),
            down: self.is_down(InputAction::MoveDown),
        }
    }
}

/// Accumulates window events between ticks.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    pub(crate) quit_requested: bool,
    action_states: ActionStates,
    cursor_position_px: Option<(f32, f32)>,
    left_mouse_is_down: bool,
    left_click_pressed_edge: bool,
}

impl InputCollector {
    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.action_states.set(InputAction::MoveUp, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.action_states.set(InputAction::MoveDown, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            _ => {}
        }
    }

    pub(crate) fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some((x, y));
    }

    pub(crate) fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    pub(crate) fn cursor_position_px(&self) -> Option<(f32, f32)> {
        self.cursor_position_px
    }

    pub(crate) fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                if !self.left_mouse_is_down {
                    self.left_click_pressed_edge = true;
                }
                self.left_mouse_is_down = true;
            }
            ElementState::Released => self.left_mouse_is_down = false,
        }
    }

    /// Snapshot for the next tick; clears press edges.
    pub(crate) fn snapshot_for_tick(&mut self, pointer_world: Option<Vec2>) -> InputSnapshot {
        let snapshot = InputSnapshot {
            quit_requested: self.quit_requested,
            actions: self.action_states,
            cursor_position_px: self.cursor_position_px,
            pointer_world,
            primary_pressed: self.left_click_pressed_edge,
        };
        self.left_click_pressed_edge = false;
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_click_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);

        let first = input.snapshot_for_tick(None);
        let second = input.snapshot_for_tick(None);

        assert!(first.primary_pressed());
        assert!(!second.primary_pressed());
    }

    #[test]
    fn held_click_does_not_spam_press_edges() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.snapshot_for_tick(None).primary_pressed());

        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(!input.snapshot_for_tick(None).primary_pressed());

        input.handle_mouse_input(MouseButton::Left, ElementState::Released);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.snapshot_for_tick(None).primary_pressed());
    }

    #[test]
    fn right_click_is_ignored() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        assert!(!input.snapshot_for_tick(None).primary_pressed());
    }

    #[test]
    fn movement_keys_map_to_intent_and_escape_requests_quit() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowUp), true);
        let snapshot = input.snapshot_for_tick(Some(Vec2::new(3.0, 4.0)));
        assert_eq!(
            snapshot.move_intent(),
            MoveIntent {
                left: false,
                right: true,
                up: true,
                down: false,
            }
        );
        assert_eq!(snapshot.pointer_world(), Some(Vec2::new(3.0, 4.0)));
        assert!(!snapshot.quit_requested());

        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), false);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Escape), true);
        let snapshot = input.snapshot_for_tick(None);
        assert!(!snapshot.is_down(InputAction::MoveRight));
        assert!(snapshot.quit_requested());
    }
}

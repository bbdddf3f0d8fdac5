//! Named controls of the chat surface and the input events they receive.
//!
//! Front ends lay out the four controls, register where they ended up, and
//! translate raw terminal input into [`InputEvent`]s aimed at a control. The
//! controller handles the events it is bound to; anything it lets through
//! falls back to the control's default action ([`apply_default`]).

use ratatui::layout::{Position, Rect};

use crate::state::chat::ChatState;

/// Fixed identifiers of the controls the controller binds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlId {
    SendButton,
    UserInput,
    History,
    Loading,
}

impl ControlId {
    /// Controls that must be present before the controller can bind.
    pub const REQUIRED: [Self; 4] = [Self::SendButton, Self::UserInput, Self::History, Self::Loading];

    #[must_use]
    pub fn element_id(self) -> &'static str {
        match self {
            Self::SendButton => "sendButton",
            Self::UserInput => "user_input",
            Self::History => "history",
            Self::Loading => "loading",
        }
    }
}

/// Where each control sits on screen. Line mode registers controls with an
/// empty area; they exist but can never be clicked.
#[derive(Clone, Debug, Default)]
pub struct Surface {
    controls: Vec<(ControlId, Rect)>,
}

impl Surface {
    /// Register a control, replacing any earlier placement.
    pub fn place(&mut self, id: ControlId, area: Rect) {
        if let Some(slot) = self.controls.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = area;
        } else {
            self.controls.push((id, area));
        }
    }

    #[must_use]
    pub fn area(&self, id: ControlId) -> Option<Rect> {
        self.controls
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, area)| *area)
    }

    #[must_use]
    pub fn contains(&self, id: ControlId) -> bool {
        self.area(id).is_some()
    }

    /// Control under the given terminal cell, if any.
    #[must_use]
    pub fn hit(&self, column: u16, row: u16) -> Option<ControlId> {
        let position = Position::new(column, row);
        self.controls
            .iter()
            .find(|(_, area)| area.contains(position))
            .map(|(id, _)| *id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Backspace,
    PageUp,
    PageDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Click { target: ControlId },
    KeyPress { target: ControlId, key: Key },
}

/// Whether a handled event should still run the control's default action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    /// The default action is suppressed.
    Stop,
}

/// Default action of a control: text editing in the input field and paging
/// in the history panel. Enter has no default action.
pub fn apply_default(state: &mut ChatState, event: InputEvent, page_rows: usize) {
    let InputEvent::KeyPress { target, key } = event else {
        return;
    };

    match (target, key) {
        (ControlId::UserInput, Key::Char(ch)) if !ch.is_control() => state.input.insert(ch),
        (ControlId::UserInput, Key::Backspace) => state.input.backspace(),
        (_, Key::PageUp) => state.scroll.scroll_up(page_rows.max(1)),
        (_, Key::PageDown) => state.scroll.scroll_down(page_rows.max(1)),
        _ => {}
    }
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod tests;

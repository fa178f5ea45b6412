//! Virtual keyboard layout and key actions.
//!
//! The layout is a fixed table of key rectangles in keyboard-surface pixels.
//! Hit testing is inclusive on every edge; where rectangles would overlap
//! the earlier key in the table wins.

use crate::chat::ChatState;

const ROWS: [&str; 4] = ["1234567890-=", "qwertyuiop", "asdfghjkl", "zxcvbnm"];
const KEY_SIZE: f32 = 35.0;
const KEY_SPACING: f32 = 2.0;
const GRID_TOP: f32 = 80.0;
const SPECIAL_ROW_TOP: f32 = GRID_TOP + ROWS.len() as f32 * (KEY_SIZE + KEY_SPACING) + 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl KeyRect {
    fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Char(char),
    Space,
    Backspace,
    Enter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyCap {
    pub label: String,
    pub action: KeyAction,
    pub rect: KeyRect,
}

/// What pressing a key did to the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Typed,
    Deleted,
    /// Enter; `true` when a message was posted.
    Submitted(bool),
    /// The input line was full or already empty.
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardLayout {
    keys: Vec<KeyCap>,
}

impl Default for KeyboardLayout {
    fn default() -> Self {
        Self::qwerty()
    }
}

impl KeyboardLayout {
    pub fn qwerty() -> Self {
        let mut keys = Vec::new();
        for (row, chars) in ROWS.iter().enumerate() {
            let indent = 10.0 + if row == 3 { 30.0 } else { row as f32 * 15.0 };
            let y = GRID_TOP + row as f32 * (KEY_SIZE + KEY_SPACING);
            for (col, c) in chars.chars().enumerate() {
                let x = indent + col as f32 * (KEY_SIZE + KEY_SPACING);
                keys.push(KeyCap {
                    label: c.to_ascii_uppercase().to_string(),
                    action: KeyAction::Char(c),
                    rect: KeyRect::new(x, y, KEY_SIZE, KEY_SIZE),
                });
            }
        }
        for (label, action, x, w) in [
            ("Space", KeyAction::Space, 100.0, 200.0),
            ("Back", KeyAction::Backspace, 302.0, 100.0),
            ("Enter", KeyAction::Enter, 404.0, 80.0),
        ] {
            keys.push(KeyCap {
                label: label.into(),
                action,
                rect: KeyRect::new(x, SPECIAL_ROW_TOP, w, KEY_SIZE),
            });
        }
        Self { keys }
    }

    pub fn keys(&self) -> &[KeyCap] {
        &self.keys
    }

    /// Index of the key under `(x, y)`, if any.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<usize> {
        self.keys.iter().position(|k| k.rect.contains(x, y))
    }

    pub fn key(&self, index: usize) -> Option<&KeyCap> {
        self.keys.get(index)
    }
}

/// Applies a key to the shared input line.
pub fn apply_key(action: KeyAction, chat: &mut ChatState) -> KeyOutcome {
    let typed = |chat: &mut ChatState, c: char| {
        let mut buf = [0u8; 4];
        if chat.push_input(c.encode_utf8(&mut buf)) {
            KeyOutcome::Typed
        } else {
            KeyOutcome::Ignored
        }
    };
    match action {
        KeyAction::Char(c) => typed(chat, c),
        KeyAction::Space => typed(chat, ' '),
        KeyAction::Backspace => match chat.pop_input() {
            Some(_) => KeyOutcome::Deleted,
            None => KeyOutcome::Ignored,
        },
        KeyAction::Enter => KeyOutcome::Submitted(chat.submit_input()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_key_corners_are_inclusive() {
        let layout = KeyboardLayout::qwerty();
        for (x, y) in [(10.0, 80.0), (45.0, 80.0), (10.0, 115.0), (45.0, 115.0)] {
            let action = layout.hit_test(x, y).map(|i| layout.keys()[i].action);
            assert_eq!(action, Some(KeyAction::Char('1')), "corner ({x}, {y})");
        }
    }

    #[test]
    fn gaps_and_outside_miss() {
        let layout = KeyboardLayout::qwerty();
        assert_eq!(layout.hit_test(46.0, 90.0), None);
        assert_eq!(layout.hit_test(5.0, 5.0), None);
        assert_eq!(layout.hit_test(-1.0, -1.0), None);
    }

    #[test]
    fn special_row_geometry() {
        let layout = KeyboardLayout::qwerty();
        let at = |x, y| layout.hit_test(x, y).map(|i| layout.keys()[i].action);
        assert_eq!(at(200.0, 250.0), Some(KeyAction::Space));
        assert_eq!(at(350.0, 250.0), Some(KeyAction::Backspace));
        assert_eq!(at(440.0, 273.0), Some(KeyAction::Enter));
        assert_eq!(at(301.0, 250.0), None);
    }

    #[test]
    fn bottom_row_is_indented() {
        let layout = KeyboardLayout::qwerty();
        let z = layout.keys().iter().find(|k| k.action == KeyAction::Char('z')).unwrap();
        assert_eq!(z.rect.min_x, 40.0);
        assert_eq!(z.rect.min_y, 80.0 + 3.0 * 37.0);
        assert_eq!(z.label, "Z");
        assert_eq!(layout.keys().len(), 12 + 10 + 9 + 7 + 3);
    }

    #[test]
    fn keys_edit_the_input_line() {
        let mut chat = ChatState::new();
        assert_eq!(apply_key(KeyAction::Char('h'), &mut chat), KeyOutcome::Typed);
        assert_eq!(apply_key(KeyAction::Char('i'), &mut chat), KeyOutcome::Typed);
        assert_eq!(apply_key(KeyAction::Space, &mut chat), KeyOutcome::Typed);
        assert_eq!(apply_key(KeyAction::Backspace, &mut chat), KeyOutcome::Deleted);
        assert_eq!(chat.input, "hi");
        assert_eq!(apply_key(KeyAction::Enter, &mut chat), KeyOutcome::Submitted(true));
        assert_eq!(chat.take_sent().as_deref(), Some("hi"));
        assert_eq!(apply_key(KeyAction::Backspace, &mut chat), KeyOutcome::Ignored);
        assert_eq!(apply_key(KeyAction::Enter, &mut chat), KeyOutcome::Submitted(false));
    }
}

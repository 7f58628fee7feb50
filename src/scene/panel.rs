//! A keyboard driven control panel.
//!
//! Controls bind to a value inside some target `T` through a getter and a
//! setter. After a control writes its value it calls its change callback
//! with the same target, so the callback sees the new value.
//!
//! `Tab` moves the focus, the focused control receives the input. The panel
//! renders itself as a one-line summary for the window title.

use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{Key, NamedKey},
};

pub type Callback<T> = Box<dyn FnMut(&mut T)>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelInput {
    FocusNext,
    Backspace,
    Insert(String),
    Increment(i32),
}

impl PanelInput {
    pub fn from_key_event(event: &KeyEvent) -> Option<Self> {
        Self::from_key(&event.logical_key, event.state)
    }

    pub fn from_key(key: &Key, state: ElementState) -> Option<Self> {
        if !state.is_pressed() {
            return None;
        }
        match key {
            Key::Named(NamedKey::Tab) => Some(Self::FocusNext),
            Key::Named(NamedKey::Backspace) => Some(Self::Backspace),
            Key::Named(NamedKey::Space) => Some(Self::Insert(" ".to_string())),
            Key::Named(NamedKey::ArrowUp) => Some(Self::Increment(1)),
            Key::Named(NamedKey::ArrowDown) => Some(Self::Increment(-1)),
            Key::Named(NamedKey::PageUp) => Some(Self::Increment(10)),
            Key::Named(NamedKey::PageDown) => Some(Self::Increment(-10)),
            Key::Character(text) if !text.chars().any(char::is_control) => {
                Some(Self::Insert(text.to_string()))
            }
            _ => None,
        }
    }
}

pub struct TextControl<T> {
    name: String,
    get: fn(&T) -> &str,
    set: fn(&mut T, String),
    on_change: Option<Callback<T>>,
}

impl<T> TextControl<T> {
    pub fn on_change(&mut self, callback: impl FnMut(&mut T) + 'static) -> &mut Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn value<'a>(&self, target: &'a T) -> &'a str {
        (self.get)(target)
    }

    pub fn set_value(&mut self, target: &mut T, value: String) {
        (self.set)(target, value);
        if let Some(callback) = self.on_change.as_mut() {
            callback(target);
        }
    }

    fn handle(&mut self, target: &mut T, input: &PanelInput) -> bool {
        let mut value = self.value(target).to_string();
        match input {
            PanelInput::Insert(text) => value.push_str(text),
            PanelInput::Backspace => {
                if value.pop().is_none() {
                    return false;
                }
            }
            _ => return false,
        }
        self.set_value(target, value);
        true
    }
}

pub struct NumberControl<T> {
    name: String,
    get: fn(&T) -> u32,
    set: fn(&mut T, u32),
    min: u32,
    max: u32,
    step: u32,
    on_change: Option<Callback<T>>,
}

impl<T> NumberControl<T> {
    pub fn on_change(&mut self, callback: impl FnMut(&mut T) + 'static) -> &mut Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn value(&self, target: &T) -> u32 {
        (self.get)(target)
    }

    /// Writes the value clamped to the control's range.
    pub fn set_value(&mut self, target: &mut T, value: i64) {
        let value = value.clamp(self.min as i64, self.max as i64) as u32;
        (self.set)(target, value);
        if let Some(callback) = self.on_change.as_mut() {
            callback(target);
        }
    }

    fn handle(&mut self, target: &mut T, input: &PanelInput) -> bool {
        let PanelInput::Increment(steps) = input else {
            return false;
        };
        let current = self.value(target);
        let requested = current as i64 + *steps as i64 * self.step as i64;
        let clamped = requested.clamp(self.min as i64, self.max as i64);
        if clamped == current as i64 {
            return false;
        }
        self.set_value(target, clamped);
        true
    }
}

pub enum Control<T> {
    Text(TextControl<T>),
    Number(NumberControl<T>),
}

impl<T> Control<T> {
    fn name(&self) -> &str {
        match self {
            Control::Text(c) => &c.name,
            Control::Number(c) => &c.name,
        }
    }
}

pub struct ControlPanel<T> {
    controls: Vec<Control<T>>,
    focus: usize,
}

impl<T> Default for ControlPanel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ControlPanel<T> {
    pub fn new() -> Self {
        Self {
            controls: Vec::new(),
            focus: 0,
        }
    }

    pub fn add_text(
        &mut self,
        name: &str,
        get: fn(&T) -> &str,
        set: fn(&mut T, String),
    ) -> &mut TextControl<T> {
        self.controls.push(Control::Text(TextControl {
            name: name.to_string(),
            get,
            set,
            on_change: None,
        }));
        match self.controls.last_mut() {
            Some(Control::Text(control)) => control,
            _ => unreachable!("a text control was just pushed"),
        }
    }

    pub fn add_number(
        &mut self,
        name: &str,
        get: fn(&T) -> u32,
        set: fn(&mut T, u32),
        range: std::ops::RangeInclusive<u32>,
        step: u32,
    ) -> &mut NumberControl<T> {
        self.controls.push(Control::Number(NumberControl {
            name: name.to_string(),
            get,
            set,
            min: *range.start(),
            max: *range.end(),
            step: step.max(1),
            on_change: None,
        }));
        match self.controls.last_mut() {
            Some(Control::Number(control)) => control,
            _ => unreachable!("a number control was just pushed"),
        }
    }

    pub fn controls(&self) -> &[Control<T>] {
        &self.controls
    }

    pub fn focused(&self) -> Option<&str> {
        self.controls.get(self.focus).map(Control::name)
    }

    /// Apply `input`. Returns whether a value changed.
    pub fn handle(&mut self, target: &mut T, input: PanelInput) -> bool {
        if input == PanelInput::FocusNext {
            if !self.controls.is_empty() {
                self.focus = (self.focus + 1) % self.controls.len();
            }
            return false;
        }
        let changed = match self.controls.get_mut(self.focus) {
            Some(Control::Text(control)) => control.handle(target, &input),
            Some(Control::Number(control)) => control.handle(target, &input),
            None => false,
        };
        if changed {
            log::info!("panel: {}", self.summary(target));
        }
        changed
    }

    /// `Name: value` pairs, the focused one in brackets.
    pub fn summary(&self, target: &T) -> String {
        self.controls
            .iter()
            .enumerate()
            .map(|(i, control)| {
                let entry = match control {
                    Control::Text(c) => format!("{}: {:?}", c.name, c.value(target)),
                    Control::Number(c) => format!("{}: {}", c.name, c.value(target)),
                };
                if i == self.focus {
                    format!("[{}]", entry)
                } else {
                    entry
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use winit::keyboard::SmolStr;

    use super::*;

    #[derive(Default)]
    struct Target {
        text: String,
        count: u32,
        seen: Vec<String>,
    }

    fn panel() -> ControlPanel<Target> {
        let mut panel: ControlPanel<Target> = ControlPanel::new();
        panel
            .add_text("Text", |t| &t.text, |t, v| t.text = v)
            .on_change(|t| {
                let seen = format!("text={}", t.text);
                t.seen.push(seen)
            });
        panel
            .add_number("Donuts", |t| t.count, |t, v| t.count = v, 0..=200, 1)
            .on_change(|t| {
                let seen = format!("count={}", t.count);
                t.seen.push(seen)
            });
        panel
    }

    #[test]
    fn should_call_back_after_the_value_changed() {
        let mut panel = panel();
        let mut target = Target::default();
        assert!(panel.handle(&mut target, PanelInput::Insert("Hi".into())));
        assert!(panel.handle(&mut target, PanelInput::Backspace));
        assert_eq!(target.text, "H");
        assert_eq!(target.seen, vec!["text=Hi", "text=H"]);
    }

    #[test]
    fn should_route_input_to_the_focused_control() {
        let mut panel = panel();
        let mut target = Target::default();
        assert!(!panel.handle(&mut target, PanelInput::Increment(1)));
        assert_eq!(panel.focused(), Some("Text"));

        panel.handle(&mut target, PanelInput::FocusNext);
        assert_eq!(panel.focused(), Some("Donuts"));
        assert!(!panel.handle(&mut target, PanelInput::Insert("x".into())));
        assert!(panel.handle(&mut target, PanelInput::Increment(10)));
        assert_eq!(target.count, 10);

        panel.handle(&mut target, PanelInput::FocusNext);
        assert_eq!(panel.focused(), Some("Text"));
    }

    #[test]
    fn should_clamp_numbers_into_range() {
        let mut panel = panel();
        let mut target = Target {
            count: 195,
            ..Default::default()
        };
        panel.handle(&mut target, PanelInput::FocusNext);
        assert!(panel.handle(&mut target, PanelInput::Increment(10)));
        assert_eq!(target.count, 200);
        // already at the top, nothing to do
        assert!(!panel.handle(&mut target, PanelInput::Increment(1)));
        assert_eq!(target.seen, vec!["count=200"]);

        if let Control::Number(control) = &mut panel.controls[1] {
            control.set_value(&mut target, -3);
        }
        assert_eq!(target.count, 0);
    }

    #[test]
    fn should_ignore_backspace_on_empty_text() {
        let mut panel = panel();
        let mut target = Target::default();
        assert!(!panel.handle(&mut target, PanelInput::Backspace));
        assert!(target.seen.is_empty());
    }

    #[test]
    fn should_support_capturing_callbacks() {
        let calls = Rc::new(RefCell::new(0));
        let mut panel: ControlPanel<Target> = ControlPanel::new();
        let counter = calls.clone();
        panel
            .add_text("Text", |t| &t.text, |t, v| t.text = v)
            .on_change(move |_| *counter.borrow_mut() += 1);
        let mut target = Target::default();
        panel.handle(&mut target, PanelInput::Insert("a".into()));
        panel.handle(&mut target, PanelInput::Insert("b".into()));
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn should_summarise_with_focus_marker() {
        let mut panel = panel();
        let target = Target {
            text: "Hey".into(),
            count: 3,
            ..Default::default()
        };
        assert_eq!(panel.summary(&target), "[Text: \"Hey\"]  Donuts: 3");
        let mut target = target;
        panel.handle(&mut target, PanelInput::FocusNext);
        assert_eq!(panel.summary(&target), "Text: \"Hey\"  [Donuts: 3]");
    }

    #[test]
    fn should_map_keys_to_inputs() {
        let pressed = ElementState::Pressed;
        assert_eq!(
            PanelInput::from_key(&Key::Named(NamedKey::Tab), pressed),
            Some(PanelInput::FocusNext)
        );
        assert_eq!(
            PanelInput::from_key(&Key::Named(NamedKey::PageDown), pressed),
            Some(PanelInput::Increment(-10))
        );
        assert_eq!(
            PanelInput::from_key(&Key::Character(SmolStr::new("é")), pressed),
            Some(PanelInput::Insert("é".into()))
        );
        assert_eq!(
            PanelInput::from_key(&Key::Character(SmolStr::new("\u{8}")), pressed),
            None
        );
        assert_eq!(
            PanelInput::from_key(&Key::Named(NamedKey::Tab), ElementState::Released),
            None
        );
    }
}

use std::{collections::VecDeque, io::Read, iter::Iterator};

use chip8::KeyCode;
use serde::Deserialize;
use smol_str::SmolStr;
use winit::event::{ElementState, VirtualKeyCode};

use crate::error::AppError;

/// Keyboard layout shipped with the application.
const DEFAULT_INPUT: &str = include_str!("../config/input.yaml");

/// Input mapper
///
/// Maps user input events to either Chip8 keycodes (suitable to be used in the VM),
/// or application specific named actions.
///
/// - *Chip8 Keycode*: These are the 16 keys of the old COSMAC VIP computer.
///   Stored in 8-bit integers and suitable to be passed to the virtual machine.
/// - *Named Action*: These are application specific input events that are
///   identified by a readable string.
#[derive(Debug)]
pub struct InputMap {
    actions: Box<[InputInfo]>,
    /// Mapping of host keyboard keys to application actions, by index.
    keys: Box<[(VirtualKeyCode, usize)]>,
    /// Buffer of collected events, as they happen.
    events: VecDeque<InputEvent>,
    /// Current state of the key. Whether it is pressed down.
    state: Vec<InputState>,
}

#[derive(Debug)]
struct InputInfo {
    chip8: Option<KeyCode>,
    action: Option<SmolStr>,
}

impl From<InputDef> for InputInfo {
    fn from(def: InputDef) -> Self {
        Self {
            chip8: def.chip8,
            action: def.action,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputDef {
    chip8: Option<KeyCode>,
    action: Option<SmolStr>,
    keyboard_keys: Option<Vec<VirtualKeyCode>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub state: ElementState,
}

impl InputEvent {
    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.state == ElementState::Pressed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Action(SmolStr),
    Chip8(KeyCode),
}

#[derive(Debug)]
struct InputState {
    kind: InputKind,
    pressed: bool,
}

impl InputMap {
    /// Load the bundled keyboard layout.
    pub fn default_map() -> Result<Self, AppError> {
        Self::from_yaml(DEFAULT_INPUT)
    }

    pub fn from_file(filepath: &str) -> Result<Self, AppError> {
        let mut file = std::fs::File::open(filepath)?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, AppError> {
        let defs: Vec<InputDef> = serde_yaml::from_str(text)?;
        log::debug!("loaded {} input definitions", defs.len());

        let keys = Self::build_keys(&defs);
        let actions = defs.into_iter().map(InputInfo::from).collect();

        Ok(InputMap {
            actions,
            keys,
            events: VecDeque::new(),
            state: Vec::new(),
        })
    }

    /// Build a mapping of [`VirtualKeyCode`]s to indices into the given action definition mapping.
    fn build_keys(defs: &[InputDef]) -> Box<[(VirtualKeyCode, usize)]> {
        defs.iter()
            // definitions will be mapped by their index
            .enumerate()
            // lift keycodes out of the definitions
            .filter_map(|(index, def)| def.keyboard_keys.as_ref().map(|keys| (index, keys)))
            // flatten borrowed keycodes into one iterator of copied keycodes
            .flat_map(|(index, keys)| keys.iter().copied().map(move |keycode| (keycode, index)))
            .collect::<Vec<(VirtualKeyCode, usize)>>()
            .into_boxed_slice()
    }

    /// Given a user input keycode, map it to either a Chip8 key, or a named action.
    pub fn map_key(&self, key: VirtualKeyCode) -> Option<InputKind> {
        self.keys
            .iter()
            .find(|(keycode, _)| *keycode == key)
            .map(|(_, index)| *index)
            .and_then(|index| self.actions.get(index))
            .and_then(|input_def| {
                if let Some(key_code) = input_def.chip8 {
                    Some(InputKind::Chip8(key_code))
                } else {
                    input_def.action.clone().map(InputKind::Action)
                }
            })
    }

    /// Push key event into the input state.
    ///
    /// Operating system key repeats are dropped, so only changes
    /// between pressed and released are queued.
    pub fn push_key(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        // Convert `winit` key to our input framework
        let Some(kind) = self.map_key(keycode) else {
            log::trace!("no input mapping for {keycode:?}");
            return;
        };

        let pressed = state == ElementState::Pressed;

        match self.state.iter_mut().find(|el| el.kind == kind) {
            Some(existing) if existing.pressed == pressed => return,
            Some(existing) => existing.pressed = pressed,
            None => self.state.push(InputState {
                kind: kind.clone(),
                pressed,
            }),
        }

        self.events.push_back(InputEvent { kind, state });
    }

    pub fn is_action_pressed(&self, action: impl AsRef<str>) -> bool {
        let query = action.as_ref().trim();
        self.state
            .iter()
            .find(|state| matches!(&state.kind, InputKind::Action(name) if name == query))
            .map(|state| state.pressed)
            .unwrap_or(false)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    /// Release everything, for when the window loses focus.
    pub fn clear_state(&mut self) {
        self.state.clear();
        self.events.clear();
    }
}

//! Input drivers producing press/release events for the local player

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Action, Controls};
use std::str::FromStr;

/// Chance per frame that the random driver flips one action.
const RANDOM_TOGGLE_CHANCE: f64 = 0.08;

/// A discrete key transition for one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub action: Action,
    pub pressed: bool,
}

/// One entry of a scripted input sequence: `frame:+action` or `frame:-action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep {
    pub frame: u64,
    pub event: InputEvent,
}

impl FromStr for ScriptStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (frame, rest) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("script step '{}' is missing ':'", s))?;
        let frame = frame
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("bad frame in '{}': {}", s, e))?;

        let rest = rest.trim();
        let (pressed, name) = if let Some(name) = rest.strip_prefix('+') {
            (true, name)
        } else if let Some(name) = rest.strip_prefix('-') {
            (false, name)
        } else {
            return Err(format!("script step '{}' needs '+' or '-' before the action", s));
        };

        Ok(ScriptStep {
            frame,
            event: InputEvent {
                action: parse_action(name)?,
                pressed,
            },
        })
    }
}

/// Parses a comma separated script such as `0:+right,30:+jump,31:-jump`.
pub fn parse_script(script: &str) -> Result<Vec<ScriptStep>, String> {
    let mut steps = script
        .split(',')
        .filter(|step| !step.trim().is_empty())
        .map(ScriptStep::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    steps.sort_by_key(|step| step.frame);
    Ok(steps)
}

fn parse_action(name: &str) -> Result<Action, String> {
    match name.trim().to_ascii_lowercase().as_str() {
        "left" => Ok(Action::Left),
        "right" => Ok(Action::Right),
        "up" => Ok(Action::Up),
        "down" => Ok(Action::Down),
        "jump" => Ok(Action::Jump),
        "shoot" => Ok(Action::Shoot),
        other => Err(format!("unknown action '{}'", other)),
    }
}

/// Where the driver's events come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Never presses anything
    Idle,
    /// Flips random actions using a seeded generator
    Random { seed: u64 },
    /// Replays a fixed sequence keyed by frame number
    Script(Vec<ScriptStep>),
}

/// Produces input events once per frame and applies them to [`Controls`].
///
/// The driver remembers which actions it holds, so repeated presses of a
/// held action are dropped before they reach the controls.
pub struct InputDriver {
    mode: InputMode,
    rng: StdRng,
    frame: u64,
    script_index: usize,
    held: [bool; 6],
}

impl InputDriver {
    pub fn new(mode: InputMode) -> Self {
        let seed = match &mode {
            InputMode::Random { seed } => *seed,
            _ => 0,
        };
        Self {
            mode,
            rng: StdRng::seed_from_u64(seed),
            frame: 0,
            script_index: 0,
            held: [false; 6],
        }
    }

    /// Frames sampled so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held[action_index(action)]
    }

    /// Samples the next frame's events. Repeats of the current state are
    /// filtered out.
    pub fn next_events(&mut self) -> Vec<InputEvent> {
        let candidates = match &self.mode {
            InputMode::Idle => Vec::new(),
            InputMode::Random { .. } => random_events(&mut self.rng, &self.held),
            InputMode::Script(steps) => {
                let mut events = Vec::new();
                while let Some(step) = steps.get(self.script_index) {
                    if step.frame > self.frame {
                        break;
                    }
                    if step.frame < self.frame {
                        warn!("Skipping late script step for frame {}", step.frame);
                    } else {
                        events.push(step.event);
                    }
                    self.script_index += 1;
                }
                events
            }
        };
        self.frame += 1;

        let mut events = Vec::with_capacity(candidates.len());
        for event in candidates {
            let held = &mut self.held[action_index(event.action)];
            if *held == event.pressed {
                continue;
            }
            *held = event.pressed;
            events.push(event);
        }
        events
    }

    /// Samples one frame and feeds the events into `controls`.
    pub fn step(&mut self, controls: &mut Controls) -> usize {
        let events = self.next_events();
        for event in &events {
            debug!(
                "Frame {}: {:?} {}",
                self.frame,
                event.action,
                if event.pressed { "pressed" } else { "released" }
            );
            controls.apply(event.action, event.pressed);
        }
        events.len()
    }
}

impl Default for InputDriver {
    fn default() -> Self {
        Self::new(InputMode::Idle)
    }
}

fn random_events(rng: &mut StdRng, held: &[bool; 6]) -> Vec<InputEvent> {
    if !rng.gen_bool(RANDOM_TOGGLE_CHANCE) {
        return Vec::new();
    }
    let action = Action::ALL[rng.gen_range(0..Action::ALL.len())];
    vec![InputEvent {
        action,
        pressed: !held[action_index(action)],
    }]
}

fn action_index(action: Action) -> usize {
    match action {
        Action::Left => 0,
        Action::Right => 1,
        Action::Up => 2,
        Action::Down => 3,
        Action::Jump => 4,
        Action::Shoot => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(action: Action) -> InputEvent {
        InputEvent {
            action,
            pressed: true,
        }
    }

    fn release(action: Action) -> InputEvent {
        InputEvent {
            action,
            pressed: false,
        }
    }

    #[test]
    fn test_parse_script_step() {
        let step: ScriptStep = "12:+jump".parse().unwrap();
        assert_eq!(step.frame, 12);
        assert_eq!(step.event, press(Action::Jump));

        let step: ScriptStep = " 3 : -Shoot ".parse().unwrap();
        assert_eq!(step.frame, 3);
        assert_eq!(step.event, release(Action::Shoot));
    }

    #[test]
    fn test_parse_script_rejects_bad_steps() {
        assert!("jump".parse::<ScriptStep>().is_err());
        assert!("x:+jump".parse::<ScriptStep>().is_err());
        assert!("1:jump".parse::<ScriptStep>().is_err());
        assert!("1:+fly".parse::<ScriptStep>().is_err());
    }

    #[test]
    fn test_parse_script_sorts_by_frame() {
        let steps = parse_script("5:-left, 0:+left,,").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].frame, 0);
        assert_eq!(steps[1].frame, 5);
    }

    #[test]
    fn test_idle_driver_never_presses() {
        let mut driver = InputDriver::default();
        let mut controls = Controls::new();
        for _ in 0..100 {
            assert_eq!(driver.step(&mut controls), 0);
        }
        assert_eq!(controls, Controls::new());
        assert_eq!(driver.frame(), 100);
    }

    #[test]
    fn test_script_driver_fires_on_frame() {
        let steps = parse_script("0:+right,2:+jump,3:-jump").unwrap();
        let mut driver = InputDriver::new(InputMode::Script(steps));

        assert_eq!(driver.next_events(), vec![press(Action::Right)]);
        assert!(driver.next_events().is_empty());
        assert_eq!(driver.next_events(), vec![press(Action::Jump)]);
        assert_eq!(driver.next_events(), vec![release(Action::Jump)]);
        assert!(driver.is_held(Action::Right));
        assert!(!driver.is_held(Action::Jump));
    }

    #[test]
    fn test_repeated_press_is_dropped() {
        let steps = parse_script("0:+shoot,1:+shoot,2:-left").unwrap();
        let mut driver = InputDriver::new(InputMode::Script(steps));
        let mut controls = Controls::new();

        assert_eq!(driver.step(&mut controls), 1);
        assert_eq!(driver.step(&mut controls), 0);
        assert_eq!(driver.step(&mut controls), 0);
        assert!(controls.shoot.pressed);
        assert_eq!(controls.shoot.downs, 1);
    }

    #[test]
    fn test_random_driver_is_deterministic() {
        let mut a = InputDriver::new(InputMode::Random { seed: 42 });
        let mut b = InputDriver::new(InputMode::Random { seed: 42 });

        let mut total = 0;
        for _ in 0..500 {
            let events = a.next_events();
            total += events.len();
            assert_eq!(events, b.next_events());
        }
        assert!(total > 0);
    }

    #[test]
    fn test_random_driver_alternates_press_and_release() {
        let mut driver = InputDriver::new(InputMode::Random { seed: 3 });
        let mut held = [false; 6];
        for _ in 0..1000 {
            for event in driver.next_events() {
                let slot = &mut held[action_index(event.action)];
                assert_ne!(*slot, event.pressed);
                *slot = event.pressed;
            }
        }
    }
}

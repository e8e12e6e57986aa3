//! Host-facing configuration and platform collaborator contracts.

use crate::cpu::{Button, ButtonState, DEFAULT_CLOCK_RATE_HZ};
use crate::display::DisplaySurface;
use crate::hal::VibePattern;
use crate::scheduler::DEFAULT_MAX_STEPS_PER_TICK;

/// Default CPU tick interval: the shortest platform timer period (1 ms).
pub const DEFAULT_CPU_TICK_INTERVAL_US: u32 = 1_000;

/// Default display refresh rate.
pub const DEFAULT_FRAME_RATE_HZ: u32 = 30;

/// Top-level configuration for a harness session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct HarnessConfig {
    /// Period of the CPU tick in microseconds.
    pub cpu_tick_interval_us: u32,
    /// Display refresh rate in Hz.
    pub frame_rate_hz: u32,
    /// Emulated CPU clock rate passed to the core at start-up.
    pub clock_rate_hz: u32,
    /// Ceiling on CPU steps per tick.
    pub max_steps_per_tick: u32,
    /// Vibration played while the buzzer is on.
    pub vibe_pattern: VibePattern,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            cpu_tick_interval_us: DEFAULT_CPU_TICK_INTERVAL_US,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            clock_rate_hz: DEFAULT_CLOCK_RATE_HZ,
            max_steps_per_tick: DEFAULT_MAX_STEPS_PER_TICK,
            vibe_pattern: VibePattern::default(),
        }
    }
}

/// Paints the display surface; called once per frame tick.
pub trait Renderer {
    /// Draws the current surface.
    fn render(&mut self, surface: &DisplaySurface);
}

/// Renderer for headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _surface: &DisplaySurface) {}
}

/// Physical buttons on the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum PlatformButton {
    Back,
    Up,
    Select,
    Down,
}

impl PlatformButton {
    /// Maps a watch button to the device button it drives. `Back` stays with
    /// the platform.
    #[must_use]
    pub const fn device_button(self) -> Option<Button> {
        match self {
            Self::Up => Some(Button::Left),
            Self::Select => Some(Button::Middle),
            Self::Down => Some(Button::Right),
            Self::Back => None,
        }
    }
}

/// A press or release delivered by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InputEvent {
    /// Device button affected.
    pub button: Button,
    /// New state of the button.
    pub state: ButtonState,
}

impl InputEvent {
    /// Translates a platform button change, if it maps to a device button.
    #[must_use]
    pub const fn from_platform(button: PlatformButton, state: ButtonState) -> Option<Self> {
        match button.device_button() {
            Some(button) => Some(Self { button, state }),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{HarnessConfig, InputEvent, PlatformButton};
    use crate::cpu::{Button, ButtonState};
    use crate::hal::VibePattern;

    #[test]
    fn default_config_matches_watch_app() {
        let config = HarnessConfig::default();
        assert_eq!(config.cpu_tick_interval_us, 1_000);
        assert_eq!(config.frame_rate_hz, 30);
        assert_eq!(config.clock_rate_hz, 1_000_000);
        assert_eq!(config.max_steps_per_tick, 50_000);
        assert_eq!(config.vibe_pattern, VibePattern::new(vec![5_000]));
    }

    #[rstest]
    #[case(PlatformButton::Up, Some(Button::Left))]
    #[case(PlatformButton::Select, Some(Button::Middle))]
    #[case(PlatformButton::Down, Some(Button::Right))]
    #[case(PlatformButton::Back, None)]
    fn platform_buttons_map_to_device_buttons(
        #[case] platform: PlatformButton,
        #[case] expected: Option<Button>,
    ) {
        assert_eq!(platform.device_button(), expected);
        assert_eq!(
            InputEvent::from_platform(platform, ButtonState::Pressed).map(|event| event.button),
            expected
        );
    }
}

//! Core types shared by the store, the driver and the controller.

/// Default time the motor runs to fully open or close the blind.
pub const DEFAULT_TRAVEL_DURATION_MS: u32 = 5000;

/// Default time the motor runs for a LEFT/RIGHT nudge.
pub const DEFAULT_NUDGE_DURATION_MS: u32 = 1000;

/// GPIO driving the STEP input of the stepper driver.
pub const DEFAULT_STEP_PIN: u8 = 16;

/// GPIO driving the DIR input of the stepper driver.
pub const DEFAULT_DIR_PIN: u8 = 17;

/// GPIO driving the ENABLE input of the stepper driver.
pub const DEFAULT_ENABLE_PIN: u8 = 18;

/// GPIO connected to the IR receiver module output.
pub const DEFAULT_IR_RECEIVE_PIN: u8 = 19;

/// Address transmitted by the paired remote handset.
pub const DEFAULT_IR_ADDRESS: u16 = 0xBF00;

/// Tunable behaviour of the blind.
///
/// Owned by the controller. Only the travel duration and the direction flag
/// are persisted; the nudge duration always comes from the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    /// Run time for a full UP or DOWN traversal.
    pub travel_duration_ms: u32,

    /// Run time for a LEFT or RIGHT nudge.
    pub nudge_duration_ms: u32,

    /// `false` swaps the physical direction of every move.
    pub normal_direction: bool,

    /// Whether these values are backed by valid persisted data.
    pub initialized: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            travel_duration_ms: DEFAULT_TRAVEL_DURATION_MS,
            nudge_duration_ms: DEFAULT_NUDGE_DURATION_MS,
            normal_direction: true,
            initialized: false,
        }
    }
}

/// Level driven on the DIR line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// DIR high.
    #[default]
    Normal,

    /// DIR low.
    Reversed,
}

impl Direction {
    /// Returns the opposite direction.
    #[inline]
    pub fn inverted(self) -> Self {
        match self {
            Direction::Normal => Direction::Reversed,
            Direction::Reversed => Direction::Normal,
        }
    }

    /// Maps the persisted direction flag to the level used for opening.
    #[inline]
    pub fn from_flag(normal_direction: bool) -> Self {
        if normal_direction {
            Direction::Normal
        } else {
            Direction::Reversed
        }
    }
}

/// What the motor is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionState {
    /// Driver disabled, waiting for a button.
    Idle,
    /// Full traversal in the opening direction.
    MovingUp,
    /// Full traversal in the closing direction.
    MovingDown,
    /// Short adjustment in the opening direction.
    MovingLeftNudge,
    /// Short adjustment in the closing direction.
    MovingRightNudge,
}

impl MotionState {
    /// Returns true for every state except `Idle`.
    #[inline]
    pub fn is_moving(&self) -> bool {
        *self != MotionState::Idle
    }
}

/// Step pulse shape emitted on the STEP line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseTiming {
    /// Time STEP is held high for each pulse.
    pub pulse_width_us: u32,

    /// Time from one rising edge to the next. Must exceed `pulse_width_us`.
    pub step_period_us: u32,
}

impl PulseTiming {
    /// Creates a pulse timing, clamping the width below the period.
    pub fn new(pulse_width_us: u32, step_period_us: u32) -> Self {
        let step_period_us = step_period_us.max(2);
        Self {
            pulse_width_us: pulse_width_us.clamp(1, step_period_us - 1),
            step_period_us,
        }
    }

    /// Same shape with the width clamped below the period.
    #[inline]
    pub fn normalized(self) -> Self {
        Self::new(self.pulse_width_us, self.step_period_us)
    }

    /// Low time following each pulse.
    #[inline]
    pub fn low_time_us(&self) -> u32 {
        self.step_period_us.saturating_sub(self.pulse_width_us)
    }
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self::new(500, 1000)
    }
}

/// Board wiring handed to the collaborators at startup.
///
/// The pin numbers are informational for the board bring-up code; the core
/// only ever sees the already-configured pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareConfig {
    pub step_pin: u8,
    pub dir_pin: u8,
    pub enable_pin: u8,
    pub ir_receive_pin: u8,

    /// Remote handset address accepted by the command interpreter.
    pub ir_address: u16,

    /// A4988/DRV8825 style drivers enable on a low ENABLE line.
    pub enable_active_low: bool,

    pub pulse: PulseTiming,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            step_pin: DEFAULT_STEP_PIN,
            dir_pin: DEFAULT_DIR_PIN,
            enable_pin: DEFAULT_ENABLE_PIN,
            ir_receive_pin: DEFAULT_IR_RECEIVE_PIN,
            ir_address: DEFAULT_IR_ADDRESS,
            enable_active_low: true,
            pulse: PulseTiming::default(),
        }
    }
}

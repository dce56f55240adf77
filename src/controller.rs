//! Blind controller state machine.
//!
//! Provides [`BlindController`], which turns remote buttons into timed moves
//! of a [`MotionDriver`] and keeps the [`Configuration`] persisted through a
//! [`ConfigStore`].
//!
//! Moves are not preemptible: while the motor runs, every button except
//! SHUTDOWN is dropped. SHUTDOWN is observed between two step pulses through
//! the [`AbortCheck`] passed to the driver.

use crate::command::{ButtonCode, IrEvent, IrKeymap, IrSource};
use crate::driver::{AbortCheck, DriverFault, MotionDriver, NeverAbort, StepOutcome};
use crate::storage::{ConfigStore, Storage, StorageError};
use crate::types::{Configuration, Direction, MotionState};

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Unknown button, repeat frame, or nothing to do in the current state.
    Ignored,

    /// Move ran for its full duration.
    Moved { motion: MotionState, pulses: u32 },

    /// Move was cut short by SHUTDOWN.
    Stopped { motion: MotionState, pulses: u32 },

    /// Driver reported that it did not move.
    NotMoved { motion: MotionState },

    /// Direction flag toggled. `persisted` is false if the store failed.
    DirectionChanged { normal: bool, persisted: bool },

    /// Driver failed; it has been disabled and the state forced to `Idle`.
    Faulted {
        motion: MotionState,
        fault: DriverFault,
    },
}

/// Abort check that drains an IR source while the motor runs.
///
/// Any frame other than SHUTDOWN is discarded.
struct ShutdownWatch<'a, Src: IrSource> {
    source: &'a mut Src,
    keymap: IrKeymap,
}

impl<Src: IrSource> AbortCheck for ShutdownWatch<'_, Src> {
    fn should_abort(&mut self) -> bool {
        while let Some(event) = self.source.poll_event() {
            match self.keymap.interpret_event(&event) {
                ButtonCode::Shutdown => return true,
                button => debug!("dropped {} during motion", button),
            }
        }
        false
    }
}

/// Controls one roller blind.
///
/// # Type Parameters
/// * `M` - Motion driver implementation type
/// * `S` - Persistent storage implementation type
pub struct BlindController<M: MotionDriver, S: Storage> {
    driver: M,
    store: ConfigStore<S>,
    keymap: IrKeymap,
    config: Configuration,
    state: MotionState,
}

impl<M: MotionDriver, S: Storage> BlindController<M, S> {
    /// Creates an idle controller, loading the configuration from `store`.
    ///
    /// If the store cannot be read the defaults are used (with
    /// `initialized == false`) and the controller runs anyway.
    pub fn new(driver: M, mut store: ConfigStore<S>, keymap: IrKeymap) -> Self {
        let config = match store.load() {
            Ok(config) => config,
            Err(err) => {
                warn!("configuration load failed: {}, using defaults", err);
                Configuration::default()
            }
        };

        info!(
            "travel {} ms, nudge {} ms, normal direction {}",
            config.travel_duration_ms,
            config.nudge_duration_ms,
            config.normal_direction
        );

        Self {
            driver,
            store,
            keymap,
            config,
            state: MotionState::Idle,
        }
    }

    /// Handles one IR frame without any way to cancel the resulting move.
    pub fn handle_event(&mut self, event: IrEvent) -> Outcome {
        self.handle_event_with(event, NeverAbort)
    }

    /// Handles one IR frame; `abort` can cancel the resulting move.
    ///
    /// Auto-repeat frames are ignored so holding a key does not re-trigger it.
    pub fn handle_event_with<A: AbortCheck>(&mut self, event: IrEvent, abort: A) -> Outcome {
        if event.repeat {
            return Outcome::Ignored;
        }

        let button = self.keymap.interpret_event(&event);
        self.handle_button(button, abort)
    }

    /// Takes the next frame from `source` and handles it.
    ///
    /// While the resulting move runs, `source` keeps being polled between
    /// pulses and a SHUTDOWN frame stops the motor.
    ///
    /// # Returns
    /// * `Some(outcome)` - A frame was pending
    /// * `None` - The source was empty
    pub fn poll<Src: IrSource>(&mut self, source: &mut Src) -> Option<Outcome> {
        let event = source.poll_event()?;
        let watch = ShutdownWatch {
            source,
            keymap: self.keymap,
        };
        Some(self.handle_event_with(event, watch))
    }

    /// Dispatches a decoded button.
    ///
    /// Always called from `Idle`: a move holds `&mut self` until it is over.
    pub fn handle_button<A: AbortCheck>(&mut self, button: ButtonCode, abort: A) -> Outcome {
        match button {
            ButtonCode::Up => self.run(MotionState::MovingUp, abort),
            ButtonCode::Down => self.run(MotionState::MovingDown, abort),
            ButtonCode::Left => self.run(MotionState::MovingLeftNudge, abort),
            ButtonCode::Right => self.run(MotionState::MovingRightNudge, abort),
            // Moves only return once idle again; SHUTDOWN during a move is
            // picked up by the abort check instead.
            ButtonCode::Shutdown => Outcome::Ignored,
            // TODO: give SET its own meaning (travel-time learning) once the
            // handset layout is settled; both keys toggle direction for now.
            ButtonCode::Set | ButtonCode::Direction => self.toggle_direction(),
            ButtonCode::Unknown => {
                debug!("unknown button");
                Outcome::Ignored
            }
        }
    }

    /// Halts the driver and forces `Idle`, whatever the current state.
    pub fn stop(&mut self) -> Outcome {
        let motion = self.state;
        self.state = MotionState::Idle;
        match self.driver.halt() {
            Ok(()) => Outcome::Stopped { motion, pulses: 0 },
            Err(fault) => self.fault(motion, fault),
        }
    }

    /// Sets and persists the full-travel duration.
    ///
    /// Zero is raised to 1 ms. The in-memory value changes even if the store
    /// fails, so the blind keeps using it until the next power cycle.
    pub fn set_travel_duration(&mut self, ms: u32) -> Result<(), StorageError> {
        let ms = ms.max(1);
        self.config.travel_duration_ms = ms;
        info!("travel duration set to {} ms", ms);
        self.store.save_travel_duration(ms).inspect_err(|err| {
            warn!("travel duration not persisted: {}", err);
        })
    }

    /// Returns the current motion state.
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Returns the configuration in use.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn keymap(&self) -> &IrKeymap {
        &self.keymap
    }

    pub fn driver(&self) -> &M {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut M {
        &mut self.driver
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    /// Direction and duration of a move.
    fn plan(&self, motion: MotionState) -> (Direction, u32) {
        let opening = Direction::from_flag(self.config.normal_direction);
        match motion {
            MotionState::MovingUp => (opening, self.config.travel_duration_ms),
            MotionState::MovingDown => (opening.inverted(), self.config.travel_duration_ms),
            MotionState::MovingLeftNudge => (opening, self.config.nudge_duration_ms),
            MotionState::MovingRightNudge => {
                (opening.inverted(), self.config.nudge_duration_ms)
            }
            MotionState::Idle => (opening, 0),
        }
    }

    fn run<A: AbortCheck>(&mut self, motion: MotionState, abort: A) -> Outcome {
        let (direction, duration_ms) = self.plan(motion);

        if let Err(fault) = self.driver.enable() {
            return self.fault(motion, fault);
        }
        if let Err(fault) = self.driver.set_direction(direction) {
            return self.fault(motion, fault);
        }

        self.state = motion;
        info!("{} {} for {} ms", motion, direction, duration_ms);

        let outcome = match self.driver.step_for(duration_ms, abort) {
            Ok(StepOutcome::Completed { pulses }) => match self.driver.disable() {
                Ok(()) => Outcome::Moved { motion, pulses },
                Err(fault) => return self.fault(motion, fault),
            },
            Ok(StepOutcome::Aborted { pulses }) => {
                info!("shutdown after {} pulses", pulses);
                match self.driver.halt() {
                    Ok(()) => Outcome::Stopped { motion, pulses },
                    Err(fault) => return self.fault(motion, fault),
                }
            }
            Ok(StepOutcome::NotMoved) => {
                warn!("driver did not move");
                let _ = self.driver.disable();
                Outcome::NotMoved { motion }
            }
            Err(fault) => return self.fault(motion, fault),
        };

        self.state = MotionState::Idle;
        outcome
    }

    fn fault(&mut self, motion: MotionState, fault: DriverFault) -> Outcome {
        warn!("driver fault during {}: {}", motion, fault);
        let _ = self.driver.disable();
        self.state = MotionState::Idle;
        Outcome::Faulted { motion, fault }
    }

    fn toggle_direction(&mut self) -> Outcome {
        let normal = !self.config.normal_direction;
        self.config.normal_direction = normal;

        let persisted = match self.store.save_direction(normal) {
            Ok(()) => true,
            Err(err) => {
                warn!("direction not persisted: {}", err);
                false
            }
        };

        info!("normal direction now {}", normal);
        Outcome::DirectionChanged { normal, persisted }
    }
}

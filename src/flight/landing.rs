//! "Must land" obligation held for as long as the vehicle is airborne.

use super::actuator::{Actuator, ActuatorError, ActuatorResult};

/// How the landing attempt at the end of a flight went.
#[derive(Clone, Debug, PartialEq)]
pub enum LandingStatus {
    /// Takeoff never succeeded, so no landing was needed
    NotAirborne,
    Landed,
    /// The landing command failed; reported, never re-raised
    Failed(ActuatorError),
}

/// Scoped airborne state.
///
/// Created by a successful takeoff. Landing is attempted exactly once:
/// either explicitly through [`land`](Self::land) or, if the obligation is
/// dropped without that (early return or panic unwinding), from `Drop`.
pub struct LandingObligation<'a> {
    actuator: &'a mut dyn Actuator,
    discharged: bool,
}

impl<'a> LandingObligation<'a> {
    /// Take off and acquire the obligation.
    pub fn takeoff(actuator: &'a mut dyn Actuator) -> ActuatorResult<Self> {
        actuator.takeoff()?;
        tracing::info!("Airborne");
        Ok(Self {
            actuator,
            discharged: false,
        })
    }

    /// The command link while airborne.
    pub fn actuator(&mut self) -> &mut (dyn Actuator + 'a) {
        &mut *self.actuator
    }

    /// Attempt the landing and release the obligation.
    pub fn land(mut self) -> LandingStatus {
        self.discharged = true;
        attempt_landing(&mut *self.actuator)
    }
}

impl Drop for LandingObligation<'_> {
    fn drop(&mut self) {
        if !self.discharged {
            self.discharged = true;
            tracing::warn!("Airborne state released without explicit landing");
            attempt_landing(&mut *self.actuator);
        }
    }
}

fn attempt_landing(actuator: &mut dyn Actuator) -> LandingStatus {
    tracing::info!("Landing...");
    match actuator.land() {
        Ok(()) => {
            tracing::info!("Landed");
            LandingStatus::Landed
        }
        Err(e) => {
            tracing::error!("Landing failed: {}", e);
            LandingStatus::Failed(e)
        }
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    aoi::{AoiData, AreaOfInterest},
    error::InputError,
    DepotId, DroneId,
};

fn default_speed() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Drone {
    pub id: DroneId,
    /// Maximum time/energy one trajectory may consume in one round.
    pub budget: f64,
    /// Distance units per time unit.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Every trajectory of this drone starts and ends here.
    pub depot: DepotId,
}

impl Drone {
    pub const fn new(id: DroneId, budget: f64, depot: DepotId) -> Self {
        Self {
            id,
            budget,
            speed: 1.0,
            depot,
        }
    }

    pub const fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn travel_time(&self, distance: f64) -> f64 {
        distance / self.speed
    }
}

/// Validated input of one planning run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "ScenarioData", into = "ScenarioData")]
pub struct Scenario {
    aoi: AreaOfInterest,
    drones: Vec<Drone>,
    rounds: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioData {
    pub aoi: AoiData,
    pub drones: Vec<Drone>,
    pub rounds: u32,
}

impl TryFrom<ScenarioData> for Scenario {
    type Error = InputError;

    fn try_from(data: ScenarioData) -> Result<Self, Self::Error> {
        Scenario::new(AreaOfInterest::try_from(data.aoi)?, data.drones, data.rounds)
    }
}

impl From<Scenario> for ScenarioData {
    fn from(scenario: Scenario) -> Self {
        ScenarioData {
            aoi: scenario.aoi.into(),
            drones: scenario.drones,
            rounds: scenario.rounds,
        }
    }
}

impl Scenario {
    pub fn new(aoi: AreaOfInterest, drones: Vec<Drone>, rounds: u32) -> Result<Self, InputError> {
        if rounds == 0 {
            return Err(InputError::NoRounds);
        }

        let mut ids = HashSet::new();
        for drone in drones.iter() {
            if !ids.insert(drone.id) {
                return Err(InputError::DuplicateDrone(drone.id));
            }
            // A zero budget is a valid, if useless, drone.
            if !drone.budget.is_finite() || drone.budget < 0.0 {
                return Err(InputError::InvalidBudget {
                    drone: drone.id,
                    budget: drone.budget,
                });
            }
            if !drone.speed.is_finite() || drone.speed <= 0.0 {
                return Err(InputError::InvalidSpeed {
                    drone: drone.id,
                    speed: drone.speed,
                });
            }
            if aoi.depot(drone.depot).is_none() {
                return Err(InputError::UnknownDepot {
                    drone: drone.id,
                    depot: drone.depot,
                });
            }
        }

        Ok(Self {
            aoi,
            drones,
            rounds,
        })
    }

    pub fn aoi(&self) -> &AreaOfInterest {
        &self.aoi
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{error::InputError, DepotId, Point, TargetId, EPSILON};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub loc: Point,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Depot {
    pub id: DepotId,
    pub loc: Point,
}

/// Axis-aligned rectangle. Containment is inclusive.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Boundary {
    pub min: Point,
    pub max: Point,
}

impl Boundary {
    /// A `width` x `height` rectangle anchored at the origin.
    pub const fn rect(width: f64, height: f64) -> Self {
        Self {
            min: Point::new(0.0, 0.0),
            max: Point::new(width, height),
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x - EPSILON
            && p.x <= self.max.x + EPSILON
            && p.y >= self.min.y - EPSILON
            && p.y <= self.max.y + EPSILON
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(try_from = "AoiData", into = "AoiData")]
pub struct AreaOfInterest {
    boundary: Boundary,
    targets: Vec<Target>,
    depots: Vec<Depot>,
    hovering_time: f64,
}

/// Unvalidated area description, as supplied by upstream collaborators.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AoiData {
    pub boundary: Boundary,
    pub targets: Vec<Target>,
    pub depots: Vec<Depot>,
    #[serde(default)]
    pub hovering_time: f64,
}

impl TryFrom<AoiData> for AreaOfInterest {
    type Error = InputError;

    fn try_from(data: AoiData) -> Result<Self, Self::Error> {
        AreaOfInterest::new(data.boundary, data.targets, data.depots, data.hovering_time)
    }
}

impl From<AreaOfInterest> for AoiData {
    fn from(aoi: AreaOfInterest) -> Self {
        AoiData {
            boundary: aoi.boundary,
            targets: aoi.targets,
            depots: aoi.depots,
            hovering_time: aoi.hovering_time,
        }
    }
}

impl AreaOfInterest {
    pub fn new(
        boundary: Boundary,
        targets: Vec<Target>,
        depots: Vec<Depot>,
        hovering_time: f64,
    ) -> Result<Self, InputError> {
        if !boundary.min.is_finite() || !boundary.max.is_finite() {
            return Err(InputError::NonFiniteCoordinate);
        }
        if boundary.width() < 0.0 || boundary.height() < 0.0 {
            return Err(InputError::InvalidBoundary);
        }
        if !hovering_time.is_finite() || hovering_time < 0.0 {
            return Err(InputError::InvalidHoveringTime(hovering_time));
        }

        let mut target_ids = HashSet::new();
        for (i, t) in targets.iter().enumerate() {
            if !t.loc.is_finite() {
                return Err(InputError::NonFiniteCoordinate);
            }
            if !target_ids.insert(t.id) {
                return Err(InputError::DuplicateTarget(t.id));
            }
            if !boundary.contains(&t.loc) {
                return Err(InputError::TargetOutOfBounds(t.id));
            }
            if let Some(other) = targets[..i].iter().find(|o| o.loc.eq_xy(&t.loc)) {
                return Err(InputError::DuplicateTargetLocation(other.id, t.id));
            }
        }

        let mut depot_ids = HashSet::new();
        for (i, d) in depots.iter().enumerate() {
            if !d.loc.is_finite() {
                return Err(InputError::NonFiniteCoordinate);
            }
            if !depot_ids.insert(d.id) {
                return Err(InputError::DuplicateDepot(d.id));
            }
            if !boundary.contains(&d.loc) {
                return Err(InputError::DepotOutOfBounds(d.id));
            }
            if let Some(other) = depots[..i].iter().find(|o| o.loc.eq_xy(&d.loc)) {
                return Err(InputError::DuplicateDepotLocation(other.id, d.id));
            }
            if let Some(t) = targets.iter().find(|t| t.loc.eq_xy(&d.loc)) {
                return Err(InputError::DepotOnTarget {
                    depot: d.id,
                    target: t.id,
                });
            }
        }

        Ok(Self {
            boundary,
            targets,
            depots,
            hovering_time,
        })
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn depots(&self) -> &[Depot] {
        &self.depots
    }

    pub fn num_targets(&self) -> usize {
        self.targets.len()
    }

    /// Time spent inspecting each target.
    pub fn hovering_time(&self) -> f64 {
        self.hovering_time
    }

    pub fn target(&self, idx: u32) -> Option<&Target> {
        self.targets.get(idx as usize)
    }

    pub fn target_loc(&self, idx: u32) -> Option<Point> {
        self.target(idx).map(|t| t.loc)
    }

    /// Dense index of the target with the given identifier.
    pub fn target_index(&self, id: TargetId) -> Option<u32> {
        self.targets
            .iter()
            .position(|t| t.id == id)
            .map(|i| i as u32)
    }

    pub fn depot(&self, id: DepotId) -> Option<&Depot> {
        self.depots.iter().find(|d| d.id == id)
    }
}

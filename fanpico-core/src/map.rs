//! Piecewise-linear maps used by the PWM, tacho, and temperature pipelines.
//!
//! Grounded in `original_source/src/pwm.c`'s `pwm_map()`, `src/tacho.c`'s
//! `tacho_map()`, and `src/sensors.c`'s `sensor_get_duty()` — all three are
//! the same algorithm over a different point type, so it is implemented
//! once here and reused.

use crate::board::MAX_MAP_POINTS;
use crate::error::{CoreError, CoreResult};
use heapless::Vec;
use serde::de::{Deserializer, Error as DeError};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// A strictly-monotonic (in `x`) set of up to [`MAX_MAP_POINTS`] `(x, y)`
/// pairs, with clamped extrapolation and linear interpolation between
/// points.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    points: Vec<(f32, f32), MAX_MAP_POINTS>,
}

impl Map {
    /// Builds a map from points, validating point count and strict
    /// monotonicity in `x` (§4.1 invariant).
    pub fn new(points: &[(f32, f32)]) -> CoreResult<Self> {
        if points.len() < 2 {
            return Err(CoreError::MapTooFewPoints);
        }
        if points.len() > MAX_MAP_POINTS {
            return Err(CoreError::MapTooManyPoints);
        }
        for w in points.windows(2) {
            if w[1].0 <= w[0].0 {
                return Err(CoreError::MapNotMonotonic);
            }
        }
        let mut v = Vec::new();
        for &p in points {
            // length already checked above, push cannot fail
            let _ = v.push(p);
        }
        Ok(Map { points: v })
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Evaluates the map at `x`: clamps to the first/last point's `y` when
    /// `x` falls outside the table, otherwise linearly interpolates
    /// between the bracketing points.
    pub fn apply(&self, x: f32) -> f32 {
        let pts = &self.points;
        if x <= pts[0].0 {
            return pts[0].1;
        }
        let last = pts.len() - 1;
        if x >= pts[last].0 {
            return pts[last].1;
        }
        let mut i = 0;
        while i < pts.len() && pts[i].0 < x {
            i += 1;
        }
        let (x0, y0) = pts[i - 1];
        let (x1, y1) = pts[i];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

impl Serialize for Map {
    /// Encodes as a JSON array of `[x, y]` pairs, matching
    /// `pwm_map2json`/`tacho_map2json`'s point-array shape.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.points.len()))?;
        for &(x, y) in &self.points {
            seq.serialize_element(&[x, y])?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Map {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Vec<[f32; 2], MAX_MAP_POINTS> = Deserialize::deserialize(deserializer)?;
        let points: Vec<(f32, f32), MAX_MAP_POINTS> = raw.iter().map(|p| (p[0], p[1])).collect();
        Map::new(&points).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_map() -> Map {
        Map::new(&[(0.0, 0.0), (50.0, 50.0), (100.0, 100.0)]).unwrap()
    }

    #[test]
    fn rejects_too_few_points() {
        assert_eq!(Map::new(&[(0.0, 0.0)]), Err(CoreError::MapTooFewPoints));
    }

    #[test]
    fn rejects_non_monotonic() {
        assert_eq!(
            Map::new(&[(0.0, 0.0), (10.0, 10.0), (5.0, 20.0)]),
            Err(CoreError::MapNotMonotonic)
        );
    }

    #[test]
    fn clamps_below_and_above() {
        let m = linear_map();
        assert_eq!(m.apply(-10.0), 0.0);
        assert_eq!(m.apply(200.0), 100.0);
    }

    #[test]
    fn interpolates_between_points() {
        let m = linear_map();
        assert_eq!(m.apply(25.0), 25.0);
    }

    #[test]
    fn boundary_points_are_exact() {
        let m = Map::new(&[(0.0, 10.0), (30.0, 90.0), (40.0, 20.0)]).unwrap();
        assert_eq!(m.apply(0.0), 10.0);
        assert_eq!(m.apply(30.0), 90.0);
        assert_eq!(m.apply(40.0), 20.0);
    }
}

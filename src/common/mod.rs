//! Common types shared across the patrol

use nalgebra::{Point2, Quaternion, UnitQuaternion};

use crate::error::PatrolError;

/// Tolerance on the quaternion norm of a waypoint orientation
const UNIT_NORM_TOLERANCE: f64 = 1e-2;

/// A fixed target pose on the map.
///
/// Only the planar part of the pose is stored: the position on the floor and
/// the rotation about the vertical axis, as the `z`/`w` quaternion components.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointGoal {
    pub frame_id: String,
    pub x: f64,
    pub y: f64,
    pub qz: f64,
    pub qw: f64,
}

impl WaypointGoal {
    /// Create a waypoint, rejecting non-finite values and non-unit orientations
    pub fn new(frame_id: &str, x: f64, y: f64, qz: f64, qw: f64) -> Result<Self, PatrolError> {
        if ![x, y, qz, qw].iter().all(|v| v.is_finite()) {
            return Err(PatrolError::InvalidWaypoint(format!(
                "non-finite value in ({x}, {y}, {qz}, {qw})"
            )));
        }

        let norm = (qz * qz + qw * qw).sqrt();
        if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(PatrolError::InvalidWaypoint(format!(
                "orientation ({qz}, {qw}) has norm {norm:.4}"
            )));
        }

        if frame_id.is_empty() {
            return Err(PatrolError::InvalidWaypoint("empty frame id".to_string()));
        }

        Ok(Self::literal(frame_id, x, y, qz, qw))
    }

    fn literal(frame_id: &str, x: f64, y: f64, qz: f64, qw: f64) -> Self {
        WaypointGoal {
            frame_id: frame_id.to_string(),
            x,
            y,
            qz,
            qw,
        }
    }

    /// First cardboard site
    pub fn cardboard_site_1() -> Self {
        Self::literal("map", -14.6, 3.2199, -0.731, 0.6825)
    }

    /// Second cardboard site
    pub fn cardboard_site_2() -> Self {
        Self::literal("map", -0.076, 4.738, -0.735, 0.6778)
    }

    /// Approach pose in front of the docking station
    pub fn dock() -> Self {
        Self::literal("map", -1.053, -0.123, 0.055, 0.998)
    }

    /// Position on the floor
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Heading about the vertical axis in radians
    pub fn yaw(&self) -> f64 {
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(self.qw, 0.0, 0.0, self.qz));
        rotation.euler_angles().2
    }

    /// Straight-line distance to another waypoint in the same frame
    pub fn distance_to(&self, other: &WaypointGoal) -> f64 {
        nalgebra::distance(&self.position(), &other.position())
    }
}

impl std::fmt::Display for WaypointGoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] x={:.3}, y={:.3}, yaw={:.1}deg",
            self.frame_id,
            self.x,
            self.y,
            self.yaw().to_degrees()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_waypoints_are_valid() {
        for wp in [
            WaypointGoal::cardboard_site_1(),
            WaypointGoal::cardboard_site_2(),
            WaypointGoal::dock(),
        ] {
            let checked = WaypointGoal::new(&wp.frame_id, wp.x, wp.y, wp.qz, wp.qw).unwrap();
            assert_eq!(checked, wp);
        }
    }

    #[test]
    fn rejects_non_unit_orientation() {
        assert!(matches!(
            WaypointGoal::new("map", 0.0, 0.0, 0.5, 0.5),
            Err(PatrolError::InvalidWaypoint(_))
        ));
    }

    #[test]
    fn rejects_nan_position() {
        assert!(WaypointGoal::new("map", f64::NAN, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn yaw_of_dock_is_small_and_positive() {
        let yaw = WaypointGoal::dock().yaw();
        assert!(yaw > 0.1 && yaw < 0.12, "yaw = {yaw}");
    }

    #[test]
    fn cardboard_sites_face_negative_y() {
        let yaw = WaypointGoal::cardboard_site_1().yaw();
        assert!(yaw < -1.5 && yaw > -1.7, "yaw = {yaw}");
    }

    #[test]
    fn distance_between_sites() {
        let d = WaypointGoal::cardboard_site_1().distance_to(&WaypointGoal::cardboard_site_2());
        assert!((d - 14.602).abs() < 0.01, "distance = {d}");
    }
}

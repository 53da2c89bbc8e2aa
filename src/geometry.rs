use nalgebra::{IsometryMatrix3, Matrix3, Point2, Point3, Rotation3, Translation3, Vector3};

use crate::error::BoussinesqError;

/// Zero threshold for areas and shape parameters
pub const DEGENERACY_TOLERANCE: f64 = 10.0 * f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    CounterClockwise,
    Clockwise,
    Degenerate,
}

impl Orientation {
    /// +1, -1 or 0
    pub fn sign(&self) -> i32 {
        match self {
            Orientation::CounterClockwise => 1,
            Orientation::Clockwise => -1,
            Orientation::Degenerate => 0,
        }
    }
}

/// Calculates the signed area of a planar triangle
///
/// # Returns
/// The area, positive when the vertices run counter-clockwise
pub fn signed_area_2d(p1: &Point2<f64>, p2: &Point2<f64>, p3: &Point2<f64>) -> f64 {
    let u1 = p2 - p1;
    let u2 = p3 - p1;
    (u1.x * u2.y - u1.y * u2.x) / 2.0
}

/// Calculates the area vector of a triangle in space
///
/// # Returns
/// A vector with the triangle's area as magnitude, normal to the triangle by
/// the right-hand rule over the vertex order
pub fn area_vector_3d(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> Vector3<f64> {
    let u1 = p2 - p1;
    let u2 = p3 - p1;
    u1.cross(&u2) / 2.0
}

/// Classifies the winding of a planar triangle. Areas within
/// `DEGENERACY_TOLERANCE` of zero count as degenerate.
pub fn orientation_2d(p1: &Point2<f64>, p2: &Point2<f64>, p3: &Point2<f64>) -> Orientation {
    let signed_area = signed_area_2d(p1, p2, p3);

    if signed_area > DEGENERACY_TOLERANCE {
        Orientation::CounterClockwise
    } else if signed_area < -DEGENERACY_TOLERANCE {
        Orientation::Clockwise
    } else {
        Orientation::Degenerate
    }
}

/// Rigid frame attached to a triangle and an evaluation point.
///
/// The origin is the projection of the evaluation point onto the triangle's
/// plane, x runs along the first edge, z along the triangle normal and y
/// completes a right-handed basis. In local coordinates every vertex has
/// z = 0 and the evaluation point sits at (0, 0, h), h being its signed
/// distance from the plane.
#[derive(Debug, Clone)]
pub struct LocalFrame {
    world_from_local: IsometryMatrix3<f64>,
    local_from_world: IsometryMatrix3<f64>,
}

impl LocalFrame {
    /// Builds the frame of triangle `(p1, p2, p3)` seen from `eval_point`
    ///
    /// # Returns
    /// The frame, or `DegenerateTriangle` when the edges are (nearly) parallel
    pub fn new(
        p1: &Point3<f64>,
        p2: &Point3<f64>,
        p3: &Point3<f64>,
        eval_point: &Point3<f64>,
    ) -> Result<LocalFrame, BoussinesqError> {
        let u1 = p2 - p1;
        let u2 = p3 - p1;
        let normal = u1.cross(&u2);

        if normal.norm() <= DEGENERACY_TOLERANCE {
            return Err(BoussinesqError::DegenerateTriangle(format!(
                "triangle ({}, {}, {}), ({}, {}, {}), ({}, {}, {}) has no area",
                p1.x, p1.y, p1.z, p2.x, p2.y, p2.z, p3.x, p3.y, p3.z
            )));
        }

        let z_axis = normal.normalize();
        let x_axis = u1.normalize();
        let y_axis = z_axis.cross(&x_axis);

        let rotation =
            Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x_axis, y_axis, z_axis]));
        let origin = eval_point + z_axis * z_axis.dot(&(p1 - eval_point));

        let world_from_local =
            IsometryMatrix3::from_parts(Translation3::from(origin.coords), rotation);

        Ok(LocalFrame {
            world_from_local,
            local_from_world: world_from_local.inverse(),
        })
    }

    pub fn world_from_local(&self) -> &IsometryMatrix3<f64> {
        &self.world_from_local
    }

    pub fn to_local(&self, point: &Point3<f64>) -> Point3<f64> {
        self.local_from_world * point
    }

    pub fn to_world(&self, point: &Point3<f64>) -> Point3<f64> {
        self.world_from_local * point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sample_triangles() -> Vec<[Point2<f64>; 3]> {
        vec![
            [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
            [Point2::new(-2.0, 3.5), Point2::new(4.0, -1.0), Point2::new(0.3, 0.7)],
            [Point2::new(1e3, 1e3), Point2::new(1e3 + 2.0, 1e3), Point2::new(1e3, 1e3 - 5.0)],
        ]
    }

    #[test]
    fn test_signed_area_antisymmetry() {
        for [p1, p2, p3] in sample_triangles() {
            let forward = signed_area_2d(&p1, &p2, &p3);
            let reversed = signed_area_2d(&p1, &p3, &p2);
            assert!(forward.abs() > 0.0);
            assert_relative_eq!(forward, -reversed, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_signed_area_unit_triangle() {
        let area = signed_area_2d(
            &Point2::new(0.0, 0.0),
            &Point2::new(1.0, 0.0),
            &Point2::new(0.0, 1.0),
        );
        assert_relative_eq!(area, 0.5);
    }

    #[test]
    fn test_area_vector_permutations() {
        let p1 = Point3::new(0.2, -1.0, 3.0);
        let p2 = Point3::new(2.0, 0.5, -1.0);
        let p3 = Point3::new(-0.7, 1.2, 0.4);

        let a = area_vector_3d(&p1, &p2, &p3);
        let cyclic_1 = area_vector_3d(&p2, &p3, &p1);
        let cyclic_2 = area_vector_3d(&p3, &p1, &p2);
        let swapped = area_vector_3d(&p2, &p1, &p3);

        assert_relative_eq!(a.norm(), cyclic_1.norm(), max_relative = 1e-12);
        assert_relative_eq!(a.norm(), cyclic_2.norm(), max_relative = 1e-12);
        assert_relative_eq!(a, cyclic_1, epsilon = 1e-12);
        assert_relative_eq!(a, -swapped, epsilon = 1e-12);
    }

    #[test]
    fn test_orientation_unit_triangle() {
        let p1 = Point2::new(0.0, 0.0);
        let p2 = Point2::new(1.0, 0.0);
        let p3 = Point2::new(0.0, 1.0);

        assert_eq!(orientation_2d(&p1, &p2, &p3), Orientation::CounterClockwise);
        assert_eq!(orientation_2d(&p1, &p2, &p3).sign(), 1);
        assert_eq!(orientation_2d(&p1, &p3, &p2), Orientation::Clockwise);
        assert_eq!(orientation_2d(&p1, &p3, &p2).sign(), -1);
    }

    #[test]
    fn test_orientation_tolerance_band() {
        let p1 = Point2::new(0.0, 0.0);
        let p2 = Point2::new(1.0, 0.0);
        let on_line = Point2::new(0.5, 0.0);
        let above = Point2::new(0.5, 5.0 * f64::EPSILON);
        let below = Point2::new(0.5, -5.0 * f64::EPSILON);

        assert_eq!(orientation_2d(&p1, &p2, &on_line), Orientation::Degenerate);
        assert_eq!(orientation_2d(&p1, &p2, &above), Orientation::Degenerate);
        assert_eq!(orientation_2d(&p1, &p2, &below), Orientation::Degenerate);
        assert_eq!(orientation_2d(&p1, &p2, &above).sign(), 0);
    }

    #[test]
    fn test_frame_rigidity() {
        let p1 = Point3::new(0.3, -0.2, 1.0);
        let p2 = Point3::new(2.1, 0.4, 0.5);
        let p3 = Point3::new(0.9, 1.7, 2.2);
        let eval_point = Point3::new(-1.5, 2.0, 4.0);

        let frame = LocalFrame::new(&p1, &p2, &p3, &eval_point).unwrap();
        let rotation = frame.world_from_local().rotation.matrix();

        for i in 0..3 {
            assert_relative_eq!(rotation.column(i).norm(), 1.0, epsilon = 1e-12);
            for j in (i + 1)..3 {
                assert_abs_diff_eq!(rotation.column(i).dot(&rotation.column(j)), 0.0, epsilon = 1e-12);
            }
        }
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-12);

        // Independent plane distance: n . (x - p1) with n the unit normal
        let normal = (p2 - p1).cross(&(p3 - p1)).normalize();
        let distance = normal.dot(&(eval_point - p1));

        let local_eval = frame.to_local(&eval_point);
        assert_relative_eq!(local_eval.z, distance, epsilon = 1e-12);
        assert_abs_diff_eq!(local_eval.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(local_eval.y, 0.0, epsilon = 1e-12);

        for p in [p1, p2, p3] {
            let local = frame.to_local(&p);
            assert_abs_diff_eq!(local.z, 0.0, epsilon = 1e-12);
            assert_relative_eq!(frame.to_world(&local), p, epsilon = 1e-12);
        }

        // First edge lies along local x
        let edge = frame.to_local(&p2) - frame.to_local(&p1);
        assert_abs_diff_eq!(edge.y, 0.0, epsilon = 1e-12);
        assert!(edge.x > 0.0);
    }

    #[test]
    fn test_frame_below_plane_has_negative_height() {
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 0.0, 0.0);
        let p3 = Point3::new(0.0, 1.0, 0.0);

        let frame = LocalFrame::new(&p1, &p2, &p3, &Point3::new(0.2, 0.2, -3.0)).unwrap();
        assert_relative_eq!(frame.to_local(&Point3::new(0.2, 0.2, -3.0)).z, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_rejects_degenerate_triangle() {
        let p1 = Point3::new(0.0, 0.0, 0.0);
        let p2 = Point3::new(1.0, 1.0, 1.0);
        let p3 = Point3::new(2.0, 2.0, 2.0);

        let result = LocalFrame::new(&p1, &p2, &p3, &Point3::new(0.0, 0.0, 1.0));
        assert!(matches!(result, Err(BoussinesqError::DegenerateTriangle(_))));
    }
}

//! Volumes under a linearly interpolated field over a triangle, for
//! triangles where the field changes sign.
//!
//! Vertex values are heights above the triangle; the field crosses zero on
//! an edge at the point found by linear interpolation of the end values.

use nalgebra::Point3;

use crate::geometry::area_vector_3d;

pub fn tetrahedron_volume(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>, height: f64) -> f64 {
    area_vector_3d(p1, p2, p3).norm() * height / 3.0
}

/// Volume of a pyramid over a trapezoid with parallel sides `length_1` and
/// `length_2` a distance `trapezoid_height` apart
pub fn pyramid_with_trapezoid_base_volume(
    length_1: f64,
    length_2: f64,
    trapezoid_height: f64,
    pyramid_height: f64,
) -> f64 {
    let base_area = (length_1 + length_2) * trapezoid_height / 2.0;
    base_area * pyramid_height / 3.0
}

/// Where the field crosses zero on the edge from `from` to `to`
fn zero_crossing(from: &Point3<f64>, value_from: f64, to: &Point3<f64>, value_to: f64) -> Point3<f64> {
    let ratio = value_from.abs() / (value_from.abs() + value_to.abs());
    from + (to - from) * ratio
}

/// Volume under the field over the part of the triangle on the side of
/// `p1_in` and `p2_in`, where `p3_out` carries the opposite sign
///
/// # Returns
/// The volume of the clipped solid, using absolute field values as heights
pub fn volume_excluding_one_node(
    p1_in: &Point3<f64>,
    value_1: f64,
    p2_in: &Point3<f64>,
    value_2: f64,
    p3_out: &Point3<f64>,
    value_3: f64,
) -> f64 {
    let cut_p1p3 = zero_crossing(p1_in, value_1, p3_out, value_3);
    let cut_p2p3 = zero_crossing(p2_in, value_2, p3_out, value_3);

    let tetrahedron = tetrahedron_volume(p1_in, &cut_p2p3, &cut_p1p3, value_1.abs());

    // Pyramid with apex at cut_p2p3 over the vertical face above p1p2
    let edge_length = (p2_in - p1_in).norm();
    let distance_to_edge = area_vector_3d(p1_in, p2_in, &cut_p2p3).norm() * 2.0 / edge_length;
    let pyramid = pyramid_with_trapezoid_base_volume(
        value_1.abs(),
        value_2.abs(),
        distance_to_edge,
        edge_length,
    );

    tetrahedron + pyramid
}

/// Volume under the field over the corner of the triangle at `p3_in`, where
/// `p1_out` and `p2_out` carry the opposite sign
pub fn volume_excluding_two_node(
    p1_out: &Point3<f64>,
    value_1: f64,
    p2_out: &Point3<f64>,
    value_2: f64,
    p3_in: &Point3<f64>,
    value_3: f64,
) -> f64 {
    let cut_p1p3 = zero_crossing(p1_out, value_1, p3_in, value_3);
    let cut_p2p3 = zero_crossing(p2_out, value_2, p3_in, value_3);

    tetrahedron_volume(p3_in, &cut_p1p3, &cut_p2p3, value_3.abs())
}

/// Volume under the positive part of the field over the triangle
///
/// # Arguments
/// * `points` - The triangle's vertices
/// * `values` - The field sampled at each vertex
pub fn positive_volume(points: &[Point3<f64>; 3], values: &[f64; 3]) -> f64 {
    let positive: Vec<usize> = (0..3).filter(|&i| values[i] > 0.0).collect();

    match positive.len() {
        0 => 0.0,
        1 => {
            let i = positive[0];
            let (j, k) = ((i + 1) % 3, (i + 2) % 3);
            volume_excluding_two_node(
                &points[j], values[j], &points[k], values[k], &points[i], values[i],
            )
        }
        2 => {
            let out = (0..3).find(|i| !positive.contains(i)).unwrap_or(0);
            let (i, j) = ((out + 1) % 3, (out + 2) % 3);
            volume_excluding_one_node(
                &points[i], values[i], &points[j], values[j], &points[out], values[out],
            )
        }
        _ => {
            let area = area_vector_3d(&points[0], &points[1], &points[2]).norm();
            area * values.iter().sum::<f64>() / 3.0
        }
    }
}

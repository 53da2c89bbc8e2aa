//! Per-triangle compliance.
//!
//! The normal displacement at a point A a height `h` above a loaded triangle is
//! `k ∫ p(x) / r dA` with `r = |x - A|`. With the pressure interpolated
//! linearly from the vertices, each vertex's share follows from the three
//! moments `∫ 1/r`, `∫ x/r` and `∫ y/r` over the triangle, which are
//! evaluated exactly by splitting the triangle into the signed sectors it
//! subtends at the projection of A.

use nalgebra::{Point2, Vector2, Vector3};

use crate::{
    error::BoussinesqError,
    geometry::{orientation_2d, signed_area_2d, Orientation, DEGENERACY_TOLERANCE},
    integrals::{j_0_0, ShapeParameter},
};

/// Sectors whose far edge passes closer to the origin than this fraction of
/// the edge's reach are dropped. Their angles sit within round-off of ±π/2.
const SLIVER_RATIO: f64 = 1e-10;

/// Maps local-frame triangle geometry to per-vertex compliance
pub trait TriangleCompliance {
    /// Computes the compliance of each vertex of a triangle
    ///
    /// # Arguments
    /// * `height` - Signed distance from the triangle's plane to the evaluation point
    /// * `p1`, `p2`, `p3` - Vertices in the triangle frame, whose origin is
    ///     the projection of the evaluation point
    /// * `k_const` - The elastic compliance constant
    ///
    /// # Returns
    /// One coefficient per vertex, in vertex order
    fn evaluate(
        &self,
        height: f64,
        p1: &Point2<f64>,
        p2: &Point2<f64>,
        p3: &Point2<f64>,
        k_const: f64,
    ) -> Result<Vector3<f64>, BoussinesqError>;
}

/// Exact Boussinesq compliance for linearly interpolated pressure
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticTriangleCompliance;

impl TriangleCompliance for AnalyticTriangleCompliance {
    fn evaluate(
        &self,
        height: f64,
        p1: &Point2<f64>,
        p2: &Point2<f64>,
        p3: &Point2<f64>,
        k_const: f64,
    ) -> Result<Vector3<f64>, BoussinesqError> {
        let area = signed_area_2d(p1, p2, p3);
        if area.abs() <= DEGENERACY_TOLERANCE {
            return Err(BoussinesqError::DegenerateTriangle(format!(
                "local triangle ({}, {}), ({}, {}), ({}, {}) has no area",
                p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
            )));
        }

        let vertices = [p1, p2, p3];
        let mut moments = Vector3::zeros();
        for i in 0..3 {
            moments += sector_moments(vertices[i], vertices[(i + 1) % 3], height)?;
        }

        // Hat function of vertex i: (a + b x + c y) / (2 area)
        let mut compliance = Vector3::zeros();
        for i in 0..3 {
            let pj = vertices[(i + 1) % 3];
            let pk = vertices[(i + 2) % 3];

            let shape = Vector3::new(pj.x * pk.y - pk.x * pj.y, pj.y - pk.y, pk.x - pj.x);
            compliance[i] = k_const * shape.dot(&moments) / (2.0 * area.abs());
        }

        Ok(compliance)
    }
}

/// Signed moments `(∫ 1/r, ∫ x/r, ∫ y/r)` over the triangle (origin, p, q).
///
/// The sector is integrated in polar coordinates with θ measured from the
/// foot of the perpendicular dropped from the origin onto line pq, so the
/// far edge is `ρ = d sec θ`.
pub fn sector_moments(
    p: &Point2<f64>,
    q: &Point2<f64>,
    height: f64,
) -> Result<Vector3<f64>, BoussinesqError> {
    if orientation_2d(&Point2::origin(), p, q) == Orientation::Degenerate {
        return Ok(Vector3::zeros());
    }

    // Twice the sector area over the base, signed by orientation
    let edge = q - p;
    let signed_distance = p.coords.perp(&q.coords) / edge.norm();
    let d = signed_distance.abs();

    let reach = p.coords.norm().max(q.coords.norm());
    if d <= SLIVER_RATIO * reach {
        return Ok(Vector3::zeros());
    }

    let normal = Vector2::new(edge.y, -edge.x).normalize() * signed_distance.signum();
    let tangent = Vector2::new(-normal.y, normal.x);
    let theta_0 = f64::atan2(p.coords.dot(&tangent), d);
    let theta_f = f64::atan2(q.coords.dot(&tangent), d);

    let h = height.abs();
    let shape = ShapeParameter::from_sides(h, d)?;
    let slant = h.hypot(d);
    let secant_term = shape.i_0_m1_p1(theta_0, theta_f);

    let zeroth = slant * secant_term - h * j_0_0(theta_0, theta_f);
    let mut along_normal = d * slant * secant_term;
    let mut along_tangent = d * slant * shape.i_1_m2_p1(theta_0, theta_f);

    // Logarithmic terms from ∫ ρ²/r dρ, which vanish with h
    if shape.alpha() > DEGENERACY_TOLERANCE {
        let log_term = |theta: f64| {
            let radius = d / theta.cos();
            ((radius + radius.hypot(h)) / h).ln()
        };
        let (g_0, g_f) = (log_term(theta_0), log_term(theta_f));
        let ratio = shape.complement();

        along_normal -= h
            * h
            * (theta_f.sin() * g_f - theta_0.sin() * g_0
                - ratio * shape.i_2_m1_pm1(theta_0, theta_f)?);
        along_tangent -= h
            * h
            * (theta_0.cos() * g_0 - theta_f.cos() * g_f
                + ratio * shape.i_1_0_pm1(theta_0, theta_f)?);
    }
    along_normal /= 2.0;
    along_tangent /= 2.0;

    let first = normal * along_normal + tangent * along_tangent;
    Ok(Vector3::new(zeroth, first.x, first.y))
}

//! Closed-form angular integrals for the triangle potential.
//!
//! `J(m, n)` denotes `∫ sin^m(θ) cos^n(θ) dθ` and `I(m, n; Pk)` denotes
//! `∫ sin^m(θ) cos^n(θ) (1 - α² sin²(θ))^(k/2) dθ`, each evaluated between
//! `theta_0` and `theta_f`. The shape parameter α must lie in (-1, 1); at
//! α = 0 the `I` family collapses onto the `J` family.
//!
//! The antiderivatives are written in terms of `1 - α² sin²(θ)` and the
//! complement `sqrt(1 - α²)` rather than `cos 2θ` and `1 / α² - 1`, which
//! keeps them accurate as |θ| approaches π/2 and |α| approaches 1.
//!
//! All angles must satisfy |θ| < π/2.

use crate::{error::BoussinesqError, geometry::DEGENERACY_TOLERANCE};

/// `ln|sec θ + tan θ|`, evaluated without cancellation for negative θ
fn log_secant(theta: f64) -> f64 {
    let sin = theta.sin();
    ((1.0 + sin.abs()) / theta.cos()).ln().copysign(sin)
}

/// `J(0, -1) = ln|sec θ + tan θ|` between the two angles
pub fn j_0_m1(theta_0: f64, theta_f: f64) -> f64 {
    log_secant(theta_f) - log_secant(theta_0)
}

/// `J(1, -2) = sec θ` between the two angles
pub fn j_1_m2(theta_0: f64, theta_f: f64) -> f64 {
    1.0 / theta_f.cos() - 1.0 / theta_0.cos()
}

pub fn j_0_0(theta_0: f64, theta_f: f64) -> f64 {
    theta_f - theta_0
}

fn check_shape_parameter(alpha: f64, integral: &str) -> Result<(), BoussinesqError> {
    if !alpha.is_finite() || alpha.abs() >= 1.0 {
        return Err(BoussinesqError::IntegralDomain(format!(
            "{integral} needs |alpha| < 1, got {alpha}"
        )));
    }
    Ok(())
}

fn check_away_from_zero(alpha: f64, integral: &str) -> Result<(), BoussinesqError> {
    if alpha.abs() < DEGENERACY_TOLERANCE {
        return Err(BoussinesqError::IntegralDomain(format!(
            "{integral} has a pole at alpha = 0, got {alpha}"
        )));
    }
    Ok(())
}

/// The shape parameter α paired with its complement `sqrt(1 - α²)`
///
/// Close to |α| = 1 the complement cannot be recovered from α without
/// cancellation, so callers that know both from geometry should build the
/// pair with [`ShapeParameter::from_sides`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParameter {
    alpha: f64,
    complement: f64,
}

impl ShapeParameter {
    /// Builds the pair from α alone
    pub fn new(alpha: f64) -> Result<Self, BoussinesqError> {
        check_shape_parameter(alpha, "shape parameter")?;
        Ok(Self::from_checked(alpha))
    }

    /// Builds the pair for a point at `height` above a line that lies
    /// `distance` away within the plane, i.e. `α = h / sqrt(d² + h²)`
    pub fn from_sides(height: f64, distance: f64) -> Result<Self, BoussinesqError> {
        let slant = height.hypot(distance);
        if !slant.is_finite() || distance.abs() <= 0.0 {
            return Err(BoussinesqError::IntegralDomain(format!(
                "shape parameter needs a finite height and a nonzero distance, \
                 got h = {height}, d = {distance}"
            )));
        }
        Ok(Self {
            alpha: height / slant,
            complement: distance.abs() / slant,
        })
    }

    fn from_checked(alpha: f64) -> Self {
        Self {
            alpha,
            complement: ((1.0 - alpha) * (1.0 + alpha)).sqrt(),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn complement(&self) -> f64 {
        self.complement
    }

    /// `sqrt(1 - α² sin² θ)`
    fn radical(&self, theta: f64) -> f64 {
        let sin = theta.sin();
        theta.cos().hypot(self.complement * sin)
    }

    /// `asin(α sin θ)`
    fn asin_term(&self, theta: f64) -> f64 {
        f64::atan2(self.alpha * theta.sin(), self.radical(theta))
    }

    /// `atanh(sqrt(1 - α²) sin θ / sqrt(1 - α² sin² θ))`, shared by
    /// `I(0, -1; P1)` and `I(2, -1; P-1)`
    fn atanh_term(&self, theta: f64) -> f64 {
        let sin = theta.sin();
        ((self.radical(theta) + self.complement * sin.abs()) / theta.cos())
            .ln()
            .copysign(sin)
    }

    /// `asinh(α sqrt(1 - α²) cos θ / (α² - 1))`, shared by `I(1, -2; P1)`
    /// and `I(1, 0; P-1)`
    fn asinh_term(&self, theta: f64) -> f64 {
        (-self.alpha * theta.cos() / self.complement).asinh()
    }

    /// `I(0, -1; P1)`. Falls back to `J(0, -1)` as α goes to zero.
    pub fn i_0_m1_p1(&self, theta_0: f64, theta_f: f64) -> f64 {
        if self.alpha.abs() < DEGENERACY_TOLERANCE {
            return j_0_m1(theta_0, theta_f);
        }

        let antiderivative = |theta: f64| {
            self.alpha * self.asin_term(theta) + self.complement * self.atanh_term(theta)
        };
        antiderivative(theta_f) - antiderivative(theta_0)
    }

    /// `I(1, -2; P1)`. Falls back to `J(1, -2)` as α goes to zero.
    pub fn i_1_m2_p1(&self, theta_0: f64, theta_f: f64) -> f64 {
        if self.alpha.abs() < DEGENERACY_TOLERANCE {
            return j_1_m2(theta_0, theta_f);
        }

        let antiderivative = |theta: f64| {
            let cos = theta.cos();
            self.alpha * self.asinh_term(theta) + self.complement.hypot(self.alpha * cos) / cos
        };
        antiderivative(theta_f) - antiderivative(theta_0)
    }

    /// `I(2, -1; P-1)`. Undefined at α = 0.
    pub fn i_2_m1_pm1(&self, theta_0: f64, theta_f: f64) -> Result<f64, BoussinesqError> {
        check_away_from_zero(self.alpha, "I(2,-1;P-1)")?;

        let antiderivative = |theta: f64| {
            -self.asin_term(theta) / self.alpha + self.atanh_term(theta) / self.complement
        };
        Ok(antiderivative(theta_f) - antiderivative(theta_0))
    }

    /// `I(1, 0; P-1)`. Undefined at α = 0.
    pub fn i_1_0_pm1(&self, theta_0: f64, theta_f: f64) -> Result<f64, BoussinesqError> {
        check_away_from_zero(self.alpha, "I(1,0;P-1)")?;

        let antiderivative = |theta: f64| self.asinh_term(theta) / self.alpha;
        Ok(antiderivative(theta_f) - antiderivative(theta_0))
    }
}

/// `I(0, -1; P1)`. Falls back to `J(0, -1)` as α goes to zero.
pub fn i_0_m1_p1(theta_0: f64, theta_f: f64, alpha: f64) -> Result<f64, BoussinesqError> {
    check_shape_parameter(alpha, "I(0,-1;P1)")?;
    Ok(ShapeParameter::from_checked(alpha).i_0_m1_p1(theta_0, theta_f))
}

/// `I(1, -2; P1)`. Falls back to `J(1, -2)` as α goes to zero.
pub fn i_1_m2_p1(theta_0: f64, theta_f: f64, alpha: f64) -> Result<f64, BoussinesqError> {
    check_shape_parameter(alpha, "I(1,-2;P1)")?;
    Ok(ShapeParameter::from_checked(alpha).i_1_m2_p1(theta_0, theta_f))
}

/// `I(2, -1; P-1)`. Undefined at α = 0.
pub fn i_2_m1_pm1(theta_0: f64, theta_f: f64, alpha: f64) -> Result<f64, BoussinesqError> {
    check_shape_parameter(alpha, "I(2,-1;P-1)")?;
    ShapeParameter::from_checked(alpha).i_2_m1_pm1(theta_0, theta_f)
}

/// `I(1, 0; P-1)`. Undefined at α = 0.
pub fn i_1_0_pm1(theta_0: f64, theta_f: f64, alpha: f64) -> Result<f64, BoussinesqError> {
    check_shape_parameter(alpha, "I(1,0;P-1)")?;
    ShapeParameter::from_checked(alpha).i_1_0_pm1(theta_0, theta_f)
}

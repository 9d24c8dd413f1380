use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

/// Internal distortion models used by camera implementations
#[derive(Debug, Clone, PartialEq)]
pub(super) enum DistortionModel {
    /// 8-term rational radial + tangential model:
    /// radial = (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
    Rational {
        k1: f64,
        k2: f64,
        p1: f64,
        p2: f64,
        k3: f64,
        k4: f64,
        k5: f64,
        k6: f64,
    },
    /// Kannala-Brandt equidistant fisheye model
    Fisheye {
        k1: f64,
        k2: f64,
        k3: f64,
        k4: f64,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistortionError {
    #[error("Singular Jacobian while inverting distortion")]
    SingularJacobian,

    #[error("Distortion inversion did not converge")]
    NonConvergent,
}

type Result<T> = std::result::Result<T, DistortionError>;

const MAX_ITERATIONS: usize = 20;
const TOLERANCE: f64 = 1e-12;

impl DistortionModel {
    /// Build the rational model from the 8-term coefficient layout
    /// `[k1, k2, p1, p2, k3, k4, k5, k6]`.
    pub(super) fn rational(coeffs: [f64; 8]) -> Self {
        let [k1, k2, p1, p2, k3, k4, k5, k6] = coeffs;
        DistortionModel::Rational {
            k1,
            k2,
            p1,
            p2,
            k3,
            k4,
            k5,
            k6,
        }
    }

    /// Apply distortion to normalized image coordinates
    pub(super) fn distort(&self, x_norm: f64, y_norm: f64) -> (f64, f64) {
        match self {
            DistortionModel::Rational {
                k1,
                k2,
                p1,
                p2,
                k3,
                k4,
                k5,
                k6,
            } => {
                let x2 = x_norm * x_norm;
                let y2 = y_norm * y_norm;
                let r2 = x2 + y2;
                let xy2 = 2.0 * x_norm * y_norm;

                let radial = (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2)
                    / (1.0 + ((k6 * r2 + k5) * r2 + k4) * r2);

                let x_dist = x_norm * radial + p1 * xy2 + p2 * (r2 + 2.0 * x2);
                let y_dist = y_norm * radial + p1 * (r2 + 2.0 * y2) + p2 * xy2;

                (x_dist, y_dist)
            }

            DistortionModel::Fisheye { k1, k2, k3, k4 } => {
                let r = (x_norm * x_norm + y_norm * y_norm).sqrt();
                if r < 1e-8 {
                    return (x_norm, y_norm);
                }

                let theta = r.atan();
                let theta2 = theta * theta;
                let theta4 = theta2 * theta2;
                let theta6 = theta4 * theta2;
                let theta8 = theta4 * theta4;

                let theta_d = theta * (1.0 + k1 * theta2 + k2 * theta4 + k3 * theta6 + k4 * theta8);
                let scale = theta_d / r;

                (x_norm * scale, y_norm * scale)
            }
        }
    }

    /// Remove distortion from normalized image coordinates
    pub(super) fn undistort(&self, x_dist: f64, y_dist: f64) -> Result<(f64, f64)> {
        match self {
            DistortionModel::Rational { .. } => self.undistort_newton(x_dist, y_dist),
            DistortionModel::Fisheye { k1, k2, k3, k4 } => {
                let theta_d = (x_dist * x_dist + y_dist * y_dist).sqrt().min(FRAC_PI_2);
                if theta_d < 1e-8 {
                    return Ok((x_dist, y_dist));
                }

                // Solve theta * (1 + k1 θ² + k2 θ⁴ + k3 θ⁶ + k4 θ⁸) = theta_d
                let mut theta = theta_d;
                let mut converged = false;
                for _ in 0..MAX_ITERATIONS {
                    let theta2 = theta * theta;
                    let theta4 = theta2 * theta2;
                    let theta6 = theta4 * theta2;
                    let theta8 = theta4 * theta4;

                    let value = theta * (1.0 + k1 * theta2 + k2 * theta4 + k3 * theta6 + k4 * theta8);
                    let slope = 1.0
                        + 3.0 * k1 * theta2
                        + 5.0 * k2 * theta4
                        + 7.0 * k3 * theta6
                        + 9.0 * k4 * theta8;
                    if slope.abs() < 1e-18 {
                        return Err(DistortionError::SingularJacobian);
                    }

                    let step = (value - theta_d) / slope;
                    theta -= step;
                    if step.abs() < TOLERANCE {
                        converged = true;
                        break;
                    }
                }

                if !converged || theta < 0.0 || theta >= FRAC_PI_2 {
                    return Err(DistortionError::NonConvergent);
                }

                let scale = theta.tan() / theta_d;
                Ok((x_dist * scale, y_dist * scale))
            }
        }
    }

    /// Newton-Raphson inversion with a finite-difference Jacobian
    fn undistort_newton(&self, x_dist: f64, y_dist: f64) -> Result<(f64, f64)> {
        let mut x = x_dist;
        let mut y = y_dist;

        for _ in 0..MAX_ITERATIONS {
            let (fx, fy) = self.distort(x, y);
            let rx = x_dist - fx;
            let ry = y_dist - fy;

            if rx.abs() < TOLERANCE && ry.abs() < TOLERANCE {
                return Ok((x, y));
            }

            let eps = 1e-7;
            let (fx_x, fy_x) = self.distort(x + eps, y);
            let (fx_y, fy_y) = self.distort(x, y + eps);

            let j11 = (fx_x - fx) / eps;
            let j21 = (fy_x - fy) / eps;
            let j12 = (fx_y - fx) / eps;
            let j22 = (fy_y - fy) / eps;

            // Solve J * [dx, dy]^T = [rx, ry]^T
            let det = j11 * j22 - j12 * j21;
            if det.abs() < 1e-18 {
                return Err(DistortionError::SingularJacobian);
            }

            x += (j22 * rx - j12 * ry) / det;
            y += (-j21 * rx + j11 * ry) / det;
        }

        // Finite differences can stall just above the tolerance
        let (fx, fy) = self.distort(x, y);
        if (x_dist - fx).abs() < 1e-9 && (y_dist - fy).abs() < 1e-9 {
            return Ok((x, y));
        }

        Err(DistortionError::NonConvergent)
    }
}

#[cfg(test)]
mod tests {
    use super::{DistortionError, DistortionModel};

    #[test]
    fn zero_rational_is_identity() {
        let m = DistortionModel::rational([0.0; 8]);
        let (xd, yd) = m.distort(0.123, -0.456);
        assert_eq!((xd, yd), (0.123, -0.456));
        let (xu, yu) = m.undistort(0.123, -0.456).unwrap();
        assert!((xu - 0.123).abs() < 1e-12);
        assert!((yu + 0.456).abs() < 1e-12);
    }

    #[test]
    fn rational_round_trip() {
        let m = DistortionModel::rational([-0.1, 0.01, 0.001, -0.001, 0.0, 0.02, 0.0, 0.0]);
        let (x, y) = (0.2, -0.15);
        let (xd, yd) = m.distort(x, y);
        let (xu, yu) = m.undistort(xd, yd).unwrap();
        assert!((x - xu).abs() < 1e-8);
        assert!((y - yu).abs() < 1e-8);
    }

    #[test]
    fn rational_denominator_term() {
        // k4 sits in the denominator of the radial factor
        let m = DistortionModel::rational([0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let (xd, _) = m.distort(1.0, 0.0);
        assert!((xd - 0.5).abs() < 1e-12);
    }

    #[test]
    fn fisheye_round_trip() {
        let m = DistortionModel::Fisheye {
            k1: 0.01,
            k2: 0.001,
            k3: 0.0,
            k4: 0.0,
        };
        let (x, y) = (0.3, 0.1);
        let (xd, yd) = m.distort(x, y);
        let (xu, yu) = m.undistort(xd, yd).unwrap();
        assert!((x - xu).abs() < 1e-9);
        assert!((y - yu).abs() < 1e-9);
    }

    #[test]
    fn fisheye_zero_coefficients_is_equidistant() {
        let m = DistortionModel::Fisheye {
            k1: 0.0,
            k2: 0.0,
            k3: 0.0,
            k4: 0.0,
        };
        let (xd, yd) = m.distort(1.0, 0.0);
        assert!((xd - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert_eq!(yd, 0.0);
    }

    #[test]
    fn signals_non_convergence() {
        let m = DistortionModel::rational([1e6, 1e6, 1.0, -1.0, 1e6, 0.0, 0.0, 0.0]);
        let res = m.undistort(10.0, 10.0);
        assert!(matches!(
            res,
            Err(DistortionError::NonConvergent) | Err(DistortionError::SingularJacobian)
        ));
    }
}

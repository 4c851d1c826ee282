// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::linear_system::{DEFAULT_MAX_PIXELS, LinearSystem};
#[allow(unused_imports)]
use crate::util::tracing_wrappers::*;

/// Pivots smaller than this, relative to the largest pivot, count as zero.
const SINGULAR_PIVOT_THRESHOLD: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverOptions {
    /// Tikhonov term `λ`: when set, `(AᵀA + λI) x = Aᵀb` is solved instead
    /// of `A x = b`. Off by default.
    pub damping: Option<f64>,
    /// Largest channel (in pixels) accepted for the dense solve.
    pub max_pixels: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            damping: None,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Dense LU solver for [`LinearSystem`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemSolver {
    options: SolverOptions,
}

impl SystemSolver {
    pub fn new(options: SolverOptions) -> SystemSolver {
        SystemSolver { options }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solves the system and reshapes the solution into a channel. Consumes
    /// the system so the dense matrix is freed as soon as the solve is done.
    #[instrument(level = "debug", skip_all, err)]
    pub fn solve(&self, system: LinearSystem) -> Result<Image<f64>> {
        let size = system.channel_size();
        let n = system.dim();
        if n > self.options.max_pixels {
            return Err(Error::SystemTooLarge(n, self.options.max_pixels));
        }
        if system.matrix.nrows() != n || system.matrix.ncols() != n {
            return Err(Error::InvalidArgument(format!(
                "system matrix is {}x{}, expected {n}x{n}",
                system.matrix.nrows(),
                system.matrix.ncols()
            )));
        }
        let LinearSystem { matrix, rhs, .. } = system;
        let x = match self.options.damping {
            None => lu_solve(matrix, &rhs)?,
            Some(lambda) => {
                if !lambda.is_finite() || lambda < 0.0 {
                    return Err(Error::InvalidArgument(format!(
                        "damping must be finite and non-negative, got {lambda}"
                    )));
                }
                debug!(lambda, "solving damped normal equations");
                let mut normal = matrix.tr_mul(&matrix);
                for i in 0..n {
                    normal[(i, i)] += lambda;
                }
                let projected_rhs = matrix.tr_mul(&rhs);
                drop(matrix);
                lu_solve(normal, &projected_rhs)?
            }
        };
        Image::from_vec(size, x.as_slice().to_vec())
    }
}

fn lu_solve(matrix: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>> {
    let n = rhs.len();
    let lu = matrix.lu();
    let pivots = lu.u().diagonal();
    let max_pivot = pivots.amax();
    let min_pivot = pivots.iter().fold(f64::INFINITY, |m, p| m.min(p.abs()));
    trace!(n, max_pivot, min_pivot, "LU factorization done");
    let singular = !max_pivot.is_finite()
        || max_pivot == 0.0
        || min_pivot.is_nan()
        || min_pivot <= SINGULAR_PIVOT_THRESHOLD * max_pivot;
    if singular {
        return Err(Error::SingularSystem {
            pivot: min_pivot,
            size: n,
        });
    }
    let x = lu.solve(rhs).ok_or(Error::SingularSystem {
        pivot: min_pivot,
        size: n,
    })?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::SingularSystem {
            pivot: min_pivot,
            size: n,
        });
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::kernel::Kernel;
    use crate::linear_system::{EdgePolicy, LinearSystemBuilder};
    use crate::util::test::{assert_images_almost_eq, random_channel, seeded_rng};

    #[test]
    fn identity_system_returns_input() -> Result<()> {
        let channel = random_channel((6, 5), &mut seeded_rng(11));
        let system = LinearSystemBuilder::default().build(&channel, &Kernel::identity())?;
        let solved = SystemSolver::default().solve(system)?;
        assert_images_almost_eq(&solved, &channel, 1e-9);
        Ok(())
    }

    #[test]
    fn undoes_a_blur() -> Result<()> {
        let kernel = Kernel::from_rows(&[[0.0, 0.1, 0.0], [0.1, 0.6, 0.1], [0.0, 0.1, 0.0]])?;
        let original = random_channel((8, 8), &mut seeded_rng(5));
        for policy in [EdgePolicy::Skip, EdgePolicy::Mirror] {
            let blurred = kernel.convolve(&original, policy)?;
            let system = LinearSystemBuilder::new(policy).build(&blurred, &kernel)?;
            let solved = SystemSolver::default().solve(system)?;
            assert_images_almost_eq(&solved, &original, 1e-6);
        }
        Ok(())
    }

    #[test]
    fn zero_kernel_is_singular() -> Result<()> {
        let kernel = Kernel::from_rows(&[[0.0, 0.0, 0.0]])?;
        let channel = random_channel((4, 4), &mut seeded_rng(2));
        let system = LinearSystemBuilder::default().build(&channel, &kernel)?;
        let result = SystemSolver::default().solve(system);
        assert!(matches!(result, Err(Error::SingularSystem { size: 16, .. })));
        Ok(())
    }

    #[test]
    fn mirrored_box_blur_is_singular() -> Result<()> {
        // Alternating columns are in the null space of a mirrored 1x3 box
        // blur on a width-3 channel: [1, -2, 1] maps to zero.
        let kernel = Kernel::from_rows(&[[1.0, 1.0, 1.0]])?;
        let channel = random_channel((3, 1), &mut seeded_rng(2));
        let system = LinearSystemBuilder::new(EdgePolicy::Mirror).build(&channel, &kernel)?;
        assert!(matches!(
            SystemSolver::default().solve(system),
            Err(Error::SingularSystem { .. })
        ));
        Ok(())
    }

    #[test]
    fn damping_regularizes_a_singular_system() -> Result<()> {
        let kernel = Kernel::from_rows(&[[1.0, 1.0, 1.0]])?;
        let channel = Image::new_with_value((3, 1), 3.0)?;
        let system = LinearSystemBuilder::new(EdgePolicy::Mirror).build(&channel, &kernel)?;
        let solver = SystemSolver::new(SolverOptions {
            damping: Some(1e-6),
            ..Default::default()
        });
        let solved = solver.solve(system)?;
        // The minimum-norm solution of a flat 3 is a flat 1.
        assert_images_almost_eq(&solved, &Image::new_with_value((3, 1), 1.0)?, 1e-4);
        Ok(())
    }

    #[test]
    fn negative_damping_is_rejected() -> Result<()> {
        let channel = Image::new_with_value((2, 2), 1.0)?;
        let system = LinearSystemBuilder::default().build(&channel, &Kernel::identity())?;
        let solver = SystemSolver::new(SolverOptions {
            damping: Some(-1.0),
            ..Default::default()
        });
        assert!(matches!(solver.solve(system), Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn system_over_the_pixel_limit_is_rejected() -> Result<()> {
        let channel = Image::new_with_value((2, 2), 1.0)?;
        let system = LinearSystemBuilder::default().build(&channel, &Kernel::identity())?;
        let solver = SystemSolver::new(SolverOptions {
            max_pixels: 3,
            ..Default::default()
        });
        assert!(matches!(solver.solve(system), Err(Error::SystemTooLarge(4, 3))));
        Ok(())
    }
}

// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod geometry;

use geometry::{SurfaceFrame, surface_param};

use crate::block::{BLOCK_SIZE, CoefficientBlock, QuantizationBlock};
use crate::error::{Error, Result};
use crate::util::{Vec64, add, dot, norm, scale, sub};
#[allow(unused_imports)]
use crate::util::tracing_wrappers::*;

/// Uncertainty ellipsoid of one quantized block: every coefficient may sit
/// anywhere within `radii[i]` of `center[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct EllipsoidModel {
    center: Vec64,
    radii: Vec64,
}

impl EllipsoidModel {
    /// Ellipsoid around the likely bin center of `point`. Each coordinate is
    /// pulled toward zero by half its bound, rounded up, but never past zero.
    pub fn new(point: &CoefficientBlock, quant: &QuantizationBlock) -> Result<EllipsoidModel> {
        let center = array_init::array_init(|i| {
            let p = point.0[i];
            let half = quant.0[i].div_ceil(2) as f64;
            p - p.signum() * p.abs().min(half)
        });
        Self::from_parts(center, quant.0.map(f64::from))
    }

    pub fn from_parts(center: [f64; BLOCK_SIZE], radii: [f64; BLOCK_SIZE]) -> Result<EllipsoidModel> {
        if let Some(axis) = radii.iter().position(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(Error::DegenerateEllipsoid(axis));
        }
        Ok(EllipsoidModel { center, radii })
    }

    pub fn center(&self) -> &[f64; BLOCK_SIZE] {
        &self.center
    }

    pub fn radii(&self) -> &[f64; BLOCK_SIZE] {
        &self.radii
    }

    /// `Σ ((p - center) / radii)²`: below 1 inside, 1 on the surface.
    pub fn level(&self, p: &[f64; BLOCK_SIZE]) -> f64 {
        (0..BLOCK_SIZE)
            .map(|i| ((p[i] - self.center[i]) / self.radii[i]).powi(2))
            .sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectorOptions {
    /// Largest accepted angle, in radians, between the surface normal at the
    /// result and the direction to the projected point.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for ProjectorOptions {
    fn default() -> Self {
        ProjectorOptions {
            tolerance: 0.005,
            max_iterations: 256,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionResult {
    /// Closest surface point found, in absolute coefficient units.
    pub coefficients: CoefficientBlock,
    pub iterations: usize,
}

/// DC values closer to zero than this cannot anchor a rescale.
const MIN_RESCALE_DC: f64 = 1e-9;

impl ProjectionResult {
    /// Uniformly rescales the projected block so its DC equals `dc`. A
    /// projected DC of (numerically) zero leaves the block unchanged.
    pub fn rescaled_to_dc(&self, dc: f64) -> CoefficientBlock {
        let projected = self.coefficients.dc();
        if projected.abs() < MIN_RESCALE_DC {
            trace!(projected, dc, "skipping DC rescale");
            return self.coefficients;
        }
        self.coefficients.scaled(dc / projected)
    }
}

/// Fraction of an axis' radius the guess is moved along it to leave a
/// stationary point that is not a distance minimum.
const SADDLE_NUDGE: f64 = 0.1;

/// For an interior target at `normal_distance < 0` from the frame's point,
/// returns the tangent axis, shortest radius first, along which the surface
/// bends more sharply than the sphere around the target. Distance to the
/// target then decreases when moving along that axis. Tiny violations are
/// ignored, as rotationally symmetric bounds have flat directions there.
fn bulging_axis(frame: &SurfaceFrame, radii: &Vec64, normal_distance: f64) -> Option<usize> {
    if normal_distance >= 0.0 {
        return None;
    }
    (0..BLOCK_SIZE)
        .filter(|&axis| {
            frame
                .normal_curvature_along(radii, axis)
                .is_some_and(|kappa| 1.0 + normal_distance * kappa < -1e-3)
        })
        .min_by(|&a, &b| radii[a].total_cmp(&radii[b]))
}

/// Finds the point on a block's uncertainty ellipsoid closest to the block,
/// by repeatedly stepping onto per-axis osculating spheres.
#[derive(Clone, Copy, Debug, Default)]
pub struct EllipsoidProjector {
    options: ProjectorOptions,
}

impl EllipsoidProjector {
    pub fn new(options: ProjectorOptions) -> EllipsoidProjector {
        EllipsoidProjector { options }
    }

    pub fn options(&self) -> &ProjectorOptions {
        &self.options
    }

    pub fn project(&self, block: &CoefficientBlock, quant: &QuantizationBlock) -> Result<ProjectionResult> {
        let model = EllipsoidModel::new(block, quant)?;
        self.project_onto(&model, block)
    }

    pub fn project_onto(&self, model: &EllipsoidModel, point: &CoefficientBlock) -> Result<ProjectionResult> {
        let radii = &model.radii;
        let target = sub(&point.0, &model.center);
        let into_block = |local: &Vec64| CoefficientBlock(add(local, &model.center));

        let Some(mut guess) = surface_param(radii, &target) else {
            // The target is the center: the nearest surface points are the
            // ends of the shortest axis.
            let axis = (0..BLOCK_SIZE)
                .min_by(|&a, &b| radii[a].total_cmp(&radii[b]))
                .unwrap_or(0);
            let mut local = [0.0; BLOCK_SIZE];
            local[axis] = radii[axis];
            return Ok(ProjectionResult {
                coefficients: into_block(&local),
                iterations: 0,
            });
        };

        let on_surface = 1e-9 * radii.iter().fold(0.0f64, |m, r| m.max(*r));
        let mut error = f64::INFINITY;
        for iteration in 0..=self.options.max_iterations {
            let frame = SurfaceFrame::at(radii, &guess).ok_or(Error::ProjectionDidNotConverge {
                iterations: iteration,
                error,
            })?;
            let offset = sub(&target, &guess);
            let distance = norm(&offset);
            if distance <= on_surface {
                trace!(iteration, "target is on the surface");
                return Ok(ProjectionResult {
                    coefficients: into_block(&guess),
                    iterations: iteration,
                });
            }
            let normal_distance = dot(&frame.normal, &offset);
            // Interior targets have the normal pointing away from them.
            error = (normal_distance.abs() / distance).min(1.0).acos();
            if error <= self.options.tolerance {
                let Some(axis) = bulging_axis(&frame, radii, normal_distance) else {
                    trace!(iteration, error, "projection converged");
                    return Ok(ProjectionResult {
                        coefficients: into_block(&guess),
                        iterations: iteration,
                    });
                };
                if iteration == self.options.max_iterations {
                    break;
                }
                // Stationary but not nearest: the surface curves around the
                // target along `axis`. Slide off toward the target's side.
                trace!(iteration, axis, "leaving a distance saddle");
                let side = if target[axis] < 0.0 { -1.0 } else { 1.0 };
                let mut nudged = guess;
                nudged[axis] += side * SADDLE_NUDGE * radii[axis];
                guess = surface_param(radii, &nudged).ok_or(Error::ProjectionDidNotConverge {
                    iterations: iteration,
                    error,
                })?;
                continue;
            }
            if iteration == self.options.max_iterations {
                break;
            }

            let tangential = sub(&offset, &scale(&frame.normal, normal_distance));
            let step: Vec64 = array_init::array_init(|i| {
                let rho = frame.radii_of_curvature[i];
                tangential[i] * rho / (rho + normal_distance).max(0.5 * rho)
            });
            guess = surface_param(radii, &add(&guess, &step)).ok_or(
                Error::ProjectionDidNotConverge {
                    iterations: iteration,
                    error,
                },
            )?;
        }
        debug!(error, "projection hit the iteration cap");
        Err(Error::ProjectionDidNotConverge {
            iterations: self.options.max_iterations,
            error,
        })
    }
}

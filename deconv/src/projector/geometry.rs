// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Differential geometry of an axis-aligned ellipsoid `Σ x[i]² / r[i]² = 1`
//! centered at the origin.

use crate::block::BLOCK_SIZE;
use crate::util::{Vec64, normalize};

/// Point where the ray along `direction` leaves the ellipsoid, i.e.
/// `direction / sqrt(Σ direction[i]² / radii[i]²)`. `None` for a zero direction.
pub fn surface_param(radii: &[f64; BLOCK_SIZE], direction: &[f64; BLOCK_SIZE]) -> Option<[f64; BLOCK_SIZE]> {
    let level: f64 = direction
        .iter()
        .zip(radii.iter())
        .map(|(n, r)| (n / r) * (n / r))
        .sum();
    if level == 0.0 || !level.is_finite() {
        return None;
    }
    let inv = 1.0 / level.sqrt();
    Some(direction.map(|n| n * inv))
}

/// Ratio `normal[b2] / normal[b1]` of the outward normal at surface point `p`.
/// Equivalently, minus the slope `dx[b1] / dx[b2]` of the section ellipse in
/// the `(b1, b2)` plane.
pub fn norm(radii: &[f64; BLOCK_SIZE], p: &[f64; BLOCK_SIZE], b1: usize, b2: usize) -> f64 {
    p[b2] * radii[b1] * radii[b1] / (p[b1] * radii[b2] * radii[b2])
}

/// Curvature at `p` of the ellipse cut from the ellipsoid by the plane of
/// axes `b1` and `b2` through `p`.
///
/// The other axes use up `k = Σ_{i≠b1,b2} p[i]² / r[i]²` of the level, which
/// shrinks both semi-axes of the section by `sqrt(1 - k)`.
pub fn curvature(radii: &[f64; BLOCK_SIZE], p: &[f64; BLOCK_SIZE], b1: usize, b2: usize) -> f64 {
    let k: f64 = (0..BLOCK_SIZE)
        .filter(|&i| i != b1 && i != b2)
        .map(|i| (p[i] / radii[i]) * (p[i] / radii[i]))
        .sum();
    let shrink = (1.0 - k).max(0.0).sqrt();
    let a = radii[b1] * shrink;
    let b = radii[b2] * shrink;
    let t = (p[b2] / b).atan2(p[b1] / a);
    let (sin, cos) = t.sin_cos();
    a * b / (a * a * sin * sin + b * b * cos * cos).powf(1.5)
}

/// Local second-order model of the surface at one point: the unit outward
/// normal and, per axis, the radius of the osculating sphere along it.
#[derive(Debug, Clone)]
pub(crate) struct SurfaceFrame {
    pub normal: Vec64,
    pub radii_of_curvature: Vec64,
    gradient_norm: f64,
}

impl SurfaceFrame {
    /// `p` must lie on the surface.
    ///
    /// Each axis' radius is built from the `(dominant, b)` plane section with
    /// [`norm`] and [`curvature`], so the step follows the per-plane
    /// osculating construction. For an axis-aligned ellipsoid this reduces to
    /// `r[b]² · |p / r²|`, which `osculating_radii_match_closed_form` checks.
    pub fn at(radii: &Vec64, p: &Vec64) -> Option<SurfaceFrame> {
        let gradient: Vec64 = array_init::array_init(|i| p[i] / (radii[i] * radii[i]));
        let gradient_norm = crate::util::norm(&gradient);
        let normal = normalize(&gradient)?;
        // The axis with the largest normal component keeps every `norm` in [-1, 1].
        let dominant = (0..BLOCK_SIZE)
            .max_by(|&a, &b| gradient[a].abs().total_cmp(&gradient[b].abs()))
            .unwrap_or(0);
        let ra2 = radii[dominant] * radii[dominant];

        let radii_of_curvature = array_init::array_init(|b| {
            let closed_form = radii[b] * radii[b] * gradient_norm;
            if b == dominant {
                return closed_form;
            }
            // Meusnier: the section curvature projected on the surface normal
            // is the normal curvature along the section's tangent. Removing
            // the dominant axis' share of that tangent leaves axis `b` alone.
            let slope = norm(radii, p, dominant, b);
            let cos_phi = gradient[dominant].abs() * slope.hypot(1.0) / gradient_norm;
            let inverse = curvature(radii, p, dominant, b) * cos_phi * (1.0 + slope * slope)
                - slope * slope / (ra2 * gradient_norm);
            let rho = 1.0 / inverse;
            // Sections through a point near the rim collapse; the closed form
            // is exact there.
            if rho.is_finite() && rho > 0.0 {
                rho
            } else {
                closed_form
            }
        });
        Some(SurfaceFrame {
            normal,
            radii_of_curvature,
            gradient_norm,
        })
    }

    /// Normal curvature at `p` along the projection of axis `axis` onto the
    /// tangent plane, `Σ t[i]² / r[i]² / |p / r²|` for the unit tangent `t`.
    /// `None` when the axis is (nearly) the normal itself.
    pub fn normal_curvature_along(&self, radii: &Vec64, axis: usize) -> Option<f64> {
        let along = self.normal[axis];
        let tangent_len2 = 1.0 - along * along;
        if tangent_len2 <= 1e-12 {
            return None;
        }
        let bend: f64 = (0..BLOCK_SIZE)
            .map(|i| {
                let t = if i == axis { 1.0 } else { 0.0 } - along * self.normal[i];
                (t / radii[i]) * (t / radii[i])
            })
            .sum();
        Some(bend / tangent_len2 / self.gradient_norm)
    }
}

#[cfg(test)]
mod tests {
    use arbtest::arbitrary::Unstructured;
    use test_log::test;

    use super::*;
    use crate::util::test::assert_almost_eq;

    fn arbitrary_radii(u: &mut Unstructured) -> arbtest::arbitrary::Result<Vec64> {
        let mut radii = [0.0; BLOCK_SIZE];
        for r in radii.iter_mut() {
            *r = u.int_in_range(1..=255u16)? as f64;
        }
        Ok(radii)
    }

    fn arbitrary_direction(u: &mut Unstructured) -> arbtest::arbitrary::Result<Vec64> {
        let mut direction = [0.0; BLOCK_SIZE];
        for d in direction.iter_mut() {
            *d = u.int_in_range(-1000..=1000i32)? as f64 / 100.0;
        }
        direction[u.choose_index(BLOCK_SIZE)?] = 1.0;
        Ok(direction)
    }

    fn level(radii: &Vec64, p: &Vec64) -> f64 {
        (0..BLOCK_SIZE).map(|i| (p[i] / radii[i]).powi(2)).sum()
    }

    #[test]
    fn surface_param_lands_on_surface() {
        arbtest::arbtest(|u| {
            let radii = arbitrary_radii(u)?;
            let direction = normalize(&arbitrary_direction(u)?).unwrap();
            let p = surface_param(&radii, &direction).unwrap();
            assert_almost_eq!(level(&radii, &p), 1.0, 1e-12);
            // Same ray.
            let q = normalize(&p).unwrap();
            assert_almost_eq!(crate::util::dot(&q, &direction), 1.0, 1e-12);
            Ok(())
        });
    }

    #[test]
    fn zero_direction_has_no_surface_point() {
        assert!(surface_param(&[1.0; BLOCK_SIZE], &[0.0; BLOCK_SIZE]).is_none());
    }

    #[test]
    fn circle_section_curvature() {
        let radii = [2.0; BLOCK_SIZE];
        let mut p = [0.0; BLOCK_SIZE];
        p[0] = 2.0_f64.sqrt();
        p[1] = 2.0_f64.sqrt();
        assert_almost_eq!(curvature(&radii, &p, 0, 1), 0.5, 1e-12);
        assert_almost_eq!(norm(&radii, &p, 0, 1), 1.0, 1e-12);
        // Section through a point lifted along a third axis is a smaller circle.
        let mut lifted = [0.0; BLOCK_SIZE];
        lifted[0] = 1.0;
        lifted[5] = 3.0_f64.sqrt();
        assert_almost_eq!(curvature(&radii, &lifted, 0, 1), 1.0, 1e-12);
    }

    #[test]
    fn ellipse_vertex_curvature() {
        let mut radii = [1.0; BLOCK_SIZE];
        radii[0] = 3.0;
        radii[1] = 2.0;
        let mut p = [0.0; BLOCK_SIZE];
        p[0] = 3.0;
        // At the end of the major axis, κ = a / b².
        assert_almost_eq!(curvature(&radii, &p, 0, 1), 3.0 / 4.0, 1e-12);
        p[0] = 0.0;
        p[1] = 2.0;
        assert_almost_eq!(curvature(&radii, &p, 0, 1), 2.0 / 9.0, 1e-12);
        assert_almost_eq!(norm(&radii, &p, 1, 0), 0.0, 1e-12);
    }

    #[test]
    fn osculating_radii_match_closed_form() {
        arbtest::arbtest(|u| {
            let radii = arbitrary_radii(u)?;
            let p = surface_param(&radii, &arbitrary_direction(u)?).unwrap();
            let frame = SurfaceFrame::at(&radii, &p).unwrap();
            let gradient: Vec64 = array_init::array_init(|i| p[i] / (radii[i] * radii[i]));
            let gradient_norm = crate::util::norm(&gradient);
            for b in 0..BLOCK_SIZE {
                let expected = radii[b] * radii[b] * gradient_norm;
                assert_almost_eq!(frame.radii_of_curvature[b], expected, 1e-9 * expected);
            }
            assert_almost_eq!(crate::util::norm(&frame.normal), 1.0, 1e-12);
            Ok(())
        });
    }

    #[test]
    fn vertex_normal_curvatures() {
        let mut radii = [1.0; BLOCK_SIZE];
        radii[0] = 8.0;
        radii[1] = 2.0;
        let mut p = [0.0; BLOCK_SIZE];
        p[0] = 8.0;
        let frame = SurfaceFrame::at(&radii, &p).unwrap();
        // At the end of axis a, the principal curvature along axis b is r[a] / r[b]².
        assert!(frame.normal_curvature_along(&radii, 0).is_none());
        assert_almost_eq!(frame.normal_curvature_along(&radii, 1).unwrap(), 2.0, 1e-12);
        assert_almost_eq!(frame.normal_curvature_along(&radii, 7).unwrap(), 8.0, 1e-12);
    }
}

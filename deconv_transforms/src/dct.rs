// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Orthonormal 8x8 DCT-II and its inverse.
//!
//! Blocks are stored row-major: sample `(x, y)` lives at `x + 8 * y`, and
//! coefficient `(u, v)` (horizontal, vertical frequency) at `u + 8 * v`. The
//! DC coefficient is index 0 and equals `8 * mean` of the block.

use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::sync::OnceLock;

use crate::{BLOCK_DIM, BLOCK_SIZE};

type Matrix = [[f64; BLOCK_DIM]; BLOCK_DIM];

#[inline(always)]
fn alpha(u: usize) -> f64 {
    if u == 0 { FRAC_1_SQRT_2 } else { 1.0 }
}

/// `m[u][y]`: weight of sample `y` in frequency `u`. Rows are orthonormal.
fn dct_matrix() -> &'static Matrix {
    static MATRIX: OnceLock<Matrix> = OnceLock::new();
    MATRIX.get_or_init(|| {
        let scale = (2.0 / BLOCK_DIM as f64).sqrt();
        let mut m = [[0.0; BLOCK_DIM]; BLOCK_DIM];
        for (u, row) in m.iter_mut().enumerate() {
            let alpha_u = alpha(u);
            for (y, coeff) in row.iter_mut().enumerate() {
                *coeff =
                    alpha_u * scale * ((y as f64 + 0.5) * u as f64 * PI / BLOCK_DIM as f64).cos();
            }
        }
        m
    })
}

/// 1D DCT along `stride`-separated lanes. `transpose` selects the inverse.
#[inline(always)]
fn transform_lanes(data: &mut [f64; BLOCK_SIZE], stride: usize, step: usize, transpose: bool) {
    let m = dct_matrix();
    for lane in 0..BLOCK_DIM {
        let base = lane * step;
        let mut input = [0.0; BLOCK_DIM];
        for i in 0..BLOCK_DIM {
            input[i] = data[base + i * stride];
        }
        for k in 0..BLOCK_DIM {
            let mut sum = 0.0;
            for i in 0..BLOCK_DIM {
                let w = if transpose { m[i][k] } else { m[k][i] };
                sum += w * input[i];
            }
            data[base + k * stride] = sum;
        }
    }
}

pub fn dct1d_8(input: &[f64; BLOCK_DIM]) -> [f64; BLOCK_DIM] {
    let m = dct_matrix();
    std::array::from_fn(|u| (0..BLOCK_DIM).map(|y| m[u][y] * input[y]).sum())
}

pub fn idct1d_8(input: &[f64; BLOCK_DIM]) -> [f64; BLOCK_DIM] {
    let m = dct_matrix();
    std::array::from_fn(|y| (0..BLOCK_DIM).map(|u| m[u][y] * input[u]).sum())
}

/// Forward 2D transform of one spatial block.
pub fn dct2d_8x8(samples: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
    let mut data = *samples;
    // Rows first (stride 1, one lane per row), then columns.
    transform_lanes(&mut data, 1, BLOCK_DIM, false);
    transform_lanes(&mut data, BLOCK_DIM, 1, false);
    data
}

/// Inverse of [`dct2d_8x8`].
pub fn idct2d_8x8(coefficients: &[f64; BLOCK_SIZE]) -> [f64; BLOCK_SIZE] {
    let mut data = *coefficients;
    transform_lanes(&mut data, BLOCK_DIM, 1, true);
    transform_lanes(&mut data, 1, BLOCK_DIM, true);
    data
}

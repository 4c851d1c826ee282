// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Fixed-size 8x8 blocks. Entry `(u, v)` is stored at `u + 8 * v`, matching
//! the layout of [`deconv_transforms`]; index 0 is the DC coefficient.

use crate::error::{Error, Result};

pub use deconv_transforms::{BLOCK_DIM, BLOCK_SIZE};

fn check_shape<R: AsRef<[T]>, T>(rows: &[R], what: &str) -> Result<()> {
    if rows.len() != BLOCK_DIM || rows.iter().any(|r| r.as_ref().len() != BLOCK_DIM) {
        return Err(Error::InvalidArgument(format!(
            "{what} must be {BLOCK_DIM}x{BLOCK_DIM}, got {} rows of lengths {:?}",
            rows.len(),
            rows.iter().map(|r| r.as_ref().len()).collect::<Vec<_>>()
        )));
    }
    Ok(())
}

fn check_len(len: usize, what: &str) -> Result<()> {
    if len != BLOCK_SIZE {
        return Err(Error::InvalidArgument(format!(
            "{what} must have {BLOCK_SIZE} entries, got {len}"
        )));
    }
    Ok(())
}

/// Transform-domain representation of one 8x8 spatial block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoefficientBlock(pub [f64; BLOCK_SIZE]);

impl CoefficientBlock {
    pub fn from_rows(rows: &[[f64; BLOCK_DIM]; BLOCK_DIM]) -> CoefficientBlock {
        CoefficientBlock(array_init::array_init(|i| {
            rows[i / BLOCK_DIM][i % BLOCK_DIM]
        }))
    }

    /// Shape-checked variant of [`Self::from_rows`] for dynamically sized input.
    pub fn try_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<CoefficientBlock> {
        check_shape(rows, "coefficient block")?;
        Ok(CoefficientBlock(array_init::array_init(|i| {
            rows[i / BLOCK_DIM].as_ref()[i % BLOCK_DIM]
        })))
    }

    pub fn from_slice(values: &[f64]) -> Result<CoefficientBlock> {
        check_len(values.len(), "coefficient block")?;
        Ok(CoefficientBlock(array_init::array_init(|i| values[i])))
    }

    pub fn dc(&self) -> f64 {
        self.0[0]
    }

    pub fn get(&self, u: usize, v: usize) -> f64 {
        self.0[u + BLOCK_DIM * v]
    }

    pub fn as_array(&self) -> &[f64; BLOCK_SIZE] {
        &self.0
    }

    pub fn scaled(&self, factor: f64) -> CoefficientBlock {
        CoefficientBlock(self.0.map(|c| c * factor))
    }
}

/// Per-coefficient half-step rounding bounds of one quantized block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantizationBlock(pub [u16; BLOCK_SIZE]);

impl QuantizationBlock {
    pub fn uniform(bound: u16) -> QuantizationBlock {
        QuantizationBlock([bound; BLOCK_SIZE])
    }

    pub fn from_rows(rows: &[[u16; BLOCK_DIM]; BLOCK_DIM]) -> QuantizationBlock {
        QuantizationBlock(array_init::array_init(|i| {
            rows[i / BLOCK_DIM][i % BLOCK_DIM]
        }))
    }

    pub fn try_from_rows<R: AsRef<[u16]>>(rows: &[R]) -> Result<QuantizationBlock> {
        check_shape(rows, "quantization block")?;
        Ok(QuantizationBlock(array_init::array_init(|i| {
            rows[i / BLOCK_DIM].as_ref()[i % BLOCK_DIM]
        })))
    }

    pub fn from_slice(values: &[u16]) -> Result<QuantizationBlock> {
        check_len(values.len(), "quantization block")?;
        Ok(QuantizationBlock(array_init::array_init(|i| values[i])))
    }

    /// Bounds implied by a table of quantizer step sizes: a coefficient
    /// rounded to a multiple of `step` is off by at most `step / 2`, rounded up.
    pub fn from_step_sizes(steps: &[u16; BLOCK_SIZE]) -> QuantizationBlock {
        QuantizationBlock(steps.map(|s| s.div_ceil(2)))
    }

    pub fn get(&self, u: usize, v: usize) -> u16 {
        self.0[u + BLOCK_DIM * v]
    }

    pub fn as_array(&self) -> &[u16; BLOCK_SIZE] {
        &self.0
    }
}

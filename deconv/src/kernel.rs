// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::error::{Error, Result};
use crate::image::Image;
use crate::linear_system::EdgePolicy;

/// Convolution kernel with odd width and height, so that it has a center tap.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    weights: Image<f64>,
}

impl Kernel {
    pub fn new(weights: Image<f64>) -> Result<Kernel> {
        let (width, height) = weights.size();
        if width % 2 == 0 || height % 2 == 0 {
            return Err(Error::InvalidArgument(format!(
                "kernel dimensions must be odd, got {width}x{height}"
            )));
        }
        Ok(Kernel { weights })
    }

    /// Builds a kernel from `rows[ky][kx]`.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Kernel> {
        if rows.is_empty() || rows[0].as_ref().is_empty() {
            return Err(Error::InvalidArgument("kernel must be non-empty".to_string()));
        }
        Self::new(Image::from_rows(rows)?)
    }

    /// The 1x1 kernel `[1]`.
    pub fn identity() -> Kernel {
        Kernel {
            weights: Image::single(1.0),
        }
    }

    pub fn size(&self) -> (usize, usize) {
        self.weights.size()
    }

    /// Half extents `(dkx, dky)`: the offset of the center tap.
    pub fn half_size(&self) -> (usize, usize) {
        let (width, height) = self.size();
        (width / 2, height / 2)
    }

    pub fn weight(&self, kx: usize, ky: usize) -> f64 {
        self.weights.get(kx, ky)
    }

    /// Iterates over `(dx, dy, weight)` with offsets relative to the center tap.
    pub fn taps(&self) -> impl Iterator<Item = (isize, isize, f64)> + '_ {
        let (width, height) = self.size();
        let (dkx, dky) = self.half_size();
        (0..height).flat_map(move |ky| {
            (0..width).map(move |kx| {
                (
                    kx as isize - dkx as isize,
                    ky as isize - dky as isize,
                    self.weight(kx, ky),
                )
            })
        })
    }

    /// Applies the kernel to `channel`, following the same tap layout and
    /// edge handling as [`crate::LinearSystemBuilder`].
    pub fn convolve(&self, channel: &Image<f64>, edge_policy: EdgePolicy) -> Result<Image<f64>> {
        let (width, height) = channel.size();
        let mut output = Image::new((width, height))?;
        for cy in 0..height {
            for cx in 0..width {
                let mut sum = 0.0;
                for (dx, dy, w) in self.taps() {
                    if let Some((x, y)) =
                        edge_policy.resolve(cx as isize + dx, cy as isize + dy, (width, height))
                    {
                        sum += w * channel.get(x, y);
                    }
                }
                output.set(cx, cy, sum);
            }
        }
        Ok(output)
    }
}

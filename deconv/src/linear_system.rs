// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::image::Image;
use crate::kernel::Kernel;
use crate::util::mirror;
#[allow(unused_imports)]
use crate::util::tracing_wrappers::*;

/// Handling of kernel taps that fall outside the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Out-of-bounds taps contribute nothing.
    #[default]
    Skip,
    /// Out-of-bounds taps are reflected back into the channel.
    Mirror,
}

impl EdgePolicy {
    /// Maps a possibly out-of-bounds position to the pixel it reads from.
    pub fn resolve(&self, x: isize, y: isize, size: (usize, usize)) -> Option<(usize, usize)> {
        let (width, height) = size;
        match self {
            EdgePolicy::Skip => {
                if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
                    None
                } else {
                    Some((x as usize, y as usize))
                }
            }
            EdgePolicy::Mirror => Some((mirror(x, width), mirror(y, height))),
        }
    }
}

/// Dense `A * x = b` form of a 2D convolution. Row `i` of `matrix` holds the
/// weights that produce output pixel `i`; pixels are flattened row-major.
#[derive(Debug)]
pub struct LinearSystem {
    pub matrix: DMatrix<f64>,
    pub rhs: DVector<f64>,
    size: (usize, usize),
}

impl LinearSystem {
    /// Size of the channel the system was built from.
    pub fn channel_size(&self) -> (usize, usize) {
        self.size
    }

    pub fn dim(&self) -> usize {
        self.rhs.len()
    }
}

pub const DEFAULT_MAX_PIXELS: usize = 4096;

#[derive(Clone, Copy, Debug)]
pub struct LinearSystemBuilder {
    edge_policy: EdgePolicy,
    max_pixels: usize,
}

impl Default for LinearSystemBuilder {
    fn default() -> Self {
        Self::new(EdgePolicy::default())
    }
}

impl LinearSystemBuilder {
    pub fn new(edge_policy: EdgePolicy) -> LinearSystemBuilder {
        LinearSystemBuilder {
            edge_policy,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    pub fn with_max_pixels(mut self, max_pixels: usize) -> LinearSystemBuilder {
        self.max_pixels = max_pixels;
        self
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    #[instrument(level = "debug", skip_all, err)]
    pub fn build(&self, channel: &Image<f64>, kernel: &Kernel) -> Result<LinearSystem> {
        let (width, height) = channel.size();
        let (kernel_width, kernel_height) = kernel.size();
        if kernel_width % 2 == 0 || kernel_height % 2 == 0 {
            return Err(Error::InvalidArgument(format!(
                "kernel dimensions must be odd, got {kernel_width}x{kernel_height}"
            )));
        }
        let n = channel.num_pixels();
        if n == 0 {
            return Err(Error::InvalidArgument("channel is empty".to_string()));
        }
        if n > self.max_pixels {
            return Err(Error::SystemTooLarge(n, self.max_pixels));
        }
        let entries = n.checked_mul(n).ok_or(Error::ArithmeticOverflow)?;
        debug!(width, height, entries, "building dense convolution system");

        // Column-major, as expected by nalgebra.
        let mut data = Vec::new();
        data.try_reserve_exact(entries)?;
        data.resize(entries, 0.0);
        for cy in 0..height {
            for cx in 0..width {
                let out = cy * width + cx;
                for (dx, dy, w) in kernel.taps() {
                    let Some((x, y)) =
                        self.edge_policy
                            .resolve(cx as isize + dx, cy as isize + dy, (width, height))
                    else {
                        continue;
                    };
                    let input = y * width + x;
                    data[out + n * input] += w;
                }
            }
        }

        let rhs = DVector::from_iterator(n, channel.iter());
        Ok(LinearSystem {
            matrix: DMatrix::from_vec(n, n, data),
            rhs,
            size: (width, height),
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::util::test::{assert_almost_eq, random_channel, seeded_rng};

    #[test]
    fn skip_resolves_in_bounds_only() {
        let policy = EdgePolicy::Skip;
        assert_eq!(policy.resolve(-1, 0, (4, 4)), None);
        assert_eq!(policy.resolve(0, 4, (4, 4)), None);
        assert_eq!(policy.resolve(3, 2, (4, 4)), Some((3, 2)));
        assert_eq!(EdgePolicy::Mirror.resolve(-1, 4, (4, 4)), Some((0, 3)));
    }

    #[test]
    fn identity_kernel_gives_identity_system() -> Result<()> {
        let channel = random_channel((3, 2), &mut seeded_rng(1));
        let system = LinearSystemBuilder::default().build(&channel, &Kernel::identity())?;
        assert_eq!(system.dim(), 6);
        assert_eq!(system.matrix, DMatrix::identity(6, 6));
        assert_eq!(system.rhs.as_slice(), channel.as_slice());
        Ok(())
    }

    #[test]
    fn matrix_reproduces_convolution() -> Result<()> {
        let kernel = Kernel::from_rows(&[[0.0, 0.1, 0.0], [0.2, 0.4, 0.1], [0.0, 0.2, 0.0]])?;
        let channel = random_channel((5, 4), &mut seeded_rng(7));
        for policy in [EdgePolicy::Skip, EdgePolicy::Mirror] {
            let system = LinearSystemBuilder::new(policy).build(&channel, &kernel)?;
            let product = &system.matrix * &system.rhs;
            let convolved = kernel.convolve(&channel, policy)?;
            for (a, b) in product.iter().zip(convolved.iter()) {
                assert_almost_eq!(*a, b, 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn mirrored_rows_keep_the_kernel_sum() -> Result<()> {
        let kernel = Kernel::from_rows(&[[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]])?;
        let channel = Image::new((4, 3))?;
        let system = LinearSystemBuilder::new(EdgePolicy::Mirror).build(&channel, &kernel)?;
        for row in system.matrix.row_iter() {
            assert_almost_eq!(row.sum(), 16.0, 1e-12);
        }
        let skipped = LinearSystemBuilder::new(EdgePolicy::Skip).build(&channel, &kernel)?;
        // Corner pixel keeps only the 2x2 quarter of the kernel.
        assert_almost_eq!(skipped.matrix.row(0).sum(), 9.0, 1e-12);
        Ok(())
    }

    #[test]
    fn even_kernel_is_rejected_before_building() {
        let two_by_three = Kernel::from_rows(&[[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        assert!(matches!(two_by_three, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn empty_channel_is_rejected() {
        assert!(Image::<f64>::new((0, 3)).is_err());
    }

    #[test]
    fn oversized_channel_is_rejected_before_allocating() -> Result<()> {
        let channel = Image::new((65, 64))?;
        let result = LinearSystemBuilder::default().build(&channel, &Kernel::identity());
        assert!(matches!(result, Err(Error::SystemTooLarge(4160, 4096))));
        let small = LinearSystemBuilder::default()
            .with_max_pixels(3)
            .build(&Image::new((2, 2))?, &Kernel::identity());
        assert!(matches!(small, Err(Error::SystemTooLarge(4, 3))));
        Ok(())
    }
}

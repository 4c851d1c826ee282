// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::block::QuantizationBlock;
use crate::error::{Error, Result};
use crate::image::{Image, ImageDataType};
use crate::kernel::Kernel;
use crate::linear_system::{EdgePolicy, LinearSystemBuilder};
use crate::projector::{EllipsoidProjector, ProjectorOptions};
use crate::solver::{SolverOptions, SystemSolver};
use crate::transform::{BlockTransform, Dct8x8};
#[allow(unused_imports)]
use crate::util::tracing_wrappers::*;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeconvolveOptions {
    pub edge_policy: EdgePolicy,
    pub solver: SolverOptions,
    pub projector: ProjectorOptions,
}

/// Runs `f` on every index in `0..count`, in parallel when enabled, and
/// returns the results in index order.
fn try_map_indexed<O, F>(count: usize, f: F) -> Result<Vec<O>>
where
    O: Send,
    F: Fn(usize) -> Result<O> + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..count).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..count).map(f).collect()
    }
}

/// Reconstructs images that were blurred by a known kernel and then
/// quantized in the domain of `B`.
///
/// Each channel is deconvolved with a dense solve. The result is moved block
/// by block onto the surface of the quantization ellipsoid around it, so
/// that re-quantizing stays consistent with the observed coefficients.
pub struct Deconvolver<B: BlockTransform = Dct8x8> {
    transform: B,
    builder: LinearSystemBuilder,
    solver: SystemSolver,
    projector: EllipsoidProjector,
}

impl Default for Deconvolver<Dct8x8> {
    fn default() -> Self {
        Deconvolver::new(Dct8x8, DeconvolveOptions::default())
    }
}

impl<B: BlockTransform> Deconvolver<B> {
    pub fn new(transform: B, options: DeconvolveOptions) -> Deconvolver<B> {
        Deconvolver {
            transform,
            builder: LinearSystemBuilder::new(options.edge_policy)
                .with_max_pixels(options.solver.max_pixels),
            solver: SystemSolver::new(options.solver),
            projector: EllipsoidProjector::new(options.projector),
        }
    }

    pub fn transform(&self) -> &B {
        &self.transform
    }

    /// Unconstrained deconvolution of one channel.
    pub fn naive_solve(&self, channel: &Image<f64>, kernel: &Kernel) -> Result<Image<f64>> {
        let system = self.builder.build(channel, kernel)?;
        self.solver.solve(system)
    }

    #[instrument(level = "debug", skip_all, err)]
    pub fn deconvolve_channel(
        &self,
        channel: &Image<f64>,
        quant: &[QuantizationBlock],
        kernel: &Kernel,
    ) -> Result<Image<f64>> {
        let size = channel.size();
        let expected = self.transform.num_blocks(size);
        if quant.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "{}x{} channel has {expected} blocks, got {} quantization blocks",
                size.0,
                size.1,
                quant.len()
            )));
        }
        let naive = self.naive_solve(channel, kernel)?;
        let blocks = self.transform.forward(&naive)?;
        if blocks.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "transform produced {} blocks, expected {expected}",
                blocks.len()
            )));
        }
        let projected = try_map_indexed(blocks.len(), |i| {
            let result = self.projector.project(&blocks[i], &quant[i])?;
            trace!(block = i, iterations = result.iterations, "projected block");
            Ok(result.rescaled_to_dc(blocks[i].dc()))
        })?;
        self.transform.backward(&projected, size)
    }

    /// Deconvolves every channel of `image`. `quant[c]` holds the
    /// quantization blocks of channel `c`, in transform block order.
    pub fn deconvolve<T: ImageDataType>(
        &self,
        image: &[Image<T>],
        quant: &[Vec<QuantizationBlock>],
        kernel: &Kernel,
    ) -> Result<Vec<Image<T>>> {
        let Some(first) = image.first() else {
            return Err(Error::InvalidArgument("image has no channels".to_string()));
        };
        if image.len() != quant.len() {
            return Err(Error::InvalidArgument(format!(
                "image has {} channels but {} quantization block sets were given",
                image.len(),
                quant.len()
            )));
        }
        let size = first.size();
        if let Some(channel) = image.iter().find(|c| c.size() != size) {
            return Err(Error::InvalidArgument(format!(
                "channel sizes differ: {:?} vs {:?}",
                size,
                channel.size()
            )));
        }
        let expected = self.transform.num_blocks(size);
        if let Some((c, set)) = quant.iter().enumerate().find(|(_, s)| s.len() != expected) {
            return Err(Error::InvalidArgument(format!(
                "channel {c} has {expected} blocks, got {} quantization blocks",
                set.len()
            )));
        }
        debug!(channels = image.len(), width = size.0, height = size.1, "deconvolving");
        try_map_indexed(image.len(), |c| {
            let channel = image[c].convert::<f64>()?;
            self.deconvolve_channel(&channel, &quant[c], kernel)?
                .convert::<T>()
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::block::{BLOCK_SIZE, CoefficientBlock};
    use crate::projector::EllipsoidModel;
    use crate::util::test::{assert_almost_eq, assert_images_almost_eq, random_channel, seeded_rng};

    #[test]
    fn naive_solve_round_trips_through_transform() -> Result<()> {
        let kernel = Kernel::from_rows(&[[0.1, 0.8, 0.1]])?;
        let deconvolver = Deconvolver::default();
        let channel = random_channel((12, 9), &mut seeded_rng(4));
        let naive = deconvolver.naive_solve(&channel, &kernel)?;
        let blocks = Dct8x8.forward(&naive)?;
        let restored = Dct8x8.backward(&blocks, naive.size())?;
        assert_images_almost_eq(&restored, &naive, 1e-9);
        Ok(())
    }

    #[test]
    fn projected_blocks_keep_naive_dc() -> Result<()> {
        let deconvolver = Deconvolver::default();
        let channel = random_channel((16, 8), &mut seeded_rng(8));
        let quant = vec![QuantizationBlock::uniform(6); 2];
        let output = deconvolver.deconvolve_channel(&channel, &quant, &Kernel::identity())?;
        let before = Dct8x8.forward(&channel)?;
        let after = Dct8x8.forward(&output)?;
        for (b, a) in before.iter().zip(after.iter()) {
            assert_almost_eq!(a.dc(), b.dc(), 1e-6);
        }
        Ok(())
    }

    #[test]
    fn output_is_consistent_with_the_ellipsoid_up_to_scale() -> Result<()> {
        let deconvolver = Deconvolver::default();
        let channel = random_channel((8, 8), &mut seeded_rng(12));
        let quant = [QuantizationBlock::uniform(10)];
        let output = deconvolver.deconvolve_channel(&channel, &quant, &Kernel::identity())?;
        let naive_block = Dct8x8.forward(&channel)?[0];
        let projected = EllipsoidProjector::default().project(&naive_block, &quant[0])?;
        let model = EllipsoidModel::new(&naive_block, &quant[0])?;
        assert_almost_eq!(model.level(&projected.coefficients.0), 1.0, 1e-9);
        let expected = projected.rescaled_to_dc(naive_block.dc());
        let got: CoefficientBlock = Dct8x8.forward(&output)?[0];
        for i in 0..BLOCK_SIZE {
            assert_almost_eq!(got.0[i], expected.0[i], 1e-6);
        }
        Ok(())
    }

    #[test]
    fn channel_count_mismatch_is_rejected() -> Result<()> {
        let image = vec![Image::<u8>::new((8, 8))?; 3];
        let quant = vec![vec![QuantizationBlock::uniform(1)]; 2];
        let result = Deconvolver::default().deconvolve(&image, &quant, &Kernel::identity());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn block_count_mismatch_is_rejected() -> Result<()> {
        let image = vec![Image::<u8>::new((16, 8))?];
        let quant = vec![vec![QuantizationBlock::uniform(1)]];
        let result = Deconvolver::default().deconvolve(&image, &quant, &Kernel::identity());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn mismatched_channel_sizes_are_rejected() -> Result<()> {
        let image = vec![Image::<u8>::new((8, 8))?, Image::<u8>::new((8, 16))?];
        let quant = vec![vec![QuantizationBlock::uniform(1)]; 2];
        let result = Deconvolver::default().deconvolve(&image, &quant, &Kernel::identity());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn errors_from_one_block_surface() -> Result<()> {
        let image = vec![Image::<u8>::new_with_value((8, 8), 50)?];
        let mut bounds = [2u16; BLOCK_SIZE];
        bounds[3] = 0;
        let quant = vec![vec![QuantizationBlock(bounds)]];
        let result = Deconvolver::default().deconvolve(&image, &quant, &Kernel::identity());
        assert!(matches!(result, Err(Error::DegenerateEllipsoid(3))));
        Ok(())
    }
}

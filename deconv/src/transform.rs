// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use deconv_transforms::{dct2d_8x8, idct2d_8x8};

use crate::block::{BLOCK_DIM, BLOCK_SIZE, CoefficientBlock};
use crate::error::{Error, Result};
use crate::image::Image;
use crate::util::mirror;

/// Maps a channel to 8x8 coefficient blocks and back.
///
/// Blocks are ordered left to right, then top to bottom. Quantization blocks
/// passed alongside must follow the same order.
pub trait BlockTransform: Send + Sync {
    fn forward(&self, channel: &Image<f64>) -> Result<Vec<CoefficientBlock>>;

    /// Inverse of [`BlockTransform::forward`] for a channel of `size`.
    fn backward(&self, blocks: &[CoefficientBlock], size: (usize, usize)) -> Result<Image<f64>>;

    /// Number of blocks `forward` produces for a channel of `size`.
    fn num_blocks(&self, size: (usize, usize)) -> usize;
}

/// Orthonormal 8x8 DCT-II, as used by JPEG. Channels whose dimensions are
/// not multiples of 8 are extended by mirroring and cropped on the way back.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dct8x8;

fn blocks_in(size: (usize, usize)) -> (usize, usize) {
    (size.0.div_ceil(BLOCK_DIM), size.1.div_ceil(BLOCK_DIM))
}

impl BlockTransform for Dct8x8 {
    fn forward(&self, channel: &Image<f64>) -> Result<Vec<CoefficientBlock>> {
        let (width, height) = channel.size();
        let (bx, by) = blocks_in((width, height));
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(bx * by)?;
        for block_y in 0..by {
            for block_x in 0..bx {
                let samples: [f64; BLOCK_SIZE] = std::array::from_fn(|i| {
                    let x = block_x * BLOCK_DIM + i % BLOCK_DIM;
                    let y = block_y * BLOCK_DIM + i / BLOCK_DIM;
                    channel.get(mirror(x as isize, width), mirror(y as isize, height))
                });
                blocks.push(CoefficientBlock(dct2d_8x8(&samples)));
            }
        }
        Ok(blocks)
    }

    fn backward(&self, blocks: &[CoefficientBlock], size: (usize, usize)) -> Result<Image<f64>> {
        let (bx, by) = blocks_in(size);
        if blocks.len() != bx * by {
            return Err(Error::InvalidArgument(format!(
                "{}x{} channel needs {} blocks, got {}",
                size.0,
                size.1,
                bx * by,
                blocks.len()
            )));
        }
        let mut channel = Image::new(size)?;
        for (index, block) in blocks.iter().enumerate() {
            let samples = idct2d_8x8(block.as_array());
            let (x0, y0) = ((index % bx) * BLOCK_DIM, (index / bx) * BLOCK_DIM);
            for dy in 0..BLOCK_DIM.min(size.1 - y0) {
                let width = BLOCK_DIM.min(size.0 - x0);
                channel.row_mut(y0 + dy)[x0..x0 + width]
                    .copy_from_slice(&samples[dy * BLOCK_DIM..dy * BLOCK_DIM + width]);
            }
        }
        Ok(channel)
    }

    fn num_blocks(&self, size: (usize, usize)) -> usize {
        let (bx, by) = blocks_in(size);
        bx * by
    }
}

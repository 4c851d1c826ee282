// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::io::Write;

use color_eyre::eyre::{Result, eyre};
use deconv::Image;

fn png_color(num_channels: usize) -> Result<png::ColorType> {
    match num_channels {
        1 => Ok(png::ColorType::Grayscale),
        2 => Ok(png::ColorType::GrayscaleAlpha),
        3 => Ok(png::ColorType::Rgb),
        4 => Ok(png::ColorType::Rgba),
        _ => Err(eyre!(
            "Invalid number of channels for PNG output {:?}",
            num_channels
        )),
    }
}

pub fn to_png<Writer: Write>(channels: &[Image<u8>], buf: Writer) -> Result<()> {
    let first = channels.first().ok_or_else(|| eyre!("No channels to write"))?;
    let (width, height) = first.size();
    if channels.iter().any(|c| c.size() != (width, height)) {
        return Err(eyre!("Channel sizes differ"));
    }
    let mut encoder = png::Encoder::new(buf, width.try_into()?, height.try_into()?);
    encoder.set_color(png_color(channels.len())?);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Fast);
    let mut writer = encoder.write_header()?;

    let mut interleaved = Vec::with_capacity(width * height * channels.len());
    for y in 0..height {
        for x in 0..width {
            interleaved.extend(channels.iter().map(|c| c.row(y)[x]));
        }
    }
    writer.write_image_data(&interleaved)?;
    writer.finish()?;
    Ok(())
}

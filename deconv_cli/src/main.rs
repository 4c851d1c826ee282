// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use deconv::{
    BlockTransform, Dct8x8, DeconvolveOptions, Deconvolver, EdgePolicy, Image, ProjectorOptions,
    SolverOptions,
};
use deconv_cli::{png, pnm, tables};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EdgeMode {
    Skip,
    Mirror,
}

impl From<EdgeMode> for EdgePolicy {
    fn from(mode: EdgeMode) -> Self {
        match mode {
            EdgeMode::Skip => EdgePolicy::Skip,
            EdgeMode::Mirror => EdgePolicy::Mirror,
        }
    }
}

#[derive(Parser)]
#[command(about = "Deblurs a JPEG-decoded image, staying consistent with its quantization")]
struct Opt {
    /// Input image, binary PGM or PPM
    input: PathBuf,

    /// Output image file, should end in .pgm, .ppm or .png
    output: PathBuf,

    /// Blur kernel: one row of weights per line, odd width and height
    #[arg(long)]
    kernel: PathBuf,

    /// Quantization tables: one 8x8 table for all channels, or one per channel
    #[arg(long)]
    quant: PathBuf,

    /// Treat the tables as quantizer step sizes instead of rounding bounds
    #[arg(long)]
    steps: bool,

    #[arg(long, value_enum, default_value_t = EdgeMode::Skip)]
    edge_policy: EdgeMode,

    /// Tikhonov damping for the linear solve; off unless given
    #[arg(long)]
    damping: Option<f64>,

    /// Angular tolerance of the ellipsoid projection, in radians
    #[arg(long, default_value_t = ProjectorOptions::default().tolerance)]
    tolerance: f64,

    #[arg(long, default_value_t = ProjectorOptions::default().max_iterations)]
    max_iterations: usize,

    /// Largest channel, in pixels, accepted by the dense solver
    #[arg(long, default_value_t = SolverOptions::default().max_pixels)]
    max_pixels: usize,
}

fn save_image(channels: &[Image<u8>], output_filename: &Path) -> Result<()> {
    let extension = output_filename
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let output_bytes = match extension.as_deref() {
        Some("pgm") if channels.len() == 1 => pnm::to_pnm(channels)?,
        Some("ppm") if channels.len() == 3 => pnm::to_pnm(channels)?,
        Some("png") => {
            let mut bytes = vec![];
            png::to_png(channels, &mut bytes)?;
            bytes
        }
        _ => {
            return Err(eyre!(
                "Cannot write {} channels to {:?}",
                channels.len(),
                output_filename
            ));
        }
    };
    fs::write(output_filename, output_bytes)
        .wrap_err_with(|| format!("Failed to write {:?}", output_filename))
}

fn main() -> Result<()> {
    #[cfg(feature = "tracing-subscriber")]
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .init();
    }

    let opt = Opt::parse();
    let input = fs::read(&opt.input).wrap_err_with(|| format!("Cannot open {:?}", opt.input))?;
    let image = pnm::read_pnm(&input).wrap_err("Failed to parse input image")?;

    let kernel_text = fs::read_to_string(&opt.kernel)
        .wrap_err_with(|| format!("Cannot open {:?}", opt.kernel))?;
    let kernel = tables::parse_kernel(&kernel_text)?;

    let quant_text =
        fs::read_to_string(&opt.quant).wrap_err_with(|| format!("Cannot open {:?}", opt.quant))?;
    let mut quant_tables = tables::parse_quant_tables(&quant_text)?;
    if opt.steps {
        quant_tables = tables::steps_to_bounds(&quant_tables);
    }

    let options = DeconvolveOptions {
        edge_policy: opt.edge_policy.into(),
        solver: SolverOptions {
            damping: opt.damping,
            max_pixels: opt.max_pixels,
        },
        projector: ProjectorOptions {
            tolerance: opt.tolerance,
            max_iterations: opt.max_iterations,
        },
    };
    let deconvolver = Deconvolver::new(Dct8x8, options);
    let num_blocks = deconvolver.transform().num_blocks(image[0].size());
    let quant = tables::per_block_sets(&quant_tables, image.len(), num_blocks)?;

    let (width, height) = image[0].size();
    println!(
        "Deconvolving {} channel(s) of {width}x{height} with a {}x{} kernel",
        image.len(),
        kernel.size().0,
        kernel.size().1
    );
    let output = deconvolver
        .deconvolve(&image, &quant, &kernel)
        .wrap_err("Deconvolution failed")?;
    save_image(&output, &opt.output)
}

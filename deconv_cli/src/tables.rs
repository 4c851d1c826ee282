// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Plain-text kernel and quantization table files: whitespace-separated
//! numbers, one matrix row per line, `#` starting a comment.

use color_eyre::eyre::{Result, WrapErr, eyre};
use deconv::{BLOCK_SIZE, Kernel, QuantizationBlock};

fn rows(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.split('#').next().unwrap_or_default().trim();
        (!line.is_empty()).then_some((i + 1, line))
    })
}

pub fn parse_kernel(text: &str) -> Result<Kernel> {
    let mut matrix = vec![];
    for (line_number, line) in rows(text) {
        let row = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .wrap_err_with(|| format!("Invalid kernel weight on line {line_number}"))?;
        matrix.push(row);
    }
    Ok(Kernel::from_rows(&matrix)?)
}

/// Reads one or more 8x8 tables, in row-major order.
pub fn parse_quant_tables(text: &str) -> Result<Vec<QuantizationBlock>> {
    let mut values = vec![];
    for (line_number, line) in rows(text) {
        for v in line.split_whitespace() {
            values.push(
                v.parse::<u16>()
                    .wrap_err_with(|| format!("Invalid quantization value on line {line_number}"))?,
            );
        }
    }
    if values.is_empty() || values.len() % BLOCK_SIZE != 0 {
        return Err(eyre!(
            "Quantization file must hold a whole number of {BLOCK_SIZE}-entry tables, got {} values",
            values.len()
        ));
    }
    Ok(values
        .chunks_exact(BLOCK_SIZE)
        .map(QuantizationBlock::from_slice)
        .collect::<deconv::Result<_>>()?)
}

/// Converts tables of quantizer step sizes into rounding bounds.
pub fn steps_to_bounds(tables: &[QuantizationBlock]) -> Vec<QuantizationBlock> {
    tables
        .iter()
        .map(|t| QuantizationBlock::from_step_sizes(t.as_array()))
        .collect()
}

/// Replicates each channel's table for every block of that channel. A single
/// table is shared by all channels.
pub fn per_block_sets(
    tables: &[QuantizationBlock],
    num_channels: usize,
    num_blocks: usize,
) -> Result<Vec<Vec<QuantizationBlock>>> {
    match tables.len() {
        1 => Ok(vec![vec![tables[0]; num_blocks]; num_channels]),
        n if n == num_channels => Ok(tables.iter().map(|t| vec![*t; num_blocks]).collect()),
        n => Err(eyre!(
            "Got {n} quantization tables for {num_channels} channels"
        )),
    }
}

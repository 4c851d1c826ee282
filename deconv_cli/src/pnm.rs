// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Binary 8-bit PGM (`P5`) and PPM (`P6`).

use color_eyre::eyre::{Result, eyre};
use deconv::Image;

struct Header {
    channels: usize,
    width: usize,
    height: usize,
    max_value: usize,
}

fn skip_whitespace_and_comments(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() {
        if data[pos].is_ascii_whitespace() {
            pos += 1;
        } else if data[pos] == b'#' {
            while pos < data.len() && data[pos] != b'\n' {
                pos += 1;
            }
        } else {
            break;
        }
    }
    pos
}

fn read_number(data: &[u8], pos: &mut usize) -> Result<usize> {
    *pos = skip_whitespace_and_comments(data, *pos);
    let start = *pos;
    while *pos < data.len() && data[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if start == *pos {
        return Err(eyre!("Expected a number in PNM header at byte {}", start));
    }
    std::str::from_utf8(&data[start..*pos])?
        .parse()
        .map_err(|e| eyre!("Invalid number in PNM header: {e}"))
}

fn read_header(data: &[u8]) -> Result<(Header, usize)> {
    let channels = match data.get(..2) {
        Some(b"P5") => 1,
        Some(b"P6") => 3,
        _ => return Err(eyre!("Not a binary PGM or PPM file")),
    };
    let mut pos = 2;
    let width = read_number(data, &mut pos)?;
    let height = read_number(data, &mut pos)?;
    let max_value = read_number(data, &mut pos)?;
    // Exactly one whitespace byte separates the header from the samples.
    if !data.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        return Err(eyre!("Truncated PNM header"));
    }
    Ok((
        Header {
            channels,
            width,
            height,
            max_value,
        },
        pos + 1,
    ))
}

/// Decodes a `P5` or `P6` file into one image per channel.
pub fn read_pnm(data: &[u8]) -> Result<Vec<Image<u8>>> {
    let (header, start) = read_header(data)?;
    if header.max_value == 0 || header.max_value > 255 {
        return Err(eyre!(
            "Only 8-bit PNM is supported, got max value {}",
            header.max_value
        ));
    }
    let num_samples = header
        .width
        .checked_mul(header.height)
        .and_then(|n| n.checked_mul(header.channels))
        .ok_or_else(|| eyre!("PNM image too large"))?;
    let samples = start
        .checked_add(num_samples)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| eyre!("PNM file truncated: expected {} samples", num_samples))?;

    let mut channels = Vec::with_capacity(header.channels);
    for c in 0..header.channels {
        let mut channel = Image::new((header.width, header.height))?;
        channel.apply(|(x, y), v| *v = samples[(y * header.width + x) * header.channels + c]);
        channels.push(channel);
    }
    Ok(channels)
}

/// Encodes one channel as PGM or three as PPM.
pub fn to_pnm(channels: &[Image<u8>]) -> Result<Vec<u8>> {
    use std::io::Write;
    let magic = match channels.len() {
        1 => "P5",
        3 => "P6",
        n => return Err(eyre!("Cannot write {n} channels as PNM")),
    };
    let (width, height) = channels[0].size();
    if channels.iter().any(|c| c.size() != (width, height)) {
        return Err(eyre!("Channel sizes differ"));
    }
    let mut ret = vec![];
    write!(&mut ret, "{magic}\n{width} {height}\n255\n")?;
    for y in 0..height {
        for x in 0..width {
            ret.extend(channels.iter().map(|c| c.row(y)[x]));
        }
    }
    Ok(ret)
}

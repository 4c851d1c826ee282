// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Linear system of size {size} is singular (pivot magnitude {pivot:e})")]
    SingularSystem { pivot: f64, size: usize },
    #[error("Degenerate ellipsoid: zero quantization bound on axis {0}")]
    DegenerateEllipsoid(usize),
    #[error("Projection did not converge after {iterations} iterations (angular error {error})")]
    ProjectionDidNotConverge { iterations: usize, error: f64 },
    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),
    #[error("Image size too large: {0}x{1}")]
    ImageSizeTooLarge(usize, usize),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Channel with {0} pixels exceeds the dense solver limit of {1} pixels")]
    SystemTooLarge(usize, usize),
    // Generic arithmetic overflow. Prefer using other errors if possible.
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

pub type Result<T> = std::result::Result<T, Error>;

// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![deny(unsafe_code)]
pub mod block;
pub mod deconvolve;
pub mod error;
pub mod image;
pub mod kernel;
pub mod linear_system;
pub mod projector;
pub mod solver;
pub mod transform;
pub mod util;

pub use block::{BLOCK_DIM, BLOCK_SIZE, CoefficientBlock, QuantizationBlock};
pub use deconvolve::{DeconvolveOptions, Deconvolver};
pub use error::{Error, Result};
pub use image::{Image, ImageDataType};
pub use kernel::Kernel;
pub use linear_system::{EdgePolicy, LinearSystem, LinearSystemBuilder};
pub use projector::{EllipsoidModel, EllipsoidProjector, ProjectionResult, ProjectorOptions};
pub use solver::{SolverOptions, SystemSolver};
pub use transform::{BlockTransform, Dct8x8};

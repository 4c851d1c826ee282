// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

mod mirror;
pub mod tracing_wrappers;
mod vec_math;

pub use mirror::*;
pub(crate) use vec_math::*;

// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, error, info, instrument, trace, warn};

#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use deconv_macros::noop as instrument;

#[cfg(not(feature = "tracing"))]
macro_rules! __noop {
    ($($args:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_imports)]
pub(crate) use {__noop as debug, __noop as error, __noop as info, __noop as trace, __noop as warn};

// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Mirror-reflects a value v to fit in a [0; s) range.
pub fn mirror(mut v: isize, s: usize) -> usize {
    debug_assert!(s > 0);
    let s = s as isize;
    // A full period is 2 * s; fold into it first so far-away taps terminate quickly.
    v = v.rem_euclid(2 * s);
    if v >= s { (2 * s - v - 1) as usize } else { v as usize }
}

// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::block::BLOCK_SIZE;

pub(crate) type Vec64 = [f64; BLOCK_SIZE];

#[inline]
pub(crate) fn dot(a: &Vec64, b: &Vec64) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub(crate) fn norm(a: &Vec64) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
pub(crate) fn add(a: &Vec64, b: &Vec64) -> Vec64 {
    array_init::array_init(|i| a[i] + b[i])
}

#[inline]
pub(crate) fn sub(a: &Vec64, b: &Vec64) -> Vec64 {
    array_init::array_init(|i| a[i] - b[i])
}

#[inline]
pub(crate) fn scale(a: &Vec64, factor: f64) -> Vec64 {
    a.map(|x| x * factor)
}

/// Returns `None` for the zero vector.
pub(crate) fn normalize(a: &Vec64) -> Option<Vec64> {
    let n = norm(a);
    if n == 0.0 || !n.is_finite() {
        return None;
    }
    Some(scale(a, 1.0 / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test::assert_almost_eq;

    #[test]
    fn basic_ops() {
        let mut a = [0.0; BLOCK_SIZE];
        let mut b = [0.0; BLOCK_SIZE];
        a[0] = 3.0;
        a[7] = 4.0;
        b[7] = 2.0;
        assert_almost_eq!(norm(&a), 5.0, 1e-12);
        assert_almost_eq!(dot(&a, &b), 8.0, 1e-12);
        assert_eq!(add(&a, &b)[7], 6.0);
        assert_eq!(sub(&a, &b)[7], 2.0);
        assert_almost_eq!(norm(&normalize(&a).unwrap()), 1.0, 1e-12);
        assert!(normalize(&[0.0; BLOCK_SIZE]).is_none());
    }
}

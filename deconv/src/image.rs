// Copyright (c) the JPEG XL Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::util::tracing_wrappers::*;

mod private {
    pub trait Sealed {}
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DataTypeTag {
    U8,
    U16,
    I32,
    F32,
    F64,
}

pub trait ImageDataType:
    private::Sealed + Copy + Default + Send + Sync + 'static + Debug + PartialEq
{
    /// ID of this data type. Different types *must* have different values.
    const DATA_TYPE_ID: DataTypeTag;

    /// Converts from a sample value. Integer types round to nearest and
    /// saturate at their range.
    fn from_f64(f: f64) -> Self;
    fn to_f64(self) -> f64;
}

macro_rules! impl_image_data_type {
    ($ty: ty, $id: ident, integer) => {
        impl private::Sealed for $ty {}
        impl ImageDataType for $ty {
            const DATA_TYPE_ID: DataTypeTag = DataTypeTag::$id;
            fn from_f64(f: f64) -> $ty {
                // Float to int casts saturate; NaN maps to 0.
                f.round() as $ty
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
    ($ty: ty, $id: ident, float) => {
        impl private::Sealed for $ty {}
        impl ImageDataType for $ty {
            const DATA_TYPE_ID: DataTypeTag = DataTypeTag::$id;
            fn from_f64(f: f64) -> $ty {
                f as $ty
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_image_data_type!(u8, U8, integer);
impl_image_data_type!(u16, U16, integer);
impl_image_data_type!(i32, I32, integer);
impl_image_data_type!(f32, F32, float);
impl_image_data_type!(f64, F64, float);

/// Row-major 2D grid of samples. `size` is `(width, height)`.
#[derive(Clone, PartialEq)]
pub struct Image<T: ImageDataType> {
    size: (usize, usize),
    data: Vec<T>,
}

impl<T: ImageDataType> Debug for Image<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {}x{}", T::DATA_TYPE_ID, self.size.0, self.size.1)
    }
}

impl<T: ImageDataType> Image<T> {
    #[instrument(err)]
    pub fn new(size: (usize, usize)) -> Result<Image<T>> {
        let (xsize, ysize) = size;
        // These limits let us not worry about overflows.
        if xsize as u64 >= i64::MAX as u64 / 4 || ysize as u64 >= i64::MAX as u64 / 4 {
            return Err(Error::ImageSizeTooLarge(xsize, ysize));
        }
        let total_size = xsize
            .checked_mul(ysize)
            .ok_or(Error::ImageSizeTooLarge(xsize, ysize))?;
        if xsize == 0 || ysize == 0 {
            return Err(Error::InvalidImageSize(xsize, ysize));
        }
        debug!("trying to allocate image");
        let mut data = vec![];
        data.try_reserve_exact(total_size)?;
        data.resize(total_size, T::default());
        Ok(Image {
            size: (xsize, ysize),
            data,
        })
    }

    /// 1x1 image holding `value`.
    pub(crate) fn single(value: T) -> Image<T> {
        Image {
            size: (1, 1),
            data: vec![value],
        }
    }

    pub fn new_with_value(size: (usize, usize), value: T) -> Result<Image<T>> {
        let mut image = Self::new(size)?;
        image.data.fill(value);
        Ok(image)
    }

    /// Builds an image from `rows[y][x]`. All rows must have the same length.
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Image<T>> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.as_ref().len());
        if let Some(bad) = rows.iter().position(|r| r.as_ref().len() != width) {
            return Err(Error::InvalidArgument(format!(
                "row {bad} has {} samples, expected {width}",
                rows[bad].as_ref().len()
            )));
        }
        let mut image = Self::new((width, height))?;
        for (y, row) in rows.iter().enumerate() {
            image.row_mut(y).copy_from_slice(row.as_ref());
        }
        Ok(image)
    }

    /// Wraps row-major `data` of the given size.
    pub fn from_vec(size: (usize, usize), data: Vec<T>) -> Result<Image<T>> {
        let expected = size
            .0
            .checked_mul(size.1)
            .ok_or(Error::ImageSizeTooLarge(size.0, size.1))?;
        if size.0 == 0 || size.1 == 0 {
            return Err(Error::InvalidImageSize(size.0, size.1));
        }
        if data.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "{} samples do not fill a {}x{} image",
                data.len(),
                size.0,
                size.1
            )));
        }
        Ok(Image { size, data })
    }

    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size.0
    }

    pub fn height(&self) -> usize {
        self.size.1
    }

    pub fn num_pixels(&self) -> usize {
        self.data.len()
    }

    pub fn row(&self, row: usize) -> &[T] {
        debug_assert!(row < self.size.1);
        let start = row * self.size.0;
        &self.data[start..start + self.size.0]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        debug_assert!(row < self.size.1);
        let start = row * self.size.0;
        &mut self.data[start..start + self.size.0]
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.row(y)[x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.row_mut(y)[x] = value;
    }

    /// Samples in row-major order, the flattening used by the linear system.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().copied()
    }

    /// Converts every sample, e.g. an integer channel into a working `f64` one.
    pub fn convert<U: ImageDataType>(&self) -> Result<Image<U>> {
        let mut data = vec![];
        data.try_reserve_exact(self.data.len())?;
        data.extend(self.data.iter().map(|v| U::from_f64(v.to_f64())));
        Ok(Image {
            size: self.size,
            data,
        })
    }

    /// Applies `f` to all the pixels. `f` is passed the `(x, y)` coordinates of the pixel.
    pub fn apply<F>(&mut self, mut f: F)
    where
        F: FnMut((usize, usize), &mut T),
    {
        let width = self.size.0;
        self.data
            .iter_mut()
            .enumerate()
            .for_each(|(i, v)| f((i % width, i / width), v));
    }
}

// Copyright 2025 the Tractogram Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scalar filters: a length window and a subsampling bucket.

use crate::error::ParameterError;

/// Length and subsampling filter applied after volume composition.
///
/// Subsampling keeps line `i` when `min_subsampling <= i % 100 <= max_subsampling`,
/// so `0..=100` keeps everything and `0..=9` keeps roughly one line in ten.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParams {
    /// Shortest visible line.
    pub min_length: f32,
    /// Longest visible line.
    pub max_length: f32,
    /// Lowest kept bucket, in `0..=100`.
    pub min_subsampling: u8,
    /// Highest kept bucket, in `0..=100`.
    pub max_subsampling: u8,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            min_length: 0.0,
            max_length: f32::MAX,
            min_subsampling: 0,
            max_subsampling: 100,
        }
    }
}

impl FilterParams {
    /// Filter keeping lines with length in `min..=max`, every bucket.
    pub fn length(min: f32, max: f32) -> Self {
        Self {
            min_length: min,
            max_length: max,
            ..Self::default()
        }
    }

    /// Reject NaN bounds, inverted ranges and buckets above 100.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, v) in [("min_length", self.min_length), ("max_length", self.max_length)] {
            if v.is_nan() {
                return Err(ParameterError::OutOfRange { name, value: v });
            }
        }
        if self.min_length > self.max_length {
            return Err(ParameterError::InvertedRange {
                name: "length",
                min: self.min_length,
                max: self.max_length,
            });
        }
        for (name, v) in [
            ("min_subsampling", self.min_subsampling),
            ("max_subsampling", self.max_subsampling),
        ] {
            if v > 100 {
                return Err(ParameterError::OutOfRange {
                    name,
                    value: f32::from(v),
                });
            }
        }
        if self.min_subsampling > self.max_subsampling {
            return Err(ParameterError::InvertedRange {
                name: "subsampling",
                min: f32::from(self.min_subsampling),
                max: f32::from(self.max_subsampling),
            });
        }
        Ok(())
    }

    /// Whether line `line` of length `length` passes.
    pub fn accepts(&self, line: usize, length: f32) -> bool {
        let bucket = line % 100;
        length >= self.min_length
            && length <= self.max_length
            && bucket >= usize::from(self.min_subsampling)
            && bucket <= usize::from(self.max_subsampling)
    }
}

//! Strongly-typed price and weight primitives shared by every engine.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// A behavioral contract for anything that behaves like a price.
pub trait PriceLike {
    fn value(&self) -> f64;

    const MIN_EPSILON: f64 = 1e-12;

    fn is_positive(&self) -> bool {
        self.value() > Self::MIN_EPSILON
    }

    /// Relative distance to `reference` as a 0..1 fraction (0.0 when the
    /// reference is not usable as a divisor).
    fn percent_diff_from_0_1<R: PriceLike>(&self, reference: &R) -> f64 {
        if !reference.is_positive() {
            return 0.0;
        }

        (self.value() - reference.value()).abs() / reference.value()
    }

    /// Formats a price with "Trader Precision" adaptive decimals.
    fn format_price(&self) -> String {
        let price = self.value();
        if price == 0.0 {
            return "$0.00".to_string();
        }

        let abs_price = price.abs();

        if abs_price >= 1000.0 {
            format!("${:.2}", price)
        } else if abs_price >= 1.0 {
            format!("${:.4}", price)
        } else if abs_price >= 0.01 {
            format!("${:.5}", price)
        } else {
            format!("${:.8}", price)
        }
    }
}

macro_rules! impl_into_price {
    ($from:ident) => {
        impl From<$from> for Price {
            fn from(p: $from) -> Self {
                Price::new(p.value())
            }
        }
    };
}

macro_rules! impl_from_price {
    ($to:ident) => {
        impl From<Price> for $to {
            fn from(p: Price) -> Self {
                $to::new(p.value())
            }
        }
    };
}

macro_rules! define_price_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(f64);

        impl From<f64> for $name {
            fn from(v: f64) -> Self {
                $name::new(v)
            }
        }

        impl $name {
            pub const fn new(val: f64) -> Self {
                // Absolute prices should not be negative
                let v = if val < 0.0 { 0.0 } else { val };
                Self(v)
            }

            #[inline]
            pub fn abs(self) -> f64 {
                self.value().abs()
            }
        }

        impl Add for $name {
            type Output = f64;

            fn add(self, rhs: Self) -> Self::Output {
                self.value() + rhs.value()
            }
        }

        impl Sub for $name {
            type Output = f64;

            fn sub(self, rhs: Self) -> Self::Output {
                self.value() - rhs.value()
            }
        }

        impl Div for $name {
            type Output = f64;

            fn div(self, rhs: Self) -> Self::Output {
                self.value() / rhs.value()
            }
        }

        impl Div<f64> for $name {
            type Output = $name;

            fn div(self, rhs: f64) -> Self::Output {
                $name::new(self.value() / rhs)
            }
        }

        impl Mul<f64> for $name {
            type Output = $name;

            fn mul(self, rhs: f64) -> Self::Output {
                $name::new(self.value() * rhs)
            }
        }

        impl PriceLike for $name {
            fn value(&self) -> f64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.format_price())
            }
        }
    };
}

macro_rules! impl_price_compare {
    ($a:ty, $b:ty) => {
        impl PartialEq<$b> for $a {
            fn eq(&self, other: &$b) -> bool {
                self.value() == other.value()
            }
        }

        impl PartialOrd<$b> for $a {
            fn partial_cmp(&self, other: &$b) -> Option<std::cmp::Ordering> {
                self.value().partial_cmp(&other.value())
            }
        }
    };
}

// Generate the Price Hierarchy
define_price_type!(Price);
define_price_type!(OpenPrice);
define_price_type!(HighPrice);
define_price_type!(LowPrice);
define_price_type!(ClosePrice);

impl Price {
    #[inline]
    pub(crate) fn clamp(self, min: Price, max: Price) -> Price {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }
}

impl_into_price!(OpenPrice);
impl_into_price!(HighPrice);
impl_into_price!(LowPrice);
impl_into_price!(ClosePrice);

impl_from_price!(LowPrice);
impl_from_price!(HighPrice);
impl_from_price!(OpenPrice);
impl_from_price!(ClosePrice);

impl_price_compare!(LowPrice, HighPrice);
impl_price_compare!(HighPrice, LowPrice);

impl_price_compare!(LowPrice, Price);
impl_price_compare!(HighPrice, Price);
impl_price_compare!(Price, LowPrice);
impl_price_compare!(Price, HighPrice);
impl_price_compare!(OpenPrice, Price);
impl_price_compare!(ClosePrice, Price);

/// An evenly chunked price interval. The volume profile, the HVN engines and
/// the plot layers all agree on bin geometry through this one type.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct PriceRange<T: PriceLike + PartialEq> {
    pub start: T,
    pub end: T,
    pub n_chunks: usize,
}

impl<T: PriceLike + PartialEq> PriceRange<T> {
    pub fn new(start: T, end: T, n_chunks: usize) -> Self {
        Self {
            start,
            end,
            n_chunks,
        }
    }

    pub fn min_max(&self) -> (f64, f64) {
        (self.start.value(), self.end.value())
    }

    pub fn chunk_size(&self) -> f64 {
        (self.end.value() - self.start.value()) / self.n_chunks as f64
    }

    pub fn chunk_index(&self, value: T) -> usize {
        let index = (value.value() - self.start.value()) / self.chunk_size();
        (index as usize).min(self.n_chunks - 1)
    }

    pub fn chunk_bounds(&self, idx: usize) -> (f64, f64) {
        let low = self.start.value() + idx as f64 * self.chunk_size();
        let high = self.start.value() + (idx + 1) as f64 * self.chunk_size();
        (low, high)
    }

    pub fn count_intersecting_chunks(&self, low: T, high: T) -> usize {
        let mut x_low = low.value();
        let mut x_high = high.value();

        if x_high < x_low {
            (x_low, x_high) = (x_high, x_low);
        }

        let first = ((x_low - self.start.value()) / self.chunk_size()).floor() as isize;
        let last = ((x_high - self.start.value()) / self.chunk_size()).floor() as isize;

        let first = first.max(0);
        let last = last.min((self.n_chunks - 1) as isize);

        if last < first {
            return 0;
        }

        (last - first + 1) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Weight(f64);

impl Weight {
    pub const fn new(val: f64) -> Self {
        let v = if val < 0.0 { 0.0 } else { val };
        Self(v)
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_index_clamps_to_last_chunk() {
        let range = PriceRange::new(Price::new(100.0), Price::new(200.0), 10);
        assert_eq!(range.chunk_index(Price::new(100.0)), 0);
        assert_eq!(range.chunk_index(Price::new(155.0)), 5);
        // End of range lands in the final chunk, not one past it
        assert_eq!(range.chunk_index(Price::new(200.0)), 9);
    }

    #[test]
    fn intersecting_chunks_covers_touched_bins() {
        let range = PriceRange::new(Price::new(0.0), Price::new(100.0), 100);
        // A span strictly inside one bin still touches that bin
        assert_eq!(
            range.count_intersecting_chunks(Price::new(5.2), Price::new(5.8)),
            1
        );
        assert_eq!(
            range.count_intersecting_chunks(Price::new(5.5), Price::new(8.5)),
            4
        );
        // Inverted inputs are normalized
        assert_eq!(
            range.count_intersecting_chunks(Price::new(8.5), Price::new(5.5)),
            4
        );
        // Fully outside the range
        assert_eq!(
            range.count_intersecting_chunks(Price::new(150.0), Price::new(160.0)),
            0
        );
    }
}

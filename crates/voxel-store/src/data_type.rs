use std::cmp::Ordering;
use std::fmt::Debug;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

/// The voxel types a store can hold, named by their NumPy / Zarr dtype strings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    #[serde(rename = "|u1")]
    Uint8,

    #[serde(rename = "<u2")]
    Uint16,

    #[serde(rename = "<u4")]
    Uint32,

    #[serde(rename = "<u8")]
    Uint64,

    #[serde(rename = "<f4")]
    Float32,

    #[serde(rename = "<f8")]
    Float64,
}

impl ElementType {
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::Uint8 => 1,
            ElementType::Uint16 => 2,
            ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Uint64 | ElementType::Float64 => 8,
        }
    }
}

/// A voxel value.
///
/// The background value is the all-zero bit pattern (`Pod` guarantees it exists), so a freshly
/// allocated buffer is background everywhere.
pub trait Element: Pod + Debug + PartialOrd + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    /// Total order used by the block reductions. NaNs sort last.
    fn voxel_cmp(&self, other: &Self) -> Ordering;

    /// The average of two values in this type. Integer types truncate toward zero.
    fn mean_of_two(a: Self, b: Self) -> Self;

    fn to_f64(self) -> f64;

    /// Converts back from a filter result. Integer types round to nearest and saturate.
    fn from_f64_rounded(value: f64) -> Self;

    fn is_background(&self) -> bool {
        bytemuck::bytes_of(self).iter().all(|&b| b == 0)
    }
}

macro_rules! impl_integer_element {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Element for $t {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;

                fn voxel_cmp(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                fn mean_of_two(a: Self, b: Self) -> Self {
                    ((a as i128 + b as i128) / 2) as $t
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64_rounded(value: f64) -> Self {
                    value.round() as $t
                }
            }
        )+
    };
}

macro_rules! impl_float_element {
    ($($t:ty => $variant:ident),+ $(,)?) => {
        $(
            impl Element for $t {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;

                fn voxel_cmp(&self, other: &Self) -> Ordering {
                    match (self.is_nan(), other.is_nan()) {
                        (true, true) => Ordering::Equal,
                        (true, false) => Ordering::Greater,
                        (false, true) => Ordering::Less,
                        (false, false) => self.partial_cmp(other).unwrap_or(Ordering::Equal),
                    }
                }

                fn mean_of_two(a: Self, b: Self) -> Self {
                    ((a as f64 + b as f64) / 2.0) as $t
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64_rounded(value: f64) -> Self {
                    value as $t
                }

                fn is_background(&self) -> bool {
                    *self == 0.0
                }
            }
        )+
    };
}

impl_integer_element!(u8 => Uint8, u16 => Uint16, u32 => Uint32, u64 => Uint64);
impl_float_element!(f32 => Float32, f64 => Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_midpoint_truncates() {
        assert_eq!(<u8 as Element>::mean_of_two(2, 3), 2);
        assert_eq!(<u8 as Element>::mean_of_two(255, 254), 254);
        assert_eq!(<u64 as Element>::mean_of_two(u64::MAX, u64::MAX - 1), u64::MAX - 1);
    }

    #[test]
    fn float_midpoint_is_exact() {
        assert_eq!(<f32 as Element>::mean_of_two(2.0, 3.0), 2.5);
    }

    #[test]
    fn rounding_saturates_integers() {
        assert_eq!(u8::from_f64_rounded(2.5), 3);
        assert_eq!(u8::from_f64_rounded(300.0), 255);
        assert_eq!(u8::from_f64_rounded(-4.0), 0);
        assert_eq!(u16::from_f64_rounded(1.49), 1);
    }

    #[test]
    fn negative_zero_counts_as_background() {
        assert!((-0.0f32).is_background());
        assert!(0u16.is_background());
        assert!(!1u16.is_background());
    }

    #[test]
    fn element_type_uses_dtype_strings() {
        assert_eq!(
            serde_json::to_string(&ElementType::Uint16).unwrap(),
            "\"<u2\""
        );
        assert_eq!(
            serde_json::from_str::<ElementType>("\"|u1\"").unwrap(),
            ElementType::Uint8
        );
        assert_eq!(u32::ELEMENT_TYPE.size_bytes(), 4);
    }
}

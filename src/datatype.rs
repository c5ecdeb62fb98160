//! BLACS element type trait and type tag mapping.
//!
//! This module provides the [`BlacsDatatype`] trait, a sealed trait that maps
//! Rust element types to the BLACS routine family used to move them.
//!
//! # Supported Types
//!
//! | Rust Type   | C Type           | Routine Prefix | Tag Value |
//! |-------------|------------------|----------------|-----------|
//! | `i32`       | `int`            | `i`            | 0         |
//! | `f32`       | `float`          | `s`            | 1         |
//! | `f64`       | `double`         | `d`            | 2         |
//! | `Complex32` | `float[2]`       | `c`            | 3         |
//! | `Complex64` | `double[2]`      | `z`            | 4         |

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Element type tags, one per BLACS routine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit signed integer (`Ci*2d`)
    Int = 0,
    /// 32-bit floating point (`Cs*2d`)
    Float = 1,
    /// 64-bit floating point (`Cd*2d`)
    Double = 2,
    /// Single precision complex (`Cc*2d`)
    ComplexFloat = 3,
    /// Double precision complex (`Cz*2d`)
    ComplexDouble = 4,
}

impl DatatypeTag {
    /// The BLACS routine prefix for this type (`i`, `s`, `d`, `c`, `z`).
    pub fn prefix(self) -> char {
        match self {
            DatatypeTag::Int => 'i',
            DatatypeTag::Float => 's',
            DatatypeTag::Double => 'd',
            DatatypeTag::ComplexFloat => 'c',
            DatatypeTag::ComplexDouble => 'z',
        }
    }

    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        match self {
            DatatypeTag::Int | DatatypeTag::Float => 4,
            DatatypeTag::Double | DatatypeTag::ComplexFloat => 8,
            DatatypeTag::ComplexDouble => 16,
        }
    }
}

/// Single precision complex number with the C layout BLACS expects.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex32 {
    /// Real part
    pub re: f32,
    /// Imaginary part
    pub im: f32,
}

impl Complex32 {
    /// Create a complex number from its parts.
    pub const fn new(re: f32, im: f32) -> Self {
        Complex32 { re, im }
    }
}

/// Double precision complex number with the C layout BLACS expects.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex64 {
    /// Real part
    pub re: f64,
    /// Imaginary part
    pub im: f64,
}

impl Complex64 {
    /// Create a complex number from its parts.
    pub const fn new(re: f64, im: f64) -> Self {
        Complex64 { re, im }
    }
}

/// Trait for element types that BLACS can transfer.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`i32`], [`f32`], [`f64`], [`Complex32`], [`Complex64`].
/// Any other element type is rejected when the call is compiled:
///
/// ```compile_fail
/// use ferroblacs::{Grid, LocalHub, Scope, Topology};
///
/// let hub = LocalHub::new(1);
/// let grid = Grid::new(hub.backend(0), 1, 1, Default::default()).unwrap();
/// let data = vec![0u8; 4];
/// grid.broadcast_send_sized(Scope::All, Topology::Default, &data).unwrap();
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a BLACS element type",
    note = "BLACS transfers support i32, f32, f64, Complex32 and Complex64"
)]
pub trait BlacsDatatype: sealed::Sealed + Copy + Send + 'static {
    /// The datatype tag used for routine dispatch.
    const TAG: DatatypeTag;
}

macro_rules! impl_blacs_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl BlacsDatatype for $ty {
            const TAG: DatatypeTag = $tag;
        }
    };
}

impl_blacs_datatype!(i32, DatatypeTag::Int);
impl_blacs_datatype!(f32, DatatypeTag::Float);
impl_blacs_datatype!(f64, DatatypeTag::Double);
impl_blacs_datatype!(Complex32, DatatypeTag::ComplexFloat);
impl_blacs_datatype!(Complex64, DatatypeTag::ComplexDouble);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_values_are_sequential() {
        let tags = [
            DatatypeTag::Int,
            DatatypeTag::Float,
            DatatypeTag::Double,
            DatatypeTag::ComplexFloat,
            DatatypeTag::ComplexDouble,
        ];
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32, "Tag {tag:?} should have value {i}");
        }
    }

    #[test]
    fn routine_prefixes() {
        assert_eq!(i32::TAG.prefix(), 'i');
        assert_eq!(f32::TAG.prefix(), 's');
        assert_eq!(f64::TAG.prefix(), 'd');
        assert_eq!(Complex32::TAG.prefix(), 'c');
        assert_eq!(Complex64::TAG.prefix(), 'z');
    }

    #[test]
    fn tag_size_matches_rust_layout() {
        assert_eq!(i32::TAG.size(), std::mem::size_of::<i32>());
        assert_eq!(f32::TAG.size(), std::mem::size_of::<f32>());
        assert_eq!(f64::TAG.size(), std::mem::size_of::<f64>());
        assert_eq!(Complex32::TAG.size(), std::mem::size_of::<Complex32>());
        assert_eq!(Complex64::TAG.size(), std::mem::size_of::<Complex64>());
    }

    #[test]
    fn complex_layout_is_c_pair() {
        assert_eq!(std::mem::align_of::<Complex32>(), std::mem::align_of::<f32>());
        assert_eq!(std::mem::align_of::<Complex64>(), std::mem::align_of::<f64>());

        let z = [Complex64::new(1.0, -2.0)];
        let parts: &[f64] = unsafe { std::slice::from_raw_parts(z.as_ptr().cast::<f64>(), 2) };
        assert_eq!(parts, &[1.0, -2.0]);
    }

    #[test]
    fn trait_is_implemented() {
        fn assert_blacs_datatype<T: BlacsDatatype>() {}
        assert_blacs_datatype::<i32>();
        assert_blacs_datatype::<f32>();
        assert_blacs_datatype::<f64>();
        assert_blacs_datatype::<Complex32>();
        assert_blacs_datatype::<Complex64>();
    }
}

//! Buffer shapes and the part of a buffer a transfer touches.

use crate::error::{Error, Result};
use crate::params::{Diagonal, Triangle};

/// Shape of a column-major buffer: `rows x cols` with leading dimension `lda`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rows: i32,
    cols: i32,
    lda: i32,
}

impl Shape {
    /// Create a shape, requiring non-negative extents and `lda >= max(1, rows)`.
    pub fn new(rows: i32, cols: i32, lda: i32) -> Result<Self> {
        if rows < 0 || cols < 0 || lda < rows.max(1) {
            return Err(Error::InvalidShape { rows, cols, lda });
        }
        Ok(Shape { rows, cols, lda })
    }

    /// Shape of a slice viewed as a single column: `len x 1`, `lda = len`.
    ///
    /// An empty slice gets `lda = 1` so the shape stays valid.
    pub fn column(len: usize) -> Result<Self> {
        let rows = i32::try_from(len).map_err(|_| Error::LengthOverflow(len))?;
        Shape::new(rows, 1, rows.max(1))
    }

    /// Shape without validation, for callers that take responsibility.
    pub(crate) fn unchecked(rows: i32, cols: i32, lda: i32) -> Self {
        Shape { rows, cols, lda }
    }

    /// Number of rows.
    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> i32 {
        self.cols
    }

    /// Leading dimension.
    pub fn lda(&self) -> i32 {
        self.lda
    }

    /// Whether the shape addresses no elements.
    pub fn is_empty(&self) -> bool {
        self.rows <= 0 || self.cols <= 0
    }

    /// Minimum buffer length the shape addresses.
    pub fn required_len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.lda as usize * (self.cols as usize - 1) + self.rows as usize
        }
    }

    /// Check that a buffer of `len` elements covers the shape.
    pub fn check(&self, len: usize) -> Result<()> {
        let required = self.required_len();
        if len < required {
            return Err(Error::BufferTooSmall {
                required,
                actual: len,
            });
        }
        Ok(())
    }

    /// Linear offset of element `(i, j)`.
    pub(crate) fn offset(&self, i: usize, j: usize) -> usize {
        j * self.lda as usize + i
    }
}

/// Which elements of a shaped buffer a transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The whole rectangle (`ge` routines)
    General,
    /// A trapezoid (`tr` routines)
    Trapezoid {
        /// Upper or lower half
        triangle: Triangle,
        /// Whether the boundary diagonal is left out
        diagonal: Diagonal,
    },
}

impl Region {
    /// BLACS routine family for this region (`"ge"` or `"tr"`).
    pub fn family(&self) -> &'static str {
        match self {
            Region::General => "ge",
            Region::Trapezoid { .. } => "tr",
        }
    }

    /// Whether element `(i, j)` of an `m x n` buffer belongs to the region.
    ///
    /// Trapezoids follow the BLACS convention: the diagonal is anchored so the
    /// rectangular part of a non-square trapezoid is full. For `Upper` the
    /// boundary is `i == j + max(m - n, 0)`, for `Lower` it is
    /// `j == i + max(n - m, 0)`.
    pub fn contains(&self, shape: &Shape, i: usize, j: usize) -> bool {
        let (m, n) = (shape.rows as i64, shape.cols as i64);
        let (i, j) = (i as i64, j as i64);
        match *self {
            Region::General => true,
            Region::Trapezoid { triangle, diagonal } => {
                let slack = match triangle {
                    Triangle::Upper => j + (m - n).max(0) - i,
                    Triangle::Lower => i + (n - m).max(0) - j,
                };
                match diagonal {
                    Diagonal::NonUnit => slack >= 0,
                    Diagonal::Unit => slack > 0,
                }
            }
        }
    }

    /// Column-major iterator over the `(i, j)` positions in the region.
    pub fn positions(self, shape: Shape) -> impl Iterator<Item = (usize, usize)> {
        let rows = shape.rows.max(0) as usize;
        let cols = shape.cols.max(0) as usize;
        (0..cols)
            .flat_map(move |j| (0..rows).map(move |i| (i, j)))
            .filter(move |&(i, j)| self.contains(&shape, i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(region: Region, m: i32, n: i32) -> Vec<String> {
        let shape = Shape::new(m, n, m.max(1)).unwrap();
        (0..m as usize)
            .map(|i| {
                (0..n as usize)
                    .map(|j| if region.contains(&shape, i, j) { 'x' } else { '.' })
                    .collect()
            })
            .collect()
    }

    const UPPER: Region = Region::Trapezoid {
        triangle: Triangle::Upper,
        diagonal: Diagonal::NonUnit,
    };
    const UPPER_UNIT: Region = Region::Trapezoid {
        triangle: Triangle::Upper,
        diagonal: Diagonal::Unit,
    };
    const LOWER: Region = Region::Trapezoid {
        triangle: Triangle::Lower,
        diagonal: Diagonal::NonUnit,
    };
    const LOWER_UNIT: Region = Region::Trapezoid {
        triangle: Triangle::Lower,
        diagonal: Diagonal::Unit,
    };

    #[test]
    fn shape_validation() {
        assert!(Shape::new(3, 2, 3).is_ok());
        assert!(Shape::new(0, 0, 1).is_ok());
        assert_eq!(
            Shape::new(3, 2, 2),
            Err(Error::InvalidShape {
                rows: 3,
                cols: 2,
                lda: 2
            })
        );
        assert!(Shape::new(0, 4, 0).is_err());
        assert!(Shape::new(-1, 1, 1).is_err());
        assert!(Shape::new(1, -1, 1).is_err());
    }

    #[test]
    fn required_len_uses_leading_dimension() {
        let shape = Shape::new(3, 4, 5).unwrap();
        assert_eq!(shape.required_len(), 5 * 3 + 3);
        assert!(shape.check(18).is_ok());
        assert_eq!(
            shape.check(17),
            Err(Error::BufferTooSmall {
                required: 18,
                actual: 17
            })
        );
        assert_eq!(Shape::new(0, 7, 1).unwrap().required_len(), 0);
    }

    #[test]
    fn column_shape() {
        let shape = Shape::column(6).unwrap();
        assert_eq!((shape.rows(), shape.cols(), shape.lda()), (6, 1, 6));
        let empty = Shape::column(0).unwrap();
        assert_eq!((empty.rows(), empty.cols(), empty.lda()), (0, 1, 1));
        assert!(empty.is_empty());
    }

    #[test]
    fn square_trapezoids() {
        assert_eq!(mask(UPPER, 3, 3), ["xxx", ".xx", "..x"]);
        assert_eq!(mask(UPPER_UNIT, 3, 3), [".xx", "..x", "..."]);
        assert_eq!(mask(LOWER, 3, 3), ["x..", "xx.", "xxx"]);
        assert_eq!(mask(LOWER_UNIT, 3, 3), ["...", "x..", "xx."]);
    }

    #[test]
    fn tall_and_wide_trapezoids() {
        // m > n: upper keeps the top m - n rows full
        assert_eq!(mask(UPPER, 4, 2), ["xx", "xx", "xx", ".x"]);
        assert_eq!(mask(LOWER, 4, 2), ["x.", "xx", "xx", "xx"]);
        // m < n: lower keeps the left n - m columns full
        assert_eq!(mask(LOWER, 2, 4), ["xxx.", "xxxx"]);
        assert_eq!(mask(UPPER, 2, 4), ["xxxx", ".xxx"]);
        assert_eq!(mask(LOWER_UNIT, 2, 4), ["xx..", "xxx."]);
    }

    #[test]
    fn positions_are_column_major() {
        let shape = Shape::new(2, 2, 2).unwrap();
        let all: Vec<_> = Region::General.positions(shape).collect();
        assert_eq!(all, [(0, 0), (1, 0), (0, 1), (1, 1)]);
        let upper: Vec<_> = UPPER.positions(shape).collect();
        assert_eq!(upper, [(0, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn region_family() {
        assert_eq!(Region::General.family(), "ge");
        assert_eq!(LOWER.family(), "tr");
    }
}

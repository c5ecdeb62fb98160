//! Scoped broadcast send and receive (`?gebs2d`, `?gebr2d`, `?trbs2d`, `?trbr2d`).
//!
//! Every operation comes in explicit call shapes instead of overloads:
//!
//! | Shape    | Buffer                  | Validation                            |
//! |----------|-------------------------|---------------------------------------|
//! | `*_ptr`  | raw pointer + `M, N, LDA` | none (`unsafe`)                     |
//! | plain    | slice + `M, N, LDA`     | shape and length checked              |
//! | `*_sized`| slice                   | `M = len, N = 1, LDA = len`           |

use crate::backend::Backend;
use crate::datatype::BlacsDatatype;
use crate::error::Result;
use crate::grid::Grid;
use crate::params::{Diagonal, GridCoord, Scope, Topology, Triangle};
use crate::region::{Region, Shape};
use log::trace;

impl<B: Backend> Grid<B> {
    unsafe fn broadcast_send_region<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        region: Region,
        shape: Shape,
        a: *const T,
    ) -> Result<()> {
        trace!(
            "{}{}bs2d ctx={} scope={:?} top={:?} {}x{} lda={}",
            T::TAG.prefix(),
            region.family(),
            self.context(),
            scope.token(),
            top.token(),
            shape.rows(),
            shape.cols(),
            shape.lda()
        );
        self.backend()
            .broadcast_send(self.context(), T::TAG, scope, top, region, shape, a.cast())
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn broadcast_recv_region<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        region: Region,
        shape: Shape,
        a: *mut T,
        src: GridCoord,
    ) -> Result<()> {
        trace!(
            "{}{}br2d ctx={} scope={:?} top={:?} {}x{} lda={} src={}",
            T::TAG.prefix(),
            region.family(),
            self.context(),
            scope.token(),
            top.token(),
            shape.rows(),
            shape.cols(),
            shape.lda(),
            src
        );
        self.backend().broadcast_recv(
            self.context(),
            T::TAG,
            scope,
            top,
            region,
            shape,
            a.cast(),
            src,
        )
    }

    // ========================================================================
    // General (rectangular) broadcast
    // ========================================================================

    /// Broadcast an `rows x cols` column-major block to every process in `scope`.
    ///
    /// # Safety
    ///
    /// `a` must point to at least `lda * (cols - 1) + rows` readable elements
    /// and `lda >= max(1, rows)`. No check is made.
    pub unsafe fn broadcast_send_ptr<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        rows: i32,
        cols: i32,
        a: *const T,
        lda: i32,
    ) -> Result<()> {
        let shape = Shape::unchecked(rows, cols, lda);
        self.broadcast_send_region(scope, top, Region::General, shape, a)
    }

    /// Broadcast an `rows x cols` column-major block held in a slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShape`](crate::Error::InvalidShape) or
    /// [`Error::BufferTooSmall`](crate::Error::BufferTooSmall) if the shape
    /// does not describe the slice.
    pub fn broadcast_send<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        rows: i32,
        cols: i32,
        a: &[T],
        lda: i32,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        unsafe { self.broadcast_send_region(scope, top, Region::General, shape, a.as_ptr()) }
    }

    /// Broadcast a whole slice as a single column.
    ///
    /// Equivalent to [`broadcast_send`](Self::broadcast_send) with
    /// `rows = a.len()`, `cols = 1`, `lda = a.len()`.
    pub fn broadcast_send_sized<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        a: &[T],
    ) -> Result<()> {
        let shape = Shape::column(a.len())?;
        unsafe { self.broadcast_send_region(scope, top, Region::General, shape, a.as_ptr()) }
    }

    /// Receive a broadcast `rows x cols` block sent by `src`.
    ///
    /// # Safety
    ///
    /// `a` must point to at least `lda * (cols - 1) + rows` writable elements,
    /// `lda >= max(1, rows)`, and `src` must be a coordinate of this grid.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn broadcast_recv_ptr<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        rows: i32,
        cols: i32,
        a: *mut T,
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        let shape = Shape::unchecked(rows, cols, lda);
        self.broadcast_recv_region(scope, top, Region::General, shape, a, src)
    }

    /// Receive a broadcast `rows x cols` block into a slice.
    ///
    /// Elements outside the block (the `lda - rows` padding rows) are left
    /// untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn broadcast_recv<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        rows: i32,
        cols: i32,
        a: &mut [T],
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        self.check_coord(src)?;
        unsafe {
            self.broadcast_recv_region(scope, top, Region::General, shape, a.as_mut_ptr(), src)
        }
    }

    /// Receive a broadcast into a whole slice viewed as a single column.
    pub fn broadcast_recv_sized<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        a: &mut [T],
        src: GridCoord,
    ) -> Result<()> {
        let shape = Shape::column(a.len())?;
        self.check_coord(src)?;
        unsafe {
            self.broadcast_recv_region(scope, top, Region::General, shape, a.as_mut_ptr(), src)
        }
    }

    // ========================================================================
    // Trapezoidal broadcast
    // ========================================================================

    /// Broadcast the `triangle` trapezoid of an `rows x cols` block.
    ///
    /// With [`Diagonal::Unit`] the boundary diagonal is not sent.
    ///
    /// # Safety
    ///
    /// Same requirements as [`broadcast_send_ptr`](Self::broadcast_send_ptr).
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn broadcast_send_triangular_ptr<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: *const T,
        lda: i32,
    ) -> Result<()> {
        let shape = Shape::unchecked(rows, cols, lda);
        let region = Region::Trapezoid { triangle, diagonal };
        self.broadcast_send_region(scope, top, region, shape, a)
    }

    /// Broadcast the `triangle` trapezoid of a block held in a slice.
    #[allow(clippy::too_many_arguments)]
    pub fn broadcast_send_triangular<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: &[T],
        lda: i32,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        let region = Region::Trapezoid { triangle, diagonal };
        unsafe { self.broadcast_send_region(scope, top, region, shape, a.as_ptr()) }
    }

    /// Receive a broadcast trapezoid sent by `src`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`broadcast_recv_ptr`](Self::broadcast_recv_ptr).
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn broadcast_recv_triangular_ptr<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: *mut T,
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        let shape = Shape::unchecked(rows, cols, lda);
        let region = Region::Trapezoid { triangle, diagonal };
        self.broadcast_recv_region(scope, top, region, shape, a, src)
    }

    /// Receive a broadcast trapezoid into a slice.
    ///
    /// Only the selected trapezoid is written; the other half keeps its
    /// previous contents.
    #[allow(clippy::too_many_arguments)]
    pub fn broadcast_recv_triangular<T: BlacsDatatype>(
        &self,
        scope: Scope,
        top: Topology,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: &mut [T],
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        self.check_coord(src)?;
        let region = Region::Trapezoid { triangle, diagonal };
        unsafe { self.broadcast_recv_region(scope, top, region, shape, a.as_mut_ptr(), src) }
    }
}

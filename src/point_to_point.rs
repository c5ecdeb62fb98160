//! Point-to-point send and receive (`?gesd2d`, `?gerv2d`, `?trsd2d`, `?trrv2d`).
//!
//! Same call shapes as the broadcast module, with an explicit destination or
//! source coordinate in place of a scope.

use crate::backend::Backend;
use crate::datatype::BlacsDatatype;
use crate::error::Result;
use crate::grid::Grid;
use crate::params::{Diagonal, GridCoord, Triangle};
use crate::region::{Region, Shape};
use log::trace;

impl<B: Backend> Grid<B> {
    unsafe fn send_region<T: BlacsDatatype>(
        &self,
        region: Region,
        shape: Shape,
        a: *const T,
        dest: GridCoord,
    ) -> Result<()> {
        trace!(
            "{}{}sd2d ctx={} {}x{} lda={} dest={}",
            T::TAG.prefix(),
            region.family(),
            self.context(),
            shape.rows(),
            shape.cols(),
            shape.lda(),
            dest
        );
        self.backend()
            .send(self.context(), T::TAG, region, shape, a.cast(), dest)
    }

    unsafe fn recv_region<T: BlacsDatatype>(
        &self,
        region: Region,
        shape: Shape,
        a: *mut T,
        src: GridCoord,
    ) -> Result<()> {
        trace!(
            "{}{}rv2d ctx={} {}x{} lda={} src={}",
            T::TAG.prefix(),
            region.family(),
            self.context(),
            shape.rows(),
            shape.cols(),
            shape.lda(),
            src
        );
        self.backend()
            .recv(self.context(), T::TAG, region, shape, a.cast(), src)
    }

    /// Send an `rows x cols` column-major block to `dest`.
    ///
    /// # Safety
    ///
    /// `a` must point to at least `lda * (cols - 1) + rows` readable elements,
    /// `lda >= max(1, rows)`, and `dest` must be a coordinate of this grid.
    pub unsafe fn send_ptr<T: BlacsDatatype>(
        &self,
        rows: i32,
        cols: i32,
        a: *const T,
        lda: i32,
        dest: GridCoord,
    ) -> Result<()> {
        self.send_region(Region::General, Shape::unchecked(rows, cols, lda), a, dest)
    }

    /// Send an `rows x cols` column-major block held in a slice to `dest`.
    pub fn send<T: BlacsDatatype>(
        &self,
        rows: i32,
        cols: i32,
        a: &[T],
        lda: i32,
        dest: GridCoord,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        self.check_coord(dest)?;
        unsafe { self.send_region(Region::General, shape, a.as_ptr(), dest) }
    }

    /// Send a whole slice as a single column to `dest`.
    pub fn send_sized<T: BlacsDatatype>(&self, a: &[T], dest: GridCoord) -> Result<()> {
        let shape = Shape::column(a.len())?;
        self.check_coord(dest)?;
        unsafe { self.send_region(Region::General, shape, a.as_ptr(), dest) }
    }

    /// Send the `triangle` trapezoid of a block to `dest`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`send_ptr`](Self::send_ptr).
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn send_triangular_ptr<T: BlacsDatatype>(
        &self,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: *const T,
        lda: i32,
        dest: GridCoord,
    ) -> Result<()> {
        let region = Region::Trapezoid { triangle, diagonal };
        self.send_region(region, Shape::unchecked(rows, cols, lda), a, dest)
    }

    /// Send the `triangle` trapezoid of a block held in a slice to `dest`.
    #[allow(clippy::too_many_arguments)]
    pub fn send_triangular<T: BlacsDatatype>(
        &self,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: &[T],
        lda: i32,
        dest: GridCoord,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        self.check_coord(dest)?;
        let region = Region::Trapezoid { triangle, diagonal };
        unsafe { self.send_region(region, shape, a.as_ptr(), dest) }
    }

    /// Receive an `rows x cols` block from `src`.
    ///
    /// # Safety
    ///
    /// `a` must point to at least `lda * (cols - 1) + rows` writable elements,
    /// `lda >= max(1, rows)`, and `src` must be a coordinate of this grid.
    pub unsafe fn recv_ptr<T: BlacsDatatype>(
        &self,
        rows: i32,
        cols: i32,
        a: *mut T,
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        self.recv_region(Region::General, Shape::unchecked(rows, cols, lda), a, src)
    }

    /// Receive an `rows x cols` block from `src` into a slice.
    pub fn recv<T: BlacsDatatype>(
        &self,
        rows: i32,
        cols: i32,
        a: &mut [T],
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        let shape = Shape::new(rows, cols, lda)?;
        shape.check(a.len())?;
        self.check_coord(src)?;
        unsafe { self.recv_region(Region::General, shape, a.as_mut_ptr(), src) }
    }

    /// Receive into a whole slice viewed as a single column.
    pub fn recv_sized<T: BlacsDatatype>(&self, a: &mut [T], src: GridCoord) -> Result<()> {
        let shape = Shape::column(a.len())?;
        self.check_coord(src)?;
        unsafe { self.recv_region(Region::General, shape, a.as_mut_ptr(), src) }
    }

    /// Receive a trapezoid from `src`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`recv_ptr`](Self::recv_ptr).
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn recv_triangular_ptr<T: BlacsDatatype>(
        &self,
        triangle: Triangle,
        diagonal: Diagonal,
        rows: i32,
        cols: i32,
        a: *mut T,
        lda: i32,
        src: GridCoord,
    ) -> Result<()> {
        let region = Region::Trapezoid { triangle, diagonal };
        self.recv_region(region, Shape::unchecked(rows, cols, lda), a, src)
    }

    /// Receive a trapezoid from `src` into a slice, leaving the other half
    /// untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn recv_triangular<T: BlacsDatatype>(
        &self,
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
        unsafe { self.recv_region(region, shape, a.as_mut_ptr(), src) }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::local::LocalHub;
    use crate::params::{Diagonal, GridCoord, GridOrder, Triangle};
    use crate::{Complex32, Grid};

    #[test]
    fn self_send_with_padding() {
        let hub = LocalHub::new(1);
        let grid = Grid::new(hub.backend(0), 1, 1, GridOrder::RowMajor).unwrap();
        let me = grid.coord();

        // 2x2 block stored with lda = 3
        let send = vec![1, 2, -1, 3, 4, -1];
        let mut recv = vec![9; 6];
        grid.send(2, 2, &send, 3, me).unwrap();
        grid.recv(2, 2, &mut recv, 3, me).unwrap();
        assert_eq!(recv, vec![1, 2, 9, 3, 4, 9]);
    }

    #[test]
    fn self_send_triangular_complex() {
        let hub = LocalHub::new(1);
        let grid = Grid::new(hub.backend(0), 1, 1, GridOrder::RowMajor).unwrap();
        let me = grid.coord();

        let send: Vec<Complex32> = (0..4).map(|k| Complex32::new(k as f32, 1.0)).collect();
        let mut recv = vec![Complex32::default(); 4];
        grid.send_triangular(Triangle::Lower, Diagonal::Unit, 2, 2, &send, 2, me)
            .unwrap();
        grid.recv_triangular(Triangle::Lower, Diagonal::Unit, 2, 2, &mut recv, 2, me)
            .unwrap();
        // Only (1, 0) is strictly below the diagonal of a 2x2 block
        assert_eq!(
            recv,
            vec![
                Complex32::default(),
                Complex32::new(1.0, 1.0),
                Complex32::default(),
                Complex32::default()
            ]
        );
    }

    #[test]
    fn destination_outside_grid() {
        let hub = LocalHub::new(2);
        let grid = Grid::new(hub.backend(0), 1, 1, GridOrder::RowMajor).unwrap();
        assert_eq!(
            grid.send_sized(&[1.0f32], GridCoord::new(0, 1)),
            Err(Error::coord(0, 1))
        );
    }
}

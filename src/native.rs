//! Backend over the native C BLACS interface.

use crate::backend::{Backend, GridInfo};
use crate::datatype::DatatypeTag;
use crate::error::{Error, Result};
use crate::ffi;
use crate::params::{GridCoord, GridOrder, Scope, Topology};
use crate::region::{Region, Shape};
use std::ffi::c_void;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag tracking whether this process holds a [`NativeBackend`]
static BLACS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Picks the routine of the right element family for `$tag` and calls it.
macro_rules! dispatch {
    ($tag:expr, [$i:ident, $s:ident, $d:ident, $c:ident, $z:ident], ($($arg:expr),* $(,)?)) => {
        match $tag {
            DatatypeTag::Int => ffi::$i($($arg),*),
            DatatypeTag::Float => ffi::$s($($arg),*),
            DatatypeTag::Double => ffi::$d($($arg),*),
            DatatypeTag::ComplexFloat => ffi::$c($($arg),*),
            DatatypeTag::ComplexDouble => ffi::$z($($arg),*),
        }
    };
}

/// Native BLACS environment handle.
///
/// There can only be one instance per process. Dropping it calls
/// `blacs_exit(0)`, which also finalizes MPI, so every [`Grid`](crate::Grid)
/// borrows it and must be dropped first.
///
/// # Example
///
/// ```no_run
/// use ferroblacs::{Grid, GridOrder, NativeBackend};
///
/// let blacs = NativeBackend::init().expect("Failed to initialize BLACS");
/// let grid = Grid::new(&blacs, 2, 2, GridOrder::RowMajor).unwrap();
/// println!("I am at {} in a {}x{} grid", grid.coord(), grid.nprow(), grid.npcol());
/// ```
pub struct NativeBackend {
    /// Marker to make the handle !Send and !Sync
    _marker: PhantomData<*const ()>,
}

impl NativeBackend {
    /// Initialize BLACS (and MPI, if nobody has yet).
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if a handle already exists.
    pub fn init() -> Result<Self> {
        if BLACS_INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInitialized);
        }

        // blacs_pinfo brings up the underlying MPI layer on first use
        let (mut rank, mut nprocs) = (0, 0);
        unsafe { ffi::Cblacs_pinfo(&mut rank, &mut nprocs) };
        log::debug!("BLACS initialized: process {rank} of {nprocs}");

        Ok(NativeBackend {
            _marker: PhantomData,
        })
    }

    /// Version of the BLACS library linked at build time.
    ///
    /// Known only when the library was located through pkg-config; `None`
    /// for libraries found by directory.
    pub fn version() -> Option<&'static str> {
        option_env!("BLACS_VERSION").filter(|v| !v.trim().is_empty())
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        if BLACS_INITIALIZED.load(Ordering::SeqCst) {
            unsafe { ffi::Cblacs_exit(0) };
            BLACS_INITIALIZED.store(false, Ordering::SeqCst);
        }
    }
}

impl Backend for NativeBackend {
    fn process_info(&self) -> Result<(i32, i32)> {
        let (mut rank, mut nprocs) = (0, 0);
        unsafe { ffi::Cblacs_pinfo(&mut rank, &mut nprocs) };
        Ok((rank, nprocs))
    }

    fn system_context(&self) -> Result<i32> {
        let mut context = 0;
        unsafe { ffi::Cblacs_get(-1, 0, &mut context) };
        Ok(context)
    }

    fn grid_init(
        &self,
        system_context: i32,
        order: GridOrder,
        nprow: i32,
        npcol: i32,
    ) -> Result<i32> {
        let mut context = system_context;
        unsafe { ffi::Cblacs_gridinit(&mut context, order.as_cstr().as_ptr(), nprow, npcol) };
        Ok(context)
    }

    fn grid_info(&self, context: i32) -> Result<GridInfo> {
        let mut info = GridInfo {
            nprow: -1,
            npcol: -1,
            myrow: -1,
            mycol: -1,
        };
        if context >= 0 {
            unsafe {
                ffi::Cblacs_gridinfo(
                    context,
                    &mut info.nprow,
                    &mut info.npcol,
                    &mut info.myrow,
                    &mut info.mycol,
                );
            }
        }
        Ok(info)
    }

    fn grid_exit(&self, context: i32) -> Result<()> {
        unsafe { ffi::Cblacs_gridexit(context) };
        Ok(())
    }

    fn barrier(&self, context: i32, scope: Scope) -> Result<()> {
        unsafe { ffi::Cblacs_barrier(context, scope.as_cstr().as_ptr()) };
        Ok(())
    }

    fn pnum(&self, context: i32, coord: GridCoord) -> Result<i32> {
        Ok(unsafe { ffi::Cblacs_pnum(context, coord.row, coord.col) })
    }

    fn pcoord(&self, context: i32, pnum: i32) -> Result<GridCoord> {
        let (mut row, mut col) = (0, 0);
        unsafe { ffi::Cblacs_pcoord(context, pnum, &mut row, &mut col) };
        Ok(GridCoord::new(row, col))
    }

    unsafe fn broadcast_send(
        &self,
        context: i32,
        tag: DatatypeTag,
        scope: Scope,
        top: Topology,
        region: Region,
        shape: Shape,
        buf: *const c_void,
    ) -> Result<()> {
        let scope = scope.as_cstr().as_ptr();
        let top = top.as_cstr().as_ptr();
        let (m, n, lda) = (shape.rows(), shape.cols(), shape.lda());
        match region {
            Region::General => dispatch!(
                tag,
                [Cigebs2d, Csgebs2d, Cdgebs2d, Ccgebs2d, Czgebs2d],
                (context, scope, top, m, n, buf, lda)
            ),
            Region::Trapezoid { triangle, diagonal } => {
                let uplo = triangle.as_cstr().as_ptr();
                let diag = diagonal.as_cstr().as_ptr();
                dispatch!(
                    tag,
                    [Citrbs2d, Cstrbs2d, Cdtrbs2d, Cctrbs2d, Cztrbs2d],
                    (context, scope, top, uplo, diag, m, n, buf, lda)
                )
            }
        }
        Ok(())
    }

    unsafe fn broadcast_recv(
        &self,
        context: i32,
        tag: DatatypeTag,
        scope: Scope,
        top: Topology,
        region: Region,
        shape: Shape,
        buf: *mut c_void,
        src: GridCoord,
    ) -> Result<()> {
        let scope = scope.as_cstr().as_ptr();
        let top = top.as_cstr().as_ptr();
        let (m, n, lda) = (shape.rows(), shape.cols(), shape.lda());
        match region {
            Region::General => dispatch!(
                tag,
                [Cigebr2d, Csgebr2d, Cdgebr2d, Ccgebr2d, Czgebr2d],
                (context, scope, top, m, n, buf, lda, src.row, src.col)
            ),
            Region::Trapezoid { triangle, diagonal } => {
                let uplo = triangle.as_cstr().as_ptr();
                let diag = diagonal.as_cstr().as_ptr();
                dispatch!(
                    tag,
                    [Citrbr2d, Cstrbr2d, Cdtrbr2d, Cctrbr2d, Cztrbr2d],
                    (context, scope, top, uplo, diag, m, n, buf, lda, src.row, src.col)
                )
            }
        }
        Ok(())
    }

    unsafe fn send(
        &self,
        context: i32,
        tag: DatatypeTag,
        region: Region,
        shape: Shape,
        buf: *const c_void,
        dest: GridCoord,
    ) -> Result<()> {
        let (m, n, lda) = (shape.rows(), shape.cols(), shape.lda());
        match region {
            Region::General => dispatch!(
                tag,
                [Cigesd2d, Csgesd2d, Cdgesd2d, Ccgesd2d, Czgesd2d],
                (context, m, n, buf, lda, dest.row, dest.col)
            ),
            Region::Trapezoid { triangle, diagonal } => {
                let uplo = triangle.as_cstr().as_ptr();
                let diag = diagonal.as_cstr().as_ptr();
                dispatch!(
                    tag,
                    [Citrsd2d, Cstrsd2d, Cdtrsd2d, Cctrsd2d, Cztrsd2d],
                    (context, uplo, diag, m, n, buf, lda, dest.row, dest.col)
                )
            }
        }
        Ok(())
    }

    unsafe fn recv(
        &self,
        context: i32,
        tag: DatatypeTag,
        region: Region,
        shape: Shape,
        buf: *mut c_void,
        src: GridCoord,
    ) -> Result<()> {
        let (m, n, lda) = (shape.rows(), shape.cols(), shape.lda());
        match region {
            Region::General => dispatch!(
                tag,
                [Cigerv2d, Csgerv2d, Cdgerv2d, Ccgerv2d, Czgerv2d],
                (context, m, n, buf, lda, src.row, src.col)
            ),
            Region::Trapezoid { triangle, diagonal } => {
                let uplo = triangle.as_cstr().as_ptr();
                let diag = diagonal.as_cstr().as_ptr();
                dispatch!(
                    tag,
                    [Citrrv2d, Cstrrv2d, Cdtrrv2d, Cctrrv2d, Cztrrv2d],
                    (context, uplo, diag, m, n, buf, lda, src.row, src.col)
                )
            }
        }
        Ok(())
    }
}

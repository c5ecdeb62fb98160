//! BLACS process grids.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::params::{GridCoord, GridOrder, Scope};
use log::debug;
use std::marker::PhantomData;

/// A 2D process grid and the BLACS context that scopes its communication.
///
/// The grid is created once, is read-only afterwards, and releases its
/// context when dropped. Every transfer method is local: it describes this
/// process's side only, and the caller is responsible for issuing the
/// matching call on the peers.
///
/// # Example
///
/// ```
/// use ferroblacs::{Grid, GridOrder, LocalHub, Scope};
///
/// let coords = LocalHub::run(6, |backend| {
///     let grid = Grid::new(backend, 2, 3, GridOrder::RowMajor).unwrap();
///     grid.barrier(Scope::All).unwrap();
///     (grid.myrow(), grid.mycol())
/// });
/// assert_eq!(coords[4], (1, 1));
/// ```
pub struct Grid<B: Backend> {
    backend: B,
    context: i32,
    nprow: i32,
    npcol: i32,
    myrow: i32,
    mycol: i32,
    order: GridOrder,
    /// Marker to prevent Send/Sync (a BLACS context is not thread-safe)
    _marker: PhantomData<*mut ()>,
}

impl<B: Backend> Grid<B> {
    /// Create an `nprow x npcol` grid over the system context.
    ///
    /// Every process must call this, including processes that will not be
    /// part of the grid; those receive [`Error::NotInGrid`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGridShape`] if either extent is not positive or
    /// the grid needs more processes than exist.
    pub fn new(backend: B, nprow: i32, npcol: i32, order: GridOrder) -> Result<Self> {
        let (rank, nprocs) = backend.process_info()?;
        let fits = nprow
            .checked_mul(npcol)
            .is_some_and(|size| size <= nprocs);
        if nprow <= 0 || npcol <= 0 || !fits {
            return Err(Error::InvalidGridShape {
                nprow,
                npcol,
                nprocs,
            });
        }

        let system = backend.system_context()?;
        let context = backend.grid_init(system, order, nprow, npcol)?;
        let info = backend.grid_info(context)?;
        if context < 0 || !info.is_member() {
            debug!("process {rank} left out of {nprow}x{npcol} grid");
            return Err(Error::NotInGrid(rank));
        }

        debug!(
            "process {rank} joined {nprow}x{npcol} grid (context {context}) at ({}, {})",
            info.myrow, info.mycol
        );

        Ok(Grid {
            backend,
            context,
            nprow: info.nprow,
            npcol: info.npcol,
            myrow: info.myrow,
            mycol: info.mycol,
            order,
            _marker: PhantomData,
        })
    }

    /// Create the most nearly square grid that uses every process.
    ///
    /// The shape is `nprow x npcol` with `nprow <= npcol` and
    /// `nprow * npcol` equal to the process count.
    pub fn square(backend: B, order: GridOrder) -> Result<Self> {
        let (_, nprocs) = backend.process_info()?;
        let (nprow, npcol) = square_shape(nprocs);
        Self::new(backend, nprow, npcol, order)
    }

    /// Raw BLACS context handle (for advanced use).
    pub fn context(&self) -> i32 {
        self.context
    }

    /// The backend this grid dispatches to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of process rows.
    pub fn nprow(&self) -> i32 {
        self.nprow
    }

    /// Number of process columns.
    pub fn npcol(&self) -> i32 {
        self.npcol
    }

    /// This process's row.
    pub fn myrow(&self) -> i32 {
        self.myrow
    }

    /// This process's column.
    pub fn mycol(&self) -> i32 {
        self.mycol
    }

    /// This process's coordinate.
    pub fn coord(&self) -> GridCoord {
        GridCoord::new(self.myrow, self.mycol)
    }

    /// Process ordering the grid was created with.
    pub fn order(&self) -> GridOrder {
        self.order
    }

    /// Whether this process sits at `(0, 0)`.
    pub fn is_root(&self) -> bool {
        self.myrow == 0 && self.mycol == 0
    }

    /// Whether `coord` lies inside the grid.
    pub fn contains(&self, coord: GridCoord) -> bool {
        (0..self.nprow).contains(&coord.row) && (0..self.npcol).contains(&coord.col)
    }

    /// Process number of the process at `coord`.
    pub fn pnum(&self, coord: GridCoord) -> Result<i32> {
        self.check_coord(coord)?;
        self.backend.pnum(self.context, coord)
    }

    /// Grid coordinate of process number `pnum`.
    pub fn pcoord(&self, pnum: i32) -> Result<GridCoord> {
        if pnum < 0 || pnum >= self.nprow * self.npcol {
            return Err(Error::InvalidRank(pnum));
        }
        self.backend.pcoord(self.context, pnum)
    }

    /// Barrier across the processes in `scope`.
    pub fn barrier(&self, scope: Scope) -> Result<()> {
        self.backend.barrier(self.context, scope)
    }

    pub(crate) fn check_coord(&self, coord: GridCoord) -> Result<()> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(Error::coord(coord.row, coord.col))
        }
    }
}

impl<B: Backend> Drop for Grid<B> {
    fn drop(&mut self) {
        debug!("releasing grid context {}", self.context);
        // Nothing useful to do with a failure during drop
        let _ = self.backend.grid_exit(self.context);
    }
}

/// Rank and process count of the calling process (`blacs_pinfo`).
pub fn process_info<B: Backend>(backend: &B) -> Result<(i32, i32)> {
    backend.process_info()
}

/// Most nearly square factorization `nprow x npcol` of `nprocs`.
fn square_shape(nprocs: i32) -> (i32, i32) {
    let mut nprow = (f64::from(nprocs.max(1))).sqrt() as i32;
    while nprow > 1 && nprocs % nprow != 0 {
        nprow -= 1;
    }
    let nprow = nprow.max(1);
    (nprow, nprocs / nprow)
}

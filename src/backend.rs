//! The seam between the typed dispatch layer and a BLACS implementation.
//!
//! [`Grid`](crate::Grid) validates and types every call, then forwards it to a
//! [`Backend`] with the element type erased to a [`DatatypeTag`] and the
//! buffer reduced to a raw pointer. The native backend hands those straight to
//! the C BLACS routines; the loopback backend moves the bytes between threads.

use crate::datatype::DatatypeTag;
use crate::error::Result;
use crate::params::{GridCoord, GridOrder, Scope, Topology};
use crate::region::{Region, Shape};
use std::ffi::c_void;

/// Grid shape and the caller's position, as reported by `blacs_gridinfo`.
///
/// Processes outside the grid see `-1` for every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridInfo {
    /// Process rows in the grid
    pub nprow: i32,
    /// Process columns in the grid
    pub npcol: i32,
    /// Caller's process row
    pub myrow: i32,
    /// Caller's process column
    pub mycol: i32,
}

impl GridInfo {
    /// Whether the caller is a member of the grid.
    pub fn is_member(&self) -> bool {
        self.myrow >= 0 && self.mycol >= 0 && self.myrow < self.nprow && self.mycol < self.npcol
    }
}

/// Raw BLACS entry points.
///
/// Implementations perform no validation: [`Grid`](crate::Grid) checks shapes,
/// coordinates and buffer lengths before calling in.
pub trait Backend {
    /// This process's number and the total process count (`blacs_pinfo`).
    fn process_info(&self) -> Result<(i32, i32)>;

    /// Default system context (`blacs_get(-1, 0)`).
    fn system_context(&self) -> Result<i32>;

    /// Create a grid context over the system context (`blacs_gridinit`).
    ///
    /// Processes left out of the grid receive a negative context.
    fn grid_init(&self, system_context: i32, order: GridOrder, nprow: i32, npcol: i32)
        -> Result<i32>;

    /// Shape of a grid and the caller's coordinate (`blacs_gridinfo`).
    fn grid_info(&self, context: i32) -> Result<GridInfo>;

    /// Release a grid context (`blacs_gridexit`).
    fn grid_exit(&self, context: i32) -> Result<()>;

    /// Block until every process in `scope` reaches the barrier.
    fn barrier(&self, context: i32, scope: Scope) -> Result<()>;

    /// Process number at a grid coordinate (`blacs_pnum`).
    fn pnum(&self, context: i32, coord: GridCoord) -> Result<i32>;

    /// Grid coordinate of a process number (`blacs_pcoord`).
    fn pcoord(&self, context: i32, pnum: i32) -> Result<GridCoord>;

    /// Broadcast send (`?gebs2d` / `?trbs2d`).
    ///
    /// # Safety
    ///
    /// `buf` must point to `shape.required_len()` readable elements of the
    /// type named by `tag`.
    #[allow(clippy::too_many_arguments)]
    unsafe fn broadcast_send(
        &self,
        context: i32,
        tag: DatatypeTag,
        scope: Scope,
        top: Topology,
        region: Region,
        shape: Shape,
        buf: *const c_void,
    ) -> Result<()>;

    /// Broadcast receive from `src` (`?gebr2d` / `?trbr2d`).
    ///
    /// # Safety
    ///
    /// `buf` must point to `shape.required_len()` writable elements of the
    /// type named by `tag`.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<()>;

    /// Point-to-point send to `dest` (`?gesd2d` / `?trsd2d`).
    ///
    /// # Safety
    ///
    /// Same requirements as [`Backend::broadcast_send`].
    unsafe fn send(
        &self,
        context: i32,
        tag: DatatypeTag,
        region: Region,
        shape: Shape,
        buf: *const c_void,
        dest: GridCoord,
    ) -> Result<()>;

    /// Point-to-point receive from `src` (`?gerv2d` / `?trrv2d`).
    ///
    /// # Safety
    ///
    /// Same requirements as [`Backend::broadcast_recv`].
    unsafe fn recv(
        &self,
        context: i32,
        tag: DatatypeTag,
        region: Region,
        shape: Shape,
        buf: *mut c_void,
        src: GridCoord,
    ) -> Result<()>;
}

impl<T: Backend + ?Sized> Backend for &T {
    fn process_info(&self) -> Result<(i32, i32)> {
        (**self).process_info()
    }

    fn system_context(&self) -> Result<i32> {
        (**self).system_context()
    }

    fn grid_init(
        &self,
        system_context: i32,
        order: GridOrder,
        nprow: i32,
        npcol: i32,
    ) -> Result<i32> {
        (**self).grid_init(system_context, order, nprow, npcol)
    }

    fn grid_info(&self, context: i32) -> Result<GridInfo> {
        (**self).grid_info(context)
    }

    fn grid_exit(&self, context: i32) -> Result<()> {
        (**self).grid_exit(context)
    }

    fn barrier(&self, context: i32, scope: Scope) -> Result<()> {
        (**self).barrier(context, scope)
    }

    fn pnum(&self, context: i32, coord: GridCoord) -> Result<i32> {
        (**self).pnum(context, coord)
    }

    fn pcoord(&self, context: i32, pnum: i32) -> Result<GridCoord> {
        (**self).pcoord(context, pnum)
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
        (**self).broadcast_send(context, tag, scope, top, region, shape, buf)
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
        (**self).broadcast_recv(context, tag, scope, top, region, shape, buf, src)
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
        (**self).send(context, tag, region, shape, buf, dest)
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
        (**self).recv(context, tag, region, shape, buf, src)
    }
}

//! In-process loopback backend.
//!
//! A [`LocalHub`] stands in for the network: each simulated process is a
//! thread holding a [`LocalBackend`] for its rank, and every transfer is copied
//! through per-rank mailboxes guarded by one mutex. Grid numbering, scope
//! membership and trapezoid packing follow BLACS, so code written against
//! [`Grid`](crate::Grid) behaves the same on either backend.
//!
//! # Example
//!
//! ```
//! use ferroblacs::{Grid, GridCoord, GridOrder, LocalHub, Scope, Topology};
//!
//! let sums = LocalHub::run(4, |backend| {
//!     let grid = Grid::new(backend, 2, 2, GridOrder::RowMajor).unwrap();
//!     let mut data = vec![0.0f64; 3];
//!     if grid.is_root() {
//!         data = vec![1.0, 2.0, 3.0];
//!         grid.broadcast_send_sized(Scope::All, Topology::Default, &data).unwrap();
//!     } else {
//!         let root = GridCoord::new(0, 0);
//!         grid.broadcast_recv_sized(Scope::All, Topology::Default, &mut data, root).unwrap();
//!     }
//!     data.iter().sum::<f64>()
//! });
//! assert_eq!(sums, vec![6.0; 4]);
//! ```

use crate::backend::{Backend, GridInfo};
use crate::datatype::DatatypeTag;
use crate::error::{Error, Result};
use crate::params::{GridCoord, GridOrder, Scope, Topology};
use crate::region::{Region, Shape};
use log::trace;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::ffi::c_void;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// How long a blocked receive or barrier waits before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_CONTEXT: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    PointToPoint,
    Broadcast(Scope),
}

#[derive(Debug, Clone)]
struct Envelope {
    context: i32,
    channel: Channel,
    from: GridCoord,
    tag: DatatypeTag,
    count: usize,
    payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
}

#[derive(Debug, Default)]
struct HubState {
    mailboxes: Vec<VecDeque<Envelope>>,
    barriers: HashMap<(i32, Scope, i32), BarrierState>,
}

/// Shared message switch for a set of in-process ranks.
#[derive(Debug)]
pub struct LocalHub {
    nprocs: usize,
    timeout: Duration,
    state: Mutex<HubState>,
    arrivals: Condvar,
}

impl LocalHub {
    /// Create a hub for `nprocs` ranks with the default timeout.
    pub fn new(nprocs: usize) -> Arc<Self> {
        Self::with_timeout(nprocs, DEFAULT_TIMEOUT)
    }

    /// Create a hub whose blocking calls fail after `timeout`.
    pub fn with_timeout(nprocs: usize, timeout: Duration) -> Arc<Self> {
        let state = HubState {
            mailboxes: vec![VecDeque::new(); nprocs],
            barriers: HashMap::new(),
        };
        Arc::new(LocalHub {
            nprocs,
            timeout,
            state: Mutex::new(state),
            arrivals: Condvar::new(),
        })
    }

    /// Number of ranks attached to this hub.
    pub fn nprocs(&self) -> usize {
        self.nprocs
    }

    /// Backend handle for `rank`.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not below [`nprocs`](Self::nprocs).
    pub fn backend(self: &Arc<Self>, rank: usize) -> LocalBackend {
        assert!(
            rank < self.nprocs,
            "rank {rank} out of range for a hub of {} processes",
            self.nprocs
        );
        LocalBackend {
            hub: Arc::clone(self),
            rank,
            grids: RefCell::new(HashMap::new()),
            next_context: Cell::new(SYSTEM_CONTEXT + 1),
        }
    }

    /// Run `f` once per rank, each on its own thread, and collect the results
    /// in rank order.
    ///
    /// A panic on any rank is re-raised on the caller's thread.
    pub fn run<F, R>(nprocs: usize, f: F) -> Vec<R>
    where
        F: Fn(LocalBackend) -> R + Sync,
        R: Send,
    {
        let hub = LocalHub::new(nprocs);
        std::thread::scope(|s| {
            let f = &f;
            let handles: Vec<_> = (0..nprocs)
                .map(|rank| {
                    let backend = hub.backend(rank);
                    s.spawn(move || f(backend))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, HubState>> {
        self.state
            .lock()
            .map_err(|_| Error::Transport("hub state poisoned".into()))
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, HubState>,
        deadline: Instant,
        what: &str,
    ) -> Result<MutexGuard<'a, HubState>> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
            .ok_or_else(|| Error::Transport(format!("timed out waiting for {what}")))?;
        let (guard, _) = self
            .arrivals
            .wait_timeout(guard, remaining)
            .map_err(|_| Error::Transport("hub state poisoned".into()))?;
        Ok(guard)
    }

    fn post(&self, dest: usize, envelope: Envelope) -> Result<()> {
        let mut state = self.lock()?;
        state.mailboxes[dest].push_back(envelope);
        drop(state);
        self.arrivals.notify_all();
        Ok(())
    }

    fn take(&self, rank: usize, context: i32, channel: Channel, from: GridCoord) -> Result<Envelope> {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.lock()?;
        loop {
            let mailbox = &mut state.mailboxes[rank];
            let found = mailbox
                .iter()
                .position(|e| e.context == context && e.channel == channel && e.from == from);
            if let Some(pos) = found {
                if let Some(envelope) = mailbox.remove(pos) {
                    return Ok(envelope);
                }
            }
            state = self.wait(state, deadline, &format!("a message from {from}"))?;
        }
    }

    fn barrier(&self, key: (i32, Scope, i32), members: usize) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut state = self.lock()?;
        let entry = state.barriers.entry(key).or_default();
        let generation = entry.generation;
        entry.arrived += 1;
        if entry.arrived == members {
            entry.arrived = 0;
            entry.generation += 1;
            drop(state);
            self.arrivals.notify_all();
            return Ok(());
        }
        loop {
            state = match self.wait(state, deadline, "barrier") {
                Ok(state) => state,
                Err(err) if self.leave_barrier(key, generation)? => return Err(err),
                Err(_) => return Ok(()),
            };
            if state.barriers.get(&key).map_or(true, |b| b.generation != generation) {
                return Ok(());
            }
        }
    }

    /// Withdraw an arrival that gave up waiting. Returns `false` if the
    /// barrier released in the meantime, in which case nothing is withdrawn.
    fn leave_barrier(&self, key: (i32, Scope, i32), generation: u64) -> Result<bool> {
        let mut state = self.lock()?;
        match state.barriers.get_mut(&key) {
            Some(entry) if entry.generation == generation => {
                entry.arrived = entry.arrived.saturating_sub(1);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LocalGrid {
    nprow: i32,
    npcol: i32,
    order: GridOrder,
}

impl LocalGrid {
    fn size(&self) -> i32 {
        self.nprow * self.npcol
    }

    fn coord(&self, pnum: i32) -> Option<GridCoord> {
        if pnum < 0 || pnum >= self.size() {
            return None;
        }
        Some(match self.order {
            GridOrder::RowMajor => GridCoord::new(pnum / self.npcol, pnum % self.npcol),
            GridOrder::ColumnMajor => GridCoord::new(pnum % self.nprow, pnum / self.nprow),
        })
    }

    fn pnum(&self, coord: GridCoord) -> Option<i32> {
        if coord.row < 0 || coord.row >= self.nprow || coord.col < 0 || coord.col >= self.npcol {
            return None;
        }
        Some(match self.order {
            GridOrder::RowMajor => coord.row * self.npcol + coord.col,
            GridOrder::ColumnMajor => coord.col * self.nprow + coord.row,
        })
    }

    fn in_scope(&self, me: GridCoord, other: GridCoord, scope: Scope) -> bool {
        match scope {
            Scope::Row => other.row == me.row,
            Scope::Column => other.col == me.col,
            Scope::All => true,
        }
    }
}

/// One rank's view of a [`LocalHub`].
#[derive(Debug)]
pub struct LocalBackend {
    hub: Arc<LocalHub>,
    rank: usize,
    grids: RefCell<HashMap<i32, LocalGrid>>,
    next_context: Cell<i32>,
}

impl LocalBackend {
    /// This backend's rank in the hub.
    pub fn rank(&self) -> usize {
        self.rank
    }

    fn grid(&self, context: i32) -> Result<LocalGrid> {
        self.grids
            .borrow()
            .get(&context)
            .copied()
            .ok_or_else(|| Error::Transport(format!("unknown context {context}")))
    }

    fn my_coord(&self, grid: &LocalGrid) -> Result<GridCoord> {
        grid.coord(self.rank as i32)
            .ok_or(Error::NotInGrid(self.rank as i32))
    }

    fn pnum_in(&self, grid: &LocalGrid, coord: GridCoord) -> Result<usize> {
        grid.pnum(coord)
            .map(|p| p as usize)
            .ok_or_else(|| Error::coord(coord.row, coord.col))
    }

    unsafe fn envelope(
        &self,
        context: i32,
        channel: Channel,
        from: GridCoord,
        tag: DatatypeTag,
        region: Region,
        shape: Shape,
        buf: *const c_void,
    ) -> Envelope {
        let elem = tag.size();
        let base = buf.cast::<u8>();
        let mut payload = Vec::new();
        let mut count = 0;
        for (i, j) in region.positions(shape) {
            let src = std::slice::from_raw_parts(base.add(shape.offset(i, j) * elem), elem);
            payload.extend_from_slice(src);
            count += 1;
        }
        Envelope {
            context,
            channel,
            from,
            tag,
            count,
            payload,
        }
    }

    unsafe fn deliver(
        &self,
        envelope: Envelope,
        tag: DatatypeTag,
        region: Region,
        shape: Shape,
        buf: *mut c_void,
    ) -> Result<()> {
        if envelope.tag != tag {
            return Err(Error::Transport(format!(
                "message from {} carries {:?} elements, receive expects {:?}",
                envelope.from, envelope.tag, tag
            )));
        }
        let expected = region.positions(shape).count();
        if envelope.count != expected {
            return Err(Error::Transport(format!(
                "message from {} has {} elements, receive shape selects {}",
                envelope.from, envelope.count, expected
            )));
        }
        let elem = tag.size();
        let base = buf.cast::<u8>();
        for ((i, j), chunk) in region.positions(shape).zip(envelope.payload.chunks_exact(elem)) {
            let dst = base.add(shape.offset(i, j) * elem);
            std::ptr::copy_nonoverlapping(chunk.as_ptr(), dst, elem);
        }
        Ok(())
    }
}

impl Backend for LocalBackend {
    fn process_info(&self) -> Result<(i32, i32)> {
        Ok((self.rank as i32, self.hub.nprocs as i32))
    }

    fn system_context(&self) -> Result<i32> {
        Ok(SYSTEM_CONTEXT)
    }

    fn grid_init(
        &self,
        system_context: i32,
        order: GridOrder,
        nprow: i32,
        npcol: i32,
    ) -> Result<i32> {
        if system_context != SYSTEM_CONTEXT {
            return Err(Error::Transport(format!(
                "unknown system context {system_context}"
            )));
        }
        // Every rank advances the counter so contexts agree across ranks
        let context = self.next_context.get();
        self.next_context.set(context + 1);

        let grid = LocalGrid {
            nprow,
            npcol,
            order,
        };
        if grid.coord(self.rank as i32).is_none() {
            return Ok(-1);
        }
        self.grids.borrow_mut().insert(context, grid);
        Ok(context)
    }

    fn grid_info(&self, context: i32) -> Result<GridInfo> {
        if context < 0 {
            return Ok(GridInfo {
                nprow: -1,
                npcol: -1,
                myrow: -1,
                mycol: -1,
            });
        }
        let grid = self.grid(context)?;
        let me = self.my_coord(&grid)?;
        Ok(GridInfo {
            nprow: grid.nprow,
            npcol: grid.npcol,
            myrow: me.row,
            mycol: me.col,
        })
    }

    fn grid_exit(&self, context: i32) -> Result<()> {
        self.grids.borrow_mut().remove(&context);
        Ok(())
    }

    fn barrier(&self, context: i32, scope: Scope) -> Result<()> {
        let grid = self.grid(context)?;
        let me = self.my_coord(&grid)?;
        let (key, members) = match scope {
            Scope::Row => ((context, scope, me.row), grid.npcol),
            Scope::Column => ((context, scope, me.col), grid.nprow),
            Scope::All => ((context, scope, 0), grid.size()),
        };
        self.hub.barrier(key, members as usize)
    }

    fn pnum(&self, context: i32, coord: GridCoord) -> Result<i32> {
        let grid = self.grid(context)?;
        Ok(grid.pnum(coord).unwrap_or(-1))
    }

    fn pcoord(&self, context: i32, pnum: i32) -> Result<GridCoord> {
        let grid = self.grid(context)?;
        Ok(grid.coord(pnum).unwrap_or(GridCoord::new(-1, -1)))
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
        let grid = self.grid(context)?;
        let me = self.my_coord(&grid)?;
        let envelope =
            self.envelope(context, Channel::Broadcast(scope), me, tag, region, shape, buf);
        trace!(
            "local: rank {} broadcasts {} elements over {:?} (top {:?})",
            self.rank,
            envelope.count,
            scope,
            top
        );
        for pnum in 0..grid.size() {
            if pnum as usize == self.rank {
                continue;
            }
            let Some(peer) = grid.coord(pnum) else {
                continue;
            };
            if grid.in_scope(me, peer, scope) {
                self.hub.post(pnum as usize, envelope.clone())?;
            }
        }
        Ok(())
    }

    unsafe fn broadcast_recv(
        &self,
        context: i32,
        tag: DatatypeTag,
        scope: Scope,
        _top: Topology,
        region: Region,
        shape: Shape,
        buf: *mut c_void,
        src: GridCoord,
    ) -> Result<()> {
        let grid = self.grid(context)?;
        let me = self.my_coord(&grid)?;
        self.pnum_in(&grid, src)?;
        if !grid.in_scope(me, src, scope) {
            return Err(Error::Transport(format!(
                "{src} is outside the {scope:?} scope of {me}"
            )));
        }
        let envelope = self
            .hub
            .take(self.rank, context, Channel::Broadcast(scope), src)?;
        self.deliver(envelope, tag, region, shape, buf)
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
        let grid = self.grid(context)?;
        let me = self.my_coord(&grid)?;
        let dest_pnum = self.pnum_in(&grid, dest)?;
        let envelope = self.envelope(context, Channel::PointToPoint, me, tag, region, shape, buf);
        trace!(
            "local: rank {} sends {} elements to {}",
            self.rank,
            envelope.count,
            dest
        );
        self.hub.post(dest_pnum, envelope)
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
        let grid = self.grid(context)?;
        self.pnum_in(&grid, src)?;
        let envelope = self.hub.take(self.rank, context, Channel::PointToPoint, src)?;
        self.deliver(envelope, tag, region, shape, buf)
    }
}

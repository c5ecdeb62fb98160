//! Panel broadcast example - the communication step of a blocked factorization.
//!
//! The first process column owns a lower-triangular panel and broadcasts it
//! along each process row; the first process row then broadcasts an upper
//! trapezoid with unit diagonal down each process column.
//!
//! Run with: mpiexec -n 4 cargo run --features native --example panel_broadcast

use ferroblacs::{Diagonal, Grid, GridCoord, GridOrder, NativeBackend, Result, Scope, Topology, Triangle};

const NB: i32 = 4;

fn main() -> Result<()> {
    env_logger::init();

    let blacs = NativeBackend::init()?;
    let grid = Grid::square(&blacs, GridOrder::RowMajor)?;
    let len = (NB * NB) as usize;

    // Step 1: row broadcast of a lower triangle from column 0
    let mut panel = vec![0.0f64; len];
    let row_root = GridCoord::new(grid.myrow(), 0);
    if grid.coord() == row_root {
        for (k, v) in panel.iter_mut().enumerate() {
            *v = (grid.myrow() * 1000) as f64 + k as f64;
        }
        grid.broadcast_send_triangular(
            Scope::Row,
            Topology::IncreasingRing,
            Triangle::Lower,
            Diagonal::NonUnit,
            NB,
            NB,
            &panel,
            NB,
        )?;
    } else {
        grid.broadcast_recv_triangular(
            Scope::Row,
            Topology::IncreasingRing,
            Triangle::Lower,
            Diagonal::NonUnit,
            NB,
            NB,
            &mut panel,
            NB,
            row_root,
        )?;
    }

    // Step 2: column broadcast of an upper trapezoid (unit diagonal) from row 0
    let mut block = vec![f64::NAN; len];
    let col_root = GridCoord::new(0, grid.mycol());
    if grid.coord() == col_root {
        block.fill(grid.mycol() as f64);
        grid.broadcast_send_triangular(
            Scope::Column,
            Topology::Default,
            Triangle::Upper,
            Diagonal::Unit,
            NB,
            NB,
            &block,
            NB,
        )?;
    } else {
        grid.broadcast_recv_triangular(
            Scope::Column,
            Topology::Default,
            Triangle::Upper,
            Diagonal::Unit,
            NB,
            NB,
            &mut block,
            NB,
            col_root,
        )?;
    }

    // Strictly lower part and diagonal of `block` were never written off-root
    let untouched = (0..NB as usize)
        .flat_map(|j| (j..NB as usize).map(move |i| j * NB as usize + i))
        .all(|k| block[k].is_nan());
    if grid.coord() != col_root {
        assert!(untouched, "lower half of the block was overwritten");
    }

    grid.barrier(Scope::All)?;
    if grid.is_root() {
        println!("Panel broadcast test passed on a {}x{} grid", grid.nprow(), grid.npcol());
    }

    Ok(())
}

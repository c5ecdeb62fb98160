//! Ring communication example - point-to-point communication.
//!
//! Each process sends a small column-major block to the next process in a
//! 1 x P grid.
//!
//! Run with: mpiexec -n 4 cargo run --features native --example ring

use ferroblacs::{Grid, GridCoord, GridOrder, NativeBackend, Result, Scope};

fn main() -> Result<()> {
    env_logger::init();

    let blacs = NativeBackend::init()?;
    let (_, nprocs) = ferroblacs::process_info(&blacs)?;
    let grid = Grid::new(&blacs, 1, nprocs, GridOrder::RowMajor)?;

    let me = grid.mycol();
    let size = grid.npcol();

    if size < 2 {
        eprintln!("This example requires at least 2 processes");
        return Ok(());
    }

    // Neighbors in the ring
    let next = GridCoord::new(0, (me + 1) % size);
    let prev = GridCoord::new(0, (me + size - 1) % size);

    // 2x2 block, leading dimension 2
    let base = f64::from(me) * 100.0;
    let send_data = vec![base + 1.0, base + 2.0, base + 3.0, base + 4.0];
    let mut recv_data = vec![0.0; 4];

    println!("Process {me}: sending {send_data:?} to {next}");

    // Even processes send first, then receive; odd processes do the reverse
    if me % 2 == 0 {
        grid.send(2, 2, &send_data, 2, next)?;
        grid.recv(2, 2, &mut recv_data, 2, prev)?;
    } else {
        grid.recv(2, 2, &mut recv_data, 2, prev)?;
        grid.send(2, 2, &send_data, 2, next)?;
    }
    println!("Process {me}: received {recv_data:?} from {prev}");

    // Verify we got the right data
    let prev_base = f64::from(prev.col) * 100.0;
    let expected = vec![prev_base + 1.0, prev_base + 2.0, prev_base + 3.0, prev_base + 4.0];
    assert_eq!(recv_data, expected, "Data mismatch!");

    grid.barrier(Scope::All)?;

    if grid.is_root() {
        println!("\nRing communication test passed!");
    }

    Ok(())
}

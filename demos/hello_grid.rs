//! Hello Grid example - BLACS initialization and grid layout.
//!
//! Run with: mpiexec -n 4 cargo run --features native --example hello_grid

use ferroblacs::{process_info, Grid, GridOrder, NativeBackend, Result, Scope};

fn main() -> Result<()> {
    env_logger::init();

    // Initialize BLACS (brings up MPI underneath)
    let blacs = NativeBackend::init()?;
    let (rank, nprocs) = process_info(&blacs)?;

    // Arrange every process in the most nearly square grid
    let grid = Grid::square(&blacs, GridOrder::RowMajor)?;

    println!(
        "Hello from process {} of {} at {} in a {}x{} grid (context {})",
        rank,
        nprocs,
        grid.coord(),
        grid.nprow(),
        grid.npcol(),
        grid.context()
    );

    // Synchronize before exiting
    grid.barrier(Scope::All)?;

    if grid.is_root() {
        if let Some(version) = NativeBackend::version() {
            println!("\nLinked against BLACS {version}");
        }
        println!("\nAll processes reported in. Test passed!");
    }

    // The grid is released first, then BLACS exits when `blacs` is dropped
    Ok(())
}

//! End-to-end transfers through the loopback backend, one thread per process.

use ferroblacs::{
    BlacsDatatype, Complex32, Complex64, Diagonal, Grid, GridCoord, GridOrder, LocalHub, Scope,
    Topology, TreeWidth, Triangle,
};

const ROOT: GridCoord = GridCoord::new(0, 0);

fn bytes_of<T: BlacsDatatype>(data: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(data.as_ptr().cast::<u8>(), std::mem::size_of_val(data)) }
}

/// Broadcast `data` as a `rows x cols` block from rank 0 to rank 1 and return
/// what rank 1 received.
fn broadcast_pair<T: BlacsDatatype + Default + Sync>(data: &[T], rows: i32, cols: i32, lda: i32) -> Vec<T> {
    let results = LocalHub::run(2, |backend| {
        let grid = Grid::new(backend, 1, 2, GridOrder::RowMajor).unwrap();
        if grid.is_root() {
            grid.broadcast_send(Scope::All, Topology::Default, rows, cols, data, lda)
                .unwrap();
            None
        } else {
            let mut recv = vec![T::default(); data.len()];
            grid.broadcast_recv(Scope::All, Topology::Default, rows, cols, &mut recv, lda, ROOT)
                .unwrap();
            Some(recv)
        }
    });
    results.into_iter().flatten().next().unwrap()
}

fn assert_round_trip<T: BlacsDatatype + Default + Sync>(data: Vec<T>) {
    let received = broadcast_pair(&data, 3, 2, 3);
    assert_eq!(bytes_of(&received), bytes_of(&data));
}

#[test]
fn general_broadcast_round_trip_for_every_type() {
    assert_round_trip(vec![1i32, -2, 3, i32::MAX, i32::MIN, 0]);
    assert_round_trip(vec![0.5f32, -1.25, 3.0, f32::MAX, f32::MIN_POSITIVE, -0.0]);
    assert_round_trip(vec![1.0e300f64, -2.5, 3.75, f64::EPSILON, 0.0, -7.0]);
    assert_round_trip((0..6).map(|k| Complex32::new(k as f32, -(k as f32))).collect());
    assert_round_trip((0..6).map(|k| Complex64::new(k as f64 * 0.5, 1.0 / (k as f64 + 1.0))).collect());
}

#[test]
fn padding_rows_are_not_transferred() {
    // 2x3 block stored with lda = 4: rows 2 and 3 of each column are padding
    let data: Vec<f64> = (0..12).map(f64::from).collect();
    let received = broadcast_pair(&data, 2, 3, 4);
    let expected = vec![0.0, 1.0, 0.0, 0.0, 4.0, 5.0, 0.0, 0.0, 8.0, 9.0, 0.0, 0.0];
    assert_eq!(received, expected);
}

/// Which elements of an `m x n` block each trapezoid selects, one string per
/// row, `x` for transferred.
fn trapezoid_mask(rows: i32, cols: i32, triangle: Triangle, diagonal: Diagonal) -> &'static [&'static str] {
    use Diagonal::{NonUnit, Unit};
    use Triangle::{Lower, Upper};
    match (rows, cols, triangle, diagonal) {
        (4, 4, Upper, NonUnit) => &["xxxx", ".xxx", "..xx", "...x"],
        (4, 4, Upper, Unit) => &[".xxx", "..xx", "...x", "...."],
        (4, 4, Lower, NonUnit) => &["x...", "xx..", "xxx.", "xxxx"],
        (4, 4, Lower, Unit) => &["....", "x...", "xx..", "xxx."],
        // Tall: the upper trapezoid keeps its top two rows full
        (5, 3, Upper, NonUnit) => &["xxx", "xxx", "xxx", ".xx", "..x"],
        (5, 3, Upper, Unit) => &["xxx", "xxx", ".xx", "..x", "..."],
        (5, 3, Lower, NonUnit) => &["x..", "xx.", "xxx", "xxx", "xxx"],
        (5, 3, Lower, Unit) => &["...", "x..", "xx.", "xxx", "xxx"],
        // Wide: the lower trapezoid keeps its left two columns full
        (3, 5, Upper, NonUnit) => &["xxxxx", ".xxxx", "..xxx"],
        (3, 5, Upper, Unit) => &[".xxxx", "..xxx", "...xx"],
        (3, 5, Lower, NonUnit) => &["xxx..", "xxxx.", "xxxxx"],
        (3, 5, Lower, Unit) => &["xx...", "xxx..", "xxxx."],
        _ => unreachable!("no mask for {rows}x{cols}"),
    }
}

#[test]
fn trapezoid_receive_leaves_other_half_untouched() {
    const SENTINEL: f64 = -1.0;

    for (rows, cols) in [(4, 4), (5, 3), (3, 5)] {
        for triangle in [Triangle::Upper, Triangle::Lower] {
            for diagonal in [Diagonal::Unit, Diagonal::NonUnit] {
                let lda = rows + 1;
                let len = (lda * cols) as usize;
                let data: Vec<f64> = (0..len).map(|k| k as f64 + 1.0).collect();

                let results = LocalHub::run(2, |backend| {
                    let grid = Grid::new(backend, 2, 1, GridOrder::RowMajor).unwrap();
                    let mut buf = vec![SENTINEL; len];
                    if grid.is_root() {
                        grid.broadcast_send_triangular(
                            Scope::Column,
                            Topology::Default,
                            triangle,
                            diagonal,
                            rows,
                            cols,
                            &data,
                            lda,
                        )
                        .unwrap();
                    } else {
                        grid.broadcast_recv_triangular(
                            Scope::Column,
                            Topology::Default,
                            triangle,
                            diagonal,
                            rows,
                            cols,
                            &mut buf,
                            lda,
                            ROOT,
                        )
                        .unwrap();
                    }
                    buf
                });

                let received = &results[1];
                let mask = trapezoid_mask(rows, cols, triangle, diagonal);
                for j in 0..cols as usize {
                    for i in 0..lda as usize {
                        let k = j * lda as usize + i;
                        let selected = i < rows as usize && mask[i].as_bytes()[j] == b'x';
                        let expected = if selected { data[k] } else { SENTINEL };
                        assert_eq!(
                            received[k], expected,
                            "{rows}x{cols} {triangle:?}/{diagonal:?} element ({i}, {j})"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn unit_diagonal_is_never_written() {
    let data = vec![5i32; 9];
    let results = LocalHub::run(2, |backend| {
        let grid = Grid::new(backend, 1, 2, GridOrder::RowMajor).unwrap();
        let me = grid.coord();
        let mut buf = vec![0i32; 9];
        if me == ROOT {
            grid.send_triangular(Triangle::Upper, Diagonal::Unit, 3, 3, &data, 3, GridCoord::new(0, 1))
                .unwrap();
        } else {
            grid.recv_triangular(Triangle::Upper, Diagonal::Unit, 3, 3, &mut buf, 3, ROOT)
                .unwrap();
        }
        buf
    });
    // Column-major 3x3: strictly upper elements are (0,1), (0,2), (1,2)
    assert_eq!(results[1], vec![0, 0, 0, 5, 0, 0, 5, 5, 0]);
}

#[test]
fn sized_calls_match_explicit_shapes() {
    let data: Vec<f32> = (1..=7).map(|k| k as f32 * 1.5).collect();
    let results = LocalHub::run(2, |backend| {
        let grid = Grid::new(backend, 1, 2, GridOrder::RowMajor).unwrap();
        let n = data.len() as i32;
        let mut from_sized = vec![0.0f32; data.len()];
        let mut from_explicit = vec![0.0f32; data.len()];
        if grid.is_root() {
            // Sized send received with an explicit shape, and the reverse
            grid.broadcast_send_sized(Scope::Row, Topology::Default, &data)
                .unwrap();
            grid.broadcast_send(Scope::Row, Topology::Default, n, 1, &data, n)
                .unwrap();
        } else {
            grid.broadcast_recv(Scope::Row, Topology::Default, n, 1, &mut from_sized, n, ROOT)
                .unwrap();
            grid.broadcast_recv_sized(Scope::Row, Topology::Default, &mut from_explicit, ROOT)
                .unwrap();
        }
        (from_sized, from_explicit)
    });
    assert_eq!(results[1].0, data);
    assert_eq!(results[1].1, data);
}

#[test]
fn scoped_broadcast_reaches_only_its_row() {
    // 2x2 grid: the first process of each row broadcasts its row number
    let results = LocalHub::run(4, |backend| {
        let grid = Grid::new(backend, 2, 2, GridOrder::RowMajor).unwrap();
        let row_root = GridCoord::new(grid.myrow(), 0);
        let mut value = [-1i32];
        if grid.coord() == row_root {
            value[0] = grid.myrow() * 10;
            grid.broadcast_send_sized(Scope::Row, Topology::IncreasingRing, &value)
                .unwrap();
        } else {
            grid.broadcast_recv_sized(Scope::Row, Topology::IncreasingRing, &mut value, row_root)
                .unwrap();
        }
        grid.barrier(Scope::All).unwrap();
        value[0]
    });
    assert_eq!(results, vec![0, 0, 10, 10]);
}

#[test]
fn broadcast_to_all_with_tree_topology() {
    let tree = Topology::Tree(TreeWidth::new(2).unwrap());
    let results = LocalHub::run(6, |backend| {
        let grid = Grid::new(backend, 3, 2, GridOrder::ColumnMajor).unwrap();
        let mut data = vec![Complex64::default(); 2];
        if grid.is_root() {
            data = vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)];
            grid.broadcast_send_sized(Scope::All, tree, &data).unwrap();
        } else {
            grid.broadcast_recv_sized(Scope::All, tree, &mut data, ROOT)
                .unwrap();
        }
        data
    });
    for data in results {
        assert_eq!(data, vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)]);
    }
}

#[test]
fn point_to_point_ring() {
    let results = LocalHub::run(4, |backend| {
        let grid = Grid::new(backend, 1, 4, GridOrder::RowMajor).unwrap();
        let me = grid.mycol();
        let next = GridCoord::new(0, (me + 1) % 4);
        let prev = GridCoord::new(0, (me + 3) % 4);

        let send = vec![f64::from(me) * 100.0 + 1.0, f64::from(me) * 100.0 + 2.0];
        let mut recv = vec![0.0; 2];

        // Sends are buffered, so everyone can send first
        grid.send_sized(&send, next).unwrap();
        grid.recv_sized(&mut recv, prev).unwrap();
        recv
    });
    for (rank, recv) in results.iter().enumerate() {
        let prev = ((rank + 3) % 4) as f64;
        assert_eq!(recv, &vec![prev * 100.0 + 1.0, prev * 100.0 + 2.0]);
    }
}

#[test]
fn column_major_grid_coordinates() {
    let results = LocalHub::run(6, |backend| {
        let grid = Grid::new(backend, 2, 3, GridOrder::ColumnMajor).unwrap();
        let pnum = grid.pnum(grid.coord()).unwrap();
        let back = grid.pcoord(pnum).unwrap();
        (grid.coord(), pnum, back)
    });
    for (rank, (coord, pnum, back)) in results.into_iter().enumerate() {
        assert_eq!(pnum as usize, rank);
        assert_eq!(coord, back);
        assert_eq!(coord, GridCoord::new(rank as i32 % 2, rank as i32 / 2));
    }
}

#[test]
fn extra_processes_are_left_out() {
    let results = LocalHub::run(5, |backend| {
        Grid::new(backend, 2, 2, GridOrder::RowMajor)
            .map(|grid| grid.coord())
            .err()
    });
    assert!(results[..4].iter().all(Option::is_none));
    assert_eq!(results[4], Some(ferroblacs::Error::NotInGrid(4)));
}

#[test]
fn square_grid_uses_every_process() {
    let shapes = LocalHub::run(6, |backend| {
        let grid = Grid::square(backend, GridOrder::RowMajor).unwrap();
        (grid.nprow(), grid.npcol())
    });
    assert!(shapes.iter().all(|&s| s == (2, 3)));
}

#[test]
fn row_and_column_barriers_on_a_rectangular_grid() {
    // 2x3 grid: a row barrier has three members, a column barrier two
    let results = LocalHub::run(6, |backend| {
        let grid = Grid::new(backend, 2, 3, GridOrder::RowMajor).unwrap();
        let me = grid.coord();
        let below = GridCoord::new(1, me.col);
        let above = GridCoord::new(0, me.col);

        if me.row == 0 {
            // Row 1 is still blocked on the message below, so this barrier
            // must release with row 0 alone
            grid.barrier(Scope::Row).unwrap();
            grid.send_sized(&[me.col], below).unwrap();
        } else {
            let mut token = [-1i32];
            grid.recv_sized(&mut token, above).unwrap();
            assert_eq!(token[0], me.col);
            grid.barrier(Scope::Row).unwrap();
        }

        grid.barrier(Scope::Column).unwrap();
        grid.barrier(Scope::All).unwrap();
        me
    });
    assert_eq!(results.len(), 6);
    assert_eq!(results[5], GridCoord::new(1, 2));
}

//! # ferroblacs
//!
//! Safe, generic Rust bindings for BLACS (Basic Linear Algebra Communication
//! Subprograms) broadcast and point-to-point communication.
//!
//! This crate wraps the C interface of BLACS, providing:
//! - Type-safe generic API for every BLACS element type
//! - General (rectangular) and trapezoidal broadcast send/receive
//! - General and trapezoidal point-to-point send/receive
//! - Process grid creation, coordinate lookup and barriers
//! - An in-process loopback backend for tests and experiments
//!
//! ## Supported Types
//!
//! All transfers are generic over [`BlacsDatatype`]:
//! `i32`, `f32`, `f64`, [`Complex32`], [`Complex64`]. Any other element type
//! is rejected at compile time.
//!
//! ## Call Shapes
//!
//! Each transfer has up to three entry points:
//!
//! - `*_ptr`: raw pointer plus `rows`, `cols`, `lda`; `unsafe`, no checks
//! - plain: slice plus `rows`, `cols`, `lda`; shape checked against the slice
//! - `*_sized`: slice only, sent as a `len x 1` column
//!
//! ## Quick Start
//!
//! ```
//! use ferroblacs::{Grid, GridCoord, GridOrder, LocalHub, Scope, Topology};
//!
//! // Four threads stand in for four processes; with the `native` feature the
//! // same body runs under mpiexec with `NativeBackend::init()?` instead.
//! let firsts = LocalHub::run(4, |backend| -> ferroblacs::Result<f64> {
//!     let grid = Grid::square(backend, GridOrder::RowMajor)?;
//!
//!     // 4x4 column-major block, broadcast down each process column
//!     let mut panel = vec![0.0f64; 16];
//!     if grid.myrow() == 0 {
//!         panel.fill(grid.mycol() as f64);
//!         grid.broadcast_send(Scope::Column, Topology::Default, 4, 4, &panel, 4)?;
//!     } else {
//!         let src = GridCoord::new(0, grid.mycol());
//!         grid.broadcast_recv(Scope::Column, Topology::Default, 4, 4, &mut panel, 4, src)?;
//!     }
//!     Ok(panel[0])
//! });
//! let firsts: Vec<f64> = firsts.into_iter().collect::<Result<_, _>>().unwrap();
//! assert_eq!(firsts, vec![0.0, 1.0, 0.0, 1.0]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Description                                   |
//! |----------|-----------------------------------------------|
//! | `native` | Link the C BLACS interface ([`NativeBackend`]) |
//!
//! ## Errors
//!
//! Shape, length and coordinate checks happen on the Rust side and come back
//! as [`Error`]. Failures inside BLACS itself are not intercepted: the native
//! library aborts the job as it always does.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod backend;
mod broadcast;
mod datatype;
mod error;
#[cfg(feature = "native")]
mod ffi;
mod grid;
mod local;
#[cfg(feature = "native")]
mod native;
mod params;
mod point_to_point;
mod region;

pub use backend::{Backend, GridInfo};
pub use datatype::{BlacsDatatype, Complex32, Complex64, DatatypeTag};
pub use error::{Error, Result};
pub use grid::{process_info, Grid};
pub use local::{LocalBackend, LocalHub, DEFAULT_TIMEOUT};
#[cfg(feature = "native")]
pub use native::NativeBackend;
pub use params::{Diagonal, GridCoord, GridOrder, Scope, Topology, TreeWidth, Triangle};
pub use region::{Region, Shape};

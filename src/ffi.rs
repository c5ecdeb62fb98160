//! Raw FFI bindings to the C interface of BLACS.
//!
//! These are low-level unsafe functions. Use the safe wrappers in the parent module.
//! Matrix arguments are declared as `c_void` pointers: every routine family takes
//! a plain element pointer, and the typed layer picks the family.

#![allow(dead_code)]
#![allow(non_snake_case)]

use std::os::raw::{c_char, c_int, c_void};

macro_rules! blacs_transfer_decls {
    ($(($gebs:ident, $gebr:ident, $trbs:ident, $trbr:ident, $gesd:ident, $gerv:ident, $trsd:ident, $trrv:ident)),* $(,)?) => {
        extern "C" {
            $(
                pub fn $gebs(
                    context: c_int,
                    scope: *const c_char,
                    top: *const c_char,
                    m: c_int,
                    n: c_int,
                    a: *const c_void,
                    lda: c_int,
                );

                pub fn $gebr(
                    context: c_int,
                    scope: *const c_char,
                    top: *const c_char,
                    m: c_int,
                    n: c_int,
                    a: *mut c_void,
                    lda: c_int,
                    rsrc: c_int,
                    csrc: c_int,
                );

                pub fn $trbs(
                    context: c_int,
                    scope: *const c_char,
                    top: *const c_char,
                    uplo: *const c_char,
                    diag: *const c_char,
                    m: c_int,
                    n: c_int,
                    a: *const c_void,
                    lda: c_int,
                );

                pub fn $trbr(
                    context: c_int,
                    scope: *const c_char,
                    top: *const c_char,
                    uplo: *const c_char,
                    diag: *const c_char,
                    m: c_int,
                    n: c_int,
                    a: *mut c_void,
                    lda: c_int,
                    rsrc: c_int,
                    csrc: c_int,
                );

                pub fn $gesd(
                    context: c_int,
                    m: c_int,
                    n: c_int,
                    a: *const c_void,
                    lda: c_int,
                    rdest: c_int,
                    cdest: c_int,
                );

                pub fn $gerv(
                    context: c_int,
                    m: c_int,
                    n: c_int,
                    a: *mut c_void,
                    lda: c_int,
                    rsrc: c_int,
                    csrc: c_int,
                );

                pub fn $trsd(
                    context: c_int,
                    uplo: *const c_char,
                    diag: *const c_char,
                    m: c_int,
                    n: c_int,
                    a: *const c_void,
                    lda: c_int,
                    rdest: c_int,
                    cdest: c_int,
                );

                pub fn $trrv(
                    context: c_int,
                    uplo: *const c_char,
                    diag: *const c_char,
                    m: c_int,
                    n: c_int,
                    a: *mut c_void,
                    lda: c_int,
                    rsrc: c_int,
                    csrc: c_int,
                );
            )*
        }
    };
}

extern "C" {
    // ============================================================
    // Process and Grid Management
    // ============================================================

    pub fn Cblacs_pinfo(mypnum: *mut c_int, nprocs: *mut c_int);
    pub fn Cblacs_get(context: c_int, what: c_int, val: *mut c_int);
    pub fn Cblacs_gridinit(context: *mut c_int, order: *const c_char, nprow: c_int, npcol: c_int);
    pub fn Cblacs_gridinfo(
        context: c_int,
        nprow: *mut c_int,
        npcol: *mut c_int,
        myrow: *mut c_int,
        mycol: *mut c_int,
    );
    pub fn Cblacs_gridexit(context: c_int);
    pub fn Cblacs_exit(not_done: c_int);
    pub fn Cblacs_pnum(context: c_int, prow: c_int, pcol: c_int) -> c_int;
    pub fn Cblacs_pcoord(context: c_int, pnum: c_int, prow: *mut c_int, pcol: *mut c_int);

    // ============================================================
    // Synchronization
    // ============================================================

    pub fn Cblacs_barrier(context: c_int, scope: *const c_char);
}

// ============================================================
// Broadcast and Point-to-Point Transfers
// ============================================================

blacs_transfer_decls!(
    (Cigebs2d, Cigebr2d, Citrbs2d, Citrbr2d, Cigesd2d, Cigerv2d, Citrsd2d, Citrrv2d),
    (Csgebs2d, Csgebr2d, Cstrbs2d, Cstrbr2d, Csgesd2d, Csgerv2d, Cstrsd2d, Cstrrv2d),
    (Cdgebs2d, Cdgebr2d, Cdtrbs2d, Cdtrbr2d, Cdgesd2d, Cdgerv2d, Cdtrsd2d, Cdtrrv2d),
    (Ccgebs2d, Ccgebr2d, Cctrbs2d, Cctrbr2d, Ccgesd2d, Ccgerv2d, Cctrsd2d, Cctrrv2d),
    (Czgebs2d, Czgebr2d, Cztrbs2d, Cztrbr2d, Czgesd2d, Czgerv2d, Cztrsd2d, Cztrrv2d),
);

//! Enumerated call parameters and their BLACS token encodings.
//!
//! BLACS takes scope, topology, triangle and diagonal selectors as C strings
//! and only inspects the first character. Each enum here maps to exactly one
//! fixed token, available both as `&str` (for logging and the loopback
//! backend) and as a NUL-terminated `&CStr` (for the native call).

use crate::error::{Error, Result};
use std::ffi::CStr;
use std::fmt;

/// Which processes of the grid take part in a broadcast or barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Processes in the caller's grid row
    Row,
    /// Processes in the caller's grid column
    Column,
    /// Every process in the grid
    All,
}

impl Scope {
    /// All scopes, in declaration order.
    pub const ALL: [Scope; 3] = [Scope::Row, Scope::Column, Scope::All];

    /// BLACS token for this scope.
    pub fn token(self) -> &'static str {
        match self {
            Scope::Row => "R",
            Scope::Column => "C",
            Scope::All => "A",
        }
    }

    /// BLACS token as a C string.
    pub fn as_cstr(self) -> &'static CStr {
        match self {
            Scope::Row => c"R",
            Scope::Column => c"C",
            Scope::All => c"A",
        }
    }
}

/// Number of branches for a tree topology, restricted to 1..=9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeWidth(u8);

impl TreeWidth {
    /// Create a tree width, rejecting values outside 1..=9.
    pub fn new(width: u8) -> Result<Self> {
        if (1..=9).contains(&width) {
            Ok(TreeWidth(width))
        } else {
            Err(Error::InvalidTreeWidth(width))
        }
    }

    /// The branch count.
    pub fn get(self) -> u8 {
        self.0
    }
}

const TREE_TOKENS: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
const TREE_CTOKENS: [&CStr; 9] = [c"1", c"2", c"3", c"4", c"5", c"6", c"7", c"8", c"9"];

/// Communication pattern BLACS uses to carry out a broadcast.
///
/// Only the sender's topology matters for the data path, but BLACS expects
/// every participant to pass the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    /// Let BLACS pick (its default is a 1-tree on most builds)
    #[default]
    Default,
    /// Increasing ring
    IncreasingRing,
    /// Decreasing ring
    DecreasingRing,
    /// Split ring
    SplitRing,
    /// Multi-ring
    MultiRing,
    /// Hypercube
    Hypercube,
    /// Fully connected: the root sends to every process directly
    FullyConnected,
    /// General tree with the given number of branches
    Tree(TreeWidth),
}

impl Topology {
    /// BLACS token for this topology.
    pub fn token(self) -> &'static str {
        match self {
            Topology::Default => " ",
            Topology::IncreasingRing => "I",
            Topology::DecreasingRing => "D",
            Topology::SplitRing => "S",
            Topology::MultiRing => "M",
            Topology::Hypercube => "H",
            Topology::FullyConnected => "F",
            Topology::Tree(width) => TREE_TOKENS[usize::from(width.get() - 1)],
        }
    }

    /// BLACS token as a C string.
    pub fn as_cstr(self) -> &'static CStr {
        match self {
            Topology::Default => c" ",
            Topology::IncreasingRing => c"I",
            Topology::DecreasingRing => c"D",
            Topology::SplitRing => c"S",
            Topology::MultiRing => c"M",
            Topology::Hypercube => c"H",
            Topology::FullyConnected => c"F",
            Topology::Tree(width) => TREE_CTOKENS[usize::from(width.get() - 1)],
        }
    }
}

/// Which half of a trapezoidal buffer is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Triangle {
    /// Upper trapezoid
    Upper,
    /// Lower trapezoid
    Lower,
}

impl Triangle {
    /// BLACS token for this triangle.
    pub fn token(self) -> &'static str {
        match self {
            Triangle::Upper => "U",
            Triangle::Lower => "L",
        }
    }

    /// BLACS token as a C string.
    pub fn as_cstr(self) -> &'static CStr {
        match self {
            Triangle::Upper => c"U",
            Triangle::Lower => c"L",
        }
    }
}

/// Whether the diagonal of a trapezoid is implied unit (and so not sent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagonal {
    /// Diagonal is implied unit and not transferred
    Unit,
    /// Diagonal is transferred
    NonUnit,
}

impl Diagonal {
    /// BLACS token for this diagonal.
    pub fn token(self) -> &'static str {
        match self {
            Diagonal::Unit => "U",
            Diagonal::NonUnit => "N",
        }
    }

    /// BLACS token as a C string.
    pub fn as_cstr(self) -> &'static CStr {
        match self {
            Diagonal::Unit => c"U",
            Diagonal::NonUnit => c"N",
        }
    }
}

/// How process numbers are laid out over grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GridOrder {
    /// Process `p` sits at `(p / npcol, p % npcol)`
    #[default]
    RowMajor,
    /// Process `p` sits at `(p % nprow, p / nprow)`
    ColumnMajor,
}

impl GridOrder {
    /// BLACS token for this ordering.
    pub fn token(self) -> &'static str {
        match self {
            GridOrder::RowMajor => "Row",
            GridOrder::ColumnMajor => "Col",
        }
    }

    /// BLACS token as a C string.
    pub fn as_cstr(self) -> &'static CStr {
        match self {
            GridOrder::RowMajor => c"Row",
            GridOrder::ColumnMajor => c"Col",
        }
    }
}

/// A process coordinate in a 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    /// Process row
    pub row: i32,
    /// Process column
    pub col: i32,
}

impl GridCoord {
    /// Create a coordinate.
    pub const fn new(row: i32, col: i32) -> Self {
        GridCoord { row, col }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((row, col): (i32, i32)) -> Self {
        GridCoord { row, col }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_topologies() -> Vec<Topology> {
        let mut tops = vec![
            Topology::Default,
            Topology::IncreasingRing,
            Topology::DecreasingRing,
            Topology::SplitRing,
            Topology::MultiRing,
            Topology::Hypercube,
            Topology::FullyConnected,
        ];
        for w in 1..=9 {
            tops.push(Topology::Tree(TreeWidth::new(w).unwrap()));
        }
        tops
    }

    #[test]
    fn scope_tokens() {
        assert_eq!(Scope::Row.token(), "R");
        assert_eq!(Scope::Column.token(), "C");
        assert_eq!(Scope::All.token(), "A");
    }

    #[test]
    fn triangle_and_diagonal_tokens() {
        assert_eq!(Triangle::Upper.token(), "U");
        assert_eq!(Triangle::Lower.token(), "L");
        assert_eq!(Diagonal::Unit.token(), "U");
        assert_eq!(Diagonal::NonUnit.token(), "N");
    }

    #[test]
    fn grid_order_tokens() {
        assert_eq!(GridOrder::RowMajor.token(), "Row");
        assert_eq!(GridOrder::ColumnMajor.token(), "Col");
        assert_eq!(GridOrder::default(), GridOrder::RowMajor);
    }

    #[test]
    fn topology_tokens_are_distinct() {
        let tops = all_topologies();
        let mut tokens: Vec<&str> = tops.iter().map(|t| t.token()).collect();
        tokens.sort_unstable();
        tokens.dedup();
        assert_eq!(tokens.len(), tops.len());
        assert_eq!(Topology::default().token(), " ");
        assert_eq!(Topology::Tree(TreeWidth::new(2).unwrap()).token(), "2");
    }

    #[test]
    fn cstr_tokens_match_str_tokens() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_cstr().to_str().unwrap(), scope.token());
        }
        for top in all_topologies() {
            assert_eq!(top.as_cstr().to_str().unwrap(), top.token());
        }
        for tri in [Triangle::Upper, Triangle::Lower] {
            assert_eq!(tri.as_cstr().to_str().unwrap(), tri.token());
        }
        for diag in [Diagonal::Unit, Diagonal::NonUnit] {
            assert_eq!(diag.as_cstr().to_str().unwrap(), diag.token());
        }
        for order in [GridOrder::RowMajor, GridOrder::ColumnMajor] {
            assert_eq!(order.as_cstr().to_str().unwrap(), order.token());
        }
    }

    #[test]
    fn tokens_are_stable_across_calls() {
        for _ in 0..3 {
            assert_eq!(Scope::Column.token(), "C");
            assert_eq!(Topology::SplitRing.token(), "S");
        }
        assert_eq!(Diagonal::Unit.as_cstr(), Diagonal::Unit.as_cstr());
    }

    #[test]
    fn tree_width_bounds() {
        assert_eq!(TreeWidth::new(0), Err(Error::InvalidTreeWidth(0)));
        assert_eq!(TreeWidth::new(10), Err(Error::InvalidTreeWidth(10)));
        assert_eq!(TreeWidth::new(9).map(TreeWidth::get), Ok(9));
    }

    #[test]
    fn grid_coord_display() {
        assert_eq!(GridCoord::new(2, 3).to_string(), "(2, 3)");
        assert_eq!(GridCoord::from((1, 0)), GridCoord::new(1, 0));
    }
}

use std::fmt::{Display, Formatter};
use std::num::NonZero;

use itertools::Itertools;
use ndarray::Array2;
use strum::{Display as StrumDisplay, VariantArray};
use tracing::info;
use varisat::Var;

use crate::buffer::{ClauseBuffer, ClauseFamily, CnfInstance};
use crate::error::{Error, Result};
use crate::logic::{at_most_one, exactly_one};
use crate::oracle::Model;

/// Number of rows and columns of a board.
pub type BoardSize = NonZero<usize>;

/// A square on the board, in `(row, col)` order, both counted from 0 at the top-left.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Square(pub usize, pub usize);

impl Square {
    /// The row of this square.
    pub fn row(&self) -> usize {
        self.0
    }

    /// The column of this square.
    pub fn col(&self) -> usize {
        self.1
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// The two directions a diagonal can run in.
#[derive(Copy, Clone, Debug, StrumDisplay, VariantArray, Eq, PartialEq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum Diagonal {
    /// Top-left to bottom-right.
    Falling,
    /// Bottom-left to top-right.
    Rising,
}

impl Diagonal {
    fn family(self) -> ClauseFamily {
        match self {
            Self::Falling => ClauseFamily::FallingDiagonal,
            Self::Rising => ClauseFamily::RisingDiagonal,
        }
    }
}

/// An n×n board and its variable numbering: square `(row, col)` is variable `row * n + col + 1`,
/// true if and only if a queen stands there.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct QueensBoard {
    n: BoardSize,
}

impl QueensBoard {
    /// A board of `n` rows and columns. Rejects `n = 0`.
    pub fn new(n: usize) -> Result<Self> {
        match NonZero::new(n) {
            None => Err(Error::invalid("the board must have at least one row")),
            Some(n) => Ok(Self { n }),
        }
    }

    /// The board size.
    pub fn size(&self) -> usize {
        self.n.get()
    }

    /// Number of variables of the encoding, n².
    pub fn var_count(&self) -> usize {
        self.size() * self.size()
    }

    /// The variable asserting a queen on `square`.
    #[inline]
    pub fn var(&self, square: Square) -> Var {
        debug_assert!(square.0 < self.size() && square.1 < self.size());
        Var::from_index(square.0 * self.size() + square.1)
    }

    /// Inverse of [`Self::var`]; `None` if `var` is not a square of this board.
    #[inline]
    pub fn square(&self, var: Var) -> Option<Square> {
        (var.index() < self.var_count()).then(|| Square(var.index() / self.size(), var.index() % self.size()))
    }

    fn vars(&self, squares: impl IntoIterator<Item = Square>) -> Vec<Var> {
        squares.into_iter().map(|square| self.var(square)).collect_vec()
    }

    /// Squares of each row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Square>> + '_ {
        (0..self.size()).map(|row| (0..self.size()).map(|col| Square(row, col)).collect_vec())
    }

    /// Squares of each column, left to right.
    pub fn columns(&self) -> impl Iterator<Item = Vec<Square>> + '_ {
        (0..self.size()).map(|col| (0..self.size()).map(|row| Square(row, col)).collect_vec())
    }

    /// Every maximal diagonal running in `direction`, including those of length 1.
    ///
    /// Falling diagonals start on the left column (bottom to top) and then on the top row (left to right).
    /// Rising diagonals start on the left column (top to bottom) and then on the bottom row (left to right).
    pub fn diagonals(&self, direction: Diagonal) -> Vec<Vec<Square>> {
        let n = self.size();
        let last = n - 1;

        match direction {
            Diagonal::Falling => (1..n).rev().map(|row| Square(row, 0))
                .chain((0..n).map(|col| Square(0, col)))
                .map(|Square(row, col)| (0..n - row.max(col)).map(|t| Square(row + t, col + t)).collect_vec())
                .collect_vec(),
            Diagonal::Rising => (0..n).map(|row| Square(row, 0))
                .chain((1..n).map(|col| Square(last, col)))
                .map(|Square(row, col)| (0..=row.min(last - col)).map(|t| Square(row - t, col + t)).collect_vec())
                .collect_vec(),
        }
    }

    /// Encode "exactly one queen per row and per column, at most one per diagonal".
    ///
    /// # Logical setup
    /// Each row R asserts its squares as one clause (some queen is in R),
    /// then forbids every pair of its squares from both holding a queen.
    /// Columns are handled identically.
    ///
    /// A diagonal need not hold a queen, so diagonals only get the pairwise clauses.
    pub fn encode(&self) -> CnfInstance {
        info!(n = self.size(), "reducing n-queens to SAT");

        let mut buffer = ClauseBuffer::new(self.var_count());

        for row in self.rows() {
            buffer.push_group(ClauseFamily::RowExactlyOne, exactly_one(&self.vars(row)));
        }

        for column in self.columns() {
            buffer.push_group(ClauseFamily::ColumnExactlyOne, exactly_one(&self.vars(column)));
        }

        for direction in Diagonal::VARIANTS {
            for diagonal in self.diagonals(*direction) {
                buffer.push_group(direction.family(), at_most_one(&self.vars(diagonal)));
            }
        }

        buffer.finish()
    }

    /// Read the queens off a satisfying `model` of [`Self::encode`].
    pub fn decode(&self, model: &Model) -> Placement {
        Placement {
            n: self.n,
            queens: model.true_vars().filter_map(|var| self.square(var)).sorted().collect_vec(),
        }
    }
}

/// Build the N-Queens instance for an `n`×`n` board.
pub fn reduce_n_queens(n: usize) -> Result<CnfInstance> {
    Ok(QueensBoard::new(n)?.encode())
}

/// Queens decoded from a model, sorted by square.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Placement {
    n: BoardSize,
    queens: Vec<Square>,
}

impl Placement {
    /// The board size.
    pub fn size(&self) -> usize {
        self.n.get()
    }

    /// Squares holding a queen.
    pub fn queens(&self) -> &[Square] {
        &self.queens
    }

    /// DIMACS numbers of the variables set true, i.e. the squares holding a queen.
    pub fn variables(&self) -> Vec<isize> {
        let board = QueensBoard { n: self.n };
        self.queens.iter().map(|square| board.var(*square).to_dimacs()).collect_vec()
    }

    /// Whether this is a solution: n queens, no two sharing a row, column or diagonal.
    pub fn is_valid(&self) -> bool {
        self.queens.len() == self.size()
            && self.queens.iter().tuple_combinations().all(|(a, b)| {
                a.0 != b.0
                    && a.1 != b.1
                    && a.0.abs_diff(b.0) != a.1.abs_diff(b.1)
            })
    }

    fn to_array(&self) -> Array2<bool> {
        let mut board = Array2::from_elem((self.size(), self.size()), false);
        for Square(row, col) in &self.queens {
            board[[*row, *col]] = true;
        }
        board
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.to_array().rows() {
            writeln!(f, "{}", row.iter().map(|queen| if *queen { 'Q' } else { '.' }).collect::<String>())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strum::VariantArray;

    use crate::buffer::ClauseFamily;
    use crate::logic::pairs;

    use super::{Diagonal, QueensBoard, Square};

    fn diagonal_pairs(n: usize) -> usize {
        2 * (1..n).map(pairs).sum::<usize>() + pairs(n)
    }

    #[test]
    fn zero_board_is_rejected() {
        assert!(QueensBoard::new(0).is_err());
    }

    #[test]
    fn numbering_is_row_major_from_one() {
        let board = QueensBoard::new(3).unwrap();
        assert_eq!(board.var(Square(0, 0)).to_dimacs(), 1);
        assert_eq!(board.var(Square(0, 2)).to_dimacs(), 3);
        assert_eq!(board.var(Square(2, 1)).to_dimacs(), 8);
        assert_eq!(board.var(Square(2, 2)).to_dimacs(), 9);
    }

    #[test]
    fn diagonals_cover_every_square_once() {
        for n in 1..=7 {
            let board = QueensBoard::new(n).unwrap();
            for direction in Diagonal::VARIANTS {
                let diagonals = board.diagonals(*direction);
                assert_eq!(diagonals.len(), 2 * n - 1);

                let mut squares = diagonals.concat();
                squares.sort();
                squares.dedup();
                assert_eq!(squares.len(), n * n, "{direction} diagonals of {n}");
            }
        }
    }

    #[test]
    fn diagonals_run_the_right_way() {
        let board = QueensBoard::new(4).unwrap();
        assert!(board.diagonals(Diagonal::Falling).contains(&vec![Square(0, 0), Square(1, 1), Square(2, 2), Square(3, 3)]));
        assert!(board.diagonals(Diagonal::Falling).contains(&vec![Square(2, 0), Square(3, 1)]));
        assert!(board.diagonals(Diagonal::Rising).contains(&vec![Square(3, 0), Square(2, 1), Square(1, 2), Square(0, 3)]));
        assert!(board.diagonals(Diagonal::Rising).contains(&vec![Square(3, 2), Square(2, 3)]));
    }

    #[test]
    fn family_sizes() {
        for n in 1..=9 {
            let instance = QueensBoard::new(n).unwrap().encode();

            assert_eq!(instance.var_count(), n * n);
            assert_eq!(instance.family_len(ClauseFamily::RowExactlyOne), n * (1 + pairs(n)));
            assert_eq!(instance.family_len(ClauseFamily::ColumnExactlyOne), n * (1 + pairs(n)));
            assert_eq!(instance.family_len(ClauseFamily::FallingDiagonal), diagonal_pairs(n));
            assert_eq!(instance.family_len(ClauseFamily::RisingDiagonal), diagonal_pairs(n));
            assert_eq!(instance.clause_count(), instance.groups().iter().map(|g| g.len()).sum::<usize>());
        }
    }

    #[test]
    fn four_by_four_has_84_clauses() {
        assert_eq!(QueensBoard::new(4).unwrap().encode().clause_count(), 84);
    }

    #[test]
    fn one_by_one_is_a_single_unit_clause_per_line() {
        let instance = QueensBoard::new(1).unwrap().encode();
        assert_eq!(instance.clause_count(), 2);
        assert_eq!(instance.family_len(ClauseFamily::FallingDiagonal), 0);
        assert_eq!(instance.family_len(ClauseFamily::RisingDiagonal), 0);
    }
}

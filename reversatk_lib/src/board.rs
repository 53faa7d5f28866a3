use smallvec::SmallVec;
use std::fmt::{self, Write};
use std::str::FromStr;

pub const BOARD_SIZE: usize = 8;
pub const NUM_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

const DIRECTIONS: [(isize, isize); 8] = [
   (-1, -1),
   (-1, 0),
   (-1, 1),
   (0, -1),
   (0, 1),
   (1, -1),
   (1, 0),
   (1, 1),
];

/// A list of cell indices. 32 covers nearly every real position without spilling.
pub type MoveList = SmallVec<[u8; 32]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
   Empty,
   Black,
   White,
}

impl Cell {
   pub fn color(self) -> Option<Color> {
      match self {
         Cell::Empty => None,
         Cell::Black => Some(Color::Black),
         Cell::White => Some(Color::White),
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
   Black,
   White,
}

impl Color {
   pub fn cell(self) -> Cell {
      match self {
         Color::Black => Cell::Black,
         Color::White => Cell::White,
      }
   }
}

impl std::ops::Not for Color {
   type Output = Color;
   fn not(self) -> Color {
      match self {
         Color::Black => Color::White,
         Color::White => Color::Black,
      }
   }
}

impl fmt::Display for Color {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      match self {
         Color::Black => write!(f, "black"),
         Color::White => write!(f, "white"),
      }
   }
}

impl FromStr for Color {
   type Err = String;

   /// Accepts colour names as well as the framework's numeric codes (0 = black, 1 = white)
   fn from_str(s: &str) -> Result<Color, String> {
      match s.to_ascii_lowercase().as_str() {
         "black" | "b" | "0" => Ok(Color::Black),
         "white" | "w" | "1" => Ok(Color::White),
         _ => Err(format!("Expected one of black/white/b/w/0/1 for colour, got {}", s)),
      }
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
   Place(u8),
   Pass,
}

impl Move {
   pub fn cell(self) -> Option<u8> {
      match self {
         Move::Place(cell) => Some(cell),
         Move::Pass => None,
      }
   }
}

impl fmt::Display for Move {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      match self {
         Move::Place(cell) => index_to_algebraic(*cell, f),
         Move::Pass => write!(f, "pass"),
      }
   }
}

impl FromStr for Move {
   type Err = String;

   fn from_str(s: &str) -> Result<Move, String> {
      if s == "pass" {
         return Ok(Move::Pass);
      }
      algebraic_to_index(s).map(Move::Place)
   }
}

fn index_to_algebraic(index: u8, f: &mut fmt::Formatter) -> fmt::Result {
   f.write_char((b'a' + index % 8) as char)?;
   write!(f, "{}", (index / 8) + 1)
}

fn algebraic_to_index(algebraic: &str) -> Result<u8, String> {
   if algebraic.len() != 2 {
      return Err(format!("{} not a valid algebraic location; wrong length", algebraic));
   }
   let col = match algebraic.as_bytes()[0] {
      file @ b'a'..=b'h' => file - b'a',
      file => return Err(format!("{} is not a valid algebraic file, expected a..=h", file as char)),
   };
   let row = match algebraic.as_bytes()[1] {
      rank @ b'1'..=b'8' => rank - b'1',
      rank => return Err(format!("{} is not a valid algebraic rank, expected 1..=8", rank as char)),
   };
   Ok((row * 8) + col)
}

/// A full copy of the cells, taken before a speculative move.
///
/// Deliberately neither `Clone` nor `Copy`: `Board::restore` consumes it, so a
/// snapshot can be rolled back to exactly once.
pub struct Snapshot {
   cells: [Cell; NUM_CELLS],
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
   cells: [Cell; NUM_CELLS],
}

impl Default for Board {
   fn default() -> Board {
      Board::from_start()
   }
}

impl Board {
   /// Not the starting position. All cells empty
   pub fn empty() -> Board {
      Board {
         cells: [Cell::Empty; NUM_CELLS],
      }
   }

   pub fn from_start() -> Board {
      let mut board = Board::empty();
      board.reset();
      board
   }

   pub fn reset(&mut self) {
      let mid = BOARD_SIZE / 2;
      self.cells = [Cell::Empty; NUM_CELLS];
      self.cells[mid * BOARD_SIZE + mid] = Cell::White;
      self.cells[(mid - 1) * BOARD_SIZE + (mid - 1)] = Cell::White;
      self.cells[mid * BOARD_SIZE + (mid - 1)] = Cell::Black;
      self.cells[(mid - 1) * BOARD_SIZE + mid] = Cell::Black;
   }

   pub fn get(&self, cell: u8) -> Cell {
      self.cells[cell as usize]
   }

   pub fn set(&mut self, cell: u8, value: Cell) {
      self.cells[cell as usize] = value;
   }

   pub fn count(&self, color: Color) -> u32 {
      let target = color.cell();
      self.cells.iter().filter(|x| **x == target).count() as u32
   }

   pub fn empty_count(&self) -> u32 {
      self.cells.iter().filter(|x| **x == Cell::Empty).count() as u32
   }

   /// Every empty cell from which at least one direction brackets opponent pieces,
   /// in ascending index order. Empty means `color` has to pass.
   pub fn legal_moves(&self, color: Color) -> MoveList {
      (0..NUM_CELLS as u8).filter(|cell| self.is_legal(*cell, color)).collect()
   }

   /// Number of legal moves for `color`, without building the list
   pub fn mobility(&self, color: Color) -> u32 {
      (0..NUM_CELLS as u8).filter(|cell| self.is_legal(*cell, color)).count() as u32
   }

   pub fn has_legal_move(&self, color: Color) -> bool {
      (0..NUM_CELLS as u8).any(|cell| self.is_legal(cell, color))
   }

   pub fn is_legal(&self, cell: u8, color: Color) -> bool {
      if cell as usize >= NUM_CELLS || self.get(cell) != Cell::Empty {
         return false;
      }
      DIRECTIONS
         .iter()
         .any(|&(dr, dc)| self.brackets(cell, dr, dc, color))
   }

   pub fn is_game_over(&self) -> bool {
      !self.has_legal_move(Color::Black) && !self.has_legal_move(Color::White)
   }

   /// Places a `color` piece on `cell` and flips every bracketed line.
   ///
   /// The move must come from `legal_moves(color)`; nothing is validated here.
   pub fn apply_move(&mut self, cell: u8, color: Color) {
      debug_assert!(self.is_legal(cell, color));
      let own = color.cell();
      for &(dr, dc) in DIRECTIONS.iter() {
         if !self.brackets(cell, dr, dc, color) {
            continue;
         }
         let mut cur = step(cell, dr, dc);
         while let Some(c) = cur {
            if self.cells[c as usize] == own {
               break;
            }
            self.cells[c as usize] = own;
            cur = step(c, dr, dc);
         }
      }
      self.cells[cell as usize] = own;
   }

   /// Applies a move that came from outside the search. Passing leaves the board untouched.
   pub fn play(&mut self, mv: Move, color: Color) -> Result<(), String> {
      match mv {
         Move::Pass => Ok(()),
         Move::Place(cell) if self.is_legal(cell, color) => {
            self.apply_move(cell, color);
            Ok(())
         }
         Move::Place(_) => Err(format!("{} is not a legal move for {}", mv, color)),
      }
   }

   pub fn snapshot(&self) -> Snapshot {
      Snapshot { cells: self.cells }
   }

   pub fn restore(&mut self, snapshot: Snapshot) {
      self.cells = snapshot.cells;
   }

   /// Walking from `cell` in direction (dr, dc): one or more opponent pieces, then one of ours
   fn brackets(&self, cell: u8, dr: isize, dc: isize, color: Color) -> bool {
      let own = color.cell();
      let opp = (!color).cell();
      let mut found_opp = false;
      let mut cur = step(cell, dr, dc);
      while let Some(c) = cur {
         let value = self.cells[c as usize];
         if value == opp {
            found_opp = true;
            cur = step(c, dr, dc);
         } else {
            return value == own && found_opp;
         }
      }
      false
   }
}

fn step(cell: u8, dr: isize, dc: isize) -> Option<u8> {
   let row = (cell as usize / BOARD_SIZE) as isize + dr;
   let col = (cell as usize % BOARD_SIZE) as isize + dc;
   if row < 0 || row >= BOARD_SIZE as isize || col < 0 || col >= BOARD_SIZE as isize {
      return None;
   }
   Some((row as usize * BOARD_SIZE + col as usize) as u8)
}

impl fmt::Display for Board {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      writeln!(
         f,
         "  a b c d e f g h  [B={} W={}]",
         self.count(Color::Black),
         self.count(Color::White)
      )?;
      for row in 0..BOARD_SIZE {
         write!(f, "{} ", row + 1)?;
         for col in 0..BOARD_SIZE {
            let symbol = match self.cells[row * BOARD_SIZE + col] {
               Cell::Empty => '.',
               Cell::Black => 'B',
               Cell::White => 'W',
            };
            f.write_char(symbol)?;
            f.write_char(' ')?;
         }
         writeln!(f)?;
      }
      Ok(())
   }
}

impl fmt::Debug for Board {
   fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
      write!(f, "\n{}", self)
   }
}

impl FromStr for Board {
   type Err = String;

   /// Parses 64 cells in row-major order; whitespace is ignored.
   /// `.` is empty, `B`/`X` black, `W`/`O` white.
   fn from_str(s: &str) -> Result<Board, String> {
      let mut board = Board::empty();
      let mut index = 0;
      for (i, c) in s.chars().filter(|c| !c.is_whitespace()).enumerate() {
         if i >= NUM_CELLS {
            return Err(format!("malformed board; more than {} cells", NUM_CELLS));
         }
         board.cells[i] = match c {
            '.' | '-' => Cell::Empty,
            'B' | 'b' | 'X' | 'x' => Cell::Black,
            'W' | 'w' | 'O' | 'o' => Cell::White,
            _ => return Err(format!("malformed board; unexpected character {} at cell {}", c, i)),
         };
         index = i + 1;
      }
      if index != NUM_CELLS {
         return Err(format!("malformed board; expected {} cells, found {}", NUM_CELLS, index));
      }
      Ok(board)
   }
}

/// Positions reached by random play from the opening, with the side to move.
#[cfg(test)]
pub(crate) fn random_positions(seed: u64, games: usize) -> Vec<(Board, Color)> {
   use rand::rngs::StdRng;
   use rand::seq::SliceRandom;
   use rand::SeedableRng;

   let mut rng = StdRng::seed_from_u64(seed);
   let mut positions = Vec::new();
   for _ in 0..games {
      let mut board = Board::from_start();
      let mut to_move = Color::Black;
      loop {
         positions.push((board.clone(), to_move));
         let moves = board.legal_moves(to_move);
         if let Some(cell) = moves.choose(&mut rng) {
            board.apply_move(*cell, to_move);
         } else if !board.has_legal_move(!to_move) {
            break;
         }
         to_move = !to_move;
      }
   }
   positions
}

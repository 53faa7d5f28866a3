use crate::board::{Board, Color, BOARD_SIZE, NUM_CELLS};

/// Multipliers for the four (own - opponent) terms of the evaluation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
   pub pieces: f64,
   pub edges: f64,
   pub corners: f64,
   pub mobility: f64,
}

/// More than two thirds of the board empty
pub const OPENING: Weights = Weights {
   pieces: 0.1,
   edges: 5.0,
   corners: 25.0,
   mobility: 3.0,
};

pub const MIDGAME: Weights = Weights {
   pieces: 0.5,
   edges: 3.0,
   corners: 15.0,
   mobility: 2.0,
};

/// A third of the board or less empty
pub const ENDGAME: Weights = Weights {
   pieces: 2.0,
   edges: 1.5,
   corners: 10.0,
   mobility: 0.3,
};

pub fn weights_for(empty_cells: u32) -> Weights {
   let cells = NUM_CELLS as u32;
   if empty_cells > 2 * cells / 3 {
      OPENING
   } else if empty_cells > cells / 3 {
      MIDGAME
   } else {
      ENDGAME
   }
}

fn is_corner(row: usize, col: usize) -> bool {
   (row == 0 || row == BOARD_SIZE - 1) && (col == 0 || col == BOARD_SIZE - 1)
}

fn is_edge(row: usize, col: usize) -> bool {
   row == 0 || col == 0 || row == BOARD_SIZE - 1 || col == BOARD_SIZE - 1
}

/// Each weighted term is truncated toward zero before summing, so small
/// differences under a fractional weight contribute nothing.
fn weighted(diff: i32, weight: f64) -> i32 {
   (diff as f64 * weight) as i32
}

/// Static score of `board` from `perspective`'s point of view. Independent of who is to move.
pub fn evaluate(board: &Board, perspective: Color) -> i32 {
   let mut pieces = 0;
   let mut edges = 0;
   let mut corners = 0;
   let mut empty = 0;

   for cell in 0..NUM_CELLS as u8 {
      let sign = match board.get(cell).color() {
         Some(c) if c == perspective => 1,
         Some(_) => -1,
         None => {
            empty += 1;
            continue;
         }
      };
      let row = cell as usize / BOARD_SIZE;
      let col = cell as usize % BOARD_SIZE;
      pieces += sign;
      if is_corner(row, col) {
         corners += sign;
      } else if is_edge(row, col) {
         edges += sign;
      }
   }

   let mobility = board.mobility(perspective) as i32 - board.mobility(!perspective) as i32;

   let w = weights_for(empty);
   weighted(pieces, w.pieces)
      + weighted(edges, w.edges)
      + weighted(corners, w.corners)
      + weighted(mobility, w.mobility)
}

use crate::board::{Board, Color, Move};
use crate::messages::{EngineMessage, InterfaceMessage};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::mpsc;

/// Any legal move, uniformly; `Pass` only when there is none
pub fn random_move<R: Rng + ?Sized>(board: &Board, color: Color, rng: &mut R) -> Move {
   match board.legal_moves(color).choose(rng) {
      Some(cell) => Move::Place(*cell),
      None => Move::Pass,
   }
}

/// Same messages as the search engine, answered without searching.
pub fn start(receiver: mpsc::Receiver<InterfaceMessage>, sender: mpsc::Sender<EngineMessage>) {
   let mut rng = rand::thread_rng();
   let mut board = Board::from_start();
   while let Ok(message) = receiver.recv() {
      match message {
         InterfaceMessage::GenMove { color, .. } | InterfaceMessage::GoDepth { color, .. } => {
            let mv = random_move(&board, color, &mut rng);
            info!("{} plays {} at random", color, mv);
            if sender.send(EngineMessage::BestMove(mv)).is_err() {
               break;
            }
         }
         InterfaceMessage::ApplyMove { mv, color } => {
            if let Err(e) = board.play(mv, color) {
               warn!("ignoring move from {}: {}; treating it as a pass", color, e);
            }
         }
         InterfaceMessage::SetBoard(new_board) => {
            board = new_board;
         }
         InterfaceMessage::Reset => {
            board.reset();
         }
         InterfaceMessage::Terminate => break,
      }
   }
   debug!("random engine shutting down");
}

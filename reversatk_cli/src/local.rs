use crate::error::{PlayerError, ProtocolError, Result};
use log::{debug, info};
use rand::Rng;
use reversatk_lib::board::{Board, Color, Move};
use reversatk_lib::messages::{EngineMessage, InterfaceMessage};
use reversatk_lib::random::random_move;
use std::sync::mpsc;
use std::time::Duration;

/// Plays one game offline, the engine as `color` against a random opponent.
///
/// Black moves first and the game ends after two passes in a row. Returns the
/// final board.
pub fn play<R: Rng + ?Sized>(
   color: Color,
   time_limit: Duration,
   sender: &mpsc::Sender<InterfaceMessage>,
   receiver: &mpsc::Receiver<EngineMessage>,
   rng: &mut R,
) -> Result<Board> {
   let mut board = Board::from_start();
   let mut to_move = Color::Black;
   let mut passes = 0;
   send(sender, InterfaceMessage::Reset)?;
   info!("local game, engine plays {}", color);

   while passes < 2 {
      let mv = if to_move == color {
         send(
            sender,
            InterfaceMessage::GenMove {
               color,
               time_budget: time_limit,
            },
         )?;
         match receiver.recv().map_err(|_| PlayerError::EngineStopped)? {
            EngineMessage::BestMove(mv) => mv,
         }
      } else {
         random_move(&board, to_move, rng)
      };
      board
         .play(mv, to_move)
         .map_err(|_| PlayerError::Protocol(ProtocolError::InvalidMove(mv.to_string())))?;
      send(sender, InterfaceMessage::ApplyMove { mv, color: to_move })?;
      debug!("{} played {}\n{}", to_move, mv, board);

      passes = if mv == Move::Pass { passes + 1 } else { 0 };
      to_move = !to_move;
   }

   let ours = board.count(color);
   let theirs = board.count(!color);
   info!(
      "game over: {} {} - {} {}, {}",
      color,
      ours,
      theirs,
      !color,
      if ours > theirs {
         "engine wins"
      } else if ours < theirs {
         "engine loses"
      } else {
         "draw"
      }
   );
   Ok(board)
}

fn send(sender: &mpsc::Sender<InterfaceMessage>, message: InterfaceMessage) -> Result<()> {
   sender.send(message).map_err(|_| PlayerError::EngineStopped)
}

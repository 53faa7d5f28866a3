use crate::error::ProtocolError;
use reversatk_lib::board::{Move, NUM_CELLS};

/// Longest line the referee is expected to send
pub const MAX_LINE_LENGTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefereeEvent {
   RequestMove,
   OpponentMove(Move),
   MatchReset,
   GameTerminated,
}

/// Parses one line from the referee, already stripped of its newline.
///
/// The opponent's move is a cell index 0..=63, row-major from a1, or -1 for a pass.
pub fn parse_event(line: &str) -> Result<RefereeEvent, ProtocolError> {
   let mut words = line.split_whitespace();
   match words.next() {
      Some("GenActionMessage") => Ok(RefereeEvent::RequestMove),
      Some("MatchResetMessage") => Ok(RefereeEvent::MatchReset),
      Some("GameTerminatedMessage") => Ok(RefereeEvent::GameTerminated),
      Some("PlayedMoveMessage") => {
         let arg = words.next().unwrap_or("");
         let index: i64 = arg.parse().map_err(|_| ProtocolError::InvalidMove(arg.to_string()))?;
         match index {
            -1 => Ok(RefereeEvent::OpponentMove(Move::Pass)),
            i if (0..NUM_CELLS as i64).contains(&i) => Ok(RefereeEvent::OpponentMove(Move::Place(i as u8))),
            _ => Err(ProtocolError::InvalidMove(arg.to_string())),
         }
      }
      _ => Err(ProtocolError::UnknownEvent(line.to_string())),
   }
}

/// The line sent back for a chosen move
pub fn encode_move(mv: Move) -> String {
   match mv {
      Move::Place(cell) => format!("{}\n", cell),
      Move::Pass => "-1\n".to_string(),
   }
}

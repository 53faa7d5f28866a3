use std::error::Error;
use std::fmt;
use std::io;
use tokio_util::codec::LinesCodecError;

/// A line from the referee we could not make sense of. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
   UnknownEvent(String),
   InvalidMove(String),
}

impl fmt::Display for ProtocolError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         ProtocolError::UnknownEvent(line) => write!(f, "unknown event {:?}", line),
         ProtocolError::InvalidMove(mv) => write!(f, "invalid move {:?}", mv),
      }
   }
}

impl Error for ProtocolError {}

#[derive(Debug)]
pub enum PlayerError {
   Io(io::Error),
   /// The referee closed the connection
   Disconnected,
   /// The engine thread hung up before answering
   EngineStopped,
   Protocol(ProtocolError),
}

impl fmt::Display for PlayerError {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         PlayerError::Io(err) => write!(f, "IO error: {}", err),
         PlayerError::Disconnected => write!(f, "referee closed the connection"),
         PlayerError::EngineStopped => write!(f, "engine stopped responding"),
         PlayerError::Protocol(err) => write!(f, "protocol error: {}", err),
      }
   }
}

impl Error for PlayerError {
   fn source(&self) -> Option<&(dyn Error + 'static)> {
      match self {
         PlayerError::Io(err) => Some(err),
         PlayerError::Protocol(err) => Some(err),
         _ => None,
      }
   }
}

impl From<io::Error> for PlayerError {
   fn from(err: io::Error) -> Self {
      PlayerError::Io(err)
   }
}

impl From<LinesCodecError> for PlayerError {
   fn from(err: LinesCodecError) -> Self {
      match err {
         LinesCodecError::Io(err) => PlayerError::Io(err),
         LinesCodecError::MaxLineLengthExceeded => PlayerError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "referee sent an overlong line",
         )),
      }
   }
}

impl From<ProtocolError> for PlayerError {
   fn from(err: ProtocolError) -> Self {
      PlayerError::Protocol(err)
   }
}

pub type Result<T> = std::result::Result<T, PlayerError>;

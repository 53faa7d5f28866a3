use crate::error::{PlayerError, ProtocolError, Result};
use crate::protocol::{self, RefereeEvent, MAX_LINE_LENGTH};
use futures::StreamExt;
use log::{debug, error, info, trace, warn};
use reversatk_lib::board::{Color, Move};
use reversatk_lib::messages::{EngineMessage, InterfaceMessage};
use std::sync::mpsc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec};

pub async fn main_loop(
   address: &str,
   port: u16,
   color: Color,
   time_limit: Duration,
   sender: &mpsc::Sender<InterfaceMessage>,
   receiver: &mpsc::Receiver<EngineMessage>,
) -> Result<()> {
   let stream = TcpStream::connect((address, port)).await?;
   stream.set_nodelay(true)?;
   info!("connected to referee at {}:{}, playing {}", address, port, color);
   let (reader, writer) = stream.into_split();
   play(reader, writer, color, time_limit, sender, receiver).await
}

/// Serves referee events until the game is terminated.
///
/// Running out of input before `GameTerminatedMessage` is an error, as is the
/// engine going away. Lines we cannot parse are logged and skipped.
pub async fn play<R, W>(
   reader: R,
   mut writer: W,
   mut color: Color,
   time_limit: Duration,
   sender: &mpsc::Sender<InterfaceMessage>,
   receiver: &mpsc::Receiver<EngineMessage>,
) -> Result<()>
where
   R: AsyncRead + Unpin,
   W: AsyncWrite + Unpin,
{
   let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
   while let Some(line) = lines.next().await {
      let line = line?;
      trace!("referee: {}", line.trim_end());
      if line.trim().is_empty() {
         continue;
      }
      match protocol::parse_event(&line) {
         Ok(RefereeEvent::RequestMove) => {
            let mv = think(color, time_limit, sender, receiver)?;
            writer.write_all(protocol::encode_move(mv).as_bytes()).await?;
            writer.flush().await?;
            send(sender, InterfaceMessage::ApplyMove { mv, color })?;
         }
         Ok(RefereeEvent::OpponentMove(mv)) => {
            debug!("opponent played {}", mv);
            send(sender, InterfaceMessage::ApplyMove { mv, color: !color })?;
         }
         Ok(RefereeEvent::MatchReset) => {
            color = !color;
            info!("match reset, now playing {}", color);
            send(sender, InterfaceMessage::Reset)?;
         }
         Ok(RefereeEvent::GameTerminated) => {
            info!("game terminated by the referee");
            return Ok(());
         }
         Err(e @ ProtocolError::InvalidMove(_)) => {
            warn!("{}; treating it as a pass", e);
         }
         Err(e) => {
            warn!("ignoring line from referee: {}", e);
         }
      }
   }
   error!("referee hung up without terminating the game");
   Err(PlayerError::Disconnected)
}

fn send(sender: &mpsc::Sender<InterfaceMessage>, message: InterfaceMessage) -> Result<()> {
   sender.send(message).map_err(|_| PlayerError::EngineStopped)
}

fn think(
   color: Color,
   time_limit: Duration,
   sender: &mpsc::Sender<InterfaceMessage>,
   receiver: &mpsc::Receiver<EngineMessage>,
) -> Result<Move> {
   send(
      sender,
      InterfaceMessage::GenMove {
         color,
         time_budget: time_limit,
      },
   )?;
   let message = tokio::task::block_in_place(|| receiver.recv()).map_err(|_| PlayerError::EngineStopped)?;
   match message {
      EngineMessage::BestMove(mv) => Ok(mv),
   }
}

#[cfg(test)]
mod tests {
   use crate::error::PlayerError;
   use crate::referee::*;
   use reversatk_lib::board::Board;
   use reversatk_lib::engine;
   use std::thread;
   use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

   struct EngineThread {
      sender: mpsc::Sender<InterfaceMessage>,
      receiver: mpsc::Receiver<EngineMessage>,
      handle: thread::JoinHandle<()>,
   }

   impl EngineThread {
      fn spawn() -> EngineThread {
         let (sender, ite_rx) = mpsc::channel();
         let (eti_tx, receiver) = mpsc::channel();
         let handle = thread::spawn(move || engine::start(ite_rx, eti_tx, 1));
         EngineThread {
            sender,
            receiver,
            handle,
         }
      }

      fn stop(self) {
         self.sender.send(InterfaceMessage::Terminate).unwrap();
         self.handle.join().unwrap();
      }
   }

   // a one second limit is all safety margin, so the engine answers at once
   const INSTANT: Duration = Duration::from_secs(1);

   #[tokio::test(flavor = "multi_thread")]
   async fn plays_a_few_moves() {
      let engine = EngineThread::spawn();
      let (client, server) = tokio::io::duplex(4096);
      let (server_read, server_write) = tokio::io::split(server);
      let (client_read, mut client_write) = tokio::io::split(client);
      let mut replies = BufReader::new(client_read).lines();

      let referee = async {
         let mut board = Board::from_start();

         client_write.write_all(b"GenActionMessage\n").await.unwrap();
         let reply = replies.next_line().await.unwrap().unwrap();
         assert_eq!(reply, "19");
         board.play(Move::Place(19), Color::Black).unwrap();

         // several events in a single write, with noise in between
         client_write
            .write_all(b"PlayedMoveMessage 18\nHelloMessage\nPlayedMoveMessage 99\nGenActionMessage\n")
            .await
            .unwrap();
         board.play(Move::Place(18), Color::White).unwrap();
         let reply: u8 = replies.next_line().await.unwrap().unwrap().parse().unwrap();
         assert!(board.is_legal(reply, Color::Black));

         client_write.write_all(b"GameTerminatedMessage\n").await.unwrap();
      };
      let (result, ()) = tokio::join!(
         play(server_read, server_write, Color::Black, INSTANT, &engine.sender, &engine.receiver),
         referee
      );
      assert!(result.is_ok());
      engine.stop();
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn reset_swaps_colour() {
      let engine = EngineThread::spawn();
      let (client, server) = tokio::io::duplex(4096);
      let (server_read, server_write) = tokio::io::split(server);
      let (client_read, mut client_write) = tokio::io::split(client);
      let mut replies = BufReader::new(client_read).lines();

      let referee = async {
         // as white, answering black's d3
         client_write
            .write_all(b"PlayedMoveMessage 19\nGenActionMessage\n")
            .await
            .unwrap();
         let reply: u8 = replies.next_line().await.unwrap().unwrap().parse().unwrap();
         let mut board = Board::from_start();
         board.play(Move::Place(19), Color::Black).unwrap();
         assert!(board.is_legal(reply, Color::White));

         // next match we open as black on a fresh board
         client_write.write_all(b"MatchResetMessage\nGenActionMessage\n").await.unwrap();
         assert_eq!(replies.next_line().await.unwrap().unwrap(), "19");
         client_write.write_all(b"GameTerminatedMessage\n").await.unwrap();
      };
      let (result, ()) = tokio::join!(
         play(server_read, server_write, Color::White, INSTANT, &engine.sender, &engine.receiver),
         referee
      );
      assert!(result.is_ok());
      engine.stop();
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn hang_up_is_an_error() {
      let engine = EngineThread::spawn();
      let (client, server) = tokio::io::duplex(4096);
      let (server_read, server_write) = tokio::io::split(server);
      drop(client);
      let result = play(server_read, server_write, Color::Black, INSTANT, &engine.sender, &engine.receiver).await;
      assert!(matches!(result, Err(PlayerError::Disconnected)));
      engine.stop();
   }

   #[tokio::test(flavor = "multi_thread")]
   async fn engine_gone_is_an_error() {
      let (sender, ite_rx) = mpsc::channel();
      let (_eti_tx, receiver) = mpsc::channel::<EngineMessage>();
      drop(ite_rx);
      let (mut client, server) = tokio::io::duplex(4096);
      let (server_read, server_write) = tokio::io::split(server);
      client.write_all(b"GenActionMessage\n").await.unwrap();
      let result = play(server_read, server_write, Color::Black, INSTANT, &sender, &receiver).await;
      assert!(matches!(result, Err(PlayerError::EngineStopped)));
   }
}

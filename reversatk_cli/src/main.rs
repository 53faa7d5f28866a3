mod error;
mod local;
mod protocol;
mod referee;

use crate::error::PlayerError;
use log::{error, info};
use reversatk_lib::board::Color;
use reversatk_lib::messages::{EngineMessage, InterfaceMessage};
use std::process;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

const PROFILE_DEPTH: i32 = 8;

/// A distributed alpha-beta othello player
#[derive(StructOpt, Debug)]
#[structopt(name = "reversatk")]
struct Opt {
   /// Referee host
   address: String,
   /// Referee port
   port: u16,
   /// Seconds allowed per move
   time_limit: u64,
   /// Our colour: black/white, or 0/1
   colour: Color,
   /// Search workers besides the coordinator; 0 searches on one thread
   #[structopt(short = "w", long = "workers")]
   workers: Option<usize>,
   /// Play uniformly random legal moves instead of searching
   #[structopt(long = "random")]
   random: bool,
   /// Play one offline game against a random opponent instead of connecting.
   /// Address and port must still be given but are ignored
   #[structopt(short = "l", long = "local")]
   local: bool,
   /// Crude profiling mode: a fixed-depth search from the opening as black.
   /// Address, port, time limit and colour must still be given but are ignored
   #[structopt(short = "p", long = "profile")]
   profiling: bool,
}

fn default_workers() -> usize {
   thread::available_parallelism().map(|n| n.get() - 1).unwrap_or(0)
}

fn main() {
   pretty_env_logger::init();
   let opt = Opt::from_args();
   let workers = opt.workers.unwrap_or_else(default_workers);

   let (ite_tx, ite_rx) = mpsc::channel(); // Interface to Engine
   let (eti_tx, eti_rx) = mpsc::channel(); // Engine to Interface

   let engine = if opt.random {
      thread::spawn(move || {
         reversatk_lib::random::start(ite_rx, eti_tx);
      })
   } else {
      info!("searching with {} workers", workers);
      thread::spawn(move || {
         reversatk_lib::engine::start(ite_rx, eti_tx, workers);
      })
   };

   let time_limit = Duration::from_secs(opt.time_limit);
   let result = if opt.profiling {
      profile(&ite_tx, &eti_rx)
   } else if opt.local {
      local::play(opt.colour, time_limit, &ite_tx, &eti_rx, &mut rand::thread_rng()).map(|board| println!("{}", board))
   } else {
      tokio::runtime::Runtime::new()
         .map_err(PlayerError::from)
         .and_then(|runtime| {
            runtime.block_on(referee::main_loop(
               &opt.address,
               opt.port,
               opt.colour,
               time_limit,
               &ite_tx,
               &eti_rx,
            ))
         })
   };

   let _ = ite_tx.send(InterfaceMessage::Terminate);
   if engine.join().is_err() {
      error!("engine thread panicked");
   }
   if let Err(e) = result {
      error!("{}", e);
      process::exit(1);
   }
}

fn profile(sender: &mpsc::Sender<InterfaceMessage>, receiver: &mpsc::Receiver<EngineMessage>) -> error::Result<()> {
   sender
      .send(InterfaceMessage::GoDepth {
         color: Color::Black,
         depth: PROFILE_DEPTH,
      })
      .map_err(|_| PlayerError::EngineStopped)?;
   match receiver.recv().map_err(|_| PlayerError::EngineStopped)? {
      EngineMessage::BestMove(mv) => println!("{}", mv),
   }
   Ok(())
}

pub mod board;
pub mod engine;
pub mod eval;
pub mod master;
pub mod messages;
pub mod random;
pub mod search;
pub mod worker;

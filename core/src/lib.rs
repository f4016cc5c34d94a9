#![no_std]

extern crate alloc;

pub use board::*;
pub use cell::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use modifier::*;
pub use random::*;
pub use session::*;
pub use types::*;

mod board;
mod cell;
mod clock;
mod config;
mod error;
mod modifier;
mod random;
mod session;
mod types;

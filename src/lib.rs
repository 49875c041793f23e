#![doc = include_str!("../README.md")]

mod buffer;
mod error;

pub mod bits;
pub mod checksum;
pub mod lexer;
pub mod packet;

pub use error::{Error, Result};
pub use lexer::{
    Fetch, Lexer, LexerConfig, LexerStats, Packets, Protocol, ProtocolSet, BUFFER_CAPACITY,
};
pub use packet::{Packet, PacketType, MAX_PACKET_LENGTH};

//! Building blocks for the archive codec

pub mod bit_io;
pub mod freq_table;
pub mod huff_tree;
pub mod code_table;

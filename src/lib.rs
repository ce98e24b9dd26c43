//! # huffpack
//!
//! Static Huffman compression of byte streams.
//!
//! An archive holds the frequency table of the original data, followed by the
//! bit-packed Huffman codes and a one byte trailer giving the number of padding
//! bits in the last payload byte.  The codes themselves are never stored, the
//! expander rebuilds the identical tree from the frequencies.
//!
//! * `huffman` has the archive codec (`compress`, `expand` and friends)
//! * `tools` has the building blocks: bit streams, frequency table, tree, code table

pub mod tools;
pub mod huffman;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Archive Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("could not open {path}: {source}")]
    FileOpen {
        path: String,
        source: std::io::Error
    },
    #[error("input is empty")]
    EmptyInput,
    #[error("corrupted frequency table: {0}")]
    CorruptHeader(String),
    #[error("archive is empty or corrupted")]
    EmptyArchive,
    #[error("corrupted payload: {0}")]
    CorruptPayload(String),
    #[error("input changed while it was being compressed")]
    InputChanged,
    #[error("cannot move {0} bits through an integer of that width")]
    BitCount(usize)
}

/// Options controlling compression
#[derive(Clone)]
pub struct Options {
    /// starting position in the input file
    pub in_offset: u64,
    /// starting position in the output file
    pub out_offset: u64
}

pub const STD_OPTIONS: Options = Options {
    in_offset: 0,
    out_offset: 0
};

//! Static Huffman Archives
//!
//! The archive is laid out as follows, all integers little endian:
//!
//! * 4 byte symbol count N, 1 <= N <= 256
//! * N entries of 9 bytes, the symbol and its 8 byte frequency, ascending by symbol
//! * payload of Huffman codes packed MSB first
//! * 1 byte giving the number of unused low order bits in the last payload byte
//!
//! Only the frequencies are stored.  The expander rebuilds the tree from them, which works
//! because tree construction is deterministic (see `tools::huff_tree`).
//! Compression makes two passes over the input, one to count and one to encode.

use std::fs::File;
use std::io::{Cursor,Read,Write,Seek,SeekFrom,BufReader,BufWriter,ErrorKind};
use std::path::Path;
use crate::tools::bit_io::{BitReader,BitWriter};
use crate::tools::code_table::CodeTable;
use crate::tools::freq_table::FrequencyTable;
use crate::tools::huff_tree::HuffmanTree;
use crate::{DYNERR,Error,Options,STD_OPTIONS};

/// bytes holding the symbol count
pub const HEADER_PREFIX_LEN: u64 = 4;
/// bytes per frequency table entry
pub const ENTRY_LEN: u64 = 9;
/// bytes holding the padding count
pub const TRAILER_LEN: u64 = 1;
/// most symbols a table can have
pub const MAX_SYMBOLS: u32 = 256;

const CHUNK_SIZE: usize = 4096;

/// Length of the header for a table with `symbol_count` entries,
/// which is also the offset of the payload from the start of the archive.
pub fn header_len(symbol_count: usize) -> u64 {
    HEADER_PREFIX_LEN + symbol_count as u64 * ENTRY_LEN
}

fn write_header<W: Write>(table: &FrequencyTable,writer: &mut W) -> Result<(),std::io::Error> {
    writer.write_all(&u32::to_le_bytes(table.len() as u32))?;
    for (symbol,freq) in table.iter() {
        writer.write_all(&[symbol])?;
        writer.write_all(&u64::to_le_bytes(freq))?;
    }
    Ok(())
}

/// Read the frequency table from the current position of `reader`.
/// Returns `Error::CorruptHeader` if it cannot be fully read, or `Error::EmptyArchive` if it has no entries.
pub fn read_header<R: Read>(reader: &mut R) -> Result<FrequencyTable,Error> {
    let mut count_buf: [u8;4] = [0;4];
    if let Err(e) = reader.read_exact(&mut count_buf) {
        return Err(Error::CorruptHeader(format!("failed to read table size ({})",e)));
    }
    let count = u32::from_le_bytes(count_buf);
    if count > MAX_SYMBOLS {
        return Err(Error::CorruptHeader(format!("table size {} is too large",count)));
    }
    let mut entries: Vec<(u8,u64)> = Vec::with_capacity(count as usize);
    for i in 0..count {
        let mut symbol: [u8;1] = [0];
        let mut freq: [u8;8] = [0;8];
        if let Err(e) = reader.read_exact(&mut symbol) {
            return Err(Error::CorruptHeader(format!("failed to read symbol {} of {} ({})",i+1,count,e)));
        }
        if let Err(e) = reader.read_exact(&mut freq) {
            return Err(Error::CorruptHeader(format!("failed to read frequency {} of {} ({})",i+1,count,e)));
        }
        entries.push((symbol[0],u64::from_le_bytes(freq)));
    }
    let table = FrequencyTable::from_entries(entries)?;
    if table.is_empty() {
        return Err(Error::EmptyArchive);
    }
    log::debug!("header has {} symbols totaling {} bytes",table.len(),table.total());
    Ok(table)
}

/// Second pass of compression, `table` must have come from the same input.
fn encode<R,W>(table: &FrequencyTable, expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let tree = HuffmanTree::build(table)?;
    let codes = CodeTable::build(&tree);
    log::debug!("expecting {} payload bits",codes.encoded_bits(table));
    expanded_in.seek(SeekFrom::Start(opt.in_offset))?;
    compressed_out.seek(SeekFrom::Start(opt.out_offset))?;
    let mut reader = BufReader::new(expanded_in);
    let mut writer = BufWriter::new(compressed_out);
    write_header(table,&mut writer)?;

    let mut bits = BitWriter::new(&mut writer);
    let mut in_size: u64 = 0;
    let mut buf = [0u8;CHUNK_SIZE];
    log::debug!("entering encoding loop");
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Box::new(e))
        };
        for by in &buf[0..n] {
            match codes.get(*by) {
                Some(code) => bits.write_code(code)?,
                None => return Err(Box::new(Error::InputChanged))
            }
        }
        in_size += n as u64;
    }
    if in_size != table.total() {
        return Err(Box::new(Error::InputChanged));
    }
    let payload_bits = bits.bits_written();
    let padding = bits.close()?;
    drop(bits);
    writer.write_all(&[padding])?;
    writer.flush()?;
    let out_size = header_len(table.len()) + (payload_bits + 7) / 8 + TRAILER_LEN;
    log::debug!("{} payload bits, {} padding bits",payload_bits,padding);
    Ok((in_size,out_size))
}

/// Expand the payload that follows a header for `table`, the header itself is skipped.
fn decode<R,W>(table: &FrequencyTable, compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let tree = HuffmanTree::build(table)?;
    let payload_start = opt.in_offset + header_len(table.len());
    let end = compressed_in.seek(SeekFrom::End(0))?;
    if end < payload_start + TRAILER_LEN {
        return Err(Box::new(Error::CorruptPayload("missing padding byte".to_string())));
    }
    let payload_len = end - TRAILER_LEN - payload_start;
    let mut padding: [u8;1] = [0];
    compressed_in.seek(SeekFrom::Start(end - TRAILER_LEN))?;
    compressed_in.read_exact(&mut padding)?;
    let padding = padding[0] as u64;
    if padding > 7 {
        return Err(Box::new(Error::CorruptPayload(format!("padding of {} bits",padding))));
    }
    let usable_bits = match (payload_len*8).checked_sub(padding) {
        Some(b) => b,
        None => return Err(Box::new(Error::CorruptPayload("padding exceeds payload".to_string())))
    };
    log::debug!("payload has {} bytes, {} usable bits",payload_len,usable_bits);

    compressed_in.seek(SeekFrom::Start(payload_start))?;
    expanded_out.seek(SeekFrom::Start(opt.out_offset))?;
    let mut bits = BitReader::new(BufReader::new(compressed_in.by_ref().take(payload_len)));
    let mut writer = BufWriter::new(expanded_out);
    let expected = table.total();
    let mut out_size: u64 = 0;
    let mut curs = tree.root();
    log::debug!("entering decoding loop");
    while bits.bits_read() < usable_bits {
        let bit = match bits.read_bit() {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(Box::new(Error::CorruptPayload("payload ended early".to_string())));
            },
            Err(e) => return Err(Box::new(e))
        };
        curs = tree.step(curs,bit);
        if let Some(symbol) = tree.symbol(curs) {
            if out_size == expected {
                return Err(Box::new(Error::CorruptPayload("more symbols than the table accounts for".to_string())));
            }
            writer.write_all(&[symbol])?;
            out_size += 1;
            curs = tree.root();
        }
    }
    if curs != tree.root() {
        return Err(Box::new(Error::CorruptPayload("payload ends inside a code".to_string())));
    }
    if out_size != expected {
        return Err(Box::new(Error::CorruptPayload(format!("decoded {} symbols, table accounts for {}",out_size,expected))));
    }
    writer.flush()?;
    Ok((end - opt.in_offset,out_size))
}

/// Main compression function.
/// `expanded_in` is an object with `Read` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `compressed_out` is an object with `Write` and `Seek` traits, usually `std::fs::File`, or `std::io::Cursor<Vec<u8>>`.
/// Returns (in_size,out_size) or error.  An empty input is `Error::EmptyInput`.
pub fn compress<R,W>(expanded_in: &mut R, compressed_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    expanded_in.seek(SeekFrom::Start(opt.in_offset))?;
    let table = FrequencyTable::from_reader(&mut *expanded_in)?;
    encode(&table,expanded_in,compressed_out,opt)
}

/// Main expansion function, returns (in_size,out_size) or error.
pub fn expand<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read + Seek, W: Write + Seek {
    let (in_size,out_size,_table) = expand_with_table(compressed_in,expanded_out,opt)?;
    Ok((in_size,out_size))
}

/// Same as `expand`, also returns the frequency table from the header.
pub fn expand_with_table<R,W>(compressed_in: &mut R, expanded_out: &mut W, opt: &Options) -> Result<(u64,u64,FrequencyTable),DYNERR>
where R: Read + Seek, W: Write + Seek {
    compressed_in.seek(SeekFrom::Start(opt.in_offset))?;
    let table = read_header(&mut BufReader::new(&mut *compressed_in))?;
    let (in_size,out_size) = decode(&table,compressed_in,expanded_out,opt)?;
    Ok((in_size,out_size,table))
}

fn open_input(path: &Path) -> Result<File,Error> {
    File::open(path).map_err(|source| Error::FileOpen { path: path.display().to_string(), source })
}

fn create_output(path: &Path) -> Result<File,Error> {
    File::create(path).map_err(|source| Error::FileOpen { path: path.display().to_string(), source })
}

/// Compress the file at `path_in` into a new archive at `path_out`.
/// The input is counted before the output is created, so an empty input leaves nothing behind.
/// A failure during encoding can leave a partial archive.
pub fn compress_file<P,Q>(path_in: P, path_out: Q) -> Result<(u64,u64),DYNERR>
where P: AsRef<Path>, Q: AsRef<Path> {
    let mut in_file = open_input(path_in.as_ref())?;
    let table = FrequencyTable::from_reader(&mut in_file)?;
    let mut out_file = create_output(path_out.as_ref())?;
    encode(&table,&mut in_file,&mut out_file,&STD_OPTIONS)
}

/// Expand the archive at `path_in` into `path_out`, returning (in_size,out_size,table).
/// The header is parsed before the output is created.
pub fn expand_file<P,Q>(path_in: P, path_out: Q) -> Result<(u64,u64,FrequencyTable),DYNERR>
where P: AsRef<Path>, Q: AsRef<Path> {
    let mut in_file = open_input(path_in.as_ref())?;
    let table = read_header(&mut BufReader::new(&mut in_file))?;
    let mut out_file = create_output(path_out.as_ref())?;
    let (in_size,out_size) = decode(&table,&mut in_file,&mut out_file,&STD_OPTIONS)?;
    Ok((in_size,out_size,table))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,&STD_OPTIONS)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `expand` with a slice returning a Vec
pub fn expand_slice(slice: &[u8]) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut ans,&STD_OPTIONS)?;
    Ok(ans.into_inner())
}

// *************** TESTS *****************

#[cfg(test)]
const HELLO_HEADER: &str = "08 00 00 00
    20 01 00 00 00 00 00 00 00
    64 01 00 00 00 00 00 00 00
    65 01 00 00 00 00 00 00 00
    68 01 00 00 00 00 00 00 00
    6C 03 00 00 00 00 00 00 00
    6F 02 00 00 00 00 00 00 00
    72 01 00 00 00 00 00 00 00
    77 01 00 00 00 00 00 00 00";

#[cfg(test)]
fn from_hex(s: &str) -> Vec<u8> {
    hex::decode(s.split_whitespace().collect::<String>()).unwrap()
}

#[cfg(test)]
fn error_of(result: Result<Vec<u8>,DYNERR>) -> Error {
    match result {
        Ok(_) => panic!("operation should have failed"),
        Err(e) => match e.downcast::<Error>() {
            Ok(e) => *e,
            Err(e) => panic!("unexpected error {}",e)
        }
    }
}

#[test]
fn compression_works() {
    let compressed = compress_slice("hello world".as_bytes()).expect("compression failed");
    let expected = [from_hex(HELLO_HEADER),from_hex("22 B7 3C AF 00")].concat();
    assert_eq!(compressed,expected);

    let compressed = compress_slice("abracadabra".as_bytes()).expect("compression failed");
    let expected = from_hex("05 00 00 00
        61 05 00 00 00 00 00 00 00
        62 02 00 00 00 00 00 00 00
        63 01 00 00 00 00 00 00 00
        64 01 00 00 00 00 00 00 00
        72 02 00 00 00 00 00 00 00
        6E 8A DC 01");
    assert_eq!(compressed,expected);
}

#[test]
fn single_symbol_works() {
    let compressed = compress_slice("aaaa".as_bytes()).expect("compression failed");
    assert_eq!(compressed,from_hex("01 00 00 00 61 04 00 00 00 00 00 00 00 00 04"));
    assert_eq!(expand_slice(&compressed).expect("expansion failed"),"aaaa".as_bytes().to_vec());

    let test_data = vec![b'a';1000];
    let compressed = compress_slice(&test_data).expect("compression failed");
    assert_eq!(compressed.len() as u64,header_len(1) + 125 + TRAILER_LEN);
    assert_eq!(expand_slice(&compressed).expect("expansion failed"),test_data);
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);

    let test_data = "hello world".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data.to_vec(),expanded);
}

#[test]
fn invertibility_all_bytes() {
    // many byte values with uneven counts, long enough to need several read chunks
    let test_data: Vec<u8> = (0..20000usize).map(|i| ((i*i + i/3) % 251) as u8 ^ (i % 5) as u8).collect();
    let compressed = compress_slice(&test_data).expect("compression failed");
    let expanded = expand_slice(&compressed).expect("expansion failed");
    assert_eq!(test_data,expanded);
    let two = [0u8,255u8];
    let expanded = expand_slice(&compress_slice(&two).expect("compression failed")).expect("expansion failed");
    assert_eq!(two.to_vec(),expanded);
}

#[test]
fn frequency_fidelity() {
    let test_data = "She sells sea shells by the sea shore.".as_bytes();
    let compressed = compress_slice(test_data).expect("compression failed");
    let table = read_header(&mut Cursor::new(&compressed)).expect("bad header");
    assert_eq!(table.total(),test_data.len() as u64);
    let mut src = Cursor::new(&compressed);
    let mut dst: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let (in_size,out_size,_) = expand_with_table(&mut src,&mut dst,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(in_size,compressed.len() as u64);
    assert_eq!(out_size,test_data.len() as u64);
}

#[test]
fn sizes_are_reported() {
    let test_data = "hello world".as_bytes();
    let mut src = Cursor::new(test_data);
    let mut dst: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    let (in_size,out_size) = compress(&mut src,&mut dst,&STD_OPTIONS).expect("compression failed");
    assert_eq!(in_size,11);
    assert_eq!(out_size,header_len(8) + 4 + TRAILER_LEN);
    assert_eq!(out_size,dst.into_inner().len() as u64);
}

#[test]
fn offsets_are_honored() {
    let opt = Options { in_offset: 3, out_offset: 2 };
    let test_data = "xyzthe quick brown fox".as_bytes();
    let mut src = Cursor::new(test_data);
    let mut dst: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut dst,&opt).expect("compression failed");
    let compressed = dst.into_inner();
    assert_eq!(compressed[0..2].to_vec(),vec![0,0]);
    assert_eq!(compressed[2..].to_vec(),compress_slice(&test_data[3..]).expect("compression failed"));
    let opt = Options { in_offset: 2, out_offset: 0 };
    let mut src = Cursor::new(&compressed);
    let mut dst: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    expand(&mut src,&mut dst,&opt).expect("expansion failed");
    assert_eq!(dst.into_inner(),test_data[3..].to_vec());
}

#[test]
fn empty_input() {
    assert!(matches!(error_of(compress_slice(&[])),Error::EmptyInput));
}

#[test]
fn corrupt_header() {
    // claims 5 entries but only 2 follow
    let archive = from_hex("05 00 00 00 61 05 00 00 00 00 00 00 00 62 02 00 00 00 00 00 00 00");
    assert!(matches!(error_of(expand_slice(&archive)),Error::CorruptHeader(_)));
    // frequency cut short
    assert!(matches!(error_of(expand_slice(&from_hex("01 00 00 00 61 05 00"))),Error::CorruptHeader(_)));
    // count cut short
    assert!(matches!(error_of(expand_slice(&from_hex("01 00"))),Error::CorruptHeader(_)));
    // too many symbols
    assert!(matches!(error_of(expand_slice(&from_hex("01 01 00 00"))),Error::CorruptHeader(_)));
    // symbols out of order
    let archive = from_hex("02 00 00 00 62 01 00 00 00 00 00 00 00 61 01 00 00 00 00 00 00 00 40 00");
    assert!(matches!(error_of(expand_slice(&archive)),Error::CorruptHeader(_)));
}

#[test]
fn empty_archive() {
    assert!(matches!(error_of(expand_slice(&from_hex("00 00 00 00 00"))),Error::EmptyArchive));
}

#[test]
fn corrupt_payload() {
    let good = compress_slice("hello world".as_bytes()).expect("compression failed");
    // no trailer
    let mut bad = from_hex(HELLO_HEADER);
    assert!(matches!(error_of(expand_slice(&bad)),Error::CorruptPayload(_)));
    // padding out of range
    bad = good.clone();
    *bad.last_mut().unwrap() = 8;
    assert!(matches!(error_of(expand_slice(&bad)),Error::CorruptPayload(_)));
    // padding larger than the payload
    bad = [from_hex(HELLO_HEADER),vec![3]].concat();
    assert!(matches!(error_of(expand_slice(&bad)),Error::CorruptPayload(_)));
    // payload is missing its last byte
    bad = [from_hex(HELLO_HEADER),from_hex("22 B7 3C 00")].concat();
    assert!(matches!(error_of(expand_slice(&bad)),Error::CorruptPayload(_)));
    // extra bits after the last symbol
    bad = [from_hex(HELLO_HEADER),from_hex("22 B7 3C AF 80 07")].concat();
    assert!(matches!(error_of(expand_slice(&bad)),Error::CorruptPayload(_)));
}

#[test]
fn file_functions() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let plain = dir.path().join("plain.txt");
    let packed = dir.path().join("plain.txt.huff");
    let unpacked = dir.path().join("plain_decomp.txt");
    std::fs::write(&plain,"hello world").expect("could not write");
    let (in_size,out_size) = compress_file(&plain,&packed).expect("compression failed");
    assert_eq!((in_size,out_size),(11,header_len(8) + 5));
    let (_,out_size,table) = expand_file(&packed,&unpacked).expect("expansion failed");
    assert_eq!(out_size,11);
    assert_eq!(table.get(b'l'),3);
    assert_eq!(std::fs::read(&unpacked).expect("could not read"),"hello world".as_bytes().to_vec());
}

#[test]
fn file_functions_leave_nothing_on_failure() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let empty = dir.path().join("empty.txt");
    let packed = dir.path().join("empty.txt.huff");
    std::fs::write(&empty,"").expect("could not write");
    match compress_file(&empty,&packed) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::EmptyInput))),
        Ok(_) => panic!("empty input was accepted")
    }
    assert!(!packed.exists());

    let broken = dir.path().join("broken.huff");
    let unpacked = dir.path().join("broken_decomp");
    std::fs::write(&broken,from_hex("05 00 00 00 61 05 00")).expect("could not write");
    match expand_file(&broken,&unpacked) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::CorruptHeader(_)))),
        Ok(_) => panic!("corrupt header was accepted")
    }
    assert!(!unpacked.exists());

    match compress_file(dir.path().join("missing.txt"),&packed) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::FileOpen { .. }))),
        Ok(_) => panic!("missing input was accepted")
    }
}

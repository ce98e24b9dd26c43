//! Bit streams over byte streams.
//!
//! Bits are packed MSB first, i.e., the first bit written lands in the most
//! significant free position of the current byte.  The writer reports the number
//! of unused low order bits in the final byte when it is closed, it is up to the
//! caller to record this somewhere.

use bit_vec::BitVec;
use num_traits::PrimInt;
use std::fs::File;
use std::io::{BufReader,BufWriter,Read,Write};
use std::path::Path;
use crate::{DYNERR,Error};

/// bits in one integer of type T
fn width<T: PrimInt>() -> usize {
    T::zero().count_zeros() as usize
}

fn check_width<T: PrimInt>(n: usize) -> Result<(),Error> {
    match n > width::<T>() {
        true => Err(Error::BitCount(n)),
        false => Ok(())
    }
}

/// Accumulates bits and writes whole bytes to the underlying stream.
pub struct BitWriter<W: Write> {
    inner: W,
    acc: u8,
    count: u8,
    bits_written: u64,
    closed: bool
}

impl BitWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write bits into it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self,Error> {
        let path = path.as_ref();
        match File::create(path) {
            Ok(f) => Ok(Self::new(BufWriter::new(f))),
            Err(source) => Err(Error::FileOpen { path: path.display().to_string(), source })
        }
    }
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            acc: 0,
            count: 0,
            bits_written: 0,
            closed: false
        }
    }
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }
    pub fn write_bit(&mut self,bit: bool) -> Result<(),std::io::Error> {
        self.acc = (self.acc << 1) | bit as u8;
        self.count += 1;
        self.bits_written += 1;
        self.closed = false;
        if self.count == 8 {
            self.inner.write_all(&[self.acc])?;
            self.acc = 0;
            self.count = 0;
        }
        Ok(())
    }
    /// Write the `n` least significant bits of `val`, starting with the most significant of those.
    pub fn write_bits<T: PrimInt>(&mut self,val: T,n: usize) -> Result<(),DYNERR> {
        check_width::<T>(n)?;
        for i in (0..n).rev() {
            self.write_bit((val >> i) & T::one() == T::one())?;
        }
        Ok(())
    }
    /// Write a Huffman code, first bit first.
    pub fn write_code(&mut self,code: &BitVec) -> Result<(),std::io::Error> {
        for bit in code.iter() {
            self.write_bit(bit)?;
        }
        Ok(())
    }
    /// Push out the partial byte, if any, with its bits moved to the high end, and flush.
    /// Returns the number of padding bits in the last byte (0-7).
    /// Writing can resume after this, but the new bits start a fresh byte.
    pub fn close(&mut self) -> Result<u8,std::io::Error> {
        let padding = match self.count {
            0 => 0,
            k => {
                self.inner.write_all(&[self.acc << (8 - k)])?;
                8 - k
            }
        };
        self.acc = 0;
        self.count = 0;
        self.closed = true;
        self.inner.flush()?;
        Ok(padding)
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if !self.closed && self.count > 0 {
            log::warn!("bit writer dropped with {} pending bits",self.count);
            let _ = self.close();
        }
    }
}

/// Reads bits from the underlying stream one byte at a time.
pub struct BitReader<R: Read> {
    inner: R,
    acc: u8,
    count: u8,
    bits_read: u64
}

impl BitReader<BufReader<File>> {
    /// Open the file at `path` for reading bits.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self,Error> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(f) => Ok(Self::new(BufReader::new(f))),
            Err(source) => Err(Error::FileOpen { path: path.display().to_string(), source })
        }
    }
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            acc: 0,
            count: 0,
            bits_read: 0
        }
    }
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }
    /// Get the next bit, reading a new byte when the current one is used up.
    /// Running out of bytes is an `UnexpectedEof` error.
    pub fn read_bit(&mut self) -> Result<bool,std::io::Error> {
        if self.count == 0 {
            let mut by: [u8;1] = [0];
            self.inner.read_exact(&mut by)?;
            self.acc = by[0];
            self.count = 8;
        }
        self.count -= 1;
        self.bits_read += 1;
        Ok((self.acc >> self.count) & 1 == 1)
    }
    /// Read `n` bits, the first bit read becomes the most significant bit of the result.
    pub fn read_bits<T: PrimInt>(&mut self,n: usize) -> Result<T,DYNERR> {
        check_width::<T>(n)?;
        let mut ans = T::zero();
        for _i in 0..n {
            ans = ans << 1;
            if self.read_bit()? {
                ans = ans | T::one();
            }
        }
        Ok(ans)
    }
}

#[test]
fn msb_first_packing() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    writer.write_bit(true).expect("write failed");
    writer.write_bits(0b0110u8,4).expect("write failed");
    writer.write_bits(0x1ffu16,9).expect("write failed");
    assert_eq!(writer.bits_written(),14);
    assert_eq!(writer.close().expect("close failed"),2);
    drop(writer);
    assert_eq!(buf,vec![0b1011_0111,0b1111_1100]);
}

#[test]
fn byte_aligned_close_has_no_padding() {
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    writer.write_bits(0xa5u8,8).expect("write failed");
    writer.write_bits(0x3cu8,8).expect("write failed");
    assert_eq!(writer.close().expect("close failed"),0);
    drop(writer);
    assert_eq!(buf,vec![0xa5,0x3c]);
}

#[test]
fn drop_flushes_partial_byte() {
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BitWriter::new(&mut buf);
        writer.write_bits(0b101u8,3).expect("write failed");
    }
    assert_eq!(buf,vec![0b1010_0000]);
}

#[test]
fn code_writing() {
    let mut code = BitVec::new();
    for bit in [true,true,false,true] {
        code.push(bit);
    }
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    writer.write_code(&code).expect("write failed");
    writer.write_code(&code).expect("write failed");
    writer.write_code(&code).expect("write failed");
    assert_eq!(writer.close().expect("close failed"),4);
    drop(writer);
    assert_eq!(buf,vec![0xdd,0xd0]);
}

#[test]
fn reading_bits() {
    let src: &[u8] = &[0b1011_0111,0b1111_1100];
    let mut reader = BitReader::new(src);
    assert!(reader.read_bit().expect("read failed"));
    assert_eq!(reader.read_bits::<u8>(4).expect("read failed"),0b0110);
    assert_eq!(reader.read_bits::<u16>(9).expect("read failed"),0x1ff);
    assert_eq!(reader.read_bits::<u8>(2).expect("read failed"),0);
    assert_eq!(reader.bits_read(),16);
    match reader.read_bit() {
        Err(e) => assert_eq!(e.kind(),std::io::ErrorKind::UnexpectedEof),
        Ok(_) => panic!("read past end of stream")
    }
}

#[test]
fn full_width_and_too_wide() {
    let src: &[u8] = &[0xde,0xad,0xbe,0xef];
    let mut reader = BitReader::new(src);
    assert_eq!(reader.read_bits::<u32>(32).expect("read failed"),0xdeadbeef);
    let mut buf: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut buf);
    match writer.write_bits(0u8,9) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::BitCount(9)))),
        Ok(_) => panic!("wrote 9 bits from a u8")
    }
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let path = dir.path().join("bits.bin");
    let mut writer = BitWriter::create(&path).expect("could not create");
    writer.write_bits(0x2au8,7).expect("write failed");
    assert_eq!(writer.close().expect("close failed"),1);
    drop(writer);
    let mut reader = BitReader::open(&path).expect("could not open");
    assert_eq!(reader.read_bits::<u8>(7).expect("read failed"),0x2a);
    assert!(!reader.read_bit().expect("read failed"));
}

#[test]
fn open_missing_file() {
    let dir = tempfile::tempdir().expect("no temp dir");
    match BitReader::open(dir.path().join("missing.bin")) {
        Err(Error::FileOpen { .. }) => {},
        _ => panic!("expected open failure")
    }
}

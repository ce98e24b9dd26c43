//! Symbol frequency table.
//!
//! Symbols are bytes, so the table is a fixed array of 256 counts.  Iteration is always
//! in ascending symbol order, which is also the order used in the archive header.

use std::io::{BufReader,Read,Write};
use crate::{DYNERR,Error};

const CHUNK_SIZE: usize = 4096;

#[derive(Clone,PartialEq,Eq)]
pub struct FrequencyTable {
    counts: [u64;256],
    distinct: usize
}

impl std::fmt::Debug for FrequencyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FrequencyTable {
    /// Count every byte from `src` in a single pass.
    /// Returns `Error::EmptyInput` if there are no bytes at all.
    pub fn from_reader<R: Read>(src: R) -> Result<Self,DYNERR> {
        let mut reader = BufReader::new(src);
        let mut counts = [0u64;256];
        let mut buf = [0u8;CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Box::new(e))
            };
            for by in &buf[0..n] {
                counts[*by as usize] += 1;
            }
        }
        let ans = Self::from_counts(counts);
        if ans.distinct == 0 {
            return Err(Box::new(Error::EmptyInput));
        }
        log::debug!("counted {} distinct symbols in {} bytes",ans.distinct,ans.total());
        Ok(ans)
    }
    pub fn from_slice(slice: &[u8]) -> Result<Self,DYNERR> {
        Self::from_reader(slice)
    }
    /// Build the table from (symbol,frequency) pairs, such as those stored in an archive header.
    /// Pairs must be in strictly ascending symbol order with nonzero frequencies, and the
    /// frequencies must not overflow when summed; violations are `Error::CorruptHeader`.
    pub fn from_entries<I: IntoIterator<Item=(u8,u64)>>(entries: I) -> Result<Self,Error> {
        let mut counts = [0u64;256];
        let mut prev: Option<u8> = None;
        let mut total: u64 = 0;
        for (symbol,freq) in entries {
            if let Some(p) = prev {
                if symbol <= p {
                    return Err(Error::CorruptHeader(format!("symbol {} follows symbol {}",symbol,p)));
                }
            }
            if freq == 0 {
                return Err(Error::CorruptHeader(format!("symbol {} has zero frequency",symbol)));
            }
            total = match total.checked_add(freq) {
                Some(t) => t,
                None => return Err(Error::CorruptHeader("frequency total overflows".to_string()))
            };
            counts[symbol as usize] = freq;
            prev = Some(symbol);
        }
        Ok(Self::from_counts(counts))
    }
    fn from_counts(counts: [u64;256]) -> Self {
        Self {
            distinct: counts.iter().filter(|c| **c > 0).count(),
            counts
        }
    }
    /// number of distinct symbols
    pub fn len(&self) -> usize {
        self.distinct
    }
    pub fn is_empty(&self) -> bool {
        self.distinct == 0
    }
    /// frequency of `symbol`, 0 if absent
    pub fn get(&self,symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }
    /// sum of all frequencies, i.e., length of the data that was counted
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
    /// (symbol,frequency) for every symbol present, in ascending symbol order
    pub fn iter(&self) -> impl Iterator<Item=(u8,u64)> + '_ {
        self.counts.iter()
            .enumerate()
            .filter(|(_,c)| **c > 0)
            .map(|(s,c)| (s as u8,*c))
    }
    /// Write the table as text, one `Symbol: <char>, Frequency: <count>` line per entry.
    /// The symbol is written as the raw byte.
    pub fn write_dump<W: Write>(&self,out: &mut W) -> Result<(),std::io::Error> {
        for (symbol,freq) in self.iter() {
            out.write_all(b"Symbol: ")?;
            out.write_all(&[symbol])?;
            writeln!(out,", Frequency: {}",freq)?;
        }
        Ok(())
    }
}

#[test]
fn hello_world_counts() {
    let table = FrequencyTable::from_slice("hello world".as_bytes()).expect("counting failed");
    let expected: Vec<(u8,u64)> = vec![
        (b' ',1),(b'd',1),(b'e',1),(b'h',1),(b'l',3),(b'o',2),(b'r',1),(b'w',1)
    ];
    assert_eq!(table.iter().collect::<Vec<(u8,u64)>>(),expected);
    assert_eq!(table.len(),8);
    assert_eq!(table.total(),11);
    assert_eq!(table.get(b'l'),3);
    assert_eq!(table.get(b'z'),0);
}

#[test]
fn empty_input() {
    match FrequencyTable::from_slice(&[]) {
        Err(e) => assert!(matches!(e.downcast_ref::<Error>(),Some(Error::EmptyInput))),
        Ok(_) => panic!("empty input was accepted")
    }
}

#[test]
fn read_granularity_does_not_matter() {
    // more than one chunk, and every byte value
    let data: Vec<u8> = (0..3*CHUNK_SIZE+17).map(|i| (i*7 % 256) as u8).collect();
    let whole = FrequencyTable::from_slice(&data).expect("counting failed");
    let by_byte = FrequencyTable::from_reader(std::io::Read::chain(&data[0..1],&data[1..])).expect("counting failed");
    assert_eq!(whole,by_byte);
    assert_eq!(whole.len(),256);
    assert_eq!(whole.total(),data.len() as u64);
}

#[test]
fn entries_are_validated() {
    let table = FrequencyTable::from_entries(vec![(1,5),(9,2)]).expect("valid entries rejected");
    assert_eq!(table.total(),7);
    assert!(matches!(FrequencyTable::from_entries(vec![(9,5),(1,2)]),Err(Error::CorruptHeader(_))));
    assert!(matches!(FrequencyTable::from_entries(vec![(1,5),(1,2)]),Err(Error::CorruptHeader(_))));
    assert!(matches!(FrequencyTable::from_entries(vec![(1,0)]),Err(Error::CorruptHeader(_))));
    assert!(matches!(FrequencyTable::from_entries(vec![(1,u64::MAX),(2,1)]),Err(Error::CorruptHeader(_))));
    assert!(FrequencyTable::from_entries(vec![]).expect("empty entries rejected").is_empty());
}

#[test]
fn dump_format() {
    let table = FrequencyTable::from_slice("abca\n".as_bytes()).expect("counting failed");
    let mut out: Vec<u8> = Vec::new();
    table.write_dump(&mut out).expect("dump failed");
    assert_eq!(
        String::from_utf8(out).expect("not utf8"),
        "Symbol: \n, Frequency: 1\nSymbol: a, Frequency: 2\nSymbol: b, Frequency: 1\nSymbol: c, Frequency: 1\n"
    );
}

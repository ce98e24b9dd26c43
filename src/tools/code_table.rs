//! Code table derived from a Huffman tree.
//! Each code is the path from the root to the symbol's leaf, 0 for left and 1 for right.

use bit_vec::BitVec;
use crate::tools::freq_table::FrequencyTable;
use crate::tools::huff_tree::{HuffmanTree,Node};

pub struct CodeTable {
    codes: Vec<Option<BitVec>>,
    count: usize
}

impl CodeTable {
    /// Walk the tree depth first, left branches before right branches.
    /// A tree that is a lone leaf gets the one bit code `0`, an empty code
    /// could not be recovered from the payload.
    pub fn build(tree: &HuffmanTree) -> Self {
        let mut codes: Vec<Option<BitVec>> = vec![None;256];
        let mut count = 0;
        let mut stack: Vec<(usize,BitVec)> = vec![(tree.root(),BitVec::new())];
        while let Some((idx,path)) = stack.pop() {
            match tree.node(idx) {
                Node::Leaf { symbol, .. } => {
                    let code = match path.is_empty() {
                        true => BitVec::from_elem(1,false),
                        false => path
                    };
                    codes[*symbol as usize] = Some(code);
                    count += 1;
                },
                Node::Branch { left, right, .. } => {
                    let mut rpath = path.clone();
                    rpath.push(true);
                    let mut lpath = path;
                    lpath.push(false);
                    // right goes on first so left comes off first
                    stack.push((*right,rpath));
                    stack.push((*left,lpath));
                }
            }
        }
        log::trace!("generated {} codes",count);
        Self { codes, count }
    }
    pub fn get(&self,symbol: u8) -> Option<&BitVec> {
        self.codes[symbol as usize].as_ref()
    }
    /// number of symbols with a code
    pub fn len(&self) -> usize {
        self.count
    }
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
    /// (symbol,code) in ascending symbol order
    pub fn iter(&self) -> impl Iterator<Item=(u8,&BitVec)> + '_ {
        self.codes.iter()
            .enumerate()
            .filter_map(|(s,c)| c.as_ref().map(|code| (s as u8,code)))
    }
    /// Exact number of payload bits needed to encode data with frequencies `table`.
    /// Symbols without a code are not counted.
    pub fn encoded_bits(&self,table: &FrequencyTable) -> u64 {
        table.iter()
            .filter_map(|(s,f)| self.get(s).map(|code| f * code.len() as u64))
            .sum()
    }
}

#[cfg(test)]
fn code_str(codes: &CodeTable,symbol: u8) -> String {
    codes.get(symbol).expect("missing code").iter().map(|b| if b {'1'} else {'0'}).collect()
}

#[cfg(test)]
fn is_prefix_free(codes: &CodeTable) -> bool {
    for (s1,c1) in codes.iter() {
        for (s2,c2) in codes.iter() {
            if s1 != s2 && c1.len() <= c2.len() && c1.iter().zip(c2.iter()).all(|(a,b)| a==b) {
                return false;
            }
        }
    }
    true
}

#[test]
fn hello_world_codes() {
    let table = FrequencyTable::from_slice("hello world".as_bytes()).expect("counting failed");
    let codes = CodeTable::build(&HuffmanTree::build(&table).expect("build failed"));
    assert_eq!(codes.len(),8);
    assert_eq!(code_str(&codes,b'e'),"000");
    assert_eq!(code_str(&codes,b'h'),"001");
    assert_eq!(code_str(&codes,b'r'),"010");
    assert_eq!(code_str(&codes,b'w'),"011");
    assert_eq!(code_str(&codes,b'l'),"10");
    assert_eq!(code_str(&codes,b'o'),"110");
    assert_eq!(code_str(&codes,b' '),"1110");
    assert_eq!(code_str(&codes,b'd'),"1111");
    assert!(codes.get(b'x').is_none());
    assert_eq!(codes.encoded_bits(&table),32);
    assert!(is_prefix_free(&codes));
}

#[test]
fn single_symbol_code() {
    let table = FrequencyTable::from_slice(&[b'a';1000]).expect("counting failed");
    let codes = CodeTable::build(&HuffmanTree::build(&table).expect("build failed"));
    assert_eq!(codes.len(),1);
    assert_eq!(code_str(&codes,b'a'),"0");
    assert_eq!(codes.encoded_bits(&table),1000);
}

#[test]
fn all_symbols_prefix_free() {
    // skewed frequencies over the whole alphabet
    let data: Vec<u8> = (0..256usize).flat_map(|s| std::iter::repeat(s as u8).take(1 + s*s % 37)).collect();
    let table = FrequencyTable::from_slice(&data).expect("counting failed");
    let tree = HuffmanTree::build(&table).expect("build failed");
    let codes = CodeTable::build(&tree);
    assert_eq!(tree.len(),511);
    assert_eq!(codes.len(),256);
    assert!(is_prefix_free(&codes));
    let symbols: Vec<u8> = codes.iter().map(|(s,_)| s).collect();
    assert_eq!(symbols,(0..=255u8).collect::<Vec<u8>>());
}

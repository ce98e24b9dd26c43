//! Static Huffman tree.
//!
//! Nodes live in a pool and refer to each other by index.  Leaves are created first,
//! one per symbol in ascending symbol order, then each merge appends one branch node,
//! so the root is always the last node and a table with N symbols gives 2N-1 nodes.
//!
//! The expander must rebuild exactly the tree the compressor used, from the frequencies
//! alone.  Equal frequencies are therefore resolved with a sequence number: a leaf's
//! sequence is its symbol, and the k-th branch gets 256+k.  The queue pops the smallest
//! (frequency,sequence), so on a tie leaves come out before branches, leaves in symbol
//! order, and branches in the order they were made.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use crate::tools::freq_table::FrequencyTable;
use crate::Error;

/// sequence number given to the first branch node
const FIRST_BRANCH_SEQ: u64 = 256;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Node {
    Leaf {
        symbol: u8,
        freq: u64
    },
    Branch {
        freq: u64,
        left: usize,
        right: usize
    }
}

impl Node {
    pub fn freq(&self) -> u64 {
        match self {
            Node::Leaf { freq, .. } => *freq,
            Node::Branch { freq, .. } => *freq
        }
    }
}

#[derive(Clone,Debug)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: usize
}

impl HuffmanTree {
    /// Build the tree from a frequency table, which must not be empty.
    pub fn build(table: &FrequencyTable) -> Result<Self,Error> {
        if table.is_empty() {
            return Err(Error::EmptyArchive);
        }
        let mut nodes: Vec<Node> = Vec::with_capacity(2*table.len() - 1);
        // queue items are (frequency,sequence,node index)
        let mut queue: BinaryHeap<Reverse<(u64,u64,usize)>> = BinaryHeap::new();
        for (symbol,freq) in table.iter() {
            queue.push(Reverse((freq,symbol as u64,nodes.len())));
            nodes.push(Node::Leaf { symbol, freq });
        }
        let mut seq = FIRST_BRANCH_SEQ;
        loop {
            let (lfreq,left) = match queue.pop() {
                Some(Reverse((f,_,i))) => (f,i),
                None => return Err(Error::EmptyArchive)
            };
            let (rfreq,right) = match queue.pop() {
                Some(Reverse((f,_,i))) => (f,i),
                None => {
                    // last one standing is the root
                    log::trace!("tree has {} nodes",nodes.len());
                    return Ok(Self { nodes, root: left });
                }
            };
            // frequencies come from a table whose total fits in u64
            let freq = lfreq + rfreq;
            queue.push(Reverse((freq,seq,nodes.len())));
            nodes.push(Node::Branch { freq, left, right });
            seq += 1;
        }
    }
    pub fn root(&self) -> usize {
        self.root
    }
    pub fn node(&self,idx: usize) -> &Node {
        &self.nodes[idx]
    }
    /// total number of nodes, leaves and branches
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_leaf(&self,idx: usize) -> bool {
        matches!(self.nodes[idx],Node::Leaf { .. })
    }
    /// Symbol at `idx`, or None if `idx` is a branch.
    pub fn symbol(&self,idx: usize) -> Option<u8> {
        match self.nodes[idx] {
            Node::Leaf { symbol, .. } => Some(symbol),
            Node::Branch { .. } => None
        }
    }
    /// Go down from `idx` following `bit` (false=left, true=right).
    /// A leaf has nowhere to go and returns itself, which is what makes a tree
    /// consisting of a lone leaf decode one symbol per bit.
    pub fn step(&self,idx: usize,bit: bool) -> usize {
        match self.nodes[idx] {
            Node::Leaf { .. } => idx,
            Node::Branch { left, right, .. } => match bit {
                false => left,
                true => right
            }
        }
    }
}

#[cfg(test)]
fn depth_of(tree: &HuffmanTree,symbol: u8) -> Option<usize> {
    let mut stack = vec![(tree.root(),0)];
    while let Some((idx,depth)) = stack.pop() {
        match tree.node(idx) {
            Node::Leaf { symbol: s, .. } if *s == symbol => return Some(depth),
            Node::Leaf { .. } => {},
            Node::Branch { left, right, .. } => {
                stack.push((*left,depth+1));
                stack.push((*right,depth+1));
            }
        }
    }
    None
}

#[test]
fn hello_world_shape() {
    let table = FrequencyTable::from_slice("hello world".as_bytes()).expect("counting failed");
    let tree = HuffmanTree::build(&table).expect("build failed");
    assert_eq!(tree.len(),15);
    assert_eq!(tree.root(),14);
    assert_eq!(tree.node(tree.root()).freq(),11);
    assert_eq!(depth_of(&tree,b'l'),Some(2));
    assert_eq!(depth_of(&tree,b'o'),Some(3));
    assert_eq!(depth_of(&tree,b'e'),Some(3));
    assert_eq!(depth_of(&tree,b' '),Some(4));
    assert_eq!(depth_of(&tree,b'd'),Some(4));
    // first merge pairs the two lowest symbols with frequency 1
    assert_eq!(tree.node(8),&Node::Branch { freq: 2, left: 0, right: 1 });
}

#[test]
fn rebuild_is_identical() {
    let data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let table = FrequencyTable::from_slice(data).expect("counting failed");
    let t1 = HuffmanTree::build(&table).expect("build failed");
    let stored: Vec<(u8,u64)> = table.iter().collect();
    let t2 = HuffmanTree::build(&FrequencyTable::from_entries(stored).expect("bad entries")).expect("build failed");
    assert_eq!(t1.nodes,t2.nodes);
    assert_eq!(t1.root,t2.root);
}

#[test]
fn single_leaf() {
    let table = FrequencyTable::from_slice("zzzz".as_bytes()).expect("counting failed");
    let tree = HuffmanTree::build(&table).expect("build failed");
    assert_eq!(tree.len(),1);
    assert!(tree.is_leaf(tree.root()));
    assert_eq!(tree.symbol(tree.root()),Some(b'z'));
    assert_eq!(tree.step(tree.root(),false),tree.root());
    assert_eq!(tree.step(tree.root(),true),tree.root());
}

#[test]
fn empty_table() {
    let table = FrequencyTable::from_entries(vec![]).expect("empty entries rejected");
    assert!(matches!(HuffmanTree::build(&table),Err(Error::EmptyArchive)));
}

#[test]
fn optimal_lengths() {
    // powers of two give a skewed tree with depths 1,2,3,4,4
    let table = FrequencyTable::from_entries(vec![(b'a',16),(b'b',8),(b'c',4),(b'd',2),(b'e',1)]).expect("bad entries");
    let tree = HuffmanTree::build(&table).expect("build failed");
    assert_eq!(depth_of(&tree,b'a'),Some(1));
    assert_eq!(depth_of(&tree,b'b'),Some(2));
    assert_eq!(depth_of(&tree,b'c'),Some(3));
    assert_eq!(depth_of(&tree,b'd'),Some(4));
    assert_eq!(depth_of(&tree,b'e'),Some(4));
}

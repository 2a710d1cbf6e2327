//! Static Huffman coding for SeisPEG byte streams.
//!
//! The code book is built once from one of the fixed frequency tables in
//! [`crate::tables`] and never adapts. Every encoded stream ends with the
//! end-of-data symbol (256), so the decoder needs no length prefix.
//!
//! Construction is a bottom-up merge over a binary min-heap. Ties are broken
//! by node id, which makes the code book a pure function of the table. Codes
//! are read off by walking parent links from each leaf, and a decode trie is
//! stored as an arena of nodes addressed by index.

use crate::tables::{
    DATA_FREQUENCIES, END_OF_DATA, HEADER_FREQUENCIES, HEADER_IMPROVED_FREQUENCIES, NUM_SYMBOLS,
};
use oxiseis_core::bitstream::{MsbBitReader, MsbBitWriter};
use oxiseis_core::error::{OxiSeisError, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Longest code the coder can emit.
pub const MAX_CODE_LEN: usize = 64;

/// Absent child in the decode trie.
const NONE: i32 = -1;

/// Selects one of the built-in frequency tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HuffTable {
    /// Quantized transform coefficients (the SeisPEG block coder).
    #[default]
    Data,
    /// Raw trace-header bytes.
    Header,
    /// Retuned trace-header table.
    HeaderImproved,
}

impl HuffTable {
    /// The 257-entry frequency table.
    pub fn frequencies(self) -> &'static [u32; NUM_SYMBOLS] {
        match self {
            Self::Data => &DATA_FREQUENCIES,
            Self::Header => &HEADER_FREQUENCIES,
            Self::HeaderImproved => &HEADER_IMPROVED_FREQUENCIES,
        }
    }
}

/// One node of the decode trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrieNode {
    /// Child reached by a 0 bit, or -1.
    pub left: i32,
    /// Child reached by a 1 bit, or -1.
    pub right: i32,
    /// Symbol for a leaf, -1 for an inner node.
    pub symbol: i32,
}

impl TrieNode {
    const EMPTY: TrieNode = TrieNode {
        left: NONE,
        right: NONE,
        symbol: NONE,
    };

    /// True if this node carries a symbol.
    pub fn is_leaf(&self) -> bool {
        self.symbol >= 0
    }
}

/// An immutable Huffman code book with its decode trie.
///
/// Safe to share between threads (e.g. behind an `Arc`); all mutable state
/// lives in the callers.
#[derive(Debug, Clone)]
pub struct HuffCoder {
    codes: Vec<u64>,
    lengths: Vec<u8>,
    trie: Vec<TrieNode>,
}

impl HuffCoder {
    /// Build the coder for a built-in table.
    pub fn new(table: HuffTable) -> Result<Self> {
        Self::from_frequencies(table.frequencies())
    }

    /// Build a coder from an arbitrary 257-entry frequency table.
    pub fn from_frequencies(freqs: &[u32; NUM_SYMBOLS]) -> Result<Self> {
        let total_nodes = 2 * NUM_SYMBOLS - 1;
        let mut parent = vec![NONE; total_nodes];
        let mut is_right = vec![false; total_nodes];

        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = freqs
            .iter()
            .enumerate()
            .map(|(sym, &f)| Reverse((f as u64, sym)))
            .collect();

        let mut next = NUM_SYMBOLS;
        while heap.len() > 1 {
            let (Some(Reverse((fa, a))), Some(Reverse((fb, b)))) = (heap.pop(), heap.pop()) else {
                break;
            };
            parent[a] = next as i32;
            parent[b] = next as i32;
            is_right[b] = true;
            heap.push(Reverse((fa + fb, next)));
            next += 1;
        }

        let mut codes = vec![0u64; NUM_SYMBOLS];
        let mut lengths = vec![0u8; NUM_SYMBOLS];
        for sym in 0..NUM_SYMBOLS {
            let mut code = 0u64;
            let mut depth = 0usize;
            let mut node = sym;
            while parent[node] != NONE {
                if depth >= MAX_CODE_LEN {
                    return Err(OxiSeisError::invalid_parameter(
                        "frequencies",
                        format!("code for symbol {sym} exceeds {MAX_CODE_LEN} bits"),
                    ));
                }
                if is_right[node] {
                    code |= 1u64 << depth;
                }
                depth += 1;
                node = parent[node] as usize;
            }
            codes[sym] = code;
            lengths[sym] = depth as u8;
        }

        let trie = build_trie(&codes, &lengths);
        Ok(Self {
            codes,
            lengths,
            trie,
        })
    }

    /// Code length of `symbol` in bits.
    pub fn code_length(&self, symbol: usize) -> u8 {
        self.lengths[symbol]
    }

    /// Right-aligned code bits of `symbol`.
    pub fn code(&self, symbol: usize) -> u64 {
        self.codes[symbol]
    }

    /// The decode trie; node 0 is the root.
    pub fn nodes(&self) -> &[TrieNode] {
        &self.trie
    }

    /// Exact number of bytes [`encode`](Self::encode) will produce.
    pub fn encoded_len(&self, input: &[u8]) -> usize {
        let bits: usize = input
            .iter()
            .map(|&b| self.lengths[b as usize] as usize)
            .sum::<usize>()
            + self.lengths[END_OF_DATA] as usize;
        bits.div_ceil(8)
    }

    /// Encode `input` plus the end-of-data symbol into `out`.
    ///
    /// `out` is the whole writable region. If the encoded stream does not
    /// fit, returns [`OxiSeisError::BufferTooSmall`] without touching `out`.
    pub fn encode(&self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        let needed = self.encoded_len(input);
        if needed > out.len() {
            return Err(OxiSeisError::buffer_too_small(needed, out.len()));
        }

        let mut writer = MsbBitWriter::new(&mut out[..needed]);
        for &byte in input {
            let sym = byte as usize;
            writer.write_bits(self.codes[sym], self.lengths[sym])?;
        }
        writer.write_bits(self.codes[END_OF_DATA], self.lengths[END_OF_DATA])?;
        writer.finish()
    }

    /// Decode symbols from `input` into `out` until the end-of-data symbol.
    ///
    /// Returns the number of bytes written. More than `out.len()` symbols
    /// before the terminator is reported as `BufferTooSmall`; running out of
    /// input bits is reported as `Corrupted`.
    pub fn decode(&self, input: &[u8], out: &mut [u8]) -> Result<usize> {
        let mut reader = MsbBitReader::new(input);
        let mut written = 0usize;

        loop {
            let mut node = self.trie[0];
            while !node.is_leaf() {
                let bit = reader.read_bit().ok_or_else(|| {
                    OxiSeisError::corrupted(
                        reader.bytes_consumed(),
                        "Huffman stream ended before end-of-data symbol",
                    )
                })?;
                let next = if bit { node.right } else { node.left };
                if next == NONE {
                    return Err(OxiSeisError::corrupted(
                        reader.bytes_consumed(),
                        "invalid Huffman code",
                    ));
                }
                node = self.trie[next as usize];
            }

            let symbol = node.symbol as usize;
            if symbol == END_OF_DATA {
                return Ok(written);
            }
            let slot = out
                .get_mut(written)
                .ok_or_else(|| OxiSeisError::buffer_too_small(written + 1, written))?;
            *slot = symbol as u8;
            written += 1;
        }
    }
}

/// Insert every code into an index-addressed binary trie.
fn build_trie(codes: &[u64], lengths: &[u8]) -> Vec<TrieNode> {
    let mut trie = vec![TrieNode::EMPTY];

    for (sym, (&code, &len)) in codes.iter().zip(lengths).enumerate() {
        let mut node = 0usize;
        for bit_index in (0..len).rev() {
            let bit = (code >> bit_index) & 1 == 1;
            let child = if bit { trie[node].right } else { trie[node].left };
            node = if child == NONE {
                trie.push(TrieNode::EMPTY);
                let id = trie.len() - 1;
                if bit {
                    trie[node].right = id as i32;
                } else {
                    trie[node].left = id as i32;
                }
                id
            } else {
                child as usize
            };
        }
        trie[node].symbol = sym as i32;
    }

    trie
}

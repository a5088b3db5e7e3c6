use std::collections::HashMap;

use crate::ir::{ConstData, IrError, IrGraph};

/// Name of the Const layer holding the start offset of every piece
pub const VOCAB_BEGINS: &str = "vocab.begins";
/// Name of the Const layer holding the end offset of every piece
pub const VOCAB_ENDS: &str = "vocab.ends";
/// Name of the Const layer holding the concatenated bytes of all pieces
pub const VOCAB_CHARS: &str = "vocab.chars";

/// Token pieces of one tokenizer half, indexed by token id
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pieces: Vec<Vec<u8>>,
    lookup: HashMap<Vec<u8>, u32>,
    max_piece_len: usize,
}

impl Vocabulary {
    /// Reads the `begins`/`ends`/`chars` triple out of a graph and its weights.
    pub fn from_graph(graph: &IrGraph, weights: &[u8]) -> Result<Self, IrError> {
        let begins = expect_i32(graph.const_data(VOCAB_BEGINS, weights)?, VOCAB_BEGINS)?;
        let ends = expect_i32(graph.const_data(VOCAB_ENDS, weights)?, VOCAB_ENDS)?;
        let chars = match graph.const_data(VOCAB_CHARS, weights)? {
            ConstData::U8(bytes) => bytes,
            other => {
                return Err(IrError::InvalidConst(format!(
                    "{} must be u8, found {}",
                    VOCAB_CHARS,
                    element_name(&other)
                )))
            }
        };

        if begins.len() != ends.len() {
            return Err(IrError::InvalidConst(format!(
                "{} has {} entries but {} has {}",
                VOCAB_BEGINS,
                begins.len(),
                VOCAB_ENDS,
                ends.len()
            )));
        }

        let mut pieces = Vec::with_capacity(begins.len());
        for (id, (&begin, &end)) in begins.iter().zip(ends.iter()).enumerate() {
            if begin < 0 || end < begin || end as usize > chars.len() {
                return Err(IrError::InvalidConst(format!(
                    "token {} spans {}..{} outside of {} bytes of vocabulary",
                    id,
                    begin,
                    end,
                    chars.len()
                )));
            }
            pieces.push(chars[begin as usize..end as usize].to_vec());
        }

        Ok(Self::from_pieces(pieces))
    }

    /// Builds a vocabulary from pieces already in memory.
    pub fn from_pieces(pieces: Vec<Vec<u8>>) -> Self {
        let mut lookup = HashMap::with_capacity(pieces.len());
        let mut max_piece_len = 0;
        for (id, piece) in pieces.iter().enumerate() {
            if piece.is_empty() {
                continue;
            }
            max_piece_len = max_piece_len.max(piece.len());
            // the lowest id wins for duplicated pieces
            lookup.entry(piece.clone()).or_insert(id as u32);
        }
        Self { pieces, lookup, max_piece_len }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece(&self, id: u32) -> Option<&[u8]> {
        self.pieces.get(id as usize).map(Vec::as_slice)
    }

    /// Finds the longest piece that prefixes `rest`, returning its id and byte length.
    pub fn longest_match(&self, rest: &[u8]) -> Option<(u32, usize)> {
        let longest = self.max_piece_len.min(rest.len());
        (1..=longest)
            .rev()
            .find_map(|len| self.lookup.get(&rest[..len]).map(|&id| (id, len)))
    }
}

fn expect_i32(data: ConstData, name: &str) -> Result<Vec<i32>, IrError> {
    match data {
        ConstData::I32(values) => Ok(values),
        ConstData::I64(values) => values
            .into_iter()
            .map(|v| {
                i32::try_from(v).map_err(|_| {
                    IrError::InvalidConst(format!("{} value {} overflows i32", name, v))
                })
            })
            .collect(),
        other => Err(IrError::InvalidConst(format!(
            "{} must be an integer tensor, found {}",
            name,
            element_name(&other)
        ))),
    }
}

fn element_name(data: &ConstData) -> &'static str {
    match data {
        ConstData::U8(_) => "u8",
        ConstData::I32(_) => "i32",
        ConstData::I64(_) => "i64",
        ConstData::F32(_) => "f32",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(pieces: &[&str]) -> Vocabulary {
        Vocabulary::from_pieces(pieces.iter().map(|p| p.as_bytes().to_vec()).collect())
    }

    #[test]
    fn test_longest_match_prefers_longer_piece() {
        let v = vocab(&["h", "he", "hel", "l", "o"]);
        assert_eq!(v.longest_match(b"hello"), Some((2, 3)));
        assert_eq!(v.longest_match(b"lo"), Some((3, 1)));
        assert_eq!(v.longest_match(b"x"), None);
        assert_eq!(v.longest_match(b""), None);
    }

    #[test]
    fn test_duplicates_and_empty_pieces() {
        let v = vocab(&["", "a", "a"]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.longest_match(b"a"), Some((1, 1)));
        assert_eq!(v.piece(0), Some(&b""[..]));
        assert_eq!(v.piece(3), None);
    }
}

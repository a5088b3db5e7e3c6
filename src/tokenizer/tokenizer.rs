use std::error::Error;

use tracing::info;

use super::assembler::TokenizerArtifacts;
use super::vocab::Vocabulary;
use crate::ir::IrGraph;

/// Special token ids announced in a tokenizer graph's `<rt_info>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecialTokens {
    pub bos: Option<u32>,
    pub eos: Option<u32>,
    pub unk: Option<u32>,
}

impl SpecialTokens {
    fn from_graph(graph: &IrGraph) -> Self {
        Self {
            bos: graph.rt_value("bos_token_id"),
            eos: graph.rt_value("eos_token_id"),
            unk: graph.rt_value("unk_token_id"),
        }
    }

    /// Fills ids missing here from `other`
    fn or(self, other: SpecialTokens) -> Self {
        Self {
            bos: self.bos.or(other.bos),
            eos: self.eos.or(other.eos),
            unk: self.unk.or(other.unk),
        }
    }

    fn contains(&self, id: u32) -> bool {
        self.bos == Some(id) || self.eos == Some(id) || self.unk == Some(id)
    }
}

/// A tokenizer that converts text to tokens and back, built from in-memory models
#[derive(Debug, Clone)]
pub struct Tokenizer {
    encoder: Vocabulary,
    decoder: Vocabulary,
    special: SpecialTokens,
}

impl Tokenizer {
    /// Creates a tokenizer from the encoder and decoder buffers
    pub fn from_artifacts(
        artifacts: &TokenizerArtifacts,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let encoder_graph = IrGraph::parse(&artifacts.encoder.graph)?;
        let decoder_graph = IrGraph::parse(&artifacts.decoder.graph)?;

        let encoder = Vocabulary::from_graph(&encoder_graph, artifacts.encoder.weights.data())?;
        let decoder = Vocabulary::from_graph(&decoder_graph, artifacts.decoder.weights.data())?;
        let special = SpecialTokens::from_graph(&encoder_graph)
            .or(SpecialTokens::from_graph(&decoder_graph));

        let tokenizer = Self::new(encoder, decoder, special)?;
        info!(
            "Tokenizer ready: encoder '{}', decoder '{}', {} tokens, special {:?}",
            encoder_graph.name,
            decoder_graph.name,
            tokenizer.vocab_size(),
            tokenizer.special
        );
        Ok(tokenizer)
    }

    /// Creates a tokenizer from vocabularies already in memory
    pub fn new(
        encoder: Vocabulary,
        decoder: Vocabulary,
        special: SpecialTokens,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        if encoder.is_empty() {
            return Err("Tokenizer vocabulary is empty".into());
        }
        if encoder.len() != decoder.len() {
            return Err(format!(
                "Tokenizer has {} tokens but detokenizer has {}",
                encoder.len(),
                decoder.len()
            )
            .into());
        }
        for (name, id) in [("bos", special.bos), ("eos", special.eos), ("unk", special.unk)] {
            if let Some(id) = id {
                if id as usize >= encoder.len() {
                    return Err(format!(
                        "{}_token_id {} is outside the vocabulary of {}",
                        name,
                        id,
                        encoder.len()
                    )
                    .into());
                }
            }
        }
        Ok(Self { encoder, decoder, special })
    }

    /// Converts text into token ids, prepending BOS when the tokenizer defines one
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, Box<dyn Error + Send + Sync>> {
        let bytes = text.as_bytes();
        let mut tokens = Vec::new();
        if text.is_empty() {
            return Ok(tokens);
        }
        if let Some(bos) = self.special.bos {
            tokens.push(bos);
        }

        let mut pos = 0;
        while pos < bytes.len() {
            match self.encoder.longest_match(&bytes[pos..]) {
                Some((id, len)) => {
                    tokens.push(id);
                    pos += len;
                }
                None => match self.special.unk {
                    Some(unk) => {
                        tokens.push(unk);
                        pos += utf8_width(bytes[pos]);
                    }
                    None => {
                        return Err(format!("Cannot tokenize input at byte offset {}", pos).into());
                    }
                },
            }
        }
        Ok(tokens)
    }

    /// Converts token ids back into text, skipping special tokens
    pub fn decode(&self, tokens: &[u32]) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut bytes = Vec::new();
        for &id in tokens {
            if self.special.contains(id) {
                continue;
            }
            let piece = self
                .decoder
                .piece(id)
                .ok_or_else(|| format!("Token id {} is outside the vocabulary", id))?;
            bytes.extend_from_slice(piece);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn vocab_size(&self) -> usize {
        self.encoder.len()
    }

    pub fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    /// Get the EOS (End of Sequence) token ID
    pub fn eos_token_id(&self) -> Option<u32> {
        self.special.eos
    }
}

/// Byte length of the UTF-8 sequence starting with `lead`
fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xF7 => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

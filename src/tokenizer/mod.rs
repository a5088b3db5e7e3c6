mod assembler;
mod tokenizer;
pub mod vocab;

pub use assembler::{
    load_tokenizer_artifacts, TokenizerArtifacts, DETOKENIZER_BIN, DETOKENIZER_XML, TOKENIZER_BIN,
    TOKENIZER_XML,
};
pub use tokenizer::{SpecialTokens, Tokenizer};
pub use vocab::Vocabulary;

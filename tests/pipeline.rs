mod common;

use common::*;
use encrypted_causal_lm::engine::{
    EngineError, GenerationConfig, LlmPipeline, DEFAULT_MAX_NEW_TOKENS,
};
use encrypted_causal_lm::loader::{ModelBuffers, WeightTensor};
use encrypted_causal_lm::tokenizer::{Tokenizer, TokenizerArtifacts};

fn buffers(ir: (String, Vec<u8>)) -> ModelBuffers {
    ModelBuffers { graph: ir.0, weights: WeightTensor::from_bytes(ir.1) }
}

fn tokenizer_with(decoder_pieces: &[&str]) -> Tokenizer {
    let artifacts = TokenizerArtifacts {
        encoder: buffers(tokenizer_ir("tokenizer", &PIECES, Some(EOS), Some(BOS))),
        decoder: buffers(tokenizer_ir("detokenizer", decoder_pieces, Some(EOS), Some(BOS))),
    };
    Tokenizer::from_artifacts(&artifacts).unwrap()
}

fn pipeline(transitions: &[(u32, u32)]) -> LlmPipeline {
    let model = buffers(model_ir("toy-lm", PIECES.len(), transitions, Some(EOS)));
    LlmPipeline::new(model, tokenizer_with(&PIECES), "CPU").unwrap()
}

#[test]
fn test_generate_returns_only_new_text() {
    let pipe = pipeline(&greeting_transitions());
    let text = pipe.generate("hello", &GenerationConfig::default()).unwrap();
    assert_eq!(text, " world!");
}

#[test]
fn test_generation_stops_at_eos() {
    let pipe = pipeline(&greeting_transitions());
    let result = pipe.generate_detailed("hello", &GenerationConfig::default()).unwrap();
    assert_eq!(result.tokens, vec![3, 4]);
    assert_eq!(result.prompt_tokens, 2);
    assert!(result.stopped_at_eos);
}

#[test]
fn test_new_tokens_never_exceed_the_limit() {
    let pipe = pipeline(&looping_transitions());
    for prompt in ["hello", "hello world", "a", "a a a a", "hello again!"] {
        let result = pipe.generate_detailed(prompt, &GenerationConfig::default()).unwrap();
        assert!(result.tokens.len() <= DEFAULT_MAX_NEW_TOKENS, "prompt {:?}", prompt);
        assert!(!result.text.is_empty());
    }

    let result = pipe.generate_detailed("hello", &GenerationConfig::default()).unwrap();
    assert_eq!(result.tokens.len(), 100);
    assert!(!result.stopped_at_eos);

    let short = pipe.generate_detailed("hello", &GenerationConfig::with_max_new_tokens(3)).unwrap();
    assert_eq!(short.tokens, vec![3, 5, 3]);
    assert_eq!(short.text, " world again world");
}

#[test]
fn test_decoding_uses_the_detokenizer_half() {
    let shouted: Vec<String> = PIECES.iter().map(|p| p.to_uppercase()).collect();
    let shouted: Vec<&str> = shouted.iter().map(String::as_str).collect();
    let model = buffers(model_ir("toy-lm", PIECES.len(), &greeting_transitions(), Some(EOS)));
    let pipe = LlmPipeline::new(model, tokenizer_with(&shouted), "CPU").unwrap();

    assert_eq!(pipe.generate("hello", &GenerationConfig::default()).unwrap(), " WORLD!");
}

#[test]
fn test_empty_prompt_is_an_engine_error() {
    let pipe = pipeline(&greeting_transitions());
    assert!(matches!(
        pipe.generate("", &GenerationConfig::default()),
        Err(EngineError::EmptyPrompt)
    ));
}

#[test]
fn test_untokenizable_prompt_is_an_engine_error() {
    let pipe = pipeline(&greeting_transitions());
    assert!(matches!(
        pipe.generate("xyz", &GenerationConfig::default()),
        Err(EngineError::Tokenizer(_))
    ));
}

#[test]
fn test_vocab_mismatch_is_rejected() {
    let model = buffers(model_ir("toy-lm", PIECES.len() + 1, &greeting_transitions(), Some(EOS)));
    let err = LlmPipeline::new(model, tokenizer_with(&PIECES), "CPU").err().unwrap();
    assert!(matches!(err, EngineError::InvalidModel(_)));
}

#[test]
fn test_truncated_weights_are_rejected() {
    let (xml, mut bin) = model_ir("toy-lm", PIECES.len(), &greeting_transitions(), Some(EOS));
    bin.truncate(bin.len() - 4);
    let model = buffers((xml, bin));
    assert!(matches!(
        LlmPipeline::new(model, tokenizer_with(&PIECES), "CPU"),
        Err(EngineError::InvalidModel(_))
    ));
}

#[test]
fn test_device_selection() {
    let model = || buffers(model_ir("toy-lm", PIECES.len(), &greeting_transitions(), Some(EOS)));
    assert!(matches!(
        LlmPipeline::new(model(), tokenizer_with(&PIECES), "GPU"),
        Err(EngineError::UnsupportedDevice(_))
    ));
    assert!(matches!(
        LlmPipeline::new(model(), tokenizer_with(&PIECES), "abacus"),
        Err(EngineError::UnknownDevice(_))
    ));
    assert!(LlmPipeline::new(model(), tokenizer_with(&PIECES), "cpu").is_ok());
}

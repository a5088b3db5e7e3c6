use std::sync::Arc;

use ndarray::Array2;
use tracing::{debug, info, warn};

use super::backend::{create_backend, Backend};
use super::device::Device;
use super::types::{EngineError, GenerationConfig, GenerationResult};
use crate::ir::{read_const, ConstData, ConstInfo, ElementType, IrGraph};
use crate::loader::ModelBuffers;
use crate::tokenizer::Tokenizer;

/// Preferred name of the Const layer holding next-token logits
pub const LOGITS_LAYER: &str = "logits";

/// A text generation pipeline built from in-memory model and tokenizer artifacts.
///
/// The CPU runtime executes graphs whose next-token distribution is a single
/// `f32` Const of shape `[vocab, vocab]`: row `i` holds the logits of every
/// successor of token `i`. Decoding is greedy.
pub struct LlmPipeline {
    model_name: String,
    logits: Array2<f32>,
    tokenizer: Tokenizer,
    eos_token_id: Option<u32>,
    backend: Arc<dyn Backend>,
    device: Device,
}

impl LlmPipeline {
    /// Builds the pipeline on `device` from a model graph, its weights and a tokenizer.
    pub fn new(
        model: ModelBuffers,
        tokenizer: Tokenizer,
        device: &str,
    ) -> Result<Self, EngineError> {
        let device: Device = device.parse()?;
        let backend = create_backend(device)?;

        let graph = IrGraph::parse(&model.graph)
            .map_err(|e| EngineError::InvalidModel(e.to_string()))?;
        let (layer_name, info) = find_logits_layer(&graph)?;
        let vocab = info.shape[0];
        if vocab != tokenizer.vocab_size() {
            return Err(EngineError::InvalidModel(format!(
                "model '{}' scores {} tokens but the tokenizer has {}",
                graph.name,
                vocab,
                tokenizer.vocab_size()
            )));
        }

        let values = match read_const(&layer_name, &info, model.weights.data())
            .map_err(|e| EngineError::InvalidModel(e.to_string()))?
        {
            ConstData::F32(values) => values,
            _ => return Err(EngineError::InvalidModel(format!("'{}' is not f32", layer_name))),
        };
        let logits = Array2::from_shape_vec((vocab, vocab), values)
            .map_err(|e| EngineError::InvalidModel(e.to_string()))?;

        let eos_token_id = graph.rt_value::<u32>("eos_token_id").or(tokenizer.eos_token_id());
        if let Some(eos) = eos_token_id {
            if eos as usize >= vocab {
                return Err(EngineError::InvalidModel(format!(
                    "eos_token_id {} is outside the vocabulary",
                    eos
                )));
            }
        } else {
            warn!(
                "Model '{}' defines no eos_token_id, generation only stops at max_new_tokens",
                graph.name
            );
        }

        info!(
            "Pipeline ready on {}: model '{}' (IR v{}), logits layer '{}', vocab {}",
            device, graph.name, graph.version, layer_name, vocab
        );

        Ok(Self { model_name: graph.name, logits, tokenizer, eos_token_id, backend, device })
    }

    /// Generates a continuation of `prompt` and returns only the new text.
    pub fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, EngineError> {
        self.generate_detailed(prompt, config).map(|result| result.text)
    }

    /// Generates a continuation of `prompt` and returns tokens and stop reason along with the text.
    pub fn generate_detailed(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult, EngineError> {
        let prompt_ids = self
            .tokenizer
            .encode(prompt)
            .map_err(|e| EngineError::Tokenizer(e.to_string()))?;
        let mut last = *prompt_ids.last().ok_or(EngineError::EmptyPrompt)?;
        debug!("Prompt encoded to {} tokens: {:?}", prompt_ids.len(), prompt_ids);

        let mut tokens = Vec::with_capacity(config.max_new_tokens);
        let mut stopped_at_eos = false;
        while tokens.len() < config.max_new_tokens {
            let next = self.backend.next_token(&self.logits, last)?;
            if Some(next) == self.eos_token_id {
                stopped_at_eos = true;
                break;
            }
            tokens.push(next);
            last = next;
        }

        let text = self
            .tokenizer
            .decode(&tokens)
            .map_err(|e| EngineError::Tokenizer(e.to_string()))?;
        info!(
            "Generated {} tokens with '{}' ({})",
            tokens.len(),
            self.model_name,
            if stopped_at_eos { "eos" } else { "max_new_tokens" }
        );

        Ok(GenerationResult { text, tokens, prompt_tokens: prompt_ids.len(), stopped_at_eos })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

/// Picks the logits table: the layer named [`LOGITS_LAYER`] if present,
/// else the first square rank-2 `f32` Const.
fn find_logits_layer(graph: &IrGraph) -> Result<(String, ConstInfo), EngineError> {
    let is_table = |c: &ConstInfo| {
        c.element_type == ElementType::F32 && c.shape.len() == 2 && c.shape[0] == c.shape[1]
    };

    let named = graph.constants().find(|(layer, _)| layer.name == LOGITS_LAYER);
    let (layer, info) = match named {
        Some((layer, info)) if is_table(info) => (layer, info),
        Some((layer, _)) => {
            return Err(EngineError::InvalidModel(format!(
                "'{}' must be a square f32 matrix, found {}",
                LOGITS_LAYER, layer
            )))
        }
        None => graph.constants().find(|(_, c)| is_table(*c)).ok_or_else(|| {
            EngineError::InvalidModel(format!(
                "graph '{}' has no next-token logits table",
                graph.name
            ))
        })?,
    };
    Ok((layer.name.clone(), info.clone()))
}

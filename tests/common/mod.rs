//! Builders for small model directories in the on-disk layout the CLI expects.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use encrypted_causal_lm::loader::{Decryptor, XorDecryptor};

pub const BOS: u32 = 0;
pub const EOS: u32 = 1;

/// Token pieces shared by every fixture
pub const PIECES: [&str; 8] = ["<s>", "</s>", "hello", " world", "!", " again", "a", " "];

/// hello -> " world" -> "!" -> </s>
pub fn greeting_transitions() -> Vec<(u32, u32)> {
    vec![(BOS, 2), (2, 3), (3, 4), (4, EOS), (5, 3), (6, 7), (7, 6)]
}

/// " world" and " again" chase each other forever
pub fn looping_transitions() -> Vec<(u32, u32)> {
    vec![(BOS, 2), (2, 3), (3, 5), (5, 3), (4, 3), (6, 7), (7, 6)]
}

/// Graph description plus weights for a tokenizer half
pub fn tokenizer_ir(
    name: &str,
    pieces: &[&str],
    eos: Option<u32>,
    bos: Option<u32>,
) -> (String, Vec<u8>) {
    let mut begins: Vec<u8> = Vec::new();
    let mut ends: Vec<u8> = Vec::new();
    let mut chars: Vec<u8> = Vec::new();
    for piece in pieces {
        begins.extend_from_slice(&(chars.len() as i32).to_le_bytes());
        chars.extend_from_slice(piece.as_bytes());
        ends.extend_from_slice(&(chars.len() as i32).to_le_bytes());
    }
    let vocab = pieces.len();

    let mut rt_info = String::new();
    if let Some(eos) = eos {
        rt_info.push_str(&format!("\t\t<eos_token_id value=\"{}\"/>\n", eos));
    }
    if let Some(bos) = bos {
        rt_info.push_str(&format!("\t\t<bos_token_id value=\"{}\"/>\n", bos));
    }

    let xml = format!(
        r#"<?xml version="1.0"?>
<net name="{name}" version="11">
	<layers>
		<layer id="0" name="string_input" type="Parameter" version="opset1">
			<data shape="?" element_type="string"/>
		</layer>
		<layer id="1" name="vocab.begins" type="Const" version="opset1">
			<data element_type="i32" shape="{vocab}" offset="0" size="{int_bytes}"/>
		</layer>
		<layer id="2" name="vocab.ends" type="Const" version="opset1">
			<data element_type="i32" shape="{vocab}" offset="{int_bytes}" size="{int_bytes}"/>
		</layer>
		<layer id="3" name="vocab.chars" type="Const" version="opset1">
			<data element_type="u8" shape="{nchars}" offset="{choff}" size="{nchars}"/>
		</layer>
	</layers>
	<edges/>
	<rt_info>
{rt_info}	</rt_info>
</net>
"#,
        name = name,
        vocab = vocab,
        int_bytes = vocab * 4,
        nchars = chars.len(),
        choff = vocab * 8,
        rt_info = rt_info,
    );

    let mut bin = begins;
    bin.extend_from_slice(&ends);
    bin.extend_from_slice(&chars);
    (xml, bin)
}

/// Graph description plus weights for a next-token logits table where each
/// `(from, to)` pair is the unique best successor of `from`.
pub fn model_ir(
    name: &str,
    vocab: usize,
    transitions: &[(u32, u32)],
    eos: Option<u32>,
) -> (String, Vec<u8>) {
    let mut table = vec![0f32; vocab * vocab];
    for &(from, to) in transitions {
        table[from as usize * vocab + to as usize] = 1.0;
    }
    let bin: Vec<u8> = table.iter().flat_map(|v| v.to_le_bytes()).collect();

    let rt_info = eos
        .map(|id| format!("\t\t<eos_token_id value=\"{}\"/>\n", id))
        .unwrap_or_default();
    let xml = format!(
        r#"<?xml version="1.0"?>
<net name="{name}" version="11">
	<layers>
		<layer id="0" name="input_ids" type="Parameter" version="opset1">
			<data shape="?,?" element_type="i64"/>
		</layer>
		<layer id="1" name="logits" type="Const" version="opset1">
			<data element_type="f32" shape="{vocab},{vocab}" offset="0" size="{size}"/>
		</layer>
	</layers>
	<edges/>
	<rt_info>
{rt_info}	</rt_info>
</net>
"#,
        name = name,
        vocab = vocab,
        size = bin.len(),
        rt_info = rt_info,
    );
    (xml, bin)
}

/// Writes a graph/weights pair, sealing both with `key` when given.
pub fn write_pair(dir: &Path, stem: &str, ir: &(String, Vec<u8>), key: Option<&XorDecryptor>) {
    let (xml, bin) = ir;
    let seal = |data: Vec<u8>| match key {
        Some(xor) => xor.decrypt(data).unwrap(),
        None => data,
    };
    fs::write(dir.join(format!("{}.xml", stem)), seal(xml.as_bytes().to_vec())).unwrap();
    fs::write(dir.join(format!("{}.bin", stem)), seal(bin.clone())).unwrap();
}

/// Writes all six files of a model directory.
pub fn write_model_dir(dir: &Path, transitions: &[(u32, u32)], key: Option<&XorDecryptor>) {
    let model = model_ir("toy-lm", PIECES.len(), transitions, Some(EOS));
    let encoder = tokenizer_ir("tokenizer", &PIECES, Some(EOS), Some(BOS));
    let decoder = tokenizer_ir("detokenizer", &PIECES, Some(EOS), Some(BOS));
    write_pair(dir, "openvino_model", &model, key);
    write_pair(dir, "openvino_tokenizer", &encoder, key);
    write_pair(dir, "openvino_detokenizer", &decoder, key);
}

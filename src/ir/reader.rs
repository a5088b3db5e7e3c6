use std::collections::BTreeMap;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::types::{ConstData, ConstInfo, ElementType, IrError, IrLayer};

static NET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<net\b([^>]*)>").unwrap());
static LAYER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<layer\b([^>]*?)(?:/>|>(.*?)</layer>)").unwrap());
static DATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<data\b([^>]*?)/?>").unwrap());
static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([\w.:-]+)\s*=\s*"([^"]*)""#).unwrap());
static RT_INFO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<rt_info>(.*?)</rt_info>").unwrap());
static RT_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([\w.:-]+)\s+value\s*=\s*"([^"]*)"\s*/>"#).unwrap());

/// A parsed graph description.
///
/// Only the parts needed to locate constants and model-level runtime info are
/// kept: the net header, the flat layer list and the net-level `<rt_info>`.
#[derive(Debug, Clone)]
pub struct IrGraph {
    /// Value of the `name` attribute on `<net>`
    pub name: String,
    /// IR version from the `<net>` header
    pub version: u32,
    /// All layers in document order
    pub layers: Vec<IrLayer>,
    /// Net-level runtime info entries
    pub rt_info: BTreeMap<String, String>,
}

impl IrGraph {
    /// Parses a graph description held in memory.
    pub fn parse(text: &str) -> Result<Self, IrError> {
        let header = NET_RE
            .captures(text)
            .ok_or_else(|| IrError::InvalidFormat("missing <net> element".into()))?;
        let net_attrs = parse_attributes(&header[1]);

        let name = net_attrs.get("name").cloned().unwrap_or_default();
        let version = match net_attrs.get("version") {
            Some(v) => v.parse::<u32>().map_err(|_| {
                IrError::InvalidFormat(format!("invalid net version '{}'", v))
            })?,
            None => return Err(IrError::InvalidFormat("missing net version".into())),
        };

        let mut layers = Vec::new();
        for caps in LAYER_RE.captures_iter(text) {
            let attrs = parse_attributes(&caps[1]);
            let body = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            layers.push(parse_layer(&attrs, body)?);
        }

        // Layers carry their own <rt_info> blocks, the model-level one follows </layers>
        let tail = match text.rfind("</layers>") {
            Some(pos) => &text[pos..],
            None => text,
        };
        let mut rt_info = BTreeMap::new();
        if let Some(block) = RT_INFO_RE.captures(tail) {
            for entry in RT_ENTRY_RE.captures_iter(&block[1]) {
                rt_info.insert(entry[1].to_string(), unescape(&entry[2]));
            }
        }

        debug!(
            "Parsed graph '{}' (IR v{}): {} layers, {} rt_info entries",
            name,
            version,
            layers.len(),
            rt_info.len()
        );

        Ok(Self { name, version, layers, rt_info })
    }

    /// Looks up a layer by name.
    pub fn layer(&self, name: &str) -> Result<&IrLayer, IrError> {
        self.layers
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| IrError::LayerNotFound(name.to_string()))
    }

    /// Iterates over all Const layers.
    pub fn constants(&self) -> impl Iterator<Item = (&IrLayer, &ConstInfo)> {
        self.layers
            .iter()
            .filter_map(|l| l.constant.as_ref().map(|c| (l, c)))
    }

    /// Reads a runtime info value and converts it, `None` when absent or unparsable.
    pub fn rt_value<T: FromStr>(&self, key: &str) -> Option<T> {
        self.rt_info.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Decodes the constant stored under `name` from `weights`.
    pub fn const_data(&self, name: &str, weights: &[u8]) -> Result<ConstData, IrError> {
        let layer = self.layer(name)?;
        let info = layer.constant.as_ref().ok_or_else(|| {
            IrError::InvalidConst(format!("layer '{}' is a {}, not a Const", name, layer.kind))
        })?;
        read_const(name, info, weights)
    }
}

/// Slices and decodes a constant, checking it against the weight buffer.
pub fn read_const(name: &str, info: &ConstInfo, weights: &[u8]) -> Result<ConstData, IrError> {
    let end = info
        .offset
        .checked_add(info.size)
        .filter(|&end| end <= weights.len())
        .ok_or_else(|| {
            IrError::InvalidConst(format!(
                "'{}' at offset {} with {} bytes exceeds the {}-byte weight buffer",
                name,
                info.offset,
                info.size,
                weights.len()
            ))
        })?;

    let expected = info.byte_len().ok_or_else(|| {
        IrError::InvalidConst(format!(
            "'{}' has shape {:?} of {} whose byte size overflows",
            name, info.shape, info.element_type
        ))
    })?;
    if expected != info.size {
        return Err(IrError::InvalidConst(format!(
            "'{}' declares {} bytes but shape {:?} of {} needs {}",
            name, info.size, info.shape, info.element_type, expected
        )));
    }

    let bytes = &weights[info.offset..end];
    let count = expected / info.element_type.size();
    let data = match info.element_type {
        ElementType::U8 => ConstData::U8(bytes.to_vec()),
        ElementType::I32 => {
            let mut out = vec![0i32; count];
            LittleEndian::read_i32_into(bytes, &mut out);
            ConstData::I32(out)
        }
        ElementType::I64 => {
            let mut out = vec![0i64; count];
            LittleEndian::read_i64_into(bytes, &mut out);
            ConstData::I64(out)
        }
        ElementType::F32 => {
            let mut out = vec![0f32; count];
            LittleEndian::read_f32_into(bytes, &mut out);
            ConstData::F32(out)
        }
    };
    Ok(data)
}

fn parse_layer(attrs: &BTreeMap<String, String>, body: &str) -> Result<IrLayer, IrError> {
    let id = attrs
        .get("id")
        .ok_or_else(|| IrError::InvalidFormat("layer without id".into()))?
        .parse::<u64>()
        .map_err(|_| IrError::InvalidFormat(format!("invalid layer id in {:?}", attrs)))?;
    let name = attrs.get("name").cloned().unwrap_or_default();
    let kind = attrs
        .get("type")
        .cloned()
        .ok_or_else(|| IrError::InvalidFormat(format!("layer {} has no type", id)))?;

    let constant = if kind == "Const" {
        let data = DATA_RE.captures(body).ok_or_else(|| {
            IrError::InvalidFormat(format!("Const layer '{}' has no <data> element", name))
        })?;
        Some(parse_const_info(&name, &parse_attributes(&data[1]))?)
    } else {
        None
    };

    Ok(IrLayer { id, name, kind, constant })
}

fn parse_const_info(name: &str, data: &BTreeMap<String, String>) -> Result<ConstInfo, IrError> {
    let field = |key: &str| {
        data.get(key).ok_or_else(|| {
            IrError::InvalidFormat(format!("Const layer '{}' is missing '{}'", name, key))
        })
    };
    let number = |key: &str| -> Result<usize, IrError> {
        field(key)?.trim().parse::<usize>().map_err(|_| {
            IrError::InvalidFormat(format!("Const layer '{}' has a non-numeric '{}'", name, key))
        })
    };

    let element_type = ElementType::parse(field("element_type")?)?;
    let shape = parse_shape(name, field("shape")?)?;
    Ok(ConstInfo { element_type, shape, offset: number("offset")?, size: number("size")? })
}

fn parse_shape(name: &str, text: &str) -> Result<Vec<usize>, IrError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(|d| {
            d.trim().parse::<usize>().map_err(|_| {
                IrError::InvalidFormat(format!(
                    "Const layer '{}' has dynamic or bad dim '{}'",
                    name, d
                ))
            })
        })
        .collect()
}

fn parse_attributes(text: &str) -> BTreeMap<String, String> {
    ATTR_RE
        .captures_iter(text)
        .map(|c| (c[1].to_string(), unescape(&c[2])))
        .collect()
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

//! Contract ABI handling
//!
//! Loads a Solidity JSON ABI, computes function selectors and encodes /
//! decodes call data for the subset of types the ledger contract uses:
//! `uintN`, `address`, `bool`, `string`, `bytes`, `bytesN` and tuples of
//! those. Arrays are not supported.

use serde::Deserialize;
use sha3::{Digest, Keccak256};

use super::address::Address;

const WORD: usize = 32;

/// ABI errors
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("Invalid ABI JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported ABI type: {0}")]
    UnsupportedType(String),

    #[error("Function not found in ABI: {0}")]
    MissingFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {position} of {function} is not a {expected}")]
    ArgumentType {
        function: String,
        position: usize,
        expected: String,
    },

    #[error("Return data truncated at offset {offset} (length {len})")]
    Truncated { offset: usize, len: usize },

    #[error("Integer value does not fit")]
    Overflow,

    #[error("String value is not valid UTF-8")]
    Utf8,

    #[error("Invalid hex data: {0}")]
    Hex(#[from] hex::FromHexError),
}

// ============================================================================
// Types
// ============================================================================

/// Parameter type of a function input or output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Uint(usize),
    Address,
    Bool,
    String,
    Bytes,
    FixedBytes(usize),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Bytes => true,
            ParamType::Tuple(members) => members.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head section
    fn head_size(&self) -> usize {
        match self {
            ParamType::Tuple(members) if !self.is_dynamic() => {
                members.iter().map(ParamType::head_size).sum()
            }
            _ => WORD,
        }
    }

    /// Canonical type name used in signatures
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Uint(bits) => format!("uint{}", bits),
            ParamType::Address => "address".to_string(),
            ParamType::Bool => "bool".to_string(),
            ParamType::String => "string".to_string(),
            ParamType::Bytes => "bytes".to_string(),
            ParamType::FixedBytes(n) => format!("bytes{}", n),
            ParamType::Tuple(members) => format!(
                "({})",
                members
                    .iter()
                    .map(ParamType::canonical)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }

    fn from_param(param: &RawParam) -> Result<Self, AbiError> {
        let kind = param.kind.as_str();
        let unsupported = || AbiError::UnsupportedType(kind.to_string());

        if kind.ends_with(']') {
            return Err(unsupported());
        }

        match kind {
            "tuple" => Ok(ParamType::Tuple(
                param
                    .components
                    .iter()
                    .map(ParamType::from_param)
                    .collect::<Result<_, _>>()?,
            )),
            "address" => Ok(ParamType::Address),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::String),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            _ => {
                if let Some(bits) = kind.strip_prefix("uint") {
                    let bits: usize = bits.parse().map_err(|_| unsupported())?;
                    if bits == 0 || bits > 256 || bits % 8 != 0 {
                        return Err(unsupported());
                    }
                    Ok(ParamType::Uint(bits))
                } else if let Some(size) = kind.strip_prefix("bytes") {
                    let size: usize = size.parse().map_err(|_| unsupported())?;
                    if size == 0 || size > WORD {
                        return Err(unsupported());
                    }
                    Ok(ParamType::FixedBytes(size))
                } else {
                    Err(unsupported())
                }
            }
        }
    }
}

/// A decoded or to-be-encoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Tuple(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Bytes(_) => true,
            Token::Tuple(members) => members.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            Token::Tuple(members) if !self.is_dynamic() => members.iter().map(Token::head_size).sum(),
            _ => WORD,
        }
    }

    fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Token::Uint(_), ParamType::Uint(_))
            | (Token::Address(_), ParamType::Address)
            | (Token::Bool(_), ParamType::Bool)
            | (Token::String(_), ParamType::String)
            | (Token::Bytes(_), ParamType::Bytes) => true,
            (Token::FixedBytes(b), ParamType::FixedBytes(n)) => b.len() == *n,
            (Token::Tuple(values), ParamType::Tuple(types)) => {
                values.len() == types.len()
                    && values.iter().zip(types).all(|(v, t)| v.matches(t))
            }
            _ => false,
        }
    }

    pub fn into_uint(self) -> Option<u128> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }
}

// ============================================================================
// ABI document
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default)]
    state_mutability: Option<String>,
}

fn default_entry_type() -> String {
    "function".to_string()
}

/// A callable contract function
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
    pub state_mutability: Option<String>,
}

impl Function {
    /// `name(type1,type2)`
    pub fn signature(&self) -> String {
        format!(
            "{}({})",
            self.name,
            self.inputs
                .iter()
                .map(ParamType::canonical)
                .collect::<Vec<_>>()
                .join(",")
        )
    }

    pub fn selector(&self) -> [u8; 4] {
        let digest = Keccak256::digest(self.signature().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    /// Selector followed by the encoded arguments
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCount {
                function: self.signature(),
                expected: self.inputs.len(),
                actual: args.len(),
            });
        }
        for (position, (arg, ty)) in args.iter().zip(&self.inputs).enumerate() {
            if !arg.matches(ty) {
                return Err(AbiError::ArgumentType {
                    function: self.signature(),
                    position,
                    expected: ty.canonical(),
                });
            }
        }

        let mut data = self.selector().to_vec();
        data.extend(encode(args));
        Ok(data)
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        decode(&self.outputs, data)
    }
}

/// Parsed contract interface
#[derive(Debug, Clone)]
pub struct ContractAbi {
    functions: Vec<Function>,
}

impl ContractAbi {
    /// Parse a JSON ABI.
    ///
    /// Accepts either the bare ABI array or a compiler artifact object that
    /// carries it under `"abi"`. Entries using unsupported types are skipped.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let entries = match value {
            serde_json::Value::Object(mut artifact) if artifact.contains_key("abi") => {
                artifact.remove("abi").unwrap_or_default()
            }
            other => other,
        };
        let entries: Vec<RawEntry> = serde_json::from_value(entries)?;

        let mut functions = Vec::new();
        for entry in entries.into_iter().filter(|e| e.kind == "function") {
            let Some(name) = entry.name else { continue };
            let parsed = entry
                .inputs
                .iter()
                .map(ParamType::from_param)
                .collect::<Result<Vec<_>, _>>()
                .and_then(|inputs| {
                    let outputs = entry
                        .outputs
                        .iter()
                        .map(ParamType::from_param)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok((inputs, outputs))
                });

            match parsed {
                Ok((inputs, outputs)) => functions.push(Function {
                    name,
                    inputs,
                    outputs,
                    state_mutability: entry.state_mutability,
                }),
                Err(e) => tracing::debug!(function = %name, error = %e, "Skipping ABI entry"),
            }
        }

        Ok(Self { functions })
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Find a function by name and exact input types
    pub fn function(&self, name: &str, inputs: &[ParamType]) -> Result<&Function, AbiError> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.inputs == inputs)
            .ok_or_else(|| {
                let wanted = Function {
                    name: name.to_string(),
                    inputs: inputs.to_vec(),
                    outputs: Vec::new(),
                    state_mutability: None,
                };
                AbiError::MissingFunction(wanted.signature())
            })
    }
}

// ============================================================================
// Encoding
// ============================================================================

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = uint_word(bytes.len() as u128).to_vec();
    out.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(padding));
    out
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(v) => uint_word(*v).to_vec(),
        Token::Bool(b) => uint_word(*b as u128).to_vec(),
        Token::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_bytes());
            word.to_vec()
        }
        Token::FixedBytes(bytes) => {
            let mut word = [0u8; WORD];
            word[..bytes.len()].copy_from_slice(bytes);
            word.to_vec()
        }
        Token::String(s) => encode_packed_bytes(s.as_bytes()),
        Token::Bytes(b) => encode_packed_bytes(b),
        Token::Tuple(members) => encode(members),
    }
}

/// Head/tail encode a sequence of values
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens.iter().map(Token::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }

    head.extend(tail);
    head
}

// ============================================================================
// Decoding
// ============================================================================

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or(AbiError::Truncated {
            offset,
            len: data.len(),
        })
}

fn uint_at(data: &[u8], offset: usize) -> Result<u128, AbiError> {
    let word = word_at(data, offset)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn usize_at(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    usize::try_from(uint_at(data, offset)?).map_err(|_| AbiError::Overflow)
}

fn packed_bytes_at(data: &[u8], offset: usize) -> Result<Vec<u8>, AbiError> {
    let len = usize_at(data, offset)?;
    let start = offset + WORD;
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .map(<[u8]>::to_vec)
        .ok_or(AbiError::Truncated {
            offset: start,
            len: data.len(),
        })
}

fn decode_value(ty: &ParamType, data: &[u8], offset: usize) -> Result<Token, AbiError> {
    match ty {
        ParamType::Uint(_) => Ok(Token::Uint(uint_at(data, offset)?)),
        ParamType::Bool => Ok(Token::Bool(word_at(data, offset)?[WORD - 1] != 0)),
        ParamType::Address => {
            let word = word_at(data, offset)?;
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address(bytes)))
        }
        ParamType::FixedBytes(n) => Ok(Token::FixedBytes(word_at(data, offset)?[..*n].to_vec())),
        ParamType::Bytes => Ok(Token::Bytes(packed_bytes_at(data, offset)?)),
        ParamType::String => {
            let bytes = packed_bytes_at(data, offset)?;
            String::from_utf8(bytes)
                .map(Token::String)
                .map_err(|_| AbiError::Utf8)
        }
        ParamType::Tuple(members) => Ok(Token::Tuple(decode_from(members, data, offset)?)),
    }
}

fn decode_from(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut cursor = base;
    let mut tokens = Vec::with_capacity(types.len());

    for ty in types {
        if ty.is_dynamic() {
            let relative = usize_at(data, cursor)?;
            let target = base.checked_add(relative).ok_or(AbiError::Overflow)?;
            tokens.push(decode_value(ty, data, target)?);
        } else {
            tokens.push(decode_value(ty, data, cursor)?);
        }
        cursor += ty.head_size();
    }

    Ok(tokens)
}

/// Decode a sequence of values laid out as function return data
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_from(types, data, 0)
}

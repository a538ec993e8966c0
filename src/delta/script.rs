// Diff scripts and their text payload.
//
// Payload format: a bracketed list where every element is followed by a
// comma. Literals are JSON-quoted strings; a copy is two bare integers,
// offset then length, both counted in characters of the base text:
//
//   [3,3,"ghi",0,3,]
//
// The full-content fallback is a one-element list without the trailing
// comma: `["...content..."]`. Both forms parse back into a `DiffScript`.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Ops
// ---------------------------------------------------------------------------

/// One step of a diff script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// Emit these characters verbatim.
    Literal(String),
    /// Emit `len` characters of the base text starting at `offset`.
    Copy { offset: usize, len: usize },
}

/// An ordered sequence of diff ops turning a base text into a target text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffScript {
    ops: Vec<DiffOp>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not a bracketed list")]
    NotAList,
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected payload element at position {0}")]
    UnexpectedElement(usize),
    #[error("copy offset at position {0} has no length")]
    DanglingOffset(usize),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("copy [{offset}, {offset}+{len}) is outside a base of {base_len} characters")]
    CopyOutOfRange {
        offset: usize,
        len: usize,
        base_len: usize,
    },
}

// ---------------------------------------------------------------------------
// DiffScript
// ---------------------------------------------------------------------------

impl DiffScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: Vec<DiffOp>) -> Self {
        Self { ops }
    }

    /// Script that ignores the base and yields `content`.
    pub fn full_content(content: &str) -> Self {
        Self {
            ops: vec![DiffOp::Literal(content.to_string())],
        }
    }

    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DiffOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn push_literal(&mut self, text: String) {
        if !text.is_empty() {
            self.ops.push(DiffOp::Literal(text));
        }
    }

    pub fn push_copy(&mut self, offset: usize, len: usize) {
        self.ops.push(DiffOp::Copy { offset, len });
    }

    /// Serialize to the comma-terminated payload form.
    pub fn to_payload(&self) -> String {
        let mut out = String::from("[");
        for op in &self.ops {
            match op {
                DiffOp::Literal(text) => {
                    out.push_str(&quote(text));
                    out.push(',');
                }
                DiffOp::Copy { offset, len } => {
                    out.push_str(&format!("{offset},{len},"));
                }
            }
        }
        out.push(']');
        out
    }

    /// Parse a payload produced by `to_payload` or `full_content_payload`.
    pub fn from_payload(payload: &str) -> Result<Self, PayloadError> {
        let trimmed = payload.trim();
        if !trimmed.starts_with('[') || !trimmed.ends_with(']') {
            return Err(PayloadError::NotAList);
        }
        // Drop the terminating comma so the list is plain JSON.
        let body = trimmed[..trimmed.len() - 1].trim_end();
        let json = match body.strip_suffix(',') {
            Some(head) => format!("{head}]"),
            None => format!("{body}]"),
        };
        let values: Vec<Value> = serde_json::from_str(&json)?;

        let mut ops = Vec::new();
        let mut iter = values.into_iter().enumerate();
        while let Some((pos, value)) = iter.next() {
            match value {
                Value::String(text) => ops.push(DiffOp::Literal(text)),
                Value::Number(n) => {
                    let offset = as_index(&n).ok_or(PayloadError::UnexpectedElement(pos))?;
                    let len = match iter.next() {
                        Some((_, Value::Number(m))) => {
                            as_index(&m).ok_or(PayloadError::UnexpectedElement(pos + 1))?
                        }
                        Some((p, _)) => return Err(PayloadError::UnexpectedElement(p)),
                        None => return Err(PayloadError::DanglingOffset(pos)),
                    };
                    ops.push(DiffOp::Copy { offset, len });
                }
                _ => return Err(PayloadError::UnexpectedElement(pos)),
            }
        }
        Ok(Self { ops })
    }

    /// Rebuild the target text from `base`.
    pub fn apply(&self, base: &str) -> Result<String, ApplyError> {
        let base: Vec<char> = base.chars().collect();
        let mut out = String::new();
        for op in &self.ops {
            match op {
                DiffOp::Literal(text) => out.push_str(text),
                DiffOp::Copy { offset, len } => {
                    let end = offset.checked_add(*len).filter(|&e| e <= base.len());
                    let Some(end) = end else {
                        return Err(ApplyError::CopyOutOfRange {
                            offset: *offset,
                            len: *len,
                            base_len: base.len(),
                        });
                    };
                    out.extend(&base[*offset..end]);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for DiffScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_payload())
    }
}

/// The payload sent when a requested delta is unavailable.
pub fn full_content_payload(content: &str) -> String {
    format!("[{}]", quote(content))
}

/// JSON string quoting.
pub fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

fn as_index(n: &serde_json::Number) -> Option<usize> {
    n.as_u64().and_then(|v| usize::try_from(v).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

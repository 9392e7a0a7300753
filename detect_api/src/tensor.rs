use serde_json::{json, Value};

/// Raw inference output: the shape reported by the backend plus the flat
/// FP32 payload. The gateway never validates the schema; callers decide
/// how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// Iterates predictions by chunking the payload along the last axis.
    /// A missing or empty shape treats the whole payload as a single row.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        let row_len = self
            .shape
            .last()
            .copied()
            .unwrap_or(self.data.len())
            .max(1);
        self.data.chunks_exact(row_len)
    }

    /// Renders the values as nested numeric sequences following the
    /// reported shape, matching what the backend claims it sent.
    pub fn to_json(&self) -> Value {
        nest(&self.shape, &self.data)
    }
}

fn nest(shape: &[usize], data: &[f32]) -> Value {
    match shape.split_first() {
        None | Some((_, [])) => Value::Array(data.iter().map(|v| json!(v)).collect()),
        Some((&outer, inner)) => {
            let stride: usize = inner.iter().product();
            if stride == 0 || outer * stride != data.len() {
                // Shape does not describe the payload; fall back to the
                // flat values rather than dropping or inventing numbers.
                return Value::Array(data.iter().map(|v| json!(v)).collect());
            }
            Value::Array(data.chunks(stride).map(|chunk| nest(inner, chunk)).collect())
        }
    }
}

//! JSON persistence for trained models (feature `serde`).
//!
//! A versioned JSON format holding the three dense layers' parameters. Scratch
//! buffers and caches are not persisted; the batch capacity is chosen again at
//! load time.
//!
//! Deserialization validates dimensions, parameter lengths, and that all
//! parameters are finite.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Dense, Error, Mlp, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMlp {
    pub format_version: u32,
    /// `fc1`, `fc2`, `fc3` in chain order.
    pub layers: Vec<SerializedDense>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedDense {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major (out_dim, in_dim).
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl SerializedMlp {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "model format_version {} is not supported (this build reads {MODEL_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.layers.len() != 3 {
            return Err(Error::InvalidData(format!(
                "serialized model must have 3 layers, got {}",
                self.layers.len()
            )));
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[1].in_dim != pair[0].out_dim {
                return Err(Error::InvalidData(format!(
                    "layer {} in_dim {} does not match previous out_dim {}",
                    i + 1,
                    pair[1].in_dim,
                    pair[0].out_dim
                )));
            }
        }
        Ok(())
    }

    /// Rebuild a trainable model with buffers sized for `max_batch` columns.
    pub fn into_mlp(self, max_batch: usize) -> Result<Mlp> {
        self.validate()?;

        let mut layers = Vec::with_capacity(3);
        for (i, l) in self.layers.into_iter().enumerate() {
            // Dense::from_parts checks lengths and finiteness.
            let dense = Dense::from_parts(l.in_dim, l.out_dim, max_batch, l.weights, l.biases)
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            layers.push(dense);
        }

        let mut layers = layers.into_iter();
        match (layers.next(), layers.next(), layers.next()) {
            (Some(fc1), Some(fc2), Some(fc3)) => Mlp::from_layers(fc1, fc2, fc3),
            _ => Err(Error::InvalidData(
                "serialized model must have 3 layers".to_owned(),
            )),
        }
    }
}

impl From<&Mlp> for SerializedMlp {
    fn from(model: &Mlp) -> Self {
        let layers = (0..model.num_layers())
            .filter_map(|i| model.layer(i))
            .map(SerializedDense::from)
            .collect();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            layers,
        }
    }
}

impl From<&Dense> for SerializedDense {
    fn from(layer: &Dense) -> Self {
        Self {
            in_dim: layer.in_dim(),
            out_dim: layer.out_dim(),
            weights: layer.weights().as_slice().to_vec(),
            biases: layer.biases().as_slice().to_vec(),
        }
    }
}

fn json_error(context: &str, e: serde_json::Error) -> Error {
    Error::InvalidData(format!("{context}: {e}"))
}

impl Mlp {
    /// Parameters as a [`SerializedMlp`] snapshot.
    pub fn to_serialized(&self) -> SerializedMlp {
        SerializedMlp::from(self)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_serialized())
            .map_err(|e| json_error("encoding model", e))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.to_serialized()).map_err(|e| json_error("encoding model", e))
    }

    /// Parse a model, sizing its buffers for `max_batch` columns.
    pub fn from_json_str(s: &str, max_batch: usize) -> Result<Self> {
        let ser: SerializedMlp =
            serde_json::from_str(s).map_err(|e| json_error("decoding model", e))?;
        ser.into_mlp(max_batch)
    }

    /// Write pretty-printed JSON to `path`, replacing any existing file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| io_error("create", path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_serialized())
            .map_err(|e| json_error("encoding model", e))?;
        writer.flush().map_err(|e| io_error("flush", path, e))?;
        log::info!("saved model to {}", path.display());
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P, max_batch: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_error("open", path, e))?;
        let ser: SerializedMlp = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| json_error("decoding model", e))?;
        let mlp = ser.into_mlp(max_batch)?;
        log::debug!("loaded model from {}", path.display());
        Ok(mlp)
    }
}

fn io_error(op: &str, path: &Path, e: std::io::Error) -> Error {
    Error::InvalidData(format!("cannot {op} {}: {e}", path.display()))
}

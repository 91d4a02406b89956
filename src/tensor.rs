//! Host tensors with a device tag
//!
//! Request batches are flat sequences of indices, offsets and per-sample
//! weights. They live in host memory; the [`Device`] tag records where the
//! consumer expects them. [`Tensor::to`] is the (blocking) placement step: the
//! value is ready as soon as it returns.
//!
//! Fixture tensors are stored as `bincode`-encoded [`TensorBlob`] values so a
//! generated batch can be saved once and replayed through override mode.

use crate::error::ConfigError;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

/// Target device for request tensors and the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Cpu,
    Cuda(u32),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl FromStr for Device {
    type Err = ConfigError;

    /// Accepts `cpu*`, `cuda` and `cuda:<ordinal>`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("cpu") {
            return Ok(Device::Cpu);
        }
        if let Some(rest) = s.strip_prefix("cuda") {
            if rest.is_empty() {
                return Ok(Device::Cuda(0));
            }
            return rest
                .strip_prefix(':')
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| ConfigError::UnknownDevice(s.to_string()));
        }
        Err(ConfigError::UnknownDevice(s.to_string()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
        }
    }
}

/// Dense tensor stored row-major in host memory
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: Vec<T>,
    shape: Vec<usize>,
    device: Device,
}

impl<T> Tensor<T> {
    /// 1-D tensor on the host
    pub fn from_vec(data: Vec<T>) -> Self {
        let shape = vec![data.len()];
        Self {
            data,
            shape,
            device: Device::Cpu,
        }
    }

    /// Tensor with an explicit shape
    pub fn with_shape(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            anyhow::bail!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            );
        }
        Ok(Self {
            data,
            shape,
            device: Device::Cpu,
        })
    }

    /// Place the tensor on `device`
    pub fn to(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Concatenate 1-D tensors in order
    ///
    /// The result lives on the device of the first part (host when empty).
    pub fn cat(parts: Vec<Tensor<T>>) -> Self {
        let device = parts.first().map(|t| t.device).unwrap_or_default();
        let total = parts.iter().map(|t| t.data.len()).sum();
        let mut data = Vec::with_capacity(total);
        for part in parts {
            data.extend(part.data);
        }
        Tensor::from_vec(data).to(device)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl Tensor<f32> {
    /// Tensor of ones with the same shape and device
    pub fn ones_like(&self) -> Self {
        Self {
            data: vec![1.0; self.data.len()],
            shape: self.shape.clone(),
            device: self.device,
        }
    }
}

/// On-disk tensor representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TensorBlob {
    I64 { shape: Vec<usize>, data: Vec<i64> },
    F32 { shape: Vec<usize>, data: Vec<f32> },
}

impl TensorBlob {
    fn kind(&self) -> &'static str {
        match self {
            TensorBlob::I64 { .. } => "i64",
            TensorBlob::F32 { .. } => "f32",
        }
    }
}

/// Element types that can be stored in a [`TensorBlob`]
pub trait BlobElement: Sized + Clone {
    const KIND: &'static str;

    fn to_blob(tensor: &Tensor<Self>) -> TensorBlob;

    fn from_blob(blob: TensorBlob) -> Option<(Vec<usize>, Vec<Self>)>;
}

impl BlobElement for i64 {
    const KIND: &'static str = "i64";

    fn to_blob(tensor: &Tensor<Self>) -> TensorBlob {
        TensorBlob::I64 {
            shape: tensor.shape.clone(),
            data: tensor.data.clone(),
        }
    }

    fn from_blob(blob: TensorBlob) -> Option<(Vec<usize>, Vec<Self>)> {
        match blob {
            TensorBlob::I64 { shape, data } => Some((shape, data)),
            TensorBlob::F32 { .. } => None,
        }
    }
}

impl BlobElement for f32 {
    const KIND: &'static str = "f32";

    fn to_blob(tensor: &Tensor<Self>) -> TensorBlob {
        TensorBlob::F32 {
            shape: tensor.shape.clone(),
            data: tensor.data.clone(),
        }
    }

    fn from_blob(blob: TensorBlob) -> Option<(Vec<usize>, Vec<Self>)> {
        match blob {
            TensorBlob::F32 { shape, data } => Some((shape, data)),
            TensorBlob::I64 { .. } => None,
        }
    }
}

/// Write a tensor blob to `path`
pub fn save_tensor<T: BlobElement>(path: &Path, tensor: &Tensor<T>) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create tensor file: {}", path.display()))?;
    bincode::serialize_into(BufWriter::new(file), &T::to_blob(tensor))
        .with_context(|| format!("Failed to write tensor file: {}", path.display()))?;
    Ok(())
}

/// Load a tensor blob from `path` and place it on `device`
pub fn load_tensor<T: BlobElement>(path: &Path, device: Device) -> Result<Tensor<T>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open tensor file: {}", path.display()))?;
    let blob: TensorBlob = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("Failed to decode tensor file: {}", path.display()))?;

    let found = blob.kind();
    let (shape, data) = T::from_blob(blob).ok_or_else(|| {
        anyhow::anyhow!(
            "Tensor file {} holds {} data, expected {}",
            path.display(),
            found,
            T::KIND
        )
    })?;

    Ok(Tensor::with_shape(data, shape)?.to(device))
}

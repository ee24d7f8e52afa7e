//! Gala Processing Library
//!
//! Face detection and embedding extraction for the photo indexing pipeline.
//! The default `onnx` feature ships an ONNX Runtime engine (SCRFD detection,
//! ArcFace embeddings); everything else talks to it through [`FaceExtractor`].

pub mod face;

#[cfg(feature = "onnx")]
pub use face::{FaceEngineConfig, OnnxFaceEngine};
pub use face::{DetectedFace, FaceEngineHandle, FaceExtractor};

//! Face detection and recognition
//!
//! The extractor trait is the seam between the indexing pipeline and the
//! model runtime; the ONNX engine behind the `onnx` feature is the production
//! implementation.

mod detect;
#[cfg(feature = "onnx")]
mod engine;
mod extractor;

#[cfg(feature = "onnx")]
pub use engine::{FaceEngineConfig, OnnxFaceEngine};
pub use extractor::{DetectedFace, FaceEngineHandle, FaceExtractor};

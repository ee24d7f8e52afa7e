//! Face extraction seam
//!
//! [`FaceExtractor`] is the boundary between the indexing pipeline and the
//! model runtime. Extraction is infallible by contract: undecodable photos,
//! inference errors, and timeouts are all reported as zero faces, so one bad
//! photo can never wedge an upload batch.

use async_trait::async_trait;
use gala_core::models::BoundingBox;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// A single face found in a photo: where it is and its identity embedding.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait FaceExtractor: Send + Sync {
    /// Dimension of the embeddings this extractor produces.
    fn embedding_dim(&self) -> usize;

    /// Detect faces in an encoded image and compute one embedding per face.
    ///
    /// Never fails: all failure modes come back as an empty list.
    async fn extract(&self, data: &[u8]) -> Vec<DetectedFace>;
}

/// Shared handle that meters access to a [`FaceExtractor`].
///
/// Bounds how many extractions run at once and how long a single photo may
/// take. A timed-out extraction counts as zero faces.
#[derive(Clone)]
pub struct FaceEngineHandle {
    extractor: Arc<dyn FaceExtractor>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
}

impl FaceEngineHandle {
    pub fn new(
        extractor: Arc<dyn FaceExtractor>,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.extractor.embedding_dim()
    }

    pub async fn extract(&self, data: &[u8]) -> Vec<DetectedFace> {
        // The semaphore only closes on shutdown; treat that as no faces.
        let _permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Vec::new(),
        };

        match tokio::time::timeout(self.timeout, self.extractor.extract(data)).await {
            Ok(faces) => faces,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Face extraction timed out, treating photo as having no faces"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor {
        faces: Vec<DetectedFace>,
    }

    #[async_trait]
    impl FaceExtractor for FixedExtractor {
        fn embedding_dim(&self) -> usize {
            4
        }

        async fn extract(&self, _data: &[u8]) -> Vec<DetectedFace> {
            self.faces.clone()
        }
    }

    struct SlowExtractor;

    #[async_trait]
    impl FaceExtractor for SlowExtractor {
        fn embedding_dim(&self) -> usize {
            4
        }

        async fn extract(&self, _data: &[u8]) -> Vec<DetectedFace> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Vec::new()
        }
    }

    fn face(x: i32) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox { x, y: 0, w: 10, h: 10 },
            embedding: vec![1.0, 0.0, 0.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_handle_passes_faces_through() {
        let extractor = Arc::new(FixedExtractor {
            faces: vec![face(1), face(2)],
        });
        let handle = FaceEngineHandle::new(extractor, 2, Duration::from_secs(5));

        let faces = handle.extract(b"jpeg bytes").await;
        assert_eq!(faces.len(), 2);
        assert_eq!(handle.embedding_dim(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_timeout_yields_no_faces() {
        let handle = FaceEngineHandle::new(Arc::new(SlowExtractor), 1, Duration::from_secs(1));

        let faces = handle.extract(b"jpeg bytes").await;
        assert!(faces.is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped_to_one() {
        let extractor = Arc::new(FixedExtractor { faces: vec![face(1)] });
        let handle = FaceEngineHandle::new(extractor, 0, Duration::from_secs(5));

        let faces = handle.extract(b"jpeg bytes").await;
        assert_eq!(faces.len(), 1);
    }
}

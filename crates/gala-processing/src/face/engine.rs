//! ONNX Runtime face engine
//!
//! SCRFD finds faces, ArcFace turns each face crop into a 512-dimensional
//! identity embedding. Model files are fetched once into the configured
//! models directory and loaded at startup.

use crate::face::detect::{crop_rect, decode_stride, l2_normalize, letterbox_scale, nms, ScoredBox};
use crate::face::{DetectedFace, FaceExtractor};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use gala_core::models::BoundingBox;
use image::imageops::FilterType;
use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SCRFD_MODEL_FILE: &str = "scrfd_500m_bnkps.onnx";
const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

const SCRFD_MODEL_URLS: [&str; 2] = [
    "https://huggingface.co/ykk648/face_lib/resolve/main/face_detect/scrfd_onnx/scrfd_500m_bnkps.onnx",
    "https://github.com/deepinsight/insightface/releases/download/v0.7/scrfd_500m_bnkps.onnx",
];
const ARCFACE_MODEL_URLS: [&str; 1] = [
    "https://huggingface.co/maze/faceX/resolve/e010b5098c3685fd00b22dd2aec6f37320e3d850/w600k_r50.onnx",
];

const DETECT_INPUT_SIZE: u32 = 640;
const DETECT_STRIDES: [u32; 3] = [8, 16, 32];
const EMBED_INPUT_SIZE: u32 = 112;
const ARCFACE_EMBEDDING_DIM: usize = 512;

/// Settings for [`OnnxFaceEngine::load`].
#[derive(Clone, Debug)]
pub struct FaceEngineConfig {
    pub models_dir: PathBuf,
    pub auto_download: bool,
    pub detection_confidence: f32,
    pub nms_iou: f32,
}

/// Face extractor backed by ONNX Runtime sessions.
pub struct OnnxFaceEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
    detection_confidence: f32,
    nms_iou: f32,
}

impl OnnxFaceEngine {
    /// Download missing model files (when enabled) and load both sessions.
    pub async fn load(config: FaceEngineConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.models_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create models directory {}",
                    config.models_dir.display()
                )
            })?;

        let scrfd_path = config.models_dir.join(SCRFD_MODEL_FILE);
        let arcface_path = config.models_dir.join(ARCFACE_MODEL_FILE);

        if config.auto_download {
            download_model_if_missing(&scrfd_path, &SCRFD_MODEL_URLS).await?;
            download_model_if_missing(&arcface_path, &ARCFACE_MODEL_URLS).await?;
        }

        if !scrfd_path.exists() || !arcface_path.exists() {
            anyhow::bail!(
                "Face models missing; expected {} and {} (set FACE_AUTO_DOWNLOAD_MODELS=true to fetch them)",
                scrfd_path.display(),
                arcface_path.display()
            );
        }

        let detector = Session::builder()?
            .commit_from_file(&scrfd_path)
            .context("Failed to load face detection model")?;
        let recognizer = Session::builder()?
            .commit_from_file(&arcface_path)
            .context("Failed to load face recognition model")?;

        tracing::info!(
            detector = %scrfd_path.display(),
            recognizer = %arcface_path.display(),
            "Face models loaded"
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                detector: Mutex::new(detector),
                recognizer: Mutex::new(recognizer),
                detection_confidence: config.detection_confidence,
                nms_iou: config.nms_iou,
            }),
        })
    }
}

#[async_trait]
impl FaceExtractor for OnnxFaceEngine {
    fn embedding_dim(&self) -> usize {
        ARCFACE_EMBEDDING_DIM
    }

    async fn extract(&self, data: &[u8]) -> Vec<DetectedFace> {
        let inner = Arc::clone(&self.inner);
        let data = data.to_vec();
        let start = std::time::Instant::now();

        match tokio::task::spawn_blocking(move || inner.extract_blocking(&data)).await {
            Ok(Ok(faces)) => {
                tracing::debug!(
                    face_count = faces.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Face extraction finished"
                );
                faces
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Face extraction failed, treating photo as having no faces");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "Face extraction task panicked");
                Vec::new()
            }
        }
    }
}

impl EngineInner {
    fn extract_blocking(&self, data: &[u8]) -> anyhow::Result<Vec<DetectedFace>> {
        let img = image::load_from_memory(data).context("Failed to decode image")?;
        let detections = self.detect(&img)?;

        let mut faces = Vec::with_capacity(detections.len());
        for detection in detections {
            let Some((x, y, w, h)) = crop_rect(&detection, img.width(), img.height()) else {
                continue;
            };
            let face_crop = img.crop_imm(x, y, w, h);
            match self.embed(&face_crop) {
                Ok(embedding) => faces.push(DetectedFace {
                    bbox: BoundingBox {
                        x: x as i32,
                        y: y as i32,
                        w: w as i32,
                        h: h as i32,
                    },
                    embedding,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to embed detected face, skipping it");
                }
            }
        }
        Ok(faces)
    }

    fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<ScoredBox>> {
        let scale = letterbox_scale(img.width(), img.height(), DETECT_INPUT_SIZE);
        let data = preprocess_detect(img, scale);

        let mut session = self.detector.lock();
        let input_name = session.inputs[0].name.clone();
        let shape = vec![
            1i64,
            3,
            DETECT_INPUT_SIZE as i64,
            DETECT_INPUT_SIZE as i64,
        ];
        let input = Value::from_array((shape, data))
            .context("Failed to build detection input tensor")?;
        let outputs = session
            .run(ort::inputs![input_name => input])
            .context("Face detection inference failed")?;

        let mut candidates = Vec::new();
        for stride in DETECT_STRIDES {
            let score_val = outputs.get(&format!("score_{stride}"));
            let bbox_val = outputs.get(&format!("bbox_{stride}"));
            let (Some(score_val), Some(bbox_val)) = (score_val, bbox_val) else {
                tracing::warn!(stride, "Detection model is missing outputs for stride");
                continue;
            };
            let (Ok((_, scores)), Ok((_, boxes))) = (
                score_val.try_extract_tensor::<f32>(),
                bbox_val.try_extract_tensor::<f32>(),
            ) else {
                tracing::warn!(stride, "Detection outputs are not f32 tensors");
                continue;
            };
            candidates.extend(decode_stride(
                scores,
                boxes,
                stride,
                DETECT_INPUT_SIZE,
                scale,
                img.width() as f32,
                img.height() as f32,
                self.detection_confidence,
            ));
        }

        Ok(nms(candidates, self.nms_iou))
    }

    fn embed(&self, face_crop: &DynamicImage) -> anyhow::Result<Vec<f32>> {
        let data = preprocess_embed(face_crop);

        let mut session = self.recognizer.lock();
        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();
        let shape = vec![1i64, 3, EMBED_INPUT_SIZE as i64, EMBED_INPUT_SIZE as i64];
        let input = Value::from_array((shape, data))
            .context("Failed to build recognition input tensor")?;
        let outputs = session
            .run(ort::inputs![input_name => input])
            .context("Face recognition inference failed")?;

        let value = outputs
            .get(&output_name)
            .ok_or_else(|| anyhow!("Recognition model returned no '{}' output", output_name))?;
        let (_, raw) = value
            .try_extract_tensor::<f32>()
            .context("Recognition output is not an f32 tensor")?;

        l2_normalize(raw).ok_or_else(|| anyhow!("Recognition model produced a zero embedding"))
    }
}

/// Letterbox to the detection input square, BGR planes normalized to [-1, 1].
fn preprocess_detect(img: &DynamicImage, scale: f32) -> Vec<f32> {
    let new_w = ((img.width() as f32 * scale) as u32).clamp(1, DETECT_INPUT_SIZE);
    let new_h = ((img.height() as f32 * scale) as u32).clamp(1, DETECT_INPUT_SIZE);
    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle);
    let mut padded = DynamicImage::new_rgb8(DETECT_INPUT_SIZE, DETECT_INPUT_SIZE);
    image::imageops::overlay(&mut padded, &resized, 0, 0);

    let rgb = padded.to_rgb8();
    let plane = (DETECT_INPUT_SIZE * DETECT_INPUT_SIZE) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = (pixel[2] as f32 - 127.5) / 128.0;
        data[plane + i] = (pixel[1] as f32 - 127.5) / 128.0;
        data[2 * plane + i] = (pixel[0] as f32 - 127.5) / 128.0;
    }
    data
}

/// Resize a face crop to the recognition input, RGB planes normalized to [-1, 1].
fn preprocess_embed(face_crop: &DynamicImage) -> Vec<f32> {
    let resized = face_crop.resize_exact(EMBED_INPUT_SIZE, EMBED_INPUT_SIZE, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let plane = (EMBED_INPUT_SIZE * EMBED_INPUT_SIZE) as usize;
    let mut data = vec![0f32; 3 * plane];
    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = (pixel[0] as f32 - 127.5) / 128.0;
        data[plane + i] = (pixel[1] as f32 - 127.5) / 128.0;
        data[2 * plane + i] = (pixel[2] as f32 - 127.5) / 128.0;
    }
    data
}

async fn download_model_if_missing(path: &Path, urls: &[&str]) -> anyhow::Result<()> {
    if path.exists() {
        return Ok(());
    }

    let client = reqwest::Client::new();
    let mut last_err = anyhow!("No download sources for {}", path.display());
    for url in urls {
        match download_file(&client, url, path).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(url, error = %e, "Model download failed, trying next source");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

async fn download_file(client: &reqwest::Client, url: &str, path: &Path) -> anyhow::Result<()> {
    tracing::info!(url, "Downloading face model");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download model from {url}"))?;
    if !response.status().is_success() {
        anyhow::bail!("Failed to download model: HTTP {}", response.status());
    }

    let bytes = response
        .bytes()
        .await
        .context("Failed to read model download body")?;
    if bytes.len() < 1024 {
        anyhow::bail!(
            "Downloaded model is suspiciously small ({} bytes), may be corrupted",
            bytes.len()
        );
    }

    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("Failed to write model file {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        size_bytes = bytes.len(),
        "Face model downloaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_preprocess_detect_shape_and_range() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([255, 0, 128])));
        let scale = letterbox_scale(320, 240, DETECT_INPUT_SIZE);
        let data = preprocess_detect(&img, scale);

        assert_eq!(data.len(), 3 * 640 * 640);
        assert!(data.iter().all(|v| (-1.0..=1.0).contains(v)));

        // Channel order is BGR: the first plane carries the blue channel.
        let plane = 640 * 640;
        assert!((data[0] - (128.0 - 127.5) / 128.0).abs() < 1e-6);
        assert!((data[plane] - (0.0 - 127.5) / 128.0).abs() < 1e-6);
        assert!((data[2 * plane] - (255.0 - 127.5) / 128.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_embed_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 80, Rgb([10, 20, 30])));
        let data = preprocess_embed(&img);

        assert_eq!(data.len(), 3 * 112 * 112);
        let plane = 112 * 112;
        assert!((data[0] - (10.0 - 127.5) / 128.0).abs() < 1e-6);
        assert!((data[plane] - (20.0 - 127.5) / 128.0).abs() < 1e-6);
        assert!((data[2 * plane] - (30.0 - 127.5) / 128.0).abs() < 1e-6);
    }
}

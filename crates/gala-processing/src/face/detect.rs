//! Detection output decoding and box math
//!
//! SCRFD emits per-stride score and box tensors over a letterboxed square
//! input. Everything here is pure so the decode path stays testable without a
//! model runtime.

/// Detections smaller than this (in original-image pixels) are discarded.
const MIN_FACE_SIZE_PX: f32 = 8.0;

/// Scored detection in original-image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoredBox {
    pub(crate) x1: f32,
    pub(crate) y1: f32,
    pub(crate) x2: f32,
    pub(crate) y2: f32,
    pub(crate) score: f32,
}

/// Scale factor that fits an image into a `target` x `target` letterbox.
pub(crate) fn letterbox_scale(width: u32, height: u32, target: u32) -> f32 {
    target as f32 / width.max(height).max(1) as f32
}

/// Decode one stride's score/box tensors into boxes in original-image space.
///
/// Box regressions are distances from the anchor center to each edge, in
/// stride units. Candidates below `confidence_threshold` or smaller than
/// [`MIN_FACE_SIZE_PX`] are dropped.
#[allow(clippy::too_many_arguments)]
pub(crate) fn decode_stride(
    scores: &[f32],
    boxes: &[f32],
    stride: u32,
    input_size: u32,
    scale: f32,
    img_w: f32,
    img_h: f32,
    confidence_threshold: f32,
) -> Vec<ScoredBox> {
    let grid = (input_size / stride) as usize;
    let grid_points = grid * grid;
    if grid_points == 0 || scores.len() % grid_points != 0 || boxes.len() < scores.len() * 4 {
        tracing::warn!(
            stride,
            scores = scores.len(),
            boxes = boxes.len(),
            "Unexpected detection output layout, skipping stride"
        );
        return Vec::new();
    }

    let anchors = scores.len() / grid_points;
    let stride_f = stride as f32;
    let mut out = Vec::new();

    for (idx, &score) in scores.iter().enumerate() {
        if score < confidence_threshold {
            continue;
        }

        let cell = idx / anchors;
        let cx = (cell % grid) as f32 * stride_f;
        let cy = (cell / grid) as f32 * stride_f;

        let b = idx * 4;
        let left = boxes[b] * stride_f;
        let top = boxes[b + 1] * stride_f;
        let right = boxes[b + 2] * stride_f;
        let bottom = boxes[b + 3] * stride_f;

        let x1 = ((cx - left) / scale).clamp(0.0, img_w);
        let y1 = ((cy - top) / scale).clamp(0.0, img_h);
        let x2 = ((cx + right) / scale).clamp(0.0, img_w);
        let y2 = ((cy + bottom) / scale).clamp(0.0, img_h);

        if x2 - x1 < MIN_FACE_SIZE_PX || y2 - y1 < MIN_FACE_SIZE_PX {
            continue;
        }

        out.push(ScoredBox { x1, y1, x2, y2, score });
    }

    out
}

/// Greedy non-maximum suppression, highest score first.
pub(crate) fn nms(mut candidates: Vec<ScoredBox>, iou_threshold: f32) -> Vec<ScoredBox> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<ScoredBox> = Vec::with_capacity(candidates.len());
    'outer: for candidate in candidates {
        for kept in &keep {
            if iou(kept, &candidate) > iou_threshold {
                continue 'outer;
            }
        }
        keep.push(candidate);
    }
    keep
}

pub(crate) fn iou(a: &ScoredBox, b: &ScoredBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);
    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }
    let intersection = (x2 - x1) * (y2 - y1);
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Integer crop rectangle for a detection, clamped to image bounds.
pub(crate) fn crop_rect(b: &ScoredBox, img_w: u32, img_h: u32) -> Option<(u32, u32, u32, u32)> {
    let x = b.x1.floor().max(0.0) as u32;
    let y = b.y1.floor().max(0.0) as u32;
    let x2 = (b.x2.ceil() as u32).min(img_w);
    let y2 = (b.y2.ceil() as u32).min(img_h);
    if x2 <= x || y2 <= y {
        return None;
    }
    Some((x, y, x2 - x, y2 - y))
}

/// L2-normalize an embedding. Returns `None` for a zero vector.
pub(crate) fn l2_normalize(raw: &[f32]) -> Option<Vec<f32>> {
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return None;
    }
    Some(raw.iter().map(|x| x / norm).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> ScoredBox {
        ScoredBox { x1, y1, x2, y2, score }
    }

    #[test]
    fn test_letterbox_scale() {
        assert_eq!(letterbox_scale(1280, 720, 640), 0.5);
        assert_eq!(letterbox_scale(720, 1280, 640), 0.5);
        // Small images are scaled up.
        assert_eq!(letterbox_scale(320, 240, 640), 2.0);
        // Degenerate dimensions do not divide by zero.
        assert_eq!(letterbox_scale(0, 0, 640), 640.0);
    }

    #[test]
    fn test_decode_stride_single_anchor() {
        // 64px input at stride 32 gives a 2x2 grid with one anchor per cell.
        let mut scores = vec![0.0; 4];
        let mut boxes = vec![0.0; 16];
        scores[3] = 0.9;
        // Cell 3 center is (32, 32); half a stride to each edge.
        boxes[12..16].copy_from_slice(&[0.5, 0.5, 0.5, 0.5]);

        let out = decode_stride(&scores, &boxes, 32, 64, 1.0, 64.0, 64.0, 0.5);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0], scored(16.0, 16.0, 48.0, 48.0, 0.9));
    }

    #[test]
    fn test_decode_stride_applies_letterbox_scale() {
        let mut scores = vec![0.0; 4];
        let mut boxes = vec![0.0; 16];
        scores[0] = 0.8;
        boxes[0..4].copy_from_slice(&[-0.5, -0.5, 1.0, 1.0]);

        // Original image was twice the letterbox size.
        let out = decode_stride(&scores, &boxes, 32, 64, 0.5, 128.0, 128.0, 0.5);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0], scored(32.0, 32.0, 64.0, 64.0, 0.8));
    }

    #[test]
    fn test_decode_stride_filters_low_confidence() {
        let scores = vec![0.3; 4];
        let boxes = vec![1.0; 16];

        let out = decode_stride(&scores, &boxes, 32, 64, 1.0, 64.0, 64.0, 0.5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_stride_filters_tiny_boxes() {
        let mut scores = vec![0.0; 4];
        let mut boxes = vec![0.0; 16];
        scores[0] = 0.9;
        // 3.2px on each side, below the minimum face size.
        boxes[0..4].copy_from_slice(&[0.05, 0.05, 0.05, 0.05]);

        let out = decode_stride(&scores, &boxes, 32, 64, 1.0, 64.0, 64.0, 0.5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_decode_stride_rejects_bad_layout() {
        // Five scores cannot tile a 2x2 grid.
        let scores = vec![0.9; 5];
        let boxes = vec![1.0; 20];

        let out = decode_stride(&scores, &boxes, 32, 64, 1.0, 64.0, 64.0, 0.5);
        assert!(out.is_empty());

        // Box tensor shorter than 4 values per score.
        let scores = vec![0.9; 4];
        let boxes = vec![1.0; 8];
        let out = decode_stride(&scores, &boxes, 32, 64, 1.0, 64.0, 64.0, 0.5);
        assert!(out.is_empty());
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let candidates = vec![
            scored(0.0, 0.0, 100.0, 100.0, 0.7),
            scored(5.0, 5.0, 105.0, 105.0, 0.9),
            scored(200.0, 200.0, 300.0, 300.0, 0.8),
        ];

        let kept = nms(candidates, 0.4);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.8);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let candidates = vec![
            scored(0.0, 0.0, 50.0, 50.0, 0.6),
            scored(100.0, 100.0, 150.0, 150.0, 0.9),
        ];

        let kept = nms(candidates, 0.4);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_iou() {
        let a = scored(0.0, 0.0, 100.0, 100.0, 1.0);
        assert_eq!(iou(&a, &a), 1.0);

        let b = scored(200.0, 200.0, 300.0, 300.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);

        // 50x100 intersection over 15000 union.
        let c = scored(50.0, 0.0, 150.0, 100.0, 1.0);
        let value = iou(&a, &c);
        assert!((value - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_crop_rect_clamps_to_image() {
        let b = scored(-4.2, 10.5, 700.9, 90.1, 0.9);
        let rect = crop_rect(&b, 640, 480);
        assert_eq!(rect, Some((0, 10, 640, 81)));
    }

    #[test]
    fn test_crop_rect_degenerate_is_none() {
        let b = scored(100.0, 100.0, 90.0, 120.0, 0.9);
        assert_eq!(crop_rect(&b, 640, 480), None);
    }

    #[test]
    fn test_l2_normalize() {
        let v = l2_normalize(&[3.0, 4.0]).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        assert!(l2_normalize(&[0.0, 0.0, 0.0]).is_none());
    }
}

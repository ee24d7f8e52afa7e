//! Synthetic photo fixtures understood by the stub face extractor.

#![allow(dead_code)]

/// Build a fake photo: byte 0 is the face count, each following byte is the
/// marker of one face. See `StubFaceExtractor` in the helpers module for how
/// markers map to embeddings.
pub fn photo_with_faces(markers: &[u8]) -> Vec<u8> {
    let mut data = vec![markers.len() as u8];
    data.extend_from_slice(markers);
    data
}

/// A photo in which the extractor finds nothing.
pub fn photo_without_faces() -> Vec<u8> {
    vec![0]
}

/// A selfie with a single face.
pub fn selfie_with_face(marker: u8) -> Vec<u8> {
    photo_with_faces(&[marker])
}

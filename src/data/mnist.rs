//! IDX (MNIST-style) binary loader.
//!
//! Layout of the image file (IDX3): two reserved zero bytes, dtype byte
//! `0x08` (uint8), dimension byte `0x03`, then big-endian u32 item count,
//! row count and column count, followed by the raw pixels. The label file
//! (IDX1) carries the same preamble with dimension `0x01` and one class
//! byte per item.

use std::fs;
use std::path::Path;

use crate::data::dataset::{Dataset, Tuple};
use crate::error::{Error, Result};

const N_CLASSES: usize = 10;

/// Loads the training pair (`train-images.idx3-ubyte`,
/// `train-labels.idx1-ubyte`) from `dir`. Pixels are scaled to [0, 1];
/// labels are class indices, so the dataset has `nout == 1`.
pub fn load_mnist(dir: &Path) -> Result<Dataset> {
    let images = fs::read(dir.join("train-images.idx3-ubyte"))?;
    let labels = fs::read(dir.join("train-labels.idx1-ubyte"))?;
    parse_idx_pair(&images, &labels)
}

/// Parses an IDX image/label byte pair into a class-index dataset.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8]) -> Result<Dataset> {
    if image_bytes.len() < 16 {
        return Err(Error::Format(format!(
            "IDX image file too short: {} bytes, need a 16-byte header",
            image_bytes.len()
        )));
    }
    if image_bytes[0] != 0 || image_bytes[1] != 0 || image_bytes[2] != 0x08 {
        return Err(Error::Format(
            "IDX image file: expected uint8 preamble 0x00 0x00 0x08".into(),
        ));
    }
    if image_bytes[3] != 0x03 {
        return Err(Error::Format(format!(
            "IDX image file: dimension byte is {}, not 3; this is not an IDX3 file",
            image_bytes[3]
        )));
    }

    let n_items = be_u32(&image_bytes[4..8]) as usize;
    let rows = be_u32(&image_bytes[8..12]) as usize;
    let cols = be_u32(&image_bytes[12..16]) as usize;
    let n_pixels = rows * cols;

    if image_bytes.len() < 16 + n_items * n_pixels {
        return Err(Error::Format(format!(
            "IDX image file too short: header declares {} items of {}x{} pixels, \
             file holds {} data bytes",
            n_items,
            rows,
            cols,
            image_bytes.len() - 16
        )));
    }

    if label_bytes.len() < 8 {
        return Err(Error::Format(format!(
            "IDX label file too short: {} bytes, need an 8-byte header",
            label_bytes.len()
        )));
    }
    if label_bytes[0] != 0 || label_bytes[1] != 0 || label_bytes[2] != 0x08 || label_bytes[3] != 0x01
    {
        return Err(Error::Format(
            "IDX label file: expected uint8 preamble 0x00 0x00 0x08 0x01".into(),
        ));
    }

    let n_labels = be_u32(&label_bytes[4..8]) as usize;
    if n_labels != n_items {
        return Err(Error::Format(format!(
            "IDX pair mismatch: {} images but {} labels",
            n_items, n_labels
        )));
    }
    if label_bytes.len() < 8 + n_items {
        return Err(Error::Format(format!(
            "IDX label file too short: header declares {} labels, file holds {}",
            n_items,
            label_bytes.len() - 8
        )));
    }

    let mut data = Dataset::new(n_pixels, 1);
    let pixels = &image_bytes[16..16 + n_items * n_pixels];
    let classes = &label_bytes[8..8 + n_items];

    for (chunk, &class) in pixels.chunks_exact(n_pixels).zip(classes.iter()) {
        if class as usize >= N_CLASSES {
            return Err(Error::Format(format!(
                "IDX label {} out of range for {} classes",
                class, N_CLASSES
            )));
        }
        let predictors = chunk.iter().map(|&px| px as f64 / 255.0).collect();
        data.push(Tuple::new(predictors, vec![class as f64]))?;
    }

    Ok(data)
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

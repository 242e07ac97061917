//! Latest-frame hand-off between the acquisition loop and its readers
//!
//! One producer publishes whole frames; any number of readers take
//! independent copies. The lock is held only while bytes move in or out,
//! never across a hardware read.

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{IrviewError, Result};
use crate::formats::BGRA_BYTES_PER_PIXEL;
use crate::types::FrameSnapshot;

/// Single-slot frame cell
#[derive(Debug, Default)]
struct FrameCell {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    /// 0 while empty
    generation: u64,
}

/// Thread-safe latest-frame exchange
#[derive(Debug, Default)]
pub struct FrameExchange {
    cell: Mutex<FrameCell>,
}

/// Byte size of a tightly packed BGRA frame
pub fn frame_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BGRA_BYTES_PER_PIXEL
}

fn check_len(len: usize, width: u32, height: u32) -> Result<()> {
    let expected = frame_len(width, height);
    if len != expected || expected == 0 {
        return Err(IrviewError::acquisition(format!(
            "frame of {} bytes does not match {}x{} BGRA ({} bytes)",
            len, width, height, expected
        )));
    }
    Ok(())
}

impl FrameExchange {
    /// Create an empty exchange
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a frame into the cell, returning the new generation
    pub fn publish(&self, bytes: &[u8], width: u32, height: u32) -> Result<u64> {
        check_len(bytes.len(), width, height)?;

        let mut cell = self.cell.lock();
        cell.bytes.clear();
        cell.bytes.extend_from_slice(bytes);
        cell.width = width;
        cell.height = height;
        cell.generation += 1;
        Ok(cell.generation)
    }

    /// Swap a filled buffer into the cell
    ///
    /// On return `buffer` holds the previous cell contents so the producer
    /// can reuse its allocation.
    pub fn publish_swap(&self, buffer: &mut Vec<u8>, width: u32, height: u32) -> Result<u64> {
        check_len(buffer.len(), width, height)?;

        let mut cell = self.cell.lock();
        std::mem::swap(&mut cell.bytes, buffer);
        cell.width = width;
        cell.height = height;
        cell.generation += 1;
        trace!("Published generation {}", cell.generation);
        Ok(cell.generation)
    }

    /// Copy of the latest frame, `None` before the first publish
    pub fn snapshot_latest(&self) -> Option<FrameSnapshot> {
        let cell = self.cell.lock();
        if cell.generation == 0 {
            return None;
        }
        Some(FrameSnapshot {
            data: cell.bytes.clone(),
            width: cell.width,
            height: cell.height,
            generation: cell.generation,
        })
    }

    /// Current generation (0 while empty)
    pub fn generation(&self) -> u64 {
        self.cell.lock().generation
    }

    /// Dimensions of the latest frame
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let cell = self.cell.lock();
        (cell.generation > 0).then_some((cell.width, cell.height))
    }

    /// Return to the empty state
    pub fn reset(&self) {
        *self.cell.lock() = FrameCell::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_until_first_publish() {
        let exchange = FrameExchange::new();
        assert!(exchange.snapshot_latest().is_none());
        assert_eq!(exchange.generation(), 0);
        assert_eq!(exchange.dimensions(), None);
    }

    #[test]
    fn test_publish_and_snapshot() {
        let exchange = FrameExchange::new();
        let frame = vec![7u8; frame_len(2, 2)];
        assert_eq!(exchange.publish(&frame, 2, 2).unwrap(), 1);

        let snapshot = exchange.snapshot_latest().unwrap();
        assert_eq!(snapshot.data, frame);
        assert_eq!((snapshot.width, snapshot.height), (2, 2));
        assert_eq!(snapshot.generation, 1);
    }

    #[test]
    fn test_rejects_wrong_size() {
        let exchange = FrameExchange::new();
        assert!(exchange.publish(&[0u8; 15], 2, 2).is_err());
        assert!(exchange.publish(&[], 0, 0).is_err());
        assert_eq!(exchange.generation(), 0);
    }

    #[test]
    fn test_snapshot_survives_later_publish() {
        let exchange = FrameExchange::new();
        exchange.publish(&[1u8; 4], 1, 1).unwrap();
        let first = exchange.snapshot_latest().unwrap();
        exchange.publish(&[2u8; 4], 1, 1).unwrap();

        assert_eq!(first.data, vec![1u8; 4]);
        assert_eq!(exchange.snapshot_latest().unwrap().data, vec![2u8; 4]);
    }

    #[test]
    fn test_swap_returns_previous_buffer() {
        let exchange = FrameExchange::new();
        let mut buffer = vec![1u8; 4];
        exchange.publish_swap(&mut buffer, 1, 1).unwrap();
        assert!(buffer.is_empty());

        let mut next = vec![2u8; 4];
        assert_eq!(exchange.publish_swap(&mut next, 1, 1).unwrap(), 2);
        assert_eq!(next, vec![1u8; 4]);
    }

    #[test]
    fn test_reset() {
        let exchange = FrameExchange::new();
        exchange.publish(&[1u8; 4], 1, 1).unwrap();
        exchange.reset();
        assert!(exchange.snapshot_latest().is_none());
        assert_eq!(exchange.generation(), 0);
    }

    #[test]
    fn test_readers_never_see_torn_frames() {
        let exchange = Arc::new(FrameExchange::new());
        let producer = {
            let exchange = exchange.clone();
            std::thread::spawn(move || {
                let mut buffer = Vec::new();
                for value in 0..200u8 {
                    buffer.clear();
                    buffer.resize(frame_len(16, 16), value);
                    exchange.publish_swap(&mut buffer, 16, 16).unwrap();
                }
            })
        };

        for _ in 0..200 {
            if let Some(snapshot) = exchange.snapshot_latest() {
                let first = snapshot.data[0];
                assert!(snapshot.data.iter().all(|b| *b == first));
                assert_eq!(snapshot.data.len(), frame_len(16, 16));
            }
        }
        producer.join().unwrap();
        assert_eq!(exchange.generation(), 200);
    }
}

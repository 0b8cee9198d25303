//! Lock-free single-producer single-consumer sample ring buffer.
//!
//! Producer: the audio callback thread. The write path is allocation-free
//! and never blocks; samples that don't fit are silently dropped.
//! Consumer: the DSP analysis thread.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity SPSC float buffer.
///
/// Cursors are monotonically increasing sample counts; the writer
/// publishes with a release store on the write cursor and the reader
/// observes it with acquire (and vice versa for the read cursor), so
/// samples are visible to the consumer before the cursor that exposes
/// them.
pub struct RingBuffer {
    buf: UnsafeCell<Vec<f32>>,
    capacity: usize,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
}

// Safe for exactly one producer and one consumer: the cursor protocol
// guarantees the two sides never touch the same region concurrently.
unsafe impl Sync for RingBuffer {}
unsafe impl Send for RingBuffer {}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: UnsafeCell::new(vec![0.0; capacity]),
            capacity,
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
        }
    }

    /// Producer side: copy up to `data.len()` samples in.
    ///
    /// Returns the number actually written; the overflow tail is dropped.
    /// Real-time safe: no allocation, no locks, no blocking.
    pub fn write(&self, data: &[f32]) -> usize {
        let wr = self.write_pos.load(Ordering::Relaxed);
        let rd = self.read_pos.load(Ordering::Acquire);

        let free = self.capacity - (wr - rd);
        let to_write = data.len().min(free);
        if to_write == 0 {
            return 0;
        }

        let buf = unsafe { &mut *self.buf.get() };
        let wr_idx = wr % self.capacity;
        let first = to_write.min(self.capacity - wr_idx);
        buf[wr_idx..wr_idx + first].copy_from_slice(&data[..first]);
        if to_write > first {
            buf[..to_write - first].copy_from_slice(&data[first..to_write]);
        }

        self.write_pos.store(wr + to_write, Ordering::Release);
        to_write
    }

    /// Consumer side: copy up to `out.len()` samples out.
    ///
    /// Returns the number actually read.
    pub fn read(&self, out: &mut [f32]) -> usize {
        let rd = self.read_pos.load(Ordering::Relaxed);
        let wr = self.write_pos.load(Ordering::Acquire);

        let filled = wr - rd;
        let to_read = out.len().min(filled);
        if to_read == 0 {
            return 0;
        }

        let buf = unsafe { &*self.buf.get() };
        let rd_idx = rd % self.capacity;
        let first = to_read.min(self.capacity - rd_idx);
        out[..first].copy_from_slice(&buf[rd_idx..rd_idx + first]);
        if to_read > first {
            out[first..to_read].copy_from_slice(&buf[..to_read - first]);
        }

        self.read_pos.store(rd + to_read, Ordering::Release);
        to_read
    }

    /// Number of samples currently available to the consumer.
    pub fn available(&self) -> usize {
        self.write_pos.load(Ordering::Acquire) - self.read_pos.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset both cursors. Only call while neither side is active.
    pub fn reset(&self) {
        self.write_pos.store(0, Ordering::Relaxed);
        self.read_pos.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_write_then_read_roundtrip() {
        let rb = RingBuffer::new(16);
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(rb.write(&data), 4);
        assert_eq!(rb.available(), 4);

        let mut out = [0.0; 4];
        assert_eq!(rb.read(&mut out), 4);
        assert_eq!(out, data);
        assert_eq!(rb.available(), 0);
    }

    #[test]
    fn test_overflow_is_dropped() {
        let rb = RingBuffer::new(8);
        let data = [1.0; 12];
        assert_eq!(rb.write(&data), 8);
        assert_eq!(rb.write(&data), 0);
        assert_eq!(rb.available(), 8);
    }

    #[test]
    fn test_wrap_around_preserves_order() {
        let rb = RingBuffer::new(8);
        let mut out = [0.0; 8];

        // Advance the cursors past the physical end
        assert_eq!(rb.write(&[0.0; 6]), 6);
        assert_eq!(rb.read(&mut out[..6]), 6);

        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(rb.write(&data), 5);
        let mut wrapped = [0.0; 5];
        assert_eq!(rb.read(&mut wrapped), 5);
        assert_eq!(wrapped, data);
    }

    #[test]
    fn test_available_tracks_writes_minus_reads() {
        let rb = RingBuffer::new(32);
        let mut written = 0usize;
        let mut read = 0usize;
        let mut out = [0.0; 8];

        for step in 0..50 {
            let n = (step % 7) + 1;
            written += rb.write(&vec![step as f32; n]);
            if step % 3 == 0 {
                read += rb.read(&mut out[..(step % 5) + 1]);
            }
            assert_eq!(rb.available(), written - read);
        }
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let rb = Arc::new(RingBuffer::new(1024));
        let producer = rb.clone();

        let handle = std::thread::spawn(move || {
            let mut next = 0u32;
            while next < 10_000 {
                let chunk: Vec<f32> = (next..next + 64).map(|v| v as f32).collect();
                let n = producer.write(&chunk);
                next += n as u32;
                if n == 0 {
                    std::thread::yield_now();
                }
            }
        });

        let mut expected = 0u32;
        let mut out = [0.0f32; 128];
        while expected < 10_000 {
            let n = rb.read(&mut out);
            for &v in &out[..n] {
                assert_eq!(v, expected as f32);
                expected += 1;
            }
            if n == 0 {
                std::thread::yield_now();
            }
        }
        handle.join().unwrap();
    }
}

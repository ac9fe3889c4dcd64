// BufferPool - lock-free buffer pool with dual SPSC queues
//
// Two SPSC ring buffers move pre-allocated sample buffers between the
// source thread and the sink loop without allocating after setup.
//
// Buffer flow:
// 1. Source pops an empty buffer from the pool queue
// 2. Source fills it with tone samples and pushes it to the data queue
// 3. Sink pops the filled buffer, meters it, and returns it to the pool queue

use rtrb::{Consumer, Producer};

pub const DEFAULT_BUFFER_COUNT: usize = 16;

/// Mono S16 sample buffer
pub type SampleBuffer = Vec<i16>;

/// Source-side ends of the pool
pub struct SourceChannels {
    /// Filled buffers towards the sink
    pub data_producer: Producer<SampleBuffer>,
    /// Empty buffers coming back from the sink
    pub pool_consumer: Consumer<SampleBuffer>,
}

/// Sink-side ends of the pool
pub struct SinkChannels {
    pub data_consumer: Consumer<SampleBuffer>,
    pub pool_producer: Producer<SampleBuffer>,
}

pub struct BufferPool;

impl BufferPool {
    /// Create the pool with `buffer_count` buffers of `buffer_size` samples
    ///
    /// # Panics
    /// Panics if buffer_count is 0 or buffer_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(buffer_count: usize, buffer_size: usize) -> (SourceChannels, SinkChannels) {
        assert!(buffer_count > 0, "buffer_count must be greater than 0");
        assert!(buffer_size > 0, "buffer_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        // Pool capacity equals buffer_count, so every push fits
        for _ in 0..buffer_count {
            let _ = pool_producer.push(Vec::with_capacity(buffer_size));
        }

        (
            SourceChannels {
                data_producer,
                pool_consumer,
            },
            SinkChannels {
                data_consumer,
                pool_producer,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_pool_creation() {
        let (mut source, mut sink) = BufferPool::new(16, 1024);

        let mut available_buffers = 0;
        while let Ok(buffer) = source.pool_consumer.pop() {
            assert!(buffer.capacity() >= 1024);
            available_buffers += 1;
        }
        assert_eq!(available_buffers, 16);
        assert!(sink.data_consumer.pop().is_err());
    }

    #[test]
    fn test_buffer_round_trip() {
        let (mut source, mut sink) = BufferPool::new(2, 4);

        let mut buffer = source.pool_consumer.pop().unwrap();
        buffer.extend_from_slice(&[1, 2, 3, 4]);
        source.data_producer.push(buffer).unwrap();

        let received = sink.data_consumer.pop().unwrap();
        assert_eq!(received, vec![1, 2, 3, 4]);
        sink.pool_producer.push(received).unwrap();

        let untouched = source.pool_consumer.pop().unwrap();
        assert!(untouched.is_empty());
        let recycled = source.pool_consumer.pop().unwrap();
        assert_eq!(recycled.len(), 4);
    }

    #[test]
    fn test_dropped_source_abandons_data_queue() {
        let (source, sink) = BufferPool::new(2, 4);
        drop(source);
        assert!(sink.data_consumer.is_abandoned());
    }

    #[test]
    #[should_panic(expected = "buffer_count must be greater than 0")]
    fn test_zero_buffer_count_panics() {
        BufferPool::new(0, 1024);
    }
}

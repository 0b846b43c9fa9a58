// Communication channels - lock-free ring buffers between threads

use crate::audio::sink::SinkCommand;
use crate::messaging::update::PlaybackUpdate;
use ringbuf::{HeapRb, traits::Split};

pub type CommandProducer = ringbuf::HeapProd<SinkCommand>;
pub type CommandConsumer = ringbuf::HeapCons<SinkCommand>;

/// Channel carrying tone commits from the scheduling thread to the audio callback
pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<SinkCommand>::new(capacity);
    rb.split()
}

pub type UpdateProducer = ringbuf::HeapProd<PlaybackUpdate>;
pub type UpdateConsumer = ringbuf::HeapCons<PlaybackUpdate>;

/// Channel carrying playback updates from the worker to the UI layer
pub fn create_update_channel(capacity: usize) -> (UpdateProducer, UpdateConsumer) {
    let rb = HeapRb::<PlaybackUpdate>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::update::StopReason;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_update_channel_round_trip() {
        let (mut tx, mut rx) = create_update_channel(8);

        tx.try_push(PlaybackUpdate::Started { first_due: 0.05 })
            .unwrap();
        tx.try_push(PlaybackUpdate::Stopped {
            reason: StopReason::Requested,
        })
        .unwrap();

        assert_eq!(
            rx.try_pop(),
            Some(PlaybackUpdate::Started { first_due: 0.05 })
        );
        assert_eq!(
            rx.try_pop(),
            Some(PlaybackUpdate::Stopped {
                reason: StopReason::Requested
            })
        );
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_channel_capacity_bound() {
        let (mut tx, _rx) = create_update_channel(1);

        assert!(tx.try_push(PlaybackUpdate::Started { first_due: 0.0 }).is_ok());
        // Full buffer rejects instead of blocking
        assert!(tx.try_push(PlaybackUpdate::Started { first_due: 0.0 }).is_err());
    }
}

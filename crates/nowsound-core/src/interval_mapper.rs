//! Interval mappers: translate an absolute-time query interval into the
//! sub-interval of a stream's stored data that actually answers it.
//!
//! `Identity` is used while a stream is still open (recording); the two
//! looping variants activate once the stream is shut. Dispatch is a plain
//! enum match rather than a trait object, since this runs on the audio
//! thread's hot path (spec guidance: favor tagged enums over dynamic
//! dispatch for per-block work).

use crate::time::{ContinuousDuration, Duration, Interval, Time};

#[derive(Debug, Clone, Copy)]
pub enum IntervalMapper<T> {
    Identity,
    SimpleLooping { discrete_duration: Duration<T> },
    ExactLooping { continuous_duration: ContinuousDuration<T> },
}

impl<T: Copy> IntervalMapper<T> {
    /// Maps `query`, an absolute-time forwards interval, into the
    /// sub-interval of `[stream_start, stream_start+stream_discrete_duration)`
    /// that should be read first. The caller loops on the suffix of
    /// `query` until it is fully consumed.
    pub fn map(
        &self,
        query: Interval<T>,
        stream_start: Time<T>,
        stream_discrete_duration: Duration<T>,
    ) -> Interval<T> {
        let stream_span = Interval::forwards(stream_start, stream_discrete_duration);
        match *self {
            IntervalMapper::Identity => query.intersect(stream_span),
            IntervalMapper::SimpleLooping { discrete_duration } => {
                if discrete_duration.is_zero() {
                    return Interval::forwards(stream_start, Duration::ZERO);
                }
                let delta = (query.start() - stream_start).value();
                let d = discrete_duration.value();
                let delta_prime = delta.rem_euclid(d);
                let start = stream_start + Duration::new(delta_prime);
                let remaining_in_loop = d - delta_prime;
                let length = query.length().value().min(remaining_in_loop);
                Interval::forwards(start, Duration::new(length))
            }
            IntervalMapper::ExactLooping { continuous_duration } => {
                let c = continuous_duration.value();
                if c <= 0.0 {
                    return Interval::forwards(stream_start, Duration::ZERO);
                }
                let delta = (query.start() - stream_start).value() as f64;
                let loop_index = (delta / c).floor();
                // Wrapped, not cumulative: the offset into the physically
                // stored loop buffer, which only ever spans [0, c).
                let adjusted = (delta - loop_index * c) as i64;
                let length = (((loop_index + 1.0) * c - delta).ceil() as i64).max(0);
                Interval::forwards(
                    stream_start + Duration::new(adjusted),
                    Duration::new(length),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::AudioSample;

    #[test]
    fn simple_looping_truncates_at_boundary() {
        let mapper = IntervalMapper::<AudioSample>::SimpleLooping {
            discrete_duration: Duration::new(10),
        };
        let q = Interval::forwards(Time::new(23), Duration::new(100));
        let m = mapper.map(q, Time::new(0), Duration::new(10));
        assert_eq!(m.start().value(), 3);
        assert_eq!(m.length().value(), 7);
    }

    #[test]
    fn identity_clips_to_stream_span() {
        let mapper = IntervalMapper::<AudioSample>::Identity;
        let q = Interval::forwards(Time::new(5), Duration::new(100));
        let m = mapper.map(q, Time::new(0), Duration::new(10));
        assert_eq!(m.start().value(), 5);
        assert_eq!(m.length().value(), 5);
    }

    #[test]
    fn exact_looping_worked_example() {
        let mapper = IntervalMapper::<AudioSample>::ExactLooping {
            continuous_duration: ContinuousDuration::from_non_negative(2.4),
        };
        // Wrapped start offsets (always within the stored [0, 3) buffer),
        // grouped by loop_index = floor(t / 2.4): 0,0,0,1,1,2,2,2,3,3.
        let expected = [
            (0i64, 0i64, 3i64),
            (0, 1, 2),
            (0, 2, 1),
            (1, 0, 2),
            (1, 1, 1),
            (2, 0, 3),
            (2, 1, 2),
            (2, 2, 1),
            (3, 0, 2),
            (3, 1, 1),
        ];
        for (t, &(_loop_index, start, length)) in expected.iter().enumerate() {
            let q = Interval::forwards(Time::new(t as i64), Duration::new(1));
            let m = mapper.map(q, Time::new(0), Duration::new(3));
            assert_eq!(m.start().value(), start, "t={t}");
            assert_eq!(m.length().value(), length, "t={t}");
        }
    }

    #[test]
    fn exact_looping_suffix_walk_covers_query_exactly() {
        let mapper = IntervalMapper::<AudioSample>::ExactLooping {
            continuous_duration: ContinuousDuration::from_non_negative(2.4),
        };
        let mut query = Interval::forwards(Time::new(0), Duration::new(10));
        let mut total = 0i64;
        let mut lengths = vec![];
        while !query.is_empty() {
            let m = mapper.map(query, Time::new(0), Duration::new(3));
            assert!(m.length().value() > 0, "must make progress");
            total += m.length().value();
            lengths.push(m.length().value());
            query = query.suffix(m.length());
        }
        assert_eq!(total, 10);
        assert_eq!(lengths, vec![3, 2, 3, 2]);
    }
}

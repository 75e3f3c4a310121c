/*! Probe rate: a passive sink that tracks the item rate flowing through it
and periodically publishes `{ rate_now, rate_avg }` on a message port.

Simplification note: rather than a dedicated background thread waking every
`update_period` (as the original does), the rate is sampled cooperatively on
each `work()` call once `update_period` wall-clock time has elapsed since
the last sample — consistent with this crate's single-threaded, polled
scheduler rather than a thread-per-block one.
*/
use std::time::{Duration, Instant};

use crate::Float;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::message::Message;
use crate::stream::{NCWriteStream, ReadStream};

const SERVICE: &str = "probe_rate";
const DEFAULT_ALPHA: Float = 0.15;

/// Probe-rate sink block.
pub struct ProbeRate<T> {
    src: ReadStream<T>,
    msg: NCWriteStream<Message>,
    update_period: Duration,
    alpha: Float,
    last_poll: Option<Instant>,
    count_since_last: u64,
    rate_avg: Option<Float>,
}

impl<T: Copy> ProbeRate<T> {
    /// Create a new probe-rate sink, publishing updates every
    /// `update_period`.
    #[must_use]
    pub fn new(src: ReadStream<T>, update_period: Duration) -> (Self, crate::stream::NCReadStream<Message>) {
        let (msg, msg_out) = NCWriteStream::new();
        (
            Self {
                src,
                msg,
                update_period,
                alpha: DEFAULT_ALPHA,
                last_poll: None,
                count_since_last: 0,
                rate_avg: None,
            },
            msg_out,
        )
    }
}

impl<T> BlockName for ProbeRate<T> {
    fn block_name(&self) -> &str {
        "ProbeRate"
    }
}

impl<T: Copy> Block for ProbeRate<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, _tags) = self.src.read_buf()?;
        let n = input.len();
        self.count_since_last += n as u64;
        input.consume(n);

        let now = Instant::now();
        let last = *self.last_poll.get_or_insert(now);
        let elapsed = now.duration_since(last);
        if elapsed >= self.update_period {
            let rate_now = self.count_since_last as Float / elapsed.as_secs_f32();
            let rate_avg = match self.rate_avg {
                None => rate_now,
                Some(prev) => self.alpha * rate_now + (1.0 - self.alpha) * prev,
            };
            self.rate_avg = Some(rate_avg);
            let mut data = std::collections::BTreeMap::new();
            data.insert("rate_now".to_string(), Value::F64(rate_now as f64));
            data.insert("rate_avg".to_string(), Value::F64(rate_avg as f64));
            self.msg.push(Message::with_map(SERVICE, "rate", data), vec![]);
            self.last_poll = Some(now);
            self.count_since_last = 0;
        }

        if n == 0 {
            Ok(BlockRet::Noop)
        } else {
            Ok(BlockRet::Ok)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_stream;

    #[test]
    fn counts_items_without_publishing_before_the_period() -> Result<()> {
        let (src_in, src_out) = new_stream::<u8>();
        {
            let mut w = src_in.write_buf()?;
            w.fill_from_slice(&[1, 2, 3]);
            w.produce(3, &[]);
        }
        let (mut b, msg_out) = ProbeRate::new(src_out, Duration::from_secs(3600));
        b.work()?;
        assert!(msg_out.pop().is_none());
        Ok(())
    }
}

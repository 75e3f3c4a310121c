/*! Graphs contain blocks connected by streams, and run them.
 */
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::Result;
use crate::block::{Block, BlockRet};

/// A cheaply clonable handle for asynchronously stopping a running graph,
/// e.g. from a Ctrl-C handler.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new, not yet canceled, token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Common interface shared by [`Graph`] and [`crate::mtgraph::MTGraph`].
pub trait GraphRunner {
    /// Add a block to the flowgraph.
    fn add(&mut self, b: Box<dyn Block + Send>);

    /// Run the graph until every block has reached EOF, or the cancellation
    /// token has fired.
    fn run(&mut self) -> Result<()>;

    /// Return a string with stats about where time went.
    fn generate_stats(&self, elapsed: Duration) -> String;

    /// Return a cancellation token, for asynchronously stopping the graph.
    fn cancel_token(&self) -> CancellationToken;
}

/**
A graph is a thing that RustRadio runs, to let blocks "talk to each
other" via streams.

This is the single-threaded scheduler. See [`crate::mtgraph::MTGraph`] for
a version that runs every block on its own thread.

# Example

```
use rustradio::graph::{Graph, GraphRunner};
use rustradio::blocks::{ConstantSource, AddConst, NullSink};

let mut graph = Graph::new();
let (src, src_out) = ConstantSource::new(1.0f32);
let (add, add_out) = AddConst::new(src_out, 1.0);
let sink = NullSink::new(add_out);
graph.add(Box::new(src));
graph.add(Box::new(add));
graph.add(Box::new(sink));
# return Ok(());
graph.run()?;
# Ok::<(), rustradio::Error>(())
```
*/
pub struct Graph {
    blocks: Vec<Box<dyn Block + Send>>,
    cancel_token: CancellationToken,
    times: BTreeMap<(usize, String), Duration>,
}

impl Graph {
    /// Create new empty graph.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            cancel_token: CancellationToken::new(),
            times: BTreeMap::new(),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphRunner for Graph {
    fn add(&mut self, b: Box<dyn Block + Send>) {
        self.blocks.push(b);
    }

    fn run(&mut self) -> Result<()> {
        let st = Instant::now();
        let n = self.blocks.len();
        let mut status = vec![BlockRet::Ok; n];
        let mut first_phase = true;
        loop {
            if self.cancel_token.is_canceled() {
                debug!("Graph canceled");
                break;
            }
            for (i, b) in self.blocks.iter_mut().enumerate() {
                if matches!(status[i], BlockRet::EOF) {
                    continue;
                }
                let bt = Instant::now();
                let ret = b.work()?;
                *self
                    .times
                    .entry((i, b.block_name().to_string()))
                    .or_insert(Duration::default()) += bt.elapsed();
                if matches!(
                    ret,
                    BlockRet::Ok | BlockRet::Pending | BlockRet::OutputFull
                ) {
                    first_phase = true;
                }
                status[i] = ret;
            }

            let maybe_done = status
                .iter()
                .all(|s| matches!(s, BlockRet::Noop | BlockRet::EOF));
            if maybe_done {
                if !first_phase {
                    debug!("All blocks returning done in two phases.");
                    break;
                }
                debug!("First phase of done detection completed. Resetting for second phase.");
                first_phase = false;
                for s in &mut status {
                    if !matches!(s, BlockRet::EOF) {
                        *s = BlockRet::Noop;
                    }
                }
            } else {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        for line in self.generate_stats(st.elapsed()).split('\n') {
            if !line.is_empty() {
                info!("{}", line);
            }
        }
        Ok(())
    }

    fn generate_stats(&self, elapsed: Duration) -> String {
        let total = self.times.values().sum::<Duration>().as_secs_f64();
        let names: Vec<String> = self
            .times
            .keys()
            .map(|(n, name)| format!("{}/{}", name, n))
            .collect();
        let ml = names.iter().map(|b| b.len()).max().unwrap_or(0);
        let ml = std::cmp::max(ml, "Elapsed seconds".len());
        let elapsed = elapsed.as_secs_f64();

        let dashes = "-".repeat(ml + 20) + "\n";
        let (secw, secd) = (10, 3);
        let (pw, pd) = (7, 2);

        let mut s: String = format!("{:<width$}    Seconds  Percent\n", "Block name", width = ml);
        s.push_str(&dashes);
        for (n, tt) in self.times.values().enumerate() {
            let name = &names[n];
            s.push_str(&format!(
                "{:<width$} {:secw$.secd$} {:>pw$.pd$}%\n",
                name,
                tt.as_secs_f32(),
                100.0 * tt.as_secs_f64() / total,
                width = ml,
            ));
        }
        s.push_str(&dashes);
        s.push_str(&format!(
            "{:<width$} {total:secw$.secd$} {:>pw$.pd$}%\n",
            "All blocks",
            100.0 * total / elapsed,
            width = ml,
        ));
        s.push_str(&format!(
            "{:<width$} {:secw$.secd$} {:>pw$.pd$}%\n",
            "Non-block time",
            elapsed - total,
            100.0 * (elapsed - total) / elapsed,
            width = ml,
        ));
        s.push_str(&format!(
            "{:<width$} {elapsed:secw$.secd$} {:>pw$.pd$}%\n",
            "Elapsed seconds",
            100.0,
            width = ml,
        ));
        s
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

use bounded_queue::{init_tracing, BoundedQueue};
use std::collections::BTreeMap;
use std::sync::mpsc::sync_channel;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Instant;

const MAX_THREADS: u32 = 4;
const PER_THREAD_RUNS: u32 = 5;
const CAPACITY: usize = 64;

fn queue() -> (Arc<BoundedQueue<()>>, Arc<BoundedQueue<()>>) {
    let q = Arc::new(BoundedQueue::new(CAPACITY).expect("non-zero capacity"));
    (q.clone(), q)
}

fn std_queue() -> (std::sync::mpsc::SyncSender<()>, std::sync::mpsc::Receiver<()>) {
    sync_channel(CAPACITY)
}

// Producers stop once `stop` is set; they use `offer` so they can notice it
// even when the consumer is no longer taking.
macro_rules! go {
    ($channel:ident, |$tx:ident| $send:expr, |$rx:ident| $recv:expr) => {{
        let mut results = BTreeMap::new();
        for threads in 1..=MAX_THREADS {
            for _ in 0..PER_THREAD_RUNS {
                let go = Arc::new(AtomicBool::new(false));
                let stop = Arc::new(AtomicBool::new(false));
                let (tx, $rx) = $channel();
                let mut joiners = Vec::new();
                for _ in 0..threads {
                    let go = go.clone();
                    let stop = stop.clone();
                    let $tx = tx.clone();
                    joiners.push(thread::spawn(move || {
                        while !go.load(Ordering::Relaxed) {}
                        while !stop.load(Ordering::Relaxed) {
                            let _ = $send;
                        }
                    }));
                }
                drop(tx);

                go.store(true, Ordering::SeqCst);
                let start = Instant::now();
                let mut received: u128 = 0;
                let mut elapsed;
                // Determine approximately how many messages are sent in a second,
                // to use as the amount we receive before checking the time.
                let at_once = loop {
                    for _ in 0..1000 {
                        $recv;
                    }
                    received += 1000;
                    elapsed = start.elapsed();
                    if elapsed.as_secs() >= 1 {
                        break received;
                    }
                };
                let start = Instant::now();
                received = 0;
                loop {
                    for _ in 0..at_once {
                        $recv;
                    }
                    received += at_once;
                    elapsed = start.elapsed();
                    if elapsed.as_secs() >= 7 {
                        break;
                    }
                }

                stop.store(true, Ordering::SeqCst);
                std::mem::drop($rx);
                for joiner in joiners {
                    // make sure all the threads finish
                    joiner.join().unwrap();
                }

                let res = received / elapsed.as_millis();
                eprintln!(
                    "{}/{:2}: {} in {:?}: {}",
                    stringify!($channel),
                    threads,
                    received,
                    elapsed,
                    res
                );
                results.entry(threads).or_insert_with(Vec::new).push(res);
            }
        }

        results
    }};
}

fn serialize(desc: &str, results: &BTreeMap<u32, Vec<u128>>) -> std::io::Result<()> {
    use std::io::Write;
    let mut v = Vec::new();
    writeln!(v, "threads,{}", desc)?;
    for (threads, results) in results {
        for res in results {
            writeln!(v, "{},{}", threads, res)?;
        }
    }
    std::fs::write(desc, v)
}

fn main() -> std::io::Result<()> {
    init_tracing();

    let res = go!(queue, |tx| tx.offer(()), |rx| rx.take());
    eprintln!("BoundedQueue Throughput: {:?}", res);
    serialize("bounded", &res)?;
    if std::env::var_os("BENCH_STD").is_some() {
        let res = go!(std_queue, |tx| tx.try_send(()), |rx| rx.recv().unwrap());
        eprintln!("std Throughput: {:?}", res);
        serialize("std", &res)?;
    }
    Ok(())
}

#[macro_use]
extern crate criterion;

use bounded_queue::BoundedQueue;
use criterion::{AxisScale, Criterion, ParameterizedBenchmark, PlotConfiguration};
use std::sync::mpsc;
use std::sync::Arc;

type Message = [usize; 1];

fn message(i: usize) -> Message {
    [i]
}

fn sequential(messages: usize) {
    let q = BoundedQueue::new(messages).unwrap();

    for i in 0..messages {
        q.put(message(i));
    }

    for _ in 0..messages {
        q.take();
    }
}

fn sequential_drain(messages: usize) {
    let q = BoundedQueue::new(messages).unwrap();

    for i in 0..messages {
        q.offer(message(i)).unwrap();
    }

    assert_eq!(q.drain(messages).len(), messages);
}

fn sequential_std(messages: usize) {
    let (tx, rx) = mpsc::sync_channel(messages);

    for i in 0..messages {
        tx.send(message(i)).unwrap();
    }

    for _ in 0..messages {
        rx.recv().unwrap();
    }
}

fn threaded(threads: usize, capacity: usize, messages: usize) {
    let q = Arc::new(BoundedQueue::new(capacity).unwrap());

    let producers: Vec<_> = (0..threads)
        .map(|_| {
            let q = q.clone();
            std::thread::spawn(move || {
                for i in 0..messages / threads {
                    q.put(message(i));
                }
            })
        })
        .collect();

    for _ in 0..(messages / threads) * threads {
        q.take();
    }
    for producer in producers {
        producer.join().unwrap();
    }
}

fn threaded_std(threads: usize, capacity: usize, messages: usize) {
    let (tx, rx) = mpsc::sync_channel(capacity);

    for _ in 0..threads {
        let tx = tx.clone();
        std::thread::spawn(move || {
            for i in 0..messages / threads {
                tx.send(message(i)).unwrap();
            }
        });
    }

    for _ in 0..(messages / threads) * threads {
        rx.recv().unwrap();
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);

    let messages = vec![1, 10, 100, 1000, 10_000];

    c.bench(
        "sequential-local",
        ParameterizedBenchmark::new(
            "put/take",
            |b, input| b.iter(|| sequential(*input)),
            messages.clone(),
        )
        .with_function("offer/drain", |b, input| {
            b.iter(|| sequential_drain(*input))
        })
        .with_function("std", |b, input| b.iter(|| sequential_std(*input)))
        .plot_config(plot_config.clone()),
    );

    let mut bench = ParameterizedBenchmark::new(
        "cap 1, 1 thread",
        |b, input| b.iter(|| threaded(1, 1, *input)),
        messages.clone(),
    );

    for &thread in &[1, 2, 3, 4] {
        for &capacity in &[1, 64] {
            if thread != 1 || capacity != 1 {
                bench = bench.with_function(
                    format!("cap {}, {} thread", capacity, thread),
                    move |b, input| b.iter(move || threaded(thread, capacity, *input)),
                );
            }
            bench = bench.with_function(
                format!("std cap {}, {} thread", capacity, thread),
                move |b, input| b.iter(move || threaded_std(thread, capacity, *input)),
            );
        }
    }

    c.bench("threaded-local", bench.plot_config(plot_config.clone()));
}

criterion_group!(local, criterion_benchmark);
criterion_main!(local);

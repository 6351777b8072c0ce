//! CPU-bound demo target
//!
//! Computes a naive recursive Fibonacci number. When `PROFILING_ENABLE`
//! is set, a sampler thread periodically pushes a payload to the collector
//! at its well-known alias and port, imitating a push-mode profiling
//! agent. Push failures are ignored: the target must finish even when no
//! collector is reachable.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const COLLECTOR_ADDR: &str = "collector:4040";
const PUSH_INTERVAL: Duration = Duration::from_millis(100);

fn fib(n: u64) -> u64 {
    if n < 2 {
        n
    } else {
        fib(n - 1) + fib(n - 2)
    }
}

fn run() {
    println!("fib(32) = {}", fib(32));
}

fn push_sample() {
    let Ok(mut stream) = TcpStream::connect(COLLECTOR_ADDR) else {
        return;
    };
    let request = "POST /ingest HTTP/1.1\r\nHost: collector\r\nContent-Length: 4\r\nConnection: close\r\n\r\ntick";
    if stream.write_all(request.as_bytes()).is_err() {
        return;
    }
    let mut response = Vec::new();
    let _ = stream.read_to_end(&mut response);
}

fn main() {
    if std::env::var("PROFILING_ENABLE").is_ok() {
        let done = Arc::new(AtomicBool::new(false));
        let sampler_done = Arc::clone(&done);
        let sampler = thread::spawn(move || {
            while !sampler_done.load(Ordering::Relaxed) {
                push_sample();
                thread::sleep(PUSH_INTERVAL);
            }
        });
        run();
        done.store(true, Ordering::Relaxed);
        let _ = sampler.join();
    } else {
        run();
    }
}

/// Microbenchmarks for zguard.
///
/// Measures the cost of the cookie-guarded callbacks against the raw C heap
/// they ultimately draw from, for the request shapes zlib actually makes:
/// one zeroed state structure, and `items * size` window/hash buffers.
use std::ffi::c_void;
use std::hint::black_box;
use std::ptr;
use std::time::Instant;

use zguard::{zguard_alloc, zguard_free};

#[derive(Clone, Copy)]
enum Backend {
    Guarded,
    Raw,
}

impl Backend {
    fn name(self) -> &'static str {
        match self {
            Backend::Guarded => "zguard",
            Backend::Raw => "libc",
        }
    }

    #[inline(always)]
    unsafe fn alloc(self, items: u32, size: u32) -> *mut u8 {
        match self {
            Backend::Guarded => zguard_alloc(ptr::null_mut(), items, size) as *mut u8,
            Backend::Raw if items == 1 => libc::calloc(1, size as usize) as *mut u8,
            Backend::Raw => libc::malloc(items as usize * size as usize) as *mut u8,
        }
    }

    #[inline(always)]
    unsafe fn free(self, p: *mut u8) {
        match self {
            Backend::Guarded => zguard_free(ptr::null_mut(), p as *mut c_void),
            Backend::Raw => libc::free(p as *mut c_void),
        }
    }
}

/// Measure alloc/free latency for a given request shape, N iterations.
fn bench_alloc_free(backend: Backend, items: u32, size: u32, iterations: usize) -> f64 {
    let touch = std::cmp::min(items as usize * size as usize, 64);
    // Warmup
    for _ in 0..1000 {
        unsafe {
            let p = backend.alloc(black_box(items), black_box(size));
            ptr::write_bytes(p, 0xAB, touch);
            backend.free(black_box(p));
        }
    }
    let start = Instant::now();
    for _ in 0..iterations {
        unsafe {
            let p = backend.alloc(black_box(items), black_box(size));
            ptr::write_bytes(p, 0xAB, touch);
            backend.free(black_box(p));
        }
    }
    start.elapsed().as_nanos() as f64 / iterations as f64
}

/// Measure multi-threaded throughput.
fn bench_threaded_throughput(backend: Backend, num_threads: usize, ops_per_thread: usize) -> f64 {
    let start = Instant::now();
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            std::thread::spawn(move || {
                for _ in 0..ops_per_thread {
                    unsafe {
                        let p = backend.alloc(black_box(4), black_box(16));
                        ptr::write_bytes(p, 0xCD, 16);
                        backend.free(black_box(p));
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    let total_ops = num_threads * ops_per_thread;
    total_ops as f64 / start.elapsed().as_secs_f64()
}

fn main() {
    let iterations = 1_000_000;
    let shapes: [(u32, u32); 6] = [(1, 64), (1, 5952), (2, 4096), (32768, 2), (65536, 2), (8, 1024)];

    println!("=== zguard microbenchmarks ===\n");

    let mut summary = String::new();
    for backend in [Backend::Raw, Backend::Guarded] {
        println!("--- {} alloc/free latency (ns/op) ---", backend.name());
        for &(items, size) in &shapes {
            let ns = bench_alloc_free(backend, items, size, iterations);
            println!("  {:>6} x {:>5}: {:>8.1} ns", items, size, ns);
            summary.push_str(&format!("|{}_{}x{}={:.1}", backend.name(), items, size, ns));
        }

        println!("\n--- {} multi-threaded throughput (Mops/sec) ---", backend.name());
        for &threads in &[1, 2, 4, 8] {
            let mops = bench_threaded_throughput(backend, threads, iterations / threads) / 1_000_000.0;
            println!("  threads={}: {:>6.2} Mops/sec", threads, mops);
            if threads == 4 {
                summary.push_str(&format!("|{}_throughput_4t={:.2}", backend.name(), mops));
            }
        }
        println!();
    }

    // Print machine-parseable summary line
    println!("SUMMARY{}", summary);
}

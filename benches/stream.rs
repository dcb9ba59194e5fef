//! Criterion benchmarks for the block-framed stream API, including the
//! multithreaded encoder path.
//!
//! Run with:
//!   cargo bench --bench stream
//!
//! Optionally set TINYLZ_CORPUS_DIR for real-world corpus data.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tinylz::{InStream, OutStream, StreamParams};

mod corpus {
    include!("corpus.rs");
}

fn bench_stream_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_compress");
    let chunk_size = 4_194_304usize;
    let data = corpus::corpus_chunks(chunk_size).remove(0);

    for &num_threads in &[1usize, 4] {
        let params = StreamParams::default().with_num_threads(num_threads);
        group.throughput(Throughput::Bytes(chunk_size as u64));
        group.bench_with_input(
            BenchmarkId::new("num_threads", num_threads),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut out = OutStream::open(Vec::new(), params.clone()).unwrap();
                    out.write(data).unwrap();
                    out.close().unwrap()
                })
            },
        );
    }
    group.finish();
}

fn bench_stream_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_decompress");
    let chunk_size = 4_194_304usize;
    let data = corpus::corpus_chunks(chunk_size).remove(0);
    let params = StreamParams::default();

    let mut out = OutStream::open(Vec::new(), params.clone()).unwrap();
    out.write(&data).unwrap();
    let framed = out.close().unwrap();

    group.throughput(Throughput::Bytes(chunk_size as u64));
    group.bench_function("read_all", |b| {
        b.iter(|| {
            let mut instream = InStream::open(framed.as_slice(), params.clone()).unwrap();
            let mut buf = vec![0u8; 65536];
            let mut total = 0usize;
            loop {
                let n = instream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                total += n;
            }
            total
        })
    });
    group.finish();
}

criterion_group!(benches, bench_stream_compress, bench_stream_decompress);
criterion_main!(benches);

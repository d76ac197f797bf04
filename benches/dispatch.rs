//! Dispatch-loop throughput on a tight counting loop.

use criterion::{criterion_group, criterion_main, Criterion};

// A module with `run(n) -> i32` that counts a local from 0 to n and returns it.
fn counting_module() -> Vec<u8> {
    let mut wasm = vec![0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];
    // type: (i32) -> i32
    wasm.extend_from_slice(&[0x01, 0x06, 0x01, 0x60, 0x01, 0x7F, 0x01, 0x7F]);
    // function section
    wasm.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
    // export "run"
    wasm.extend_from_slice(&[0x07, 0x07, 0x01, 0x03, b'r', b'u', b'n', 0x00, 0x00]);
    // code: 1 local i32; loop { local1 += 1; br_if (local1 < local0) }; local1
    wasm.extend_from_slice(&[
        0x0A, 0x19, 0x01, 0x17, 0x01, 0x01, 0x7F, // one body, locals: 1 x i32
        0x03, 0x40, // loop
        0x20, 0x01, 0x41, 0x01, 0x6A, 0x21, 0x01, // local1 = local1 + 1
        0x20, 0x01, 0x20, 0x00, 0x48, // local1 < local0
        0x0D, 0x00, // br_if 0
        0x0B, // end loop
        0x20, 0x01, // local1
        0x0B, // end func
    ]);
    wasm
}

fn bench_dispatch(c: &mut Criterion) {
    use tidewasm::{Interpreter, Value};
    let wasm = counting_module();
    let mut interp = Interpreter::new(&wasm).unwrap();
    let run = interp.get_func("run").unwrap();

    c.bench_function("count_to_10k", |b| {
        b.iter(|| {
            let ret = interp.invoke(&run, &[Value::I32(10_000)]).unwrap();
            assert_eq!(ret, vec![Value::I32(10_000)]);
        })
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);

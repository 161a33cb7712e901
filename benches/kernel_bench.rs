use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shadeflow::config::RuntimeConfig;
use shadeflow::generate_graph;
use shadeflow::kernel::{eval_program, Instruction, RegisterFile, RotateMode};
use shadeflow::node::idname;
use shadeflow::rt::Runtime;
use shadeflow::vtree::TreeBuilder;

fn rotate_chain() -> Vec<Instruction> {
    let mut program = vec![
        Instruction::ValueV {
            value: [1.0, 0.0, 0.0],
            out: 0,
        },
        Instruction::ValueV {
            value: [0.0; 3],
            out: 3,
        },
        Instruction::ValueV {
            value: [0.3, 0.4, 0.5],
            out: 6,
        },
        Instruction::ValueF { value: 0.25, out: 9 },
    ];
    // Each step rotates the previous result, alternating axis-angle and Euler.
    for step in 0..32u8 {
        let input = if step == 0 { 0 } else { 10 + 3 * (step - 1) };
        let mode = if step % 2 == 0 {
            RotateMode::AxisAngle
        } else {
            RotateMode::EulerZyx
        };
        program.push(Instruction::vector_rotate(
            mode,
            input,
            6,
            3,
            6,
            9,
            10 + 3 * step as u32,
        ));
    }
    program
}

fn bench_eval_program(c: &mut Criterion) {
    let program = rotate_chain();
    let mut regs = RegisterFile::new();
    c.bench_function("eval_program_rotate_chain", |b| {
        b.iter(|| {
            eval_program(black_box(&program), &mut regs);
            black_box(&regs);
        })
    });
}

fn bench_run_lanes(c: &mut Criterion) {
    let runtime = Runtime::with_config(rotate_chain(), &RuntimeConfig::default()).unwrap();
    let mut lanes = vec![RegisterFile::new(); 4096];
    c.bench_function("run_lanes_4096", |b| {
        b.iter(|| {
            runtime.run_lanes(black_box(&mut lanes));
        })
    });
}

fn bench_generate_graph(c: &mut Criterion) {
    let mut builder = TreeBuilder::new();
    let mut prev = builder.node("r0", idname::VECTOR_ROTATE);
    for i in 1..200 {
        let next = builder.node(&format!("r{i}"), idname::VECTOR_ROTATE);
        builder.link(prev, "Vector", next, "Vector").unwrap();
        prev = next;
    }
    let tree = builder.build();
    c.bench_function("generate_graph_chain_200", |b| {
        b.iter(|| generate_graph(black_box(&tree)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_eval_program,
    bench_run_lanes,
    bench_generate_graph
);
criterion_main!(benches);

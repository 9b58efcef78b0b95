use criterion::{black_box, criterion_group, criterion_main, Criterion};
use patchwire::{patch, Config, Edge, Engine, Envelope, Event, Graph, Node, NodeKind, Scheduler, Slot};

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Scheduler::step, square -> lowpass -> sink", |b| {
        let mut graph = Graph::new(Config::default().process_context(), 4);
        let sink = graph.add_node(NodeKind::Sink).unwrap();
        let filter = graph
            .add(Node::new(NodeKind::LowPass, 256).with_edge(Edge::new(sink, Slot::ALL[0])))
            .unwrap();
        graph
            .add(Node::new(NodeKind::Square, 256).with_edge(Edge::new(filter, Slot::ALL[0])))
            .unwrap();
        let mut scheduler = Scheduler::new(graph);

        b.iter(|| black_box(scheduler.step()))
    });

    c.bench_function("demo patch, 512 samples", |b| {
        let (mut engine, _editor) = patch::demo(Config::default().running()).unwrap();
        let mut out = [0u8; 512 * 4];

        b.iter(|| engine.fill_block(black_box(&mut out)))
    });

    c.bench_function("64 oscillators into one sink, 512 samples", |b| {
        let (mut engine, mut editor) = Engine::new(Config::default().running());
        let sink = editor.add_node_at(NodeKind::Sink, 0.0, 0.0).unwrap();
        for i in 0..64 {
            let kind = if i % 2 == 0 { NodeKind::Sine } else { NodeKind::Square };
            let osc = editor.add_node_at(kind, i as f32, 100.0).unwrap();
            editor.connect(osc, sink, Slot::ALL[0]).unwrap();
        }
        let mut out = [0.0f32; 512];

        b.iter(|| engine.fill_f32(black_box(&mut out)))
    });

    c.bench_function("Envelope::advance, looping", |b| {
        let mut envelope = Envelope::new(patch::demo_pitch(96_000)).unwrap();
        let mut t = 0u64;

        b.iter(|| {
            t += 1;
            envelope.advance(black_box(t))
        })
    });

    c.bench_function("Envelope::advance, hour-long jump", |b| {
        let events = vec![Event::Set { at: 0, value: 1.0 }, Event::Loop { at: 7 }];
        let mut envelope = Envelope::new(events).unwrap();
        let mut t = 0u64;

        b.iter(|| {
            t += 96_000 * 3_600;
            envelope.advance(black_box(t))
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

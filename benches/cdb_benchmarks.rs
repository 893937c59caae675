use cdb_core::lexer::{Lexer, TokenKind};
use cdb_core::{parse_str_with, ConfigurationDatabase, Engine, ParseOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ============================================================================
// Test Data: Varying Complexity and Size
// ============================================================================

const TINY_CFG: &str = "Value = 42";

const SMALL_CFG: &str = r#"
Name = "test"
Version = (float64) 1.0
Enabled = true
Tags = { a b c }
"#;

const MEDIUM_CFG: &str = r#"
/* Real-time application */
Application = {
    Class = RealTimeApplication
    Functions = {
        Timer = {
            Class = IOGAM
            Period = (float64) 0.001
            Signals = { Counter Time }
        }
        Filter = {
            Class = FilterGAM
            Num = (float32) { 0.1 0.2 0.3 0.4 }
            Den = (float32) { 1 }
            Gains = (int16) { { 1 2 3 } { 4 5 6 } { 7 8 9 } }
        }
    }
    Scheduler = *Application.Functions.Timer
}
"#;

// Generate a large document for stress testing
fn generate_xlarge_cfg(groups: usize) -> String {
    let mut cfg = String::from("Items = {\n");
    for i in 0..groups {
        cfg.push_str(&format!(
            "    Item{i} = {{ Id = (uint32) {i} Name = \"Item {i}\" Values = {{ {} {} {} }} }}\n",
            i,
            i * 10,
            i * 100
        ));
    }
    cfg.push_str("}\n");
    cfg
}

const ENGINES: [(&str, Engine); 2] = [
    ("state_machine", Engine::StateMachine),
    ("table_driven", Engine::TableDriven),
];

// ============================================================================
// Lexer Benchmarks
// ============================================================================

fn lex_all(source: &str) -> usize {
    let mut lexer = Lexer::new(source.chars());
    let mut count = 0;
    while lexer.next_token().kind != TokenKind::End {
        count += 1;
    }
    count
}

fn bench_lexer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer_by_size");

    for (name, source) in [("tiny", TINY_CFG), ("small", SMALL_CFG), ("medium", MEDIUM_CFG)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| lex_all(black_box(src)))
        });
    }

    group.finish();
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parser_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_by_size");

    for (engine_name, engine) in ENGINES {
        let options = ParseOptions::with_engine(engine);
        for (name, source) in [("tiny", TINY_CFG), ("small", SMALL_CFG), ("medium", MEDIUM_CFG)] {
            group.throughput(Throughput::Bytes(source.len() as u64));
            group.bench_with_input(BenchmarkId::new(engine_name, name), source, |b, src| {
                b.iter(|| parse_str_with(black_box(src), &options))
            });
        }
    }

    group.finish();
}

fn bench_parser_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_group_scaling");

    for size in [10, 100, 1000] {
        let source = generate_xlarge_cfg(size);
        group.throughput(Throughput::Elements(size as u64));
        for (engine_name, engine) in ENGINES {
            let options = ParseOptions::with_engine(engine);
            group.bench_with_input(BenchmarkId::new(engine_name, size), &source, |b, src| {
                b.iter(|| {
                    let mut db = ConfigurationDatabase::new();
                    cdb_core::parse(black_box(src).chars(), &mut db, &options, None)
                })
            });
        }
    }

    group.finish();
}

// ============================================================================
// End-to-End Benchmarks
// ============================================================================

fn bench_e2e_with_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("e2e_with_json_serialization");

    for (name, source) in [("small", SMALL_CFG), ("medium", MEDIUM_CFG)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, src| {
            b.iter(|| {
                let result = cdb_core::parse_str(black_box(src)).unwrap();
                result.to_json()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(lexer_benches, bench_lexer_sizes);

criterion_group!(parser_benches, bench_parser_sizes, bench_parser_scaling);

criterion_group!(e2e_benches, bench_e2e_with_serialization);

criterion_main!(lexer_benches, parser_benches, e2e_benches);

use chisel_bind::lexer::{Lexer, Token};
use chisel_decoders::utf8::Utf8Decoder;
use criterion::{criterion_group, criterion_main, Criterion};
use std::fs::File;
use std::io::BufReader;

macro_rules! build_lex_benchmark {
    ($func : tt, $filename : expr) => {
        fn $func() {
            let f = File::open(format!("fixtures/json/bench/{}.json", $filename)).unwrap();
            let mut reader = BufReader::new(f);
            let mut chars = Utf8Decoder::new(&mut reader);
            let mut lexer = Lexer::new(&mut chars);
            loop {
                match lexer.consume() {
                    Ok(t) => {
                        if t.0 == Token::EndOfInput {
                            break;
                        }
                    }
                    Err(err) => {
                        println!("error occurred: {:?}", err);
                        break;
                    }
                }
            }
        }
    };
}

build_lex_benchmark!(events, "events");
build_lex_benchmark!(keyed, "keyed");
build_lex_benchmark!(simple, "simple");

fn benchmark_events(c: &mut Criterion) {
    c.bench_function("lex of events", |b| b.iter(events));
}
fn benchmark_keyed(c: &mut Criterion) {
    c.bench_function("lex of keyed", |b| b.iter(keyed));
}
fn benchmark_simple(c: &mut Criterion) {
    c.bench_function("lex of simple", |b| b.iter(simple));
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = benchmark_events, benchmark_keyed, benchmark_simple
}
criterion_main!(benches);

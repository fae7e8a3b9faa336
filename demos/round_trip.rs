use chisel_bind::bind_object;
use chisel_bind::parser::Binder;
use indexmap::IndexMap;

#[derive(Debug, PartialEq)]
struct Quote {
    bid: f64,
    ask: f64,
}

bind_object!(Quote {
    bid: f64,
    ask: f64,
});

#[derive(Debug, PartialEq)]
struct Board {
    prices: IndexMap<String, Quote>,
}

bind_object!(Board {
    prices: IndexMap<String, Quote>,
});

/// Decode the price board, nudge one of the quotes, and write the whole thing straight back
/// out as compact JSON
fn main() {
    let binder = Binder::default();
    let mut board: Board = binder
        .decode_file("fixtures/json/bench/keyed.json")
        .unwrap();
    if let Some(quote) = board.prices.get_mut("sym0000") {
        quote.bid += 0.01;
    }
    let encoded = binder.encode(&board).unwrap();
    println!(
        "{} quotes re-encoded into {} bytes",
        board.prices.len(),
        encoded.len()
    );
}

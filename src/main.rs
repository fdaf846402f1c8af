use listmark::parse_blocks;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .expect("Failed to read stdin");
    let ast = parse_blocks(&input);
    let output = serde_json::to_string_pretty(&ast).expect("Failed to serialize block tree");
    println!("{}", output);
}

//! Generate a gateway API key
//!
//! Usage: cargo run --bin conduit-keygen
//!
//! Prints a random `sk-` key suitable for the `API_KEY` variable.

use rand::distr::Alphanumeric;
use rand::Rng;

const KEY_PREFIX: &str = "sk-";
const KEY_LENGTH: usize = 32;

fn generate_api_key(length: usize) -> String {
    let body: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    format!("{}{}", KEY_PREFIX, body)
}

fn main() {
    let api_key = generate_api_key(KEY_LENGTH);
    println!("Generated API Key: {}", api_key);
    println!("Set it as environment variable: export API_KEY='{}'", api_key);
}

// This binary crate is intentionally minimal.
// All engine logic lives in the library (src/lib.rs and its modules).
// Run demos with:
//   cargo run --example iris
fn main() {
    println!("magnetite-nn: a from-scratch neural network training engine in Rust.");
    println!("Run `cargo run --example iris` to train the three-class demo.");
}

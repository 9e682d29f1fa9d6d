fn main() {
    if let Err(e) = quantum_viz_lib::run() {
        eprintln!("quantum-viz: {}", e);
        std::process::exit(1);
    }
}

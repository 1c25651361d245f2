use std::process;

fn main() {
    if let Err(e) = rask::cli::run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

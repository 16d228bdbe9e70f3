fn main() {
    if let Err(err) = collection_grid::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

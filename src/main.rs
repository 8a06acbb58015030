fn main() {
    if let Err(err) = lot_intake::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

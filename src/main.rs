fn main() {
    if let Err(err) = rankings_dashboard::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

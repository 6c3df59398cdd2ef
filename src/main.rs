fn main() {
    if let Err(e) = urlplay_lib::run() {
        log::error!("{}", e);
        eprintln!("urlplay: {e}");
        std::process::exit(1);
    }
}

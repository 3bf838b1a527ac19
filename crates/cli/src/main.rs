fn main() {
    stamper_cli::init_logging();

    if let Err(error) = stamper_cli::run(std::env::args_os()) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

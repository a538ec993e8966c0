fn main() {
    #[cfg(feature = "cli")]
    diffable::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("diffable: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

use tracing_subscriber::EnvFilter;

/// stderr로 로그를 출력한다. RUST_LOG가 있으면 그 설정을 따른다.
pub fn init(verbose: bool) {
    let default_level = if verbose { "songdeck=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_env_filter(filter)
        .try_init();
}

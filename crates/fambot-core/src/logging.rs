use tracing_subscriber::EnvFilter;

/// Initialize tracing for the bot.
///
/// Default level is `info` (`debug` with the debug flag); `RUST_LOG`
/// overrides. The JSON flag mirrors the structured-log output the
/// deployment's log shipper expects.
pub fn init(debug: bool, json: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

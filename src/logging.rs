/**
 * Logging setup. Logs go to standard error so a packet printed on standard output
 * stays clean.
 */
use std::io;


pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "quizpacket=debug"
    } else {
        "quizpacket=info"
    }
}


/// Install the global subscriber, reading `RUST_LOG` if it is set. Calling this more
/// than once is harmless.
pub fn init(verbose: bool) {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| default_filter(verbose).to_owned());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

//! protopack - builds distro packages from a proto area.
//!
//! One invocation builds every catalog package that applies to the requested
//! (distro, arch) pair, one after another.

use protopack::cli;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            1
        }
    };

    process::exit(exit_code);
}

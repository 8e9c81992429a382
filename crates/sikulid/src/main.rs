//! Entry point for the `sikulid` command server.

use std::process::ExitCode;
use std::thread;

use sikuli_config::{ConfigError, ServerConfig};
use sikulid::{Server, ShutdownSignal, StopTrigger, SystemShutdownSignal, telemetry};
use tracing::{error, warn};

const MAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");

fn main() -> ExitCode {
    let loaded = match ServerConfig::load() {
        Ok(loaded) => loaded,
        Err(ConfigError::Cli(error)) => error.exit(),
    };

    if let Err(error) = telemetry::initialise(&loaded.config) {
        report_without_telemetry(&error);
        return ExitCode::FAILURE;
    }
    for warning in &loaded.warnings {
        warn!(target: MAIN_TARGET, %warning, "configuration fallback applied");
    }

    let server = Server::new(loaded.config);
    spawn_signal_listener(server.stop_trigger());

    match server.start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(target: MAIN_TARGET, %error, "server terminated");
            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stderr, reason = "tracing is not installed")]
fn report_without_telemetry(error: &telemetry::TelemetryError) {
    eprintln!("sikulid: {error}");
}

fn spawn_signal_listener(trigger: StopTrigger) {
    let spawned = thread::Builder::new()
        .name(String::from("sikulid-signals"))
        .spawn(move || match SystemShutdownSignal::new().wait() {
            Ok(()) => {
                trigger.stop();
            }
            Err(error) => {
                warn!(target: MAIN_TARGET, %error, "shutdown signals unavailable");
            }
        });
    if let Err(error) = spawned {
        warn!(target: MAIN_TARGET, %error, "failed to spawn signal listener");
    }
}

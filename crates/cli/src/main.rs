use std::process::ExitCode;

fn main() -> ExitCode {
    forecast_cli::run()
}

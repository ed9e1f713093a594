use std::process::ExitCode;

fn main() -> ExitCode {
    pourwatch_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    roomquote_cli::run()
}

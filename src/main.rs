use std::process::ExitCode;

fn main() -> ExitCode {
    weakspec::cli::run()
}

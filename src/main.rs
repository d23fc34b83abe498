//
// main.rs
// Dicom-Deid-rs
//
// Entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_deid::cli;

fn main() -> anyhow::Result<()> {
    // Delegate all argument parsing and dispatching to the CLI module.
    cli::run()
}

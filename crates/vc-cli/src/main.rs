use atty::Stream;
use clap::Parser;
use color_eyre::Result;

mod cli;
mod dispatch;
mod output;
mod style;

use cli::VcCli;
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = VcCli::parse();
    init_tracing(cli.trace, cli.verbose);

    let outcome = dispatch::dispatch(&cli);
    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    let code = output::emit_output(&cli, &style, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("vc={level},vc_cli={level},vc_core={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

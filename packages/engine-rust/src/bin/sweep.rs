use clap::Parser;
use sweep_engine::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli::init_tracing(cli.log_format) {
        eprintln!("warning: logging disabled: {e}");
    }

    let code = match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            cli::exit_code(&e)
        }
    };
    // Exit directly: a pending stdin read would otherwise hold the runtime open.
    std::process::exit(code);
}

use clap::Parser;
use dotenv::dotenv;
use groq_chat::cli::{ Args, LogSink };
use std::error::Error;
use std::fs::OpenOptions;
use std::io;

fn init_logging(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let default_level = if args.debug { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    match args.log_sink() {
        LogSink::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // RUST_LOG module directives survive a level filter, so drop the output itself.
        LogSink::Discard => {
            builder.filter_level(log::LevelFilter::Off);
            builder.target(env_logger::Target::Pipe(Box::new(io::sink())));
        }
        LogSink::Stderr => {}
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    init_logging(&args)?;

    groq_chat::run(args).await
}

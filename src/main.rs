use clap::Parser;
use log::error;
use pgsubset::cli::Cli;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let json_summary = cli.json_summary;

    let result = match cli.into_config() {
        Ok(config) => pgsubset::run(&config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            if json_summary {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => eprintln!("{}", json),
                    Err(e) => error!("failed to serialize summary: {}", e),
                }
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_caller_error() {
                eprintln!("hint: fix the configuration and run again");
            }
            std::process::exit(1);
        }
    }
}

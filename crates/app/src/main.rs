use clap::Parser;

mod cli;
mod commands;
mod error;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = cli::Cli::parse();
    let settings = settings::load(&cli.overrides)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fintrack={level},engine={level},remote={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let app = match commands::App::connect(settings).await {
        Ok(app) => app,
        Err(err) => {
            tracing::error!("failed to initialize: {err}");
            return Err(err.into());
        }
    };
    app.run(cli.command).await?;

    Ok(())
}

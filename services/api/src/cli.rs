use crate::demo::{run_analyze, run_demo, run_kpis, AnalyzeArgs, DemoArgs, KpisArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use realty_kpi::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Realty KPI Analyzer",
    about = "Compute real-estate investment KPIs over property portfolios",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// List the KPI catalog or the input fields a selection needs
    Kpis(KpisArgs),
    /// Analyze a JSON dataset of property records
    Analyze(AnalyzeArgs),
    /// Run a two-property USD/EUR portfolio through the engine
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Kpis(args) => run_kpis(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["realty-kpi-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn analyze_accepts_repeated_kpis_and_target() {
        let cli = Cli::try_parse_from([
            "realty-kpi-api",
            "analyze",
            "--dataset",
            "portfolio.json",
            "--kpi",
            "cap_rate",
            "--kpi",
            "dscr",
            "--target",
            "eur",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Analyze(args)) => {
                assert_eq!(args.kpi, vec!["cap_rate".to_string(), "dscr".to_string()]);
                assert_eq!(args.target.expect("target").as_str(), "EUR");
            }
            other => panic!("expected analyze command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_target_currency_is_rejected_at_parse_time() {
        let parsed = Cli::try_parse_from([
            "realty-kpi-api",
            "analyze",
            "--dataset",
            "portfolio.json",
            "--kpi",
            "noi",
            "--target",
            "ZZZ",
        ]);
        assert!(parsed.is_err());
    }
}

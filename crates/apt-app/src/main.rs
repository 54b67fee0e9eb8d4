mod cli;
mod error;

use apt_core::CancelToken;
use apt_pipeline::{PipelineController, SessionState};
use apt_store::GraphStore;
use clap::Parser;

use cli::{Cli, Command};
use error::Error;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Analyze(args) => {
            let params = args.params.resolve()?;
            let store = GraphStore::open(args.input_dir.clone());
            let mut session = SessionState::new(store);
            let controller = PipelineController::new();
            let cancel = CancelToken::new();

            let output = controller.analyze(&mut session, params, &cancel, |event| {
                log::info!("stage {} ({:?}): {}", event.stage, event.elapsed, event.message);
            })?;

            match output {
                Some(output) => {
                    println!("{}", output.summary_html);
                    for entry in &output.ranking.entries {
                        println!("{:>8.4}  {}", entry.index, entry.name);
                    }
                    if let Some(report) = &output.apt_report {
                        println!("TOP for first APT: {:.2}%", report.worst_top_percentile);
                    }
                }
                None => println!("query cancelled"),
            }
            Ok(())
        }
        Command::Roc(args) => {
            let params = args.params.resolve()?;
            let store = GraphStore::open(args.input_dir.clone());
            let mut session = SessionState::new(store);
            let controller = PipelineController::new();
            let cancel = CancelToken::new();

            let output = controller.analyze(&mut session, params, &cancel, |_| {})?;
            match output {
                Some(output) => {
                    let points = apt_algos::roc_points(&output.ranking, args.total_domains, args.total_apt);
                    print!("{}", apt_algos::roc_csv(&points));
                }
                None => eprintln!("query cancelled"),
            }
            Ok(())
        }
    }
}

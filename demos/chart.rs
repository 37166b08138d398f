use anyhow::{bail, Result};
use mlflow_dashboard::{
    backend::rest::Server,
    dashboard::{Dashboard, Event, Level},
    series::Shaper,
    summary::metric_rows,
    Config, ExperimentId,
};
use tracing_subscriber::EnvFilter;

struct Args {
    experiment: String,
    run: String,
}

impl Args {
    pub fn from_env() -> Result<Self> {
        let mut args = pico_args::Arguments::from_env();
        Ok(Args {
            experiment: args.value_from_str(["-e", "--experiment"])?,
            run: args.value_from_str(["-r", "--run"])?,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::from_env()?;
    let config = Config::default().with_env_overrides();
    let mut server = Server::with_config(&config);
    let mut dashboard = Dashboard::new();

    let experiment = mlflow_dashboard::api::experiment::Experiment {
        experiment_id: ExperimentId::from(args.experiment),
        name: String::new(),
    };
    let state = dashboard.open_experiment(experiment, &mut server, &config);
    if let Some(notification) = state.notification.as_ref().filter(|n| n.level == Level::Error) {
        bail!("{}", notification.description);
    }

    dashboard.dispatch(Event::SelectRun(args.run.as_str().into()));
    let state = dashboard.state();
    let run = match state.selected_run() {
        Some(run) => run,
        None => bail!("run {} not found in experiment", args.run),
    };
    let chart = match state.chart(&Shaper::from_config(&config)) {
        Some(chart) if !chart.is_empty() => chart,
        _ => {
            println!("No metric data available for visualization");
            return Ok(());
        }
    };

    println!("labels: {}", chart.labels.join(" | "));
    for series in &chart.series {
        println!("{} ({})", series.key, series.color);
        for point in &series.points {
            println!("  {:<18} {:>14}  {}", point.label, point.timestamp, point.value);
        }
    }

    println!();
    for row in metric_rows(run) {
        println!("{:<24} {}", row.key, row.value);
    }
    for (key, value) in run.params() {
        println!("{:<24} {}", key, value);
    }

    Ok(())
}

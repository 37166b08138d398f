use anyhow::{Context, Result};
use mlflow_dashboard::{
    backend::rest::Server,
    dashboard::{Dashboard, Event, Level},
    series::Shaper,
    Config,
};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    search: Option<String>,
    experiment: Option<String>,
}

impl Args {
    pub fn from_env() -> Result<Self> {
        let mut args = pico_args::Arguments::from_env();
        Ok(Args {
            config: args.opt_value_from_str(["-c", "--config"])?,
            search: args.opt_value_from_str(["-s", "--search"])?,
            experiment: args.opt_value_from_str(["-e", "--experiment"])?,
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
    let config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    }
    .with_env_overrides();
    let mut server = Server::with_config(&config);
    let shaper = Shaper::from_config(&config);
    let mut dashboard = Dashboard::new();

    let mut state = dashboard.refresh_experiments(&mut server, &config);
    if let Some(search) = args.search {
        dashboard.dispatch(Event::Search(search));
        state = dashboard.state();
    }
    if let Some(notification) = &state.notification {
        println!("{}: {}", notification.title, notification.description);
        if notification.level == Level::Error {
            return Ok(());
        }
    }

    println!("{} experiments, {} shown", state.experiments.len(), state.filtered.len());
    for experiment in state.filtered.iter() {
        println!("  {:>6}  {}", experiment.experiment_id.as_ref(), experiment.name);
    }

    let id = match args.experiment {
        Some(id) => id,
        None => return Ok(()),
    };
    let experiment = state
        .experiments
        .iter()
        .find(|experiment| experiment.experiment_id.as_ref() == id)
        .cloned()
        .with_context(|| format!("no experiment with id {}", id))?;

    let state = dashboard.open_experiment(experiment, &mut server, &config);
    if let Some(notification) = &state.notification {
        println!("{}: {}", notification.title, notification.description);
    }
    for summary in state.run_summaries(&shaper) {
        println!(
            "  {}...  {:<24} {:<10} {:<18} {} metrics",
            summary.short_id, summary.display_name, summary.status, summary.started, summary.metric_count
        );
        for row in &summary.preview {
            println!("      {} = {}", row.key, row.value);
        }
    }

    Ok(())
}

//! A read-only client for MLflow tracking servers.
//!
//! Lists experiments and runs by following the server's page tokens to the
//! end, and shapes a run's metric samples into line chart series.
//!
//! ```no_run
//! use mlflow_dashboard::{backend::rest::Server, paging, series::Shaper, Config};
//!
//! let config = Config::default().with_env_overrides();
//! let mut server = Server::with_config(&config);
//! let experiments = paging::list_experiments(&mut server, &config)?;
//! for experiment in &experiments {
//!     let runs = paging::list_runs(&mut server, &config, &experiment.experiment_id)?;
//!     if let Some(run) = runs.first() {
//!         let chart = Shaper::from_config(&config).shape(run.metrics());
//!         println!("{}: {} series", experiment.name, chart.series.len());
//!     }
//! }
//! # Ok::<(), mlflow_dashboard::api::error::FetchError>(())
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod paging;
pub mod retry;
pub mod series;
pub mod summary;

pub use api::client::Client;
pub use api::id::{ExperimentId, RunId};
pub use config::Config;

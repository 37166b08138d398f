//! Dashboard state as a sequence of immutable snapshots.
//!
//! Every [`Event`] passed to [`Dashboard::dispatch`] produces at most one new
//! [`AppState`]. Fetches are described by a [`Request`] that can be carried
//! out anywhere, even on another thread, and fed back as
//! [`Event::Completed`]. Each request carries a generation; starting a newer
//! request of the same kind, selecting another experiment or leaving the
//! experiment makes older completions stale, and stale completions are
//! dropped without touching the state.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    api::{client::Client, error::FetchError, experiment::Experiment, run::Run},
    config::Config,
    paging,
    series::{Chart, Shaper},
    summary::RunSummary,
    ExperimentId, RunId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Experiments,
    Runs,
}

/// Identifies one started fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub operation: Operation,
    generation: u64,
}

/// A fetch the caller should perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Experiments(Ticket),
    Runs(Ticket, ExperimentId),
}

impl Request {
    pub fn ticket(&self) -> Ticket {
        match self {
            Request::Experiments(ticket) | Request::Runs(ticket, _) => *ticket,
        }
    }

    /// Runs the aggregation and wraps the outcome as the event to dispatch.
    pub fn perform(&self, client: &mut dyn Client, config: &Config) -> Event {
        let completion = match self {
            Request::Experiments(_) => Completion::Experiments(paging::list_experiments(client, config)),
            Request::Runs(_, experiment) => Completion::Runs(paging::list_runs(client, config, experiment)),
        };
        Event::Completed(self.ticket(), completion)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Experiments(Result<Vec<Experiment>, FetchError>),
    Runs(Result<Vec<Run>, FetchError>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    RefreshExperiments,
    Search(String),
    SelectExperiment(Experiment),
    SelectRun(RunId),
    CloseChart,
    Back,
    Completed(Ticket, Completion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// A user facing message about the outcome of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: String,
    /// Classified error kind, for failures.
    pub kind: Option<&'static str>,
    pub status: Option<u16>,
}

impl Notification {
    fn success(title: &str, description: String) -> Self {
        Notification {
            level: Level::Success,
            title: title.to_owned(),
            description,
            kind: None,
            status: None,
        }
    }

    fn failure(title: &str, error: &FetchError) -> Self {
        Notification {
            level: Level::Error,
            title: title.to_owned(),
            description: format!("{}: {}", error.kind(), error),
            kind: Some(error.kind()),
            status: error.status(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub experiments: Arc<Vec<Experiment>>,
    pub search: String,
    /// `experiments` matching `search`.
    pub filtered: Arc<Vec<Experiment>>,
    pub selected_experiment: Option<Experiment>,
    pub runs: Arc<Vec<Run>>,
    pub selected_run: Option<RunId>,
    pub show_chart: bool,
    pub loading: bool,
    pub notification: Option<Notification>,
}

impl AppState {
    pub fn selected_run(&self) -> Option<&Run> {
        let selected = self.selected_run.as_ref()?;
        self.runs.iter().find(|run| run.id() == selected)
    }

    /// The chart of the selected run while the chart panel is open.
    pub fn chart(&self, shaper: &Shaper) -> Option<Chart> {
        if !self.show_chart {
            return None;
        }
        self.selected_run().map(|run| shaper.shape(run.metrics()))
    }

    pub fn run_summaries(&self, shaper: &Shaper) -> Vec<RunSummary> {
        self.runs.iter().map(|run| RunSummary::new(run, shaper)).collect()
    }

    fn refilter(&mut self) {
        let filtered = self
            .experiments
            .iter()
            .filter(|experiment| experiment.matches(&self.search))
            .cloned()
            .collect();
        self.filtered = Arc::new(filtered);
    }
}

/// What a dispatched event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Applied,
    /// Applied, and the caller should now perform this request.
    Fetch(Request),
    /// A completion for a request that is no longer active. Nothing changed.
    Stale,
}

#[derive(Debug, Default)]
struct Generations {
    next: u64,
    experiments: Option<u64>,
    runs: Option<u64>,
}

impl Generations {
    fn slot(&mut self, operation: Operation) -> &mut Option<u64> {
        match operation {
            Operation::Experiments => &mut self.experiments,
            Operation::Runs => &mut self.runs,
        }
    }

    fn begin(&mut self, operation: Operation) -> Ticket {
        self.next += 1;
        let generation = self.next;
        *self.slot(operation) = Some(generation);
        Ticket { operation, generation }
    }

    /// Consumes the ticket if it is the active one.
    fn accept(&mut self, ticket: Ticket) -> bool {
        let slot = self.slot(ticket.operation);
        if *slot == Some(ticket.generation) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn invalidate(&mut self, operation: Operation) {
        *self.slot(operation) = None;
    }

    fn pending(&self) -> bool {
        self.experiments.is_some() || self.runs.is_some()
    }
}

#[derive(Debug, Default)]
pub struct Dashboard {
    state: Arc<AppState>,
    generations: Generations,
}

impl Dashboard {
    pub fn new() -> Self {
        Dashboard::default()
    }

    /// The current snapshot. Later events never modify it.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn dispatch(&mut self, event: Event) -> Transition {
        let mut next = (*self.state).clone();
        let transition = match event {
            Event::RefreshExperiments => {
                let ticket = self.generations.begin(Operation::Experiments);
                Transition::Fetch(Request::Experiments(ticket))
            }
            Event::Search(search) => {
                next.search = search;
                next.refilter();
                Transition::Applied
            }
            Event::SelectExperiment(experiment) => {
                let ticket = self.generations.begin(Operation::Runs);
                let id = experiment.experiment_id.clone();
                next.selected_experiment = Some(experiment);
                next.runs = Arc::default();
                next.selected_run = None;
                next.show_chart = false;
                Transition::Fetch(Request::Runs(ticket, id))
            }
            Event::SelectRun(run) => {
                next.selected_run = Some(run);
                next.show_chart = true;
                Transition::Applied
            }
            Event::CloseChart => {
                next.show_chart = false;
                Transition::Applied
            }
            Event::Back => {
                self.generations.invalidate(Operation::Runs);
                next.selected_experiment = None;
                next.runs = Arc::default();
                next.selected_run = None;
                next.show_chart = false;
                Transition::Applied
            }
            Event::Completed(ticket, completion) => {
                if !self.generations.accept(ticket) {
                    debug!(operation = ?ticket.operation, generation = ticket.generation, "dropping stale completion");
                    return Transition::Stale;
                }
                complete(&mut next, completion);
                Transition::Applied
            }
        };
        next.loading = self.generations.pending();
        self.state = Arc::new(next);
        transition
    }

    /// Fetches all experiments and applies the result.
    pub fn refresh_experiments(&mut self, client: &mut dyn Client, config: &Config) -> Arc<AppState> {
        self.drive(Event::RefreshExperiments, client, config)
    }

    /// Selects `experiment`, fetches its runs and applies the result.
    pub fn open_experiment(&mut self, experiment: Experiment, client: &mut dyn Client, config: &Config) -> Arc<AppState> {
        self.drive(Event::SelectExperiment(experiment), client, config)
    }

    fn drive(&mut self, event: Event, client: &mut dyn Client, config: &Config) -> Arc<AppState> {
        if let Transition::Fetch(request) = self.dispatch(event) {
            let completed = request.perform(client, config);
            self.dispatch(completed);
        }
        self.state()
    }
}

fn complete(state: &mut AppState, completion: Completion) {
    match completion {
        Completion::Experiments(Ok(experiments)) => {
            info!(count = experiments.len(), "experiments loaded");
            state.notification = Some(Notification::success(
                "Experiments loaded",
                format!("Successfully loaded {} experiments", experiments.len()),
            ));
            state.experiments = Arc::new(experiments);
            state.refilter();
        }
        Completion::Experiments(Err(error)) => {
            warn!(%error, "loading experiments failed");
            state.notification = Some(Notification::failure("Error loading experiments", &error));
        }
        Completion::Runs(Ok(runs)) => {
            info!(count = runs.len(), "runs loaded");
            state.notification = Some(Notification::success(
                "Runs loaded",
                format!("Found {} runs for this experiment", runs.len()),
            ));
            state.runs = Arc::new(runs);
        }
        Completion::Runs(Err(error)) => {
            warn!(%error, "loading runs failed");
            state.runs = Arc::default();
            state.notification = Some(Notification::failure("Error loading runs", &error));
        }
    }
}

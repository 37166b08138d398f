use crate::api::{
    error::PageError,
    experiment::Experiment,
    id::ExperimentId,
    run::Run,
    search::{Page, PageToken},
};

/// Sort order the dashboard requests runs in.
pub const RUNS_ORDER_BY: &str = "start_time DESC";

/// One request per call. Pagination and retries live in [`crate::paging`] and [`crate::retry`].
#[rustfmt::skip]
pub trait Client {
    fn search_experiments(&mut self, max_results: u32, page_token: Option<&PageToken>) -> Result<Page<Experiment>, PageError>;
    fn search_runs(&mut self, experiment: &ExperimentId, max_results: u32, order_by: &str, page_token: Option<&PageToken>) -> Result<Page<Run>, PageError>;
}

//! Materializing whole lists from the paginated search endpoints.

use tracing::{debug, info};

use crate::{
    api::{
        client::{Client, RUNS_ORDER_BY},
        error::FetchError,
        experiment::Experiment,
        run::Run,
        search::{Page, PageToken},
    },
    config::Config,
    ExperimentId,
};

/// Follows page tokens until the server stops sending one.
///
/// Items are appended in the order received. Pages without items do not end
/// the loop, only a missing token does. The first error aborts the whole
/// aggregation and whatever was collected so far is dropped.
pub fn collect_pages<T, F>(mut fetch: F) -> Result<Vec<T>, FetchError>
where
    F: FnMut(Option<&PageToken>) -> Result<Page<T>, FetchError>,
{
    let mut items = Vec::new();
    let mut token: Option<PageToken> = None;
    let mut pages = 0usize;
    loop {
        let page = fetch(token.as_ref())?;
        pages += 1;
        debug!(
            page = pages,
            items = page.items.len(),
            has_next = page.next_page_token.is_some(),
            "fetched page"
        );
        items.extend(page.items);
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(items)
}

/// All experiments, minus the one whose name matches `config.excluded_experiment` exactly.
pub fn list_experiments(client: &mut dyn Client, config: &Config) -> Result<Vec<Experiment>, FetchError> {
    let policy = config.retry_policy();
    let page_size = config.experiments_page_size;
    let experiments = collect_pages(|token| {
        policy.call("experiments/search", || client.search_experiments(page_size, token))
    })?;
    let fetched = experiments.len();
    let experiments = exclude_named(experiments, config.excluded_experiment.as_deref());
    info!(
        fetched,
        kept = experiments.len(),
        "loaded experiments"
    );
    Ok(experiments)
}

/// All runs of one experiment, newest first as ordered by the server.
pub fn list_runs(client: &mut dyn Client, config: &Config, experiment: &ExperimentId) -> Result<Vec<Run>, FetchError> {
    let policy = config.retry_policy();
    let page_size = config.runs_page_size;
    let runs = collect_pages(|token| {
        policy.call("runs/search", || client.search_runs(experiment, page_size, RUNS_ORDER_BY, token))
    })?;
    info!(experiment = %experiment, runs = runs.len(), "loaded runs");
    Ok(runs)
}

fn exclude_named(experiments: Vec<Experiment>, excluded: Option<&str>) -> Vec<Experiment> {
    match excluded {
        Some(excluded) => experiments.into_iter().filter(|e| e.name != excluded).collect(),
        None => experiments,
    }
}

#[cfg(test)]
mod tests {
    use super::{collect_pages, exclude_named, list_experiments, list_runs};
    use crate::{
        api::{
            client::{Client, RUNS_ORDER_BY},
            error::{FetchError, PageError},
            experiment::Experiment,
            run::{Run, RunData, RunInfo},
            search::{Page, PageToken},
        },
        config::Config,
        ExperimentId,
    };
    use nanorand::{WyRand, RNG};
    use std::collections::VecDeque;

    /// Hands out pages `t0 -> t1 -> ... -> absent` and records every token it was asked for.
    struct Pages<T> {
        pages: Vec<Vec<T>>,
        requested: Vec<Option<String>>,
    }

    impl<T: Clone> Pages<T> {
        fn new(pages: Vec<Vec<T>>) -> Self {
            Pages { pages, requested: Vec::new() }
        }

        fn fetch(&mut self, token: Option<&PageToken>) -> Result<Page<T>, FetchError> {
            self.requested.push(token.map(|t| t.as_ref().to_owned()));
            let index = match token {
                None => 0,
                Some(token) => token.as_ref().trim_start_matches('t').parse::<usize>().unwrap(),
            };
            let next = index + 1;
            let next_page_token = if next < self.pages.len() {
                Some(PageToken::from(format!("t{}", next)))
            } else {
                None
            };
            Ok(Page::new(self.pages.get(index).cloned().unwrap_or_default(), next_page_token))
        }
    }

    #[test]
    fn concatenates_pages_in_order() {
        let mut pages = Pages::new(vec![vec![1, 2], vec![], vec![3], vec![], vec![4, 5, 6]]);
        let items = collect_pages(|token| pages.fetch(token)).unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            pages.requested,
            vec![None, Some("t1".into()), Some("t2".into()), Some("t3".into()), Some("t4".into())]
        );
    }

    #[test]
    fn single_empty_page_yields_nothing() {
        let mut calls = 0;
        let items = collect_pages(|_| {
            calls += 1;
            Ok(Page::<u8>::last(Vec::new()))
        })
        .unwrap();
        assert!(items.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn random_page_splits_concatenate() {
        let mut rng = WyRand::new_seed(42);
        for _ in 0..200 {
            let page_count = 1 + (rng.generate::<u16>() % 8) as usize;
            let mut next = 0u32;
            let mut split = Vec::new();
            for _ in 0..page_count {
                let len = (rng.generate::<u16>() % 4) as u32;
                split.push((next..next + len).collect::<Vec<_>>());
                next += len;
            }
            let mut pages = Pages::new(split);
            let items = collect_pages(|token| pages.fetch(token)).unwrap();
            assert_eq!(items, (0..next).collect::<Vec<_>>());
            assert_eq!(pages.requested.len(), page_count);
        }
    }

    #[test]
    fn error_discards_partial_results() {
        let mut calls = 0;
        let result = collect_pages(|_| {
            calls += 1;
            if calls == 3 {
                Err(FetchError::MalformedResponse("missing experiments".into()))
            } else {
                Ok(Page::new(vec![calls], Some(PageToken::from("more"))))
            }
        });
        assert_eq!(result, Err(FetchError::MalformedResponse("missing experiments".into())));
        assert_eq!(calls, 3);
    }

    #[test]
    fn exclusion_is_exact_and_case_sensitive() {
        let experiments = vec![
            Experiment::new("1", "Weather_Evaluation"),
            Experiment::new("2", "weather_evaluation"),
            Experiment::new("3", "Weather_Evaluation "),
            Experiment::new("4", "Forecast"),
            Experiment::new("5", "Weather_Evaluation"),
        ];
        let kept: Vec<_> = exclude_named(experiments.clone(), Some("Weather_Evaluation"))
            .into_iter()
            .map(|e| e.experiment_id)
            .collect();
        assert_eq!(kept, vec![ExperimentId::from("2"), "3".into(), "4".into()]);
        assert_eq!(exclude_named(experiments.clone(), None), experiments);
    }

    /// A scripted tracking server. Each call pops the next response.
    #[derive(Default)]
    struct FakeServer {
        experiments: VecDeque<Result<Page<Experiment>, PageError>>,
        runs: VecDeque<Result<Page<Run>, PageError>>,
        calls: Vec<(u32, Option<String>)>,
        orders: Vec<String>,
    }

    impl Client for FakeServer {
        fn search_experiments(&mut self, max_results: u32, page_token: Option<&PageToken>) -> Result<Page<Experiment>, PageError> {
            self.calls.push((max_results, page_token.map(|t| t.as_ref().to_owned())));
            self.experiments.pop_front().expect("unexpected experiments request")
        }

        fn search_runs(&mut self, _experiment: &ExperimentId, max_results: u32, order_by: &str, page_token: Option<&PageToken>) -> Result<Page<Run>, PageError> {
            self.calls.push((max_results, page_token.map(|t| t.as_ref().to_owned())));
            self.orders.push(order_by.to_owned());
            self.runs.pop_front().expect("unexpected runs request")
        }
    }

    fn run(id: &str) -> Run {
        Run {
            info: RunInfo { run_id: id.into(), run_name: None, start_time: None, status: None },
            data: RunData::default(),
        }
    }

    fn no_backoff() -> Config {
        Config { retry_backoff_ms: 0, ..Config::default() }
    }

    #[test]
    fn experiments_use_page_size_and_filter() {
        let mut server = FakeServer::default();
        server.experiments.push_back(Ok(Page::new(
            vec![Experiment::new("0", "Default"), Experiment::new("1", "Weather_Evaluation")],
            Some("abc".into()),
        )));
        server.experiments.push_back(Ok(Page::last(vec![Experiment::new("2", "Forecast")])));
        let experiments = list_experiments(&mut server, &no_backoff()).unwrap();
        let names: Vec<_> = experiments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Default", "Forecast"]);
        assert_eq!(server.calls, vec![(100, None), (100, Some("abc".into()))]);
    }

    #[test]
    fn transient_page_failure_is_retried_in_place() {
        let mut server = FakeServer::default();
        server.runs.push_back(Ok(Page::new(vec![run("a")], Some("p2".into()))));
        server.runs.push_back(Err(PageError::TransientServerStatus { status: 502, message: "bad gateway".into() }));
        server.runs.push_back(Ok(Page::last(vec![run("b")])));
        let runs = list_runs(&mut server, &no_backoff(), &"1".into()).unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.id().as_ref()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(server.calls, vec![(50, None), (50, Some("p2".into())), (50, Some("p2".into()))]);
        assert!(server.orders.iter().all(|o| o == RUNS_ORDER_BY));
    }

    #[test]
    fn exhausted_retries_fail_the_aggregation() {
        let mut server = FakeServer::default();
        server.runs.push_back(Ok(Page::new(vec![run("a")], Some("p2".into()))));
        for _ in 0..4 {
            server.runs.push_back(Err(PageError::TransientNetwork("connection refused".into())));
        }
        let result = list_runs(&mut server, &no_backoff(), &"1".into());
        assert_eq!(
            result,
            Err(FetchError::FetchFailed { status: None, message: "connection refused".into(), attempts: 4 })
        );
        assert_eq!(server.calls.len(), 5);
        assert!(server.runs.is_empty());
    }
}

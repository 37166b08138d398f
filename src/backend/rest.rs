use crate::{ExperimentId, api::{
        client::Client,
        error::PageError,
        experiment::Experiment,
        run::Run,
        search::{Page, PageToken},
    }, config::Config};
use anyhow::{Context, Error};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Statuses a load balancer or a restarting server answers with.
const TRANSIENT_STATUSES: [u16; 3] = [502, 503, 504];

#[derive(Deserialize)]
struct RestErrorResponse {
    #[serde(default)]
    error_code: Option<String>,
    message: String,
}

/// Maps a non-2xx answer to a page error, keeping the server's message where it sent one.
fn classify(status: u16, status_text: &str, body: &str) -> PageError {
    let message = match serde_json::from_str::<RestErrorResponse>(body) {
        Ok(RestErrorResponse { error_code: Some(code), message }) => format!("{}: {}", code, message),
        Ok(RestErrorResponse { error_code: None, message }) => message,
        Err(_) if body.trim().is_empty() => status_text.to_owned(),
        Err(_) => body.trim().to_owned(),
    };
    if TRANSIENT_STATUSES.contains(&status) {
        PageError::TransientServerStatus { status, message }
    } else {
        PageError::Status { status, message }
    }
}

/// A [`Client`] talking to an MLflow tracking server over its REST API.
pub struct Server {
    api_url: String,
    timeout: Duration,
}

impl Server {
    /// The `api_url` should be something like `http://127.0.0.1:5000/api`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Server {
            api_url: api_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_config(config: &Config) -> Self {
        Server {
            api_url: config.tracking_uri.clone(),
            timeout: config.timeout(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    fn execute<Ep, Val>(&mut self, request: Ep) -> Result<Val, PageError>
    where
        Ep: Endpoint<Value = Val> + EndpointExt,
    {
        let url = self.url(Ep::PATH);
        let buffer = Ep::write_request_string(&request)
            .map_err(|error| PageError::Request(format!("{:#}", error)))?;
        debug!(%url, body = %buffer, "sending request");
        let http_response = Ep::METHOD(&url)
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .send_string(&buffer);
        if let Some(error) = http_response.synthetic_error() {
            return Err(match error {
                ureq::Error::BadUrl(_) | ureq::Error::UnknownScheme(_) => PageError::Request(error.to_string()),
                _ => PageError::TransientNetwork(error.to_string()),
            });
        }
        if http_response.error() {
            let status = http_response.status();
            let status_text = http_response.status_text().to_owned();
            let body = http_response.into_string().unwrap_or_default();
            return Err(classify(status, &status_text, &body));
        }
        let response_string = http_response
            .into_string()
            .map_err(|error| PageError::TransientNetwork(format!("reading response body failed: {}", error)))?;
        let response = Ep::read_response_string(&response_string)
            .with_context(|| format!("deserializing {} response failed", Ep::PATH))
            .map_err(|error| PageError::MalformedResponse(format!("{:#}", error)))?;
        Ok(Ep::extract(response))
    }
}

impl Client for Server {
    fn search_experiments(&mut self, max_results: u32, page_token: Option<&PageToken>) -> Result<Page<Experiment>, PageError> {
        let request = SearchExperiments { max_results, page_token };
        self.execute(request)
    }

    fn search_runs(&mut self, experiment: &ExperimentId, max_results: u32, order_by: &str, page_token: Option<&PageToken>) -> Result<Page<Run>, PageError> {
        let request = SearchRuns {
            experiment_ids: [experiment],
            max_results,
            order_by: [order_by],
            page_token,
        };
        self.execute(request)
    }
}

trait Endpoint {
    const PATH: &'static str;
    const METHOD: fn(&str) -> ureq::Request;

    type Response;
    type Value;

    fn extract(response: Self::Response) -> Self::Value;
}
trait EndpointExt: Endpoint {
    fn read_response_string(response: &str) -> Result<Self::Response, Error>;
    fn write_request_string(request: &Self) -> Result<String, Error>;
}
impl<P, R, V> EndpointExt for P
where
    P: Serialize,
    R: DeserializeOwned,
    P: Endpoint<Response = R, Value = V>,
{
    fn read_response_string(response: &str) -> Result<Self::Response, Error> {
        let response = serde_json::from_str::<'_, R>(response)?;
        Ok(response)
    }

    fn write_request_string(request: &Self) -> Result<String, Error> {
        Ok(serde_json::to_string(request)?)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SearchExperiments<'a> {
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a PageToken>,
}
#[derive(Deserialize)]
struct SearchExperimentsResponse {
    experiments: Vec<Experiment>,
    #[serde(default, deserialize_with = "PageToken::deserialize_next")]
    next_page_token: Option<PageToken>,
}
impl Endpoint for SearchExperiments<'_> {
    const PATH: &'static str = "2.0/mlflow/experiments/search";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    type Response = SearchExperimentsResponse;
    type Value = Page<Experiment>;

    fn extract(response: Self::Response) -> Self::Value {
        Page::new(response.experiments, response.next_page_token)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
struct SearchRuns<'a> {
    pub experiment_ids: [&'a ExperimentId; 1],
    pub max_results: u32,
    pub order_by: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a PageToken>,
}
#[derive(Deserialize)]
struct SearchRunsResponse {
    runs: Vec<Run>,
    #[serde(default, deserialize_with = "PageToken::deserialize_next")]
    next_page_token: Option<PageToken>,
}
impl Endpoint for SearchRuns<'_> {
    const PATH: &'static str = "2.0/mlflow/runs/search";
    const METHOD: fn(&str) -> ureq::Request = ureq::post;
    type Response = SearchRunsResponse;
    type Value = Page<Run>;

    fn extract(response: Self::Response) -> Self::Value {
        Page::new(response.runs, response.next_page_token)
    }
}

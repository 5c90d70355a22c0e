//! Verify query building and response normalization against JSON test vectors
//! stored in `test-vectors/`.
//!
//! `query.json` describes an endpoint configuration, a query chain and caller
//! options, with the expected ordered parameters and final URL.
//! `response.json` describes raw payloads and the envelope accessors expected
//! on top of them. Comparing parsed JSON keeps the vectors readable.

use rest_core::{
    endpoint::map_results, response::payload_mapper, ApiClient, ApiResponse, ClientConfig,
    DefaultParameters, Direction, Endpoint, HttpResponse, IndexOptions, ParameterNames, Query,
    Resource, ResultMapper,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Paginate { limit: u64, offset: u64 },
    Paginated,
    OrderBy { field: String, direction: Direction },
    OrderByDefault { field: String },
    FilterBy { field: String, value: String },
}

#[derive(Debug, Deserialize)]
struct QueryCase {
    name: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    default_parameters: DefaultParameters,
    #[serde(default)]
    parameter_names: ParameterNames,
    chain: Vec<Step>,
    options: IndexOptions,
    expected_params: Vec<(String, String)>,
    expected_url: String,
}

fn apply<'r>(query: Query<'r>, step: &Step) -> Query<'r> {
    match step {
        Step::Paginate { limit, offset } => query.paginate(*limit, *offset),
        Step::Paginated => query.paginated(),
        Step::OrderBy { field, direction } => query.order_by(field.as_str(), *direction),
        Step::OrderByDefault { field } => query.order_by_default(field.as_str()),
        Step::FilterBy { field, value } => query.filter_by(field.as_str(), value),
    }
}

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

#[test]
fn query_test_vectors() {
    let raw = include_str!("../../test-vectors/query.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();
    let cases: Vec<QueryCase> = serde_json::from_value(vectors["cases"].clone()).unwrap();

    for case in cases {
        let base_url = case.base_url.as_deref().unwrap_or(base_url);
        let client = ApiClient::new(ClientConfig::new(base_url)).unwrap();
        let resource = Resource::new(
            Endpoint::builder("photos")
                .default_parameters(case.default_parameters)
                .parameter_names(case.parameter_names)
                .build(),
        );

        let query = case.chain.iter().fold(resource.query(), apply);
        let request = query.request_options(case.options);

        let params: Vec<(String, String)> = request.params.clone().into_iter().collect();
        assert_eq!(params, case.expected_params, "{}: params", case.name);

        let url = client.http().url_for(resource.path(), &request.params).unwrap();
        assert_eq!(url.as_str(), case.expected_url, "{}: url", case.name);
    }
}

// ---------------------------------------------------------------------------
// Response normalization
// ---------------------------------------------------------------------------

fn mapper(name: &str) -> ResultMapper {
    match name {
        "results" => map_results,
        "payload" => payload_mapper,
        other => panic!("unknown mapper: {other}"),
    }
}

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/response.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let raw = HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            url: "https://api.example.com/photos".to_string(),
            body: case["body"].to_string(),
        };
        let response = ApiResponse::new(raw, mapper(case["mapper"].as_str().unwrap())).unwrap();
        let expected = &case["expected"];

        assert_eq!(
            Value::Array(response.results().to_vec()),
            expected["results"],
            "{name}: results"
        );
        assert_eq!(response.count(), expected["count"].as_u64().unwrap(), "{name}: count");
        assert_eq!(response.total(), expected["total"].as_i64().unwrap(), "{name}: total");
        assert_eq!(
            response.first().cloned().unwrap_or(Value::Null),
            expected["first"],
            "{name}: first"
        );
        assert_eq!(
            response.last().cloned().unwrap_or(Value::Null),
            expected["last"],
            "{name}: last"
        );
        assert!(!response.from_cache(), "{name}: from_cache");
    }
}

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Records of one collection, keyed by id.
pub type Collection = BTreeMap<u64, Value>;

pub type Db = Arc<RwLock<HashMap<String, Collection>>>;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Query keys with a meaning of their own; every other key filters by field.
const CONTROL_KEYS: &[&str] = &[
    "_limit",
    "_start",
    "_sort",
    "_order",
    "limit",
    "offset",
    "order_column",
    "direction",
    "order_columns",
    "filter_columns",
];

pub fn app() -> Router {
    app_with(seed())
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/echo", get(echo))
        .route("/{collection}", get(list_records).post(create_record))
        .route(
            "/{collection}/{id}",
            get(get_record)
                .put(replace_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A small jsonplaceholder-like data set: 12 photos in two albums and 3 posts.
pub fn seed() -> Db {
    let mut photos = Collection::new();
    for id in 1..=12u64 {
        photos.insert(
            id,
            json!({
                "id": id,
                "albumId": if id <= 6 { 1 } else { 2 },
                "title": format!("photo {id}"),
                "url": format!("https://via.placeholder.com/600/{id}"),
            }),
        );
    }

    let mut posts = Collection::new();
    for (id, (user, title)) in [(1, "alpha"), (1, "beta"), (2, "gamma")].into_iter().enumerate() {
        let id = id as u64 + 1;
        posts.insert(id, json!({ "id": id, "userId": user, "title": title }));
    }

    let mut collections = HashMap::new();
    collections.insert("photos".to_string(), photos);
    collections.insert("posts".to_string(), posts);
    Arc::new(RwLock::new(collections))
}

async fn echo(headers: HeaderMap, Query(query): Query<Vec<(String, String)>>) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    let query: Vec<Value> = query.into_iter().map(|(k, v)| json!([k, v])).collect();
    Json(json!({ "headers": headers, "query": query }))
}

async fn list_records(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, StatusCode> {
    let collections = db.read().await;
    let records = collections.get(&collection).ok_or(StatusCode::NOT_FOUND)?;

    let mut filters: Vec<(String, String)> = query
        .iter()
        .filter(|(key, _)| !CONTROL_KEYS.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if let Some(encoded) = query.get("filter_columns") {
        filters.extend(pairs(encoded));
    }

    let mut selected: Vec<Value> = records
        .values()
        .filter(|record| filters.iter().all(|(field, value)| field_matches(record, field, value)))
        .cloned()
        .collect();

    let mut orders = Vec::new();
    if let Some(encoded) = query.get("order_columns") {
        orders.extend(pairs(encoded));
    }
    let single = query.get("_sort").or_else(|| query.get("order_column"));
    if let Some(column) = single {
        let direction = query
            .get("_order")
            .or_else(|| query.get("direction"))
            .cloned()
            .unwrap_or_else(|| "asc".to_string());
        orders.push((column.clone(), direction));
    }
    if !orders.is_empty() {
        selected.sort_by(|a, b| {
            orders
                .iter()
                .map(|(field, direction)| {
                    let ordering = compare(&a[field.as_str()], &b[field.as_str()]);
                    if direction.eq_ignore_ascii_case("desc") {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let total = selected.len();
    let start = numeric(&query, &["_start", "offset"]).unwrap_or(0);
    let limit = numeric(&query, &["_limit", "limit"]).unwrap_or(total);
    let page: Vec<Value> = selected.into_iter().skip(start).take(limit).collect();

    let mut response = Json(page).into_response();
    response
        .headers_mut()
        .insert(TOTAL_COUNT_HEADER, HeaderValue::from(total));
    Ok(response)
}

async fn create_record(
    State(db): State<Db>,
    Path(collection): Path<String>,
    Json(input): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let mut collections = db.write().await;
    let records = collections.get_mut(&collection).ok_or(StatusCode::NOT_FOUND)?;
    let id = records.keys().next_back().map_or(1, |last| last + 1);
    let mut record = input;
    record.insert("id".to_string(), json!(id));
    let record = Value::Object(record);
    records.insert(id, record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, u64)>,
) -> Result<Json<Value>, StatusCode> {
    let collections = db.read().await;
    collections
        .get(&collection)
        .and_then(|records| records.get(&id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn replace_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, u64)>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<Value>, StatusCode> {
    let mut collections = db.write().await;
    let record = collections
        .get_mut(&collection)
        .and_then(|records| records.get_mut(&id))
        .ok_or(StatusCode::NOT_FOUND)?;
    let mut replacement = input;
    replacement.insert("id".to_string(), json!(id));
    *record = Value::Object(replacement);
    Ok(Json(record.clone()))
}

async fn update_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, u64)>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<Value>, StatusCode> {
    let mut collections = db.write().await;
    let record = collections
        .get_mut(&collection)
        .and_then(|records| records.get_mut(&id))
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Value::Object(fields) = record {
        for (key, value) in input {
            if key != "id" {
                fields.insert(key, value);
            }
        }
    }
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(db): State<Db>,
    Path((collection, id)): Path<(String, u64)>,
) -> Result<StatusCode, StatusCode> {
    let mut collections = db.write().await;
    collections
        .get_mut(&collection)
        .and_then(|records| records.remove(&id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Decode `a:1,b:2` into `[("a", "1"), ("b", "2")]`.
fn pairs(encoded: &str) -> Vec<(String, String)> {
    encoded
        .split(',')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn numeric(query: &HashMap<String, String>, keys: &[&str]) -> Option<usize> {
    keys.iter()
        .find_map(|key| query.get(*key))
        .and_then(|value| value.parse().ok())
}

fn field_matches(record: &Value, field: &str, expected: &str) -> bool {
    match &record[field] {
        Value::String(s) => s == expected,
        Value::Null => false,
        other => other.to_string() == expected,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_decodes_comma_separated_entries() {
        assert_eq!(
            pairs("albumId:1,title:photo 2"),
            vec![
                ("albumId".to_string(), "1".to_string()),
                ("title".to_string(), "photo 2".to_string()),
            ]
        );
    }

    #[test]
    fn pairs_skips_malformed_entries() {
        assert_eq!(pairs("novalue,a:b"), vec![("a".to_string(), "b".to_string())]);
    }

    #[test]
    fn field_matches_compares_numbers_by_text() {
        let record = json!({ "albumId": 2, "title": "x" });
        assert!(field_matches(&record, "albumId", "2"));
        assert!(field_matches(&record, "title", "x"));
        assert!(!field_matches(&record, "missing", "x"));
    }

    #[test]
    fn compare_orders_numbers_numerically() {
        assert_eq!(compare(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare(&json!("b"), &json!("a")), Ordering::Greater);
    }

    #[tokio::test]
    async fn seed_contains_both_collections() {
        let db = seed();
        let collections = db.read().await;
        assert_eq!(collections["photos"].len(), 12);
        assert_eq!(collections["posts"].len(), 3);
    }
}

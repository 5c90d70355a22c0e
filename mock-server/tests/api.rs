use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, TOTAL_COUNT_HEADER};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn ids(records: &[Value]) -> Vec<u64> {
    records.iter().map(|r| r["id"].as_u64().unwrap()).collect()
}

// --- list ---

#[tokio::test]
async fn list_photos_reports_total_count() {
    let resp = app().oneshot(get("/photos")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[TOTAL_COUNT_HEADER], "12");
    let photos: Vec<Value> = body_json(resp).await;
    assert_eq!(photos.len(), 12);
}

#[tokio::test]
async fn list_unknown_collection_returns_404() {
    let resp = app().oneshot(get("/comments")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_paginates_with_jsonplaceholder_names() {
    let resp = app().oneshot(get("/photos?_limit=3&_start=2")).await.unwrap();

    assert_eq!(resp.headers()[TOTAL_COUNT_HEADER], "12");
    let photos: Vec<Value> = body_json(resp).await;
    assert_eq!(ids(&photos), vec![3, 4, 5]);
}

#[tokio::test]
async fn list_paginates_with_generic_names() {
    let resp = app().oneshot(get("/posts?limit=2&offset=1")).await.unwrap();
    let posts: Vec<Value> = body_json(resp).await;
    assert_eq!(ids(&posts), vec![2, 3]);
}

#[tokio::test]
async fn list_sorts_by_single_column() {
    let resp = app()
        .oneshot(get("/photos?_sort=id&_order=desc&_limit=2"))
        .await
        .unwrap();
    let photos: Vec<Value> = body_json(resp).await;
    assert_eq!(ids(&photos), vec![12, 11]);
}

#[tokio::test]
async fn list_sorts_by_multiple_columns() {
    let resp = app()
        .oneshot(get("/photos?order_columns=albumId:DESC,id:ASC&limit=3"))
        .await
        .unwrap();
    let photos: Vec<Value> = body_json(resp).await;
    assert_eq!(ids(&photos), vec![7, 8, 9]);
}

#[tokio::test]
async fn list_filters_by_plain_parameter() {
    let resp = app().oneshot(get("/photos?albumId=2")).await.unwrap();

    assert_eq!(resp.headers()[TOTAL_COUNT_HEADER], "6");
    let photos: Vec<Value> = body_json(resp).await;
    assert!(photos.iter().all(|p| p["albumId"] == 2));
}

#[tokio::test]
async fn list_filters_by_encoded_columns() {
    let resp = app()
        .oneshot(get("/posts?filter_columns=userId:1,title:beta"))
        .await
        .unwrap();
    let posts: Vec<Value> = body_json(resp).await;
    assert_eq!(ids(&posts), vec![2]);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_headers_and_query_order() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo?b=2&a=1")
                .header("x-requested-with", "XMLHttpRequest")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    let echoed: Value = body_json(resp).await;
    assert_eq!(echoed["headers"]["x-requested-with"], "XMLHttpRequest");
    assert_eq!(echoed["query"], serde_json::json!([["b", "2"], ["a", "1"]]));
}

// --- create ---

#[tokio::test]
async fn create_post_returns_201_with_next_id() {
    let resp = app()
        .oneshot(json_request("POST", "/posts", r#"{"title":"delta","userId":3}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = body_json(resp).await;
    assert_eq!(post["id"], 4);
    assert_eq!(post["title"], "delta");
}

#[tokio::test]
async fn create_non_object_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/posts", "[1,2]"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- get ---

#[tokio::test]
async fn get_record_not_found() {
    let resp = app().oneshot(get("/photos/999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_record_bad_id_returns_400() {
    let resp = app().oneshot(get("/photos/not-a-number")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update ---

#[tokio::test]
async fn replace_record_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", "/posts/999", r#"{"title":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- delete ---

#[tokio::test]
async fn delete_record_not_found() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/posts/999")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/posts", r#"{"title":"Walk dog","userId":9}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = body_json(resp).await;
    let id = created["id"].as_u64().unwrap();

    // patch keeps untouched fields
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PATCH", &format!("/posts/{id}"), r#"{"title":"Walk cat"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Value = body_json(resp).await;
    assert_eq!(patched["title"], "Walk cat");
    assert_eq!(patched["userId"], 9);

    // put replaces the whole record
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/posts/{id}"), r#"{"title":"Feed fish"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let replaced: Value = body_json(resp).await;
    assert_eq!(replaced["title"], "Feed fish");
    assert!(replaced.get("userId").is_none());
    assert_eq!(replaced["id"], id);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(&format!("/posts/{id}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete is a 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/posts/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

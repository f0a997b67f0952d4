pub mod batch;
pub mod extract;

pub async fn health() -> &'static str {
    "ok"
}

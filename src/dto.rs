use serde::Deserialize;

/// List pagination shared by every collection endpoint.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl Pagination {
    /// Negative values from the query string are treated as zero so they
    /// never reach OFFSET/LIMIT, which Postgres would reject.
    pub fn skip(&self) -> i64 {
        self.skip.max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.max(0)
    }
}

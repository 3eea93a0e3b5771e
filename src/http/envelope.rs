use serde::Serialize;

/// Uniform success body: `{ "status": "success", "message"?, "data": ... }`.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    pub fn message(message: &'static str, data: T) -> Self {
        Self {
            status: "success",
            message: Some(message),
            data,
        }
    }
}

/// Success body with no data payload.
#[derive(Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub message: &'static str,
}

impl Ack {
    pub fn new(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
        }
    }
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Paginated success body: the envelope plus `results` (items on this page)
/// and the pagination metadata.
#[derive(Serialize)]
pub struct PageEnvelope<T> {
    pub status: &'static str,
    pub results: usize,
    pub pagination: Pagination,
    pub data: T,
}

impl<T> PageEnvelope<T> {
    pub fn new(data: T, results: usize, pagination: Pagination) -> Self {
        Self {
            status: "success",
            results,
            pagination,
            data,
        }
    }
}

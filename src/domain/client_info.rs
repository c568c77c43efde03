use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Requester details kept alongside a submission for abuse tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = header_value(headers, X_FORWARDED_FOR)
            .and_then(|forwarded| forwarded.split(',').next().map(str::trim).map(str::to_owned))
            .filter(|ip| !ip.is_empty())
            .or_else(|| header_value(headers, X_REAL_IP).map(str::to_owned));

        Self {
            ip_address,
            user_agent: header_value(headers, USER_AGENT.as_str()).map(str::to_owned),
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

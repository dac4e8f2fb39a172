/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Room creation, membership and the start signal.
pub mod membership_service;
/// Room event construction and publication.
pub mod room_events;
/// Answer submission, scoring and round queries.
pub mod round_service;
/// Server-Sent Events streaming of room events.
pub mod sse_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// Player WebSocket session handling.
pub mod websocket_service;

#[cfg(test)]
mod test_support;

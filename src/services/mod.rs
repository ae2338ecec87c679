/// Fan-out of server events to topics and users.
pub mod broadcast;
/// Chat relay and typing indicators.
pub mod chat_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Bearer credential verification for the upgrade request.
pub mod handshake_service;
/// Health check and runtime counters.
pub mod health_service;
/// Permission-checked match mutations.
pub mod mutation_service;
/// Storage connection supervisor with degraded-mode tracking.
pub mod storage_supervisor;
/// Match topic joins and snapshots.
pub mod subscription_service;
/// WebSocket session lifecycle and request dispatch.
pub mod websocket_service;

pub mod alert_state_repository;
pub mod api_token_repository;
pub mod bot_visit_repository;
pub mod incident_repository;
pub mod observation_repository;
pub mod service_repository;
pub mod user_repository;
pub mod watch_list_repository;
pub mod webhook_repository;

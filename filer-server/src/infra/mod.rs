pub mod app_state;
pub mod notify;
pub mod reconcile;
pub mod self_update;
pub mod transcoding;

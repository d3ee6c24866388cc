pub(crate) mod connection_controller;
pub(crate) mod dispatch_controller;
pub(crate) mod health_check_controller;
pub(crate) mod metrics_controller;

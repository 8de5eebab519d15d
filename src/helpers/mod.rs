pub mod handler_404;
pub mod logging;
pub mod notifier;
pub mod route_params;
pub mod session;

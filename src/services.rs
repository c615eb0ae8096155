pub mod dashboard_service;
pub mod metrics;

pub use dashboard_service::DashboardService;

use crate::domain::value_objects::{ConnectionType, Direction};

/// Port for metrics reporting
pub trait MetricsReporter: Send + Sync {
    fn report_active_connections(&self, count: usize);
    fn report_connection_created(&self, connection_type: ConnectionType, direction: Direction);
    fn report_connection_failed(&self, connection_type: ConnectionType, direction: Direction);
    fn report_ports_leased(&self, pool: &str, count: usize);
    fn report_faults_forwarded(&self, count: usize);
}

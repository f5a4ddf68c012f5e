use async_trait::async_trait;

/// Port for checking whether an external port can currently be bound
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn is_available(&self, port: u16) -> bool;
}

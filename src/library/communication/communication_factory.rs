use crate::library::communication::event::{
    GroupCoordinator, NotificationPublisher, QueueProvider,
};

/// Factory to provide implementations for the traits from this module
pub trait CommunicationFactory {
    /// [`QueueProvider`] implementation type
    type QueueProvider: QueueProvider + Send + Sync + 'static;
    /// [`NotificationPublisher`] implementation type
    type NotificationPublisher: NotificationPublisher + Send + Sync;
    /// [`GroupCoordinator`] implementation type
    type GroupCoordinator: GroupCoordinator + Send + Sync;

    /// Instantiates a new [`QueueProvider`]
    fn queue_provider(&self) -> Self::QueueProvider;
    /// Instantiates a new [`NotificationPublisher`]
    fn notification_publisher(&self) -> Self::NotificationPublisher;
    /// Instantiates a new [`GroupCoordinator`]
    fn group_coordinator(&self) -> Self::GroupCoordinator;
}

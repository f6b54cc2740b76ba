use super::{MockGroupCoordinator, MockLog};
use crate::library::communication::CommunicationFactory;

/// Communication factory handing out a shared in-memory log and group coordinator
#[derive(Clone, Default)]
pub struct MockCommunicationFactory {
    log: MockLog,
    coordinator: MockGroupCoordinator,
}

impl MockCommunicationFactory {
    pub fn log(&self) -> &MockLog {
        &self.log
    }

    pub fn coordinator(&self) -> &MockGroupCoordinator {
        &self.coordinator
    }
}

impl CommunicationFactory for MockCommunicationFactory {
    type QueueProvider = MockLog;
    type NotificationPublisher = MockLog;
    type GroupCoordinator = MockGroupCoordinator;

    fn queue_provider(&self) -> Self::QueueProvider {
        self.log.clone()
    }

    fn notification_publisher(&self) -> Self::NotificationPublisher {
        self.log.clone()
    }

    fn group_coordinator(&self) -> Self::GroupCoordinator {
        self.coordinator.clone()
    }
}

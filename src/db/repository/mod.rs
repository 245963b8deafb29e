pub mod activity;
pub mod assignment;
pub mod availability;
pub mod competency;
pub mod email_queue;
pub mod game;
pub mod game_master;
pub mod notification;

pub use activity::ActivityRepository;
pub use assignment::AssignmentRepository;
pub use availability::AvailabilityRepository;
pub use competency::CompetencyRepository;
pub use email_queue::EmailQueueRepository;
pub use game::{GameMappingRepository, GameRepository};
pub use game_master::GameMasterRepository;
pub use notification::NotificationRepository;

//! Business logic services

pub mod authors;
pub mod books;
pub mod categories;
pub mod email;
pub mod events;
pub mod notifications;
pub mod overdue;
pub mod redis;
pub mod reservations;
pub mod stats;
pub mod users;

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub authors: authors::AuthorsService,
    pub categories: categories::CategoriesService,
    pub books: books::BooksService,
    pub reservations: reservations::ReservationsService,
    pub stats: stats::StatsService,
    pub notifications: notifications::NotificationService,
    pub overdue: overdue::OverdueScheduler,
    pub redis: redis::RedisService,
    pub repository: Repository,
}

/// Queue consumers that must be spawned for events and overdue checks to run
pub struct BackgroundTasks {
    overdue_jobs: mpsc::UnboundedReceiver<overdue::OverdueJob>,
    overdue_checker: overdue::OverdueChecker,
    events: mpsc::UnboundedReceiver<events::DomainEvent>,
    notifications: notifications::NotificationService,
}

impl BackgroundTasks {
    /// Start the notification listener and the overdue worker
    pub fn spawn(self) -> (JoinHandle<()>, JoinHandle<()>) {
        let listener = tokio::spawn(events::run_listener(self.events, self.notifications));
        let worker = tokio::spawn(overdue::run_worker(self.overdue_jobs, self.overdue_checker));
        (listener, worker)
    }
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        redis_service: redis::RedisService,
    ) -> (Self, BackgroundTasks) {
        let (event_bus, event_receiver) = events::EventBus::new();
        let (overdue, overdue_jobs) =
            overdue::OverdueScheduler::new(Arc::new(redis_service.clone()), config.overdue.clone());

        let mailer = Arc::new(email::EmailService::new(config.email.clone()));
        let notifications = notifications::NotificationService::new(repository.clone(), mailer);

        let services = Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone(), redis_service.clone()),
            authors: authors::AuthorsService::new(repository.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            books: books::BooksService::new(repository.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                event_bus.clone(),
                overdue.clone(),
            ),
            stats: stats::StatsService::new(repository.clone()),
            notifications: notifications.clone(),
            overdue,
            redis: redis_service,
            repository: repository.clone(),
        };

        let background = BackgroundTasks {
            overdue_jobs,
            overdue_checker: overdue::OverdueChecker::new(repository, event_bus),
            events: event_receiver,
            notifications,
        };

        (services, background)
    }
}

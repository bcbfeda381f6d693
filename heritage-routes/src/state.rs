use std::sync::Arc;

use axum::extract::FromRef;
use heritage_core::HeritageEngine;
use routing::JwtKeys;

use crate::notifications::{FanOutConfig, PushSender};
use crate::services::{
    AdminService, AuthService, CommentService, HeritageService, NotificationService,
    ReviewService, UserService,
};
use crate::uploads::UploadStore;

/// Settings shared by the services.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Prefix of image urls, e.g. `http://localhost:5000`
    pub base_url: Arc<str>,
    pub uploads: UploadStore,
    pub jwt: Arc<JwtKeys>,
    pub fan_out: FanOutConfig,
}

#[derive(Clone)]
pub struct HeritageAppState<T: HeritageEngine, P: PushSender> {
    pub auth: AuthService<T>,
    pub heritages: HeritageService<T, P>,
    pub reviews: ReviewService<T>,
    pub comments: CommentService<T>,
    pub admin: AdminService<T>,
    pub users: UserService<T>,
    pub notifications: NotificationService<T, P>,
    pub uploads: UploadStore,
    pub metrics_enabled: bool,
}

impl<T: HeritageEngine, P: PushSender> HeritageAppState<T, P> {
    pub fn new_with_metrics(engine: T, sender: P, settings: ServiceSettings) -> Self {
        Self::new(engine, sender, settings, true)
    }

    pub fn new_without_metrics(engine: T, sender: P, settings: ServiceSettings) -> Self {
        Self::new(engine, sender, settings, false)
    }

    fn new(engine: T, sender: P, settings: ServiceSettings, metrics_enabled: bool) -> Self {
        let notifications = NotificationService::new(engine.clone(), sender, settings.fan_out);

        Self {
            auth: AuthService::new(engine.clone(), settings.jwt, settings.uploads.clone()),
            heritages: HeritageService::new(
                engine.clone(),
                Arc::clone(&settings.base_url),
                settings.uploads.clone(),
                notifications.clone(),
            ),
            reviews: ReviewService::new(engine.clone()),
            comments: CommentService::new(engine.clone()),
            admin: AdminService::new(engine.clone(), Arc::clone(&settings.base_url)),
            users: UserService::new(engine, settings.base_url),
            notifications,
            uploads: settings.uploads,
            metrics_enabled,
        }
    }
}

macro_rules! service_from_state {
    ($($service:ident$(<$($generic:ident),+>)? => $field:ident),+ $(,)?) => {
        $(
            impl<T: HeritageEngine, P: PushSender> FromRef<HeritageAppState<T, P>>
                for $service$(<$($generic),+>)?
            {
                fn from_ref(input: &HeritageAppState<T, P>) -> Self {
                    input.$field.clone()
                }
            }
        )+
    };
}

service_from_state! {
    AuthService<T> => auth,
    HeritageService<T, P> => heritages,
    ReviewService<T> => reviews,
    CommentService<T> => comments,
    AdminService<T> => admin,
    UserService<T> => users,
    NotificationService<T, P> => notifications,
    UploadStore => uploads,
}

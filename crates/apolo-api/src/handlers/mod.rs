//! HTTP request handlers

pub mod account;
pub mod actions;
pub mod health;

pub use account::configure as configure_accounts;
pub use actions::configure as configure_actions;
pub use health::health_check;

use actix_web::web;

/// Mount every endpoint under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(configure_actions)
            .configure(configure_accounts),
    );
}

use crate::{
    api::{balance, leave_request, leave_type},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/leave-type")
                    // /leave-type
                    .service(
                        web::resource("")
                            .route(web::post().to(leave_type::create_leave_type))
                            .route(web::get().to(leave_type::list_leave_types)),
                    )
                    // /leave-type/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_type::get_leave_type))
                            .route(web::put().to(leave_type::update_leave_type))
                            .route(web::delete().to(leave_type::delete_leave_type)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::submit_leave)),
                    )
                    // literal segments must be registered before /{id}
                    .service(web::resource("/mine").route(web::get().to(leave_request::my_leaves)))
                    .service(web::resource("/team").route(web::get().to(leave_request::team_leaves)))
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    )
                    // /leave/{id}/cancel
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(leave_request::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/balance")
                    // /balance/{leave_type_id}
                    .service(
                        web::resource("/{leave_type_id}")
                            .route(web::get().to(balance::get_balance)),
                    ),
            ),
    );
}

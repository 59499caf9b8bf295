use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::api::rest::handlers;
use crate::domain::service::Service;

/// Mount the student routes on `router`.
///
/// `/students` and `/students/{name}` are always present. With `legacy_routes`
/// the root-level surface is mounted too: `POST /student` and `GET|PUT|DELETE /{name}`.
/// Static paths win over `/{name}`, so a student called `student` or `healthz`
/// is only reachable under `/students/`.
pub fn register_routes(mut router: Router, service: Arc<Service>, legacy_routes: bool) -> Router {
    router = router
        .route("/students", post(handlers::create_student))
        .route(
            "/students/{name}",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        );

    if legacy_routes {
        router = router.route("/student", post(handlers::create_student)).route(
            "/{name}",
            get(handlers::get_student)
                .put(handlers::update_student)
                .delete(handlers::delete_student),
        );
    }

    router.layer(Extension(service))
}

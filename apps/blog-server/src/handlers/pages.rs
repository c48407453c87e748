//! Static informational pages.

use actix_web::HttpResponse;

use blogicum_shared::ApiResponse;
use blogicum_shared::dto::StaticPage;

fn page(slug: &str, title: &str, body: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(StaticPage {
        slug: slug.to_string(),
        title: title.to_string(),
        body: body.to_string(),
    }))
}

/// GET /pages/about/
pub async fn about() -> HttpResponse {
    page(
        "about",
        "About",
        "Blogicum is a place to share stories about travels, food and everyday life.",
    )
}

/// GET /pages/rules/
pub async fn rules() -> HttpResponse {
    page(
        "rules",
        "Rules",
        "Be kind to other authors. Post only content you have the right to publish. \
         Authors may edit and delete only their own posts and comments.",
    )
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    use crate::handlers::test_support::{Fixture, test_app};

    #[actix_web::test]
    async fn test_static_pages() {
        let fx = Fixture::new().await;
        let app = test_app!(fx.state.clone());

        for slug in ["about", "rules"] {
            let req = test::TestRequest::get()
                .uri(&format!("/pages/{slug}/"))
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            let body: Value = test::read_body_json(res).await;
            assert_eq!(body["data"]["slug"], slug);
        }
    }

    #[actix_web::test]
    async fn test_unknown_route_renders_problem_document() {
        let fx = Fixture::new().await;
        let app = test_app!(fx.state.clone());

        let req = test::TestRequest::get().uri("/pages/missing/").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 404);
        assert_eq!(body["title"], "Not Found");
    }
}

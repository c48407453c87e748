//! Category page.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;

use blogicum_core::domain::{Category, PostCard};
use blogicum_core::pagination::Page;
use blogicum_core::query::PostFilter;
use blogicum_shared::ApiResponse;

use super::PageQuery;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub posts: Page<PostCard>,
}

/// GET /category/{slug}/ - unpublished categories do not exist for visitors.
pub async fn show(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let category = state
        .categories
        .find_published_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {slug} not found")))?;

    let posts = state
        .posts
        .list(
            PostFilter::in_category(category.id, Utc::now()),
            query.request()?,
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CategoryPage { category, posts })))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    use crate::handlers::test_support::{Fixture, test_app};

    #[actix_web::test]
    async fn test_category_lists_only_its_visible_posts() {
        let fx = Fixture::new().await;
        let (author, _) = fx.user("leo").await;
        let food = fx.category("food", true).await;
        fx.post(&author, "road trip").await;
        fx.post_with(&author, "borscht", |p| p.category_id = food.id)
            .await;
        fx.post_with(&author, "secret recipe", |p| {
            p.category_id = food.id;
            p.is_published = false;
        })
        .await;

        let app = test_app!(fx.state.clone());
        let req = test::TestRequest::get().uri("/category/food/").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["data"]["category"]["slug"], "food");
        assert_eq!(body["data"]["posts"]["total"], 1);
        assert_eq!(body["data"]["posts"]["items"][0]["title"], "borscht");
    }

    #[actix_web::test]
    async fn test_unpublished_category_is_not_found() {
        let fx = Fixture::new().await;
        let (author, _) = fx.user("leo").await;
        let hidden = fx.category("hidden", false).await;
        fx.post_with(&author, "tucked away", |p| p.category_id = hidden.id)
            .await;

        let app = test_app!(fx.state.clone());
        for uri in ["/category/hidden/", "/category/missing/"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::NOT_FOUND,
                "{uri}"
            );
        }

        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["data"]["total"], 0);
    }
}

//! 股票数据接口的访问控制
//!
//! `/api/v1` 下的公司、财务、分析、行情和缓存接口要求
//! `Authorization: Bearer <API_KEY>`，密钥来自环境变量 `API_KEY`。
//! 未配置密钥时全部放行（启动时会打印警告）；`/health` 始终放行。

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
    body::EitherBody,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::models::ApiResponse;

/// 校验 `API_KEY` 的中间件，挂在整个 App 上
pub struct ApiKeyMiddleware {
    api_key: Rc<String>,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key: Rc::new(api_key),
        }
    }

    /// 是否启用认证
    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ApiKeyMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyMiddlewareService {
            service: Rc::new(service),
            api_key: self.api_key.clone(),
        })
    }
}

pub struct ApiKeyMiddlewareService<S> {
    service: Rc<S>,
    api_key: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let api_key = self.api_key.clone();

        Box::pin(async move {
            // 未配置密钥或健康检查接口直接放行
            if api_key.is_empty() || req.path().ends_with("/health") {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            // 缓存清理等接口都走这里，只接受完全一致的密钥
            let provided_key = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "));

            match provided_key {
                Some(key) if key == api_key.as_str() => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                _ => {
                    log::warn!("🔒 拒绝未认证请求: {} {}", req.method(), req.path());
                    let response = HttpResponse::Unauthorized()
                        .json(ApiResponse::<()>::error("无效的 Bearer Token".to_string()));
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[actix_web::test]
    async fn test_bearer_token_required() {
        println!("\n========== 测试 Bearer Token 认证 ==========");
        let app = test::init_service(
            App::new()
                .wrap(ApiKeyMiddleware::new("secret".to_string()))
                .route("/api/v1/health", web::get().to(ok_handler))
                .route("/api/v1/market/listing", web::get().to(ok_handler)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/market/listing").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let req = test::TestRequest::get()
            .uri("/api/v1/market/listing")
            .insert_header(("Authorization", "Bearer wrong"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);

        let req = test::TestRequest::get()
            .uri("/api/v1/market/listing")
            .insert_header(("Authorization", "Bearer secret"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }

    #[actix_web::test]
    async fn test_empty_key_disables_auth() {
        let middleware = ApiKeyMiddleware::new(String::new());
        assert!(!middleware.enabled());

        let app = test::init_service(
            App::new()
                .wrap(middleware)
                .route("/api/v1/market/listing", web::get().to(ok_handler)),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/v1/market/listing").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
}

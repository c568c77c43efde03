use reqwest::Method;

use crate::helpers::spawn_app;

const SITE_ORIGIN: &str = "https://katari.farm";

#[tokio::test]
async fn preflight_requests_are_answered_permissively() {
    let app = spawn_app().await;

    for route in ["/subscriptions", "/contact"] {
        let response = reqwest::Client::new()
            .request(Method::OPTIONS, &format!("{}{}", &app.address, route))
            .header("Origin", SITE_ORIGIN)
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type,x-client-info,apikey")
            .send()
            .await
            .expect("Failed to execute request.");

        assert!(response.status().is_success(), "Preflight on {route} failed.");
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let allowed_headers = headers["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_lowercase();
        for header in ["authorization", "x-client-info", "apikey", "content-type"] {
            assert!(allowed_headers.contains(header), "{header} is not allowed on {route}.");
        }
        let allowed_methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(allowed_methods.contains("POST"));
    }
}

#[tokio::test]
async fn cross_origin_posts_carry_the_allow_origin_header() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(&format!("{}/subscriptions", &app.address))
        .header("Origin", SITE_ORIGIN)
        .header("Content-Type", "application/json")
        .body("{}")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

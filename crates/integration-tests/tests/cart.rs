//! Per-user cart mutations through the dashboard forms.

use serde_json::Value;

use shopwave_integration_tests::TestApp;

#[tokio::test]
async fn test_adding_twice_keeps_one_row() {
    let app = TestApp::new();
    let item = app.add_item("Canvas Tote", "24.00").await;
    let mut browser = app.signed_in("shopper@example.com").await;

    for _ in 0..2 {
        let response = browser
            .post_form("/cart/add", &[("item_id", item.as_str())])
            .await;
        assert!(response.redirects_to("/?success=added"));
    }

    let rows = app.cart_rows(&app.user_id("shopper@example.com"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("quantity"), Some(&Value::from(1)));

    let page = browser.get("/?success=added").await;
    assert!(page.body.contains("Added to cart."));
    assert_eq!(page.body.matches("Remove from Cart").count(), 1);
    assert!(!page.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_remove_clears_row() {
    let app = TestApp::new();
    let item = app.add_item("Trail Runner", "89.99").await;
    let mut browser = app.signed_in("shopper@example.com").await;

    browser
        .post_form("/cart/add", &[("item_id", item.as_str())])
        .await;
    let response = browser
        .post_form("/cart/remove", &[("item_id", item.as_str())])
        .await;

    assert!(response.redirects_to("/?success=removed"));
    assert!(app.cart_rows(&app.user_id("shopper@example.com")).is_empty());
    assert!(browser.get("/").await.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_removing_absent_item_is_noop() {
    let app = TestApp::new();
    let item = app.add_item("Trail Runner", "89.99").await;
    let mut browser = app.signed_in("shopper@example.com").await;

    let response = browser
        .post_form("/cart/remove", &[("item_id", item.as_str())])
        .await;

    assert!(response.redirects_to("/?success=removed"));
    assert!(app.rows(shopwave_storefront::gateway::Table::CartItems).is_empty());
}

#[tokio::test]
async fn test_blank_item_id_is_rejected() {
    let app = TestApp::new();
    let mut browser = app.signed_in("shopper@example.com").await;

    let response = browser.post_form("/cart/add", &[("item_id", "  ")]).await;
    assert!(response.redirects_to("/?error=invalid_item"));
}

#[tokio::test]
async fn test_anonymous_cart_mutation_redirects_to_login() {
    let app = TestApp::new();
    let item = app.add_item("Trail Runner", "89.99").await;
    let mut browser = app.browser();

    let response = browser
        .post_form("/cart/add", &[("item_id", item.as_str())])
        .await;

    assert!(response.redirects_to("/login"));
    assert!(app.rows(shopwave_storefront::gateway::Table::CartItems).is_empty());
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let app = TestApp::new();
    let item = app.add_item("Canvas Tote", "24.00").await;
    let mut first = app.signed_in("first@example.com").await;
    let mut second = app.signed_in("second@example.com").await;

    first
        .post_form("/cart/add", &[("item_id", item.as_str())])
        .await;

    assert_eq!(app.cart_rows(&app.user_id("first@example.com")).len(), 1);
    assert!(app.cart_rows(&app.user_id("second@example.com")).is_empty());
    assert!(second.get("/").await.body.contains("Your cart is empty."));
}

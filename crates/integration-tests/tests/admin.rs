//! Role guard and catalog management from the admin console.

use axum::http::StatusCode;

use shopwave_core::Role;
use shopwave_integration_tests::TestApp;

fn item_fields<'a>(name: &'a str, price: &'a str, rating: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![("name", name), ("price", price), ("user_rating", rating), ("in_stock", "on")]
}

#[tokio::test]
async fn test_admin_sees_admin_dashboard() {
    let app = TestApp::new();
    app.add_item("Canvas Tote", "24.00").await;
    let mut admin = app.signed_in_admin("admin@example.com").await;

    let page = admin.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Admin Dashboard"));
    assert!(page.body.contains("Manage Items"));
    assert!(page.body.contains("Canvas Tote"));
    assert!(!page.body.contains("Your Cart"));
}

#[tokio::test]
async fn test_customer_is_sent_home_from_admin_routes() {
    let app = TestApp::new();
    let item = app.add_item("Canvas Tote", "24.00").await;
    let mut customer = app.signed_in("shopper@example.com").await;

    assert!(
        customer
            .get("/admin/items/new")
            .await
            .redirects_to("/?error=forbidden")
    );
    assert!(
        customer
            .get(&format!("/admin/items/{item}/edit"))
            .await
            .redirects_to("/?error=forbidden")
    );

    let create = customer
        .post_form("/admin/items", &item_fields("Sneaky", "1", ""))
        .await;
    assert!(create.redirects_to("/?error=forbidden"));
    let delete = customer
        .post_form(&format!("/admin/items/{item}/delete"), &[])
        .await;
    assert!(delete.redirects_to("/?error=forbidden"));

    assert_eq!(app.items().len(), 1);

    let home = customer.get("/?error=forbidden").await;
    assert!(home.body.contains("You do not have permission to do that."));
}

#[tokio::test]
async fn test_anonymous_admin_route_redirects_to_login() {
    let app = TestApp::new();
    let mut browser = app.browser();

    assert!(browser.get("/admin/items/new").await.redirects_to("/login"));
}

#[tokio::test]
async fn test_role_change_applies_on_next_request() {
    let app = TestApp::new();
    let mut browser = app.signed_in("promoted@example.com").await;
    assert!(browser.get("/").await.body.contains("Customer Dashboard"));

    app.set_role(&app.user_id("promoted@example.com"), Role::Admin)
        .await;

    assert!(browser.get("/").await.body.contains("Admin Dashboard"));
    assert_eq!(browser.get("/admin/items/new").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_lists_newest_first() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;

    let new_form = admin.get("/admin/items/new").await;
    assert!(new_form.body.contains("Add New Item"));
    assert!(new_form.body.contains("action=\"/admin/items\""));

    for name in ["Older Item", "Newer Item"] {
        let response = admin
            .post_form("/admin/items", &item_fields(name, "10.50", "4.5"))
            .await;
        assert!(response.redirects_to("/?success=created"));
    }

    let page = admin.get("/?success=created").await;
    assert!(page.body.contains("Item added."));
    let newer = page.body.find("Newer Item").expect("newer listed");
    let older = page.body.find("Older Item").expect("older listed");
    assert!(newer < older, "newest item should be listed first");
}

#[tokio::test]
async fn test_invalid_form_rerenders_with_error() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;

    let response = admin
        .post_form("/admin/items", &item_fields("Hat", "-3", ""))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("price cannot be negative"));
    assert!(response.body.contains("value=\"Hat\""));
    assert!(app.items().is_empty());

    let blank = admin
        .post_form("/admin/items", &item_fields("   ", "3", ""))
        .await;
    assert_eq!(blank.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(blank.body.contains("name is required"));
}

#[tokio::test]
async fn test_sub_cent_price_is_rejected_not_rounded() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;

    let response = admin
        .post_form("/admin/items", &item_fields("Hat", "1.999", ""))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("at most 2 decimal places"));

    let response = admin
        .post_form("/admin/items", &item_fields("Hat", "12", "4.75"))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("at most 1 decimal place"));
    assert!(app.items().is_empty());
}

#[tokio::test]
async fn test_edit_form_is_prepopulated() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;
    admin
        .post_form("/admin/items", &item_fields("Trail Runner", "89.99", "4.5"))
        .await;
    let item = app.items().remove(0);

    let page = admin.get(&format!("/admin/items/{}/edit", item.id)).await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Edit Item"));
    assert!(page.body.contains(&format!("action=\"/admin/items/{}\"", item.id)));
    assert!(page.body.contains("value=\"Trail Runner\""));
    assert!(page.body.contains("value=\"89.99\""));
    assert!(page.body.contains("value=\"4.5\""));
    assert!(page.body.contains("checked"));
}

#[tokio::test]
async fn test_unchanged_edit_round_trips() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;
    admin
        .post_form("/admin/items", &item_fields("Trail Runner", "89.99", "4.5"))
        .await;
    let before = app.items().remove(0);

    let response = admin
        .post_form(
            &format!("/admin/items/{}", before.id),
            &item_fields("Trail Runner", "89.99", "4.5"),
        )
        .await;
    assert!(response.redirects_to("/?success=updated"));

    let after = app.items().remove(0);
    assert_eq!(after.id, before.id);
    assert_eq!(after.name, before.name);
    assert_eq!(after.price, before.price);
    assert_eq!(after.user_rating, before.user_rating);
    assert_eq!(after.in_stock, before.in_stock);
}

#[tokio::test]
async fn test_update_clears_rating_and_stock() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;
    admin
        .post_form("/admin/items", &item_fields("Trail Runner", "89.99", "4.5"))
        .await;
    let id = app.items().remove(0).id;

    admin
        .post_form(
            &format!("/admin/items/{id}"),
            &[("name", "Trail Runner II"), ("price", "99"), ("user_rating", "")],
        )
        .await;

    let item = app.items().remove(0);
    assert_eq!(item.name, "Trail Runner II");
    assert_eq!(item.user_rating, None);
    assert!(!item.in_stock);
}

#[tokio::test]
async fn test_delete_removes_item_and_cart_rows() {
    let app = TestApp::new();
    let item = app.add_item("Canvas Tote", "24.00").await;
    let mut customer = app.signed_in("shopper@example.com").await;
    customer
        .post_form("/cart/add", &[("item_id", item.as_str())])
        .await;
    let mut admin = app.signed_in_admin("admin@example.com").await;

    let response = admin
        .post_form(&format!("/admin/items/{item}/delete"), &[])
        .await;

    assert!(response.redirects_to("/?success=deleted"));
    assert!(app.items().is_empty());
    assert!(app.cart_rows(&app.user_id("shopper@example.com")).is_empty());
    assert!(customer.get("/").await.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_editing_missing_item_reports_not_found() {
    let app = TestApp::new();
    let mut admin = app.signed_in_admin("admin@example.com").await;

    let response = admin.get("/admin/items/does-not-exist/edit").await;
    assert!(response.redirects_to("/?error=not_found"));
}

use axum::response::Html;

// Minimal shells: the route guard owns the interesting behavior here, and
// the dashboard itself is rendered client-side from /api/dashboard.

pub async fn index() -> Html<&'static str> {
    // The guard always redirects "/" before this handler runs.
    Html("<!doctype html><title>MenteLeve</title>")
}

pub async fn login_page() -> Html<&'static str> {
    Html(concat!(
        "<!doctype html><html><head><title>MenteLeve — Login</title></head>",
        "<body><div id=\"app\" data-page=\"login\"></div></body></html>",
    ))
}

pub async fn dashboard_page() -> Html<&'static str> {
    Html(concat!(
        "<!doctype html><html><head><title>MenteLeve — Dashboard</title></head>",
        "<body><div id=\"app\" data-page=\"dashboard\"></div></body></html>",
    ))
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View descriptors for the home, login, signup and dashboard pages.
//!
//! The frontend renders these; the server decides what each role sees.

use crate::middleware::auth::{session_token, CurrentSession};
use crate::models::{Identity, ProfileState, Role};
use crate::session::SessionState;
use crate::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Pages anyone can see.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page))
        .route("/signup", get(signup_page))
}

/// Pages behind the session guard.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Link {
    pub label: String,
    pub href: String,
}

fn link(label: &str, href: &str) -> Link {
    Link {
        label: label.to_string(),
        href: href.to_string(),
    }
}

/// Navigation bar entries.
pub fn navigation(authenticated: bool) -> Vec<Link> {
    if authenticated {
        vec![
            link("Dashboard", "/dashboard"),
            link("Profile", "/profile"),
            link("Subscription", "/payment"),
            link("Logout", "/logout"),
        ]
    } else {
        vec![link("Login", "/login"), link("Sign Up", "/signup")]
    }
}

/// Whether the request carries a live, signed-in session.
fn is_signed_in(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> bool {
    session_token(jar, headers)
        .and_then(|token| state.sessions.resolve(&token).ok())
        .is_some_and(|(_, store)| store.current_identity().is_some())
}

// ─── Home ────────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HomeView {
    pub title: String,
    pub tagline: String,
    pub features: Vec<String>,
    pub authenticated: bool,
    pub navigation: Vec<Link>,
    /// Dashboard link when signed in, login/signup otherwise
    pub actions: Vec<Link>,
}

async fn home(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<HomeView> {
    let authenticated = is_signed_in(&state, &jar, &headers);
    let actions = if authenticated {
        vec![link("Go to Dashboard", "/dashboard")]
    } else {
        vec![link("Login", "/login"), link("Sign Up", "/signup")]
    };

    Json(HomeView {
        title: "Welcome to Base App".to_string(),
        tagline: "Your foundation for building amazing applications".to_string(),
        features: [
            "User Authentication (Login/Signup)",
            "Firebase Integration",
            "Stripe Payment Processing",
            "Responsive Design",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        authenticated,
        navigation: navigation(authenticated),
        actions,
    })
}

// ─── Login / Signup ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthFormView {
    pub title: String,
    pub fields: Vec<String>,
    /// Where the form posts
    pub submit: String,
    pub alternate: Link,
    pub authenticated: bool,
}

async fn login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<AuthFormView> {
    Json(AuthFormView {
        title: "Log In".to_string(),
        fields: vec!["email".to_string(), "password".to_string()],
        submit: "/login".to_string(),
        alternate: link("Need an account? Sign Up", "/signup"),
        authenticated: is_signed_in(&state, &jar, &headers),
    })
}

async fn signup_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<AuthFormView> {
    Json(AuthFormView {
        title: "Sign Up".to_string(),
        fields: vec![
            "name".to_string(),
            "email".to_string(),
            "password".to_string(),
        ],
        submit: "/signup".to_string(),
        alternate: link("Already have an account? Log In", "/login"),
        authenticated: is_signed_in(&state, &jar, &headers),
    })
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Feature {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FeatureSection {
    pub title: String,
    pub features: Vec<Feature>,
}

fn section(title: &str, features: &[(&str, &str)]) -> FeatureSection {
    FeatureSection {
        title: title.to_string(),
        features: features
            .iter()
            .map(|(name, description)| Feature {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    }
}

/// Feature sections visible to `role`.
pub fn feature_sections(role: Role) -> Vec<FeatureSection> {
    let mut sections = vec![section(
        "Features Available to All Users",
        &[("Basic Profile", "Manage your basic account information")],
    )];
    if role.is_subscriber() {
        sections.push(section(
            "Premium Features",
            &[
                ("Advanced Analytics", "Access detailed analytics and insights"),
                ("Priority Support", "Get faster responses from our support team"),
            ],
        ));
    }
    if role.is_admin() {
        sections.push(section(
            "Administration",
            &[
                ("User Management", "Manage users and their roles"),
                ("System Settings", "Configure application settings"),
            ],
        ));
    }
    sections
}

/// Upgrade call-to-action for free users, subscription management for
/// subscribers, nothing for admins.
pub fn subscription_action(role: Role) -> Option<Link> {
    match role {
        Role::Free => Some(link("Upgrade to Premium", "/payment")),
        Role::Subscriber => Some(link("Manage Subscription", "/payment")),
        Role::Admin => None,
    }
}

/// Identity and profile card shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileSummary {
    pub name: String,
    /// Shown in place of a missing avatar
    pub initial: String,
    pub email: String,
    pub account_type: String,
    pub avatar_url: Option<String>,
    pub occupation: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub website: Option<Link>,
    pub interests: Vec<String>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Website without scheme or `www.`, for display.
fn website_label(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    stripped.strip_prefix("www.").unwrap_or(stripped).to_string()
}

pub fn profile_summary(
    identity: &Identity,
    role: Role,
    state: Option<&ProfileState>,
) -> ProfileSummary {
    let name = identity
        .display_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or("User")
        .to_string();
    let initial = identity
        .display_name
        .as_deref()
        .and_then(|n| n.chars().next())
        .map(|c| c.to_string())
        .unwrap_or_else(|| "U".to_string());

    let profile = state.map(|s| &s.profile);
    ProfileSummary {
        name,
        initial,
        email: identity.email.clone(),
        account_type: role.as_str().to_uppercase(),
        avatar_url: state.and_then(|s| non_empty(&s.avatar_url)),
        occupation: profile.and_then(|p| non_empty(&p.occupation)),
        location: profile.and_then(|p| non_empty(&p.location)),
        bio: profile.and_then(|p| non_empty(&p.bio)),
        website: profile
            .filter(|p| !p.website.is_empty())
            .map(|p| link(&website_label(&p.website), &p.website)),
        interests: profile.map(|p| p.interests.clone()).unwrap_or_default(),
    }
}

/// Buttons for switching the signed-in user's role during testing.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoleControls {
    pub current_role: Role,
    /// Every role except the current one
    pub available: Vec<Role>,
    pub submit: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardView {
    pub role: Role,
    pub badge: String,
    pub summary: ProfileSummary,
    pub sections: Vec<FeatureSection>,
    pub subscription_action: Option<Link>,
    pub role_controls: Option<RoleControls>,
    pub navigation: Vec<Link>,
}

pub fn dashboard_view(
    identity: &Identity,
    session: &SessionState,
    enable_role_controls: bool,
) -> DashboardView {
    let role = session.role.unwrap_or_default();
    let role_controls = enable_role_controls.then(|| RoleControls {
        current_role: role,
        available: Role::ALL.into_iter().filter(|r| *r != role).collect(),
        submit: "/admin/role".to_string(),
    });

    DashboardView {
        role,
        badge: role.badge().to_string(),
        summary: profile_summary(identity, role, session.profile.as_ref()),
        sections: feature_sections(role),
        subscription_action: subscription_action(role),
        role_controls,
        navigation: navigation(true),
    }
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<CurrentSession>,
) -> Json<DashboardView> {
    let snapshot = session.store.snapshot();
    Json(dashboard_view(
        &session.identity,
        &snapshot,
        state.config.enable_role_controls,
    ))
}

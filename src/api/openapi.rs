use super::handlers::{
    auth::{credentials, federated, session, types},
    health,
};
use utoipa::{
    OpenApi,
    openapi::{Contact, Info, InfoBuilder, License, Tag},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        credentials::login,
        credentials::register,
        session::session,
        session::logout,
        federated::signin,
        federated::callback,
    ),
    components(schemas(
        health::Health,
        health::DatabaseStatus,
        types::LoginRequest,
        types::RegisterRequest,
        types::SessionResponse,
        types::UserResponse,
        types::ErrorResponse,
    ))
)]
struct ApiDoc;

/// The `OpenAPI` document for every served endpoint, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service liveness and database status".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description =
        Some("Credential and federated sign-in, sessions, and sign-up".to_string());

    doc.tags = Some(vec![health_tag, auth_tag]);
    doc
}

fn cargo_info() -> Info {
    let description = env!("CARGO_PKG_DESCRIPTION").trim();
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description((!description.is_empty()).then_some(description))
        .build();

    info.contact = author_contact(env!("CARGO_PKG_AUTHORS"));

    let license_id = env!("CARGO_PKG_LICENSE").trim();
    if !license_id.is_empty() {
        let mut license = License::new(license_id);
        license.identifier = Some(license_id.to_string());
        info.license = Some(license);
    }
    info
}

/// Contact for the first of the `;`-separated Cargo authors (`Name <email>`).
fn author_contact(authors: &str) -> Option<Contact> {
    let first = authors.split(';').next()?.trim();
    let (name, email) = match first.split_once('<') {
        Some((name, email)) => (name.trim(), email.trim_end_matches('>').trim()),
        None => (first, ""),
    };
    if name.is_empty() && email.is_empty() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = (!name.is_empty()).then(|| name.to_string());
    contact.email = (!email.is_empty()).then(|| email.to_string());
    Some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_comes_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, "confgate");

        let contact = doc.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Confgate"));
        assert_eq!(contact.email.as_deref(), Some("team@confgate.dev"));

        let license = doc.info.license.map(|license| license.name);
        assert_eq!(license.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn every_route_is_documented() {
        let doc = openapi();
        let tags: Vec<String> = doc
            .tags
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(tags, ["health", "auth"]);
        for path in [
            "/health",
            "/api/auth/login",
            "/api/auth/register",
            "/api/auth/session",
            "/api/auth/logout",
            "/api/auth/signin/{provider}",
            "/api/auth/callback/{provider}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }

    #[test]
    fn author_contact_variants() {
        let contact = author_contact("Jane Doe <jane@example.org>; Other <o@example.org>");
        assert_eq!(
            contact.map(|c| (c.name, c.email)),
            Some((Some("Jane Doe".to_string()), Some("jane@example.org".to_string())))
        );

        let contact = author_contact("Jane Doe");
        assert_eq!(contact.and_then(|c| c.email), None);

        assert!(author_contact("").is_none());
    }
}

//! Komoot client built on the web session API used by komoot.com.
//!
//! There is no official API. Authentication is the browser sign-in flow: the
//! session cookies it produces are kept in the client's cookie store and sent
//! with every later request.

use crate::common::config::{Config, HttpConfig, KomootApiConfig, KomootCredentials};
use crate::common::error::KomootError;
use crate::common::types::{Tour, TourPage};
use crate::tour_sync::TourSource;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};

/// Asks Komoot to leave out embedded sub-resources.
const ONLY_PROPS_HEADER: &str = "onlyprops";

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    reason: &'a str,
}

pub struct KomootClient {
    client: ClientWithMiddleware,
    account_url: String,
    api_url: String,
    user_id: String,
    locale: String,
    page_size: u32,
}

impl KomootClient {
    pub fn new(
        api: &KomootApiConfig,
        http: &HttpConfig,
        user_id: &str,
    ) -> Result<Self, KomootError> {
        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(http.connect_timeout)
            .timeout(http.request_timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(http.max_retries);
        let client = ClientBuilder::new(http_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            account_url: api.account_url.trim_end_matches('/').to_string(),
            api_url: api.api_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            locale: api.locale.clone(),
            page_size: api.page_size,
        })
    }

    /// Build a client and sign in with the configured credentials.
    pub async fn login(config: &Config) -> Result<Self, KomootError> {
        let client = Self::new(&config.komoot_api, &config.http, &config.komoot.user_id)?;
        client.sign_in(&config.komoot).await?;
        Ok(client)
    }

    pub async fn sign_in(&self, credentials: &KomootCredentials) -> Result<(), KomootError> {
        let signin_url = format!("{}/v1/signin", self.account_url);
        info!(email = %credentials.email, "Signing in to Komoot");

        // Initial cookies
        let response = self.client.get(&signin_url).send().await?;
        ensure_signed_in("signin page", response.status())?;

        let response = self
            .client
            .post(&signin_url)
            .json(&SignInRequest {
                email: &credentials.email,
                password: &credentials.password,
                reason: "null",
            })
            .send()
            .await?;
        ensure_signed_in("credentials", response.status())?;

        let transfer_url = format!("{}/actions/transfer?type=signin", self.account_url);
        let response = self.client.get(&transfer_url).send().await?;
        ensure_signed_in("session transfer", response.status())?;

        info!("Signed in to Komoot");
        Ok(())
    }

    fn tours_url(&self) -> String {
        format!("{}/users/{}/tours/", self.api_url, self.user_id)
    }

    fn track_url(&self, tour_id: &str) -> String {
        format!("{}/tours/{tour_id}.gpx", self.api_url)
    }
}

impl TourSource for KomootClient {
    async fn fetch_page(&self, page: u32) -> Result<TourPage, KomootError> {
        let response = self
            .client
            .get(self.tours_url())
            .query(&[
                ("sport_types", ""),
                ("type", "tour_recorded"),
                ("sort_field", "date"),
                ("sort_direction", "desc"),
                ("name", ""),
                ("status", "private"),
                ("hl", self.locale.as_str()),
            ])
            .query(&[("page", page), ("limit", self.page_size)])
            .header(ONLY_PROPS_HEADER, "true")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            error!(page, %status, "Could not retrieve tours from Komoot");
            return Err(KomootError::Http(status));
        }

        let body = response.text().await?;
        let tour_page = TourPage::from_json(&body)?;
        if let TourPage::Tours(ref tours) = tour_page {
            debug!(page, tours = tours.len(), "Fetched tour page");
        }
        Ok(tour_page)
    }

    async fn download_track(&self, tour: &Tour, path: &Path) -> Result<(), KomootError> {
        let response = self
            .client
            .get(self.track_url(&tour.id))
            .header(ONLY_PROPS_HEADER, "true")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(tour_id = %tour.id, %status, "Failed to download track");
            return Err(KomootError::Http(status));
        }

        let body = response.bytes().await?;

        // Write beside the target first so an interrupted run never leaves a
        // partial file under the name that marks the tour as synced.
        let partial = path.with_extension("gpx.part");
        let io_error = |source| KomootError::Io {
            path: path.to_path_buf(),
            source,
        };
        tokio::fs::write(&partial, &body).await.map_err(io_error)?;
        tokio::fs::rename(&partial, path).await.map_err(io_error)?;

        debug!(tour_id = %tour.id, bytes = body.len(), path = %path.display(), "Saved track");
        Ok(())
    }
}

fn ensure_signed_in(step: &'static str, status: StatusCode) -> Result<(), KomootError> {
    if status.is_success() {
        Ok(())
    } else {
        error!(step, %status, "Komoot sign-in failed");
        Err(KomootError::Authentication { step, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_server::{self, Route};
    use tempdir::TempDir;

    const TOUR_PAGE: &str = r#"{"_embedded": {"tours": [
        {"id": 5, "name": "Morning Ride", "date": "2023-05-01T10:00:00+02:00", "sport": "mtb"}
    ]}}"#;

    fn local_client(routes: Vec<Route>) -> KomootClient {
        let base = test_server::serve(routes);
        let api = KomootApiConfig {
            account_url: base.clone(),
            api_url: base,
            ..KomootApiConfig::default()
        };
        let http = HttpConfig {
            max_retries: 0,
            ..HttpConfig::default()
        };
        KomootClient::new(&api, &http, "42").unwrap()
    }

    fn ride() -> Tour {
        Tour {
            id: "5".to_string(),
            name: "Morning Ride".to_string(),
            date: "2023-05-01T10:00:00+02:00".to_string(),
            sport: "mtb".to_string(),
        }
    }

    fn client() -> KomootClient {
        let api = KomootApiConfig {
            account_url: "https://account.example.test/".to_string(),
            api_url: "https://api.example.test/api/v007/".to_string(),
            ..KomootApiConfig::default()
        };
        KomootClient::new(&api, &HttpConfig::default(), "1714012209405").unwrap()
    }

    #[test]
    fn builds_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.tours_url(),
            "https://api.example.test/api/v007/users/1714012209405/tours/"
        );
        assert_eq!(
            client.track_url("98765"),
            "https://api.example.test/api/v007/tours/98765.gpx"
        );
        assert_eq!(client.account_url, "https://account.example.test");
    }

    #[test]
    fn sign_in_status_check() {
        assert!(ensure_signed_in("credentials", StatusCode::OK).is_ok());
        assert!(matches!(
            ensure_signed_in("credentials", StatusCode::UNAUTHORIZED),
            Err(KomootError::Authentication {
                step: "credentials",
                status: StatusCode::UNAUTHORIZED
            })
        ));
    }

    #[test]
    fn sign_in_payload_shape() {
        let payload = serde_json::to_value(SignInRequest {
            email: "rider@example.com",
            password: "hunter2",
            reason: "null",
        })
        .unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"email": "rider@example.com", "password": "hunter2", "reason": "null"})
        );
    }

    #[tokio::test]
    async fn fetch_page_parses_tours() {
        let client = local_client(vec![("GET /users/42/tours/?", 200, TOUR_PAGE)]);

        let TourPage::Tours(tours) = client.fetch_page(0).await.unwrap() else {
            panic!("expected tours");
        };
        assert_eq!(tours, vec![ride()]);
    }

    #[tokio::test]
    async fn fetch_page_error_status_is_reported() {
        let client = local_client(vec![("GET /users/42/tours/", 500, "")]);

        let err = client.fetch_page(3).await.unwrap_err();
        assert!(matches!(
            err,
            KomootError::Http(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }

    #[tokio::test]
    async fn download_writes_track() {
        let client = local_client(vec![("GET /tours/5.gpx", 200, "<gpx/>")]);
        let dir = TempDir::new("komoot-download").unwrap();
        let path = dir.path().join("ride.gpx");

        client.download_track(&ride(), &path).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<gpx/>");
        assert!(!dir.path().join("ride.gpx.part").exists());
    }

    #[tokio::test]
    async fn failed_download_leaves_no_file() {
        let client = local_client(vec![("GET /tours/5.gpx", 404, r#"{"error": "NotFound"}"#)]);
        let dir = TempDir::new("komoot-download").unwrap();
        let path = dir.path().join("ride.gpx");

        let err = client.download_track(&ride(), &path).await.unwrap_err();

        assert!(matches!(err, KomootError::Http(StatusCode::NOT_FOUND)));
        assert!(!path.exists());
        assert!(!dir.path().join("ride.gpx.part").exists());
    }

    #[tokio::test]
    async fn rejected_credentials_abort_sign_in() {
        let client = local_client(vec![
            ("GET /v1/signin", 200, "{}"),
            ("POST /v1/signin", 401, "{}"),
        ]);
        let credentials = KomootCredentials {
            email: "rider@example.com".to_string(),
            password: "wrong".to_string(),
            user_id: "42".to_string(),
        };

        let err = client.sign_in(&credentials).await.unwrap_err();
        assert!(matches!(
            err,
            KomootError::Authentication {
                step: "credentials",
                status: StatusCode::UNAUTHORIZED
            }
        ));
    }

    #[tokio::test]
    async fn sign_in_follows_all_steps() {
        let client = local_client(vec![
            ("GET /v1/signin", 200, "{}"),
            ("POST /v1/signin", 200, "{}"),
            ("GET /actions/transfer?type=signin", 200, "{}"),
        ]);
        let credentials = KomootCredentials {
            email: "rider@example.com".to_string(),
            password: "hunter2".to_string(),
            user_id: "42".to_string(),
        };

        client.sign_in(&credentials).await.unwrap();
    }
}

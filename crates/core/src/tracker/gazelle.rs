//! Gazelle tracker client.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::{multipart, Client, Response};
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::candidate::SelectionMode;
use crate::config::TrackerConfig;
use crate::release::{ArtistCredits, Candidate, MediaType, ReleaseGroup, Torrent};

use super::{Credentials, Session, TrackerApi, TrackerError, UploadRequest};

static TORRENT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"torrents\.php\?id=(\d+)&(?:amp;)?torrentid=(\d+)").expect("valid regex")
});

static SEEDING_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"torrents\.php\?groupId=(\d+)&(?:amp;)?torrentid=(\d+)#\d+").expect("valid regex")
});

const TWENTY_FOUR_BIT_ENCODING: &str = "24bit Lossless";

/// Tracker client speaking the Gazelle web and AJAX API.
pub struct GazelleClient {
    client: Client,
    /// Base URL, always ending in `/`.
    base_url: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    session: RwLock<Option<Session>>,
}

impl GazelleClient {
    /// Create a new client. No request is made until [`TrackerApi::authenticate`].
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .user_agent(concat!("morebetter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::ConnectionFailed(e.to_string()))?;

        let mut base_url = config.endpoint.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            min_interval: Duration::from_millis(config.request_interval_ms),
            last_request: Mutex::new(None),
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Waits until the minimum interval since the previous request has passed.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn current_session(&self) -> Result<Session, TrackerError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(TrackerError::NotAuthenticated)
    }

    async fn authkey(&self) -> String {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.authkey.clone())
            .unwrap_or_default()
    }

    /// GET an AJAX action and unwrap the response envelope.
    async fn ajax_get<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<T, TrackerError> {
        self.throttle().await;

        let mut query = vec![("action", action.to_string()), ("auth", self.authkey().await)];
        query.extend(params.iter().map(|(k, v)| (*k, v.clone())));

        let response = self
            .client
            .get(self.url("ajax.php"))
            .query(&query)
            .send()
            .await
            .map_err(TrackerError::from_request)?;

        parse_envelope(action, response).await
    }

    /// POST a multipart form to an AJAX action.
    async fn ajax_post<T: DeserializeOwned>(
        &self,
        action: &str,
        form: multipart::Form,
    ) -> Result<T, TrackerError> {
        self.throttle().await;

        let response = self
            .client
            .post(self.url("ajax.php"))
            .query(&[("action", action)])
            .multipart(form.text("auth", self.authkey().await))
            .send()
            .await
            .map_err(TrackerError::from_request)?;

        parse_envelope(action, response).await
    }

    /// GET an HTML page.
    async fn get_page(&self, path: &str) -> Result<String, TrackerError> {
        self.throttle().await;

        let response = self
            .client
            .get(self.url(path))
            .query(&[("auth", self.authkey().await)])
            .send()
            .await
            .map_err(TrackerError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::ApiError(format!("HTTP {} for {}", status, path)));
        }

        response
            .text()
            .await
            .map_err(|e| TrackerError::ApiError(e.to_string()))
    }

    /// Walks the paginated `torrents.php?type=<kind>` listing for each media filter.
    async fn crawl_torrents_php(
        &self,
        kind: &str,
        user_id: u64,
        media_params: &[String],
        skip: &BTreeSet<String>,
    ) -> Result<Vec<Candidate>, TrackerError> {
        info!("Finding {} torrents", kind);
        let mut found = Vec::new();

        for media in media_params {
            let mut page = 1u32;
            loop {
                let path = format!(
                    "torrents.php?type={}&userid={}&format=FLAC{}&page={}",
                    kind, user_id, media, page
                );
                let html = self.get_page(&path).await?;
                let links = parse_torrent_links(&html)?;

                if links.is_empty() {
                    debug!("No {} results on page {}{}", kind, page, media);
                    break;
                }

                found.extend(
                    links
                        .into_iter()
                        .filter(|c| !skip.contains(&c.ledger_id())),
                );

                if !has_next_page(&html, page) {
                    break;
                }
                page += 1;
            }
        }

        Ok(found)
    }

    async fn crawl_seeding(&self, skip: &BTreeSet<String>) -> Result<Vec<Candidate>, TrackerError> {
        info!("Finding seeding torrents that need transcodes");
        let html = self
            .get_page("better.php?method=transcode&filter=seeding")
            .await?;

        Ok(parse_seeding_links(&html)?
            .into_iter()
            .filter(|c| !skip.contains(&c.ledger_id()))
            .collect())
    }
}

async fn parse_envelope<T: DeserializeOwned>(
    action: &str,
    response: Response,
) -> Result<T, TrackerError> {
    let status = response.status();
    debug!("ajax.php?action={} returned HTTP {}", action, status);

    let body = response
        .text()
        .await
        .map_err(|e| TrackerError::ApiError(e.to_string()))?;

    let envelope: AjaxEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
        TrackerError::InvalidResponse(format!(
            "{} (HTTP {}): {}: {}",
            action,
            status,
            e,
            body.chars().take(100).collect::<String>()
        ))
    })?;

    match (envelope.status.as_str(), envelope.response) {
        ("success", Some(response)) => Ok(response),
        _ => {
            let message = envelope.error.unwrap_or_else(|| envelope.status.clone());
            if message.contains("bad id") || message.contains("not found") {
                Err(TrackerError::NotFound(message))
            } else {
                Err(TrackerError::ApiError(format!("{}: {}", action, message)))
            }
        }
    }
}

/// AJAX response envelope.
#[derive(Debug, Deserialize)]
struct AjaxEnvelope<T> {
    status: String,
    response: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// `ajax.php?action=index` response.
#[derive(Debug, Deserialize)]
struct IndexResponse {
    id: u64,
    authkey: String,
    passkey: String,
}

/// `ajax.php?action=torrentgroup` response.
#[derive(Debug, Deserialize)]
struct GroupResponse {
    group: GroupInfo,
    torrents: Vec<Torrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupInfo {
    id: u64,
    name: String,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    music_info: Option<ArtistCredits>,
}

impl GroupResponse {
    fn into_release_group(self) -> ReleaseGroup {
        let group_id = self.group.id;
        let torrents = self
            .torrents
            .into_iter()
            .map(|mut t| {
                t.group_id.get_or_insert(group_id);
                t
            })
            .collect();

        ReleaseGroup {
            id: group_id,
            name: self.group.name,
            year: self.group.year,
            credits: self.group.music_info.unwrap_or_default(),
            torrents,
        }
    }
}

/// Release links in the `torrent_table` of a user torrent listing, in page
/// order, deduplicated. Links elsewhere on the page are ignored.
fn parse_torrent_links(html: &str) -> Result<Vec<Candidate>, TrackerError> {
    collect_links(
        html,
        "table.torrent_table tr.torrent_row div.group_info a[href]",
        &TORRENT_LINK,
    )
}

/// Links on the `better.php` seeding page.
fn parse_seeding_links(html: &str) -> Result<Vec<Candidate>, TrackerError> {
    collect_links(html, "a[href]", &SEEDING_LINK)
}

fn collect_links(
    html: &str,
    selector: &str,
    href: &Regex,
) -> Result<Vec<Candidate>, TrackerError> {
    let selector = Selector::parse(selector)
        .map_err(|e| TrackerError::InvalidResponse(format!("bad selector {}: {}", selector, e)))?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let links = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|link| {
            let caps = href.captures(link)?;
            let group_id = caps.get(1)?.as_str().parse().ok()?;
            let torrent_id = caps.get(2)?.as_str().parse().ok()?;
            Some(Candidate::new(group_id, torrent_id))
        })
        .filter(|c| seen.insert(c.torrent_id))
        .collect();
    Ok(links)
}

fn has_next_page(html: &str, page: u32) -> bool {
    html.contains(&format!("page={}", page + 1))
}

/// Gazelle accepts one `media` value per query, so a partial filter means
/// one crawl per media type. The full set means no filter at all.
fn media_params(media: &BTreeSet<MediaType>) -> Vec<String> {
    if media.is_empty() || *media == MediaType::all() {
        vec![String::new()]
    } else {
        media
            .iter()
            .map(|m| format!("&media={}", m.tracker_label()))
            .collect()
    }
}

/// Edition fields shared by the upload and edit forms.
fn remaster_fields(torrent: &Torrent) -> Vec<(&'static str, String)> {
    if torrent.remastered {
        vec![
            ("remaster", "on".to_string()),
            (
                "remaster_year",
                torrent.remaster_year.map(|y| y.to_string()).unwrap_or_default(),
            ),
            ("remaster_title", torrent.remaster_title.clone()),
            ("remaster_record_label", torrent.remaster_record_label.clone()),
            (
                "remaster_catalogue_number",
                torrent.remaster_catalogue_number.clone(),
            ),
        ]
    } else {
        vec![
            ("remaster_year", String::new()),
            ("remaster_title", String::new()),
            ("remaster_record_label", String::new()),
            ("remaster_catalogue_number", String::new()),
        ]
    }
}

#[async_trait]
impl TrackerApi for GazelleClient {
    fn name(&self) -> &str {
        "gazelle"
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
        totp: Option<&str>,
    ) -> Result<Session, TrackerError> {
        self.throttle().await;

        let mut params = vec![
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("login", "Log in"),
        ];
        if let Some(code) = totp {
            params.push(("mfa", code));
        }

        let response = self
            .client
            .post(self.url("login.php"))
            .form(&params)
            .send()
            .await
            .map_err(TrackerError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::AuthenticationFailed(format!("HTTP {}", status)));
        }

        // The login page answers 200 either way; the index call tells us if the
        // session cookie is valid.
        let index: IndexResponse = self.ajax_get("index", &[]).await.map_err(|e| match e {
            TrackerError::Timeout => TrackerError::Timeout,
            other => TrackerError::AuthenticationFailed(other.to_string()),
        })?;

        let session = Session {
            user_id: index.id,
            authkey: index.authkey,
            passkey: index.passkey,
        };
        *self.session.write().await = Some(session.clone());

        info!("Tracker session opened for user {}", session.user_id);
        Ok(session)
    }

    async fn list_candidates(
        &self,
        mode: SelectionMode,
        media: &BTreeSet<MediaType>,
        skip: &BTreeSet<String>,
    ) -> Result<Vec<Candidate>, TrackerError> {
        let session = self.current_session().await?;
        let media_params = media_params(media);
        let mut candidates = Vec::new();

        if mode.includes_snatched() {
            candidates.extend(
                self.crawl_torrents_php("snatched", session.user_id, &media_params, skip)
                    .await?,
            );
        }
        if mode.includes_uploaded() {
            candidates.extend(
                self.crawl_torrents_php("uploaded", session.user_id, &media_params, skip)
                    .await?,
            );
        }
        if mode.includes_seeding() {
            candidates.extend(self.crawl_seeding(skip).await?);
        }

        Ok(candidates)
    }

    async fn fetch_group(&self, group_id: u64) -> Result<ReleaseGroup, TrackerError> {
        self.current_session().await?;
        let response: GroupResponse = self
            .ajax_get("torrentgroup", &[("id", group_id.to_string())])
            .await?;
        Ok(response.into_release_group())
    }

    async fn mark_twenty_four_bit(&self, torrent: &Torrent) -> Result<(), TrackerError> {
        let session = self.current_session().await?;
        self.throttle().await;

        let mut form = vec![
            ("submit", "true".to_string()),
            ("type", "1".to_string()),
            ("action", "takeedit".to_string()),
            ("auth", session.authkey),
            ("torrentid", torrent.id.to_string()),
            ("media", torrent.media.clone()),
            ("format", torrent.format.clone()),
            ("bitrate", TWENTY_FOUR_BIT_ENCODING.to_string()),
            ("release_desc", torrent.description.clone()),
        ];
        if torrent.remastered {
            form.extend(remaster_fields(torrent));
        }

        let response = self
            .client
            .post(self.url("torrents.php"))
            .query(&[("action", "edit".to_string()), ("id", torrent.id.to_string())])
            .form(&form)
            .send()
            .await
            .map_err(TrackerError::from_request)?;

        let status = response.status();
        if !status.is_success() && !status.is_redirection() {
            return Err(TrackerError::ApiError(format!(
                "edit of torrent {} returned HTTP {}",
                torrent.id, status
            )));
        }

        info!("Relabelled torrent {} as {}", torrent.id, TWENTY_FOUR_BIT_ENCODING);
        Ok(())
    }

    async fn upload(&self, request: &UploadRequest) -> Result<(), TrackerError> {
        self.current_session().await?;

        let data = tokio::fs::read(&request.package).await?;
        let file_part = multipart::Part::bytes(data)
            .file_name("1.torrent")
            .mime_str("application/x-bittorrent")
            .map_err(|e| TrackerError::ApiError(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("file_input", file_part)
            .text("type", "0")
            .text("groupid", request.group_id.to_string());

        for (key, value) in remaster_fields(&request.source) {
            form = form.text(key, value);
        }

        form = form
            .text("format", request.format.format)
            .text("bitrate", request.format.encoding)
            .text("media", request.source.media.clone());

        if !request.description.is_empty() {
            form = form.text("release_desc", request.description.join("\n"));
        }

        let _: serde_json::Value = self.ajax_post("upload", form).await?;
        info!(
            "Uploaded {} transcode of torrent {} to group {}",
            request.format.name, request.source.id, request.group_id
        );
        Ok(())
    }

    fn permalink(&self, torrent: &Torrent) -> String {
        format!("{}torrents.php?torrentid={}", self.base_url, torrent.id)
    }

    async fn passkey(&self) -> Result<String, TrackerError> {
        let session = self.current_session().await?;
        if session.passkey.is_empty() {
            warn!("Tracker session has an empty passkey");
        }
        Ok(session.passkey)
    }
}

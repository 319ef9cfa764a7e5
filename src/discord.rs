use anyhow::Result;
use dialoguer::Password;
use log::{info, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use thiserror::Error;

use crate::download::Client;
use crate::sticker::{PackEntry, StickerId};

const STICKER_PACKS_URL: &str = "https://discord.com/api/v9/users/@me/sticker-packs";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("sticker-pack listing failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sticker-pack listing returned HTTP {status}: {body}")]
    Response { status: StatusCode, body: String },
    #[error("no session token given")]
    MissingToken,
}

pub fn apng_url(id: &StickerId) -> String {
    format!("https://media.discordapp.net/stickers/{id}.png?passthrough=true")
}
pub fn lottie_url(id: &StickerId) -> String {
    format!("https://discord.com/stickers/{id}.json")
}

/// `DISCORD_TOKEN` from the environment, otherwise ask for it
pub async fn session_token() -> Result<String> {
    if let Ok(token) = dotenv::var("DISCORD_TOKEN") {
        return Ok(token);
    }

    warn!("`DISCORD_TOKEN` isn't set");
    let token = tokio::task::spawn_blocking(|| {
        Password::new()
            .with_prompt("Discord session token")
            .allow_empty_password(true)
            .interact()
    })
    .await??;

    if token.trim().is_empty() {
        Err(ApiError::MissingToken.into())
    } else {
        Ok(token.trim().to_owned())
    }
}

/// The sticker packs available to the account behind `token`
pub async fn sticker_packs(client: &Client, token: &str) -> Result<Vec<PackEntry>, ApiError> {
    sticker_packs_at(client, STICKER_PACKS_URL, token).await
}

async fn sticker_packs_at(
    client: &Client,
    url: &str,
    token: &str,
) -> Result<Vec<PackEntry>, ApiError> {
    let response = client
        .inner()
        .get(url)
        .header(ACCEPT, "*/*")
        .header(AUTHORIZATION, token)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Response { status, body });
    }

    let packs = response.json::<Vec<PackEntry>>().await?;
    info!("fetched {} sticker packs", packs.len());
    Ok(packs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::tests::{serve_once, NOT_FOUND};

    #[test]
    fn asset_urls_derive_from_id() {
        let id = StickerId::new("111");
        assert_eq!(
            apng_url(&id),
            "https://media.discordapp.net/stickers/111.png?passthrough=true"
        );
        assert_eq!(lottie_url(&id), "https://discord.com/stickers/111.json");
    }

    #[tokio::test]
    async fn listing_error_keeps_status_and_body() {
        let url = format!("{}/api/v9/users/@me/sticker-packs", serve_once(NOT_FOUND));
        let client = Client::new().unwrap();

        let err = sticker_packs_at(&client, &url, "token").await.unwrap_err();
        match err {
            ApiError::Response { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn listing_parses_packs() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 91\r\n\
             Connection: close\r\n\
             \r\n\
             [{\"sticker_pack\":{\"name\":\"Pack1\",\"stickers\":[{\"id\":\"111\",\"name\":\"wave\",\"format_type\":2}]}}]",
        );
        let client = Client::new().unwrap();

        let packs = sticker_packs_at(&client, &url, "token").await.unwrap();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].sticker_pack.stickers[0].name, "wave");
    }
}

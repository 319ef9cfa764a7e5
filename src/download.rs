use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use log::info;

use crate::ports::Downloader;

const USER_AGENT: &str = "\
    Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/110.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Client(reqwest::Client);

impl Client {
    pub fn new() -> Result<Client> {
        Ok(Self(
            reqwest::ClientBuilder::new()
                .user_agent(USER_AGENT)
                .build()?,
        ))
    }
    pub fn inner(&self) -> &reqwest::Client {
        &self.0
    }

    /// The whole body, non-success statuses are errors
    pub async fn get(&self, url: &str) -> Result<Bytes> {
        Ok(self
            .0
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?)
    }
}

#[async_trait]
impl Downloader for Client {
    async fn download(&self, url: &str, dst: &Path) -> Result<()> {
        let data = self.get(url).await?;
        tokio::fs::write(dst, &data).await?;
        info!("downloaded `{url}` ({} bytes)", data.len());
        Ok(())
    }
}

use std::fmt::{Debug, Display};
use std::path::Path;

use anyhow::Context;
use lazy_regex::lazy_regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Sticker ids show up as strings in the API and as plain numbers in some
/// hand-made snapshots, accept both.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StickerId(String);

impl StickerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl<'de> Deserialize<'de> for StickerId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Str(id) => Self::new(id),
            Raw::Num(id) => Self::new(id.to_string()),
        })
    }
}

impl Display for StickerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl Debug for StickerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StickerId").field(&self.0).finish()
    }
}

/// `format_type` as sent by the platform.
///
/// Anything that isn't an animated format, including a missing or `null`
/// value, ends up as `Other` so one odd sticker can't spoil the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<i64>", into = "i64")]
pub enum StickerFormat {
    /// Animated PNG, `2`
    Apng,
    /// Lottie animation, `3`
    Lottie,
    Other(i64),
}

impl Default for StickerFormat {
    fn default() -> Self {
        Self::Other(0)
    }
}

impl From<Option<i64>> for StickerFormat {
    fn from(value: Option<i64>) -> Self {
        match value {
            Some(2) => Self::Apng,
            Some(3) => Self::Lottie,
            Some(other) => Self::Other(other),
            None => Self::default(),
        }
    }
}

impl From<StickerFormat> for i64 {
    fn from(format: StickerFormat) -> Self {
        match format {
            StickerFormat::Apng => 2,
            StickerFormat::Lottie => 3,
            StickerFormat::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sticker {
    pub id: StickerId,
    pub name: String,
    #[serde(default)]
    pub format_type: StickerFormat,
}

impl Sticker {
    /// File stem this sticker would like for its outputs, see
    /// [`crate::layout::StemSet`] for how clashes within a pack are settled.
    pub fn file_stem(&self) -> String {
        sanitize_component(&self.name).unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StickerPack {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StickerId>,
    pub name: String,
    #[serde(default)]
    pub stickers: Vec<Sticker>,
}

impl StickerPack {
    /// Directory name of this pack, `index` is its position in the listing.
    pub fn dir_name(&self, index: usize) -> String {
        sanitize_component(&self.name)
            .or_else(|| self.id.as_ref().map(StickerId::to_string))
            .unwrap_or_else(|| format!("pack-{}", index + 1))
    }
}

/// One element of the sticker-pack listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackEntry {
    pub sticker_pack: StickerPack,
}

/// Turns an untrusted name into a single path component.
///
/// Separators, characters reserved on common filesystems and control
/// characters become `_`. Surrounding whitespace and dots are trimmed so the
/// result can never be `.`, `..` or hidden. Returns `None` if nothing usable
/// is left.
pub fn sanitize_component(name: &str) -> Option<String> {
    let replaced = lazy_regex!(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

pub fn parse_listing(json: &str) -> anyhow::Result<Vec<PackEntry>> {
    Ok(serde_json::from_str(json)?)
}

/// Load a previously captured sticker-pack listing
pub async fn load_snapshot<P>(path: P) -> anyhow::Result<Vec<PackEntry>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("couldn't read snapshot `{}`", path.display()))?;
    parse_listing(&data).with_context(|| format!("malformed snapshot `{}`", path.display()))
}

pub async fn save_snapshot<P>(path: P, packs: &[PackEntry]) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let data = serde_json::to_string_pretty(packs)?;
    Ok(tokio::fs::write(path, data).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"[
        {
            "sticker_pack": {
                "id": "847199849233514549",
                "name": "Wumpus Beyond",
                "stickers": [
                    { "id": "749054660769218631", "name": "Wave", "format_type": 3, "tags": "wave" },
                    { "id": 111, "name": "wave", "format_type": 2 },
                    { "id": "222", "name": "still", "format_type": 1 }
                ]
            }
        },
        { "sticker_pack": { "name": "Empty" } }
    ]"#;

    #[test]
    fn parses_listing() {
        let packs = parse_listing(SNAPSHOT).unwrap();
        assert_eq!(packs.len(), 2);

        let pack = &packs[0].sticker_pack;
        assert_eq!(pack.name, "Wumpus Beyond");
        assert_eq!(pack.stickers.len(), 3);
        assert_eq!(pack.stickers[0].format_type, StickerFormat::Lottie);
        assert_eq!(pack.stickers[1].id, StickerId::new("111"));
        assert_eq!(pack.stickers[1].format_type, StickerFormat::Apng);
        assert_eq!(pack.stickers[2].format_type, StickerFormat::Other(1));

        assert!(packs[1].sticker_pack.stickers.is_empty());
        assert!(packs[1].sticker_pack.id.is_none());
    }

    #[test]
    fn odd_format_types_dont_spoil_the_listing() {
        let packs = parse_listing(
            r#"[{ "sticker_pack": { "name": "Odd", "stickers": [
                { "id": "1", "name": "negative", "format_type": -1 },
                { "id": "2", "name": "missing" },
                { "id": "3", "name": "null", "format_type": null },
                { "id": "4", "name": "fine", "format_type": 2 }
            ] } }]"#,
        )
        .unwrap();

        let formats = packs[0]
            .sticker_pack
            .stickers
            .iter()
            .map(|sticker| sticker.format_type)
            .collect::<Vec<_>>();
        assert_eq!(
            formats,
            [
                StickerFormat::Other(-1),
                StickerFormat::Other(0),
                StickerFormat::Other(0),
                StickerFormat::Apng,
            ]
        );
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_component("wave").as_deref(), Some("wave"));
        assert_eq!(sanitize_component("a/b\\c").as_deref(), Some("a_b_c"));
        assert_eq!(sanitize_component("what?: \"no\"").as_deref(), Some("what__ _no_"));
        assert_eq!(sanitize_component("  .hidden. ").as_deref(), Some("hidden"));
        assert_eq!(sanitize_component(".."), None);
        assert_eq!(sanitize_component("/"), None);
        assert_eq!(sanitize_component(""), None);
    }

    #[test]
    fn falls_back_to_ids() {
        let sticker = Sticker {
            id: StickerId::new("42"),
            name: "../..".to_owned(),
            format_type: StickerFormat::Apng,
        };
        assert_eq!(sticker.file_stem(), "42");

        let mut pack = StickerPack {
            id: Some(StickerId::new("7")),
            name: "///".to_owned(),
            stickers: Vec::new(),
        };
        assert_eq!(pack.dir_name(0), "7");
        pack.id = None;
        assert_eq!(pack.dir_name(2), "pack-3");
    }

    #[test]
    fn keeps_dots_inside_names() {
        let sticker = Sticker {
            id: StickerId::new("1"),
            name: "v1.2".to_owned(),
            format_type: StickerFormat::Lottie,
        };
        assert_eq!(sticker.file_stem(), "v1.2");
    }

    #[tokio::test]
    async fn snapshot_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let packs = parse_listing(SNAPSHOT).unwrap();

        save_snapshot(&path, &packs).await.unwrap();
        let loaded = load_snapshot(&path).await.unwrap();

        assert_eq!(loaded.len(), packs.len());
        assert_eq!(loaded[0].sticker_pack.stickers[2].format_type, StickerFormat::Other(1));
    }

    #[tokio::test]
    async fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(dir.path().join("nope.json")).await.is_err());
    }
}

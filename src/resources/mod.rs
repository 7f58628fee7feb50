//! Asset loading.
//!
//! Natively assets are read from `./assets`, falling back to the copy that
//! `build.rs` places in `OUT_DIR`. On the web they are fetched relative to the
//! page origin.

use anyhow::Context as _;

use crate::typeface::Typeface;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read the page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

#[cfg(not(target_arch = "wasm32"))]
fn asset_path(file_name: &str) -> std::path::PathBuf {
    let local = std::path::Path::new("./").join("assets").join(file_name);
    if local.exists() {
        return local;
    }
    std::path::Path::new(env!("OUT_DIR"))
        .join("assets")
        .join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = asset_path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

/// Load and parse a three.js typeface JSON file.
pub async fn load_typeface(file_name: &str) -> anyhow::Result<Typeface> {
    let json = load_string(file_name).await?;
    let typeface = Typeface::from_json(&json)
        .with_context(|| format!("{} is not a valid typeface", file_name))?;
    log::info!(
        "loaded typeface {:?} with {} glyphs",
        typeface.family_name,
        typeface.glyphs.len()
    );
    Ok(typeface)
}

/// Load and decode an image. The GPU upload happens separately so this can
/// run away from the render loop.
pub async fn load_matcap_image(file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let bytes = load_binary(file_name).await?;
    let img = image::load_from_memory(&bytes)
        .with_context(|| format!("{} is not a supported image", file_name))?;
    log::info!("loaded matcap {} ({}x{})", file_name, img.width(), img.height());
    Ok(img)
}

//! Print the OpenAPI document of the match-sync HTTP surface.

use anyhow::Context;
use match_sync::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi();
    let json = doc.to_pretty_json().context("serialising OpenAPI document")?;
    println!("{json}");
    Ok(())
}

//! Embedded HTML templates.
//!
//! The tera templates ship inside the binary so `faqgen serve` works from
//! any working directory. They are parsed once at startup; registering them
//! in a single call lets tera resolve the `extends` chain.

use anyhow::{Context, Result};
use rust_embed::RustEmbed;
use tera::Tera;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct Templates;

/// Parse every embedded template into one `Tera` instance.
pub fn build_tera() -> Result<Tera> {
    let mut raw = Vec::new();
    for name in Templates::iter() {
        let file =
            Templates::get(&name).with_context(|| format!("embedded template missing: {}", name))?;
        let text = String::from_utf8(file.data.to_vec())
            .with_context(|| format!("embedded template is not UTF-8: {}", name))?;
        raw.push((name.to_string(), text));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(raw)
        .context("Failed to parse embedded templates")?;
    Ok(tera)
}
